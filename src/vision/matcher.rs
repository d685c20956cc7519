//! Normalized cross-correlation template matching (`TM_CCOEFF_NORMED`).
//!
//! Window sums come from integral images so only the template-weighted sum
//! is computed per position.

use image::{GrayImage, ImageBuffer, Luma};
use imageproc::definitions::Image;
use imageproc::integral_image::{integral_image, integral_squared_image};
use imageproc::template_matching::find_extremes;

/// A match needs a correlation strictly above this value.
pub const MATCH_THRESHOLD: f32 = 0.8;

/// Windows or templates with less total variance than this are treated as flat.
const FLAT_VARIANCE: f64 = 1e-6;

/// Best digit found in a crop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DigitMatch {
    pub digit: u8,
    pub score: f32,
}

/// Computes the correlation coefficient of `template` at every valid
/// position inside `image`.
///
/// Returns `None` when the image is smaller than the template in either
/// dimension, or when the template is empty.
pub fn correlation_map(image: &GrayImage, template: &GrayImage) -> Option<Image<Luma<f32>>> {
    let (iw, ih) = image.dimensions();
    let (tw, th) = template.dimensions();
    if tw == 0 || th == 0 || iw < tw || ih < th {
        return None;
    }

    let n = (tw * th) as f64;
    let mean = template.pixels().map(|p| p[0] as f64).sum::<f64>() / n;
    let centered: Vec<f64> = template.pixels().map(|p| p[0] as f64 - mean).collect();
    let template_energy: f64 = centered.iter().map(|v| v * v).sum();

    let sums = integral_image::<_, u64>(image);
    let squares = integral_squared_image::<_, u64>(image);

    let map = ImageBuffer::from_fn(iw - tw + 1, ih - th + 1, |x, y| {
        let sum = window_sum(&sums, x, y, tw, th) as f64;
        let sum_sq = window_sum(&squares, x, y, tw, th) as f64;
        let window_energy = sum_sq - sum * sum / n;
        if template_energy < FLAT_VARIANCE || window_energy < FLAT_VARIANCE {
            return Luma([0.0f32]);
        }

        // The centred template sums to zero, so the raw window works as well
        // as a mean-subtracted one here.
        let mut numerator = 0.0;
        for ty in 0..th {
            for tx in 0..tw {
                let weight = centered[(ty * tw + tx) as usize];
                numerator += weight * image.get_pixel(x + tx, y + ty)[0] as f64;
            }
        }

        let score = numerator / (template_energy * window_energy).sqrt();
        Luma([score.clamp(-1.0, 1.0) as f32])
    });

    Some(map)
}

/// Sum over the `w`x`h` window at (`x`, `y`) of a zero-padded integral image.
fn window_sum(integral: &Image<Luma<u64>>, x: u32, y: u32, w: u32, h: u32) -> u64 {
    let at = |px: u32, py: u32| integral.get_pixel(px, py)[0];
    (at(x + w, y + h) + at(x, y)) - (at(x + w, y) + at(x, y + h))
}

/// Highest correlation of `template` anywhere in `image`, or `None` if the
/// image is too small to hold the template.
pub fn match_score(image: &GrayImage, template: &GrayImage) -> Option<f32> {
    correlation_map(image, template).map(|map| find_extremes(&map).max_value)
}

/// True when `template` appears in `image` above [`MATCH_THRESHOLD`].
pub fn matches(image: &GrayImage, template: &GrayImage) -> bool {
    match_score(image, template).is_some_and(|score| score > MATCH_THRESHOLD)
}

/// Scans all digit templates and keeps the best one above threshold.
/// Equal scores keep the lower digit.
pub fn best_digit(image: &GrayImage, digits: &[GrayImage]) -> Option<DigitMatch> {
    let mut best: Option<DigitMatch> = None;
    for (digit, template) in digits.iter().enumerate() {
        let Some(score) = match_score(image, template) else {
            continue;
        };
        if score > MATCH_THRESHOLD && best.is_none_or(|b| score > b.score) {
            best = Some(DigitMatch {
                digit: digit as u8,
                score,
            });
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{pattern, stamp};

    #[test]
    fn test_self_match_is_perfect() {
        let template = pattern(7, 15, 22);
        let score = match_score(&template, &template).unwrap();
        assert!(score > 0.999, "score was {}", score);
    }

    #[test]
    fn test_finds_template_inside_larger_image() {
        let template = pattern(3, 10, 12);
        let mut image = GrayImage::from_pixel(40, 30, Luma([40]));
        stamp(&mut image, &template, 17, 9);

        let map = correlation_map(&image, &template).unwrap();
        let extremes = find_extremes(&map);
        assert_eq!(extremes.max_value_location, (17, 9));
        assert!(matches(&image, &template));
    }

    #[test]
    fn test_undersized_region_is_skipped() {
        let template = pattern(1, 15, 22);
        let small = pattern(1, 14, 22);
        assert_eq!(match_score(&small, &template), None);
        assert!(!matches(&small, &template));
        assert_eq!(best_digit(&small, &[template]), None);
    }

    #[test]
    fn test_flat_region_scores_zero() {
        let template = pattern(2, 8, 8);
        let flat = GrayImage::from_pixel(8, 8, Luma([128]));
        assert_eq!(match_score(&flat, &template), Some(0.0));
    }

    #[test]
    fn test_unrelated_patterns_do_not_match() {
        let a = pattern(11, 15, 22);
        let b = pattern(12, 15, 22);
        assert!(!matches(&a, &b));
    }

    #[test]
    fn test_brightness_change_still_matches() {
        let template = pattern(5, 12, 12);
        let brighter = GrayImage::from_fn(12, 12, |x, y| {
            Luma([(template.get_pixel(x, y)[0] / 2).saturating_add(100)])
        });
        assert!(matches(&brighter, &template));
    }

    #[test]
    fn test_best_digit_picks_matching_index() {
        let digits: Vec<GrayImage> = (0..10).map(|i| pattern(100 + i, 15, 22)).collect();
        let found = best_digit(&digits[6], &digits).unwrap();
        assert_eq!(found.digit, 6);
        assert!(found.score >= MATCH_THRESHOLD);
    }

    #[test]
    fn test_best_digit_tie_keeps_first_index() {
        let shared = pattern(42, 15, 22);
        let digits = vec![pattern(1, 15, 22), shared.clone(), shared.clone()];
        assert_eq!(best_digit(&shared, &digits).unwrap().digit, 1);
    }
}
