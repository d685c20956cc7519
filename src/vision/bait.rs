//! Reads the one- or two-digit bait counter.

use image::imageops;
use image::GrayImage;
use std::cmp::Ordering;

use super::matcher::best_digit;
use crate::layout::{DIGIT_HEIGHT, DIGIT_WIDTH};

/// How the counter moved between two readings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BaitChange {
    /// The counter went down: a cast was consumed and a fish is hooked.
    Consumed,
    Refilled,
    Unchanged,
}

pub fn compare(previous: u32, current: u32) -> BaitChange {
    match current.cmp(&previous) {
        Ordering::Less => BaitChange::Consumed,
        Ordering::Greater => BaitChange::Refilled,
        Ordering::Equal => BaitChange::Unchanged,
    }
}

/// Reads the counter from a grayscale capture of the bait region.
///
/// The left and right halves are matched as the tens and units digit; if
/// either misses, a single digit centred in the region is tried instead.
pub fn read_bait(image: &GrayImage, digits: &[GrayImage], uniform: f64) -> Option<u32> {
    let (img_w, img_h) = image.dimensions();
    let crop_h = ((DIGIT_HEIGHT as f64 * uniform) as u32).max(1).min(img_h);
    let crop_w = ((DIGIT_WIDTH as f64 * uniform) as u32).max(1).min(img_w / 2);
    if crop_w == 0 || crop_h == 0 {
        return None;
    }

    let sub_crop = |x: u32| imageops::crop_imm(image, x, 0, crop_w, crop_h).to_image();

    let tens = best_digit(&sub_crop(0), digits);
    let units = best_digit(&sub_crop(crop_w), digits);
    if let (Some(tens), Some(units)) = (tens, units) {
        return Some(tens.digit as u32 * 10 + units.digit as u32);
    }

    let center_x = (img_w - crop_w) / 2;
    best_digit(&sub_crop(center_x), digits).map(|single| single.digit as u32)
}
