use image::imageops::{self, FilterType};
use image::{GrayImage, RgbaImage};

/// Upscale factor applied before OCR; the HUD text is small.
const UPSCALE: u32 = 2;

/// Converts a HUD crop to grayscale and upscales it for Tesseract.
pub fn prepare_for_ocr(img: &RgbaImage) -> GrayImage {
    let gray = imageops::grayscale(img);
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return gray;
    }
    imageops::resize(&gray, width * UPSCALE, height * UPSCALE, FilterType::CatmullRom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_prepare_doubles_size_and_keeps_flat_color() {
        let img = RgbaImage::from_pixel(30, 10, Rgba([200, 200, 200, 255]));
        let prepared = prepare_for_ocr(&img);

        assert_eq!(prepared.dimensions(), (60, 20));
        assert!(prepared.pixels().all(|p| (p[0] as i32 - 200).abs() <= 1));
    }

    #[test]
    fn test_prepare_empty_image() {
        let prepared = prepare_for_ocr(&RgbaImage::new(0, 0));
        assert_eq!(prepared.dimensions(), (0, 0));
    }
}
