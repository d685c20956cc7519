//! Screen capture.
//!
//! This module provides:
//! - The `ScreenCapture` / `CaptureHandle` seam used by the fishing loop
//! - Windows Graphics Capture of the primary monitor (`screenshot`)
//! - Primary display resolution lookup (`display`)
//!
//! A `CaptureHandle` is opened per loop iteration and released when dropped.

#[cfg(windows)]
pub mod display;
#[cfg(windows)]
pub mod screenshot;

use anyhow::Result;
use image::{imageops, GrayImage, RgbaImage};

use crate::layout::{Region, Resolution};

/// An open capture session. Each `grab` returns the latest screen content.
pub trait CaptureHandle {
    fn grab(&mut self, region: Region) -> Result<RgbaImage>;
}

/// A capturable screen.
pub trait ScreenCapture {
    /// Size of the captured screen in physical pixels.
    fn resolution(&self) -> Resolution;

    /// Starts a capture session. The session ends when the handle is dropped.
    fn open(&mut self) -> Result<Box<dyn CaptureHandle>>;
}

/// Grabs `region` and converts it to grayscale for matching.
pub fn grab_gray(handle: &mut dyn CaptureHandle, region: Region) -> Result<GrayImage> {
    let rgba = handle.grab(region)?;
    Ok(imageops::grayscale(&rgba))
}

/// Clamps `region` to a `width`x`height` frame, returning (x, y, w, h).
pub fn clamp_region(region: Region, width: u32, height: u32) -> (u32, u32, u32, u32) {
    let x = (region.x.max(0) as u32).min(width);
    let y = (region.y.max(0) as u32).min(height);
    let right = (region.x as i64 + region.width as i64).clamp(0, width as i64) as u32;
    let bottom = (region.y as i64 + region.height as i64).clamp(0, height as i64) as u32;
    (x, y, right.saturating_sub(x), bottom.saturating_sub(y))
}

/// Copies `region` out of a full frame, clamped to the frame bounds.
pub fn crop_frame(frame: &RgbaImage, region: Region) -> RgbaImage {
    let (x, y, w, h) = clamp_region(region, frame.width(), frame.height());
    imageops::crop_imm(frame, x, y, w, h).to_image()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_clamp_region_inside() {
        assert_eq!(clamp_region(Region::new(10, 20, 30, 40), 100, 100), (10, 20, 30, 40));
    }

    #[test]
    fn test_clamp_region_overflowing_edges() {
        assert_eq!(clamp_region(Region::new(-5, 90, 20, 20), 100, 100), (0, 90, 15, 10));
        assert_eq!(clamp_region(Region::new(120, 10, 5, 5), 100, 100), (100, 10, 0, 5));
    }

    #[test]
    fn test_crop_frame_copies_pixels() {
        let mut frame = RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 255]));
        frame.put_pixel(3, 4, Rgba([200, 100, 50, 255]));

        let crop = crop_frame(&frame, Region::new(3, 4, 2, 2));
        assert_eq!(crop.dimensions(), (2, 2));
        assert_eq!(crop.get_pixel(0, 0), &Rgba([200, 100, 50, 255]));
    }
}
