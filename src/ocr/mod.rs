//! Text recognition for the catch banner.
//!
//! This module provides:
//! - The `OcrEngine` seam and the Tesseract CLI engine (`engine`)
//! - Tesseract discovery and language data setup (`setup`)
//! - Crop preprocessing (`preprocess`)
//! - Banner text parsing (`extract`)

pub mod engine;
pub mod extract;
pub mod preprocess;
pub mod setup;

pub use engine::{join_lines, OcrEngine, OcrLine, TesseractEngine};
pub use extract::{FishInfo, FishInfoParser};
pub use preprocess::prepare_for_ocr;
pub use setup::ensure_tesseract;
