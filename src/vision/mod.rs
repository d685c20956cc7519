//! Template matching over screen crops.
//!
//! This module provides:
//! - `TM_CCOEFF_NORMED` matching and digit selection (`matcher`)
//! - Template loading and the per-resolution cache (`templates`)
//! - The bait counter reader (`bait`)
//! - `Detector`, which ties a layout and a template set to a capture handle

pub mod bait;
pub mod detector;
pub mod matcher;
pub mod templates;

pub use bait::{compare, BaitChange};
pub use detector::Detector;
pub use templates::{TemplateCache, TemplateSet};
