//! Screen layout of the fishing mini-game.
//!
//! All positions are authored once against a 2560x1440 baseline and derived
//! for the target resolution through [`Scaler`].

pub mod regions;
pub mod scale;

pub use regions::{Icon, Layout, DIGIT_HEIGHT, DIGIT_WIDTH};
pub use scale::{Anchor, Point, Region, Resolution, ScaleFactors, Scaler};
