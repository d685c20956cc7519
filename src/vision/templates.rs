//! Reference images for icon and digit matching.
//!
//! Base templates are loaded once at startup. Scaled copies are cached per
//! target resolution, so flipping between resolutions never serves a stale set.

use anyhow::{Context, Result};
use image::imageops::{self, FilterType};
use image::GrayImage;
use log::debug;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use crate::layout::{Icon, Resolution, ScaleFactors};

/// File name of each icon template inside the template directory.
pub fn icon_file_name(icon: Icon) -> &'static str {
    match icon {
        Icon::Star => "star.png",
        Icon::PromptF1 => "prompt_f1.png",
        Icon::PromptF2 => "prompt_f2.png",
        Icon::Bite => "bite.png",
        Icon::ExtendDialog => "extend_time.png",
    }
}

fn digit_file_name(digit: usize) -> String {
    format!("digit_{}.png", digit)
}

/// Grayscale templates: digits 0-9 and one image per [`Icon`].
#[derive(Clone, Debug)]
pub struct TemplateSet {
    digits: Vec<GrayImage>,
    icons: [GrayImage; 5],
}

impl TemplateSet {
    pub fn new(digits: Vec<GrayImage>, icons: [GrayImage; 5]) -> Self {
        Self { digits, icons }
    }

    /// Loads every template from `dir`. All files are required.
    pub fn load(dir: &Path) -> Result<Self> {
        let load_gray = |name: &str| -> Result<GrayImage> {
            let path = dir.join(name);
            let img = image::open(&path)
                .with_context(|| format!("Failed to load template {}", path.display()))?;
            Ok(img.to_luma8())
        };

        let digits = (0..10)
            .map(|d| load_gray(&digit_file_name(d)))
            .collect::<Result<Vec<_>>>()?;

        let mut icons = Vec::with_capacity(Icon::ALL.len());
        for icon in Icon::ALL {
            icons.push(load_gray(icon_file_name(icon))?);
        }
        let icons: [GrayImage; 5] = icons
            .try_into()
            .map_err(|_| anyhow::anyhow!("Unexpected number of icon templates"))?;

        Ok(Self { digits, icons })
    }

    pub fn digits(&self) -> &[GrayImage] {
        &self.digits
    }

    pub fn icon(&self, icon: Icon) -> &GrayImage {
        &self.icons[icon as usize]
    }

    /// Resizes every template by `factor` (bilinear).
    pub fn scaled(&self, factor: f64) -> Self {
        if factor == 1.0 {
            return self.clone();
        }
        let resize = |img: &GrayImage| {
            let w = ((img.width() as f64 * factor) as u32).max(1);
            let h = ((img.height() as f64 * factor) as u32).max(1);
            imageops::resize(img, w, h, FilterType::Triangle)
        };
        Self {
            digits: self.digits.iter().map(resize).collect(),
            icons: self.icons.each_ref().map(resize),
        }
    }
}

/// Process-wide template cache keyed by target resolution.
pub struct TemplateCache {
    base: TemplateSet,
    scaled: Mutex<HashMap<Resolution, Arc<TemplateSet>>>,
}

impl TemplateCache {
    pub fn new(base: TemplateSet) -> Self {
        Self {
            base,
            scaled: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the templates scaled for `resolution`, building them on first use.
    pub fn get(&self, resolution: Resolution) -> Arc<TemplateSet> {
        let mut scaled = self.scaled.lock().unwrap_or_else(PoisonError::into_inner);
        scaled
            .entry(resolution)
            .or_insert_with(|| {
                let factor = ScaleFactors::for_target(resolution).uniform;
                debug!("Scaling templates for {} (x{:.3})", resolution, factor);
                Arc::new(self.base.scaled(factor))
            })
            .clone()
    }
}
