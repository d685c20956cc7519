use anyhow::Result;
use std::sync::Arc;

use super::bait::read_bait;
use super::matcher::matches;
use super::templates::{TemplateCache, TemplateSet};
use crate::capture::{grab_gray, CaptureHandle};
use crate::layout::{Icon, Layout, Resolution};

/// Answers questions about the current screen for one target resolution.
#[derive(Clone)]
pub struct Detector {
    layout: Layout,
    templates: Arc<TemplateSet>,
}

impl Detector {
    pub fn new(layout: Layout, templates: Arc<TemplateSet>) -> Self {
        Self { layout, templates }
    }

    pub fn for_resolution(cache: &TemplateCache, resolution: Resolution) -> Self {
        Self::new(Layout::for_resolution(resolution), cache.get(resolution))
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn sees(&self, handle: &mut dyn CaptureHandle, icon: Icon) -> Result<bool> {
        let region = grab_gray(handle, self.layout.icon_region(icon))?;
        Ok(matches(&region, self.templates.icon(icon)))
    }

    /// Either cast prompt (F1 or F2) is showing.
    pub fn sees_cast_prompt(&self, handle: &mut dyn CaptureHandle) -> Result<bool> {
        Ok(self.sees(handle, Icon::PromptF1)? || self.sees(handle, Icon::PromptF2)?)
    }

    pub fn read_bait(&self, handle: &mut dyn CaptureHandle) -> Result<Option<u32>> {
        let region = grab_gray(handle, self.layout.bait)?;
        Ok(read_bait(&region, self.templates.digits(), self.layout.uniform))
    }
}
