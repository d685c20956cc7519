//! Baseline positions of the fishing HUD and their scaled counterparts.

use super::scale::{Anchor, Point, Region, Resolution, Scaler};

/// Screen elements recognised by template matching.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Icon {
    /// Star shown when a fish is landed.
    Star,
    /// "F1" cast prompt.
    PromptF1,
    /// "F2" cast prompt.
    PromptF2,
    /// Shown while a fish is already on the hook.
    Bite,
    /// Icon of the host's "extend time?" dialog.
    ExtendDialog,
}

impl Icon {
    pub const ALL: [Icon; 5] = [
        Icon::Star,
        Icon::PromptF1,
        Icon::PromptF2,
        Icon::Bite,
        Icon::ExtendDialog,
    ];

    fn baseline(self) -> (Region, Anchor) {
        match self {
            Icon::Star => (Region::new(1172, 165, 34, 34), Anchor::TopCenter),
            Icon::PromptF1 => (Region::new(1100, 1329, 10, 19), Anchor::BottomCenter),
            Icon::PromptF2 => (Region::new(1212, 1329, 10, 19), Anchor::BottomCenter),
            Icon::Bite => (Region::new(1146, 1316, 17, 21), Anchor::BottomCenter),
            Icon::ExtendDialog => (Region::new(1244, 676, 27, 28), Anchor::UniformCenter),
        }
    }
}

const BAIT: (Region, Anchor) = (Region::new(2318, 1296, 30, 22), Anchor::BottomRight);
const EXTEND_DECLINE: Point = Point::new(1175, 778);
const EXTEND_ACCEPT: Point = Point::new(1390, 778);
const FISH_INFO: Region = Region::new(915, 75, 725, 150);

/// Baseline size of one bait digit.
pub const DIGIT_WIDTH: u32 = 15;
pub const DIGIT_HEIGHT: u32 = 22;

/// Every region and click target for one target resolution.
#[derive(Clone, Debug, PartialEq)]
pub struct Layout {
    pub resolution: Resolution,
    pub uniform: f64,
    pub bait: Region,
    pub extend_accept: Point,
    pub extend_decline: Point,
    pub fish_info: Region,
    icons: [Region; 5],
}

impl Layout {
    pub fn for_resolution(resolution: Resolution) -> Self {
        let scaler = Scaler::new(resolution);
        let icons = Icon::ALL.map(|icon| {
            let (region, anchor) = icon.baseline();
            scaler.region(region, anchor)
        });

        Self {
            resolution,
            uniform: scaler.factors().uniform,
            bait: scaler.region(BAIT.0, BAIT.1),
            extend_accept: scaler.point(EXTEND_ACCEPT, Anchor::UniformCenter),
            extend_decline: scaler.point(EXTEND_DECLINE, Anchor::UniformCenter),
            fish_info: scaler.region(FISH_INFO, Anchor::Plain),
            icons,
        }
    }

    pub fn icon_region(&self, icon: Icon) -> Region {
        self.icons[icon as usize]
    }
}
