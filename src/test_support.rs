//! Synthetic templates, screens and input doubles shared by unit tests.

use anyhow::Result;
use image::{imageops, DynamicImage, GrayImage, Luma, Rgba, RgbaImage};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::automation::input::InputDriver;
use crate::capture::{CaptureHandle, ScreenCapture};
use crate::layout::{Icon, Layout, Point, Region, Resolution, DIGIT_WIDTH};
use crate::ocr::{OcrEngine, OcrLine};
use crate::vision::TemplateSet;

const BACKGROUND: u8 = 30;

/// Deterministic noise image (xorshift32). Different seeds do not correlate.
pub fn pattern(seed: u32, width: u32, height: u32) -> GrayImage {
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(0x9E37_79B9) | 1;
    GrayImage::from_fn(width, height, |_, _| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        Luma([(state >> 24) as u8])
    })
}

/// Pastes `sprite` into `image` with its top-left corner at (`x`, `y`).
pub fn stamp(image: &mut GrayImage, sprite: &GrayImage, x: u32, y: u32) {
    imageops::replace(image, sprite, x as i64, y as i64);
}

/// Baseline-sized templates matching the baseline layout regions.
pub fn base_templates() -> TemplateSet {
    let digits = (0..10).map(|d| pattern(100 + d, 15, 22)).collect();
    TemplateSet::new(
        digits,
        [
            pattern(200, 34, 34),
            pattern(201, 10, 19),
            pattern(202, 10, 19),
            pattern(203, 17, 21),
            pattern(204, 27, 28),
        ],
    )
}

/// What the fake screen currently shows.
pub struct Scene {
    layout: Layout,
    templates: TemplateSet,
    icons: HashSet<Icon>,
    bait: Option<u32>,
}

impl Scene {
    pub fn show(&mut self, icon: Icon) {
        self.icons.insert(icon);
    }

    pub fn hide(&mut self, icon: Icon) {
        self.icons.remove(&icon);
    }

    pub fn set_bait(&mut self, bait: Option<u32>) {
        self.bait = bait;
    }

    fn sprites(&self) -> Vec<(Point, &GrayImage)> {
        let mut sprites: Vec<(Point, &GrayImage)> = self
            .icons
            .iter()
            .map(|&icon| (self.layout.icon_region(icon).origin(), self.templates.icon(icon)))
            .collect();

        if let Some(value) = self.bait {
            let bait = self.layout.bait;
            let digit_w = ((DIGIT_WIDTH as f64 * self.layout.uniform) as u32).min(bait.width / 2);
            let digits = self.templates.digits();
            if value >= 10 {
                sprites.push((bait.origin(), &digits[(value / 10 % 10) as usize]));
                sprites.push((
                    Point::new(bait.x + digit_w as i32, bait.y),
                    &digits[(value % 10) as usize],
                ));
            } else {
                let x = bait.x + ((bait.width - digit_w) / 2) as i32;
                sprites.push((Point::new(x, bait.y), &digits[value as usize]));
            }
        }
        sprites
    }

    fn render(&self, region: Region) -> RgbaImage {
        let mut image = RgbaImage::from_pixel(
            region.width,
            region.height,
            Rgba([BACKGROUND, BACKGROUND, BACKGROUND, 255]),
        );
        for (at, sprite) in self.sprites() {
            let rgba = DynamicImage::ImageLuma8(sprite.clone()).to_rgba8();
            imageops::replace(
                &mut image,
                &rgba,
                (at.x - region.x) as i64,
                (at.y - region.y) as i64,
            );
        }
        image
    }
}

/// In-memory screen driven by a mutable [`Scene`].
#[derive(Clone)]
pub struct FakeScreen {
    resolution: Resolution,
    scene: Arc<Mutex<Scene>>,
    opened: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
}

impl FakeScreen {
    pub fn new(resolution: Resolution) -> Self {
        let layout = Layout::for_resolution(resolution);
        let templates = base_templates().scaled(layout.uniform);
        Self {
            resolution,
            scene: Arc::new(Mutex::new(Scene {
                layout,
                templates,
                icons: HashSet::new(),
                bait: None,
            })),
            opened: Arc::new(AtomicUsize::new(0)),
            released: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn scene(&self) -> MutexGuard<'_, Scene> {
        self.scene.lock().unwrap()
    }

    /// Number of handles opened and released so far.
    pub fn handle_counts(&self) -> (usize, usize) {
        (
            self.opened.load(Ordering::SeqCst),
            self.released.load(Ordering::SeqCst),
        )
    }
}

struct FakeHandle {
    scene: Arc<Mutex<Scene>>,
    released: Arc<AtomicUsize>,
}

impl CaptureHandle for FakeHandle {
    fn grab(&mut self, region: Region) -> Result<RgbaImage> {
        Ok(self.scene.lock().unwrap().render(region))
    }
}

impl Drop for FakeHandle {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

impl ScreenCapture for FakeScreen {
    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn open(&mut self) -> Result<Box<dyn CaptureHandle>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeHandle {
            scene: self.scene.clone(),
            released: self.released.clone(),
        }))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputEvent {
    MoveTo(Point),
    LeftDown,
    LeftUp,
    Key(u16),
}

/// Records every input call.
#[derive(Clone, Default)]
pub struct FakeInput {
    events: Arc<Mutex<Vec<InputEvent>>>,
}

impl FakeInput {
    pub fn events(&self) -> Vec<InputEvent> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: InputEvent) -> Result<()> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

impl InputDriver for FakeInput {
    fn move_to(&mut self, point: Point) -> Result<()> {
        self.push(InputEvent::MoveTo(point))
    }

    fn left_down(&mut self) -> Result<()> {
        self.push(InputEvent::LeftDown)
    }

    fn left_up(&mut self) -> Result<()> {
        self.push(InputEvent::LeftUp)
    }

    fn tap_key(&mut self, vk: u16) -> Result<()> {
        self.push(InputEvent::Key(vk))
    }
}

/// OCR engine returning canned lines.
pub struct FakeOcr {
    pub lines: Vec<String>,
}

impl OcrEngine for FakeOcr {
    fn recognize(&self, _image: &GrayImage) -> Result<Vec<OcrLine>> {
        Ok(self
            .lines
            .iter()
            .map(|text| OcrLine {
                text: text.clone(),
                confidence: 90.0,
            })
            .collect())
    }
}
