//! Resolution scaling for a UI authored against a 2560x1440 baseline.
//!
//! Elements pinned to a screen edge keep their distance to that edge (scaled
//! by the uniform factor), centred elements keep their offset from the screen
//! centre, and `Plain` elements scale each axis independently.

use std::fmt;
use thiserror::Error;

pub const BASE_WIDTH: u32 = 2560;
pub const BASE_HEIGHT: u32 = 1440;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("resolution must be positive, got {width}x{height}")]
    NotPositive { width: u32, height: u32 },
}

/// A screen resolution in physical pixels. Both sides are always positive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Resolution {
    width: u32,
    height: u32,
}

impl Resolution {
    pub const BASELINE: Resolution = Resolution {
        width: BASE_WIDTH,
        height: BASE_HEIGHT,
    };

    pub fn new(width: u32, height: u32) -> Result<Self, ResolutionError> {
        if width == 0 || height == 0 {
            return Err(ResolutionError::NotPositive { width, height });
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// The whole screen as a region.
    pub fn full_region(&self) -> Region {
        Region::new(0, 0, self.width, self.height)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Ratios between the target resolution and the baseline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScaleFactors {
    pub x: f64,
    pub y: f64,
    /// Height ratio. The game letterboxes on width, never on height.
    pub uniform: f64,
}

impl ScaleFactors {
    pub fn for_target(target: Resolution) -> Self {
        let y = target.height as f64 / BASE_HEIGHT as f64;
        Self {
            x: target.width as f64 / BASE_WIDTH as f64,
            y,
            uniform: y,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Anchor {
    /// Independent X/Y scaling.
    Plain,
    /// Offset from the screen centre, scaled uniformly.
    UniformCenter,
    TopLeft,
    TopCenter,
    TopRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

/// Where an axis is pinned.
#[derive(Clone, Copy)]
enum Pin {
    Stretch,
    Start,
    Middle,
    End,
}

impl Anchor {
    fn pins(self) -> (Pin, Pin) {
        match self {
            Anchor::Plain => (Pin::Stretch, Pin::Stretch),
            Anchor::UniformCenter => (Pin::Middle, Pin::Middle),
            Anchor::TopLeft => (Pin::Start, Pin::Start),
            Anchor::TopCenter => (Pin::Middle, Pin::Start),
            Anchor::TopRight => (Pin::End, Pin::Start),
            Anchor::BottomLeft => (Pin::Start, Pin::End),
            Anchor::BottomCenter => (Pin::Middle, Pin::End),
            Anchor::BottomRight => (Pin::End, Pin::End),
        }
    }

    pub const ALL: [Anchor; 8] = [
        Anchor::Plain,
        Anchor::UniformCenter,
        Anchor::TopLeft,
        Anchor::TopCenter,
        Anchor::TopRight,
        Anchor::BottomLeft,
        Anchor::BottomCenter,
        Anchor::BottomRight,
    ];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle: top-left corner plus size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Maps baseline coordinates to one target resolution.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Scaler {
    target: Resolution,
    factors: ScaleFactors,
}

impl Scaler {
    pub fn new(target: Resolution) -> Self {
        Self {
            target,
            factors: ScaleFactors::for_target(target),
        }
    }

    pub fn target(&self) -> Resolution {
        self.target
    }

    pub fn factors(&self) -> ScaleFactors {
        self.factors
    }

    pub fn point(&self, p: Point, anchor: Anchor) -> Point {
        let (h, v) = anchor.pins();
        Point::new(
            scale_axis(p.x, h, BASE_WIDTH, self.target.width, self.factors.x, self.factors.uniform),
            scale_axis(p.y, v, BASE_HEIGHT, self.target.height, self.factors.y, self.factors.uniform),
        )
    }

    /// Scales the origin by `anchor`; the size follows the uniform factor
    /// unless the anchor is `Plain`.
    pub fn region(&self, r: Region, anchor: Anchor) -> Region {
        let origin = self.point(r.origin(), anchor);
        let (sx, sy) = match anchor {
            Anchor::Plain => (self.factors.x, self.factors.y),
            _ => (self.factors.uniform, self.factors.uniform),
        };
        Region::new(
            origin.x,
            origin.y,
            (r.width as f64 * sx) as u32,
            (r.height as f64 * sy) as u32,
        )
    }

    /// Maps a target point back onto the baseline.
    pub fn unscale_point(&self, p: Point, anchor: Anchor) -> Point {
        let (h, v) = anchor.pins();
        Point::new(
            unscale_axis(p.x, h, BASE_WIDTH, self.target.width, self.factors.x, self.factors.uniform),
            unscale_axis(p.y, v, BASE_HEIGHT, self.target.height, self.factors.y, self.factors.uniform),
        )
    }
}

fn scale_axis(value: i32, pin: Pin, base: u32, target: u32, stretch: f64, uniform: f64) -> i32 {
    let value = value as f64;
    let (base, target) = (base as f64, target as f64);
    match pin {
        Pin::Stretch => (value * stretch) as i32,
        Pin::Start => (value * uniform) as i32,
        Pin::Middle => (target / 2.0 + (value - base / 2.0) * uniform) as i32,
        Pin::End => target as i32 - ((base - value) * uniform) as i32,
    }
}

fn unscale_axis(value: i32, pin: Pin, base: u32, target: u32, stretch: f64, uniform: f64) -> i32 {
    let value = value as f64;
    let (base, target) = (base as f64, target as f64);
    let unscaled = match pin {
        Pin::Stretch => value / stretch,
        Pin::Start => value / uniform,
        Pin::Middle => base / 2.0 + (value - target / 2.0) / uniform,
        Pin::End => base - (target - value) / uniform,
    };
    unscaled.round() as i32
}
