use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

use super::config::TimingPreset;

const MIN_JITTERED: Duration = Duration::from_millis(10);

/// A timing preset converted to durations.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Timings {
    pub poll_interval: Duration,
    pub reel_hold: Duration,
    pub reel_release: Duration,
    pub max_pulls: u32,
    pub cast_hold: Duration,
}

fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

impl From<&TimingPreset> for Timings {
    fn from(preset: &TimingPreset) -> Self {
        Self {
            poll_interval: seconds(preset.poll_interval),
            reel_hold: seconds(preset.reel_hold),
            reel_release: seconds(preset.reel_release),
            max_pulls: preset.max_pulls,
            cast_hold: seconds(preset.cast_hold),
        }
    }
}

/// Randomises hold and release durations by up to +/- `percent`.
pub struct Jitter {
    percent: u32,
    rng: StdRng,
}

impl Jitter {
    pub fn new(percent: u32) -> Self {
        Self {
            percent,
            rng: StdRng::from_entropy(),
        }
    }

    #[cfg(test)]
    pub fn with_seed(percent: u32, seed: u64) -> Self {
        Self {
            percent,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn set_percent(&mut self, percent: u32) {
        self.percent = percent;
    }

    /// Returns `base` unchanged when jitter is off, otherwise a value within
    /// the jitter range, rounded to whole milliseconds and never below 10 ms.
    pub fn apply(&mut self, base: Duration) -> Duration {
        if self.percent == 0 {
            return base;
        }
        let spread = self.percent as f64 / 100.0;
        let factor = self.rng.gen_range(1.0 - spread..=1.0 + spread);
        let millis = (base.as_secs_f64() * factor * 1000.0).round() as u64;
        Duration::from_millis(millis).max(MIN_JITTERED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timings_from_preset() {
        let timings = Timings::from(&TimingPreset::default());
        assert_eq!(timings.poll_interval, Duration::from_millis(300));
        assert_eq!(timings.reel_hold, Duration::from_millis(2500));
        assert_eq!(timings.reel_release, Duration::from_secs(2));
        assert_eq!(timings.max_pulls, 15);
        assert_eq!(timings.cast_hold, Duration::from_millis(500));
    }

    #[test]
    fn test_zero_jitter_is_identity() {
        let mut jitter = Jitter::with_seed(0, 7);
        let base = Duration::from_micros(123_456);
        assert_eq!(jitter.apply(base), base);
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let mut jitter = Jitter::with_seed(20, 42);
        let base = Duration::from_millis(1000);
        for _ in 0..200 {
            let value = jitter.apply(base);
            assert!(value >= Duration::from_millis(800), "{:?}", value);
            assert!(value <= Duration::from_millis(1200), "{:?}", value);
        }
    }

    #[test]
    fn test_jitter_floor() {
        let mut jitter = Jitter::with_seed(50, 1);
        for _ in 0..50 {
            assert!(jitter.apply(Duration::from_millis(5)) >= MIN_JITTERED);
        }
    }
}
