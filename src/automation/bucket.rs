//! Detects a full fish bucket from how quickly casts follow each other.
//!
//! When the bucket is full the host refuses the catch and shows the cast
//! prompt again almost immediately, so casts bunch up.

use std::time::{Duration, Instant};

const SHORT_INTERVAL: Duration = Duration::from_secs(3);
const RESET_INTERVAL: Duration = Duration::from_secs(5);
const STREAK_WINDOW: Duration = Duration::from_secs(30);
const STREAK_LENGTH: u32 = 3;

#[derive(Debug, Default)]
pub struct CastMonitor {
    last_cast: Option<Instant>,
    streak: u32,
    streak_started: Option<Instant>,
}

impl CastMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Records a cast. Returns true when the bucket looks full; the streak is
    /// cleared at that point.
    pub fn record_cast(&mut self, now: Instant) -> bool {
        if let Some(started) = self.streak_started {
            if now.duration_since(started) > STREAK_WINDOW {
                self.streak = 0;
                self.streak_started = None;
            }
        }

        if let Some(last) = self.last_cast.replace(now) {
            let interval = now.duration_since(last);
            if interval < SHORT_INTERVAL {
                if self.streak == 0 {
                    self.streak_started = Some(last);
                }
                self.streak += 1;
            } else if interval > RESET_INTERVAL {
                self.streak = 0;
                self.streak_started = None;
            }
        }

        if self.streak >= STREAK_LENGTH {
            self.streak = 0;
            self.streak_started = None;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    #[test]
    fn test_three_quick_intervals_mean_full() {
        let t0 = Instant::now();
        let mut monitor = CastMonitor::new();
        assert!(!monitor.record_cast(t0));
        assert!(!monitor.record_cast(t0 + secs(1.0)));
        assert!(!monitor.record_cast(t0 + secs(2.0)));
        assert!(monitor.record_cast(t0 + secs(3.0)));
        // streak restarts after firing
        assert!(!monitor.record_cast(t0 + secs(4.0)));
    }

    #[test]
    fn test_long_interval_clears_streak() {
        let t0 = Instant::now();
        let mut monitor = CastMonitor::new();
        monitor.record_cast(t0);
        monitor.record_cast(t0 + secs(1.0));
        monitor.record_cast(t0 + secs(2.0));
        assert!(!monitor.record_cast(t0 + secs(8.0)));
        assert!(!monitor.record_cast(t0 + secs(9.0)));
    }

    #[test]
    fn test_medium_interval_keeps_streak() {
        let t0 = Instant::now();
        let mut monitor = CastMonitor::new();
        monitor.record_cast(t0);
        monitor.record_cast(t0 + secs(1.0));
        monitor.record_cast(t0 + secs(2.0));
        // 4 s is neither short nor long
        assert!(!monitor.record_cast(t0 + secs(6.0)));
        assert!(monitor.record_cast(t0 + secs(7.0)));
    }

    #[test]
    fn test_streak_expires() {
        let t0 = Instant::now();
        let mut monitor = CastMonitor::new();
        let mut t = t0;
        monitor.record_cast(t);
        for _ in 0..2 {
            t += secs(1.0);
            monitor.record_cast(t);
        }
        // keep the streak alive with 4 s gaps until the window has passed
        for _ in 0..7 {
            t += secs(4.0);
            monitor.record_cast(t);
        }
        assert!(t.duration_since(t0) > STREAK_WINDOW);
        assert!(!monitor.record_cast(t + secs(1.0)));
    }

    #[test]
    fn test_reset() {
        let t0 = Instant::now();
        let mut monitor = CastMonitor::new();
        monitor.record_cast(t0);
        monitor.record_cast(t0 + secs(1.0));
        monitor.record_cast(t0 + secs(2.0));
        monitor.reset();
        assert!(!monitor.record_cast(t0 + secs(2.5)));
    }
}
