//! One running iteration: cast, strike, reel and hand catches to the recorder.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::time::{Duration, Instant};

use super::FishingActor;
use crate::automation::config::{BucketMode, ExtendTimePolicy};
use crate::automation::cue::Cue;
use crate::automation::hotkey::VK_F;
use crate::automation::queue::{CatchEvent, RecorderMessage};
use crate::automation::state::RunState;
use crate::capture::CaptureHandle;
use crate::layout::Icon;
use crate::vision::{compare, BaitChange};

/// Wait after releasing a cast
const AFTER_CAST: Duration = Duration::from_millis(150);
/// Wait before reading the bait counter
const SETTLE: Duration = Duration::from_millis(50);
/// Wait for the catch banner to finish animating
const HUD_DELAY: Duration = Duration::from_millis(300);
/// Wait for the extend-time dialog to close
const EXTEND_SETTLE: Duration = Duration::from_millis(500);

impl FishingActor {
    pub(super) fn tick(&mut self) -> Result<()> {
        let mut handle = self.screen.open().context("Failed to open screen capture")?;
        let handle = handle.as_mut();

        if std::mem::take(&mut self.extend_pending) {
            self.resolve_extend_time(handle)?;
        }

        if self.detector.sees_cast_prompt(handle)? {
            self.cast()?;
            if self.config.bucket_detection != BucketMode::Off
                && self.casts.record_cast(Instant::now())
            {
                self.on_bucket_full()?;
                if self.state != RunState::Running {
                    return Ok(());
                }
            }
        } else if self.detector.sees(handle, Icon::Bite)? {
            debug!("Bite");
            self.mouse.click(&self.cancel)?;
        }

        self.sleep(SETTLE)?;
        let Some(current) = self.detector.read_bait(handle)? else {
            debug!("Bait counter unreadable, keeping {:?}", self.previous_bait);
            return Ok(());
        };

        let Some(previous) = self.previous_bait else {
            self.previous_bait = Some(current);
            return Ok(());
        };

        match compare(previous, current) {
            BaitChange::Consumed => {
                info!("Bait {} -> {}, reeling", previous, current);
                self.previous_bait = Some(current);
                if self.reel(handle)? {
                    self.record_catch(handle)?;
                }
            }
            BaitChange::Refilled => {
                info!("Bait refilled: {} -> {}", previous, current);
                self.previous_bait = Some(current);
            }
            BaitChange::Unchanged => {}
        }
        Ok(())
    }

    fn cast(&mut self) -> Result<()> {
        debug!("Casting");
        let hold = self.jitter.apply(self.timings.cast_hold);
        self.mouse.press()?;
        self.sleep(hold)?;
        self.mouse.release()?;
        self.sleep(AFTER_CAST)?;
        Ok(())
    }

    /// Pulls until the catch star shows. Returns false if the fish escaped or
    /// the pull limit ran out.
    fn reel(&mut self, handle: &mut dyn CaptureHandle) -> Result<bool> {
        let mut pulls = 0;
        let caught = loop {
            if self.detector.sees(handle, Icon::Star)? {
                info!("Caught after {} pulls", pulls);
                break true;
            }
            if self.detector.sees_cast_prompt(handle)? {
                info!("Fish escaped after {} pulls", pulls);
                break false;
            }
            if pulls >= self.timings.max_pulls {
                warn!("Gave up after {} pulls", pulls);
                break false;
            }
            self.pull()?;
            pulls += 1;
        };
        self.mouse.release_if_held()?;
        Ok(caught)
    }

    fn pull(&mut self) -> Result<()> {
        let hold = self.jitter.apply(self.timings.reel_hold);
        let release = self.jitter.apply(self.timings.reel_release);
        self.mouse.press()?;
        self.sleep(hold)?;
        self.mouse.release()?;
        self.sleep(release)?;
        Ok(())
    }

    fn record_catch(&mut self, handle: &mut dyn CaptureHandle) -> Result<()> {
        if self.recorder.is_none() || !self.config.record_fish {
            return Ok(());
        }

        self.sleep(HUD_DELAY)?;
        let hud = handle.grab(self.detector.layout().fish_info)?;

        let session_id = self.session.as_ref().map(|s| s.id.clone()).unwrap_or_default();
        let screenshot = self.config.legendary_screenshot;
        self.notify(RecorderMessage::Catch(CatchEvent::new(&session_id, hud, screenshot)));
        Ok(())
    }

    fn on_bucket_full(&mut self) -> Result<()> {
        match self.config.bucket_detection {
            BucketMode::Pause => {
                warn!("Casts keep repeating, the fish bucket looks full. Pausing.");
                if self.config.sound_cues {
                    Cue::BucketFull.play();
                }
                self.pause();
            }
            BucketMode::PressF => {
                info!("Casts keep repeating, the fish bucket looks full. Pressing F.");
                self.mouse.tap_key(VK_F)?;
            }
            BucketMode::Off => {}
        }
        Ok(())
    }

    /// Answers the extend-time dialog with the configured button and
    /// re-reads the bait baseline.
    fn resolve_extend_time(&mut self, handle: &mut dyn CaptureHandle) -> Result<()> {
        if !self.detector.sees(handle, Icon::ExtendDialog)? {
            debug!("Extend-time dialog already gone");
            return Ok(());
        }

        let layout = self.detector.layout();
        let (button, label) = match self.config.extend_time {
            ExtendTimePolicy::Accept => (layout.extend_accept, "accept"),
            ExtendTimePolicy::Decline => (layout.extend_decline, "decline"),
        };
        info!("Extend-time dialog: choosing {}", label);

        self.mouse.release_if_held()?;
        self.mouse.click_at(button, &self.cancel)?;
        self.sleep(EXTEND_SETTLE)?;

        if let Some(bait) = self.detector.read_bait(handle)? {
            self.previous_bait = Some(bait);
        }
        Ok(())
    }
}
