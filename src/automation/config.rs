//! Settings loaded from config.json next to the executable.
//!
//! Missing keys fall back to defaults. A file that fails to parse or
//! validate is reported and replaced by the defaults; nothing here is fatal.

use anyhow::{bail, Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::layout::Resolution;

/// One named set of timing parameters. Durations are in seconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimingPreset {
    pub name: String,
    /// Pause between loop iterations
    pub poll_interval: f64,
    /// How long the button is held for one reel pull
    pub reel_hold: f64,
    /// Pause between reel pulls
    pub reel_release: f64,
    /// Pulls before giving up on a fish
    pub max_pulls: u32,
    /// How long the button is held to cast
    pub cast_hold: f64,
}

impl TimingPreset {
    fn new(name: &str, poll: f64, hold: f64, release: f64, pulls: u32, cast: f64) -> Self {
        Self {
            name: name.to_string(),
            poll_interval: poll,
            reel_hold: hold,
            reel_release: release,
            max_pulls: pulls,
            cast_hold: cast,
        }
    }

    fn validate(&self) -> Result<()> {
        let durations = [
            ("poll_interval", self.poll_interval),
            ("reel_hold", self.reel_hold),
            ("reel_release", self.reel_release),
            ("cast_hold", self.cast_hold),
        ];
        for (key, value) in durations {
            if !value.is_finite() || value <= 0.0 {
                bail!("preset '{}': {} must be a positive number of seconds", self.name, key);
            }
        }
        if self.max_pulls == 0 {
            bail!("preset '{}': max_pulls must be at least 1", self.name);
        }
        Ok(())
    }
}

impl Default for TimingPreset {
    fn default() -> Self {
        default_presets().remove(0)
    }
}

fn default_presets() -> Vec<TimingPreset> {
    vec![
        TimingPreset::new("Preset 1", 0.3, 2.5, 2.0, 15, 0.5),
        TimingPreset::new("Preset 2", 0.3, 2.0, 1.5, 20, 0.5),
        TimingPreset::new("Preset 3", 0.2, 0.4, 0.2, 50, 0.1),
        TimingPreset::new("Preset 4", 0.2, 1.5, 1.0, 25, 0.5),
    ]
}

/// Answer given to the host's "extend time?" dialog.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtendTimePolicy {
    Accept,
    #[default]
    Decline,
}

/// Reaction when the fish bucket looks full.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketMode {
    /// Pause the fishing loop.
    #[default]
    Pause,
    /// Tap F once and keep fishing.
    PressF,
    Off,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionChoice {
    #[serde(rename = "1080P")]
    Hd,
    #[serde(rename = "2K")]
    Qhd,
    #[serde(rename = "4K")]
    Uhd,
    /// Whatever the primary display reports.
    #[default]
    #[serde(rename = "current")]
    Current,
    #[serde(rename = "custom")]
    Custom,
}

impl ResolutionChoice {
    fn preset_size(self) -> Option<(u32, u32)> {
        match self {
            ResolutionChoice::Hd => Some((1920, 1080)),
            ResolutionChoice::Qhd => Some((2560, 1440)),
            ResolutionChoice::Uhd => Some((3840, 2160)),
            ResolutionChoice::Current | ResolutionChoice::Custom => None,
        }
    }
}

/// Relative difference above which a preset resolution is considered wrong.
const RESOLUTION_TOLERANCE: f64 = 0.10;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub presets: Vec<TimingPreset>,
    /// Index into `presets`
    pub active_preset: usize,
    pub extend_time: ExtendTimePolicy,
    pub resolution: ResolutionChoice,
    pub custom_width: u32,
    pub custom_height: u32,
    /// Pause/resume hotkey, e.g. "F2", "Ctrl+Shift+A", "Mouse4"
    pub hotkey: String,
    /// OCR the catch banner and append to fish_records.txt
    pub record_fish: bool,
    /// Save a full screenshot for legendary catches
    pub legendary_screenshot: bool,
    /// Random +/- percentage applied to hold and release durations
    pub jitter_percent: u32,
    pub bucket_detection: BucketMode,
    /// Beep on start and pause
    pub sound_cues: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            presets: default_presets(),
            active_preset: 0,
            extend_time: ExtendTimePolicy::default(),
            resolution: ResolutionChoice::default(),
            custom_width: 2560,
            custom_height: 1440,
            hotkey: "F2".to_string(),
            record_fish: true,
            legendary_screenshot: true,
            jitter_percent: 0,
            bucket_detection: BucketMode::default(),
            sound_cues: true,
        }
    }
}

impl AppConfig {
    /// Loads the config from `path`, falling back to defaults on any problem.
    pub fn load(path: &Path) -> Self {
        info!("Looking for config at: {}", path.display());

        if !path.exists() {
            info!("config.json not found. Using default config.");
            return Self::default();
        }

        let config = fs::read_to_string(path)
            .context("Failed to read config.json")
            .and_then(|contents| Self::parse(&contents));
        match config {
            Ok(config) => {
                info!("Config loaded from config.json");
                config
            }
            Err(e) => {
                warn!("{:#}. Using defaults.", e);
                Self::default()
            }
        }
    }

    /// Parses and validates a config document.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(contents).context("Failed to parse config.json")?;
        config.validate().context("Invalid config.json")?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.presets.is_empty() {
            bail!("at least one timing preset is required");
        }
        if self.active_preset >= self.presets.len() {
            bail!(
                "active_preset {} is out of range (0..{})",
                self.active_preset,
                self.presets.len()
            );
        }
        for preset in &self.presets {
            preset.validate()?;
        }
        if self.resolution == ResolutionChoice::Custom {
            Resolution::new(self.custom_width, self.custom_height)?;
        }
        if self.jitter_percent > 50 {
            bail!("jitter_percent must be between 0 and 50");
        }
        Ok(())
    }

    pub fn active_timing(&self) -> TimingPreset {
        self.presets
            .get(self.active_preset)
            .cloned()
            .unwrap_or_default()
    }

    /// Resolves the resolution to lay the HUD out for, given the real screen.
    ///
    /// A preset that is more than 10% off the real screen in either axis is
    /// ignored in favour of the real screen.
    pub fn target_resolution(&self, actual: Resolution) -> Resolution {
        if let Some((width, height)) = self.resolution.preset_size() {
            let off = |preset: u32, real: u32| {
                (preset as f64 - real as f64).abs() / real as f64 > RESOLUTION_TOLERANCE
            };
            if off(width, actual.width()) || off(height, actual.height()) {
                warn!(
                    "Configured resolution {}x{} does not match the screen ({}), using the screen resolution",
                    width, height, actual
                );
                return actual;
            }
            return Resolution::new(width, height).unwrap_or(actual);
        }

        match self.resolution {
            ResolutionChoice::Custom => {
                Resolution::new(self.custom_width, self.custom_height).unwrap_or(actual)
            }
            _ => actual,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_keys_use_defaults() {
        let config = AppConfig::parse(r#"{ "hotkey": "Ctrl+Shift+A", "jitter_percent": 10 }"#).unwrap();
        assert_eq!(config.hotkey, "Ctrl+Shift+A");
        assert_eq!(config.jitter_percent, 10);
        assert_eq!(config.presets, default_presets());
        assert_eq!(config.extend_time, ExtendTimePolicy::Decline);
        assert!(config.record_fish);
    }

    #[test]
    fn test_enum_spellings() {
        let config = AppConfig::parse(
            r#"{ "resolution": "4K", "extend_time": "accept", "bucket_detection": "press_f" }"#,
        )
        .unwrap();
        assert_eq!(config.resolution, ResolutionChoice::Uhd);
        assert_eq!(config.extend_time, ExtendTimePolicy::Accept);
        assert_eq!(config.bucket_detection, BucketMode::PressF);
    }

    #[test]
    fn test_rejects_zero_custom_resolution() {
        let err = AppConfig::parse(r#"{ "resolution": "custom", "custom_width": 0 }"#).unwrap_err();
        assert!(format!("{:#}", err).contains("positive"));
    }

    #[test]
    fn test_rejects_non_positive_durations() {
        let mut config = AppConfig::default();
        config.presets[1].reel_hold = 0.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.active_preset = 4;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_falls_back_on_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        assert_eq!(AppConfig::load(&path), AppConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = AppConfig::default();
        config.active_preset = 2;
        config.extend_time = ExtendTimePolicy::Accept;

        config.save(&path).unwrap();
        assert_eq!(AppConfig::load(&path), config);
    }

    #[test]
    fn test_target_resolution() {
        let screen = Resolution::new(1920, 1080).unwrap();
        let mut config = AppConfig::default();
        assert_eq!(config.target_resolution(screen), screen);

        config.resolution = ResolutionChoice::Hd;
        assert_eq!(config.target_resolution(screen), screen);

        // 2K preset on a 1080p screen is too far off
        config.resolution = ResolutionChoice::Qhd;
        assert_eq!(config.target_resolution(screen), screen);

        // Within 10%: the preset wins
        let near = Resolution::new(2400, 1350).unwrap();
        assert_eq!(config.target_resolution(near), Resolution::BASELINE);

        config.resolution = ResolutionChoice::Custom;
        config.custom_width = 1600;
        config.custom_height = 900;
        assert_eq!(
            config.target_resolution(screen),
            Resolution::new(1600, 900).unwrap()
        );
    }

    #[test]
    fn test_active_timing_defaults_when_out_of_range() {
        let mut config = AppConfig::default();
        config.active_preset = 9;
        assert_eq!(config.active_timing(), TimingPreset::default());
    }
}
