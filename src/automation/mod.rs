//! Fishing automation.
//!
//! This module provides:
//! - Settings and timing presets (`config`, `timing`)
//! - Hotkey parsing (`hotkey`)
//! - Mouse and keyboard simulation (`input`)
//! - The fishing actor and its command channel (`runner`)
//! - The extend-time dialog watcher (`extend_time`)
//! - Full-bucket detection (`bucket`) and audio cues (`cue`)
//! - The queue feeding catches to the recorder (`queue`)

pub mod bucket;
pub mod cancel;
pub mod config;
pub mod cue;
pub mod extend_time;
pub mod hotkey;
pub mod input;
pub mod queue;
pub mod runner;
pub mod state;
pub mod timing;

pub use config::{AppConfig, BucketMode, ExtendTimePolicy};
pub use extend_time::spawn_watcher;
pub use hotkey::{Hotkey, HotkeyError};
pub use queue::{create_record_queue, CatchEvent, RecorderMessage};
pub use runner::{channel_pair, Command, Controller};
pub use state::SharedStatus;
