//! Caught-fish records.
//!
//! This module provides:
//! - `FishRecord` and the `Quality` tiers (`fish`)
//! - The append-only `fish_records.txt` store with search and summaries (`store`)
//! - The recorder worker that OCRs catches into records (`worker`)

pub mod fish;
pub mod store;
pub mod worker;

pub use fish::{FishRecord, Quality};
pub use store::{quality_counts, RecordStore, SearchScope};
pub use worker::{run_recorder_worker, Recorder};
