//! Run state owned by the fishing actor, and the snapshot other threads read.

use chrono::{DateTime, Local};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::layout::Resolution;

/// Fishing loop states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Paused,
    Running,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Paused => write!(f, "Paused"),
            RunState::Running => write!(f, "Running"),
        }
    }
}

/// One Paused → Running → Paused span.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub started: DateTime<Local>,
}

impl Session {
    pub fn start() -> Self {
        let started = Local::now();
        Self {
            id: started.format("%Y%m%d_%H%M%S").to_string(),
            started,
        }
    }
}

/// Read-only view of the actor for the tray and the watcher thread.
#[derive(Debug)]
pub struct SharedStatus {
    running: AtomicBool,
    stopped: AtomicBool,
    resolution: Mutex<Resolution>,
}

impl SharedStatus {
    pub fn new(resolution: Resolution) -> Self {
        Self {
            running: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            resolution: Mutex::new(resolution),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    /// The actor has exited.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn set_stopped(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.stopped.store(true, Ordering::SeqCst);
    }

    /// Resolution the actor is currently laid out for.
    pub fn resolution(&self) -> Resolution {
        *self.resolution.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_resolution(&self, resolution: Resolution) {
        *self.resolution.lock().unwrap_or_else(|e| e.into_inner()) = resolution;
    }
}
