//! Background watcher for the host's "extend time?" dialog.
//!
//! The dialog can pop up in the middle of a reel, so it is polled on its own
//! thread. The watcher only detects; the actor re-checks and clicks.

use anyhow::Result;
use log::{debug, info};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::runner::{Command, Controller};
use super::state::SharedStatus;
use crate::capture::{CaptureHandle, ScreenCapture};
use crate::layout::Icon;
use crate::vision::{Detector, TemplateCache};

const POLL: Duration = Duration::from_millis(50);
/// Quiet period after reporting a dialog, so the actor has time to close it
const COOLDOWN: Duration = Duration::from_secs(1);

pub fn spawn_watcher<F>(
    make_screen: F,
    templates: Arc<TemplateCache>,
    status: Arc<SharedStatus>,
    controller: Controller,
) -> JoinHandle<()>
where
    F: FnOnce() -> Result<Box<dyn ScreenCapture>> + Send + 'static,
{
    thread::spawn(move || match make_screen() {
        Ok(screen) => watch(screen, &templates, &status, &controller),
        Err(e) => log::error!("Extend-time watcher disabled: {:#}", e),
    })
}

fn watch(
    mut screen: Box<dyn ScreenCapture>,
    templates: &TemplateCache,
    status: &SharedStatus,
    controller: &Controller,
) {
    debug!("Extend-time watcher started");
    let mut detector: Option<Detector> = None;
    // Kept open while running, dropped while paused
    let mut handle: Option<Box<dyn CaptureHandle>> = None;

    while !status.is_stopped() {
        if !status.is_running() {
            handle = None;
            thread::sleep(POLL);
            continue;
        }

        let resolution = status.resolution();
        let current = match detector.take() {
            Some(d) if d.layout().resolution == resolution => detector.insert(d),
            _ => detector.insert(Detector::for_resolution(templates, resolution)),
        };

        let open = match &mut handle {
            Some(open) => open,
            slot => match screen.open() {
                Ok(opened) => slot.insert(opened),
                Err(e) => {
                    debug!("Extend-time watcher capture failed: {:#}", e);
                    thread::sleep(POLL);
                    continue;
                }
            },
        };

        match current.sees(open.as_mut(), Icon::ExtendDialog) {
            Ok(true) => {
                info!("Extend-time dialog detected");
                if controller.send(Command::ResolveExtendTime).is_err() {
                    break;
                }
                thread::sleep(COOLDOWN);
            }
            Ok(false) => {}
            Err(e) => {
                debug!("Extend-time check failed: {:#}", e);
                handle = None;
            }
        }
        thread::sleep(POLL);
    }
    debug!("Extend-time watcher stopped");
}
