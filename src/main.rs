//! PartyFish
//!
//! A Windows system tray application that plays the party fishing mini-game:
//! it watches the primary monitor through the Windows Graphics Capture API,
//! casts and reels with simulated input, and records every catch it can read.

// Hide console window on Windows
#![windows_subsystem = "windows"]
#![cfg_attr(not(windows), allow(dead_code))]

mod automation;
mod capture;
mod layout;
mod logging;
mod ocr;
mod paths;
mod records;
#[cfg(test)]
mod test_support;
#[cfg(windows)]
mod tray;
mod vision;

use anyhow::Result;
use log::error;

fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = panic_info
            .location()
            .map(|loc| format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column()))
            .unwrap_or_default();
        // Goes through the logger when installed, to stderr otherwise
        error!("[PANIC]{} {}", location, msg);
        eprintln!("[PANIC]{} {}", location, msg);
    }));
}

fn main() -> Result<()> {
    install_panic_hook();
    let result = run();
    if let Err(e) = &result {
        error!("{:#}", e);
    }
    result
}

#[cfg(windows)]
fn run() -> Result<()> {
    use anyhow::Context;
    use log::{info, warn, LevelFilter};
    use std::sync::Arc;
    use std::thread;

    use automation::input::SendInputDriver;
    use automation::{
        channel_pair, create_record_queue, runner, spawn_watcher, AppConfig, Command, SharedStatus,
    };
    use capture::screenshot::WgcScreen;
    use capture::ScreenCapture;
    use ocr::{OcrEngine, TesseractEngine};
    use records::{run_recorder_worker, RecordStore, Recorder};
    use vision::{TemplateCache, TemplateSet};

    paths::ensure_directories().context("Failed to create output directories")?;
    logging::init(LevelFilter::Info).map_err(|e| anyhow::anyhow!("Failed to install logger: {}", e))?;
    info!("Logging to {}", logging::log_file_path().display());

    unsafe {
        windows::Win32::System::WinRT::RoInitialize(
            windows::Win32::System::WinRT::RO_INIT_MULTITHREADED,
        )?
    };

    let config_path = paths::get_config_file();
    let config = AppConfig::load(&config_path);

    let templates = Arc::new(TemplateCache::new(
        TemplateSet::load(&paths::get_template_dir()).context("Failed to load templates")?,
    ));

    let engine: Option<Box<dyn OcrEngine>> = match ocr::ensure_tesseract() {
        Ok(tesseract) => Some(Box::new(TesseractEngine::new(tesseract))),
        Err(e) => {
            warn!("Failed to set up Tesseract: {:#}", e);
            warn!("Fish recording is disabled.");
            None
        }
    };

    let store = RecordStore::open(&paths::get_records_file())?;
    info!("{} fish records loaded", store.records().len());
    let recorder = Recorder::new(engine, store, paths::get_screenshots_dir())?;
    let (record_sender, record_receiver) = create_record_queue();
    let recorder_thread = thread::spawn(move || {
        // Capture objects stay on the thread that created them
        let screen = match WgcScreen::primary() {
            Ok(screen) => Some(Box::new(screen) as Box<dyn ScreenCapture>),
            Err(e) => {
                warn!("Legendary screenshots disabled: {:#}", e);
                None
            }
        };
        run_recorder_worker(record_receiver, recorder, screen)
    });

    let resolution = capture::display::primary_resolution()?;
    info!("Primary display: {}", resolution);
    let status = Arc::new(SharedStatus::new(resolution));
    let (controller, mailbox) = channel_pair();

    let actor = runner::spawn(
        mailbox,
        || Ok(Box::new(WgcScreen::primary()?) as Box<dyn ScreenCapture>),
        Box::new(SendInputDriver),
        templates.clone(),
        config.clone(),
        status.clone(),
        Some(record_sender),
    );
    let watcher = spawn_watcher(
        || Ok(Box::new(WgcScreen::primary()?) as Box<dyn ScreenCapture>),
        templates,
        status.clone(),
        controller.clone(),
    );

    let shutdown = controller.clone();
    let result = tray::run(controller, status.clone(), config, config_path);

    // Exit already sent Shutdown unless the tray failed
    let _ = shutdown.send(Command::Shutdown);
    status.set_stopped();
    let _ = actor.join();
    let _ = watcher.join();
    let _ = recorder_thread.join();
    info!("PartyFish exited");

    result
}

#[cfg(not(windows))]
fn run() -> Result<()> {
    anyhow::bail!("PartyFish only runs on Windows")
}
