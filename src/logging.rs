//! Timestamped logging behind the `log` facade.
//!
//! Every line goes to stdout and `logs/partyfish.log`. While a fishing session
//! is active the same line is also appended to `logs/sessions/<id>.log`.

use chrono::Local;
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use crate::paths;

const LOG_FILE_NAME: &str = "partyfish.log";

struct AppLogger {
    file: PathBuf,
    session: Mutex<Option<PathBuf>>,
}

static LOGGER: OnceLock<AppLogger> = OnceLock::new();

/// Installs the logger. Call once at startup, after the logs directory exists.
pub fn init(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    let logger = LOGGER.get_or_init(|| AppLogger {
        file: paths::get_logs_dir().join(LOG_FILE_NAME),
        session: Mutex::new(None),
    });
    log::set_logger(logger)?;
    log::set_max_level(level);
    Ok(())
}

/// Returns the path of the main log file.
pub fn log_file_path() -> PathBuf {
    paths::get_logs_dir().join(LOG_FILE_NAME)
}

/// Redirects a copy of every log line to `path`, or stops doing so with `None`.
pub fn set_session_log(path: Option<PathBuf>) {
    if let Some(logger) = LOGGER.get() {
        if let Ok(mut session) = logger.session.lock() {
            *session = path;
        }
    }
}

/// Formats one log line (including the trailing newline).
fn format_line(level: Level, message: &str) -> String {
    let timestamp = Local::now().format("%H:%M:%S%.3f");
    match level {
        Level::Info => format!("[{}] {}\n", timestamp, message),
        _ => format!("[{}] {}: {}\n", timestamp, level, message),
    }
}

fn append(path: &Path, line: &str) {
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
        let _ = file.write_all(line.as_bytes());
    }
}

impl Log for AppLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        // Third-party crates (reqwest, hyper) only get through at warn level
        if !record.target().starts_with(env!("CARGO_CRATE_NAME")) && record.level() > Level::Warn {
            return;
        }

        let line = format_line(record.level(), &record.args().to_string());
        print!("{}", line);
        append(&self.file, &line);

        if let Ok(session) = self.session.lock() {
            if let Some(path) = session.as_ref() {
                append(path, &line);
            }
        }
    }

    fn flush(&self) {
        let _ = std::io::stdout().flush();
    }
}
