use std::path::PathBuf;
use std::sync::OnceLock;

static EXE_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the directory containing the executable.
pub fn get_exe_dir() -> &'static PathBuf {
    EXE_DIR.get_or_init(|| {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
    })
}

/// Returns the logs directory: `<exe_dir>/logs/`
pub fn get_logs_dir() -> PathBuf {
    get_exe_dir().join("logs")
}

/// Returns the per-session logs directory: `<exe_dir>/logs/sessions/`
pub fn get_session_logs_dir() -> PathBuf {
    get_logs_dir().join("sessions")
}

/// Returns the screenshots directory: `<exe_dir>/screenshots/`
pub fn get_screenshots_dir() -> PathBuf {
    get_exe_dir().join("screenshots")
}

/// Returns the template directory: `<exe_dir>/resources/templates/`
pub fn get_template_dir() -> PathBuf {
    get_exe_dir().join("resources").join("templates")
}

/// Returns the fish record file: `<exe_dir>/fish_records.txt`
pub fn get_records_file() -> PathBuf {
    get_exe_dir().join("fish_records.txt")
}

/// Returns the settings file: `<exe_dir>/config.json`
pub fn get_config_file() -> PathBuf {
    get_exe_dir().join("config.json")
}

/// Ensures all output directories exist. Call at startup.
pub fn ensure_directories() -> std::io::Result<()> {
    std::fs::create_dir_all(get_logs_dir())?;
    std::fs::create_dir_all(get_session_logs_dir())?;
    std::fs::create_dir_all(get_screenshots_dir())?;
    std::fs::create_dir_all(get_template_dir())?;
    Ok(())
}
