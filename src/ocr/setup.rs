//! Locates a Tesseract install and makes sure the Chinese language data is
//! available.
//!
//! Tesseract itself is not downloaded; it must be installed, on `PATH`, or
//! copied into the local data directory. Missing language data is copied
//! from the system install or fetched from the tessdata repository.

use anyhow::{anyhow, bail, Context, Result};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use super::engine::TesseractEngine;

const TESSDATA_REPO: &str = "https://github.com/tesseract-ocr/tessdata/raw/main";

const SYSTEM_INSTALLS: [&str; 2] = [
    r"C:\Program Files\Tesseract-OCR",
    r"C:\Program Files (x86)\Tesseract-OCR",
];

#[derive(Debug, Clone)]
pub struct TesseractPaths {
    pub executable: PathBuf,
    pub tessdata: PathBuf,
}

/// Returns the directory for storing Tesseract files
pub fn get_tesseract_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("partyfish")
        .join("tesseract")
}

fn traineddata_name(language: &str) -> String {
    format!("{}.traineddata", language)
}

/// Whether `tessdata` contains the data file for `language`.
pub fn has_language(tessdata: &Path, language: &str) -> bool {
    tessdata.join(traineddata_name(language)).is_file()
}

/// Finds Tesseract and ensures the Chinese language data is in the local
/// tessdata directory.
pub fn ensure_tesseract() -> Result<TesseractPaths> {
    let executable = find_tesseract_executable()?;
    info!("Tesseract found at: {}", executable.display());

    let language = TesseractEngine::LANGUAGE;
    let tessdata = get_tesseract_dir().join("tessdata");
    if !has_language(&tessdata, language) {
        fs::create_dir_all(&tessdata)
            .with_context(|| format!("Failed to create {}", tessdata.display()))?;
        match find_system_tessdata(language) {
            Some(source) => {
                let file_name = traineddata_name(language);
                info!("Copying {} from: {}", file_name, source.display());
                fs::copy(source.join(&file_name), tessdata.join(&file_name))
                    .with_context(|| format!("Failed to copy {}", file_name))?;
            }
            None => download_tessdata(&tessdata, language)?,
        }
    }

    Ok(TesseractPaths {
        executable,
        tessdata,
    })
}

/// Finds the Tesseract executable, checking our local dir first, then system
pub fn find_tesseract_executable() -> Result<PathBuf> {
    let local_exe = get_tesseract_dir().join("tesseract.exe");
    if local_exe.exists() {
        return Ok(local_exe);
    }

    if let Ok(output) = Command::new("tesseract").arg("--version").output() {
        if output.status.success() {
            return Ok(PathBuf::from("tesseract"));
        }
    }

    SYSTEM_INSTALLS
        .iter()
        .map(|dir| Path::new(dir).join("tesseract.exe"))
        .find(|path| path.exists())
        .ok_or_else(|| {
            anyhow!(
                "Tesseract not found. Install Tesseract-OCR (https://github.com/UB-Mannheim/tesseract/releases) \
                 or copy it to {}",
                get_tesseract_dir().display()
            )
        })
}

/// Finds an installed tessdata directory that has `language`.
fn find_system_tessdata(language: &str) -> Option<PathBuf> {
    let mut candidates = Vec::new();
    if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
        let prefix = PathBuf::from(prefix);
        candidates.push(prefix.join("tessdata"));
        candidates.push(prefix);
    }
    candidates.extend(SYSTEM_INSTALLS.iter().map(|dir| Path::new(dir).join("tessdata")));

    candidates
        .into_iter()
        .find(|dir| has_language(dir, language))
}

/// Puts `<language>.traineddata` into `tessdata`.
fn download_tessdata(tessdata: &Path, language: &str) -> Result<()> {
    let file_name = traineddata_name(language);
    let target = tessdata.join(&file_name);

    let url = format!("{}/{}", TESSDATA_REPO, file_name);
    info!("Downloading {}...", url);

    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(300))
        .build()?;
    let response = client
        .get(&url)
        .header("User-Agent", "partyfish")
        .send()
        .with_context(|| format!("Failed to download {}", file_name))?;
    if !response.status().is_success() {
        bail!("Failed to download {}: HTTP {}", file_name, response.status());
    }

    let bytes = response.bytes()?;
    fs::write(&target, &bytes).with_context(|| format!("Failed to write {}", target.display()))?;
    info!("Downloaded {} ({} bytes)", file_name, bytes.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_has_language() {
        let dir = tempdir().unwrap();
        assert!(!has_language(dir.path(), "chi_sim"));

        fs::write(dir.path().join("chi_sim.traineddata"), b"data").unwrap();
        assert!(has_language(dir.path(), "chi_sim"));
        assert!(!has_language(dir.path(), "eng"));
    }

    #[test]
    fn test_tesseract_dir_is_app_specific() {
        let dir = get_tesseract_dir();
        assert!(dir.ends_with(Path::new("partyfish").join("tesseract")));
    }
}
