//! Recorder worker thread.
//!
//! Receives catches from the fishing actor, OCRs the HUD crop and appends the
//! result to the record store. Runs until the channel closes.

use anyhow::{Context, Result};
use image::RgbaImage;
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;

use super::fish::{FishRecord, Quality};
use super::store::{RecordStore, SearchScope};
use crate::automation::queue::{CatchEvent, RecorderMessage};
use crate::capture::ScreenCapture;
use crate::ocr::{join_lines, prepare_for_ocr, FishInfoParser, OcrEngine};

pub struct Recorder {
    /// `None` when OCR is unavailable; catches are then only counted
    engine: Option<Box<dyn OcrEngine>>,
    parser: FishInfoParser,
    store: RecordStore,
    screenshots_dir: PathBuf,
    catches: usize,
}

impl Recorder {
    pub fn new(
        engine: Option<Box<dyn OcrEngine>>,
        store: RecordStore,
        screenshots_dir: PathBuf,
    ) -> Result<Self> {
        Ok(Self {
            engine,
            parser: FishInfoParser::new()?,
            store,
            screenshots_dir,
            catches: 0,
        })
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// OCRs one catch. Returns the stored record, or `None` if nothing was
    /// recognised.
    pub fn record_catch(&mut self, event: &CatchEvent) -> Result<Option<FishRecord>> {
        self.catches += 1;
        let Some(engine) = &self.engine else {
            return Ok(None);
        };

        let lines = engine.recognize(&prepare_for_ocr(&event.hud))?;
        let text = join_lines(&lines);
        let info = self.parser.parse(&text);
        if info.is_empty() {
            warn!("Could not read the catch banner: '{}'", text);
            return Ok(None);
        }

        let record = FishRecord::new(&event.session_id, event.caught_at.naive_local(), info);
        self.store.append(record.clone())?;
        let times = self.store.search(&record.name, None, &SearchScope::All).len();
        info!(
            "Caught {} [{}] {} ({} so far)",
            record.name, record.quality, record.weight, times
        );

        Ok(Some(record))
    }

    /// Saves a full screenshot if `record` is top tier and the catch asked
    /// for one. Returns the saved path.
    pub fn save_highlight(
        &self,
        screen: &mut dyn ScreenCapture,
        event: &CatchEvent,
        record: &FishRecord,
    ) -> Result<Option<PathBuf>> {
        if !event.screenshot || !record.quality.is_top_tier() {
            return Ok(None);
        }
        let name = format!(
            "{}_{}_{}.png",
            event.caught_at.format("%Y%m%d_%H%M%S"),
            file_safe(&record.name),
            record.quality
        );
        let full = screen.resolution().full_region();
        let image = screen.open()?.grab(full)?;
        let path = self.screenshots_dir.join(name);
        save_screenshot(&image, &path)?;
        Ok(Some(path))
    }

    fn clear(&mut self) {
        match self.store.clear() {
            Ok(()) => info!("Fish records cleared"),
            Err(e) => warn!("Failed to clear fish records: {:#}", e),
        }
    }

    fn end_session(&self, session_id: &str) {
        info!("Session {} ended: {} caught, {}", session_id, self.catches, self.store.session_summary(session_id));

        let scope = SearchScope::Session(session_id.to_string());
        let legendary = self.store.search("", Some(Quality::Legendary), &scope);
        if !legendary.is_empty() {
            let names: Vec<&str> = legendary.iter().map(|r| r.name.as_str()).collect();
            info!("Legendary catches this session: {}", names.join(", "));
        }
    }
}

/// Replaces characters Windows does not allow in file names.
fn file_safe(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect()
}

fn save_screenshot(screen: &RgbaImage, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    screen
        .save(path)
        .with_context(|| format!("Failed to save {}", path.display()))?;
    info!("Screenshot saved: {}", path.display());
    Ok(())
}

/// Runs the recorder loop.
///
/// Processes messages until the channel is closed (every sender dropped).
/// Blocks, so it should be run in a dedicated thread. `screen` must have been
/// created on that thread; without it no screenshots are taken.
pub fn run_recorder_worker(
    receiver: Receiver<RecorderMessage>,
    mut recorder: Recorder,
    mut screen: Option<Box<dyn ScreenCapture>>,
) {
    info!("Recorder started");

    while let Ok(message) = receiver.recv() {
        match message {
            RecorderMessage::Catch(event) => match recorder.record_catch(&event) {
                Ok(Some(record)) => {
                    if let Some(screen) = screen.as_deref_mut() {
                        if let Err(e) = recorder.save_highlight(screen, &event, &record) {
                            warn!("Failed to save screenshot: {:#}", e);
                        }
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("Failed to record catch: {:#}", e),
            },
            RecorderMessage::SessionStarted(_) => recorder.catches = 0,
            RecorderMessage::SessionEnded(id) => recorder.end_session(&id),
            RecorderMessage::Clear => recorder.clear(),
        }
    }

    info!("Recorder stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Resolution;
    use crate::test_support::{FakeOcr, FakeScreen};
    use std::sync::mpsc::channel;
    use std::thread;
    use tempfile::{tempdir, TempDir};

    fn recorder(lines: &[&str], dir: &TempDir) -> Recorder {
        let engine = FakeOcr {
            lines: lines.iter().map(|s| s.to_string()).collect(),
        };
        let store = RecordStore::open(&dir.path().join("fish_records.txt")).unwrap();
        Recorder::new(Some(Box::new(engine)), store, dir.path().join("screenshots")).unwrap()
    }

    fn catch(screenshot: bool) -> CatchEvent {
        CatchEvent::new("20250601_100000", RgbaImage::new(40, 10), screenshot)
    }

    fn small_screen() -> FakeScreen {
        FakeScreen::new(Resolution::new(640, 360).unwrap())
    }

    #[test]
    fn test_records_recognised_catch() {
        let dir = tempdir().unwrap();
        let mut recorder = recorder(&["你 钓 到 了 鲈 鱼", "1.50kg 稀 有"], &dir);

        let record = recorder.record_catch(&catch(true)).unwrap().unwrap();
        assert_eq!(record.name, "鲈鱼");
        assert_eq!(record.quality, Quality::Rare);
        assert_eq!(record.weight, "1.50kg");
        assert_eq!(record.session_id, "20250601_100000");
        assert_eq!(recorder.store().records().len(), 1);
        // Not legendary, no screenshot
        assert!(!dir.path().join("screenshots").exists());
    }

    #[test]
    fn test_legendary_catch_saves_screenshot() {
        let dir = tempdir().unwrap();
        let mut screen = small_screen();
        let mut recorder = recorder(&["首次捕获 金龙鱼 2kg 传奇"], &dir);

        let event = catch(true);
        let record = recorder.record_catch(&event).unwrap().unwrap();
        let path = recorder
            .save_highlight(&mut screen, &event, &record)
            .unwrap()
            .unwrap();
        let shots: Vec<_> = fs::read_dir(dir.path().join("screenshots"))
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(shots, vec![path.clone()]);
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.ends_with("_金龙鱼_传奇.png"), "{}", name);
        assert_eq!(image::open(&path).unwrap().width(), 640);
        assert_eq!(screen.handle_counts(), (1, 1));
    }

    #[test]
    fn test_screen_is_only_grabbed_for_top_tier() {
        let dir = tempdir().unwrap();
        let mut screen = small_screen();
        let mut recorder = recorder(&["首次捕获 鲈鱼 2kg 史诗"], &dir);

        let event = catch(true);
        let record = recorder.record_catch(&event).unwrap().unwrap();
        assert!(recorder.save_highlight(&mut screen, &event, &record).unwrap().is_none());
        assert_eq!(screen.handle_counts(), (0, 0));
        assert!(!dir.path().join("screenshots").exists());
    }

    #[test]
    fn test_legendary_without_screenshot_flag_grabs_nothing() {
        let dir = tempdir().unwrap();
        let mut screen = small_screen();
        let mut recorder = recorder(&["首次捕获 金龙鱼 2kg 传奇"], &dir);

        let event = catch(false);
        let record = recorder.record_catch(&event).unwrap().unwrap();
        assert!(recorder.save_highlight(&mut screen, &event, &record).unwrap().is_none());
        assert_eq!(screen.handle_counts(), (0, 0));
    }

    #[test]
    fn test_worker_screenshots_legendary_after_ocr() {
        let dir = tempdir().unwrap();
        let screen = small_screen();
        let recorder = recorder(&["首次捕获 金龙鱼 2kg 传奇"], &dir);
        let (sender, receiver) = channel();

        let worker_screen = screen.clone();
        let worker = thread::spawn(move || {
            run_recorder_worker(receiver, recorder, Some(Box::new(worker_screen)))
        });
        sender.send(RecorderMessage::Catch(catch(true))).unwrap();
        drop(sender);
        worker.join().unwrap();

        assert_eq!(screen.handle_counts(), (1, 1));
        assert_eq!(fs::read_dir(dir.path().join("screenshots")).unwrap().count(), 1);
    }

    #[test]
    fn test_unreadable_banner_records_nothing() {
        let dir = tempdir().unwrap();
        let mut recorder = recorder(&["@@ ##"], &dir);

        assert!(recorder.record_catch(&catch(false)).unwrap().is_none());
        assert!(recorder.store().records().is_empty());
    }

    #[test]
    fn test_without_engine_nothing_is_recorded() {
        let dir = tempdir().unwrap();
        let store = RecordStore::open(&dir.path().join("r.txt")).unwrap();
        let mut recorder = Recorder::new(None, store, dir.path().to_path_buf()).unwrap();

        assert!(recorder.record_catch(&catch(false)).unwrap().is_none());
    }

    #[test]
    fn test_worker_processes_until_channel_closes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fish_records.txt");
        let recorder = recorder(&["你钓到了草鱼 0.8kg 标准"], &dir);
        let (sender, receiver) = channel();

        let worker = thread::spawn(move || run_recorder_worker(receiver, recorder, None));
        sender.send(RecorderMessage::SessionStarted("s".to_string())).unwrap();
        sender.send(RecorderMessage::Catch(catch(false))).unwrap();
        sender.send(RecorderMessage::Catch(catch(false))).unwrap();
        sender.send(RecorderMessage::SessionEnded("s".to_string())).unwrap();
        drop(sender);
        worker.join().unwrap();

        assert_eq!(RecordStore::open(&path).unwrap().records().len(), 2);
    }

    #[test]
    fn test_worker_clear() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fish_records.txt");
        let recorder = recorder(&["你钓到了草鱼 0.8kg 标准"], &dir);
        let (sender, receiver) = channel();

        let worker = thread::spawn(move || run_recorder_worker(receiver, recorder, None));
        sender.send(RecorderMessage::Catch(catch(false))).unwrap();
        sender.send(RecorderMessage::Clear).unwrap();
        drop(sender);
        worker.join().unwrap();

        assert!(RecordStore::open(&path).unwrap().records().is_empty());
    }

    #[test]
    fn test_file_safe() {
        assert_eq!(file_safe("a/b:c?"), "a_b_c_");
    }
}
