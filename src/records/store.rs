//! Append-only record file plus an in-memory copy for queries.

use anyhow::{Context, Result};
use log::{info, warn};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::fish::{FishRecord, Quality};

/// Which records a search looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchScope {
    All,
    Session(String),
}

/// Counts per quality, including zero counts, lowest tier first.
pub fn quality_counts<'a>(records: impl IntoIterator<Item = &'a FishRecord>) -> BTreeMap<Quality, usize> {
    let mut counts: BTreeMap<Quality, usize> = Quality::ALL.iter().map(|&q| (q, 0)).collect();
    for record in records {
        *counts.entry(record.quality).or_default() += 1;
    }
    counts
}

pub struct RecordStore {
    path: PathBuf,
    records: Vec<FishRecord>,
}

impl RecordStore {
    /// Loads every well-formed line of `path`. A missing file is an empty store.
    pub fn open(path: &Path) -> Result<Self> {
        let mut records = Vec::new();
        if path.exists() {
            let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
            let mut skipped = 0;
            for line in String::from_utf8_lossy(&bytes).lines() {
                if line.trim().is_empty() {
                    continue;
                }
                match FishRecord::from_line(line) {
                    Ok(record) => records.push(record),
                    Err(_) => skipped += 1,
                }
            }
            if skipped > 0 {
                warn!("Skipped {} malformed lines in {}", skipped, path.display());
            }
        }
        info!("Loaded {} fish records", records.len());

        Ok(Self {
            path: path.to_path_buf(),
            records,
        })
    }

    pub fn records(&self) -> &[FishRecord] {
        &self.records
    }

    pub fn append(&mut self, record: FishRecord) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;
        writeln!(file, "{}", record.to_line())
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        self.records.push(record);
        Ok(())
    }

    /// Removes every record, truncating the file.
    pub fn clear(&mut self) -> Result<()> {
        fs::write(&self.path, "").with_context(|| format!("Failed to clear {}", self.path.display()))?;
        self.records.clear();
        Ok(())
    }

    /// Records whose name contains `keyword`, ignoring case (empty matches
    /// all), optionally of one quality.
    pub fn search(&self, keyword: &str, quality: Option<Quality>, scope: &SearchScope) -> Vec<&FishRecord> {
        let keyword = keyword.trim().to_lowercase();
        self.records
            .iter()
            .filter(|r| match scope {
                SearchScope::All => true,
                SearchScope::Session(id) => &r.session_id == id,
            })
            .filter(|r| quality.is_none_or(|q| r.quality == q))
            .filter(|r| keyword.is_empty() || r.name.to_lowercase().contains(&keyword))
            .collect()
    }

    pub fn session_records(&self, session_id: &str) -> Vec<&FishRecord> {
        self.search("", None, &SearchScope::Session(session_id.to_string()))
    }

    /// One-line summary such as `3 fish (标准 2, 稀有 1)`.
    pub fn session_summary(&self, session_id: &str) -> String {
        let records = self.session_records(session_id);
        if records.is_empty() {
            return "no fish recorded".to_string();
        }
        let tiers = quality_counts(records.iter().copied())
            .into_iter()
            .filter(|&(_, count)| count > 0)
            .map(|(quality, count)| format!("{} {}", quality, count))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{} fish ({})", records.len(), tiers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::FishInfo;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn record(session: &str, name: &str, quality: Quality) -> FishRecord {
        let ts = NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        FishRecord::new(
            session,
            ts,
            FishInfo {
                name: Some(name.to_string()),
                quality: Some(quality),
                weight: Some("1.00kg".to_string()),
            },
        )
    }

    #[test]
    fn test_append_persists_and_reloads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fish_records.txt");

        let mut store = RecordStore::open(&path).unwrap();
        assert!(store.records().is_empty());
        store.append(record("s1", "鲈鱼", Quality::Rare)).unwrap();
        store.append(record("s1", "草鱼", Quality::Standard)).unwrap();

        let reloaded = RecordStore::open(&path).unwrap();
        assert_eq!(reloaded.records(), store.records());
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fish_records.txt");
        fs::write(
            &path,
            "garbage\n\ns1|2025-06-01 10:00:00|鲈鱼|稀有|1.00kg\nshort|line\n",
        )
        .unwrap();

        let store = RecordStore::open(&path).unwrap();
        assert_eq!(store.records().len(), 1);
        assert_eq!(store.records()[0].name, "鲈鱼");
    }

    #[test]
    fn test_clear_truncates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fish_records.txt");
        let mut store = RecordStore::open(&path).unwrap();
        store.append(record("s1", "鲈鱼", Quality::Rare)).unwrap();

        store.clear().unwrap();
        assert!(store.records().is_empty());
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_search_and_summary() {
        let dir = tempdir().unwrap();
        let mut store = RecordStore::open(&dir.path().join("r.txt")).unwrap();
        store.append(record("s1", "鲈鱼", Quality::Rare)).unwrap();
        store.append(record("s1", "大鲈鱼", Quality::Legendary)).unwrap();
        store.append(record("s2", "草鱼", Quality::Rare)).unwrap();

        assert_eq!(store.search("鲈", None, &SearchScope::All).len(), 2);
        assert_eq!(store.search("", Some(Quality::Rare), &SearchScope::All).len(), 2);
        assert_eq!(
            store
                .search("", Some(Quality::Rare), &SearchScope::Session("s2".to_string()))
                .len(),
            1
        );

        assert_eq!(store.session_summary("s1"), "2 fish (稀有 1, 传奇 1)");
        assert_eq!(store.session_summary("nope"), "no fish recorded");

        let counts = quality_counts(store.records());
        assert_eq!(counts[&Quality::Rare], 2);
        assert_eq!(counts[&Quality::Standard], 0);
    }

    #[test]
    fn test_search_ignores_case() {
        let dir = tempdir().unwrap();
        let mut store = RecordStore::open(&dir.path().join("r.txt")).unwrap();
        store.append(record("s1", "Bass", Quality::Standard)).unwrap();
        store.append(record("s1", "SEA BASS", Quality::Epic)).unwrap();

        assert_eq!(store.search("bass", None, &SearchScope::All).len(), 2);
        assert_eq!(store.search("Sea", None, &SearchScope::All).len(), 1);
        assert_eq!(store.search("bass", Some(Quality::Epic), &SearchScope::All).len(), 1);
    }
}
