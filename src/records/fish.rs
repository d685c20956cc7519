use chrono::{NaiveDateTime, SubsecRound};
use std::fmt;
use thiserror::Error;

use crate::ocr::FishInfo;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const FIELD_SEPARATOR: char = '|';
/// Stands in for `|` inside a field.
const SEPARATOR_SUBSTITUTE: &str = "／";

pub const UNKNOWN_NAME: &str = "未知";
pub const UNKNOWN_WEIGHT: &str = "-";

/// Catch rarity, lowest to highest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Quality {
    Standard,
    Extraordinary,
    Rare,
    Epic,
    Legendary,
}

impl Quality {
    pub const ALL: [Quality; 5] = [
        Quality::Standard,
        Quality::Extraordinary,
        Quality::Rare,
        Quality::Epic,
        Quality::Legendary,
    ];

    /// Every spelling OCR may produce, in lookup order.
    pub const TOKENS: [&'static str; 9] = [
        "标准", "非凡", "稀有", "史诗", "史詩", "传奇", "標準", "傳奇", "傅奇",
    ];

    /// Canonical label, as written to the record file.
    pub fn label(self) -> &'static str {
        match self {
            Quality::Standard => "标准",
            Quality::Extraordinary => "非凡",
            Quality::Rare => "稀有",
            Quality::Epic => "史诗",
            Quality::Legendary => "传奇",
        }
    }

    /// Maps any known spelling to its tier.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "标准" | "標準" => Some(Quality::Standard),
            "非凡" => Some(Quality::Extraordinary),
            "稀有" => Some(Quality::Rare),
            "史诗" | "史詩" => Some(Quality::Epic),
            "传奇" | "傳奇" | "傅奇" | "传说" => Some(Quality::Legendary),
            _ => None,
        }
    }

    /// First token (in `TOKENS` order) contained in `text`.
    pub fn find_in(text: &str) -> Option<Self> {
        Self::TOKENS
            .iter()
            .find(|token| text.contains(*token))
            .and_then(|token| Self::from_label(token))
    }

    pub fn is_top_tier(self) -> bool {
        self == Quality::Legendary
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordLineError {
    #[error("expected 5 fields, found {0}")]
    TooFewFields(usize),
    #[error("bad timestamp '{0}'")]
    BadTimestamp(String),
}

/// One caught fish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FishRecord {
    pub session_id: String,
    pub timestamp: NaiveDateTime,
    pub name: String,
    pub quality: Quality,
    pub weight: String,
}

fn sanitize(field: &str) -> String {
    field.trim().replace(FIELD_SEPARATOR, SEPARATOR_SUBSTITUTE)
}

impl FishRecord {
    /// Builds a record from a parsed banner, filling in unknown fields.
    pub fn new(session_id: &str, timestamp: NaiveDateTime, info: FishInfo) -> Self {
        Self {
            session_id: sanitize(session_id),
            timestamp: timestamp.trunc_subsecs(0),
            name: sanitize(info.name.as_deref().unwrap_or(UNKNOWN_NAME)),
            quality: info.quality.unwrap_or(Quality::Standard),
            weight: sanitize(info.weight.as_deref().unwrap_or(UNKNOWN_WEIGHT)),
        }
    }

    /// `session|timestamp|name|quality|weight`, without a newline.
    pub fn to_line(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}",
            self.session_id,
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.name,
            self.quality,
            self.weight
        )
    }

    /// Parses a record line. Extra fields are ignored; an unknown quality
    /// reads as Standard.
    pub fn from_line(line: &str) -> Result<Self, RecordLineError> {
        let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split(FIELD_SEPARATOR).collect();
        if fields.len() < 5 {
            return Err(RecordLineError::TooFewFields(fields.len()));
        }

        let timestamp = NaiveDateTime::parse_from_str(fields[1].trim(), TIMESTAMP_FORMAT)
            .map_err(|_| RecordLineError::BadTimestamp(fields[1].to_string()))?;

        Ok(Self {
            session_id: fields[0].trim().to_string(),
            timestamp,
            name: fields[2].trim().to_string(),
            quality: Quality::from_label(fields[3]).unwrap_or(Quality::Standard),
            weight: fields[4].trim().to_string(),
        })
    }
}
