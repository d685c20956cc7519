//! Turns the OCR text of the catch banner into name, quality and weight.
//!
//! Banner text looks like `你钓到了【鲈鱼】 1.50kg 稀有` or
//! `首次捕获 金龙鱼 1500g 传奇`, in simplified or traditional script, with
//! the usual OCR confusions (`约` for `钓`, `傅` for `傳`).

use anyhow::Result;
use regex::Regex;

use super::engine::is_cjk;
use crate::records::Quality;

const WEIGHT_PATTERN: &str = r"(?i)(\d+\.?\d*)\s*(kg|g|千克|克|公斤)?";
const NAME_PATTERN: &str = r"(?:你?[钓釣約]到了|首次?捕[获獲])\s*[「【\[]?\s*(.+?)\s*[」】\]]?\s*(?:[标標][准準]|非凡|稀有|史[诗詩]|传奇|傳奇|[傳傅]奇)?$";
const PREFIX_PATTERN: &str = r"你?[钓釣約](?:到了|到)|(?:首次)?捕[获獲]";
const NON_NAME_PATTERN: &str = r"[^\x{3400}-\x{4DBF}\x{4E00}-\x{9FFF}\x{F900}-\x{FAFF}a-zA-Z\s]";

/// Parsed banner. Every field is optional; OCR misses are normal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FishInfo {
    pub name: Option<String>,
    pub quality: Option<Quality>,
    /// Formatted as `"{:.2}kg"`
    pub weight: Option<String>,
}

impl FishInfo {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.quality.is_none() && self.weight.is_none()
    }
}

pub struct FishInfoParser {
    weight: Regex,
    name: Regex,
    prefix: Regex,
    non_name: Regex,
    spaces: Regex,
}

impl FishInfoParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            weight: Regex::new(WEIGHT_PATTERN)?,
            name: Regex::new(NAME_PATTERN)?,
            prefix: Regex::new(PREFIX_PATTERN)?,
            non_name: Regex::new(NON_NAME_PATTERN)?,
            spaces: Regex::new(r"\s+")?,
        })
    }

    pub fn parse(&self, text: &str) -> FishInfo {
        let text = text.trim();
        if text.is_empty() {
            return FishInfo::default();
        }
        FishInfo {
            name: self.parse_name(text),
            quality: Quality::find_in(text),
            weight: self.parse_weight(text),
        }
    }

    /// Last number in the text, grams converted to kilograms.
    fn parse_weight(&self, text: &str) -> Option<String> {
        let caps = self.weight.captures_iter(text).last()?;
        let value: f64 = caps.get(1)?.as_str().parse().ok()?;
        let unit = caps.get(2).map(|m| m.as_str().to_lowercase());
        let kg = match unit.as_deref() {
            Some("g") | Some("克") => value / 1000.0,
            _ => value,
        };
        Some(format!("{:.2}kg", kg))
    }

    fn parse_name(&self, text: &str) -> Option<String> {
        if let Some(caps) = self.name.captures(text) {
            let cleaned = self.clean(caps.get(1).map_or("", |m| m.as_str()), "");
            if cleaned.chars().count() >= 2 {
                return Some(repair_name(cleaned));
            }
        }

        // No banner prefix: strip everything that is not part of a name
        let stripped = self.prefix.replace_all(text, " ");
        let cleaned = self.clean(&stripped, " ");
        let longest_run = cleaned
            .split(|c: char| !is_cjk(c))
            .filter(|run| run.chars().count() >= 2)
            .max_by_key(|run| run.chars().count());

        match longest_run {
            Some(run) => Some(repair_name(run.to_string())),
            None if cleaned.chars().count() >= 2 => Some(repair_name(cleaned)),
            None => None,
        }
    }

    /// Removes weights, quality words and symbols, then collapses whitespace.
    fn clean(&self, text: &str, symbol_replacement: &str) -> String {
        let mut text = self.weight.replace_all(text, "").into_owned();
        for token in Quality::TOKENS {
            text = text.replace(token, " ");
        }
        let text = self.non_name.replace_all(&text, symbol_replacement);
        self.spaces.replace_all(&text, " ").trim().to_string()
    }
}

/// 美髯公 is often read as 美X公 or split by spaces.
fn repair_name(name: String) -> String {
    let compact: String = name.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.contains("美髯公")
        || (compact.contains('美') && compact.contains('公') && compact.chars().count() <= 3)
    {
        return "美髯公".to_string();
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> FishInfo {
        FishInfoParser::new().unwrap().parse(text)
    }

    #[test]
    fn test_full_banner() {
        let info = parse("你钓到了鲈鱼 1.50kg 稀有");
        assert_eq!(info.name.as_deref(), Some("鲈鱼"));
        assert_eq!(info.quality, Some(Quality::Rare));
        assert_eq!(info.weight.as_deref(), Some("1.50kg"));
    }

    #[test]
    fn test_first_catch_with_brackets_and_grams() {
        let info = parse("首次捕获【金龙鱼】 1500g 传奇");
        assert_eq!(info.name.as_deref(), Some("金龙鱼"));
        assert_eq!(info.quality, Some(Quality::Legendary));
        assert_eq!(info.weight.as_deref(), Some("1.50kg"));
    }

    #[test]
    fn test_chinese_units() {
        assert_eq!(parse("钓到了草鱼 800克").weight.as_deref(), Some("0.80kg"));
        assert_eq!(parse("鲤鱼 2公斤").weight.as_deref(), Some("2.00kg"));
        assert_eq!(parse("鲤鱼 2.5千克").weight.as_deref(), Some("2.50kg"));
        assert_eq!(parse("鲤鱼 3.1KG").weight.as_deref(), Some("3.10kg"));
    }

    #[test]
    fn test_last_number_is_the_weight() {
        assert_eq!(parse("3 条 1.25kg").weight.as_deref(), Some("1.25kg"));
    }

    #[test]
    fn test_quality_token_order() {
        assert_eq!(parse("标准 传奇").quality, Some(Quality::Standard));
        assert_eq!(parse("史詩").quality, Some(Quality::Epic));
        assert_eq!(parse("傅奇").quality, Some(Quality::Legendary));
    }

    #[test]
    fn test_traditional_and_misread_prefix() {
        let info = parse("你約到了「鱸魚」 0.9kg 標準");
        assert_eq!(info.name.as_deref(), Some("鱸魚"));
        assert_eq!(info.quality, Some(Quality::Standard));
        assert_eq!(info.weight.as_deref(), Some("0.90kg"));
    }

    #[test]
    fn test_latin_name() {
        assert_eq!(parse("你钓到了Bass 1.2kg").name.as_deref(), Some("Bass"));
    }

    #[test]
    fn test_fallback_takes_longest_chinese_run() {
        let info = parse("鲤 大鲤鱼王 2公斤");
        assert_eq!(info.name.as_deref(), Some("大鲤鱼王"));
    }

    #[test]
    fn test_name_repair() {
        assert_eq!(parse("你钓到了美冉公 2kg").name.as_deref(), Some("美髯公"));
        assert_eq!(parse("你钓到了美髯 公").name.as_deref(), Some("美髯公"));
    }

    #[test]
    fn test_nothing_recognised() {
        assert!(parse("").is_empty());
        assert!(parse("  !! ").is_empty());
    }
}
