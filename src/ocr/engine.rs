use anyhow::{bail, Context, Result};
use image::GrayImage;
use std::path::PathBuf;
use std::process::Command;
use tempfile::NamedTempFile;

use super::setup::TesseractPaths;

/// Lines scoring below this (0-100) are treated as noise.
pub const MIN_LINE_CONFIDENCE: f32 = 20.0;

/// One recognised line and the mean confidence of its words.
#[derive(Debug, Clone)]
pub struct OcrLine {
    pub text: String,
    pub confidence: f32,
}

/// Text recognition backend.
pub trait OcrEngine: Send {
    fn recognize(&self, image: &GrayImage) -> Result<Vec<OcrLine>>;
}

/// Shells out to the Tesseract CLI.
pub struct TesseractEngine {
    executable: PathBuf,
    tessdata: PathBuf,
    language: String,
}

impl TesseractEngine {
    pub const LANGUAGE: &'static str = "chi_sim";

    pub fn new(paths: TesseractPaths) -> Self {
        Self {
            executable: paths.executable,
            tessdata: paths.tessdata,
            language: Self::LANGUAGE.to_string(),
        }
    }
}

impl OcrEngine for TesseractEngine {
    fn recognize(&self, image: &GrayImage) -> Result<Vec<OcrLine>> {
        let temp_input = NamedTempFile::with_suffix(".png")?;
        image
            .save(temp_input.path())
            .context("Failed to write OCR input image")?;

        // Tesseract appends .tsv to the output base
        let temp_output = NamedTempFile::new()?;
        let output_base = temp_output.path().to_string_lossy().to_string();

        let mut command = Command::new(&self.executable);
        command
            .arg(temp_input.path())
            .arg(&output_base)
            .arg("--tessdata-dir")
            .arg(&self.tessdata)
            .arg("-l")
            .arg(&self.language)
            .arg("--psm")
            .arg("6") // Assume single uniform block of text
            .arg("tsv");
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            command.creation_flags(CREATE_NO_WINDOW);
        }

        let output = command
            .output()
            .with_context(|| format!("Failed to run {}", self.executable.display()))?;
        if !output.status.success() {
            bail!("Tesseract failed: {}", String::from_utf8_lossy(&output.stderr));
        }

        let tsv_path = format!("{}.tsv", output_base);
        let tsv_content =
            std::fs::read_to_string(&tsv_path).context("Failed to read Tesseract output")?;
        let _ = std::fs::remove_file(&tsv_path);

        Ok(parse_tsv_output(&tsv_content))
    }
}

/// Closes a line from its `(text, confidence)` words.
fn finish_line(lines: &mut Vec<OcrLine>, words: Vec<(String, f32)>) {
    if words.is_empty() {
        return;
    }
    let confidence = words.iter().map(|(_, conf)| conf).sum::<f32>() / words.len() as f32;
    let text = words
        .iter()
        .map(|(text, _)| text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    lines.push(OcrLine { text, confidence });
}

/// Parses Tesseract TSV output into structured OcrLine data
pub fn parse_tsv_output(tsv: &str) -> Vec<OcrLine> {
    let mut lines: Vec<OcrLine> = Vec::new();
    let mut current_line: Option<(i32, i32, i32)> = None;
    let mut current_words: Vec<(String, f32)> = Vec::new();

    for line in tsv.lines().skip(1) {
        // level, page_num, block_num, par_num, line_num, word_num,
        // left, top, width, height, conf, text
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 12 {
            continue;
        }

        let level: i32 = fields[0].parse().unwrap_or(-1);
        let text = fields[11].trim();
        // Level 5 = word
        if level != 5 || text.is_empty() {
            continue;
        }

        let key = (
            fields[2].parse().unwrap_or(-1),
            fields[3].parse().unwrap_or(-1),
            fields[4].parse().unwrap_or(-1),
        );
        if current_line.is_some_and(|current| current != key) {
            finish_line(&mut lines, std::mem::take(&mut current_words));
        }
        current_line = Some(key);

        let conf: f32 = fields[10].parse().unwrap_or(-1.0);
        if conf >= 0.0 {
            current_words.push((text.to_string(), conf));
        }
    }
    finish_line(&mut lines, current_words);

    lines
}

pub fn is_cjk(c: char) -> bool {
    matches!(c, '\u{3400}'..='\u{4DBF}' | '\u{4E00}'..='\u{9FFF}' | '\u{F900}'..='\u{FAFF}')
}

/// Joins recognised lines into one string.
///
/// Lines below [`MIN_LINE_CONFIDENCE`] are skipped. Tesseract separates
/// Chinese characters with spaces; whitespace between two CJK characters is
/// dropped, all other runs collapse to one space.
pub fn join_lines(lines: &[OcrLine]) -> String {
    let joined = lines
        .iter()
        .filter(|line| line.confidence >= MIN_LINE_CONFIDENCE)
        .map(|line| line.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    let chars: Vec<char> = joined.chars().collect();
    let mut out = String::with_capacity(joined.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i].is_whitespace() {
            let start = i;
            while i < chars.len() && chars[i].is_whitespace() {
                i += 1;
            }
            let before = start.checked_sub(1).map(|j| chars[j]);
            let after = chars.get(i).copied();
            match (before, after) {
                (Some(b), Some(a)) if is_cjk(b) && is_cjk(a) => {}
                (Some(_), Some(_)) => out.push(' '),
                _ => {}
            }
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    fn word(line: i32, conf: &str, text: &str) -> String {
        format!("5\t1\t1\t1\t{}\t1\t0\t0\t10\t10\t{}\t{}", line, conf, text)
    }

    #[test]
    fn test_parse_tsv_groups_words_by_line() {
        let tsv = [
            HEADER.to_string(),
            "4\t1\t1\t1\t1\t0\t0\t0\t100\t10\t-1\t".to_string(),
            word(1, "90", "你"),
            word(1, "80", "钓到了"),
            word(2, "70", "1.50kg"),
            word(2, "-1", "junk"),
        ]
        .join("\n");

        let lines = parse_tsv_output(&tsv);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "你 钓到了");
        assert!((lines[0].confidence - 85.0).abs() < 1e-4);
        assert_eq!(lines[1].text, "1.50kg");
    }

    #[test]
    fn test_parse_tsv_empty() {
        assert!(parse_tsv_output(HEADER).is_empty());
        assert!(parse_tsv_output("").is_empty());
    }

    fn line(text: &str) -> OcrLine {
        OcrLine {
            text: text.to_string(),
            confidence: 90.0,
        }
    }

    #[test]
    fn test_join_lines_drops_spaces_inside_chinese() {
        let lines = [line("你 钓 到 了  鲈 鱼"), line("1.50 kg 稀 有")];
        assert_eq!(join_lines(&lines), "你钓到了鲈鱼 1.50 kg 稀有");
    }

    #[test]
    fn test_join_lines_skips_low_confidence_lines() {
        let noise = OcrLine {
            text: "@@ ##".to_string(),
            confidence: 12.0,
        };
        assert_eq!(join_lines(&[line("你 钓 到 了 草 鱼"), noise]), "你钓到了草鱼");
    }

    #[test]
    fn test_low_confidence_tsv_line_never_reaches_text() {
        let tsv = [HEADER.to_string(), word(1, "95", "草鱼"), word(2, "8", "~~")].join("\n");
        assert_eq!(join_lines(&parse_tsv_output(&tsv)), "草鱼");
    }

    #[test]
    fn test_join_lines_trims() {
        assert_eq!(join_lines(&[line("  abc  "), line(" ")]), "abc");
    }
}
