//! SubRip (`.srt`) reader.
//!
//! Files are decoded as UTF-8 first and re-read as Latin-1 when that fails.
//! Cue blocks that do not carry a timing line, or whose timing does not fit
//! in the timestamp range, are skipped.

use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::{SubtitleLine, Timestamp};

fn timing_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d+):(\d{1,2}):(\d{1,2})[,.](\d{1,3})\s*-->\s*(\d+):(\d{1,2}):(\d{1,2})[,.](\d{1,3})")
            .expect("valid timing pattern")
    })
}

fn markup_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>|\{[^}]*\}").expect("valid markup pattern"))
}

/// Text with styling tags removed and line breaks folded into spaces.
pub fn strip_markup(text: &str) -> String {
    let stripped = markup_re().replace_all(text, "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Reads a subtitle file with the UTF-8 → Latin-1 fallback.
pub fn read_file(path: &Path) -> Result<Vec<SubtitleLine>> {
    let bytes = fs::read(path).map_err(|e| Error::Decode { path: path.to_path_buf(), reason: e.to_string() })?;
    let content = decode(&bytes);
    let lines = parse(&content);
    if lines.is_empty() && !content.trim().is_empty() {
        return Err(Error::Decode { path: path.to_path_buf(), reason: "no caption events found".into() });
    }
    Ok(lines)
}

/// UTF-8 when valid, otherwise every byte maps to the Latin-1 code point.
pub fn decode(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.trim_start_matches('\u{feff}').to_string(),
        Err(_) => {
            debug!("subtitle is not valid UTF-8, falling back to Latin-1");
            bytes.iter().map(|&b| char::from(b)).collect()
        }
    }
}

/// Parses SubRip content into ordered caption events.
pub fn parse(content: &str) -> Vec<SubtitleLine> {
    let normalized = content.replace("\r\n", "\n").replace('\r', "\n");
    let mut lines = Vec::new();
    let mut block: Vec<&str> = Vec::new();
    for raw in normalized.lines().chain(std::iter::once("")) {
        if raw.trim().is_empty() {
            if let Some(line) = parse_block(&block) {
                lines.push(line);
            }
            block.clear();
        } else {
            block.push(raw);
        }
    }
    lines
}

fn parse_block(block: &[&str]) -> Option<SubtitleLine> {
    let timing_pos = block.iter().position(|l| timing_re().is_match(l))?;
    let caps = timing_re().captures(block[timing_pos])?;
    let num = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u64>().ok());
    let millis = |i: usize| {
        let raw = caps.get(i).map_or("0", |m| m.as_str());
        // ",5" means 500ms, not 5ms
        format!("{raw:0<3}").parse::<u64>().ok()
    };
    let start = Timestamp::from_parts(num(1)?, num(2)?, num(3)?, millis(4)?);
    let end = Timestamp::from_parts(num(5)?, num(6)?, num(7)?, millis(8)?);
    let (Some(start), Some(end)) = (start, end) else {
        debug!(timing = %block[timing_pos], "cue timing out of range, skipping cue");
        return None;
    };
    let text = block[timing_pos + 1..].join("\n");
    Some(SubtitleLine::new(start, end, text))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "1\r\n00:00:01,000 --> 00:00:02,500\r\n<i>Hello</i> there.\r\n\r\n2\r\n00:00:03,000 --> 00:00:04,000\r\nGeneral {\\an8}Kenobi!\r\nYou are a bold one.\r\n";

    #[test]
    fn parses_blocks_and_multiline_text() {
        let lines = parse(SAMPLE);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].start, Timestamp(1000));
        assert_eq!(lines[0].end, Timestamp(2500));
        assert_eq!(lines[1].text, "General {\\an8}Kenobi!\nYou are a bold one.");
    }

    #[test]
    fn strips_tags_and_folds_newlines() {
        assert_eq!(strip_markup("<i>Hello</i>\nthere"), "Hello there");
        assert_eq!(strip_markup("{\\an8}<font color=\"red\">Run</font>!"), "Run!");
    }

    #[test]
    fn latin1_fallback() {
        let bytes = b"1\n00:00:01,000 --> 00:00:02,000\nCaf\xe9\n";
        let lines = parse(&decode(bytes));
        assert_eq!(lines[0].text, "Café");
    }

    #[test]
    fn utf8_bom_is_ignored() {
        let content = decode("\u{feff}1\n00:00:01,000 --> 00:00:02,000\nHi\n".as_bytes());
        assert_eq!(parse(&content).len(), 1);
    }

    #[test]
    fn block_without_timing_is_skipped() {
        let lines = parse("garbage\n\n1\n00:00:01,000 --> 00:00:02,000\nok\n");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "ok");
    }

    #[test]
    fn out_of_range_hours_drop_the_cue() {
        let content = "1\n99999999999999999:00:00,000 --> 99999999999999999:00:01,000\nhello\n\n\
                       2\n00:00:05,000 --> 00:00:06,000\nstill here\n";
        let lines = parse(content);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "still here");
    }

    #[test]
    fn file_with_only_overflowing_cues_is_a_decode_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("damaged.srt");
        std::fs::write(&path, "1\n99999999999999999:00:00,000 --> 99999999999999999:00:01,000\nhello\n").unwrap();
        assert!(matches!(read_file(&path), Err(Error::Decode { .. })));
    }

    #[test]
    fn unreadable_content_is_a_decode_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("broken.srt");
        std::fs::write(&path, "not a subtitle at all").unwrap();
        assert!(matches!(read_file(&path), Err(Error::Decode { .. })));
        assert!(matches!(read_file(&tmp.path().join("missing.srt")), Err(Error::Decode { .. })));
    }
}
