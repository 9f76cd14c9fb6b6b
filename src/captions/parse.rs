//! SRT and WebVTT parsing.
//!
//! Both dialects are block based: blank-line separated blocks, a timing line
//! containing `-->`, then text lines. SRT prefixes a numeric index, VTT has a
//! `WEBVTT` header, optional cue identifiers and cue settings after the end
//! timestamp. One block parser handles both.

use super::time::parse_timestamp;
use super::{CaptionCue, CaptionTrack};
use crate::error::{ReelcutError, Result};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("Invalid regex"))
}

fn annotation_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[[^\]]*\]").expect("Invalid regex"))
}

/// Parse an SRT document.
pub fn parse_srt(content: &str) -> Result<CaptionTrack> {
    parse_blocks(content, false)
}

/// Parse a WebVTT document.
pub fn parse_vtt(content: &str) -> Result<CaptionTrack> {
    parse_blocks(content, true)
}

/// Parse either dialect, detected by the `WEBVTT` header.
pub fn parse_captions(content: &str) -> Result<CaptionTrack> {
    let head = content.trim_start_matches('\u{feff}').trim_start();
    if head.starts_with("WEBVTT") {
        parse_vtt(content)
    } else {
        parse_srt(content)
    }
}

/// Read and parse a caption file from disk.
pub async fn load_captions(path: &Path) -> Result<CaptionTrack> {
    let content = tokio::fs::read_to_string(path).await?;
    let is_vtt = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("vtt"))
        .unwrap_or(false);

    let track = if is_vtt {
        parse_vtt(&content)?
    } else {
        parse_captions(&content)?
    };

    tracing::debug!(path = %path.display(), cues = track.cues.len(), "Loaded captions");
    Ok(track)
}

/// Strip markup and annotations from one caption line.
pub fn clean_line(line: &str) -> String {
    let no_tags = tag_regex().replace_all(line, "");
    let no_notes = annotation_regex().replace_all(&no_tags, "");
    let decoded = no_notes
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&#39;", "'")
        .replace("&quot;", "\"");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_blocks(content: &str, vtt: bool) -> Result<CaptionTrack> {
    let normalized = content
        .trim_start_matches('\u{feff}')
        .replace("\r\n", "\n")
        .replace('\r', "\n");

    let mut cues = Vec::new();
    let mut last_line: Option<String> = None;
    let mut saw_timing = false;

    for block in normalized.split("\n\n") {
        let lines: Vec<&str> = block.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        let Some(timing_idx) = lines.iter().position(|l| l.contains("-->")) else {
            // Header, NOTE, STYLE, REGION or stray text
            continue;
        };
        saw_timing = true;

        let Some((start, end)) = parse_timing(lines[timing_idx]) else {
            tracing::debug!(line = lines[timing_idx], "Skipping unparseable timing line");
            continue;
        };

        let mut kept = Vec::new();
        for raw in &lines[timing_idx + 1..] {
            let line = clean_line(raw);
            if line.is_empty() {
                continue;
            }
            // Rolling auto-captions repeat the previous line at the top of each cue
            if last_line.as_deref() == Some(line.as_str()) {
                continue;
            }
            last_line = Some(line.clone());
            kept.push(line);
        }

        if kept.is_empty() || end <= start {
            continue;
        }
        cues.push(CaptionCue::new(start, end, kept.join(" ")));
    }

    if !saw_timing && !normalized.trim().is_empty() && !(vtt && is_header_only(&normalized)) {
        return Err(ReelcutError::Captions(
            "no timing lines found".to_string(),
        ));
    }

    Ok(CaptionTrack::from_cues(cues))
}

fn is_header_only(content: &str) -> bool {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .all(|l| l.starts_with("WEBVTT") || l.contains(':'))
}

fn parse_timing(line: &str) -> Option<(f64, f64)> {
    let (left, right) = line.split_once("-->")?;
    let start = parse_timestamp(left)?;
    let end_token = right.split_whitespace().next()?;
    let end = parse_timestamp(end_token)?;
    Some((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRT: &str = "1\r\n00:00:01,000 --> 00:00:03,500\r\n<i>Hello</i> there\r\n\r\n2\r\n00:00:03,500 --> 00:00:06,000\r\n[Music]\r\nGeneral Kenobi\r\n\r\n";

    const VTT: &str = "WEBVTT\nKind: captions\nLanguage: en\n\n00:00:00.000 --> 00:00:02.000 align:start position:0%\nwe<00:00:00.500><c> start</c> here\n\n00:00:02.000 --> 00:00:04.000 align:start position:0%\nwe start here\nand keep going\n\n00:00:04.000 --> 00:00:05.000\nand keep going\n";

    #[test]
    fn test_parse_srt() {
        let track = parse_srt(SRT).unwrap();
        assert_eq!(track.cues.len(), 2);
        assert_eq!(track.cues[0].text, "Hello there");
        assert_eq!(track.cues[0].start, 1.0);
        assert_eq!(track.cues[0].end, 3.5);
        assert_eq!(track.cues[1].text, "General Kenobi");
    }

    #[test]
    fn test_parse_vtt_rolling_duplicates() {
        let track = parse_captions(VTT).unwrap();
        // Third cue only repeats the previous line and is dropped
        assert_eq!(track.cues.len(), 2);
        assert_eq!(track.cues[0].text, "we start here");
        assert_eq!(track.cues[1].text, "and keep going");
        assert_eq!(track.transcript_text(), "we start here and keep going");
    }

    #[test]
    fn test_clean_line() {
        assert_eq!(clean_line("<b>Tom &amp; Jerry</b>  [Applause]"), "Tom & Jerry");
        assert_eq!(clean_line("[Music]"), "");
    }

    #[test]
    fn test_inverted_cue_dropped() {
        let srt = "1\n00:00:05,000 --> 00:00:04,000\nbackwards\n\n2\n00:00:06,000 --> 00:00:07,000\nforwards\n";
        let track = parse_srt(srt).unwrap();
        assert_eq!(track.cues.len(), 1);
        assert_eq!(track.cues[0].text, "forwards");
    }

    #[test]
    fn test_not_captions() {
        assert!(parse_srt("just some words\nwithout timing").is_err());
        assert!(parse_captions("").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.en.vtt");
        tokio::fs::write(&path, VTT).await.unwrap();
        let track = load_captions(&path).await.unwrap();
        assert_eq!(track.cues.len(), 2);
    }
}
