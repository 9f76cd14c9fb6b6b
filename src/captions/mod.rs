//! Caption tracks: parsing source subtitles and writing derived ones.

mod parse;
mod time;

pub use time::{format_srt_timestamp, parse_timestamp};
pub use parse::{clean_line, load_captions, parse_captions, parse_srt, parse_vtt};

use serde::{Deserialize, Serialize};

/// A single timed caption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionCue {
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds.
    pub end: f64,
    pub text: String,
}

impl CaptionCue {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}

/// An ordered, non-overlapping sequence of cues.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaptionTrack {
    pub cues: Vec<CaptionCue>,
}

impl CaptionTrack {
    /// Build a track, sorting cues and trimming overlaps.
    pub fn from_cues(mut cues: Vec<CaptionCue>) -> Self {
        cues.retain(|c| c.start.is_finite() && c.end.is_finite());
        cues.sort_by(|a, b| a.start.total_cmp(&b.start));

        for i in 0..cues.len().saturating_sub(1) {
            let next_start = cues[i + 1].start;
            if cues[i].end > next_start {
                cues[i].end = next_start;
            }
        }
        cues.retain(|c| c.end > c.start);

        Self { cues }
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    /// End of the last cue.
    pub fn duration(&self) -> f64 {
        self.cues.last().map(|c| c.end).unwrap_or(0.0)
    }

    /// Plain transcript text.
    pub fn transcript_text(&self) -> String {
        self.cues
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// One `[12.3s] text` line per cue, stopping before `max_chars` is exceeded.
    pub fn timestamped_text(&self, max_chars: usize) -> String {
        let mut out = String::new();
        for cue in &self.cues {
            let line = format!("[{:.1}s] {}\n", cue.start, cue.text);
            if out.len() + line.len() > max_chars {
                break;
            }
            out.push_str(&line);
        }
        out
    }

    /// Cues overlapping `[start, end)`, clipped and re-based so `start` is zero.
    pub fn window(&self, start: f64, end: f64) -> CaptionTrack {
        let cues = self
            .cues
            .iter()
            .filter(|c| c.end > start && c.start < end)
            .map(|c| {
                CaptionCue::new(
                    c.start.max(start) - start,
                    c.end.min(end) - start,
                    c.text.clone(),
                )
            })
            .filter(|c| c.end > c.start)
            .collect();
        CaptionTrack { cues }
    }

    pub fn to_srt(&self) -> String {
        let mut out = String::new();
        for (i, cue) in self.cues.iter().enumerate() {
            out.push_str(&format!(
                "{}\n{} --> {}\n{}\n\n",
                i + 1,
                format_srt_timestamp(cue.start),
                format_srt_timestamp(cue.end),
                cue.text
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track() -> CaptionTrack {
        CaptionTrack::from_cues(vec![
            CaptionCue::new(10.0, 14.0, "second"),
            CaptionCue::new(0.0, 12.0, "first"),
            CaptionCue::new(20.0, 25.0, "third"),
        ])
    }

    #[test]
    fn test_sorted_and_trimmed() {
        let t = track();
        assert_eq!(t.cues[0].text, "first");
        assert_eq!(t.cues[0].end, 10.0);
        for pair in t.cues.windows(2) {
            assert!(pair[0].end <= pair[1].start);
        }
        assert_eq!(t.duration(), 25.0);
    }

    #[test]
    fn test_window_rebases() {
        let w = track().window(12.0, 22.0);
        assert_eq!(w.cues.len(), 2);
        assert_eq!(w.cues[0], CaptionCue::new(0.0, 2.0, "second"));
        assert_eq!(w.cues[1], CaptionCue::new(8.0, 10.0, "third"));
    }

    #[test]
    fn test_window_to_srt() {
        let srt = track().window(12.0, 22.0).to_srt();
        assert_eq!(
            srt,
            "1\n00:00:00,000 --> 00:00:02,000\nsecond\n\n2\n00:00:08,000 --> 00:00:10,000\nthird\n\n"
        );
    }

    #[test]
    fn test_timestamped_text_is_capped() {
        let t = track();
        let full = t.timestamped_text(10_000);
        assert!(full.starts_with("[0.0s] first\n"));
        assert!(full.contains("[20.0s] third"));

        let capped = t.timestamped_text(20);
        assert_eq!(capped, "[0.0s] first\n");
    }

    #[test]
    fn test_transcript_text() {
        assert_eq!(track().transcript_text(), "first second third");
    }
}
