//! Burned-in narration subtitles, timed from the measured timeline.

use crate::captions::format_srt_timestamp;
use crate::config::CaptionSettings;
use crate::narration::NarrationTimeline;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;

/// How narration words are chunked and decorated on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleStyle {
    /// 1-3 words per chunk; 0 picks per sentence.
    pub words_per_chunk: usize,
    pub uppercase: bool,
    /// Probability that a chunk is drawn in a palette colour.
    pub highlight_ratio: f64,
    pub palette: Vec<String>,
}

impl Default for SubtitleStyle {
    fn default() -> Self {
        Self::from_settings(&CaptionSettings::default())
    }
}

impl SubtitleStyle {
    pub fn from_settings(settings: &CaptionSettings) -> Self {
        Self {
            words_per_chunk: settings.words_per_chunk,
            uppercase: settings.uppercase,
            highlight_ratio: settings.highlight_ratio,
            palette: settings.palette.clone(),
        }
    }

    /// Plain chunks, no colour.
    pub fn plain(words_per_chunk: usize) -> Self {
        Self {
            words_per_chunk,
            uppercase: false,
            highlight_ratio: 0.0,
            palette: Vec::new(),
        }
    }

    fn chunk_size(&self, sentence_words: usize) -> usize {
        match self.words_per_chunk {
            0 if sentence_words > 10 => 2,
            0 => 3,
            n => n.clamp(1, 3),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubtitleCue {
    pub start: f64,
    pub end: f64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SubtitleTrack {
    pub cues: Vec<SubtitleCue>,
}

impl SubtitleTrack {
    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    /// SRT with `<font color>` tags for highlighted chunks.
    pub fn to_srt(&self) -> String {
        let mut out = String::new();
        for (i, cue) in self.cues.iter().enumerate() {
            out.push_str(&format!(
                "{}\n{} --> {}\n",
                i + 1,
                format_srt_timestamp(cue.start),
                format_srt_timestamp(cue.end)
            ));
            match &cue.color {
                Some(color) => out.push_str(&format!("<font color=\"{}\">{}</font>", color, cue.text)),
                None => out.push_str(&cue.text),
            }
            out.push_str("\n\n");
        }
        out
    }
}

/// Chunk each sentence's words and share its measured duration between the
/// chunks by word count.
///
/// Cues are contiguous, start at each sentence's start, and the last chunk of
/// a sentence ends exactly on the sentence end. No cue ends after the
/// narration does.
pub fn derive_subtitles(timeline: &NarrationTimeline, style: &SubtitleStyle, seed: u64) -> SubtitleTrack {
    let total = timeline.total_duration();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut cues = Vec::new();

    for entry in timeline.entries() {
        let words: Vec<&str> = entry.sentence.split_whitespace().collect();
        if words.is_empty() {
            continue;
        }

        let chunks: Vec<&[&str]> = words.chunks(style.chunk_size(words.len())).collect();
        let mut cursor = entry.start;

        for (k, chunk) in chunks.iter().enumerate() {
            let end = if k + 1 == chunks.len() {
                entry.end
            } else {
                cursor + entry.duration * chunk.len() as f64 / words.len() as f64
            };
            let end = end.min(total);
            if end <= cursor {
                continue;
            }

            let mut text = chunk.join(" ");
            if style.uppercase {
                text = text.to_uppercase();
            }
            let color = if style.highlight_ratio > 0.0 && rng.gen::<f64>() < style.highlight_ratio {
                style.palette.choose(&mut rng).cloned()
            } else {
                None
            };

            cues.push(SubtitleCue {
                start: cursor,
                end,
                text,
                color,
            });
            cursor = end;
        }
    }

    SubtitleTrack { cues }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::narration::timeline_of;

    #[test]
    fn test_proportional_chunks() {
        let timeline = timeline_of(&[("one two three four five six", 3.0)]);
        let track = derive_subtitles(&timeline, &SubtitleStyle::plain(2), 0);
        let spans: Vec<_> = track.cues.iter().map(|c| (c.start, c.end)).collect();
        assert_eq!(spans.len(), 3);
        assert!((spans[0].1 - 1.0).abs() < 1e-9);
        assert!((spans[1].1 - 2.0).abs() < 1e-9);
        assert_eq!(spans[2].1, 3.0);
        assert_eq!(track.cues[0].text, "one two");
    }

    #[test]
    fn test_dynamic_chunk_size() {
        let long = "a b c d e f g h i j k l";
        let timeline = timeline_of(&[(long, 6.0), ("x y z", 1.5)]);
        let track = derive_subtitles(&timeline, &SubtitleStyle::plain(0), 0);
        assert_eq!(track.cues.len(), 7);
        assert_eq!(track.cues[6].text, "x y z");
        assert_eq!(track.cues[6].start, 6.0);
    }

    #[test]
    fn test_cues_contiguous_and_bounded() {
        let timeline = timeline_of(&[
            ("The lights went out at midnight.", 2.31),
            ("Nobody moved.", 0.97),
            ("Then, from the basement, came a sound nobody could explain at all.", 4.18),
        ]);
        let total = timeline.total_duration();
        let track = derive_subtitles(&timeline, &SubtitleStyle::default(), 42);

        assert_eq!(track.cues[0].start, 0.0);
        for pair in track.cues.windows(2) {
            assert!((pair[0].end - pair[1].start).abs() < 1e-9);
        }
        for cue in &track.cues {
            assert!(cue.end <= total);
            assert!(cue.start < cue.end);
            assert_eq!(cue.text, cue.text.to_uppercase());
        }
        assert_eq!(track.cues.last().unwrap().end, total);
    }

    #[test]
    fn test_highlighting_is_seeded() {
        let timeline = timeline_of(&[("a b c d e f g h i j k l m n o p", 8.0)]);
        let style = SubtitleStyle {
            highlight_ratio: 0.5,
            ..SubtitleStyle::default()
        };
        let a = derive_subtitles(&timeline, &style, 7);
        let b = derive_subtitles(&timeline, &style, 7);
        assert_eq!(a, b);
        assert!(a.cues.iter().all(|c| c.color.is_none() || style.palette.contains(c.color.as_ref().unwrap())));
    }

    #[test]
    fn test_srt_output() {
        let timeline = timeline_of(&[("hi there", 1.5)]);
        let mut track = derive_subtitles(&timeline, &SubtitleStyle::plain(3), 0);
        track.cues[0].color = Some("#FFFF00".into());
        assert_eq!(
            track.to_srt(),
            "1\n00:00:00,000 --> 00:00:01,500\n<font color=\"#FFFF00\">hi there</font>\n\n"
        );
    }
}
