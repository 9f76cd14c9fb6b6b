//! Narration: script writing and per-sentence speech synthesis.
//!
//! The [`NarrationTimeline`] built here is measured from rendered audio and is
//! the only duration authority downstream. Nothing after this stage estimates
//! timing from text.

mod script;
mod synthesizer;

pub use script::{split_sentences, ScriptWriter};
pub use synthesizer::{Narration, NarrationSynthesizer};

use crate::error::{ReelcutError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Narrator persona.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptStyle {
    #[default]
    Ruthless,
    Educational,
    Comedic,
    Mystery,
}

impl ScriptStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScriptStyle::Ruthless => "ruthless",
            ScriptStyle::Educational => "educational",
            ScriptStyle::Comedic => "comedic",
            ScriptStyle::Mystery => "mystery",
        }
    }
}

impl std::fmt::Display for ScriptStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScriptStyle {
    type Err = ReelcutError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ruthless" => Ok(ScriptStyle::Ruthless),
            "educational" | "edu" => Ok(ScriptStyle::Educational),
            "comedic" | "comedy" => Ok(ScriptStyle::Comedic),
            "mystery" => Ok(ScriptStyle::Mystery),
            other => Err(ReelcutError::InvalidInput(format!(
                "Unknown narration style '{}'. Use ruthless, educational, comedic or mystery",
                other
            ))),
        }
    }
}

/// Sentences to be spoken, in order. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrationScript {
    pub sentences: Vec<String>,
    pub style: ScriptStyle,
    pub mood: String,
    pub target_words: usize,
    pub target_seconds: f64,
}

impl NarrationScript {
    pub fn text(&self) -> String {
        self.sentences.join(" ")
    }

    pub fn word_count(&self) -> usize {
        self.sentences.iter().map(|s| s.split_whitespace().count()).sum()
    }
}

/// Measured timing of one rendered sentence, as offsets into the narration audio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentenceTiming {
    pub sentence: String,
    pub start: f64,
    pub end: f64,
    pub duration: f64,
}

/// Contiguous, monotonically increasing sentence timings.
///
/// Only [`TimelineBuilder`] appends entries, so `entries[i].end ==
/// entries[i + 1].start` always holds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NarrationTimeline {
    entries: Vec<SentenceTiming>,
}

impl NarrationTimeline {
    pub fn entries(&self) -> &[SentenceTiming] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// End of the last sentence, 0 when empty.
    pub fn total_duration(&self) -> f64 {
        self.entries.last().map(|e| e.end).unwrap_or(0.0)
    }
}

/// Appends measured sentences with a running offset.
#[derive(Debug, Default)]
pub struct TimelineBuilder {
    entries: Vec<SentenceTiming>,
    running: f64,
}

impl TimelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sentence that rendered to `measured` seconds.
    pub fn push(&mut self, sentence: impl Into<String>, measured: f64) -> Result<&SentenceTiming> {
        if !measured.is_finite() || measured <= 0.0 {
            return Err(ReelcutError::Synthesis(format!(
                "measured duration {} is not positive",
                measured
            )));
        }

        let start = self.running;
        let end = start + measured;
        self.running = end;
        self.entries.push(SentenceTiming {
            sentence: sentence.into(),
            start,
            end,
            duration: end - start,
        });
        Ok(&self.entries[self.entries.len() - 1])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn build(self) -> NarrationTimeline {
        NarrationTimeline {
            entries: self.entries,
        }
    }
}

#[cfg(test)]
pub(crate) fn timeline_of(durations: &[(&str, f64)]) -> NarrationTimeline {
    let mut builder = TimelineBuilder::new();
    for (sentence, d) in durations {
        builder.push(*sentence, *d).unwrap();
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeline_is_contiguous() {
        let timeline = timeline_of(&[("One.", 1.37), ("Two two.", 2.91), ("Three.", 0.4), ("Four.", 5.05)]);
        let entries = timeline.entries();
        assert_eq!(entries[0].start, 0.0);
        for pair in entries.windows(2) {
            assert!((pair[0].end - pair[1].start).abs() < 1e-9);
        }
        for e in entries {
            assert!((e.duration - (e.end - e.start)).abs() < 1e-9);
        }
        assert!((timeline.total_duration() - 9.73).abs() < 1e-9);
    }

    #[test]
    fn test_builder_rejects_bad_measurements() {
        let mut builder = TimelineBuilder::new();
        assert!(builder.push("zero", 0.0).is_err());
        assert!(builder.push("nan", f64::NAN).is_err());
        assert!(builder.is_empty());
        assert_eq!(NarrationTimeline::default().total_duration(), 0.0);
    }

    #[test]
    fn test_style_parsing() {
        assert_eq!("Mystery".parse::<ScriptStyle>().unwrap(), ScriptStyle::Mystery);
        assert_eq!("comedy".parse::<ScriptStyle>().unwrap(), ScriptStyle::Comedic);
        assert!("grumpy".parse::<ScriptStyle>().is_err());
    }
}
