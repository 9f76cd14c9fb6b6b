//! Sentence-by-sentence speech synthesis.

use super::{NarrationScript, NarrationTimeline, TimelineBuilder};
use crate::context::RunContext;
use crate::error::{ReelcutError, Result};
use crate::media::MediaEncoder;
use crate::provider::{FallbackChain, SpeechSynthesizer};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Narration longer than this multiple of the target gets a warning.
const OVERRUN_WARNING: f64 = 1.25;

/// Rendered narration track and its measured timeline.
#[derive(Debug, Clone)]
pub struct Narration {
    pub audio_path: PathBuf,
    pub timeline: NarrationTimeline,
    /// Sentences that no voice could render.
    pub skipped: Vec<String>,
}

impl Narration {
    pub fn duration(&self) -> f64 {
        self.timeline.total_duration()
    }
}

/// Renders each sentence separately, measures it, and joins the clips.
pub struct NarrationSynthesizer {
    speech: FallbackChain<dyn SpeechSynthesizer>,
    encoder: Arc<dyn MediaEncoder>,
    trim_silence: bool,
}

impl NarrationSynthesizer {
    pub fn new(
        speech: FallbackChain<dyn SpeechSynthesizer>,
        encoder: Arc<dyn MediaEncoder>,
        trim_silence: bool,
    ) -> Self {
        Self {
            speech,
            encoder,
            trim_silence,
        }
    }

    #[instrument(skip_all, fields(run = %ctx.run_id, sentences = script.sentences.len()))]
    pub async fn synthesize(&self, ctx: &RunContext, script: &NarrationScript) -> Result<Narration> {
        ctx.prepare().await?;

        let mut builder = TimelineBuilder::new();
        let mut clips = Vec::with_capacity(script.sentences.len());
        let mut skipped = Vec::new();

        for (i, sentence) in script.sentences.iter().enumerate() {
            ctx.ensure_active()?;

            let raw = ctx.path(&format!("sentence_{:03}.mp3", i));
            let spoken = self
                .speech
                .attempt("speech", |voice| {
                    let (text, out) = (sentence.clone(), raw.clone());
                    async move { voice.speak(&text, &out).await }
                })
                .await;

            match spoken {
                Ok(resolved) => debug!(sentence = i, voice = %resolved.source, "Rendered"),
                Err(ReelcutError::Cancelled) => return Err(ReelcutError::Cancelled),
                Err(e) => {
                    warn!(sentence = i, "Skipping sentence: {}", e);
                    skipped.push(sentence.clone());
                    continue;
                }
            }

            let clip = if self.trim_silence {
                let trimmed = ctx.path(&format!("sentence_{:03}_trim.mp3", i));
                match self.encoder.trim_silence(&raw, &trimmed).await {
                    Ok(()) => trimmed,
                    Err(e) => {
                        debug!(sentence = i, "Silence trim failed, using raw clip: {}", e);
                        raw
                    }
                }
            } else {
                raw
            };

            let measured = match self.encoder.probe_duration(&clip).await {
                Ok(d) => d,
                Err(e) => {
                    warn!(sentence = i, "Could not measure clip, skipping: {}", e);
                    skipped.push(sentence.clone());
                    continue;
                }
            };

            match builder.push(sentence.clone(), measured) {
                Ok(timing) => debug!(sentence = i, start = timing.start, end = timing.end, "Measured"),
                Err(e) => {
                    warn!(sentence = i, "Skipping sentence: {}", e);
                    skipped.push(sentence.clone());
                    continue;
                }
            }
            clips.push(clip);
        }

        if builder.is_empty() {
            return Err(ReelcutError::Synthesis(format!(
                "none of {} sentences could be rendered",
                script.sentences.len()
            )));
        }

        ctx.ensure_active()?;
        let audio_path = ctx.path("narration.mp3");
        self.encoder.concat_copy(&clips, &audio_path).await?;

        let timeline = builder.build();
        let total = timeline.total_duration();
        if script.target_seconds > 0.0 && total > script.target_seconds * OVERRUN_WARNING {
            warn!(
                "Narration runs {:.1}s against a {:.0}s target; keeping the measured length",
                total, script.target_seconds
            );
        }
        info!(
            duration = total,
            rendered = timeline.len(),
            skipped = skipped.len(),
            "Narration rendered"
        );

        Ok(Narration {
            audio_path,
            timeline,
            skipped,
        })
    }
}
