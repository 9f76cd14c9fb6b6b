//! Transcript analysis through the text provider chain.

use super::{Segment, SegmentOrigin, SegmentSelector, SelectionOptions};
use crate::config::Prompts;
use crate::error::{ReelcutError, Result};
use crate::extract::parse_json_object;
use crate::provider::{FallbackChain, ResolvedBy, TextGenerator};
use crate::source::MediaSource;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Asks a language model for the most engaging span of the transcript.
pub struct TranscriptSelector {
    chain: FallbackChain<dyn TextGenerator>,
    prompts: Arc<Prompts>,
}

/// What the model is asked to return.
#[derive(Debug, Deserialize)]
pub(crate) struct SegmentReply {
    #[serde(deserialize_with = "seconds")]
    pub start: f64,
    #[serde(deserialize_with = "seconds")]
    pub end: f64,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub hook: Option<String>,
}

/// Models sometimes quote numbers.
fn seconds<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Number(f64),
        Text(String),
    }

    match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Number(n) => Ok(n),
        NumberOrText::Text(s) => s
            .trim()
            .trim_end_matches('s')
            .parse()
            .map_err(serde::de::Error::custom),
    }
}

/// Parse and sanity-check a model reply.
pub(crate) fn parse_reply(text: &str) -> Result<SegmentReply> {
    let reply: SegmentReply = parse_json_object(text)?;
    if !reply.start.is_finite() || !reply.end.is_finite() || reply.end <= reply.start {
        return Err(ReelcutError::MalformedOutput(format!(
            "segment {}..{} is not a forward range",
            reply.start, reply.end
        )));
    }
    Ok(reply)
}

impl TranscriptSelector {
    pub fn new(chain: FallbackChain<dyn TextGenerator>, prompts: Arc<Prompts>) -> Self {
        Self { chain, prompts }
    }
}

#[async_trait]
impl SegmentSelector for TranscriptSelector {
    fn name(&self) -> &str {
        "transcript"
    }

    #[instrument(skip_all, fields(source = %source.id))]
    async fn select(&self, source: &MediaSource, options: &SelectionOptions) -> Result<Vec<Segment>> {
        let captions = source
            .captions
            .as_ref()
            .ok_or_else(|| ReelcutError::Selection("no transcript available".into()))?;

        let mut vars = HashMap::new();
        vars.insert("clip_seconds".to_string(), format!("{:.0}", options.clip_seconds));
        vars.insert("title".to_string(), source.title.clone());
        vars.insert("duration".to_string(), format!("{:.0}", source.duration()));
        vars.insert(
            "transcript".to_string(),
            captions.timestamped_text(options.transcript_max_chars),
        );

        let system = self.prompts.render_with_custom(&self.prompts.selection.system, &vars);
        let user = self.prompts.render_with_custom(&self.prompts.selection.user, &vars);
        debug!(prompt_chars = user.len(), "Requesting segment analysis");

        let resolved = self
            .chain
            .attempt("segment analysis", |provider| {
                let (system, user) = (system.clone(), user.clone());
                async move {
                    let text = provider.generate(&system, &user).await?;
                    parse_reply(&text)
                }
            })
            .await?;

        let provider = match resolved.source {
            ResolvedBy::Provider(name) => name,
            ResolvedBy::Fallback => "fallback".to_string(),
        };
        let reply = resolved.value;
        let rationale = if reply.reason.trim().is_empty() {
            format!("Picked by {}", provider)
        } else {
            reply.reason
        };

        Ok(vec![Segment::new(
            reply.start,
            reply.end,
            rationale,
            SegmentOrigin::Transcript { provider },
        )
        .with_hook(reply.hook)])
    }
}
