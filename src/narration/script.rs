//! Narration script writing through the text provider chain.

use super::{NarrationScript, ScriptStyle};
use crate::config::Prompts;
use crate::error::{ReelcutError, Result};
use crate::extract::parse_json_object;
use crate::provider::{FallbackChain, Resolved, TextGenerator};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};

/// Transcript characters sent to the model.
const TRANSCRIPT_CHARS: usize = 6000;
/// Transcript characters used verbatim when every provider fails.
const FALLBACK_CHARS: usize = 500;
const EMPTY_TRANSCRIPT_LINE: &str = "Watch what happens next.";

#[derive(Debug, Deserialize)]
struct ScriptReply {
    #[serde(default)]
    mood: Option<String>,
    #[serde(default)]
    narration: Option<String>,
    #[serde(default)]
    sentences: Vec<String>,
}

/// Split text into sentences on `.`, `!` and `?`, keeping the punctuation.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') {
            // Keep runs like "?!" and "..." together
            while let Some(&next) = chars.peek() {
                if matches!(next, '.' | '!' | '?' | '"' | '\'') {
                    current.push(next);
                    chars.next();
                } else {
                    break;
                }
            }
            if chars.peek().map(|n| n.is_whitespace()).unwrap_or(true) {
                push_trimmed(&mut sentences, &current);
                current.clear();
            }
        }
    }
    push_trimmed(&mut sentences, &current);
    sentences
}

fn push_trimmed(sentences: &mut Vec<String>, text: &str) {
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if !text.is_empty() {
        sentences.push(text);
    }
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Writes narration scripts in one of the narrator personas.
pub struct ScriptWriter {
    chain: FallbackChain<dyn TextGenerator>,
    prompts: Arc<Prompts>,
    words_per_second: f64,
}

impl ScriptWriter {
    pub fn new(chain: FallbackChain<dyn TextGenerator>, prompts: Arc<Prompts>, words_per_second: f64) -> Self {
        Self {
            chain,
            prompts,
            words_per_second,
        }
    }

    pub fn target_words(&self, target_seconds: f64) -> usize {
        (target_seconds * self.words_per_second).floor().max(1.0) as usize
    }

    /// Write a script, falling back to the transcript itself when no provider answers.
    #[instrument(skip(self, transcript), fields(chars = transcript.len()))]
    pub async fn write(
        &self,
        transcript: &str,
        style: ScriptStyle,
        target_seconds: f64,
    ) -> Resolved<NarrationScript> {
        let target_words = self.target_words(target_seconds);

        let mut vars = HashMap::new();
        vars.insert("target_words".to_string(), target_words.to_string());
        vars.insert("target_seconds".to_string(), format!("{:.0}", target_seconds));
        vars.insert(
            "transcript".to_string(),
            truncate_chars(transcript, TRANSCRIPT_CHARS).to_string(),
        );

        let system = self
            .prompts
            .render_with_custom(self.prompts.script.persona(style.as_str()), &vars);
        let user = self.prompts.render_with_custom(&self.prompts.script.user, &vars);

        let resolved = self
            .chain
            .attempt_or(
                "script",
                |provider| {
                    let (system, user) = (system.clone(), user.clone());
                    async move {
                        let text = provider.generate(&system, &user).await?;
                        parse_script(&text)
                    }
                },
                || fallback_script(transcript),
            )
            .await;

        let (mood, sentences) = resolved.value;
        info!(
            source = %resolved.source,
            sentences = sentences.len(),
            "Script ready ({} mood)",
            mood
        );

        Resolved {
            value: NarrationScript {
                sentences,
                style,
                mood,
                target_words,
                target_seconds,
            },
            source: resolved.source,
        }
    }
}

/// Mood and sentences from a model reply.
fn parse_script(text: &str) -> Result<(String, Vec<String>)> {
    let reply: ScriptReply = parse_json_object(text)?;

    let mut sentences: Vec<String> = reply
        .sentences
        .iter()
        .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|s| !s.is_empty())
        .collect();
    if sentences.is_empty() {
        sentences = reply.narration.as_deref().map(split_sentences).unwrap_or_default();
    }
    if sentences.is_empty() {
        return Err(ReelcutError::MalformedOutput("script has no sentences".into()));
    }

    let mood = reply
        .mood
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| "Neutral".to_string());
    Ok((mood, sentences))
}

fn fallback_script(transcript: &str) -> (String, Vec<String>) {
    let excerpt = truncate_chars(transcript.trim(), FALLBACK_CHARS);
    let mut sentences = split_sentences(excerpt);
    if sentences.is_empty() {
        sentences.push(EMPTY_TRANSCRIPT_LINE.to_string());
    }
    ("Neutral".to_string(), sentences)
}
