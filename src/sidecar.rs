//! JSON metadata written next to each output video.

use crate::config::Prompts;
use crate::error::{ReelcutError, Result};
use crate::extract::parse_json_object;
use crate::provider::{FallbackChain, Resolved, TextGenerator};
use crate::selection::Segment;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::debug;

const MAX_TITLE_CHARS: usize = 100;

/// Upload metadata for one short.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl VideoMetadata {
    /// Deterministic metadata derived from the source title.
    pub fn fallback(source_title: &str) -> Self {
        let title: String = source_title.trim().chars().take(MAX_TITLE_CHARS).collect();
        let title = if title.is_empty() { "Short".to_string() } else { title };
        Self {
            description: format!("A short cut from \"{}\".", title),
            title,
            tags: vec!["shorts".to_string()],
        }
    }

    fn normalized(mut self) -> Result<Self> {
        self.title = self.title.trim().chars().take(MAX_TITLE_CHARS).collect();
        if self.title.is_empty() {
            return Err(ReelcutError::MalformedOutput("metadata title is empty".into()));
        }
        self.description = self.description.trim().to_string();
        let mut seen = HashSet::new();
        self.tags = self
            .tags
            .into_iter()
            .map(|t| t.trim().trim_start_matches('#').to_lowercase())
            .filter(|t| !t.is_empty() && seen.insert(t.clone()))
            .collect();
        Ok(self)
    }
}

/// Ask the text chain for metadata, falling back to the source title.
pub async fn generate_metadata(
    chain: &FallbackChain<dyn TextGenerator>,
    prompts: &Prompts,
    source_title: &str,
    summary: &str,
) -> Resolved<VideoMetadata> {
    let mut vars = HashMap::new();
    vars.insert("title".to_string(), source_title.to_string());
    vars.insert("summary".to_string(), summary.chars().take(2000).collect::<String>());

    let system = prompts.render_with_custom(&prompts.metadata.system, &vars);
    let user = prompts.render_with_custom(&prompts.metadata.user, &vars);

    chain
        .attempt_or(
            "metadata",
            |provider| {
                let (system, user) = (system.clone(), user.clone());
                async move {
                    let text = provider.generate(&system, &user).await?;
                    parse_json_object::<VideoMetadata>(&text)?.normalized()
                }
            },
            || VideoMetadata::fallback(source_title),
        )
        .await
}

/// Everything recorded about one output.
#[derive(Debug, Clone, Serialize)]
pub struct Sidecar {
    #[serde(flatten)]
    pub metadata: VideoMetadata,
    /// Which provider wrote the metadata, or "fallback".
    pub metadata_source: String,
    pub source_id: String,
    pub source_title: String,
    pub segments: Vec<Segment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narration_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped_sentences: Vec<String>,
    pub seed: u64,
    pub created_at: DateTime<Utc>,
}

/// `<video>.json` next to `video`.
pub fn sidecar_path(video: &Path) -> PathBuf {
    video.with_extension("json")
}

pub async fn write_sidecar(video: &Path, sidecar: &Sidecar) -> Result<PathBuf> {
    let path = sidecar_path(video);
    let json = serde_json::to_string_pretty(sidecar)?;
    tokio::fs::write(&path, json).await?;
    debug!(path = %path.display(), "Wrote sidecar");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::testing::{text_chain, ScriptedText};
    use crate::selection::SegmentOrigin;

    #[tokio::test]
    async fn test_metadata_from_provider_is_normalized() {
        let chain = text_chain(vec![ScriptedText::ok(
            "groq",
            r##"{"title": "  The Basement Sound ", "description": "Nobody expected it.", "tags": ["#Mystery", "mystery", "shorts"]}"##,
        )]);
        let meta = generate_metadata(&chain, &Prompts::default(), "Long Video", "a sound").await;
        assert!(!meta.is_fallback());
        assert_eq!(meta.value.title, "The Basement Sound");
        assert_eq!(meta.value.tags, vec!["mystery", "shorts"]);
    }

    #[test]
    fn test_tags_deduplicated_in_first_seen_order() {
        let meta = VideoMetadata {
            title: "T".into(),
            description: String::new(),
            tags: vec!["a".into(), "#B".into(), "a".into(), "b".into(), " ".into()],
        }
        .normalized()
        .unwrap();
        assert_eq!(meta.tags, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_metadata_fallback_uses_source_title() {
        let chain = text_chain(vec![ScriptedText::failing("groq")]);
        let meta = generate_metadata(&chain, &Prompts::default(), "Deep Dive", "").await;
        assert!(meta.is_fallback());
        assert_eq!(meta.value, VideoMetadata::fallback("Deep Dive"));
        assert_eq!(VideoMetadata::fallback("  ").title, "Short");
    }

    #[tokio::test]
    async fn test_sidecar_written_next_to_video() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("clip_01.mp4");
        let sidecar = Sidecar {
            metadata: VideoMetadata::fallback("Deep Dive"),
            metadata_source: "fallback".into(),
            source_id: "abc".into(),
            source_title: "Deep Dive".into(),
            segments: vec![Segment::new(30.0, 90.0, "test", SegmentOrigin::GoldenZone)],
            narration_seconds: None,
            skipped_sentences: Vec::new(),
            seed: 7,
            created_at: Utc::now(),
        };

        let path = write_sidecar(&video, &sidecar).await.unwrap();
        assert_eq!(path, dir.path().join("clip_01.json"));

        let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["title"], "Deep Dive");
        assert_eq!(json["tags"][0], "shorts");
        assert_eq!(json["segments"][0]["origin"]["kind"], "golden_zone");
        assert!(json.get("narration_seconds").is_none());
    }
}
