//! Source acquisition.
//!
//! Resolves a URL or local path to a playable file, its measured duration,
//! and whatever side data exists (captions, chapters, engagement heatmap).
//! Every failure here is terminal for the run.

mod local;
mod youtube;

pub use local::LocalAcquirer;
pub use youtube::YoutubeAcquirer;

use crate::captions::{load_captions, CaptionTrack};
use crate::error::{ReelcutError, Result};
use crate::media::MediaEncoder;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// A chapter marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    pub start: f64,
    pub end: f64,
}

/// One bucket of "most replayed" engagement data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatMarker {
    pub start: f64,
    pub end: f64,
    /// Relative intensity, usually normalised to 0.0-1.0.
    pub value: f64,
}

/// A downloaded or local video, immutable once acquired.
#[derive(Debug, Clone)]
pub struct MediaSource {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub path: PathBuf,
    duration: f64,
    pub captions: Option<CaptionTrack>,
    pub chapters: Vec<Chapter>,
    pub heatmap: Vec<HeatMarker>,
}

impl MediaSource {
    pub fn new(id: impl Into<String>, path: PathBuf, duration: f64) -> Result<Self> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(ReelcutError::Acquisition(format!(
                "{} has no usable duration",
                path.display()
            )));
        }
        let id = id.into();
        Ok(Self {
            title: id.clone(),
            id,
            description: None,
            path,
            duration,
            captions: None,
            chapters: Vec::new(),
            heatmap: Vec::new(),
        })
    }

    /// Total duration in seconds. Always positive.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_captions(mut self, captions: CaptionTrack) -> Self {
        self.captions = (!captions.is_empty()).then_some(captions);
        self
    }

    /// Caption text, or an empty string when there are no captions.
    pub fn transcript_text(&self) -> String {
        self.captions
            .as_ref()
            .map(|c| c.transcript_text())
            .unwrap_or_default()
    }
}

/// Fetches a source into a local working directory.
#[async_trait]
pub trait SourceAcquirer: Send + Sync {
    fn name(&self) -> &str;

    /// Check if this acquirer can handle the given input.
    fn can_handle(&self, input: &str) -> bool;

    async fn fetch(&self, input: &str, dir: &Path) -> Result<MediaSource>;
}

/// Pick the acquirer for `input`: YouTube URLs/ids first, then local files.
pub fn detect_acquirer(
    input: &str,
    encoder: Arc<dyn MediaEncoder>,
) -> Option<Box<dyn SourceAcquirer>> {
    let youtube = YoutubeAcquirer::new(encoder.clone());
    if youtube.can_handle(input) {
        return Some(Box::new(youtube));
    }

    let local = LocalAcquirer::new(encoder);
    if local.can_handle(input) {
        return Some(Box::new(local));
    }

    None
}

/// Acquire `input` into `dir`. Any failure becomes `ReelcutError::Acquisition`.
pub async fn acquire(
    input: &str,
    dir: &Path,
    encoder: Arc<dyn MediaEncoder>,
) -> Result<MediaSource> {
    let acquirer = detect_acquirer(input, encoder).ok_or_else(|| {
        ReelcutError::Acquisition(format!("Not a YouTube URL or readable video file: {}", input))
    })?;

    info!(acquirer = acquirer.name(), "Acquiring {}", input);
    let source = acquirer.fetch(input, dir).await.map_err(|e| match e {
        ReelcutError::Acquisition(_) | ReelcutError::Cancelled => e,
        other => ReelcutError::Acquisition(other.to_string()),
    })?;

    info!(
        duration = source.duration(),
        captions = source.captions.as_ref().map(|c| c.cues.len()).unwrap_or(0),
        chapters = source.chapters.len(),
        heatmap = source.heatmap.len(),
        "Acquired \"{}\"",
        source.title
    );
    Ok(source)
}

/// Load a caption sidecar, treating any problem as "no captions".
pub(crate) async fn load_sidecar(path: Option<PathBuf>) -> Option<CaptionTrack> {
    let path = path?;
    match load_captions(&path).await {
        Ok(track) if !track.is_empty() => Some(track),
        Ok(_) => None,
        Err(e) => {
            warn!(path = %path.display(), "Ignoring unreadable captions: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::testing::FakeEncoder;

    #[test]
    fn test_zero_duration_rejected() {
        let err = MediaSource::new("x", PathBuf::from("x.mp4"), 0.0).unwrap_err();
        assert!(err.is_terminal());
        assert!(MediaSource::new("x", PathBuf::from("x.mp4"), f64::NAN).is_err());
    }

    #[test]
    fn test_empty_captions_become_none() {
        let source = MediaSource::new("x", PathBuf::from("x.mp4"), 10.0)
            .unwrap()
            .with_captions(CaptionTrack::default());
        assert!(source.captions.is_none());
        assert_eq!(source.transcript_text(), "");
    }

    #[tokio::test]
    async fn test_unknown_input_is_terminal() {
        let dir = tempfile::tempdir().unwrap();
        let encoder: Arc<dyn MediaEncoder> = Arc::new(FakeEncoder::with_default(10.0));
        let err = acquire("/definitely/not/here.mp4", dir.path(), encoder)
            .await
            .unwrap_err();
        assert!(matches!(err, ReelcutError::Acquisition(_)));
    }

    #[tokio::test]
    async fn test_bad_sidecar_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.srt");
        tokio::fs::write(&path, "not captions at all").await.unwrap();
        assert!(load_sidecar(Some(path)).await.is_none());
        assert!(load_sidecar(None).await.is_none());
    }
}
