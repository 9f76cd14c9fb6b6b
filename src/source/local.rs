//! Local video files.

use super::{load_sidecar, MediaSource, SourceAcquirer};
use crate::error::{ReelcutError, Result};
use crate::media::MediaEncoder;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Supported video file extensions.
const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mkv", "avi", "mov", "webm", "flv", "wmv", "m4v", "mpeg", "mpg", "3gp",
];

/// Local file acquirer. The file is used in place, never copied.
pub struct LocalAcquirer {
    encoder: Arc<dyn MediaEncoder>,
}

impl LocalAcquirer {
    pub fn new(encoder: Arc<dyn MediaEncoder>) -> Self {
        Self { encoder }
    }

    fn is_video_file(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
            .unwrap_or(false)
    }
}

/// Caption sidecars next to a video, in preference order.
pub(crate) fn sidecar_candidates(path: &Path) -> Vec<PathBuf> {
    let stem = path.with_extension("");
    let stem = stem.to_string_lossy();
    ["en.vtt", "vtt", "en.srt", "srt"]
        .iter()
        .map(|ext| PathBuf::from(format!("{}.{}", stem, ext)))
        .collect()
}

#[async_trait]
impl SourceAcquirer for LocalAcquirer {
    fn name(&self) -> &str {
        "local"
    }

    fn can_handle(&self, input: &str) -> bool {
        let path = Path::new(input);
        path.is_file() && Self::is_video_file(path)
    }

    async fn fetch(&self, input: &str, _dir: &Path) -> Result<MediaSource> {
        let path = PathBuf::from(input);
        if !path.exists() {
            return Err(ReelcutError::Acquisition(format!("File not found: {}", input)));
        }

        let duration = self.encoder.probe_duration(&path).await?;
        let id = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "local".to_string());

        let sidecar = sidecar_candidates(&path).into_iter().find(|p| p.exists());
        let mut source = MediaSource::new(id.clone(), path, duration)?.with_title(id);
        if let Some(track) = load_sidecar(sidecar).await {
            source = source.with_captions(track);
        }
        Ok(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::testing::FakeEncoder;

    #[test]
    fn test_sidecar_order() {
        let c = sidecar_candidates(Path::new("/v/talk.mp4"));
        assert_eq!(c[0], PathBuf::from("/v/talk.en.vtt"));
        assert_eq!(c[3], PathBuf::from("/v/talk.srt"));
    }

    #[tokio::test]
    async fn test_fetch_with_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("talk.mp4");
        tokio::fs::write(&video, b"video").await.unwrap();
        tokio::fs::write(
            dir.path().join("talk.srt"),
            "1\n00:00:01,000 --> 00:00:02,000\nhello\n",
        )
        .await
        .unwrap();

        let acquirer = LocalAcquirer::new(Arc::new(FakeEncoder::with_default(95.0)));
        let input = video.to_string_lossy().to_string();
        assert!(acquirer.can_handle(&input));

        let source = acquirer.fetch(&input, dir.path()).await.unwrap();
        assert_eq!(source.id, "talk");
        assert_eq!(source.duration(), 95.0);
        assert_eq!(source.transcript_text(), "hello");
    }

    #[test]
    fn test_rejects_non_video() {
        let dir = tempfile::tempdir().unwrap();
        let notes = dir.path().join("notes.txt");
        std::fs::write(&notes, "x").unwrap();
        let acquirer = LocalAcquirer::new(Arc::new(FakeEncoder::default()));
        assert!(!acquirer.can_handle(&notes.to_string_lossy()));
    }
}
