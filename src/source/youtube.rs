//! YouTube acquisition through yt-dlp.

use super::{load_sidecar, Chapter, HeatMarker, MediaSource, SourceAcquirer};
use crate::error::{ReelcutError, Result};
use crate::media::{download_captions, download_video, fetch_video_info, MediaEncoder};
use async_trait::async_trait;
use regex::Regex;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, instrument};

/// YouTube acquirer.
pub struct YoutubeAcquirer {
    video_id_regex: Regex,
    encoder: Arc<dyn MediaEncoder>,
}

impl YoutubeAcquirer {
    pub fn new(encoder: Arc<dyn MediaEncoder>) -> Self {
        // Matches various YouTube URL formats and bare video IDs
        let video_id_regex = Regex::new(
            r"(?x)
            (?:
                (?:https?://)?
                (?:www\.|m\.)?
                (?:youtube\.com/watch\?(?:.*&)?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/shorts/|youtube\.com/v/)
                ([a-zA-Z0-9_-]{11})
            )
            |
            ^([a-zA-Z0-9_-]{11})$
        ",
        )
        .expect("Invalid regex");

        Self {
            video_id_regex,
            encoder,
        }
    }

    /// Extract video ID from a YouTube URL or bare ID.
    pub fn extract_video_id(&self, input: &str) -> Option<String> {
        let caps = self.video_id_regex.captures(input.trim())?;
        caps.get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().to_string())
    }
}

/// Fields of `yt-dlp --dump-json` the pipeline cares about.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct VideoInfo {
    pub title: Option<String>,
    pub description: Option<String>,
    pub duration: Option<f64>,
    pub chapters: Vec<Chapter>,
    pub heatmap: Vec<HeatMarker>,
}

pub(crate) fn parse_video_info(json: &serde_json::Value) -> VideoInfo {
    let chapters = json["chapters"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|c| {
                    Some(Chapter {
                        title: c["title"].as_str().unwrap_or("Untitled").to_string(),
                        start: c["start_time"].as_f64()?,
                        end: c["end_time"].as_f64()?,
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let heatmap = json["heatmap"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|h| {
                    Some(HeatMarker {
                        start: h["start_time"].as_f64()?,
                        end: h["end_time"].as_f64()?,
                        value: h["value"].as_f64()?,
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    VideoInfo {
        title: json["title"].as_str().map(|s| s.to_string()),
        description: json["description"].as_str().map(|s| s.to_string()),
        duration: json["duration"].as_f64().filter(|d| *d > 0.0),
        chapters,
        heatmap,
    }
}

#[async_trait]
impl SourceAcquirer for YoutubeAcquirer {
    fn name(&self) -> &str {
        "youtube"
    }

    fn can_handle(&self, input: &str) -> bool {
        // A local file named like an id is still a local file
        !Path::new(input).exists() && self.extract_video_id(input).is_some()
    }

    #[instrument(skip(self, dir))]
    async fn fetch(&self, input: &str, dir: &Path) -> Result<MediaSource> {
        let video_id = self.extract_video_id(input).ok_or_else(|| {
            ReelcutError::Acquisition(format!("Invalid YouTube video ID or URL: {}", input))
        })?;
        let url = format!("https://www.youtube.com/watch?v={}", video_id);

        let info = parse_video_info(&fetch_video_info(&url).await?);
        debug!(?info.duration, chapters = info.chapters.len(), "Fetched metadata");

        let path = download_video(&url, &video_id, dir).await?;

        let duration = match info.duration {
            Some(d) => d,
            None => self.encoder.probe_duration(&path).await?,
        };

        let captions_path = match download_captions(&url, &video_id, dir).await {
            Ok(p) => p,
            Err(e) => {
                debug!("No captions: {}", e);
                None
            }
        };

        let mut source = MediaSource::new(video_id, path, duration)?;
        if let Some(title) = info.title {
            source = source.with_title(title);
        }
        source.description = info.description;
        source.chapters = info.chapters;
        source.heatmap = info.heatmap;
        if let Some(track) = load_sidecar(captions_path).await {
            source = source.with_captions(track);
        }
        Ok(source)
    }
}
