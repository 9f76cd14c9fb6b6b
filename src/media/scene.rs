//! Scene-change detection.

use crate::error::{ReelcutError, Result};
use async_trait::async_trait;
use regex::Regex;
use std::path::Path;
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::process::Command;
use tracing::{info, instrument};

/// Frame-difference detector returning scene-change timestamps in seconds.
#[async_trait]
pub trait SceneDetector: Send + Sync {
    /// `sensitivity` is the scene score threshold (0.0-1.0, lower is more sensitive).
    async fn detect(&self, media: &Path, sensitivity: f64) -> Result<Vec<f64>>;
}

/// ffmpeg `select='gt(scene,T)',showinfo` detector.
pub struct FfmpegSceneDetector {
    timeout: Duration,
}

impl Default for FfmpegSceneDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegSceneDetector {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(900),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl SceneDetector for FfmpegSceneDetector {
    #[instrument(skip(self, media), fields(media = %media.display()))]
    async fn detect(&self, media: &Path, sensitivity: f64) -> Result<Vec<f64>> {
        let filter = format!("select='gt(scene,{})',showinfo", sensitivity.clamp(0.0, 1.0));

        let run = Command::new("ffmpeg")
            .arg("-hide_banner")
            .arg("-i")
            .arg(media)
            .arg("-vf")
            .arg(&filter)
            .arg("-f")
            .arg("null")
            .arg("-")
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, run).await {
            Err(_) => return Err(ReelcutError::Timeout(self.timeout.as_secs())),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ReelcutError::ToolNotFound("ffmpeg".into()));
            }
            Ok(Err(e)) => return Err(ReelcutError::Encoder(format!("ffmpeg error: {e}"))),
            Ok(Ok(o)) => o,
        };

        if !output.status.success() {
            return Err(ReelcutError::Encoder("scene detection failed".into()));
        }

        let timestamps = parse_scene_timestamps(&String::from_utf8_lossy(&output.stderr));
        info!("Detected {} scene changes", timestamps.len());
        Ok(timestamps)
    }
}

/// Extract `pts_time:` values from `showinfo` output, sorted and deduplicated.
pub fn parse_scene_timestamps(stderr: &str) -> Vec<f64> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"pts_time:(\d+(?:\.\d+)?)").expect("Invalid regex"));

    let mut times: Vec<f64> = re
        .captures_iter(stderr)
        .filter_map(|c| c.get(1)?.as_str().parse::<f64>().ok())
        .collect();
    times.sort_by(|a, b| a.total_cmp(b));
    times.dedup_by(|a, b| (*a - *b).abs() < 1e-6);
    times
}
