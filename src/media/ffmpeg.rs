//! `MediaEncoder` over the ffmpeg and ffprobe command-line tools.

use super::{CompositionSpec, Framing, MediaEncoder};
use crate::error::{ReelcutError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

const SILENCE_FILTER: &str = "silenceremove=start_periods=1:start_silence=0.1:start_threshold=-50dB,silenceremove=stop_periods=-1:stop_duration=0.1:stop_threshold=-50dB";

/// Runs every operation as an ffmpeg subprocess with a deadline.
#[derive(Clone)]
pub struct FfmpegEncoder {
    timeout: Duration,
    cancel: Option<watch::Receiver<bool>>,
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegEncoder {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(600),
            cancel: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Kill running processes once the signal flips to `true`.
    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    async fn run(&self, tool: &str, args: &[String]) -> Result<Output> {
        debug!("Running: {} {}", tool, args.join(" "));

        let child = Command::new(tool)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ReelcutError::ToolNotFound(tool.to_string())
                } else {
                    ReelcutError::Encoder(format!("{} failed to start: {}", tool, e))
                }
            })?;

        // Dropping the future drops the child, and kill_on_drop reaps it
        let wait = tokio::time::timeout(self.timeout, child.wait_with_output());
        let mut cancel = self.cancel.clone();

        let output = tokio::select! {
            result = wait => match result {
                Ok(output) => output?,
                Err(_) => {
                    warn!("{} timed out after {}s, killing process", tool, self.timeout.as_secs());
                    return Err(ReelcutError::Timeout(self.timeout.as_secs()));
                }
            },
            _ = wait_cancelled(&mut cancel) => {
                debug!("{} cancelled, killing process", tool);
                return Err(ReelcutError::Cancelled);
            }
        };

        Ok(output)
    }

    async fn ffmpeg(&self, args: Vec<String>) -> Result<()> {
        let mut full = vec![
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
        ];
        full.extend(args);

        let output = self.run("ffmpeg", &full).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ReelcutError::Encoder(format!(
                "ffmpeg exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

async fn wait_cancelled(cancel: &mut Option<watch::Receiver<bool>>) {
    match cancel {
        Some(rx) => loop {
            if *rx.borrow() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        },
        None => std::future::pending::<()>().await,
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

/// Parse `ffprobe -print_format json -show_format` output.
pub(crate) fn parse_probe_duration(json: &str) -> Result<f64> {
    let parsed: serde_json::Value = serde_json::from_str(json)
        .map_err(|_| ReelcutError::Encoder("Invalid ffprobe output".into()))?;

    parsed["format"]["duration"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .ok_or_else(|| ReelcutError::Encoder("Could not determine media duration".into()))
}

/// Whether `ffprobe -show_streams -select_streams a` listed any stream.
pub(crate) fn parse_has_audio(json: &str) -> Result<bool> {
    let parsed: serde_json::Value = serde_json::from_str(json)
        .map_err(|_| ReelcutError::Encoder("Invalid ffprobe output".into()))?;

    Ok(parsed["streams"]
        .as_array()
        .is_some_and(|streams| !streams.is_empty()))
}

/// Body of a concat-demuxer list file.
pub(crate) fn concat_list(inputs: &[PathBuf]) -> String {
    inputs
        .iter()
        .map(|p| format!("file '{}'\n", path_arg(p).replace('\'', "'\\''")))
        .collect()
}

#[async_trait]
impl MediaEncoder for FfmpegEncoder {
    async fn probe_duration(&self, path: &Path) -> Result<f64> {
        let args = vec![
            "-v".to_string(),
            "quiet".to_string(),
            "-print_format".to_string(),
            "json".to_string(),
            "-show_format".to_string(),
            path_arg(path),
        ];
        let output = self.run("ffprobe", &args).await?;
        if !output.status.success() {
            return Err(ReelcutError::Encoder(format!(
                "ffprobe could not read {}",
                path.display()
            )));
        }
        parse_probe_duration(&String::from_utf8_lossy(&output.stdout))
    }

    async fn has_audio(&self, path: &Path) -> Result<bool> {
        let args = vec![
            "-v".to_string(),
            "quiet".to_string(),
            "-print_format".to_string(),
            "json".to_string(),
            "-select_streams".to_string(),
            "a".to_string(),
            "-show_streams".to_string(),
            path_arg(path),
        ];
        let output = self.run("ffprobe", &args).await?;
        if !output.status.success() {
            return Err(ReelcutError::Encoder(format!(
                "ffprobe could not read {}",
                path.display()
            )));
        }
        parse_has_audio(&String::from_utf8_lossy(&output.stdout))
    }

    async fn trim_silence(&self, input: &Path, output: &Path) -> Result<()> {
        self.ffmpeg(vec![
            "-i".into(),
            path_arg(input),
            "-af".into(),
            SILENCE_FILTER.into(),
            path_arg(output),
        ])
        .await
    }

    #[instrument(skip(self, inputs), fields(count = inputs.len()))]
    async fn concat_copy(&self, inputs: &[PathBuf], output: &Path) -> Result<()> {
        if inputs.is_empty() {
            return Err(ReelcutError::InvalidInput("nothing to concatenate".into()));
        }

        let list_path = output.with_extension("concat.txt");
        tokio::fs::write(&list_path, concat_list(inputs)).await?;

        let result = self
            .ffmpeg(vec![
                "-f".into(),
                "concat".into(),
                "-safe".into(),
                "0".into(),
                "-i".into(),
                path_arg(&list_path),
                "-c".into(),
                "copy".into(),
                path_arg(output),
            ])
            .await;

        let _ = tokio::fs::remove_file(&list_path).await;
        result
    }

    async fn extract_clip(
        &self,
        source: &Path,
        start: f64,
        length: f64,
        framing: Framing,
        output: &Path,
    ) -> Result<()> {
        // Re-encode every cut with identical parameters so concat -c copy is safe
        self.ffmpeg(vec![
            "-ss".into(),
            format!("{:.3}", start),
            "-i".into(),
            path_arg(source),
            "-t".into(),
            format!("{:.3}", length),
            "-vf".into(),
            framing.video_filter(),
            "-r".into(),
            "30".into(),
            "-c:v".into(),
            "libx264".into(),
            "-preset".into(),
            "fast".into(),
            "-crf".into(),
            "21".into(),
            "-c:a".into(),
            "aac".into(),
            "-ar".into(),
            "44100".into(),
            "-ac".into(),
            "2".into(),
            path_arg(output),
        ])
        .await
    }

    async fn burn_subtitles(
        &self,
        input: &Path,
        subtitles: &Path,
        style: Option<&str>,
        output: &Path,
    ) -> Result<()> {
        self.ffmpeg(vec![
            "-i".into(),
            path_arg(input),
            "-vf".into(),
            super::subtitles_filter(subtitles, style),
            "-c:v".into(),
            "libx264".into(),
            "-preset".into(),
            "fast".into(),
            "-c:a".into(),
            "copy".into(),
            path_arg(output),
        ])
        .await
    }

    async fn fit_to_duration(&self, input: &Path, target: f64, output: &Path) -> Result<()> {
        // -stream_loop -1 is harmless when the input is already long enough
        self.ffmpeg(vec![
            "-stream_loop".into(),
            "-1".into(),
            "-i".into(),
            path_arg(input),
            "-t".into(),
            format!("{:.3}", target),
            "-c:v".into(),
            "libx264".into(),
            "-preset".into(),
            "fast".into(),
            "-c:a".into(),
            "aac".into(),
            path_arg(output),
        ])
        .await
    }

    #[instrument(skip(self, spec), fields(duration = spec.duration))]
    async fn composite(&self, spec: &CompositionSpec, output: &Path) -> Result<()> {
        let mut args = Vec::new();
        for input in spec.inputs() {
            args.push("-i".to_string());
            args.push(path_arg(input));
        }
        args.extend([
            "-filter_complex".to_string(),
            spec.filter_graph(),
            "-map".into(),
            "[vout]".into(),
            "-map".into(),
            "[aout]".into(),
            "-t".into(),
            format!("{:.3}", spec.duration),
            "-c:v".into(),
            "libx264".into(),
            "-preset".into(),
            "medium".into(),
            "-crf".into(),
            "21".into(),
            "-c:a".into(),
            "aac".into(),
            "-b:a".into(),
            "192k".into(),
            path_arg(output),
        ]);
        self.ffmpeg(args).await
    }
}
