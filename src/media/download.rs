//! Video and caption download through yt-dlp.

use crate::error::{ReelcutError, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

async fn run_ytdlp(args: &[&str], url: &str) -> Result<std::process::Output> {
    let result = Command::new("yt-dlp")
        .args(args)
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await;

    match result {
        Ok(o) => Ok(o),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ReelcutError::ToolNotFound("yt-dlp".into()))
        }
        Err(e) => Err(ReelcutError::Acquisition(format!(
            "yt-dlp execution failed: {e}"
        ))),
    }
}

/// `yt-dlp --dump-json` metadata (title, duration, chapters, heatmap).
#[instrument]
pub async fn fetch_video_info(url: &str) -> Result<serde_json::Value> {
    let output = run_ytdlp(&["--dump-json", "--no-download", "--no-warnings", "--no-playlist"], url)
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ReelcutError::Acquisition(format!(
            "yt-dlp metadata failed: {}",
            stderr.trim()
        )));
    }

    Ok(serde_json::from_slice(&output.stdout)?)
}

/// Download the best mp4 (up to 1080p) as `<video_id>.mp4`.
///
/// Returns the existing file without downloading if it is already present.
#[instrument(skip(output_dir))]
pub async fn download_video(url: &str, video_id: &str, output_dir: &Path) -> Result<PathBuf> {
    tokio::fs::create_dir_all(output_dir).await?;

    let target = output_dir.join(format!("{}.mp4", video_id));
    if target.exists() {
        info!("Using cached video file");
        return Ok(target);
    }

    info!("Downloading video from {}", url);
    let template = output_dir.join(format!("{}.%(ext)s", video_id));
    let template = template.to_string_lossy().to_string();

    let output = run_ytdlp(
        &[
            "-f",
            "bestvideo[height<=1080][ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best",
            "--merge-output-format",
            "mp4",
            "--output",
            template.as_str(),
            "--no-playlist",
            "--quiet",
            "--no-warnings",
        ],
        url,
    )
    .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ReelcutError::Acquisition(format!(
            "yt-dlp download failed: {}",
            stderr.trim()
        )));
    }

    if target.exists() {
        Ok(target)
    } else {
        Err(ReelcutError::Acquisition(
            "Video file not found after download".into(),
        ))
    }
}

/// Download English captions (manual or automatic) as VTT.
///
/// Caption problems are never fatal; `None` means the source has none.
#[instrument(skip(output_dir))]
pub async fn download_captions(
    url: &str,
    video_id: &str,
    output_dir: &Path,
) -> Result<Option<PathBuf>> {
    let template = output_dir.join(format!("{}.%(ext)s", video_id));
    let template = template.to_string_lossy().to_string();

    let output = run_ytdlp(
        &[
            "--skip-download",
            "--write-subs",
            "--write-auto-subs",
            "--sub-langs",
            "en.*,en",
            "--sub-format",
            "vtt",
            "--output",
            template.as_str(),
            "--no-playlist",
            "--quiet",
            "--no-warnings",
        ],
        url,
    )
    .await?;

    if !output.status.success() {
        warn!(
            "Caption download failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
        return Ok(None);
    }

    Ok(find_caption_file(output_dir, video_id))
}

/// Locate a caption file yt-dlp wrote for `video_id`, preferring plain `en`.
fn find_caption_file(dir: &Path, video_id: &str) -> Option<PathBuf> {
    let preferred = dir.join(format!("{}.en.vtt", video_id));
    if preferred.exists() {
        return Some(preferred);
    }

    let entries = std::fs::read_dir(dir).ok()?;
    let mut candidates: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            let name = p
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            name.starts_with(video_id) && (name.ends_with(".vtt") || name.ends_with(".srt"))
        })
        .collect();
    candidates.sort();

    let found = candidates.into_iter().next();
    debug!(?found, "Caption sidecar lookup");
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_caption_prefers_en() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("abc.en-orig.vtt"), "").unwrap();
        std::fs::write(dir.path().join("abc.en.vtt"), "").unwrap();
        assert_eq!(
            find_caption_file(dir.path(), "abc"),
            Some(dir.path().join("abc.en.vtt"))
        );
    }

    #[test]
    fn test_find_caption_any_english_variant() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("abc.en-US.vtt"), "").unwrap();
        std::fs::write(dir.path().join("other.en.vtt"), "").unwrap();
        assert_eq!(
            find_caption_file(dir.path(), "abc"),
            Some(dir.path().join("abc.en-US.vtt"))
        );
        assert_eq!(find_caption_file(dir.path(), "zzz"), None);
    }
}
