//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools are available before starting a run that
//! would otherwise fail midway. Missing API keys are not fatal: every LLM
//! step has a fallback.

use crate::config::{Settings, SpeechEngine};
use crate::error::{ReelcutError, Result};
use crate::media::FfmpegEncoder;
use crate::source::{SourceAcquirer, YoutubeAcquirer};
use std::process::Command;
use std::sync::Arc;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Clip, montage and scene modes need the encoder.
    Render,
    /// Narration also needs a speech engine.
    Narrate,
    /// Selection only probes the source.
    Select,
}

/// Run pre-flight checks for the given operation and input.
pub fn check(operation: Operation, input: &str, settings: &Settings) -> Result<()> {
    check_tool("ffprobe")?;
    if !matches!(operation, Operation::Select) {
        check_tool("ffmpeg")?;
    }
    if is_remote(input) {
        check_tool("yt-dlp")?;
    }

    if let Operation::Narrate = operation {
        let engines = [settings.narration.engine, settings.narration.fallback_engine];
        let edge_only = !engines.contains(&SpeechEngine::OpenAi);
        if edge_only {
            check_tool("edge-tts")?;
        }
    }
    Ok(())
}

/// Text providers with a usable API key.
pub fn configured_text_providers(settings: &Settings) -> Vec<String> {
    settings
        .providers
        .text
        .iter()
        .filter(|p| p.api_key().is_some())
        .map(|p| p.name.clone())
        .collect()
}

fn is_remote(input: &str) -> bool {
    YoutubeAcquirer::new(Arc::new(FfmpegEncoder::new())).can_handle(input)
}

/// Check if an external tool is available.
fn check_tool(name: &str) -> Result<()> {
    // ffmpeg/ffprobe use -version (single dash), edge-tts has no version flag
    let version_arg = match name {
        "ffmpeg" | "ffprobe" => "-version",
        "edge-tts" => "--help",
        _ => "--version",
    };
    match Command::new(name).arg(version_arg).output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(ReelcutError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ReelcutError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(ReelcutError::ToolNotFound(format!("{}: {}", name, e))),
    }
}
