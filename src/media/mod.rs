//! Media encoding and analysis collaborators.
//!
//! The core never inspects codecs. It hands the encoder declarative requests
//! (a framing, a composition spec) and gets files back. `FfmpegEncoder` and
//! `FfmpegSceneDetector` are the real implementations; tests use fakes.

mod download;
mod ffmpeg;
mod scene;

pub use download::{download_captions, download_video, fetch_video_info};
pub use ffmpeg::FfmpegEncoder;
pub use scene::{parse_scene_timestamps, FfmpegSceneDetector, SceneDetector};
#[cfg(test)]
pub(crate) use scene::testing as scene_testing;

use crate::config::{FramingMode, SubtitlePreset};
use crate::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Output canvas width for vertical video.
pub const SHORTS_WIDTH: u32 = 1080;
/// Output canvas height for vertical video.
pub const SHORTS_HEIGHT: u32 = 1920;
/// Zoom applied before centring on the canvas in `ZoomPad` framing.
pub const ZOOM_FACTOR: f64 = 1.35;

/// How a landscape source is reframed to 9:16.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Framing {
    /// Scale to full height and crop the centre.
    #[default]
    Crop,
    /// Zoom the full frame and centre it on a black canvas.
    ZoomPad,
}

impl Framing {
    pub fn video_filter(&self) -> String {
        match self {
            Framing::Crop => format!(
                "scale=-2:{h},crop={w}:{h},setsar=1",
                w = SHORTS_WIDTH,
                h = SHORTS_HEIGHT
            ),
            Framing::ZoomPad => {
                let zoomed = (SHORTS_WIDTH as f64 * ZOOM_FACTOR).round() as u32;
                format!(
                    "scale={z}:-2,crop={w}:min(ih\\,{h}),pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:black,setsar=1",
                    z = zoomed + zoomed % 2,
                    w = SHORTS_WIDTH,
                    h = SHORTS_HEIGHT
                )
            }
        }
    }
}

impl From<FramingMode> for Framing {
    fn from(mode: FramingMode) -> Self {
        match mode {
            FramingMode::Crop => Framing::Crop,
            FramingMode::ZoomPad => Framing::ZoomPad,
        }
    }
}

/// ASS `force_style` overrides for a subtitle preset.
pub fn force_style(preset: SubtitlePreset) -> String {
    // Colours are &HAABBGGRR. Alignment 2 is bottom centre, 5 is middle centre.
    let (font, size, primary, outline, bold, alignment, margin_v) = match preset {
        SubtitlePreset::Tiktok => ("Impact", 24, "&H00FFFFFF", 3, true, 5, 100),
        SubtitlePreset::Minimal => ("Arial", 18, "&H00FFFFFF", 2, false, 2, 50),
        SubtitlePreset::Bold => ("Impact", 32, "&H00FFFFFF", 4, true, 5, 80),
        SubtitlePreset::Neon => ("Arial Black", 22, "&H00FF00FF", 2, true, 5, 100),
    };
    format!(
        "Fontname={},Fontsize={},PrimaryColour={},OutlineColour=&H00000000,BorderStyle=1,Outline={},Shadow=2,Bold={},Alignment={},MarginV={}",
        font,
        size,
        primary,
        outline,
        if bold { -1 } else { 0 },
        alignment,
        margin_v
    )
}

/// `subtitles` filter for a file, with optional style overrides.
pub fn subtitles_filter(path: &Path, style: Option<&str>) -> String {
    let mut filter = format!("subtitles={}", escape_filter_path(&path.to_string_lossy()));
    if let Some(style) = style {
        filter.push_str(&format!(":force_style='{}'", style.replace('\'', "")));
    }
    filter
}

/// Burned-in text overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct Watermark {
    pub text: String,
    pub font: Option<String>,
}

/// Declarative description of the final mix.
///
/// Input order is fixed: `0` is the visual track (with its original audio),
/// `1` is the narration, `2` is the optional music bed.
#[derive(Debug, Clone)]
pub struct CompositionSpec {
    pub video: PathBuf,
    pub narration: PathBuf,
    pub subtitles: Option<PathBuf>,
    /// `force_style` overrides applied to `subtitles`.
    pub subtitle_style: Option<String>,
    pub music: Option<PathBuf>,
    pub watermark: Option<Watermark>,
    pub narration_gain: f64,
    /// Gain of the visual track's own audio. `None` drops it.
    pub original_gain: Option<f64>,
    pub music_gain: f64,
    /// Output length in seconds.
    pub duration: f64,
}

impl CompositionSpec {
    pub fn new(video: PathBuf, narration: PathBuf, duration: f64) -> Self {
        Self {
            video,
            narration,
            subtitles: None,
            subtitle_style: None,
            music: None,
            watermark: None,
            narration_gain: 1.0,
            original_gain: Some(0.15),
            music_gain: 0.12,
            duration,
        }
    }

    /// Input files in the order the filter graph refers to them.
    pub fn inputs(&self) -> Vec<&Path> {
        let mut inputs = vec![self.video.as_path(), self.narration.as_path()];
        if let Some(music) = &self.music {
            inputs.push(music.as_path());
        }
        inputs
    }

    /// The `-filter_complex` graph. Outputs are labelled `[vout]` and `[aout]`.
    pub fn filter_graph(&self) -> String {
        let mut parts = Vec::new();

        let mut video_chain = Vec::new();
        if let Some(wm) = &self.watermark {
            let mut drawtext = format!(
                "drawtext=text='{}':fontsize=28:fontcolor=white@0.25:shadowcolor=black@0.15:shadowx=2:shadowy=2:x=50:y=100",
                escape_drawtext(&wm.text)
            );
            if let Some(font) = &wm.font {
                drawtext.push_str(&format!(":fontfile={}", escape_filter_path(font)));
            }
            video_chain.push(drawtext);
        }
        if let Some(subs) = &self.subtitles {
            video_chain.push(subtitles_filter(subs, self.subtitle_style.as_deref()));
        }
        if video_chain.is_empty() {
            video_chain.push("null".to_string());
        }
        parts.push(format!("[0:v]{}[vout]", video_chain.join(",")));

        // Narration first so amix duration=first follows it
        let mut mix_inputs = vec!["[narr]".to_string()];
        parts.push(format!("[1:a]volume={}[narr]", self.narration_gain));

        if let Some(gain) = self.original_gain {
            parts.push(format!("[0:a]volume={}[orig]", gain));
            mix_inputs.push("[orig]".to_string());
        }
        if self.music.is_some() {
            parts.push(format!(
                "[2:a]volume={},aloop=loop=-1:size=2e+09[music]",
                self.music_gain
            ));
            mix_inputs.push("[music]".to_string());
        }

        parts.push(format!(
            "{}amix=inputs={}:duration=first:dropout_transition=2:normalize=0[aout]",
            mix_inputs.join(""),
            mix_inputs.len()
        ));

        parts.join(";")
    }
}

/// Escape a path for use as a filter option value.
pub fn escape_filter_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for ch in path.replace('\\', "/").chars() {
        match ch {
            ':' | '\'' | ',' | ';' | '[' | ']' => {
                out.push('\\');
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    out
}

fn escape_drawtext(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('\'', "\u{2019}")
        .replace(':', "\\:")
        .replace('%', "\\%")
}

/// Opaque media encoder: files in, files out.
#[async_trait]
pub trait MediaEncoder: Send + Sync {
    /// Measured duration of a media file in seconds.
    async fn probe_duration(&self, path: &Path) -> Result<f64>;

    /// Whether the file carries at least one audio stream.
    async fn has_audio(&self, path: &Path) -> Result<bool>;

    /// Strip leading and trailing silence.
    async fn trim_silence(&self, input: &Path, output: &Path) -> Result<()>;

    /// Join files with the concat demuxer without re-encoding.
    async fn concat_copy(&self, inputs: &[PathBuf], output: &Path) -> Result<()>;

    /// Cut `[start, start + length)` from `source`, reframed to vertical.
    async fn extract_clip(
        &self,
        source: &Path,
        start: f64,
        length: f64,
        framing: Framing,
        output: &Path,
    ) -> Result<()>;

    /// Burn a subtitle file into a video, with optional `force_style` overrides.
    async fn burn_subtitles(
        &self,
        input: &Path,
        subtitles: &Path,
        style: Option<&str>,
        output: &Path,
    ) -> Result<()>;

    /// Loop or trim `input` to exactly `target` seconds.
    async fn fit_to_duration(&self, input: &Path, target: f64, output: &Path) -> Result<()>;

    /// Render the final composition.
    async fn composite(&self, spec: &CompositionSpec, output: &Path) -> Result<()>;
}
