//! Configuration settings for Reelcut.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub providers: ProviderSettings,
    pub selection: SelectionSettings,
    pub narration: NarrationSettings,
    pub reconcile: ReconcileSettings,
    pub captions: CaptionSettings,
    pub compose: ComposeSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory where finished videos and sidecars are written.
    pub output_dir: String,
    /// Directory for per-run working files.
    pub temp_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Keep the per-run working directory after the run finishes.
    pub keep_temp: bool,
    /// Maximum number of variations rendered at the same time.
    pub max_concurrent_variations: usize,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            output_dir: "~/reelcut".to_string(),
            temp_dir: "/tmp/reelcut".to_string(),
            log_level: "info".to_string(),
            keep_temp: false,
            max_concurrent_variations: 2,
        }
    }
}

/// One OpenAI-compatible text-generation backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextProviderSettings {
    /// Short name used in logs and `--ai` filters.
    pub name: String,
    /// Base URL of the chat-completions API.
    pub api_base: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Model identifier.
    pub model: String,
}

impl TextProviderSettings {
    fn new(name: &str, api_base: &str, api_key_env: &str, model: &str) -> Self {
        Self {
            name: name.to_string(),
            api_base: api_base.to_string(),
            api_key_env: api_key_env.to_string(),
            model: model.to_string(),
        }
    }

    /// Read the API key from the environment, if set and non-empty.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}

/// Provider roster and fallback policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// Per-provider timeout in seconds.
    pub timeout_secs: u64,
    /// Text providers in priority order (fastest/cheapest first).
    pub text: Vec<TextProviderSettings>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            text: vec![
                TextProviderSettings::new(
                    "groq",
                    "https://api.groq.com/openai/v1",
                    "GROQ_API_KEY",
                    "llama-3.3-70b-versatile",
                ),
                TextProviderSettings::new(
                    "gemini",
                    "https://generativelanguage.googleapis.com/v1beta/openai",
                    "GEMINI_API_KEY",
                    "gemini-2.0-flash",
                ),
                TextProviderSettings::new(
                    "grok",
                    "https://api.x.ai/v1",
                    "XAI_API_KEY",
                    "grok-2-latest",
                ),
            ],
        }
    }
}

/// Which selection strategy (or cascade) to run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionStrategy {
    /// Engagement, transcript, chapters, scenes, golden zone, in that order.
    #[default]
    Auto,
    GoldenZone,
    Scenes,
    Chapters,
    Transcript,
    Engagement,
}

impl std::str::FromStr for SelectionStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(SelectionStrategy::Auto),
            "golden-zone" | "golden" | "random" => Ok(SelectionStrategy::GoldenZone),
            "scenes" | "scene" => Ok(SelectionStrategy::Scenes),
            "chapters" | "chapter" => Ok(SelectionStrategy::Chapters),
            "transcript" | "ai" | "llm" => Ok(SelectionStrategy::Transcript),
            "engagement" | "heatmap" => Ok(SelectionStrategy::Engagement),
            _ => Err(format!("Unknown selection strategy: {}", s)),
        }
    }
}

impl std::fmt::Display for SelectionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionStrategy::Auto => write!(f, "auto"),
            SelectionStrategy::GoldenZone => write!(f, "golden-zone"),
            SelectionStrategy::Scenes => write!(f, "scenes"),
            SelectionStrategy::Chapters => write!(f, "chapters"),
            SelectionStrategy::Transcript => write!(f, "transcript"),
            SelectionStrategy::Engagement => write!(f, "engagement"),
        }
    }
}

/// Segment selection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionSettings {
    pub strategy: SelectionStrategy,
    /// Length of a single selected clip.
    pub clip_seconds: f64,
    /// Minimum clip length enforced when clamping.
    pub min_clip_seconds: f64,
    /// Golden zone as fractions of the source duration.
    pub golden_zone: [f64; 2],
    /// Band scanned by scene-density scoring.
    pub scene_band: [f64; 2],
    /// Scene-change sensitivity (0.0-1.0, lower = more sensitive).
    pub scene_threshold: f64,
    /// Run scene detection as part of the auto cascade.
    pub scene_detection: bool,
    /// A heatmap peak counts as a spike when it is this many times the mean.
    pub spike_ratio: f64,
    /// Transcript characters sent to the model.
    pub transcript_max_chars: usize,
    /// Number of clips in a montage.
    pub montage_count: usize,
    /// Total montage duration.
    pub montage_seconds: f64,
}

impl Default for SelectionSettings {
    fn default() -> Self {
        Self {
            strategy: SelectionStrategy::Auto,
            clip_seconds: 60.0,
            min_clip_seconds: 60.0,
            golden_zone: [0.10, 0.80],
            scene_band: [0.10, 0.90],
            scene_threshold: 0.3,
            scene_detection: false,
            spike_ratio: 1.5,
            transcript_max_chars: 15_000,
            montage_count: 10,
            montage_seconds: 30.0,
        }
    }
}

/// Speech backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SpeechEngine {
    #[default]
    Edge,
    OpenAi,
}

impl std::str::FromStr for SpeechEngine {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "edge" | "edge-tts" => Ok(SpeechEngine::Edge),
            "openai" => Ok(SpeechEngine::OpenAi),
            _ => Err(format!("Unknown speech engine: {}", s)),
        }
    }
}

impl std::fmt::Display for SpeechEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpeechEngine::Edge => write!(f, "edge"),
            SpeechEngine::OpenAi => write!(f, "openai"),
        }
    }
}

/// Narration script and speech settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrationSettings {
    pub engine: SpeechEngine,
    pub voice: String,
    /// Engine retried once when the primary fails on a sentence.
    pub fallback_engine: SpeechEngine,
    pub fallback_voice: String,
    /// Edge speaking-rate adjustment, e.g. "+20%".
    pub rate: String,
    /// Script persona (ruthless, educational, comedic, mystery).
    pub style: String,
    /// Requested narration length. The rendered length is authoritative.
    pub target_seconds: f64,
    /// Words per second used to size the script.
    pub words_per_second: f64,
    /// Strip leading/trailing silence from each sentence clip.
    pub trim_silence: bool,
}

impl Default for NarrationSettings {
    fn default() -> Self {
        Self {
            engine: SpeechEngine::Edge,
            voice: "en-US-GuyNeural".to_string(),
            fallback_engine: SpeechEngine::Edge,
            fallback_voice: "en-US-GuyNeural".to_string(),
            rate: "+20%".to_string(),
            style: "ruthless".to_string(),
            target_seconds: 30.0,
            words_per_second: 3.5,
            trim_silence: true,
        }
    }
}

/// How source footage is reframed to 9:16.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FramingMode {
    /// Fill the frame by cropping the centre.
    #[default]
    Crop,
    /// Zoom the full frame and centre it on a black canvas.
    ZoomPad,
}

/// Timeline reconciliation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileSettings {
    pub target_cut_seconds: f64,
    /// Usable sampling window as fractions of the source duration.
    pub usable_band: [f64; 2],
    /// Jitter as a fraction of the cut spacing.
    pub jitter: f64,
    /// Allowed drift between the visual track and the narration.
    pub tolerance_seconds: f64,
    pub framing: FramingMode,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            target_cut_seconds: 2.5,
            usable_band: [0.02, 0.98],
            jitter: 0.10,
            tolerance_seconds: 0.05,
            framing: FramingMode::Crop,
        }
    }
}

/// Named look for burned-in subtitles.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubtitlePreset {
    /// Heavy white text with a thick outline, centred.
    #[default]
    Tiktok,
    /// Small plain text near the bottom.
    Minimal,
    Bold,
    /// Magenta text, centred.
    Neon,
}

impl std::str::FromStr for SubtitlePreset {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tiktok" => Ok(SubtitlePreset::Tiktok),
            "minimal" => Ok(SubtitlePreset::Minimal),
            "bold" => Ok(SubtitlePreset::Bold),
            "neon" => Ok(SubtitlePreset::Neon),
            _ => Err(format!("Unknown subtitle style: {}", s)),
        }
    }
}

impl std::fmt::Display for SubtitlePreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubtitlePreset::Tiktok => write!(f, "tiktok"),
            SubtitlePreset::Minimal => write!(f, "minimal"),
            SubtitlePreset::Bold => write!(f, "bold"),
            SubtitlePreset::Neon => write!(f, "neon"),
        }
    }
}

/// Burned-in caption settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionSettings {
    /// Words per on-screen chunk (1-3). 0 picks per sentence.
    pub words_per_chunk: usize,
    pub uppercase: bool,
    /// Share of chunks drawn in a highlight colour.
    pub highlight_ratio: f64,
    pub palette: Vec<String>,
    /// Burn source captions into single clips.
    pub burn_source_captions: bool,
    /// Font, size, colours and position of burned subtitles.
    pub subtitle_style: SubtitlePreset,
}

impl Default for CaptionSettings {
    fn default() -> Self {
        Self {
            words_per_chunk: 0,
            uppercase: true,
            highlight_ratio: 0.3,
            palette: ["#FFFF00", "#00FF00", "#00FFFF", "#FF0000", "#FFA500"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            burn_source_captions: true,
            subtitle_style: SubtitlePreset::Tiktok,
        }
    }
}

/// Final composition settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposeSettings {
    pub narration_gain: f64,
    pub original_gain: f64,
    pub music_gain: f64,
    /// Watermark text; empty disables it.
    pub watermark: String,
    pub font: Option<String>,
    /// Directory holding `<mood>.mp3` background tracks.
    pub music_dir: Option<String>,
}

impl Default for ComposeSettings {
    fn default() -> Self {
        Self {
            narration_gain: 1.0,
            original_gain: 0.15,
            music_gain: 0.12,
            watermark: String::new(),
            font: None,
            music_dir: None,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::ReelcutError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("reelcut")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded output directory path.
    pub fn output_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.output_dir)
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }

    /// Get the expanded music directory, if configured.
    pub fn music_dir(&self) -> Option<PathBuf> {
        self.compose.music_dir.as_deref().map(Self::expand_path)
    }
}
