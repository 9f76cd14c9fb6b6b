//! Configuration module for Reelcut.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{MetadataPrompts, Prompts, ScriptPrompts, SelectionPrompts};
pub use settings::{
    CaptionSettings, ComposeSettings, FramingMode, GeneralSettings, NarrationSettings,
    PromptSettings, ProviderSettings, ReconcileSettings, SelectionSettings, SelectionStrategy,
    Settings, SpeechEngine, SubtitlePreset, TextProviderSettings,
};
