//! Prompt templates for Reelcut.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub selection: SelectionPrompts,
    pub script: ScriptPrompts,
    pub metadata: MetadataPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for transcript segment analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionPrompts {
    pub system: String,
    pub user: String,
}

impl Default for SelectionPrompts {
    fn default() -> Self {
        Self {
            system: "You are a viral content expert. Respond with JSON only.".to_string(),

            user: r#"Analyze this video transcript and find the MOST VIRAL/ENGAGING {{clip_seconds}}-second segment.

Video Title: {{title}}
Video Duration: {{duration}} seconds

Look for:
- Emotional moments (surprise, humor, drama)
- Key insights or revelations
- Quotable/memorable statements
- Hook-worthy content

Transcript (each line starts with its timestamp in seconds):
{{transcript}}

Return JSON only:
{"start": seconds, "end": seconds, "reason": "why this is viral", "hook": "attention-grabbing 5-word summary"}"#
                .to_string(),
        }
    }
}

/// Prompts for narration scripts, one persona per style.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptPrompts {
    pub ruthless: String,
    pub educational: String,
    pub comedic: String,
    pub mystery: String,
    pub user: String,
}

impl Default for ScriptPrompts {
    fn default() -> Self {
        Self {
            ruthless: "You are a RUTHLESS YouTube Shorts scripter. Focus on high stakes, danger, and shocking twists.".to_string(),
            educational: "You are a fascinating Science Communicator. Focus on mind-blowing facts, 'did you know', and curiosity.".to_string(),
            comedic: "You are a sarcastic and witty commentator. Roast the situation slightly while keeping it engaging.".to_string(),
            mystery: "You are a Mystery Narrator. Focus on the unknown, the creepy, and the unexplained.".to_string(),

            user: r#"TARGET: {{target_words}} words MAX | {{target_seconds}} seconds

INPUT TRANSCRIPT:
{{transcript}}

TASK: Summarize this into a viral Shorts script.
- Third person ONLY.
- Connect sentences with tension.
- End with a curiosity gap or loop.

Provide output in JSON:
{
    "mood": "One word mood (e.g. Dark, Upbeat, Intense, Silly)",
    "narration": "The full script text",
    "sentences": ["Sentence 1", "Sentence 2"]
}"#
            .to_string(),
        }
    }
}

/// Prompts for the per-video metadata sidecar.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataPrompts {
    pub system: String,
    pub user: String,
}

impl Default for MetadataPrompts {
    fn default() -> Self {
        Self {
            system: "You write titles and descriptions for YouTube Shorts. Respond with JSON only."
                .to_string(),

            user: r#"Write upload metadata for a short vertical video cut from "{{title}}".

What the short covers:
{{summary}}

Rules:
- Title under 70 characters, no clickbait lies
- Description of two sentences
- 5 to 10 lowercase tags without the # sign

Return JSON only:
{"title": "...", "description": "...", "tags": ["...", "..."]}"#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let selection_path = custom_path.join("selection.toml");
            if selection_path.exists() {
                let content = std::fs::read_to_string(&selection_path)?;
                prompts.selection = toml::from_str(&content)?;
            }

            let script_path = custom_path.join("script.toml");
            if script_path.exists() {
                let content = std::fs::read_to_string(&script_path)?;
                prompts.script = toml::from_str(&content)?;
            }

            let metadata_path = custom_path.join("metadata.toml");
            if metadata_path.exists() {
                let content = std::fs::read_to_string(&metadata_path)?;
                prompts.metadata = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}

impl ScriptPrompts {
    /// System prompt for a persona name, defaulting to the ruthless persona.
    pub fn persona(&self, style: &str) -> &str {
        match style.to_lowercase().as_str() {
            "educational" => &self.educational,
            "comedic" => &self.comedic,
            "mystery" => &self.mystery,
            _ => &self.ruthless,
        }
    }
}
