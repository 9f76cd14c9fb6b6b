//! Speech synthesis backends.

use super::{Provider, SpeechSynthesizer};
use crate::error::{ReelcutError, Result};
use crate::openai::create_client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{CreateSpeechRequestArgs, SpeechModel, Voice};
use async_openai::Client;
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Microsoft Edge neural voices through the `edge-tts` command.
pub struct EdgeTtsSynthesizer {
    name: String,
    voice: String,
    rate: String,
}

impl EdgeTtsSynthesizer {
    pub fn new(voice: &str, rate: &str) -> Self {
        Self {
            name: format!("edge:{}", voice),
            voice: voice.to_string(),
            rate: rate.to_string(),
        }
    }
}

impl Provider for EdgeTtsSynthesizer {
    fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl SpeechSynthesizer for EdgeTtsSynthesizer {
    #[instrument(skip(self, text, output), fields(voice = %self.voice))]
    async fn speak(&self, text: &str, output: &Path) -> Result<()> {
        let result = Command::new("edge-tts")
            .arg("--voice")
            .arg(&self.voice)
            .arg(format!("--rate={}", self.rate))
            .arg("--text")
            .arg(text)
            .arg("--write-media")
            .arg(output)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await;

        let out = match result {
            Ok(o) => o,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ReelcutError::ToolNotFound("edge-tts".into()));
            }
            Err(e) => return Err(ReelcutError::provider(&self.name, e)),
        };

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(ReelcutError::provider(&self.name, stderr.trim()));
        }

        ensure_non_empty(&self.name, output).await
    }
}

/// OpenAI text-to-speech.
pub struct OpenAiSpeechSynthesizer {
    name: String,
    voice: Voice,
    client: Client<OpenAIConfig>,
}

impl OpenAiSpeechSynthesizer {
    pub fn new(api_key: &str, voice: &str) -> Result<Self> {
        Ok(Self {
            name: format!("openai:{}", voice),
            voice: parse_voice(voice),
            client: create_client(api_key)?,
        })
    }
}

/// Map a voice name to an OpenAI voice. Unknown names (e.g. an Edge voice
/// id left over in config) use `onyx`.
fn parse_voice(voice: &str) -> Voice {
    match voice.to_lowercase().as_str() {
        "alloy" => Voice::Alloy,
        "echo" => Voice::Echo,
        "fable" => Voice::Fable,
        "nova" => Voice::Nova,
        "shimmer" => Voice::Shimmer,
        _ => Voice::Onyx,
    }
}

impl Provider for OpenAiSpeechSynthesizer {
    fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiSpeechSynthesizer {
    #[instrument(skip(self, text, output))]
    async fn speak(&self, text: &str, output: &Path) -> Result<()> {
        let request = CreateSpeechRequestArgs::default()
            .input(text)
            .model(SpeechModel::Tts1)
            .voice(self.voice.clone())
            .build()
            .map_err(|e| ReelcutError::provider(&self.name, e))?;

        let response = self
            .client
            .audio()
            .speech(request)
            .await
            .map_err(|e| ReelcutError::provider(&self.name, e))?;

        tokio::fs::write(output, &response.bytes).await?;
        ensure_non_empty(&self.name, output).await
    }
}

async fn ensure_non_empty(provider: &str, path: &Path) -> Result<()> {
    let size = tokio::fs::metadata(path).await.map(|m| m.len()).unwrap_or(0);
    if size == 0 {
        return Err(ReelcutError::provider(provider, "produced no audio"));
    }
    debug!(path = %path.display(), bytes = size, "Rendered speech");
    Ok(())
}
