//! Chat-completion text generation over any OpenAI-compatible endpoint.

use super::{Provider, TextGenerator};
use crate::config::TextProviderSettings;
use crate::error::{ReelcutError, Result};
use crate::openai::create_client_for;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// Groq, Gemini and xAI all speak the chat-completions dialect, so one
/// generator covers every entry of the text roster.
pub struct OpenAiCompatibleGenerator {
    name: String,
    model: String,
    client: Client<OpenAIConfig>,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiCompatibleGenerator {
    pub fn new(settings: &TextProviderSettings, api_key: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            name: settings.name.clone(),
            model: settings.model.clone(),
            client: create_client_for(&settings.api_base, api_key, timeout)?,
            temperature: 0.7,
            max_tokens: 2000,
        })
    }

    fn err(&self, e: impl ToString) -> ReelcutError {
        ReelcutError::provider(&self.name, e)
    }
}

impl Provider for OpenAiCompatibleGenerator {
    fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl TextGenerator for OpenAiCompatibleGenerator {
    #[instrument(skip(self, system, user), fields(provider = %self.name, model = %self.model))]
    async fn generate(&self, system: &str, user: &str) -> Result<String> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system)
                .build()
                .map_err(|e| self.err(e))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user)
                .build()
                .map_err(|e| self.err(e))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .build()
            .map_err(|e| self.err(e))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| self.err(e))?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| self.err("empty response"))?;

        debug!("Response: {}", content.chars().take(300).collect::<String>());
        Ok(content.trim().to_string())
    }
}
