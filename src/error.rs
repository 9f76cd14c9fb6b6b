//! Error types for Reelcut.

use thiserror::Error;

/// Library-level error type for Reelcut operations.
#[derive(Error, Debug)]
pub enum ReelcutError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// The source could not be fetched at all. This is the only error class
    /// that aborts a pipeline run.
    #[error("Could not acquire source: {0}")]
    Acquisition(String),

    #[error("Caption parse error: {0}")]
    Captions(String),

    #[error("Provider {provider} failed: {message}")]
    Provider { provider: String, message: String },

    #[error("All {capability} providers failed: {}", attempts.join("; "))]
    ProvidersExhausted {
        capability: String,
        attempts: Vec<String>,
    },

    #[error("Malformed model output: {0}")]
    MalformedOutput(String),

    #[error("Segment selection failed: {0}")]
    Selection(String),

    #[error("Speech synthesis failed: {0}")]
    Synthesis(String),

    #[error("Timeline reconciliation failed: {0}")]
    Reconcile(String),

    #[error("Encoder error: {0}")]
    Encoder(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("External tool failed: {0}")]
    ToolFailed(String),

    #[error("Timed out after {0} seconds")]
    Timeout(u64),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Run cancelled")]
    Cancelled,
}

impl ReelcutError {
    /// Shorthand for a provider-scoped failure.
    pub fn provider(provider: impl Into<String>, message: impl ToString) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.to_string(),
        }
    }

    /// Whether this error must terminate the run instead of degrading.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Acquisition(_) | Self::Cancelled)
    }
}

/// Result type alias for Reelcut operations.
pub type Result<T> = std::result::Result<T, ReelcutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_classes() {
        assert!(ReelcutError::Acquisition("gone".into()).is_terminal());
        assert!(ReelcutError::Cancelled.is_terminal());
        assert!(!ReelcutError::provider("groq", "rate limited").is_terminal());
        assert!(!ReelcutError::MalformedOutput("{".into()).is_terminal());
    }

    #[test]
    fn test_exhausted_message_lists_attempts() {
        let err = ReelcutError::ProvidersExhausted {
            capability: "text".into(),
            attempts: vec!["groq: timeout".into(), "gemini: 429".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("groq: timeout"));
        assert!(msg.contains("gemini: 429"));
    }
}
