//! Client construction for OpenAI-compatible APIs.

use crate::error::{ReelcutError, Result};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Default request timeout (matches the provider chain default).
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Create a client against the official OpenAI endpoint.
pub fn create_client(api_key: &str) -> Result<Client<OpenAIConfig>> {
    create_client_for(
        "https://api.openai.com/v1",
        api_key,
        Duration::from_secs(DEFAULT_TIMEOUT_SECS),
    )
}

/// Create a client for any OpenAI-compatible base URL with a request timeout.
///
/// The HTTP timeout is a backstop; the fallback chain applies its own
/// per-provider deadline around each call.
pub fn create_client_for(
    api_base: &str,
    api_key: &str,
    timeout: Duration,
) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ReelcutError::Config(format!("Failed to create HTTP client: {}", e)))?;

    let config = OpenAIConfig::new()
        .with_api_base(api_base.trim_end_matches('/'))
        .with_api_key(api_key);

    Ok(Client::with_config(config).with_http_client(http_client))
}
