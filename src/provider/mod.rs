//! Ordered fallback over interchangeable external backends.
//!
//! Text generation and speech synthesis are both "capabilities" served by a
//! priority-ordered list of providers. A [`FallbackChain`] tries them one at
//! a time, each under its own deadline, and the first success wins. Provider
//! errors never leave this layer except as [`ReelcutError::ProvidersExhausted`],
//! which callers usually turn into a fixed fallback payload via
//! [`FallbackChain::attempt_or`].

mod speech;
mod text;

pub use speech::{EdgeTtsSynthesizer, OpenAiSpeechSynthesizer};
pub use text::OpenAiCompatibleGenerator;

use crate::config::{Settings, SpeechEngine};
use crate::error::{ReelcutError, Result};
use async_trait::async_trait;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Anything that can sit in a fallback chain.
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;
}

/// Text-generation oracle: prompt in, unstructured text out.
#[async_trait]
pub trait TextGenerator: Provider {
    async fn generate(&self, system: &str, user: &str) -> Result<String>;
}

/// Speech-synthesis oracle: renders `text` into an audio file at `output`.
#[async_trait]
pub trait SpeechSynthesizer: Provider {
    async fn speak(&self, text: &str, output: &Path) -> Result<()>;
}

/// Which provider produced a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedBy {
    Provider(String),
    /// Every provider failed and the fixed default was used.
    Fallback,
}

impl std::fmt::Display for ResolvedBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolvedBy::Provider(name) => write!(f, "{}", name),
            ResolvedBy::Fallback => write!(f, "fallback"),
        }
    }
}

/// A value plus where it came from.
#[derive(Debug, Clone)]
pub struct Resolved<T> {
    pub value: T,
    pub source: ResolvedBy,
}

impl<T> Resolved<T> {
    pub fn is_fallback(&self) -> bool {
        self.source == ResolvedBy::Fallback
    }
}

/// Priority-ordered providers for one capability.
pub struct FallbackChain<P: ?Sized> {
    providers: Vec<Arc<P>>,
    timeout: Duration,
}

impl<P: ?Sized> Clone for FallbackChain<P> {
    fn clone(&self) -> Self {
        Self {
            providers: self.providers.clone(),
            timeout: self.timeout,
        }
    }
}

impl<P: ?Sized + Provider> FallbackChain<P> {
    pub fn new(providers: Vec<Arc<P>>, timeout: Duration) -> Self {
        Self { providers, timeout }
    }

    pub fn empty(timeout: Duration) -> Self {
        Self::new(Vec::new(), timeout)
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    /// Run `f` against each provider in order until one succeeds.
    ///
    /// Errors and timeouts advance to the next provider. Cancellation is the
    /// exception and is returned immediately.
    pub async fn attempt<T, F, Fut>(&self, capability: &str, mut f: F) -> Result<Resolved<T>>
    where
        F: FnMut(Arc<P>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempts = Vec::with_capacity(self.providers.len());

        for provider in &self.providers {
            let name = provider.name().to_string();
            debug!(capability, provider = %name, "Trying provider");

            match tokio::time::timeout(self.timeout, f(Arc::clone(provider))).await {
                Ok(Ok(value)) => {
                    debug!(capability, provider = %name, "Provider succeeded");
                    return Ok(Resolved {
                        value,
                        source: ResolvedBy::Provider(name),
                    });
                }
                Ok(Err(ReelcutError::Cancelled)) => return Err(ReelcutError::Cancelled),
                Ok(Err(e)) => {
                    warn!(capability, provider = %name, "Provider failed: {}", e);
                    attempts.push(format!("{}: {}", name, e));
                }
                Err(_) => {
                    warn!(
                        capability,
                        provider = %name,
                        "Provider timed out after {}s",
                        self.timeout.as_secs()
                    );
                    attempts.push(format!("{}: timed out", name));
                }
            }
        }

        if attempts.is_empty() {
            attempts.push("no provider configured".to_string());
        }

        Err(ReelcutError::ProvidersExhausted {
            capability: capability.to_string(),
            attempts,
        })
    }

    /// Like [`attempt`](Self::attempt), but exhaustion yields `fallback()`.
    pub async fn attempt_or<T, F, Fut, D>(&self, capability: &str, f: F, fallback: D) -> Resolved<T>
    where
        F: FnMut(Arc<P>) -> Fut,
        Fut: Future<Output = Result<T>>,
        D: FnOnce() -> T,
    {
        match self.attempt(capability, f).await {
            Ok(resolved) => resolved,
            Err(e) => {
                info!(capability, "Using fallback payload: {}", e);
                Resolved {
                    value: fallback(),
                    source: ResolvedBy::Fallback,
                }
            }
        }
    }
}

impl FallbackChain<dyn TextGenerator> {
    /// Generate raw text with the first provider that answers.
    pub async fn generate(&self, system: &str, user: &str) -> Result<Resolved<String>> {
        self.attempt("text generation", |p| async move { p.generate(system, user).await })
            .await
    }
}

/// Build the text chain from configured providers whose API key is set.
///
/// `only` restricts the chain to a single named provider.
pub fn build_text_chain(settings: &Settings, only: Option<&str>) -> FallbackChain<dyn TextGenerator> {
    let timeout = Duration::from_secs(settings.providers.timeout_secs);
    let mut providers: Vec<Arc<dyn TextGenerator>> = Vec::new();

    for provider in &settings.providers.text {
        if let Some(only) = only {
            if !provider.name.eq_ignore_ascii_case(only) {
                continue;
            }
        }

        let Some(key) = provider.api_key() else {
            debug!(provider = %provider.name, env = %provider.api_key_env, "API key not set, skipping");
            continue;
        };

        match OpenAiCompatibleGenerator::new(provider, &key, timeout) {
            Ok(generator) => providers.push(Arc::new(generator)),
            Err(e) => warn!(provider = %provider.name, "Could not configure provider: {}", e),
        }
    }

    FallbackChain::new(providers, timeout)
}

fn speech_provider(
    engine: SpeechEngine,
    voice: &str,
    rate: &str,
) -> Option<Arc<dyn SpeechSynthesizer>> {
    match engine {
        SpeechEngine::Edge => Some(Arc::new(EdgeTtsSynthesizer::new(voice, rate))),
        SpeechEngine::OpenAi => match std::env::var("OPENAI_API_KEY") {
            Ok(key) if !key.trim().is_empty() => match OpenAiSpeechSynthesizer::new(&key, voice) {
                Ok(s) => Some(Arc::new(s)),
                Err(e) => {
                    warn!("Could not configure OpenAI speech: {}", e);
                    None
                }
            },
            _ => {
                warn!("OPENAI_API_KEY not set, skipping OpenAI speech");
                None
            }
        },
    }
}

/// Primary voice first, then the designated fallback voice.
pub fn build_speech_chain(settings: &Settings) -> FallbackChain<dyn SpeechSynthesizer> {
    let narration = &settings.narration;
    let timeout = Duration::from_secs(settings.providers.timeout_secs);

    let providers = [
        speech_provider(narration.engine, &narration.voice, &narration.rate),
        speech_provider(narration.fallback_engine, &narration.fallback_voice, &narration.rate),
    ]
    .into_iter()
    .flatten()
    .collect();

    FallbackChain::new(providers, timeout)
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory providers for tests.

    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replies with a fixed answer, or fails, and counts calls.
    pub struct ScriptedText {
        pub name: String,
        pub reply: Option<String>,
        pub delay: Option<Duration>,
        pub calls: AtomicUsize,
    }

    impl ScriptedText {
        pub fn ok(name: &str, reply: &str) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                reply: Some(reply.to_string()),
                delay: None,
                calls: AtomicUsize::new(0),
            })
        }

        pub fn failing(name: &str) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                reply: None,
                delay: None,
                calls: AtomicUsize::new(0),
            })
        }

        pub fn slow(name: &str, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                reply: Some("{}".to_string()),
                delay: Some(delay),
                calls: AtomicUsize::new(0),
            })
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Provider for ScriptedText {
        fn name(&self) -> &str {
            &self.name
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedText {
        async fn generate(&self, _system: &str, _user: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.reply
                .clone()
                .ok_or_else(|| ReelcutError::provider(&self.name, "rate limited"))
        }
    }

    /// Writes a placeholder clip, failing for any text containing `fail_on`.
    pub struct ScriptedSpeech {
        pub name: String,
        pub fail_on: Option<String>,
        pub calls: AtomicUsize,
    }

    impl ScriptedSpeech {
        pub fn ok(name: &str) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                fail_on: None,
                calls: AtomicUsize::new(0),
            })
        }

        pub fn failing_on(name: &str, marker: &str) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                fail_on: Some(marker.to_string()),
                calls: AtomicUsize::new(0),
            })
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Provider for ScriptedSpeech {
        fn name(&self) -> &str {
            &self.name
        }
    }

    #[async_trait]
    impl SpeechSynthesizer for ScriptedSpeech {
        async fn speak(&self, text: &str, output: &Path) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(marker) = &self.fail_on {
                if text.contains(marker.as_str()) {
                    return Err(ReelcutError::provider(&self.name, "voice rejected input"));
                }
            }
            if let Some(parent) = output.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(output, b"audio").await?;
            Ok(())
        }
    }

    pub fn speech_chain(providers: Vec<Arc<ScriptedSpeech>>) -> FallbackChain<dyn SpeechSynthesizer> {
        let providers = providers
            .into_iter()
            .map(|p| p as Arc<dyn SpeechSynthesizer>)
            .collect();
        FallbackChain::new(providers, Duration::from_secs(5))
    }

    pub fn text_chain(providers: Vec<Arc<ScriptedText>>) -> FallbackChain<dyn TextGenerator> {
        let providers = providers
            .into_iter()
            .map(|p| p as Arc<dyn TextGenerator>)
            .collect();
        FallbackChain::new(providers, Duration::from_secs(5))
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[tokio::test]
    async fn test_first_success_wins() {
        let a = ScriptedText::failing("groq");
        let b = ScriptedText::ok("gemini", "hello");
        let c = ScriptedText::ok("grok", "unused");
        let chain = text_chain(vec![a.clone(), b.clone(), c.clone()]);

        let out = chain.generate("sys", "user").await.unwrap();
        assert_eq!(out.value, "hello");
        assert_eq!(out.source, ResolvedBy::Provider("gemini".into()));
        assert_eq!(a.calls(), 1);
        assert_eq!(b.calls(), 1);
        assert_eq!(c.calls(), 0);
    }

    #[tokio::test]
    async fn test_exhaustion_lists_every_attempt() {
        let chain = text_chain(vec![ScriptedText::failing("groq"), ScriptedText::failing("grok")]);
        match chain.generate("s", "u").await {
            Err(ReelcutError::ProvidersExhausted { capability, attempts }) => {
                assert_eq!(capability, "text generation");
                assert_eq!(attempts.len(), 2);
                assert!(attempts[0].starts_with("groq"));
            }
            other => panic!("expected exhaustion, got {:?}", other.map(|r| r.value)),
        }
    }

    #[tokio::test]
    async fn test_empty_chain_uses_fallback() {
        let chain = FallbackChain::<dyn TextGenerator>::empty(Duration::from_secs(1));
        let out = chain
            .attempt_or("text", |p| async move { p.generate("", "").await }, || {
                "default".to_string()
            })
            .await;
        assert!(out.is_fallback());
        assert_eq!(out.value, "default");
    }

    #[tokio::test]
    async fn test_timeout_advances() {
        let slow = ScriptedText::slow("slow", Duration::from_secs(30));
        let fast = ScriptedText::ok("fast", "quick");
        let chain = FallbackChain::new(
            vec![slow as Arc<dyn TextGenerator>, fast as Arc<dyn TextGenerator>],
            Duration::from_millis(50),
        );
        let out = chain.generate("s", "u").await.unwrap();
        assert_eq!(out.value, "quick");
    }

    #[tokio::test]
    async fn test_parse_failure_advances() {
        let chain = text_chain(vec![
            ScriptedText::ok("groq", "I think the best part is around 1:20"),
            ScriptedText::ok("gemini", r#"{"n": 4}"#),
        ]);
        let out = chain
            .attempt("analysis", |p| async move {
                let text = p.generate("", "").await?;
                crate::extract::parse_json_object::<serde_json::Value>(&text)
            })
            .await
            .unwrap();
        assert_eq!(out.source.to_string(), "gemini");
        assert_eq!(out.value["n"], 4);
    }

    #[tokio::test]
    async fn test_cancellation_stops_chain() {
        let second = ScriptedText::ok("b", "x");
        let chain = text_chain(vec![ScriptedText::ok("a", "x"), second.clone()]);
        let out: Result<Resolved<()>> = chain
            .attempt("c", |_p| async { Err(ReelcutError::Cancelled) })
            .await;
        assert!(matches!(out, Err(ReelcutError::Cancelled)));
        assert_eq!(second.calls(), 0);
    }

    #[test]
    fn test_text_chain_skips_missing_keys() {
        let mut settings = Settings::default();
        for p in &mut settings.providers.text {
            p.api_key_env = format!("REELCUT_TEST_UNSET_{}", p.name.to_uppercase());
        }
        let chain = build_text_chain(&settings, None);
        assert!(chain.is_empty());
    }

    #[test]
    fn test_speech_chain_has_primary_and_fallback() {
        let mut settings = Settings::default();
        settings.narration.fallback_voice = "en-US-AriaNeural".to_string();
        let chain = build_speech_chain(&settings);
        assert_eq!(
            chain.names(),
            vec!["edge:en-US-GuyNeural".to_string(), "edge:en-US-AriaNeural".to_string()]
        );
    }
}
