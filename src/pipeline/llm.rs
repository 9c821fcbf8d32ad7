//! Model interaction: one prompt in, one opaque text reply out.
//!
//! The pipeline talks to models through the small [`ChatModel`] trait rather
//! than to `edgequake_llm::LLMProvider` directly. A run needs exactly one
//! capability (send a single user message with sampling settings, get the
//! first choice's text back), and keeping the seam that narrow lets tests
//! script replies and count calls with [`ScriptedModel`].
//!
//! No retries happen here. A transport failure surfaces as a [`ModelError`]
//! and the pipeline turns it into a fatal
//! [`crate::error::CompareError::LlmCallFailed`].

use crate::config::{CompareConfig, Credential};
use crate::error::CompareError;
use async_trait::async_trait;
use edgequake_llm::{
    AnthropicProvider, ChatMessage, CompletionOptions, GeminiProvider, LLMProvider,
    MistralProvider, OpenAIProvider, OpenRouterProvider, ProviderFactory,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::debug;

/// Sampling settings applied uniformly to every call of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampling {
    pub temperature: f32,
    pub max_tokens: usize,
}

/// The text of a model reply plus token accounting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelReply {
    pub content: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl ModelReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }
}

/// Transport-level failure of a single call.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ModelError(pub String);

/// A model that answers a single user prompt.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send `prompt` as the only user message and return the reply text.
    async fn complete(&self, prompt: &str, sampling: &Sampling) -> Result<ModelReply, ModelError>;

    /// Model identifier for logs.
    fn model_name(&self) -> &str;
}

/// [`ChatModel`] backed by an `edgequake-llm` provider.
pub struct ProviderModel {
    provider: Arc<dyn LLMProvider>,
    model: String,
}

impl ProviderModel {
    pub fn new(provider: Arc<dyn LLMProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }
}

#[async_trait]
impl ChatModel for ProviderModel {
    async fn complete(&self, prompt: &str, sampling: &Sampling) -> Result<ModelReply, ModelError> {
        let messages = vec![ChatMessage::user(prompt)];
        let options = build_options(sampling);

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| ModelError(format!("{}", e)))?;

        debug!(
            "{}: {} input tokens, {} output tokens",
            self.model, response.prompt_tokens, response.completion_tokens
        );

        Ok(ModelReply {
            content: response.content,
            prompt_tokens: response.prompt_tokens as u64,
            completion_tokens: response.completion_tokens as u64,
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Build `CompletionOptions` from the run's sampling settings.
fn build_options(sampling: &Sampling) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(sampling.temperature),
        max_tokens: Some(sampling.max_tokens),
        ..Default::default()
    }
}

/// Resolve the model for a run.
///
/// 1. **Pre-built model** (`config.model_client`): used as-is. This is how
///    tests and embedding applications inject their own implementation.
/// 2. **Keyed provider** (OpenAI, Anthropic, Gemini, OpenRouter, Mistral):
///    constructed directly from the credential's secret. The process
///    environment is not consulted for the key.
/// 3. **Anything else** (local servers, less common providers): built
///    through [`ProviderFactory::create_llm_provider`].
pub fn resolve_model(
    config: &CompareConfig,
    credential: &Credential,
) -> Result<Arc<dyn ChatModel>, CompareError> {
    if let Some(ref model) = config.model_client {
        return Ok(Arc::clone(model));
    }

    debug!(
        "Resolving provider '{}' (credential from {})",
        config.provider_name,
        credential.source()
    );
    let provider = match keyed_provider(&config.provider_name, &config.model, credential)? {
        Some(provider) => provider,
        None => ProviderFactory::create_llm_provider(&config.provider_name, &config.model)
            .map_err(|e| not_configured(&config.provider_name, e))?,
    };

    Ok(Arc::new(ProviderModel::new(provider, config.model.clone())))
}

/// Build a provider that takes its API key as a constructor argument.
///
/// Returns `Ok(None)` for providers without such a constructor, or when the
/// credential carries no secret.
fn keyed_provider(
    provider_name: &str,
    model: &str,
    credential: &Credential,
) -> Result<Option<Arc<dyn LLMProvider>>, CompareError> {
    let secret = credential.secret();
    if secret.is_empty() {
        return Ok(None);
    }

    let provider: Arc<dyn LLMProvider> = match provider_name.to_ascii_lowercase().as_str() {
        "openai" => Arc::new(OpenAIProvider::new(secret).with_model(model)),
        "anthropic" => Arc::new(AnthropicProvider::new(secret).with_model(model)),
        "gemini" | "google" => Arc::new(GeminiProvider::new(secret).with_model(model)),
        "openrouter" => Arc::new(OpenRouterProvider::new(secret).with_model(model)),
        "mistral" => Arc::new(
            MistralProvider::new(
                secret.to_string(),
                model.to_string(),
                "mistral-embed".to_string(),
                None,
            )
            .map_err(|e| not_configured(provider_name, e))?,
        ),
        _ => return Ok(None),
    };
    Ok(Some(provider))
}

fn not_configured(provider_name: &str, err: impl std::fmt::Display) -> CompareError {
    CompareError::ProviderNotConfigured {
        provider: provider_name.to_string(),
        hint: format!("{err}"),
    }
}

// ── Scripted model ───────────────────────────────────────────────────────

/// A [`ChatModel`] that replays queued replies and records every prompt.
///
/// When the queue runs dry it answers with a fixed fallback text. Useful for
/// tests and dry runs that must not touch the network.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Build a model that answers with `replies` in order.
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let model = Self::new();
        for reply in replies {
            model.queue_reply(reply);
        }
        model
    }

    pub fn queue_reply(&self, reply: impl Into<String>) {
        self.lock_replies().push_back(Ok(reply.into()));
    }

    /// Queue a transport failure for the next call.
    pub fn queue_failure(&self, message: impl Into<String>) {
        self.lock_replies().push_back(Err(message.into()));
    }

    /// Number of `complete` calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every prompt received, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn lock_replies(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<String, String>>> {
        self.replies
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ScriptedModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, prompt: &str, _sampling: &Sampling) -> Result<ModelReply, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(prompt.to_string());

        let next = self.lock_replies().pop_front();
        match next {
            Some(Ok(text)) => Ok(ModelReply {
                prompt_tokens: prompt.len() as u64 / 4,
                completion_tokens: text.len() as u64 / 4,
                content: text,
            }),
            Some(Err(message)) => Err(ModelError(message)),
            None => Ok(ModelReply::text("No scripted reply available.")),
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sampling() -> Sampling {
        Sampling {
            temperature: 0.3,
            max_tokens: 1024,
        }
    }

    #[test]
    fn build_options_copies_sampling() {
        let opts = build_options(&sampling());
        assert_eq!(opts.temperature, Some(0.3));
        assert_eq!(opts.max_tokens, Some(1024));
    }

    #[tokio::test]
    async fn scripted_model_replays_in_order() {
        let model = ScriptedModel::with_replies(["one", "two"]);
        assert_eq!(model.complete("p1", &sampling()).await.unwrap().content, "one");
        assert_eq!(model.complete("p2", &sampling()).await.unwrap().content, "two");
        assert_eq!(
            model.complete("p3", &sampling()).await.unwrap().content,
            "No scripted reply available."
        );
        assert_eq!(model.call_count(), 3);
        assert_eq!(model.prompts(), vec!["p1", "p2", "p3"]);
    }

    #[tokio::test]
    async fn scripted_failure_is_model_error() {
        let model = ScriptedModel::new();
        model.queue_failure("429 rate limited");
        let err = model.complete("p", &sampling()).await.unwrap_err();
        assert_eq!(err.to_string(), "429 rate limited");
    }

    #[test]
    fn keyed_provider_uses_injected_secret_without_env() {
        std::env::remove_var("OPENROUTER_API_KEY");
        let provider = keyed_provider(
            "openrouter",
            "openai/gpt-4.1-nano",
            &Credential::new("sk-or-injected"),
        )
        .unwrap()
        .expect("openrouter is a keyed provider");
        assert_eq!(provider.name(), "openrouter");
        assert_eq!(provider.model(), "openai/gpt-4.1-nano");
    }

    #[test]
    fn resolve_builds_openai_from_credential_when_env_unset() {
        std::env::remove_var("OPENAI_API_KEY");
        let config = CompareConfig::builder()
            .provider_name("openai")
            .model("gpt-4.1-nano")
            .credential(Credential::new("sk-injected"))
            .build()
            .unwrap();
        let credential = config.require_credential().unwrap();
        let resolved = resolve_model(&config, credential).unwrap();
        assert_eq!(resolved.model_name(), "gpt-4.1-nano");
    }

    #[test]
    fn keyless_providers_fall_through_to_factory() {
        let local = keyed_provider("ollama", "llama3", &Credential::not_required()).unwrap();
        assert!(local.is_none());
        let empty = keyed_provider("openai", "gpt-4.1-nano", &Credential::not_required()).unwrap();
        assert!(empty.is_none());
    }

    #[test]
    fn resolve_prefers_injected_model() {
        let injected: Arc<dyn ChatModel> = Arc::new(ScriptedModel::new());
        let config = CompareConfig::builder()
            .model_client(Arc::clone(&injected))
            .build()
            .unwrap();
        let resolved = resolve_model(&config, &Credential::new("test-key")).unwrap();
        assert_eq!(resolved.model_name(), "scripted");
    }
}
