//! Outline generation: the LLM collaborator.
//!
//! The session talks to an [`OutlineGenerator`], never to a provider
//! directly, so tests and alternative backends can stand in for the real
//! API. [`LlmOutlineGenerator`] is the production implementation on top of
//! `edgequake-llm`.
//!
//! ## Retry Strategy
//!
//! Retries are off by default: a failed generation goes back to the user,
//! who decides whether to try again. When `max_retries > 0` the wait before
//! attempt `n` is `retry_backoff_ms * 2^(n-1)`.

use crate::config::{MindMapConfig, DEFAULT_MODEL};
use crate::error::GenerationError;
use crate::prompts::{outline_user_message, DEFAULT_SYSTEM_PROMPT};
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, warn};

/// One outline request: a system message and a user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineRequest {
    pub system: String,
    pub user: String,
}

impl OutlineRequest {
    /// Embed `text` in the fixed outline template.
    pub fn for_text(text: &str, system_prompt: Option<&str>) -> Self {
        Self {
            system: system_prompt.unwrap_or(DEFAULT_SYSTEM_PROMPT).to_string(),
            user: outline_user_message(text),
        }
    }
}

/// A finished completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    /// Raw completion text, before tag extraction.
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// Transport retries spent before this completion arrived.
    pub retries: u32,
}

/// Anything that can turn an [`OutlineRequest`] into a [`Completion`].
///
/// Returns a boxed future so the trait stays object-safe and can be shared
/// as `Arc<dyn OutlineGenerator>`.
pub trait OutlineGenerator: Send + Sync {
    fn generate<'a>(
        &'a self,
        request: &'a OutlineRequest,
    ) -> BoxFuture<'a, Result<Completion, GenerationError>>;
}

/// [`OutlineGenerator`] backed by an `edgequake-llm` provider.
pub struct LlmOutlineGenerator {
    provider: Arc<dyn LLMProvider>,
    temperature: f32,
    max_tokens: usize,
    max_retries: u32,
    retry_backoff_ms: u64,
    api_timeout_secs: u64,
}

impl LlmOutlineGenerator {
    /// Wrap an already-constructed provider.
    pub fn with_provider(provider: Arc<dyn LLMProvider>, config: &MindMapConfig) -> Self {
        Self {
            provider,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
            api_timeout_secs: config.api_timeout_secs,
        }
    }

    /// Resolve a provider from the config and environment.
    pub fn from_config(config: &MindMapConfig) -> Result<Self, GenerationError> {
        let provider = resolve_provider(config)?;
        Ok(Self::with_provider(provider, config))
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }

    async fn complete(&self, request: &OutlineRequest) -> Result<Completion, GenerationError> {
        let start = Instant::now();
        let messages = vec![
            ChatMessage::system(request.system.as_str()),
            ChatMessage::user(request.user.as_str()),
        ];
        let options = self.options();
        let call_timeout = Duration::from_secs(self.api_timeout_secs);

        let mut last_err: Option<GenerationError> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = self.retry_backoff_ms * 2u64.pow(attempt - 1);
                warn!(
                    "Outline request: retry {}/{} after {}ms",
                    attempt, self.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            match timeout(call_timeout, self.provider.chat(&messages, Some(&options))).await {
                Ok(Ok(response)) => {
                    if response.content.trim().is_empty() {
                        return Err(GenerationError::EmptyResponse);
                    }
                    debug!(
                        "Outline: {} input tokens, {} output tokens, {:?}",
                        response.prompt_tokens,
                        response.completion_tokens,
                        start.elapsed()
                    );
                    return Ok(Completion {
                        text: response.content,
                        input_tokens: response.prompt_tokens as u64,
                        output_tokens: response.completion_tokens as u64,
                        retries: attempt,
                    });
                }
                Ok(Err(e)) => {
                    let message = e.to_string();
                    warn!("Outline request: attempt {} failed: {}", attempt + 1, message);
                    last_err = Some(GenerationError::Api {
                        attempts: attempt + 1,
                        message,
                    });
                }
                Err(_) => {
                    warn!(
                        "Outline request: attempt {} timed out after {}s",
                        attempt + 1,
                        self.api_timeout_secs
                    );
                    last_err = Some(GenerationError::Timeout {
                        secs: self.api_timeout_secs,
                    });
                }
            }
        }

        Err(last_err.unwrap_or(GenerationError::EmptyResponse))
    }
}

impl OutlineGenerator for LlmOutlineGenerator {
    fn generate<'a>(
        &'a self,
        request: &'a OutlineRequest,
    ) -> BoxFuture<'a, Result<Completion, GenerationError>> {
        self.complete(request).boxed()
    }
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, GenerationError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        GenerationError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`) — used as-is.
/// 2. **Named provider + model** (`config.provider_name`) — the factory
///    reads the matching API key from the environment.
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`).
/// 4. **OpenAI key present** (`OPENAI_API_KEY`) — OpenAI wins when several
///    keys are set.
/// 5. **Full auto-detection** (`ProviderFactory::from_env`).
pub fn resolve_provider(config: &MindMapConfig) -> Result<Arc<dyn LLMProvider>, GenerationError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);

    if let Some(ref name) = config.provider_name {
        info!("Using provider '{}' with model '{}'", name, model);
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(env_model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !env_model.is_empty() {
            return create_provider(&prov, &env_model);
        }
    }

    if std::env::var("OPENAI_API_KEY").is_ok_and(|k| !k.is_empty()) {
        return create_provider("openai", model);
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| GenerationError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
