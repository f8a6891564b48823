//! LLM Provider Strategy Pattern
//!
//! Common interface for chat-completion backends (Ollama, OpenAI-compatible
//! gateways, ...). The copilot only ever talks to `dyn LlmProvider`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use copilot_llm::{GenerationOptions, LlmProvider, Message};
//!
//! let options = GenerationOptions::analysis("gpt-4");
//! let completion = provider.complete(&messages, &options).await?;
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{LlmError, Result};
use crate::message::Message;

/// Configuration for LLM generation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Model identifier (e.g., "llama3.2", "gpt-4")
    pub model: String,

    /// Temperature for sampling (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Top-p nucleus sampling
    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Ask the backend to constrain output to a JSON object
    #[serde(default)]
    pub json_mode: bool,
}

const fn default_temperature() -> f32 { 0.7 }
const fn default_max_tokens() -> u32 { 2048 }
const fn default_top_p() -> f32 { 0.9 }

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: "llama3.2".into(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
            json_mode: false,
        }
    }
}

impl GenerationOptions {
    /// Conservative settings for structured trade analysis
    pub fn analysis(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: 0.3,
            max_tokens: 1000,
            json_mode: true,
            ..Default::default()
        }
    }
}

/// Response from an LLM completion
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Completion {
    /// The generated text
    pub content: String,

    /// Model that generated this response
    pub model: String,

    /// Token usage statistics (if available)
    pub usage: Option<TokenUsage>,

    pub finish_reason: Option<FinishReason>,
}

/// Token usage statistics
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Reason for completion finishing
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    Error,
}

impl FinishReason {
    /// Map an OpenAI-style finish reason string
    pub fn from_api(reason: &str) -> Self {
        match reason {
            "stop" => Self::Stop,
            "length" => Self::Length,
            "content_filter" => Self::ContentFilter,
            _ => Self::Error,
        }
    }
}

/// Provider metadata
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProviderInfo {
    /// Provider name (e.g., "Ollama", "OpenAI")
    pub name: String,

    /// Available models
    pub models: Vec<ModelInfo>,

    /// Whether the backend honors `json_mode`
    pub supports_json_mode: bool,
}

/// Information about a model
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub context_length: Option<u32>,
}

/// Strategy trait for LLM providers
///
/// Implement this trait to add support for new completion backends.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get provider information and capabilities
    async fn info(&self) -> Result<ProviderInfo>;

    /// Check if the provider is reachable and configured correctly
    async fn health_check(&self) -> Result<bool>;

    /// Generate a completion from messages
    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<Completion>;

    /// List available models
    async fn list_models(&self) -> Result<Vec<ModelInfo>>;

    /// Provider name for logs
    fn name(&self) -> &str;

    /// Estimate token count for text (provider-specific tokenization)
    fn estimate_tokens(&self, text: &str) -> u32 {
        // Default: rough estimate of ~4 chars per token
        u32::try_from(text.len() / 4).unwrap_or(u32::MAX)
    }
}

/// Provider selection strategy
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderStrategy {
    /// Use the first provider only
    Single,

    /// Move to the next provider when one fails with a retryable error
    Failover,

    /// Round-robin load balancing
    RoundRobin,
}

/// Multi-provider wrapper with failover support
pub struct ProviderChain {
    providers: Vec<Box<dyn LlmProvider>>,
    strategy: ProviderStrategy,
    current_index: AtomicUsize,
}

impl ProviderChain {
    pub fn new(providers: Vec<Box<dyn LlmProvider>>, strategy: ProviderStrategy) -> Self {
        Self {
            providers,
            strategy,
            current_index: AtomicUsize::new(0),
        }
    }

    /// Get the next provider based on strategy
    pub fn next_provider(&self) -> Option<&dyn LlmProvider> {
        if self.providers.is_empty() {
            return None;
        }

        let idx = match self.strategy {
            ProviderStrategy::Single => 0,
            ProviderStrategy::RoundRobin => {
                self.current_index.fetch_add(1, Ordering::SeqCst) % self.providers.len()
            }
            ProviderStrategy::Failover => {
                self.current_index.load(Ordering::SeqCst) % self.providers.len()
            }
        };
        Some(self.providers[idx].as_ref())
    }

    /// Advance to next provider (for failover)
    pub fn advance(&self) {
        self.current_index.fetch_add(1, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[async_trait]
impl LlmProvider for ProviderChain {
    async fn info(&self) -> Result<ProviderInfo> {
        let provider = self
            .next_provider()
            .ok_or_else(|| LlmError::Config("No providers configured".into()))?;
        provider.info().await
    }

    async fn health_check(&self) -> Result<bool> {
        for provider in &self.providers {
            if provider.health_check().await.unwrap_or(false) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        let attempts = match self.strategy {
            ProviderStrategy::Failover => self.providers.len(),
            ProviderStrategy::Single | ProviderStrategy::RoundRobin => 1,
        };

        let mut last_error = LlmError::Config("No providers configured".into());
        for _ in 0..attempts {
            let Some(provider) = self.next_provider() else { break };
            match provider.complete(messages, options).await {
                Ok(completion) => return Ok(completion),
                Err(e) if e.is_retryable() && self.strategy == ProviderStrategy::Failover => {
                    tracing::warn!(
                        provider = provider.name(),
                        error = %e,
                        "Provider failed, failing over"
                    );
                    self.advance();
                    last_error = e;
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_error)
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let mut models = Vec::new();
        for provider in &self.providers {
            if let Ok(found) = provider.list_models().await {
                models.extend(found);
            }
        }
        Ok(models)
    }

    fn name(&self) -> &str {
        "ProviderChain"
    }
}
