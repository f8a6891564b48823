//! # copilot-runtime
//!
//! Completion backends for the trading copilot.
//!
//! ## Providers
//!
//! - **Ollama** (default): local inference via Ollama
//! - **OpenAI** (default): any OpenAI-compatible `/v1/chat/completions` endpoint
//!
//! ## Usage
//!
//! ```rust,ignore
//! use copilot_runtime::{OllamaProvider, OpenAiProvider};
//!
//! let local = OllamaProvider::from_env()?;
//! let hosted = OpenAiProvider::from_env()?;
//! ```

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "openai")]
pub mod openai;

#[cfg(feature = "ollama")]
pub use ollama::OllamaProvider;

#[cfg(feature = "openai")]
pub use openai::OpenAiProvider;

// Re-export core types for convenience
pub use copilot_llm::{Completion, GenerationOptions, LlmError, LlmProvider, Message, Result, Role};
