//! # copilot-llm
//!
//! Provider-agnostic completion interface used by the trading copilot.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Copilot                              │
//! │  ┌──────────────┐  ┌──────────────┐  ┌────────────────────┐  │
//! │  │   Prompt     │  │  Guardrail   │  │   LlmProvider      │  │
//! │  │   Builder    │──│  Evaluator   │  │   (Strategy)       │  │
//! │  └──────────────┘  └──────────────┘  └────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `LlmProvider` trait lets the copilot swap between Ollama, OpenAI or any
//! other chat-completion backend without touching the analysis pipeline.

pub mod error;
pub mod message;
pub mod provider;

pub use error::{LlmError, Result};
pub use message::{Message, Role};
pub use provider::{Completion, GenerationOptions, LlmProvider};
