//! Error Types for the Trading Copilot
//!
//! Guardrail rejections are not errors; they travel inside `GuardrailVerdict`.
//! These variants cover everything around the evaluator: provider calls,
//! malformed model replies, the alert service and configuration.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CopilotError>;

#[derive(Error, Debug)]
pub enum CopilotError {
    #[error("LLM error: {0}")]
    Llm(#[from] copilot_llm::LlmError),

    #[error("Model reply contained no JSON object")]
    MissingJson,

    #[error("Malformed analysis: {0}")]
    MalformedAnalysis(String),

    #[error("Analysis timed out after {0}s")]
    Timeout(u64),

    #[error("Alert service error: {status}: {body}")]
    AlertService { status: u16, body: String },

    #[error("Invalid alert: {0}")]
    InvalidAlert(String),

    #[error("Alert not found: {0}")]
    AlertNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CopilotError {
    /// Whether a retry could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Llm(e) => e.is_retryable(),
            Self::Timeout(_) | Self::Network(_) => true,
            Self::AlertService { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Message safe to show an end user
    pub fn user_message(&self) -> String {
        match self {
            Self::Llm(e) => e.user_message(),
            Self::MissingJson | Self::MalformedAnalysis(_) => {
                "The AI returned an unreadable analysis. A conservative fallback was used.".into()
            }
            Self::Timeout(_) => "The AI analysis took too long. Please try again.".into(),
            Self::AlertService { .. } | Self::Network(_) => {
                "The alert service is unavailable right now.".into()
            }
            Self::InvalidAlert(msg) => format!("Invalid alert: {msg}"),
            Self::AlertNotFound(id) => format!("No alert with id {id}"),
            Self::Config(_) => "Copilot is misconfigured. Check server logs.".into(),
            Self::Serialization(_) => "Failed to process data.".into(),
        }
    }
}
