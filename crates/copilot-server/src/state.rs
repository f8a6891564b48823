//! Application State

use std::sync::Arc;

use tokio::sync::RwLock;
use trading_copilot::{Copilot, GuardrailConfig};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Analysis pipeline (provider, alert client, insight history)
    pub copilot: Arc<Copilot>,

    /// Live guardrail limits; handlers evaluate against a cloned snapshot
    pub guardrails: Arc<RwLock<GuardrailConfig>>,

    pub alerts_configured: bool,
}

impl AppState {
    pub fn new(copilot: Copilot, guardrails: GuardrailConfig, alerts_configured: bool) -> Self {
        Self {
            copilot: Arc::new(copilot),
            guardrails: Arc::new(RwLock::new(guardrails)),
            alerts_configured,
        }
    }

    pub async fn guardrail_snapshot(&self) -> GuardrailConfig {
        self.guardrails.read().await.clone()
    }
}
