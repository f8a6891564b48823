//! Server Configuration

use std::sync::Arc;

use anyhow::Context;
use copilot_llm::{
    LlmProvider,
    provider::{ProviderChain, ProviderStrategy},
};
use copilot_runtime::{OllamaProvider, OpenAiProvider};
use trading_copilot::alerts::AlertServiceConfig;

/// Which completion backend to use
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderKind {
    Ollama,
    OpenAi,
    /// Ollama first, OpenAI when Ollama is down
    Failover,
}

impl ProviderKind {
    fn parse(raw: &str) -> anyhow::Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAi),
            "failover" => Ok(Self::Failover),
            other => {
                anyhow::bail!("unknown LLM_PROVIDER '{other}' (expected ollama, openai or failover)")
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub provider: ProviderKind,
    pub alerts: Option<AlertServiceConfig>,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
        let provider = ProviderKind::parse(
            &std::env::var("LLM_PROVIDER").unwrap_or_else(|_| "ollama".into()),
        )?;

        Ok(Self {
            bind_addr,
            provider,
            alerts: AlertServiceConfig::from_env(),
        })
    }

    /// Build the configured completion backend
    pub fn build_provider(&self) -> anyhow::Result<Arc<dyn LlmProvider>> {
        Ok(match self.provider {
            ProviderKind::Ollama => {
                Arc::new(OllamaProvider::from_env().context("configuring Ollama")?)
            }
            ProviderKind::OpenAi => {
                Arc::new(OpenAiProvider::from_env().context("configuring OpenAI")?)
            }
            ProviderKind::Failover => {
                let providers: Vec<Box<dyn LlmProvider>> = vec![
                    Box::new(OllamaProvider::from_env().context("configuring Ollama")?),
                    Box::new(OpenAiProvider::from_env().context("configuring OpenAI")?),
                ];
                Arc::new(ProviderChain::new(providers, ProviderStrategy::Failover))
            }
        })
    }
}
