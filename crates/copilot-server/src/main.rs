//! trading-copilot HTTP Server
//!
//! Axum server exposing the guardrail evaluator, the AI analysis pipeline
//! and the live safety-rule configuration.

mod config;
mod handlers;
mod routes;
mod state;

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trading_copilot::{Copilot, CopilotConfig, GuardrailConfig, alerts::HttpAlertClient};

use crate::config::ServerConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    let server = ServerConfig::from_env()?;

    // Initialize LLM provider
    let provider = server.build_provider()?;

    match provider.health_check().await {
        Ok(true) => {
            tracing::info!("✓ Connected to {}", provider.name());
            if let Ok(models) = provider.list_models().await {
                for model in models {
                    tracing::info!("  Model: {}", model.id);
                }
            }
        }
        Ok(false) | Err(_) => {
            tracing::warn!("⚠ {} not available - analysis will use the fallback", provider.name());
        }
    }

    // Guardrails
    let guardrails = GuardrailConfig::from_env();
    guardrails.validate().context("invalid guardrail configuration")?;
    tracing::info!(
        max_position_pct = guardrails.max_position_size_pct,
        max_daily_loss_pct = guardrails.max_daily_loss_pct,
        volatility_threshold = guardrails.volatility_threshold,
        forbidden = guardrails.forbidden_symbols.len(),
        "Guardrails loaded"
    );

    // Copilot pipeline
    let mut copilot = Copilot::new(provider, CopilotConfig::from_env());

    let alerts_configured = match server.alerts.clone() {
        Some(alert_config) => {
            tracing::info!("✓ Alert service at {}", alert_config.base_url);
            copilot = copilot.with_alert_client(Arc::new(HttpAlertClient::new(alert_config)?));
            true
        }
        None => {
            tracing::warn!("⚠ Alert service not configured - alerts disabled");
            tracing::warn!("  Set ALERT_SERVICE_URL in .env");
            false
        }
    };

    let state = AppState::new(copilot, guardrails, alerts_configured);
    let app = routes::router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&server.bind_addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 trading-copilot server running on http://{}", server.bind_addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET    /health                        - Health check");
    tracing::info!("  POST   /api/guardrails/evaluate       - Evaluate a suggestion");
    tracing::info!("  POST   /api/portfolio/concentration   - Concentration warnings");
    tracing::info!("  POST   /api/copilot/analyze           - AI analysis of a symbol");
    tracing::info!("  POST   /api/copilot/insights          - Rule-based insights");
    tracing::info!("  GET    /api/copilot/insights/history  - Recent insights");
    tracing::info!("  GET    /api/safety                    - Guardrail configuration");
    tracing::info!("  POST   /api/safety/rules              - Apply a safety rule");
    tracing::info!("  DELETE /api/safety/forbidden/{{symbol}} - Allow a symbol again");
    tracing::info!("");

    axum::serve(listener, app).await?;

    Ok(())
}
