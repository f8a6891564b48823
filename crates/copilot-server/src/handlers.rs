//! HTTP Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{Local, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use trading_copilot::{
    AnalyzeRequest, ConcentrationWarning, CopilotReport, GuardrailConfig, GuardrailVerdict,
    Insight, MarketSnapshot, PortfolioSnapshot, SafetyRule, Suggestion, analyze_concentration,
    evaluate,
};

use crate::state::AppState;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub provider: String,
    pub provider_connected: bool,
    pub alerts_configured: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub suggestion: Suggestion,
    pub market: MarketSnapshot,
    #[serde(default)]
    pub portfolio: PortfolioSnapshot,
    /// Local time of day; defaults to the server clock
    #[serde(default)]
    pub now: Option<NaiveTime>,
}

#[derive(Debug, Deserialize)]
pub struct ConcentrationRequest {
    pub portfolio: PortfolioSnapshot,
}

#[derive(Debug, Serialize)]
pub struct ConcentrationResponse {
    pub warnings: Vec<ConcentrationWarning>,
}

#[derive(Debug, Deserialize)]
pub struct InsightsRequest {
    pub market: MarketSnapshot,
    #[serde(default)]
    pub portfolio: PortfolioSnapshot,
}

#[derive(Debug, Serialize)]
pub struct InsightsResponse {
    pub count: usize,
    pub insights: Vec<Insight>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_history_hours")]
    pub hours: u32,
}

const fn default_history_hours() -> u32 {
    24
}

fn bad_request(error: impl Into<String>, code: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse { error: error.into(), code: code.into() }),
    )
}

fn require_symbol(symbol: &str) -> Result<(), (StatusCode, Json<ErrorResponse>)> {
    if symbol.trim().is_empty() {
        return Err(bad_request("symbol is required", "MISSING_SYMBOL"));
    }
    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        provider: state.copilot.provider_name().to_string(),
        provider_connected: state.copilot.provider_healthy().await,
        alerts_configured: state.alerts_configured,
    })
}

/// Evaluate a caller-supplied suggestion against the guardrails
pub async fn evaluate_suggestion(
    State(state): State<AppState>,
    Json(payload): Json<EvaluateRequest>,
) -> ApiResult<GuardrailVerdict> {
    require_symbol(&payload.suggestion.symbol)?;

    let config = state.guardrail_snapshot().await;
    let now = payload.now.unwrap_or_else(|| Local::now().time());

    Ok(Json(evaluate(
        &config,
        &payload.suggestion,
        &payload.market,
        &payload.portfolio,
        now,
    )))
}

/// Concentration warnings for a portfolio
pub async fn portfolio_concentration(
    State(state): State<AppState>,
    Json(payload): Json<ConcentrationRequest>,
) -> Json<ConcentrationResponse> {
    let config = state.guardrail_snapshot().await;
    Json(ConcentrationResponse {
        warnings: analyze_concentration(&config, &payload.portfolio),
    })
}

/// Full AI analysis of one symbol
pub async fn analyze(
    State(state): State<AppState>,
    Json(payload): Json<AnalyzeRequest>,
) -> ApiResult<CopilotReport> {
    require_symbol(&payload.market.symbol)?;
    if payload.user_id.trim().is_empty() {
        return Err(bad_request("user_id is required", "MISSING_USER"));
    }

    let config = state.guardrail_snapshot().await;
    let report = state
        .copilot
        .analyze(&payload, &config, Local::now().fixed_offset())
        .await;

    Ok(Json(report))
}

/// Rule-based insights for a market and portfolio
pub async fn insights(
    State(state): State<AppState>,
    Json(payload): Json<InsightsRequest>,
) -> Json<InsightsResponse> {
    let config = state.guardrail_snapshot().await;
    let insights = state
        .copilot
        .insights(&payload.market, &payload.portfolio, &config, Utc::now())
        .await;

    Json(InsightsResponse { count: insights.len(), insights })
}

/// Insights recorded in the last `hours`
pub async fn insight_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Json<InsightsResponse> {
    let insights = state.copilot.insight_history(query.hours, Utc::now()).await;
    Json(InsightsResponse { count: insights.len(), insights })
}

/// Current guardrail configuration
pub async fn safety_config(State(state): State<AppState>) -> Json<GuardrailConfig> {
    Json(state.guardrail_snapshot().await)
}

/// Apply a safety-rule change
pub async fn add_safety_rule(
    State(state): State<AppState>,
    Json(rule): Json<SafetyRule>,
) -> ApiResult<GuardrailConfig> {
    let mut config = state.guardrails.write().await;
    config
        .apply_rule(&rule)
        .map_err(|e| bad_request(e.to_string(), "INVALID_RULE"))?;
    Ok(Json(config.clone()))
}

/// Remove a symbol from the forbidden list
pub async fn remove_forbidden_symbol(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> ApiResult<GuardrailConfig> {
    let mut config = state.guardrails.write().await;
    if !config.forbidden_symbols.remove(&symbol) {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("{} is not forbidden", symbol.to_uppercase()),
                code: "NOT_FORBIDDEN".into(),
            }),
        ));
    }

    tracing::info!(symbol = %symbol.to_uppercase(), "Symbol removed from forbidden list");
    Ok(Json(config.clone()))
}
