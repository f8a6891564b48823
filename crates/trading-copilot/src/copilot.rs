//! Copilot Pipeline
//!
//! ```text
//! snapshots ─► prompt ─► LlmProvider ─► parse ─┬─► Suggestion ─► evaluate ─► plan_alerts ─► AlertClient
//!                          (timeout)           └─ fallback on any failure
//! ```
//!
//! The model only ever proposes; the guardrails decide. Provider failures,
//! unreadable replies and alert-service errors are logged and never surface
//! as errors to the caller.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Utc};
use copilot_llm::{GenerationOptions, LlmProvider};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::alerts::{AlertClient, plan_alerts};
use crate::error::{CopilotError, Result};
use crate::guardrails::{GuardrailConfig, GuardrailVerdict, evaluate, screen_insight};
use crate::history::InsightHistory;
use crate::insights::{Insight, analyze_market, analyze_portfolio, rank_insights};
use crate::model::{
    ActionKind, ConfidenceLevel, MarketSnapshot, PortfolioSnapshot, RiskLevel, Suggestion,
    TimeHorizon,
};
use crate::parse::{AiAnalysis, parse_analysis};
use crate::prompt;

/// Report schema identifier
pub const REPORT_TYPE: &str = "copilot.suggestion.v1";

/// Estimated execution fees as a fraction of cost
const FEE_RATE: f64 = 0.005;

const DISCLAIMER: &str = "This analysis is for educational purposes only";
const RISK_DISCLOSURE: &str =
    "Trading involves risk of loss. Past performance does not guarantee future results.";

/// Copilot configuration
#[derive(Clone, Debug)]
pub struct CopilotConfig {
    pub generation: GenerationOptions,

    /// Upper bound on one provider call
    pub timeout_secs: u64,
}

impl Default for CopilotConfig {
    fn default() -> Self {
        Self {
            generation: GenerationOptions::analysis("llama3.2"),
            timeout_secs: 60,
        }
    }
}

impl CopilotConfig {
    pub fn from_env() -> Self {
        let model = std::env::var("COPILOT_MODEL").unwrap_or_else(|_| "llama3.2".into());
        let timeout_secs = std::env::var("LLM_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        Self {
            generation: GenerationOptions::analysis(model),
            timeout_secs,
        }
    }
}

/// `POST /api/copilot/analyze` body
#[derive(Clone, Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub user_id: String,
    pub market: MarketSnapshot,
    #[serde(default)]
    pub portfolio: PortfolioSnapshot,
}

/// Where the analysis came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisSource {
    Model,
    Fallback,
}

#[derive(Clone, Debug, Serialize)]
pub struct RiskImpact {
    /// Downside, percent
    pub estimated_drawdown: f64,
    pub bp_usage: f64,
    pub max_loss: f64,
    pub risk_reward_ratio: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct Features {
    pub volume_z_score: Option<f64>,
    pub rsi: Option<f64>,
    pub news_sentiment: f64,
    pub technical_signals: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct WhatIf {
    pub quantity: f64,
    pub price: f64,
    pub estimated_cost: f64,
    pub estimated_fees: f64,
    pub potential_pnl: f64,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub time_horizon: TimeHorizon,
}

#[derive(Clone, Debug, Serialize)]
pub struct Compliance {
    pub disclaimer: &'static str,
    pub requires_confirmation: bool,
    pub not_financial_advice: bool,
    pub risk_disclosure: &'static str,
}

impl Default for Compliance {
    fn default() -> Self {
        Self {
            disclaimer: DISCLAIMER,
            requires_confirmation: true,
            not_financial_advice: true,
            risk_disclosure: RISK_DISCLOSURE,
        }
    }
}

/// Explainable suggestion handed to the presentation layer
#[derive(Clone, Debug, Serialize)]
pub struct CopilotReport {
    #[serde(rename = "type")]
    pub report_type: &'static str,
    pub suggestion_id: Uuid,
    pub user_id: String,
    pub symbol: String,
    /// Model reasoning
    pub suggestion: String,
    pub action_type: ActionKind,
    pub confidence: f64,
    pub confidence_level: ConfidenceLevel,
    pub risk_level: RiskLevel,
    pub source: AnalysisSource,
    pub risk_impact: RiskImpact,
    pub features: Features,
    pub what_if: WhatIf,
    pub guardrails: GuardrailVerdict,
    pub compliance: Compliance,
    /// Ids of alerts created at the alert service
    pub alert_ids: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl CopilotReport {
    fn build(
        request: &AnalyzeRequest,
        suggestion: &Suggestion,
        verdict: GuardrailVerdict,
        source: AnalysisSource,
        alert_ids: Vec<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let cost = suggestion.cost();

        Self {
            report_type: REPORT_TYPE,
            suggestion_id: Uuid::new_v4(),
            user_id: request.user_id.clone(),
            symbol: suggestion.symbol.clone(),
            suggestion: suggestion.reasoning.clone(),
            action_type: suggestion.action,
            confidence: suggestion.confidence,
            confidence_level: suggestion.confidence_level,
            risk_level: suggestion.risk_level,
            source,
            risk_impact: RiskImpact {
                estimated_drawdown: suggestion.downside_pct,
                bp_usage: verdict.buying_power_usage_pct,
                max_loss: verdict.estimated_max_loss,
                risk_reward_ratio: verdict.risk_reward_ratio,
            },
            features: Features {
                volume_z_score: request.market.volume_z_score,
                rsi: request.market.rsi,
                news_sentiment: request.market.news_sentiment,
                technical_signals: suggestion.technical_signals.clone(),
            },
            what_if: WhatIf {
                quantity: suggestion.quantity(),
                price: suggestion.price(),
                estimated_cost: cost,
                estimated_fees: cost * FEE_RATE,
                potential_pnl: cost * (suggestion.upside_pct / 100.0),
                stop_loss: suggestion.stop_loss,
                take_profit: suggestion.take_profit,
                time_horizon: suggestion.time_horizon,
            },
            guardrails: verdict,
            compliance: Compliance::default(),
            alert_ids,
            timestamp,
        }
    }
}

/// The trading copilot service
pub struct Copilot {
    provider: Arc<dyn LlmProvider>,
    alerts: Option<Arc<dyn AlertClient>>,
    config: CopilotConfig,
    history: RwLock<InsightHistory>,
}

impl Copilot {
    pub fn new(provider: Arc<dyn LlmProvider>, config: CopilotConfig) -> Self {
        Self {
            provider,
            alerts: None,
            config,
            history: RwLock::new(InsightHistory::default()),
        }
    }

    /// Submit planned alerts through this client
    #[must_use]
    pub fn with_alert_client(mut self, client: Arc<dyn AlertClient>) -> Self {
        self.alerts = Some(client);
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub const fn config(&self) -> &CopilotConfig {
        &self.config
    }

    pub async fn provider_healthy(&self) -> bool {
        self.provider.health_check().await.unwrap_or(false)
    }

    /// Ask the model, evaluate its suggestion, create alerts for it.
    ///
    /// `now` supplies both the report timestamp and the local time of day used
    /// for the market-hours check.
    pub async fn analyze(
        &self,
        request: &AnalyzeRequest,
        config: &GuardrailConfig,
        now: DateTime<FixedOffset>,
    ) -> CopilotReport {
        let requested = self.request_analysis(&request.market, &request.portfolio).await;
        let (analysis, source) = match requested {
            Ok(analysis) => (analysis, AnalysisSource::Model),
            Err(e) => {
                tracing::warn!(
                    symbol = %request.market.symbol,
                    error = %e,
                    "Using fallback analysis"
                );
                (AiAnalysis::fallback(), AnalysisSource::Fallback)
            }
        };

        let suggestion = analysis.into_suggestion(&request.market);
        let verdict =
            evaluate(config, &suggestion, &request.market, &request.portfolio, now.time());

        tracing::info!(
            symbol = %suggestion.symbol,
            action = suggestion.action.as_str(),
            accepted = verdict.accepted,
            "Suggestion evaluated"
        );

        let alert_ids = self.dispatch_alerts(&suggestion, &verdict, &request.user_id).await;

        CopilotReport::build(
            request,
            &suggestion,
            verdict,
            source,
            alert_ids,
            now.with_timezone(&Utc),
        )
    }

    /// Rule-based insights, screened, ranked and recorded in history.
    ///
    /// Risk warnings describe exposure already held and are always surfaced;
    /// every other insight must pass `screen_insight`.
    pub async fn insights(
        &self,
        market: &MarketSnapshot,
        portfolio: &PortfolioSnapshot,
        config: &GuardrailConfig,
        now: DateTime<Utc>,
    ) -> Vec<Insight> {
        let mut generated = analyze_market(market, now);
        generated.extend(analyze_portfolio(config, portfolio, now));

        let surfaced: Vec<Insight> = generated
            .into_iter()
            .filter(|insight| {
                if insight.is_warning() {
                    return true;
                }
                let violations = screen_insight(config, insight, market, portfolio);
                if let Some(first) = violations.first() {
                    tracing::warn!(insight = %insight.id, reason = %first, "Insight rejected");
                    return false;
                }
                true
            })
            .collect();

        let ranked = rank_insights(surfaced);
        self.history.write().await.record(ranked.iter().cloned(), now);
        ranked
    }

    pub async fn insight_history(&self, hours: u32, now: DateTime<Utc>) -> Vec<Insight> {
        self.history.read().await.recent(hours, now)
    }

    async fn request_analysis(
        &self,
        market: &MarketSnapshot,
        portfolio: &PortfolioSnapshot,
    ) -> Result<AiAnalysis> {
        let messages = prompt::analysis_messages(market, portfolio);
        let limit = Duration::from_secs(self.config.timeout_secs);

        let completion = tokio::time::timeout(
            limit,
            self.provider.complete(&messages, &self.config.generation),
        )
        .await
        .map_err(|_| CopilotError::Timeout(self.config.timeout_secs))??;

        tracing::debug!(
            model = %completion.model,
            chars = completion.content.len(),
            "Analysis received"
        );
        parse_analysis(&completion.content)
    }

    async fn dispatch_alerts(
        &self,
        suggestion: &Suggestion,
        verdict: &GuardrailVerdict,
        user_id: &str,
    ) -> Vec<String> {
        let Some(client) = &self.alerts else {
            return Vec::new();
        };

        let mut created = Vec::new();
        for request in plan_alerts(suggestion, verdict, user_id) {
            match client.submit(&request).await {
                Ok(alert) => created.push(alert.id),
                Err(e) => tracing::warn!(
                    symbol = %suggestion.symbol,
                    client = client.name(),
                    error = %e,
                    "Alert creation failed"
                ),
            }
        }
        created
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::TimeZone;
    use copilot_llm::{
        Completion, LlmError, Message,
        provider::{FinishReason, ModelInfo, ProviderInfo},
    };

    use super::*;
    use crate::alerts::MockAlertClient;
    use crate::model::PositionSnapshot;

    enum Reply {
        Text(&'static str),
        Fail,
        Hang,
    }

    struct ScriptedProvider(Reply);

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn info(&self) -> copilot_llm::Result<ProviderInfo> {
            Ok(ProviderInfo {
                name: "scripted".into(),
                models: Vec::new(),
                supports_json_mode: true,
            })
        }

        async fn health_check(&self) -> copilot_llm::Result<bool> {
            Ok(true)
        }

        async fn complete(
            &self,
            _: &[Message],
            options: &GenerationOptions,
        ) -> copilot_llm::Result<Completion> {
            match self.0 {
                Reply::Text(text) => Ok(Completion {
                    content: text.into(),
                    model: options.model.clone(),
                    usage: None,
                    finish_reason: Some(FinishReason::Stop),
                }),
                Reply::Fail => Err(LlmError::ProviderUnavailable("connection refused".into())),
                Reply::Hang => std::future::pending().await,
            }
        }

        async fn list_models(&self) -> copilot_llm::Result<Vec<ModelInfo>> {
            Ok(Vec::new())
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    const ALERT_REPLY: &str = r#"{
        "action_type": "alert",
        "confidence": 0.8,
        "reasoning": "Earnings next week; set exits",
        "risk_level": "low",
        "suggested_quantity": 10,
        "potential_upside": "10%",
        "potential_downside": "4%",
        "stop_loss_suggestion": 140,
        "take_profit_suggestion": 170
    }"#;

    fn copilot(reply: Reply) -> Copilot {
        Copilot::new(Arc::new(ScriptedProvider(reply)), CopilotConfig::default())
    }

    fn request() -> AnalyzeRequest {
        let mut market = MarketSnapshot::new("AAPL", 150.0);
        market.volatility = 0.2;
        market.rsi = Some(45.0);

        AnalyzeRequest {
            user_id: "user-1".into(),
            market,
            portfolio: PortfolioSnapshot::new(100_000.0, 20_000.0),
        }
    }

    fn at_10_30() -> DateTime<FixedOffset> {
        Utc.with_ymd_and_hms(2025, 3, 4, 10, 30, 0).unwrap().fixed_offset()
    }

    #[tokio::test]
    async fn test_accepted_alert_suggestion_creates_alerts() {
        let alerts = Arc::new(MockAlertClient::new());
        let copilot = copilot(Reply::Text(ALERT_REPLY)).with_alert_client(alerts.clone());

        let report = copilot.analyze(&request(), &GuardrailConfig::default(), at_10_30()).await;

        assert_eq!(report.report_type, "copilot.suggestion.v1");
        assert_eq!(report.source, AnalysisSource::Model);
        assert_eq!(report.action_type, ActionKind::Alert);
        assert!(report.guardrails.accepted);
        assert!(report.guardrails.market_hours_ok);
        assert_eq!(report.what_if.estimated_cost, 1500.0);
        assert!((report.what_if.estimated_fees - 7.5).abs() < 1e-9);
        assert!((report.what_if.potential_pnl - 150.0).abs() < 1e-9);
        assert!((report.risk_impact.max_loss - 60.0).abs() < 1e-9);
        assert_eq!(report.alert_ids.len(), 3);
        assert_eq!(alerts.list_alerts("user-1").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_provider_failure_falls_back() {
        let copilot = copilot(Reply::Fail);
        let report = copilot.analyze(&request(), &GuardrailConfig::default(), at_10_30()).await;

        assert_eq!(report.source, AnalysisSource::Fallback);
        assert_eq!(report.action_type, ActionKind::Watch);
        assert_eq!(report.confidence, 0.3);
        assert!(!report.guardrails.accepted);
        assert_eq!(
            report.guardrails.reasons(),
            vec!["Confidence level too low for actionable suggestion"]
        );
        assert!(report.alert_ids.is_empty());
    }

    #[tokio::test]
    async fn test_timeout_falls_back() {
        let copilot = Copilot::new(
            Arc::new(ScriptedProvider(Reply::Hang)),
            CopilotConfig { timeout_secs: 0, ..Default::default() },
        );
        let report = copilot.analyze(&request(), &GuardrailConfig::default(), at_10_30()).await;
        assert_eq!(report.source, AnalysisSource::Fallback);
    }

    #[tokio::test]
    async fn test_unreadable_reply_falls_back() {
        let copilot = copilot(Reply::Text("I think you should buy."));
        let report = copilot.analyze(&request(), &GuardrailConfig::default(), at_10_30()).await;
        assert_eq!(report.source, AnalysisSource::Fallback);
    }

    #[tokio::test]
    async fn test_alert_service_failure_is_not_fatal() {
        let copilot = copilot(Reply::Text(ALERT_REPLY))
            .with_alert_client(Arc::new(MockAlertClient::unavailable()));

        let report = copilot.analyze(&request(), &GuardrailConfig::default(), at_10_30()).await;
        assert!(report.guardrails.accepted);
        assert!(report.alert_ids.is_empty());
    }

    #[tokio::test]
    async fn test_forbidden_symbol_blocks_model_suggestion() {
        let mut config = GuardrailConfig::default();
        config.forbidden_symbols.add("aapl");

        let alerts = Arc::new(MockAlertClient::new());
        let copilot = copilot(Reply::Text(ALERT_REPLY)).with_alert_client(alerts.clone());

        let report = copilot.analyze(&request(), &config, at_10_30()).await;
        assert_eq!(report.guardrails.reasons(), vec!["Symbol AAPL is on the forbidden list"]);
        assert!(alerts.alerts().await.is_empty());
    }

    #[tokio::test]
    async fn test_insights_screen_rank_and_record() {
        let copilot = copilot(Reply::Fail);

        let mut market = MarketSnapshot::new("AAPL", 150.0);
        market.rsi = Some(25.0);
        market.volume_24h = 2_000_000.0;
        market.average_volume = Some(1_000_000.0);
        market.volatility = 0.2;

        let portfolio = PortfolioSnapshot::new(100_000.0, 10_000.0)
            .with_position(PositionSnapshot::new("TSLA", 25_000.0));

        let now = Utc::now();
        let insights = copilot
            .insights(&market, &portfolio, &GuardrailConfig::default(), now)
            .await;

        let ids: Vec<_> = insights.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["concentration_risk_TSLA", "high_volume_AAPL", "rsi_oversold_AAPL"]);

        assert_eq!(copilot.insight_history(24, now).await.len(), 3);
    }

    #[tokio::test]
    async fn test_volatile_market_screens_out_opportunities() {
        let copilot = copilot(Reply::Fail);

        let mut market = MarketSnapshot::new("AAPL", 150.0);
        market.rsi = Some(25.0);
        market.volatility = 0.9;

        let mut portfolio = PortfolioSnapshot::new(100_000.0, 10_000.0);
        portfolio.leverage = 2.4;

        let insights = copilot
            .insights(&market, &portfolio, &GuardrailConfig::default(), Utc::now())
            .await;

        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].id, "high_leverage_warning");
    }
}
