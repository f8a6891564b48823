//! Rule-based Insights
//!
//! Deterministic observations about a market snapshot or a portfolio, plus the
//! policy deciding which ones a user sees first.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::guardrails::{GuardrailConfig, analyze_concentration};
use crate::model::{ConfidenceLevel, MarketSnapshot, PortfolioSnapshot, RiskLevel};

/// Distance from a support/resistance level that counts as "testing" it
const LEVEL_PROXIMITY: f64 = 0.02;

/// Volume multiple over average that counts as unusual
const HIGH_VOLUME_RATIO: f64 = 1.5;

/// Daily gain, as a fraction of total value, worth reporting
const STRONG_DAY_PCT: f64 = 0.01;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Technical,
    Volume,
    Risk,
    Performance,
}

/// One observation surfaced to the user
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Insight {
    /// Stable id, e.g. `rsi_oversold_AAPL`
    pub id: String,

    #[serde(rename = "type")]
    pub kind: InsightKind,

    pub title: String,

    pub description: String,

    pub confidence: ConfidenceLevel,

    pub risk_level: RiskLevel,

    pub sources: Vec<String>,

    pub timestamp: DateTime<Utc>,

    pub actionable: bool,

    pub suggested_actions: Vec<String>,

    pub data_points: BTreeMap<String, f64>,
}

impl Insight {
    pub fn new(
        id: impl Into<String>,
        kind: InsightKind,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            title: title.into(),
            description: description.into(),
            confidence: ConfidenceLevel::Medium,
            risk_level: RiskLevel::Medium,
            sources: Vec::new(),
            timestamp: Utc::now(),
            actionable: true,
            suggested_actions: Vec::new(),
            data_points: BTreeMap::new(),
        }
    }

    #[must_use]
    pub const fn with_levels(mut self, confidence: ConfidenceLevel, risk_level: RiskLevel) -> Self {
        self.confidence = confidence;
        self.risk_level = risk_level;
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.sources.push(source.into());
        self
    }

    #[must_use]
    pub fn with_actions(mut self, actions: &[&str]) -> Self {
        self.suggested_actions = actions.iter().map(|a| (*a).to_string()).collect();
        self
    }

    #[must_use]
    pub fn with_data(mut self, key: &str, value: f64) -> Self {
        self.data_points.insert(key.to_string(), value);
        self
    }

    #[must_use]
    pub const fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Warnings about exposure the user already holds
    pub fn is_warning(&self) -> bool {
        self.kind == InsightKind::Risk
    }
}

// =============================================================================
// Market rules
// =============================================================================

/// Technical, volume and level insights for one symbol
pub fn analyze_market(market: &MarketSnapshot, now: DateTime<Utc>) -> Vec<Insight> {
    let symbol = &market.symbol;
    let mut insights = Vec::new();

    if let Some(rsi) = market.rsi {
        if rsi < 30.0 {
            insights.push(
                Insight::new(
                    format!("rsi_oversold_{symbol}"),
                    InsightKind::Technical,
                    "Oversold Condition Detected",
                    format!("RSI of {rsi:.1} indicates oversold conditions for {symbol}"),
                )
                .with_levels(ConfidenceLevel::Medium, RiskLevel::Low)
                .with_source("RSI Technical Indicator")
                .with_actions(&["Consider buying opportunities", "Monitor for reversal signals"])
                .with_data("rsi", rsi)
                .with_data("threshold", 30.0)
                .at(now),
            );
        } else if rsi > 70.0 {
            insights.push(
                Insight::new(
                    format!("rsi_overbought_{symbol}"),
                    InsightKind::Technical,
                    "Overbought Condition Detected",
                    format!("RSI of {rsi:.1} indicates overbought conditions for {symbol}"),
                )
                .with_levels(ConfidenceLevel::Medium, RiskLevel::Medium)
                .with_source("RSI Technical Indicator")
                .with_actions(&["Consider taking profits", "Monitor for reversal signals"])
                .with_data("rsi", rsi)
                .with_data("threshold", 70.0)
                .at(now),
            );
        }
    }

    if let Some(ratio) = market.volume_ratio().filter(|r| *r > HIGH_VOLUME_RATIO) {
        insights.push(
            Insight::new(
                format!("high_volume_{symbol}"),
                InsightKind::Volume,
                "High Volume Activity",
                format!("Volume is {ratio:.1}x above average for {symbol}"),
            )
            .with_levels(ConfidenceLevel::High, RiskLevel::Medium)
            .with_source("Volume Analysis")
            .with_actions(&["Monitor for price breakouts", "Check for news catalysts"])
            .with_data("current_volume", market.volume_24h)
            .with_data("ratio", ratio)
            .at(now),
        );
    }

    let price = market.current_price;

    if let Some(support) = nearest_level(price, &market.support_levels) {
        insights.push(
            Insight::new(
                format!("support_test_{symbol}"),
                InsightKind::Technical,
                "Support Level Test",
                format!("{symbol} is testing support at ${support:.2}"),
            )
            .with_levels(ConfidenceLevel::Medium, RiskLevel::Low)
            .with_source("Support/Resistance Analysis")
            .with_actions(&["Monitor for bounce", "Set stop loss below support"])
            .with_data("current_price", price)
            .with_data("support_level", support)
            .at(now),
        );
    }

    if let Some(resistance) = nearest_level(price, &market.resistance_levels) {
        insights.push(
            Insight::new(
                format!("resistance_test_{symbol}"),
                InsightKind::Technical,
                "Resistance Level Test",
                format!("{symbol} is testing resistance at ${resistance:.2}"),
            )
            .with_levels(ConfidenceLevel::Medium, RiskLevel::Medium)
            .with_source("Support/Resistance Analysis")
            .with_actions(&["Monitor for breakout", "Consider taking profits"])
            .with_data("current_price", price)
            .with_data("resistance_level", resistance)
            .at(now),
        );
    }

    insights
}

/// First level within `LEVEL_PROXIMITY` of the price
fn nearest_level(price: f64, levels: &[f64]) -> Option<f64> {
    levels
        .iter()
        .copied()
        .find(|level| *level > 0.0 && (price - level).abs() / level < LEVEL_PROXIMITY)
}

// =============================================================================
// Portfolio rules
// =============================================================================

/// Concentration, drawdown, leverage and performance insights
pub fn analyze_portfolio(
    config: &GuardrailConfig,
    portfolio: &PortfolioSnapshot,
    now: DateTime<Utc>,
) -> Vec<Insight> {
    let mut insights: Vec<Insight> = analyze_concentration(config, portfolio)
        .into_iter()
        .map(|warning| {
            Insight::new(
                format!("concentration_risk_{}", warning.symbol),
                InsightKind::Risk,
                "High Position Concentration",
                warning.message,
            )
            .with_levels(ConfidenceLevel::High, warning.risk_level)
            .with_source("Portfolio Analysis")
            .with_actions(&["Consider reducing position size", "Diversify portfolio"])
            .with_data("concentration", warning.concentration)
            .at(now)
        })
        .collect();

    let drawdown = portfolio.current_drawdown;
    if drawdown > config.drawdown_threshold {
        insights.push(
            Insight::new(
                "high_drawdown_warning",
                InsightKind::Risk,
                "High Portfolio Drawdown",
                format!("Portfolio is experiencing {:.1}% drawdown", drawdown * 100.0),
            )
            .with_levels(ConfidenceLevel::High, RiskLevel::High)
            .with_source("Risk Metrics")
            .with_actions(&["Review risk management", "Consider reducing exposure"])
            .with_data("drawdown", drawdown)
            .at(now),
        );
    }

    let leverage = portfolio.leverage;
    if leverage > config.leverage_warning {
        let risk = if leverage > config.max_leverage {
            RiskLevel::Extreme
        } else {
            RiskLevel::High
        };
        insights.push(
            Insight::new(
                "high_leverage_warning",
                InsightKind::Risk,
                "High Leverage Warning",
                format!("Portfolio leverage is {leverage:.1}x"),
            )
            .with_levels(ConfidenceLevel::High, risk)
            .with_source("Risk Metrics")
            .with_actions(&["Reduce leverage", "Monitor margin requirements"])
            .with_data("leverage", leverage)
            .with_data("max_leverage", config.max_leverage)
            .at(now),
        );
    }

    let daily_pnl = portfolio.daily_pnl;
    if daily_pnl > 0.0 && daily_pnl > portfolio.total_value * STRONG_DAY_PCT {
        insights.push(
            Insight::new(
                "strong_daily_performance",
                InsightKind::Performance,
                "Strong Daily Performance",
                format!("Portfolio gained {daily_pnl:.2} today"),
            )
            .with_levels(ConfidenceLevel::High, RiskLevel::Low)
            .with_source("Performance Analysis")
            .with_actions(&["Consider taking partial profits", "Review winning positions"])
            .with_data("daily_pnl", daily_pnl)
            .at(now),
        );
    }

    insights
}

// =============================================================================
// Ranking
// =============================================================================

/// Order for display: riskiest first, then most confident, then actionable,
/// then id. Total and deterministic.
pub fn rank_insights(mut insights: Vec<Insight>) -> Vec<Insight> {
    insights.sort_by(compare_priority);
    insights
}

fn compare_priority(a: &Insight, b: &Insight) -> Ordering {
    b.risk_level
        .cmp(&a.risk_level)
        .then_with(|| b.confidence.cmp(&a.confidence))
        .then_with(|| b.actionable.cmp(&a.actionable))
        .then_with(|| a.id.cmp(&b.id))
}
