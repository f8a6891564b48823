//! Guardrail Evaluator
//!
//! Deterministic accept/reject of a suggestion against the market and
//! portfolio it was produced for. Every comparison is written so that a NaN
//! operand fails its check.

#![allow(clippy::neg_cmp_op_on_partial_ord)]

use std::fmt;

use chrono::NaiveTime;
use serde::Serialize;

use super::config::GuardrailConfig;
use crate::insights::Insight;
use crate::model::{ConfidenceLevel, MarketSnapshot, PortfolioSnapshot, RiskLevel, Suggestion};

/// Why a suggestion or insight was held back
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(into = "String")]
pub enum GuardrailViolation {
    InsufficientBuyingPower,
    /// `limit_pct` is the configured limit in percent (5.0 = 5%)
    PositionSizeExceeded { limit_pct: f64 },
    DailyLossLimitReached,
    DailyLossLimitExceeded,
    RiskTooHigh(RiskLevel),
    ConfidenceTooLow,
    VolatilityTooHigh,
    ForbiddenSymbol(String),
}

impl fmt::Display for GuardrailViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientBuyingPower => f.write_str("Insufficient buying power"),
            Self::PositionSizeExceeded { limit_pct } => write!(
                f,
                "Position size exceeds {}% portfolio limit",
                (limit_pct * 100.0).round() / 100.0
            ),
            Self::DailyLossLimitReached => f.write_str("Daily loss limit reached"),
            Self::DailyLossLimitExceeded => f.write_str("Daily loss limit exceeded"),
            Self::RiskTooHigh(level) => write!(f, "Risk level {level} exceeds safety threshold"),
            Self::ConfidenceTooLow => {
                f.write_str("Confidence level too low for actionable suggestion")
            }
            Self::VolatilityTooHigh => f.write_str("Market volatility too high"),
            Self::ForbiddenSymbol(symbol) => write!(f, "Symbol {symbol} is on the forbidden list"),
        }
    }
}

impl From<GuardrailViolation> for String {
    fn from(violation: GuardrailViolation) -> Self {
        violation.to_string()
    }
}

/// Outcome of evaluating one suggestion
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GuardrailVerdict {
    pub accepted: bool,

    /// Ordered reasons; empty iff accepted
    pub violations: Vec<GuardrailViolation>,

    /// Advisory only, never causes rejection
    pub market_hours_ok: bool,

    pub max_position_ok: bool,

    pub daily_loss_ok: bool,

    pub risk_limits_ok: bool,

    /// cost × downside_pct / 100
    pub estimated_max_loss: f64,

    /// Share of buying power the suggestion would consume, 0-100
    pub buying_power_usage_pct: f64,

    pub risk_reward_ratio: f64,
}

impl GuardrailVerdict {
    pub fn reasons(&self) -> Vec<String> {
        self.violations.iter().map(ToString::to_string).collect()
    }
}

/// Evaluate a suggestion. Pure: identical inputs give identical verdicts.
pub fn evaluate(
    config: &GuardrailConfig,
    suggestion: &Suggestion,
    market: &MarketSnapshot,
    portfolio: &PortfolioSnapshot,
    now: NaiveTime,
) -> GuardrailVerdict {
    let cost = suggestion.cost();
    let mut violations = Vec::new();

    let buying_power_ok = cost <= portfolio.buying_power;
    if !buying_power_ok {
        violations.push(GuardrailViolation::InsufficientBuyingPower);
    }

    let position_limit = portfolio.total_value * config.max_position_size_pct;
    let position_size_ok = cost <= position_limit;
    if !position_size_ok {
        violations.push(GuardrailViolation::PositionSizeExceeded {
            limit_pct: config.max_position_size_pct * 100.0,
        });
    }

    let daily_loss_ok = portfolio.daily_pnl >= daily_loss_limit(config, portfolio);
    if !daily_loss_ok {
        violations.push(GuardrailViolation::DailyLossLimitReached);
    }

    if suggestion.risk_level.is_blocking() {
        violations.push(GuardrailViolation::RiskTooHigh(suggestion.risk_level));
    }

    if suggestion.confidence_level == ConfidenceLevel::Low {
        violations.push(GuardrailViolation::ConfidenceTooLow);
    }

    if !(market.volatility <= config.volatility_threshold) {
        violations.push(GuardrailViolation::VolatilityTooHigh);
    }

    let market_hours_ok = config.market_hours.contains(now);

    if config.forbidden_symbols.contains(&suggestion.symbol) {
        violations.push(GuardrailViolation::ForbiddenSymbol(
            suggestion.symbol.to_uppercase(),
        ));
    }

    let accepted = violations.is_empty();
    if !accepted {
        tracing::debug!(symbol = %suggestion.symbol, ?violations, "Suggestion rejected");
    }

    GuardrailVerdict {
        accepted,
        violations,
        market_hours_ok,
        max_position_ok: buying_power_ok && position_size_ok,
        daily_loss_ok,
        risk_limits_ok: accepted,
        estimated_max_loss: cost * (suggestion.downside_pct / 100.0),
        buying_power_usage_pct: buying_power_usage(cost, portfolio.buying_power),
        risk_reward_ratio: suggestion.risk_reward_ratio.unwrap_or(1.0),
    }
}

/// Screen a rule-generated insight before it is surfaced
pub fn screen_insight(
    config: &GuardrailConfig,
    insight: &Insight,
    market: &MarketSnapshot,
    portfolio: &PortfolioSnapshot,
) -> Vec<GuardrailViolation> {
    let mut violations = Vec::new();

    if insight.risk_level.is_blocking() {
        violations.push(GuardrailViolation::RiskTooHigh(insight.risk_level));
    }

    if insight.confidence == ConfidenceLevel::Low {
        violations.push(GuardrailViolation::ConfidenceTooLow);
    }

    let daily_move = if portfolio.daily_pnl == 0.0 {
        0.0
    } else {
        (portfolio.daily_pnl / portfolio.total_value).abs()
    };
    if !(daily_move <= config.max_daily_loss_pct) {
        violations.push(GuardrailViolation::DailyLossLimitExceeded);
    }

    if !(market.volatility <= config.volatility_threshold) {
        violations.push(GuardrailViolation::VolatilityTooHigh);
    }

    violations
}

fn daily_loss_limit(config: &GuardrailConfig, portfolio: &PortfolioSnapshot) -> f64 {
    portfolio
        .daily_loss_limit
        .unwrap_or(-(portfolio.total_value * config.max_daily_loss_pct))
}

fn buying_power_usage(cost: f64, buying_power: f64) -> f64 {
    if !(buying_power > 0.0) {
        return 100.0;
    }
    let pct = cost / buying_power * 100.0;
    if pct.is_nan() { 100.0 } else { pct.clamp(0.0, 100.0) }
}
