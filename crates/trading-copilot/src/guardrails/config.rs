//! Guardrail Configuration
//!
//! Explicit, caller-owned limits. Nothing here is global: the server keeps one
//! copy behind a lock and hands the evaluator a snapshot per request.

use std::collections::BTreeSet;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::error::{CopilotError, Result};

/// Upper-cased set of symbols the copilot must never suggest
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct ForbiddenSymbols(BTreeSet<String>);

impl ForbiddenSymbols {
    pub fn add(&mut self, symbol: &str) -> bool {
        self.0.insert(symbol.trim().to_uppercase())
    }

    pub fn remove(&mut self, symbol: &str) -> bool {
        self.0.remove(&symbol.trim().to_uppercase())
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.0.contains(&symbol.trim().to_uppercase())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl From<Vec<String>> for ForbiddenSymbols {
    fn from(symbols: Vec<String>) -> Self {
        symbols.iter().map(String::as_str).collect()
    }
}

impl From<ForbiddenSymbols> for Vec<String> {
    fn from(symbols: ForbiddenSymbols) -> Self {
        symbols.0.into_iter().collect()
    }
}

impl<'a> FromIterator<&'a str> for ForbiddenSymbols {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_uppercase)
                .collect(),
        )
    }
}

/// Regular session window, local time. `open` inclusive, `close` exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketHours {
    pub open: NaiveTime,
    pub close: NaiveTime,
}

impl Default for MarketHours {
    fn default() -> Self {
        Self {
            open: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            close: NaiveTime::from_hms_opt(16, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

impl MarketHours {
    pub fn contains(&self, now: NaiveTime) -> bool {
        self.open <= now && now < self.close
    }
}

/// Guardrail limits
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardrailConfig {
    /// Max single-suggestion cost as a fraction of total value
    pub max_position_size_pct: f64,

    /// Max daily loss as a fraction of total value
    pub max_daily_loss_pct: f64,

    pub max_leverage: f64,

    /// Leverage at which the copilot starts warning
    pub leverage_warning: f64,

    pub volatility_threshold: f64,

    pub drawdown_threshold: f64,

    /// Position fraction that triggers a concentration warning
    pub concentration_warning_pct: f64,

    /// Position fraction above which concentration is extreme
    pub concentration_threshold: f64,

    pub forbidden_symbols: ForbiddenSymbols,

    pub market_hours: MarketHours,
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            max_position_size_pct: 0.05,
            max_daily_loss_pct: 0.02,
            max_leverage: 2.0,
            leverage_warning: 1.5,
            volatility_threshold: 0.5,
            drawdown_threshold: 0.1,
            concentration_warning_pct: 0.2,
            concentration_threshold: 0.3,
            forbidden_symbols: ForbiddenSymbols::default(),
            market_hours: MarketHours::default(),
        }
    }
}

/// A runtime change to the safety rules
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule_type", content = "value", rename_all = "snake_case")]
pub enum SafetyRule {
    ForbiddenSymbol(String),
    AllowSymbol(String),
    MaxPositionSize(f64),
    MaxDailyLoss(f64),
}

impl GuardrailConfig {
    /// Defaults, overridden by `GUARDRAIL_*` and `MARKET_*` variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(v) = env_f64("GUARDRAIL_MAX_POSITION_PCT") {
            config.max_position_size_pct = v;
        }
        if let Some(v) = env_f64("GUARDRAIL_MAX_DAILY_LOSS_PCT") {
            config.max_daily_loss_pct = v;
        }
        if let Some(v) = env_f64("GUARDRAIL_VOLATILITY") {
            config.volatility_threshold = v;
        }
        if let Ok(list) = std::env::var("GUARDRAIL_FORBIDDEN_SYMBOLS") {
            config.forbidden_symbols = list.split(',').collect();
        }
        if let Some(t) = env_time("MARKET_OPEN") {
            config.market_hours.open = t;
        }
        if let Some(t) = env_time("MARKET_CLOSE") {
            config.market_hours.close = t;
        }

        config
    }

    /// Reject limits the evaluator cannot apply meaningfully
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("max_position_size_pct", self.max_position_size_pct),
            ("max_daily_loss_pct", self.max_daily_loss_pct),
            ("concentration_warning_pct", self.concentration_warning_pct),
            ("concentration_threshold", self.concentration_threshold),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(CopilotError::Config(format!(
                    "{name} must be in (0, 1], got {value}"
                )));
            }
        }
        if self.concentration_warning_pct > self.concentration_threshold {
            return Err(CopilotError::Config(
                "concentration_warning_pct must not exceed concentration_threshold".into(),
            ));
        }
        if self.market_hours.open >= self.market_hours.close {
            return Err(CopilotError::Config("market open must precede close".into()));
        }
        Ok(())
    }

    /// Apply a safety-rule change, leaving the config untouched on error
    pub fn apply_rule(&mut self, rule: &SafetyRule) -> Result<()> {
        let mut next = self.clone();
        match rule {
            SafetyRule::ForbiddenSymbol(symbol) => {
                if symbol.trim().is_empty() {
                    return Err(CopilotError::Config("empty symbol".into()));
                }
                next.forbidden_symbols.add(symbol);
            }
            SafetyRule::AllowSymbol(symbol) => {
                next.forbidden_symbols.remove(symbol);
            }
            SafetyRule::MaxPositionSize(pct) => next.max_position_size_pct = *pct,
            SafetyRule::MaxDailyLoss(pct) => next.max_daily_loss_pct = *pct,
        }
        next.validate()?;

        tracing::info!(?rule, "Safety rule applied");
        *self = next;
        Ok(())
    }
}

fn env_f64(key: &str) -> Option<f64> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn env_time(key: &str) -> Option<NaiveTime> {
    std::env::var(key)
        .ok()
        .and_then(|v| NaiveTime::parse_from_str(v.trim(), "%H:%M").ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GuardrailConfig::default();
        assert_eq!(config.max_position_size_pct, 0.05);
        assert_eq!(config.volatility_threshold, 0.5);
        assert!(config.forbidden_symbols.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_forbidden_symbols_are_case_insensitive() {
        let mut symbols = ForbiddenSymbols::default();
        assert!(symbols.add("gme"));
        assert!(!symbols.add("GME"));
        assert!(symbols.contains("Gme"));
        assert!(symbols.remove("gMe"));
        assert!(symbols.is_empty());
    }

    #[test]
    fn test_partial_config_deserializes_with_defaults() {
        let config: GuardrailConfig = serde_json::from_str(
            r#"{"max_position_size_pct": 0.1, "forbidden_symbols": ["amc", " gme "]}"#,
        )
        .unwrap();
        assert_eq!(config.max_position_size_pct, 0.1);
        assert_eq!(config.max_daily_loss_pct, 0.02);
        assert!(config.forbidden_symbols.contains("AMC"));
        assert!(config.forbidden_symbols.contains("GME"));
    }

    #[test]
    fn test_market_hours_window() {
        let hours = MarketHours::default();
        let at = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();
        assert!(hours.contains(at(9, 0)));
        assert!(hours.contains(at(15, 59)));
        assert!(!hours.contains(at(16, 0)));
        assert!(!hours.contains(at(8, 59)));
    }

    #[test]
    fn test_apply_rules() {
        let mut config = GuardrailConfig::default();
        config.apply_rule(&SafetyRule::ForbiddenSymbol("tsla".into())).unwrap();
        assert!(config.forbidden_symbols.contains("TSLA"));

        config.apply_rule(&SafetyRule::AllowSymbol("TSLA".into())).unwrap();
        assert!(!config.forbidden_symbols.contains("TSLA"));

        config.apply_rule(&SafetyRule::MaxPositionSize(0.1)).unwrap();
        assert_eq!(config.max_position_size_pct, 0.1);
    }

    #[test]
    fn test_invalid_rule_leaves_config_unchanged() {
        let mut config = GuardrailConfig::default();
        assert!(config.apply_rule(&SafetyRule::MaxDailyLoss(1.5)).is_err());
        assert!(config.apply_rule(&SafetyRule::MaxPositionSize(f64::NAN)).is_err());
        assert_eq!(config, GuardrailConfig::default());
    }

    #[test]
    fn test_rule_wire_format() {
        let rule: SafetyRule =
            serde_json::from_str(r#"{"rule_type": "forbidden_symbol", "value": "AMC"}"#).unwrap();
        assert_eq!(rule, SafetyRule::ForbiddenSymbol("AMC".into()));

        let rule: SafetyRule =
            serde_json::from_str(r#"{"rule_type": "max_position_size", "value": 0.03}"#).unwrap();
        assert_eq!(rule, SafetyRule::MaxPositionSize(0.03));
    }
}
