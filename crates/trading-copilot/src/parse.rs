//! Model Reply Parsing
//!
//! Models wrap JSON in prose or code fences and write numbers as `"5%"`, so
//! parsing is deliberately forgiving. Anything unusable surfaces as a
//! `CopilotError` and the caller falls back to `AiAnalysis::fallback()`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{CopilotError, Result};
use crate::model::{
    ActionKind, ConfidenceLevel, MarketSnapshot, RiskLevel, Suggestion, TimeHorizon,
};

/// Structured analysis returned by the model
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AiAnalysis {
    #[serde(deserialize_with = "lenient_action")]
    pub action_type: ActionKind,

    #[serde(deserialize_with = "lenient_f64")]
    pub confidence: f64,

    #[serde(deserialize_with = "lenient_confidence")]
    pub confidence_level: Option<ConfidenceLevel>,

    pub reasoning: String,

    #[serde(deserialize_with = "lenient_risk")]
    pub risk_level: RiskLevel,

    #[serde(deserialize_with = "lenient_strings")]
    pub key_factors: Vec<String>,

    #[serde(deserialize_with = "lenient_strings")]
    pub technical_signals: Vec<String>,

    #[serde(deserialize_with = "lenient_non_negative")]
    pub suggested_quantity: f64,

    #[serde(deserialize_with = "lenient_positive")]
    pub suggested_price: Option<f64>,

    /// Percent
    #[serde(deserialize_with = "lenient_non_negative")]
    pub potential_upside: f64,

    /// Percent
    #[serde(deserialize_with = "lenient_non_negative")]
    pub potential_downside: f64,

    #[serde(deserialize_with = "lenient_positive")]
    pub risk_reward_ratio: Option<f64>,

    #[serde(deserialize_with = "lenient_horizon")]
    pub time_horizon: TimeHorizon,

    #[serde(deserialize_with = "lenient_positive")]
    pub stop_loss_suggestion: Option<f64>,

    #[serde(deserialize_with = "lenient_positive")]
    pub take_profit_suggestion: Option<f64>,
}

impl Default for AiAnalysis {
    fn default() -> Self {
        Self {
            action_type: ActionKind::Watch,
            confidence: 0.0,
            confidence_level: None,
            reasoning: String::new(),
            risk_level: RiskLevel::Medium,
            key_factors: Vec::new(),
            technical_signals: Vec::new(),
            suggested_quantity: 0.0,
            suggested_price: None,
            potential_upside: 0.0,
            potential_downside: 0.0,
            risk_reward_ratio: None,
            time_horizon: TimeHorizon::Short,
            stop_loss_suggestion: None,
            take_profit_suggestion: None,
        }
    }
}

impl AiAnalysis {
    /// Conservative analysis used whenever the model is unavailable or unreadable
    pub fn fallback() -> Self {
        Self {
            action_type: ActionKind::Watch,
            confidence: 0.3,
            reasoning: "Insufficient data for confident recommendation".into(),
            risk_level: RiskLevel::Medium,
            key_factors: vec!["Limited market data available".into()],
            risk_reward_ratio: Some(1.0),
            ..Default::default()
        }
    }

    /// Build the typed suggestion; price defaults to the market price
    pub fn into_suggestion(self, market: &MarketSnapshot) -> Suggestion {
        let price = self.suggested_price.unwrap_or(market.current_price);
        let reasoning = if self.reasoning.trim().is_empty() {
            "No specific recommendation".to_string()
        } else {
            self.reasoning
        };

        let mut suggestion = Suggestion::new(
            market.symbol.clone(),
            self.action_type,
            self.suggested_quantity,
            price,
        )
        .with_confidence(self.confidence)
        .with_risk_level(self.risk_level)
        .with_downside_pct(self.potential_downside)
        .with_upside_pct(self.potential_upside)
        .with_reasoning(reasoning)
        .with_exits(self.stop_loss_suggestion, self.take_profit_suggestion);

        if let Some(level) = self.confidence_level {
            suggestion = suggestion.with_confidence_level(level);
        }
        if let Some(ratio) = self.risk_reward_ratio {
            suggestion = suggestion.with_risk_reward(ratio);
        }
        suggestion.technical_signals = self.technical_signals;
        suggestion.time_horizon = self.time_horizon;
        suggestion
    }
}

/// Parse the first `{` .. last `}` span of a model reply
pub fn parse_analysis(text: &str) -> Result<AiAnalysis> {
    let start = text.find('{').ok_or(CopilotError::MissingJson)?;
    let end = text.rfind('}').ok_or(CopilotError::MissingJson)?;
    if end < start {
        return Err(CopilotError::MissingJson);
    }

    let mut analysis: AiAnalysis = serde_json::from_str(&text[start..=end])
        .map_err(|e| CopilotError::MalformedAnalysis(e.to_string()))?;

    analysis.confidence = normalize_confidence(analysis.confidence);
    Ok(analysis)
}

/// Scores in (1, 100] are read as percentages; the result lies in [0, 1]
fn normalize_confidence(raw: f64) -> f64 {
    let score = if raw > 1.0 && raw <= 100.0 { raw / 100.0 } else { raw };
    score.clamp(0.0, 1.0)
}

// =============================================================================
// Lenient field decoders
// =============================================================================

/// Number from a JSON number or a string like `"5%"`, `"$1,200"`, `"0.7"`
fn number_from(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
                .collect();
            cleaned.parse().ok().filter(|v: &f64| v.is_finite())
        }
        _ => None,
    }
}

fn text_from(value: &Value) -> Option<&str> {
    value.as_str()
}

fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<f64, D::Error> {
    Ok(number_from(&Value::deserialize(d)?).unwrap_or(0.0))
}

/// Negative magnitudes become zero
fn lenient_non_negative<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<f64, D::Error> {
    Ok(number_from(&Value::deserialize(d)?).map_or(0.0, |v| v.max(0.0)))
}

fn lenient_positive<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<f64>, D::Error> {
    Ok(number_from(&Value::deserialize(d)?).filter(|v| *v > 0.0))
}

fn lenient_action<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<ActionKind, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(text_from(&value).map_or(ActionKind::Watch, ActionKind::parse_lenient))
}

fn lenient_risk<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<RiskLevel, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(text_from(&value).map_or(RiskLevel::Medium, RiskLevel::parse_lenient))
}

fn lenient_confidence<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<Option<ConfidenceLevel>, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(text_from(&value).and_then(ConfidenceLevel::parse_lenient))
}

fn lenient_horizon<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<TimeHorizon, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(text_from(&value).map_or(TimeHorizon::Short, TimeHorizon::parse_lenient))
}

fn lenient_strings<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        Value::String(s) => vec![s],
        _ => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fenced_reply() {
        let reply = r#"Here is my analysis:
```json
{
    "action_type": "BUY",
    "confidence": 0.75,
    "reasoning": "Bounce off support with rising volume",
    "risk_level": "low",
    "technical_signals": ["RSI divergence"],
    "suggested_quantity": 10,
    "suggested_price": "148.50",
    "potential_upside": "8%",
    "potential_downside": "3%",
    "risk_reward_ratio": 2.6,
    "time_horizon": "medium",
    "stop_loss_suggestion": 144.0,
    "take_profit_suggestion": 0
}
```
Trade carefully."#;

        let analysis = parse_analysis(reply).unwrap();
        assert_eq!(analysis.action_type, ActionKind::Buy);
        assert_eq!(analysis.suggested_price, Some(148.5));
        assert_eq!(analysis.potential_upside, 8.0);
        assert_eq!(analysis.potential_downside, 3.0);
        assert_eq!(analysis.time_horizon, TimeHorizon::Medium);
        assert_eq!(analysis.stop_loss_suggestion, Some(144.0));
        assert!(analysis.take_profit_suggestion.is_none());
    }

    #[test]
    fn test_missing_json() {
        assert!(matches!(parse_analysis("no idea"), Err(CopilotError::MissingJson)));
        assert!(matches!(parse_analysis("} backwards {"), Err(CopilotError::MissingJson)));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            parse_analysis("{\"action_type\": }"),
            Err(CopilotError::MalformedAnalysis(_))
        ));
    }

    #[test]
    fn test_unknown_values_degrade_conservatively() {
        let analysis = parse_analysis(
            r#"{"action_type": "yolo", "risk_level": 7, "confidence": "very", "potential_upside": "Unknown"}"#,
        )
        .unwrap();
        assert_eq!(analysis.action_type, ActionKind::Watch);
        assert_eq!(analysis.risk_level, RiskLevel::Medium);
        assert_eq!(analysis.confidence, 0.0);
        assert_eq!(analysis.potential_upside, 0.0);
    }

    #[test]
    fn test_confidence_is_normalized() {
        let score = |raw: &str| parse_analysis(raw).unwrap().confidence;

        assert_eq!(score(r#"{"confidence": 0.8}"#), 0.8);
        assert_eq!(score(r#"{"confidence": 85}"#), 0.85);
        assert_eq!(score(r#"{"confidence": "40%"}"#), 0.4);
        assert_eq!(score(r#"{"confidence": 250}"#), 1.0);
        assert_eq!(score(r#"{"confidence": -0.2}"#), 0.0);
    }

    #[test]
    fn test_negative_magnitudes_become_zero() {
        let analysis = parse_analysis(
            r#"{"action_type": "sell", "confidence": 0.9, "risk_level": "low",
                "suggested_quantity": -1000, "potential_upside": "-4%", "potential_downside": -2}"#,
        )
        .unwrap();
        assert_eq!(analysis.suggested_quantity, 0.0);
        assert_eq!(analysis.potential_upside, 0.0);
        assert_eq!(analysis.potential_downside, 0.0);
    }

    #[test]
    fn test_negative_quantity_yields_no_cost() {
        use chrono::NaiveTime;

        use crate::guardrails::{GuardrailConfig, evaluate};
        use crate::model::PortfolioSnapshot;

        let market = MarketSnapshot::new("AAPL", 150.0);
        let suggestion = parse_analysis(
            r#"{"action_type": "sell", "confidence": 0.9, "risk_level": "low", "suggested_quantity": -1000}"#,
        )
        .unwrap()
        .into_suggestion(&market);
        assert_eq!(suggestion.cost(), 0.0);

        let zero_bp = PortfolioSnapshot::new(100_000.0, 0.0);
        let now = NaiveTime::from_hms_opt(10, 30, 0).unwrap();
        let verdict = evaluate(&GuardrailConfig::default(), &suggestion, &market, &zero_bp, now);

        assert_eq!(verdict.estimated_max_loss, 0.0);
        assert_eq!(verdict.buying_power_usage_pct, 100.0);
    }

    #[test]
    fn test_into_suggestion_defaults_price_to_market() {
        let market = MarketSnapshot::new("AAPL", 150.0);
        let analysis = parse_analysis(
            r#"{"action_type": "buy", "confidence": 0.55, "suggested_quantity": 4, "potential_downside": "5"}"#,
        )
        .unwrap();

        let suggestion = analysis.into_suggestion(&market);
        assert_eq!(suggestion.symbol, "AAPL");
        assert_eq!(suggestion.price(), 150.0);
        assert_eq!(suggestion.cost(), 600.0);
        assert_eq!(suggestion.confidence_level, ConfidenceLevel::Medium);
        assert_eq!(suggestion.downside_pct, 5.0);
        assert_eq!(suggestion.reasoning, "No specific recommendation");
    }

    #[test]
    fn test_explicit_confidence_level() {
        let market = MarketSnapshot::new("AAPL", 150.0);
        let analysis =
            parse_analysis(r#"{"confidence": 0.9, "confidence_level": "low"}"#).unwrap();
        assert_eq!(
            analysis.into_suggestion(&market).confidence_level,
            ConfidenceLevel::Low
        );
    }

    #[test]
    fn test_fallback_is_conservative() {
        let suggestion =
            AiAnalysis::fallback().into_suggestion(&MarketSnapshot::new("TSLA", 250.0));
        assert_eq!(suggestion.action, ActionKind::Watch);
        assert_eq!(suggestion.confidence, 0.3);
        assert_eq!(suggestion.confidence_level, ConfidenceLevel::Low);
        assert_eq!(suggestion.cost(), 0.0);
        assert_eq!(suggestion.risk_reward_ratio, Some(1.0));
    }
}
