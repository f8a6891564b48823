//! Domain Models
//!
//! Typed snapshots handed to the guardrails and the suggestion they judge.
//! Snapshots are plain immutable inputs; every numeric field defaults to zero
//! when missing on the wire so upstream adapters never have to invent values.

use serde::{Deserialize, Serialize};

/// Market state for one symbol at evaluation time
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketSnapshot {
    /// Ticker symbol (e.g., "AAPL")
    pub symbol: String,

    pub current_price: f64,

    /// 24-hour price change, in percent
    pub price_change_24h: f64,

    pub volume_24h: f64,

    /// Average daily volume, if the feed provides it
    pub average_volume: Option<f64>,

    /// Volatility as a fraction (0.2 = 20%)
    pub volatility: f64,

    pub rsi: Option<f64>,

    pub support_levels: Vec<f64>,

    pub resistance_levels: Vec<f64>,

    /// Aggregate news sentiment (-1 to 1)
    pub news_sentiment: f64,

    pub volume_z_score: Option<f64>,

    /// Free-form label from the sentiment feed ("bullish", "risk-off", ...)
    pub market_sentiment: Option<String>,
}

impl MarketSnapshot {
    pub fn new(symbol: impl Into<String>, current_price: f64) -> Self {
        Self {
            symbol: symbol.into().to_uppercase(),
            current_price,
            ..Default::default()
        }
    }

    /// Today's volume relative to its average, when an average is known
    pub fn volume_ratio(&self) -> Option<f64> {
        self.average_volume
            .filter(|avg| *avg > 0.0)
            .map(|avg| self.volume_24h / avg)
    }
}

/// A held position
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionSnapshot {
    pub symbol: String,
    pub market_value: f64,
}

impl PositionSnapshot {
    pub fn new(symbol: impl Into<String>, market_value: f64) -> Self {
        Self {
            symbol: symbol.into().to_uppercase(),
            market_value,
        }
    }
}

/// Portfolio state at evaluation time
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PortfolioSnapshot {
    /// Total equity
    pub total_value: f64,

    pub total_pnl: f64,

    pub daily_pnl: f64,

    /// Absolute daily loss limit (negative, e.g. -1000). When absent the
    /// guardrails derive one from `max_daily_loss_pct`.
    pub daily_loss_limit: Option<f64>,

    pub buying_power: f64,

    pub cash: f64,

    pub positions: Vec<PositionSnapshot>,

    pub leverage: f64,

    /// Current peak-to-trough drawdown as a fraction
    pub current_drawdown: f64,
}

impl Default for PortfolioSnapshot {
    fn default() -> Self {
        Self {
            total_value: 0.0,
            total_pnl: 0.0,
            daily_pnl: 0.0,
            daily_loss_limit: None,
            buying_power: 0.0,
            cash: 0.0,
            positions: Vec::new(),
            leverage: 1.0,
            current_drawdown: 0.0,
        }
    }
}

impl PortfolioSnapshot {
    pub fn new(total_value: f64, buying_power: f64) -> Self {
        Self {
            total_value,
            buying_power,
            ..Default::default()
        }
    }

    pub fn with_position(mut self, position: PositionSnapshot) -> Self {
        self.positions.push(position);
        self
    }

    pub fn position(&self, symbol: &str) -> Option<&PositionSnapshot> {
        self.positions
            .iter()
            .find(|p| p.symbol.eq_ignore_ascii_case(symbol))
    }
}

/// What the copilot proposes to do
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Buy,
    Sell,
    Hold,
    #[default]
    Watch,
    Alert,
}

impl ActionKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
            Self::Hold => "hold",
            Self::Watch => "watch",
            Self::Alert => "alert",
        }
    }

    /// Parse loosely; anything unrecognized becomes `Watch`
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "buy" => Self::Buy,
            "sell" => Self::Sell,
            "hold" => Self::Hold,
            "alert" => Self::Alert,
            _ => Self::Watch,
        }
    }
}

/// Risk classification, ordered from safest to riskiest
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    #[default]
    Medium,
    High,
    Extreme,
}

impl RiskLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Extreme => "extreme",
        }
    }

    pub const fn is_blocking(self) -> bool {
        matches!(self, Self::High | Self::Extreme)
    }

    /// Parse loosely; unknown labels are treated as `Medium`
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Self::Low,
            "high" => Self::High,
            "extreme" | "very high" | "very_high" => Self::Extreme,
            _ => Self::Medium,
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Confidence classification
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Bucket a 0-1 score. NaN lands in `Low`.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.7 {
            Self::High
        } else if score >= 0.4 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn parse_lenient(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

impl std::fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeHorizon {
    #[default]
    Short,
    Medium,
    Long,
}

impl TimeHorizon {
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "medium" => Self::Medium,
            "long" => Self::Long,
            _ => Self::Short,
        }
    }
}

/// A proposed trade or watch action.
///
/// Built once per request and never mutated: `cost` is always
/// `quantity * price`, so the sizing fields are only reachable through
/// accessors.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(from = "SuggestionDraft")]
pub struct Suggestion {
    pub symbol: String,

    pub action: ActionKind,

    /// Model confidence score (0.0 to 1.0)
    pub confidence: f64,

    pub confidence_level: ConfidenceLevel,

    pub risk_level: RiskLevel,

    quantity: f64,

    price: f64,

    cost: f64,

    /// Potential downside, in percent of cost
    pub downside_pct: f64,

    /// Potential upside, in percent of cost
    pub upside_pct: f64,

    pub risk_reward_ratio: Option<f64>,

    pub reasoning: String,

    pub technical_signals: Vec<String>,

    pub stop_loss: Option<f64>,

    pub take_profit: Option<f64>,

    pub time_horizon: TimeHorizon,
}

impl Suggestion {
    pub fn new(symbol: impl Into<String>, action: ActionKind, quantity: f64, price: f64) -> Self {
        Self {
            symbol: symbol.into().to_uppercase(),
            action,
            confidence: 0.0,
            confidence_level: ConfidenceLevel::Low,
            risk_level: RiskLevel::Medium,
            quantity,
            price,
            cost: quantity * price,
            downside_pct: 0.0,
            upside_pct: 0.0,
            risk_reward_ratio: None,
            reasoning: String::new(),
            technical_signals: Vec::new(),
            stop_loss: None,
            take_profit: None,
            time_horizon: TimeHorizon::Short,
        }
    }

    /// Set the numeric confidence and its bucket together
    #[must_use]
    pub fn with_confidence(mut self, score: f64) -> Self {
        self.confidence = score;
        self.confidence_level = ConfidenceLevel::from_score(score);
        self
    }

    #[must_use]
    pub const fn with_confidence_level(mut self, level: ConfidenceLevel) -> Self {
        self.confidence_level = level;
        self
    }

    #[must_use]
    pub const fn with_risk_level(mut self, level: RiskLevel) -> Self {
        self.risk_level = level;
        self
    }

    #[must_use]
    pub const fn with_downside_pct(mut self, pct: f64) -> Self {
        self.downside_pct = pct;
        self
    }

    #[must_use]
    pub const fn with_upside_pct(mut self, pct: f64) -> Self {
        self.upside_pct = pct;
        self
    }

    #[must_use]
    pub const fn with_risk_reward(mut self, ratio: f64) -> Self {
        self.risk_reward_ratio = Some(ratio);
        self
    }

    #[must_use]
    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }

    #[must_use]
    pub fn with_exits(mut self, stop_loss: Option<f64>, take_profit: Option<f64>) -> Self {
        self.stop_loss = stop_loss;
        self.take_profit = take_profit;
        self
    }

    pub const fn quantity(&self) -> f64 {
        self.quantity
    }

    pub const fn price(&self) -> f64 {
        self.price
    }

    /// Estimated cost: quantity × price
    pub const fn cost(&self) -> f64 {
        self.cost
    }
}

/// Wire form of a suggestion; `cost` is recomputed, never trusted
#[derive(Deserialize)]
#[serde(default)]
struct SuggestionDraft {
    symbol: String,
    action: ActionKind,
    confidence: f64,
    confidence_level: Option<ConfidenceLevel>,
    risk_level: RiskLevel,
    quantity: f64,
    price: f64,
    downside_pct: f64,
    upside_pct: f64,
    risk_reward_ratio: Option<f64>,
    reasoning: String,
    technical_signals: Vec<String>,
    stop_loss: Option<f64>,
    take_profit: Option<f64>,
    time_horizon: TimeHorizon,
}

impl Default for SuggestionDraft {
    fn default() -> Self {
        Self {
            symbol: String::new(),
            action: ActionKind::Watch,
            confidence: 0.0,
            confidence_level: None,
            risk_level: RiskLevel::Medium,
            quantity: 0.0,
            price: 0.0,
            downside_pct: 0.0,
            upside_pct: 0.0,
            risk_reward_ratio: None,
            reasoning: String::new(),
            technical_signals: Vec::new(),
            stop_loss: None,
            take_profit: None,
            time_horizon: TimeHorizon::Short,
        }
    }
}

impl From<SuggestionDraft> for Suggestion {
    fn from(draft: SuggestionDraft) -> Self {
        let mut suggestion = Self::new(draft.symbol, draft.action, draft.quantity, draft.price)
            .with_confidence(draft.confidence)
            .with_risk_level(draft.risk_level)
            .with_downside_pct(draft.downside_pct)
            .with_upside_pct(draft.upside_pct)
            .with_reasoning(draft.reasoning)
            .with_exits(draft.stop_loss, draft.take_profit);

        if let Some(level) = draft.confidence_level {
            suggestion.confidence_level = level;
        }
        suggestion.risk_reward_ratio = draft.risk_reward_ratio;
        suggestion.technical_signals = draft.technical_signals;
        suggestion.time_horizon = draft.time_horizon;
        suggestion
    }
}
