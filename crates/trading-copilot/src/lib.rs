//! # trading-copilot
//!
//! AI trading copilot whose suggestions pass deterministic safety guardrails
//! before anyone sees them.
//!
//! ## Philosophy
//!
//! - **The model proposes, the rules decide** - every AI suggestion is
//!   re-checked against buying power, position size, daily loss, risk,
//!   confidence, volatility and a forbidden-symbol list
//! - **Fail conservative** - provider errors and unreadable replies fall back
//!   to a low-confidence "watch", which the guardrails then reject
//! - **Explain everything** - reports carry the verdict, its reasons and the
//!   what-if numbers behind them
//!
//! ## Example: $6,000 buy on a $100,000 account
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  AAPL buy 40 @ 150 = $6,000   (buying power $5,000)         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  buying power   ✗  Insufficient buying power                │
//! │  position size  ✗  Position size exceeds 5% portfolio limit │
//! │  daily loss     ✓  -$500 vs -$1,000 limit                   │
//! │  risk / conf.   ✓  medium / medium                          │
//! │  volatility     ✓  0.2 vs 0.5                               │
//! │  market hours   ✓  10:30 (advisory)                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  REJECTED      buying power usage 100%                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod alerts;
pub mod copilot;
pub mod error;
pub mod guardrails;
pub mod history;
pub mod insights;
pub mod model;
pub mod parse;
pub mod prompt;

pub use copilot::{AnalyzeRequest, Copilot, CopilotConfig, CopilotReport};
pub use error::{CopilotError, Result};
pub use guardrails::{
    ConcentrationWarning, GuardrailConfig, GuardrailVerdict, GuardrailViolation, SafetyRule,
    analyze_concentration, evaluate,
};
pub use insights::{Insight, InsightKind};
pub use model::{
    ActionKind, ConfidenceLevel, MarketSnapshot, PortfolioSnapshot, PositionSnapshot, RiskLevel,
    Suggestion,
};
