//! Safety Guardrails
//!
//! Rule-based checks applied to AI output before a user ever sees it.
//!
//! ```text
//! Suggestion ──┐
//! Market ──────┼──► evaluate(config, .., now) ──► GuardrailVerdict
//! Portfolio ───┘                                  (accept + reasons + figures)
//!
//! Portfolio ───────► analyze_concentration ─────► Vec<ConcentrationWarning>
//! Insight ─────────► screen_insight ────────────► Vec<GuardrailViolation>
//! ```

mod concentration;
mod config;
mod evaluator;

pub use concentration::{ConcentrationWarning, analyze_concentration};
pub use config::{ForbiddenSymbols, GuardrailConfig, MarketHours, SafetyRule};
pub use evaluator::{GuardrailVerdict, GuardrailViolation, evaluate, screen_insight};
