//! Position concentration analysis

use serde::Serialize;

use super::config::GuardrailConfig;
use crate::model::{PortfolioSnapshot, RiskLevel};

/// A position holding too large a share of the portfolio
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConcentrationWarning {
    pub symbol: String,

    /// Fraction of total value (0.25 = 25%)
    pub concentration: f64,

    pub risk_level: RiskLevel,

    pub message: String,
}

/// Flag every position above `concentration_warning_pct`.
///
/// A non-positive total value makes every position count as fully
/// concentrated.
pub fn analyze_concentration(
    config: &GuardrailConfig,
    portfolio: &PortfolioSnapshot,
) -> Vec<ConcentrationWarning> {
    portfolio
        .positions
        .iter()
        .filter_map(|position| {
            let concentration = if portfolio.total_value > 0.0 {
                position.market_value / portfolio.total_value
            } else {
                1.0
            };

            if concentration <= config.concentration_warning_pct {
                return None;
            }

            let risk_level = if concentration > config.concentration_threshold {
                RiskLevel::Extreme
            } else {
                RiskLevel::High
            };

            Some(ConcentrationWarning {
                symbol: position.symbol.clone(),
                concentration,
                risk_level,
                message: format!(
                    "{} represents {:.1}% of portfolio",
                    position.symbol,
                    concentration * 100.0
                ),
            })
        })
        .collect()
}
