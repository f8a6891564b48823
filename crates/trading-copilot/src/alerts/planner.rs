//! Alert planning from an evaluated suggestion

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

use super::{AlertRequest, NewsAlertRequest, PriceAlertKind, PriceAlertRequest};
use crate::guardrails::GuardrailVerdict;
use crate::model::{ActionKind, ConfidenceLevel, Suggestion};

/// Alerts worth creating for a suggestion.
///
/// Nothing is planned unless the verdict accepted the suggestion and its
/// confidence is high. `alert` actions get stop-loss and take-profit price
/// alerts for positive exit prices; every planned set ends with a news alert.
pub fn plan_alerts(
    suggestion: &Suggestion,
    verdict: &GuardrailVerdict,
    user_id: &str,
) -> Vec<AlertRequest> {
    if !verdict.accepted || suggestion.confidence_level != ConfidenceLevel::High {
        return Vec::new();
    }

    let symbol = suggestion.symbol.as_str();
    let mut requests = Vec::new();

    if suggestion.action == ActionKind::Alert {
        let exits = [
            (
                PriceAlertKind::StopLoss,
                suggestion.stop_loss,
                format!("Stop loss triggered for {symbol}"),
            ),
            (
                PriceAlertKind::TakeProfit,
                suggestion.take_profit,
                format!("Take profit target reached for {symbol}"),
            ),
        ];

        for (kind, price, message) in exits {
            if let Some(trigger_price) = price.filter(|p| *p > 0.0).and_then(to_price) {
                requests.push(AlertRequest::Price(PriceAlertRequest {
                    user_id: user_id.to_string(),
                    symbol: symbol.to_string(),
                    alert_type: kind,
                    trigger_price,
                    message,
                    active: true,
                }));
            }
        }
    }

    requests.push(AlertRequest::News(NewsAlertRequest {
        user_id: user_id.to_string(),
        symbol: symbol.to_string(),
        keywords: vec![
            symbol.to_string(),
            "earnings".into(),
            "news".into(),
            "announcement".into(),
        ],
        message: format!("News alert for {symbol}"),
        active: true,
    }));

    requests
}

fn to_price(value: f64) -> Option<Decimal> {
    Decimal::from_f64(value).map(|d| d.round_dp(4).normalize())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::guardrails::{GuardrailConfig, evaluate};
    use crate::model::{MarketSnapshot, PortfolioSnapshot, RiskLevel};

    fn verdict_for(suggestion: &Suggestion) -> GuardrailVerdict {
        let mut market = MarketSnapshot::new(&suggestion.symbol, 150.0);
        market.volatility = 0.2;
        evaluate(
            &GuardrailConfig::default(),
            suggestion,
            &market,
            &PortfolioSnapshot::new(100_000.0, 10_000.0),
            NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        )
    }

    fn alert_suggestion() -> Suggestion {
        Suggestion::new("AAPL", ActionKind::Alert, 0.0, 150.0)
            .with_confidence(0.82)
            .with_risk_level(RiskLevel::Low)
            .with_exits(Some(144.5), Some(165.0))
    }

    #[test]
    fn test_alert_action_plans_exits_and_news() {
        let suggestion = alert_suggestion();
        let requests = plan_alerts(&suggestion, &verdict_for(&suggestion), "user-1");

        assert_eq!(requests.len(), 3);
        let AlertRequest::Price(stop) = &requests[0] else { panic!("expected price alert") };
        assert_eq!(stop.alert_type, PriceAlertKind::StopLoss);
        assert_eq!(stop.trigger_price, dec!(144.5));
        assert_eq!(stop.message, "Stop loss triggered for AAPL");

        let AlertRequest::Price(target) = &requests[1] else { panic!("expected price alert") };
        assert_eq!(target.alert_type, PriceAlertKind::TakeProfit);
        assert_eq!(target.trigger_price, dec!(165));

        let AlertRequest::News(news) = &requests[2] else { panic!("expected news alert") };
        assert_eq!(news.keywords, vec!["AAPL", "earnings", "news", "announcement"]);
        assert_eq!(news.user_id, "user-1");
    }

    #[test]
    fn test_non_alert_action_gets_news_only() {
        let suggestion = Suggestion::new("AAPL", ActionKind::Buy, 10.0, 150.0)
            .with_confidence(0.9)
            .with_exits(Some(140.0), None);
        let requests = plan_alerts(&suggestion, &verdict_for(&suggestion), "u");
        assert_eq!(requests.len(), 1);
        assert!(matches!(requests[0], AlertRequest::News(_)));
    }

    #[test]
    fn test_missing_exit_prices_are_skipped() {
        let suggestion = alert_suggestion().with_exits(None, Some(0.0));
        let requests = plan_alerts(&suggestion, &verdict_for(&suggestion), "u");
        assert_eq!(requests.len(), 1);
    }

    #[test]
    fn test_medium_confidence_plans_nothing() {
        let suggestion = alert_suggestion().with_confidence(0.6);
        assert!(verdict_for(&suggestion).accepted);
        assert!(plan_alerts(&suggestion, &verdict_for(&suggestion), "u").is_empty());
    }

    #[test]
    fn test_rejected_suggestion_plans_nothing() {
        let suggestion = alert_suggestion().with_risk_level(RiskLevel::Extreme);
        let verdict = verdict_for(&suggestion);
        assert!(!verdict.accepted);
        assert!(plan_alerts(&suggestion, &verdict, "u").is_empty());
    }

    #[test]
    fn test_trigger_price_serializes_exactly() {
        let suggestion = alert_suggestion();
        let requests = plan_alerts(&suggestion, &verdict_for(&suggestion), "u");
        let AlertRequest::Price(stop) = &requests[0] else { panic!("expected price alert") };
        let json = serde_json::to_value(stop).unwrap();
        assert_eq!(json["trigger_price"], "144.5");
        assert_eq!(json["alert_type"], "stop_loss");
    }
}
