//! Router

use axum::{
    Router,
    routing::{delete, get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::{
    add_safety_rule, analyze, evaluate_suggestion, health_check, insight_history, insights,
    portfolio_concentration, remove_forbidden_symbol, safety_config,
};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health
        .route("/health", get(health_check))

        // Guardrails
        .route("/api/guardrails/evaluate", post(evaluate_suggestion))
        .route("/api/portfolio/concentration", post(portfolio_concentration))

        // Copilot
        .route("/api/copilot/analyze", post(analyze))
        .route("/api/copilot/insights", post(insights))
        .route("/api/copilot/insights/history", get(insight_history))

        // Safety rules
        .route("/api/safety", get(safety_config))
        .route("/api/safety/rules", post(add_safety_rule))
        .route("/api/safety/forbidden/{symbol}", delete(remove_forbidden_symbol))

        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use copilot_llm::{
        Completion, GenerationOptions, LlmError, LlmProvider, Message,
        provider::{ModelInfo, ProviderInfo},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use trading_copilot::{Copilot, CopilotConfig, GuardrailConfig};

    use super::*;

    struct OfflineProvider;

    #[async_trait]
    impl LlmProvider for OfflineProvider {
        async fn info(&self) -> copilot_llm::Result<ProviderInfo> {
            Ok(ProviderInfo {
                name: "offline".into(),
                models: Vec::new(),
                supports_json_mode: false,
            })
        }

        async fn health_check(&self) -> copilot_llm::Result<bool> {
            Ok(false)
        }

        async fn complete(
            &self,
            _: &[Message],
            _: &GenerationOptions,
        ) -> copilot_llm::Result<Completion> {
            Err(LlmError::ProviderUnavailable("offline".into()))
        }

        async fn list_models(&self) -> copilot_llm::Result<Vec<ModelInfo>> {
            Ok(Vec::new())
        }

        fn name(&self) -> &str {
            "offline"
        }
    }

    fn app() -> Router {
        let copilot = Copilot::new(Arc::new(OfflineProvider), CopilotConfig::default());
        router(AppState::new(copilot, GuardrailConfig::default(), false))
    }

    async fn call(
        app: Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn test_evaluate_endpoint() {
        let body = json!({
            "suggestion": {
                "symbol": "AAPL", "action": "buy", "quantity": 40, "price": 150, "confidence": 0.6
            },
            "market": {"symbol": "AAPL", "current_price": 150, "volatility": 0.2},
            "portfolio": {
                "total_value": 100000, "buying_power": 5000,
                "daily_pnl": -500, "daily_loss_limit": -1000
            },
            "now": "10:30:00"
        });

        let (status, verdict) = call(app(), "POST", "/api/guardrails/evaluate", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(verdict["accepted"], false);
        assert_eq!(
            verdict["violations"],
            json!(["Insufficient buying power", "Position size exceeds 5% portfolio limit"])
        );
        assert_eq!(verdict["buying_power_usage_pct"], 100.0);
        assert_eq!(verdict["market_hours_ok"], true);
    }

    #[tokio::test]
    async fn test_evaluate_requires_symbol() {
        let body = json!({"suggestion": {"symbol": " "}, "market": {}});
        let (status, error) = call(app(), "POST", "/api/guardrails/evaluate", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error["code"], "MISSING_SYMBOL");
    }

    #[tokio::test]
    async fn test_concentration_endpoint() {
        let body = json!({"portfolio": {
            "total_value": 100000,
            "positions": [
                {"symbol": "AAPL", "market_value": 25000},
                {"symbol": "MSFT", "market_value": 5000}
            ]
        }});
        let (status, json) = call(app(), "POST", "/api/portfolio/concentration", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["warnings"].as_array().unwrap().len(), 1);
        assert_eq!(json["warnings"][0]["concentration"], 0.25);
    }

    #[tokio::test]
    async fn test_safety_rules_round_trip() {
        let app = app();

        let rule = json!({"rule_type": "forbidden_symbol", "value": "gme"});
        let (status, config) = call(app.clone(), "POST", "/api/safety/rules", Some(rule)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(config["forbidden_symbols"], json!(["GME"]));

        let (status, _) = call(app.clone(), "DELETE", "/api/safety/forbidden/gme", None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, error) = call(app.clone(), "DELETE", "/api/safety/forbidden/gme", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(error["code"], "NOT_FORBIDDEN");

        let bad = json!({"rule_type": "max_daily_loss", "value": 3.0});
        let (status, _) = call(app.clone(), "POST", "/api/safety/rules", Some(bad)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, config) = call(app, "GET", "/api/safety", None).await;
        assert_eq!(config["max_daily_loss_pct"], 0.02);
    }

    #[tokio::test]
    async fn test_analyze_falls_back_when_provider_is_offline() {
        let body = json!({
            "user_id": "user-1",
            "market": {"symbol": "AAPL", "current_price": 150, "volatility": 0.2},
            "portfolio": {"total_value": 100000, "buying_power": 20000}
        });
        let (status, report) = call(app(), "POST", "/api/copilot/analyze", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["type"], "copilot.suggestion.v1");
        assert_eq!(report["source"], "fallback");
        assert_eq!(report["action_type"], "watch");
        assert_eq!(report["guardrails"]["accepted"], false);
    }

    #[tokio::test]
    async fn test_insights_are_recorded_in_history() {
        let app = app();
        let body = json!({
            "market": {"symbol": "AAPL", "current_price": 150, "rsi": 25, "volatility": 0.1},
            "portfolio": {"total_value": 100000}
        });

        let (status, json) = call(app.clone(), "POST", "/api/copilot/insights", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["count"], 1);
        assert_eq!(json["insights"][0]["id"], "rsi_oversold_AAPL");

        let (_, history) = call(app, "GET", "/api/copilot/insights/history?hours=1", None).await;
        assert_eq!(history["count"], 1);
    }

    #[tokio::test]
    async fn test_history_accepts_the_largest_window() {
        let app = app();
        let body = json!({
            "market": {"symbol": "AAPL", "current_price": 150, "rsi": 25, "volatility": 0.1},
            "portfolio": {"total_value": 100000}
        });
        call(app.clone(), "POST", "/api/copilot/insights", Some(body)).await;

        let uri = format!("/api/copilot/insights/history?hours={}", u32::MAX);
        let (status, history) = call(app, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(history["count"], 1);
    }
}
