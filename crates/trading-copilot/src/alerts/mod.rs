//! Alert Service Integration
//!
//! The alert service owns alert storage and delivery; the copilot only plans
//! alerts from accepted suggestions and submits them.

mod http;
mod mock;
mod planner;

pub use http::{AlertServiceConfig, HttpAlertClient};
pub use mock::MockAlertClient;
pub use planner::plan_alerts;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceAlertKind {
    StopLoss,
    TakeProfit,
}

/// `POST /api/alerts/price` body
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceAlertRequest {
    pub user_id: String,
    pub symbol: String,
    pub alert_type: PriceAlertKind,
    #[serde(with = "rust_decimal::serde::str")]
    pub trigger_price: Decimal,
    pub message: String,
    pub active: bool,
}

/// `POST /api/alerts/news` body
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewsAlertRequest {
    pub user_id: String,
    pub symbol: String,
    pub keywords: Vec<String>,
    pub message: String,
    pub active: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertRequest {
    Price(PriceAlertRequest),
    News(NewsAlertRequest),
}

/// An alert as stored by the alert service
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub user_id: String,
    pub symbol: String,
    #[serde(default)]
    pub alert_type: Option<String>,
    #[serde(default)]
    pub trigger_price: Option<Decimal>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

const fn default_active() -> bool {
    true
}

/// Alert service client trait (Strategy pattern)
///
/// `HttpAlertClient` talks to the real service; `MockAlertClient` keeps
/// alerts in memory.
#[async_trait]
pub trait AlertClient: Send + Sync {
    async fn create_price_alert(&self, request: &PriceAlertRequest) -> Result<Alert>;

    async fn create_news_alert(&self, request: &NewsAlertRequest) -> Result<Alert>;

    async fn list_alerts(&self, user_id: &str) -> Result<Vec<Alert>>;

    async fn delete_alert(&self, alert_id: &str) -> Result<()>;

    /// Route a planned request to the matching endpoint
    async fn submit(&self, request: &AlertRequest) -> Result<Alert> {
        match request {
            AlertRequest::Price(price) => self.create_price_alert(price).await,
            AlertRequest::News(news) => self.create_news_alert(news).await,
        }
    }

    fn name(&self) -> &str;
}
