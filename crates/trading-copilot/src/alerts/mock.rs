//! Mock Alert Client
//!
//! In-memory alert store for tests and offline runs.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Alert, AlertClient, NewsAlertRequest, PriceAlertRequest};
use crate::error::{CopilotError, Result};

/// Alert client that keeps everything in memory
#[derive(Default)]
pub struct MockAlertClient {
    alerts: RwLock<Vec<Alert>>,
    /// Answer every create call with a 503
    unavailable: bool,
}

impl MockAlertClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// A client whose service is down
    pub fn unavailable() -> Self {
        Self { alerts: RwLock::default(), unavailable: true }
    }

    /// Everything created so far
    pub async fn alerts(&self) -> Vec<Alert> {
        self.alerts.read().await.clone()
    }

    async fn store(&self, alert: Alert) -> Result<Alert> {
        if self.unavailable {
            return Err(CopilotError::AlertService {
                status: 503,
                body: "mock alert service unavailable".into(),
            });
        }
        self.alerts.write().await.push(alert.clone());
        Ok(alert)
    }
}

#[async_trait]
impl AlertClient for MockAlertClient {
    async fn create_price_alert(&self, request: &PriceAlertRequest) -> Result<Alert> {
        if request.trigger_price.is_sign_negative() || request.trigger_price.is_zero() {
            return Err(CopilotError::InvalidAlert("trigger price must be positive".into()));
        }

        let alert_type = serde_json::to_value(request.alert_type)?
            .as_str()
            .map(str::to_string);

        self.store(Alert {
            id: Uuid::new_v4().to_string(),
            user_id: request.user_id.clone(),
            symbol: request.symbol.clone(),
            alert_type,
            trigger_price: Some(request.trigger_price),
            keywords: Vec::new(),
            message: request.message.clone(),
            active: request.active,
            created_at: Some(Utc::now()),
        })
        .await
    }

    async fn create_news_alert(&self, request: &NewsAlertRequest) -> Result<Alert> {
        self.store(Alert {
            id: Uuid::new_v4().to_string(),
            user_id: request.user_id.clone(),
            symbol: request.symbol.clone(),
            alert_type: Some("news".into()),
            trigger_price: None,
            keywords: request.keywords.clone(),
            message: request.message.clone(),
            active: request.active,
            created_at: Some(Utc::now()),
        })
        .await
    }

    async fn list_alerts(&self, user_id: &str) -> Result<Vec<Alert>> {
        Ok(self
            .alerts
            .read()
            .await
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn delete_alert(&self, alert_id: &str) -> Result<()> {
        let mut alerts = self.alerts.write().await;
        let before = alerts.len();
        alerts.retain(|a| a.id != alert_id);
        if alerts.len() == before {
            return Err(CopilotError::AlertNotFound(alert_id.to_string()));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "MockAlertService"
    }
}
