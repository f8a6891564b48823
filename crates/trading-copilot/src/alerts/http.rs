//! HTTP Alert Client
//!
//! reqwest client for the alert-management service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;

use super::{Alert, AlertClient, NewsAlertRequest, PriceAlertRequest};
use crate::error::{CopilotError, Result};

const DEFAULT_ALERT_SERVICE_URL: &str = "http://localhost:8002";

#[derive(Clone, Debug)]
pub struct AlertServiceConfig {
    /// Service base URL, without trailing slash
    pub base_url: String,

    pub timeout_secs: u64,
}

impl Default for AlertServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ALERT_SERVICE_URL.into(),
            timeout_secs: 10,
        }
    }
}

impl AlertServiceConfig {
    /// `None` when `ALERT_SERVICE_URL` is unset
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("ALERT_SERVICE_URL").ok()?;
        let timeout_secs = std::env::var("ALERT_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        Some(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_secs,
        })
    }
}

/// Alert service over HTTP
pub struct HttpAlertClient {
    client: Client,
    base_url: Url,
}

impl HttpAlertClient {
    pub fn new(config: AlertServiceConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| CopilotError::Config(format!("invalid alert service URL: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(CopilotError::Config(format!(
                "alert service URL cannot carry a path: {}",
                config.base_url
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, base_url })
    }

    /// `{base}/api/alerts/{segment}` with `segment` percent-encoded as one
    /// path segment
    fn url(&self, segment: &str) -> Result<Url> {
        if matches!(segment.trim(), "" | "." | "..") {
            return Err(CopilotError::InvalidAlert(format!(
                "invalid alert path segment {segment:?}"
            )));
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| CopilotError::Config("alert service URL cannot carry a path".into()))?
            .pop_if_empty()
            .extend(["api", "alerts", segment]);
        Ok(url)
    }

    async fn read<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CopilotError::AlertService { status: status.as_u16(), body });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl AlertClient for HttpAlertClient {
    async fn create_price_alert(&self, request: &PriceAlertRequest) -> Result<Alert> {
        let response = self.client.post(self.url("price")?).json(request).send().await?;
        Self::read(response).await
    }

    async fn create_news_alert(&self, request: &NewsAlertRequest) -> Result<Alert> {
        let response = self.client.post(self.url("news")?).json(request).send().await?;
        Self::read(response).await
    }

    async fn list_alerts(&self, user_id: &str) -> Result<Vec<Alert>> {
        let response = self.client.get(self.url(user_id)?).send().await?;
        Self::read(response).await
    }

    async fn delete_alert(&self, alert_id: &str) -> Result<()> {
        let response = self.client.delete(self.url(alert_id)?).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(CopilotError::AlertNotFound(alert_id.to_string())),
            s if s.is_success() => Ok(()),
            s => {
                let body = response.text().await.unwrap_or_default();
                Err(CopilotError::AlertService { status: s.as_u16(), body })
            }
        }
    }

    fn name(&self) -> &str {
        "AlertService"
    }
}
