//! Enrichment backend client
//!
//! JSON over HTTP against the eco-score backend. Observers treat event
//! persistence as fire-and-forget and substitute the fallback record when a
//! fetch fails, so nothing here escalates past the observer boundary.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, warn};

use ecolens_core::{DestinationResponse, SearchEvent};

/// Backend connection configuration
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// API base URL (default: http://localhost:8080/api)
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            timeout_secs: 30,
        }
    }
}

impl BackendConfig {
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn search_data_url(&self) -> String {
        format!("{}/search-data?format=json", self.base_url)
    }

    fn destination_url(&self) -> String {
        format!("{}/destination?format=json", self.base_url)
    }
}

/// Errors from backend calls
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to build HTTP client: {0}")]
    Build(String),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("backend returned status {0}")]
    Status(reqwest::StatusCode),
}

/// The enrichment backend boundary
#[async_trait]
pub trait EnrichmentApi: Send + Sync {
    /// Persist an observed raw search event
    async fn persist_event(&self, event: &SearchEvent) -> Result<(), ClientError>;

    /// Fetch the destination enrichment collection
    async fn fetch_destinations(&self) -> Result<DestinationResponse, ClientError>;
}

/// Shared handle to an enrichment backend
pub type SharedEnrichmentApi = Arc<dyn EnrichmentApi>;

/// reqwest-backed enrichment client
pub struct HttpEnrichmentClient {
    client: Client,
    config: BackendConfig,
}

impl HttpEnrichmentClient {
    pub fn new(config: BackendConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ClientError::Build(e.to_string()))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl EnrichmentApi for HttpEnrichmentClient {
    async fn persist_event(&self, event: &SearchEvent) -> Result<(), ClientError> {
        debug!(url = %event.url, "persisting search event");

        let response = self
            .client
            .post(self.config.search_data_url())
            .json(event)
            .send()
            .await?;

        if !response.status().is_success() {
            warn!("search event persistence returned {}", response.status());
            return Err(ClientError::Status(response.status()));
        }
        Ok(())
    }

    async fn fetch_destinations(&self) -> Result<DestinationResponse, ClientError> {
        let response = self
            .client
            .get(self.config.destination_url())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::Status(response.status()));
        }

        let payload: DestinationResponse = response.json().await?;
        debug!(total = payload.total, "fetched destination records");
        Ok(payload)
    }
}

/// Check whether the enrichment backend is reachable
pub async fn check_backend(config: &BackendConfig) -> Result<bool, ClientError> {
    let client = HttpEnrichmentClient::new(config.clone())?;

    match client.fetch_destinations().await {
        Ok(_) => Ok(true),
        Err(ClientError::Status(_)) => Ok(false),
        Err(_) => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BackendConfig::default();
        assert_eq!(config.base_url, "http://localhost:8080/api");
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_endpoint_urls() {
        let config = BackendConfig::default().with_base_url("http://backend:9000/api/");
        assert_eq!(
            config.search_data_url(),
            "http://backend:9000/api/search-data?format=json"
        );
        assert_eq!(
            config.destination_url(),
            "http://backend:9000/api/destination?format=json"
        );
    }
}
