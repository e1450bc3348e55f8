use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::SecretString;
use serde_json::Value;
use tracing::{debug, warn};

use crate::reply::error::FetchError;
use crate::reply::model::ItemData;
use crate::settings::expose;
use crate::timeline::item::StatusReference;

pub const SCRAPE_ENDPOINT: &str = "https://api.scrapecreators.com/v1/twitter/tweet";

/// Fetches post data for one status reference.
#[async_trait]
pub trait ItemFetcher: Send + Sync {
    async fn fetch(&self, reference: &str, api_key: &SecretString) -> Result<ItemData, FetchError>;
}

/// ScrapeCreators tweet endpoint.
pub struct ScrapeCreatorsClient {
    client: reqwest::Client,
    endpoint: String,
}

impl Default for ScrapeCreatorsClient {
    fn default() -> Self {
        Self::new(SCRAPE_ENDPOINT)
    }
}

impl ScrapeCreatorsClient {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.to_string(),
        }
    }
}

/// Map a non-success status onto the fetch failure kinds.
pub fn classify_fetch_status(status: StatusCode, body: &str) -> FetchError {
    match status {
        StatusCode::UNAUTHORIZED => FetchError::InvalidCredential,
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => FetchError::RateLimited,
        StatusCode::NOT_FOUND => FetchError::NotFound,
        other => FetchError::Unknown(format!("({}): {}", other.as_u16(), body.trim())),
    }
}

#[async_trait]
impl ItemFetcher for ScrapeCreatorsClient {
    async fn fetch(&self, reference: &str, api_key: &SecretString) -> Result<ItemData, FetchError> {
        // Validate before any network access
        let reference = StatusReference::parse(reference)
            .ok_or_else(|| FetchError::InvalidReference(reference.to_string()))?;

        debug!(url = %reference, "fetching post data");

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("url", reference.as_str()), ("trim", "true")])
            .header("x-api-key", expose(api_key))
            .send()
            .await
            .map_err(|e| FetchError::Unknown(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "ScrapeCreators API error");
            return Err(classify_fetch_status(status, &body));
        }

        let raw: Value = response
            .json()
            .await
            .map_err(|e| FetchError::Unknown(format!("invalid JSON body: {}", e)))?;

        Ok(ItemData::from_value(&raw))
    }
}
