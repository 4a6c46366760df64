//! REST client for the monitor backend
//!
//! ## Endpoints
//!
//! - `GET  {base}/events` → `{"events": [...]}` (heterogeneous history)
//! - `GET  {base}/rules`  → `{"domains": [...]}`
//! - `POST {base}/rules`  ← `{"domains": [...]}` (full replacement)
//!
//! A body whose list field is missing or not an array is read as empty.

use {
    crate::{
        aggregator::SeedData,
        blocklist::BlocklistStore,
        types::{parse_records, WireEvent},
    },
    async_trait::async_trait,
    reqwest::StatusCode,
    serde::{Deserialize, Serialize},
    std::time::Duration,
};

#[derive(Debug)]
pub enum ApiError {
    Transport(reqwest::Error),
    Status(StatusCode),
    Decode(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Transport(e) => write!(f, "Transport error: {}", e),
            ApiError::Status(status) => write!(f, "Backend returned {}", status),
            ApiError::Decode(msg) => write!(f, "Invalid response body: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Transport(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Transport(e)
        }
    }
}

#[derive(Debug, Deserialize)]
struct EventsResponse {
    #[serde(default)]
    events: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct RulesBody {
    #[serde(default)]
    domains: serde_json::Value,
}

#[derive(Serialize)]
struct RulesUpdate<'a> {
    domains: &'a [String],
}

/// Thin client over the backend REST API
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Full event history as retained by the backend.
    ///
    /// Records that are individually malformed are skipped; records of kinds
    /// the dashboard does not render come back as [`WireEvent::Other`].
    pub async fn fetch_events(&self) -> Result<Vec<WireEvent>, ApiError> {
        let response = self.client.get(self.url("events")).send().await?;
        if !response.status().is_success() {
            return Err(ApiError::Status(response.status()));
        }

        let body: EventsResponse = response.json().await?;
        let serde_json::Value::Array(items) = body.events else {
            return Ok(Vec::new());
        };

        Ok(parse_records(items))
    }

    /// Initial view contents: last summary plus the `limit` newest DNS events.
    pub async fn fetch_seed(&self, limit: usize) -> Result<SeedData, ApiError> {
        let records = self.fetch_events().await?;
        Ok(SeedData::from_records(records, limit))
    }
}

#[async_trait]
impl BlocklistStore for ApiClient {
    async fn fetch_blocklist(&self) -> Result<Vec<String>, ApiError> {
        let response = self.client.get(self.url("rules")).send().await?;
        if !response.status().is_success() {
            return Err(ApiError::Status(response.status()));
        }

        let body: RulesBody = response.json().await?;
        let serde_json::Value::Array(items) = body.domains else {
            return Ok(Vec::new());
        };
        Ok(items
            .into_iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect())
    }

    async fn update_blocklist(&self, domains: &[String]) -> Result<(), ApiError> {
        let response = self
            .client
            .post(self.url("rules"))
            .json(&RulesUpdate { domains })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ApiError::Status(response.status()));
        }
        Ok(())
    }
}
