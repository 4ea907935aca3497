//! # Sync Targets
//!
//! Where queue batches go. The processor only sees the [`SyncTarget`] trait;
//! [`HttpSyncTarget`] is the production implementation.
//!
//! ## Wire Format
//! ```text
//! POST {endpoint}/sync/batch
//! Authorization: Bearer <api_token>          (when configured)
//!
//! {                                          {
//!   "deviceId": "counter-1",                   "accepted": ["id-1", "id-2"],
//!   "storeId": "store-001",          ──►       "rejected": [
//!   "sentAt": "2024-06-01T10:00:00Z",            { "id": "id-3", "error": "..." }
//!   "entries": [ SyncQueue rows ]              ]
//! }                                          }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use dukan_core::SyncQueueEntry;

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};

// =============================================================================
// Wire Types
// =============================================================================

/// One push to the remote.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncBatch {
    pub device_id: String,
    pub store_id: String,
    pub sent_at: DateTime<Utc>,
    pub entries: Vec<SyncQueueEntry>,
}

impl SyncBatch {
    pub fn new(config: &SyncConfig, entries: Vec<SyncQueueEntry>) -> Self {
        SyncBatch {
            device_id: config.device_id().to_string(),
            store_id: config.store_id().to_string(),
            sent_at: Utc::now(),
            entries,
        }
    }

    pub fn ids(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.id.clone()).collect()
    }
}

/// An entry the remote refused, with its reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedEntry {
    pub id: String,
    pub error: String,
}

/// The remote's verdict on a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncBatchResponse {
    #[serde(default)]
    pub accepted: Vec<String>,
    #[serde(default)]
    pub rejected: Vec<RejectedEntry>,
}

// =============================================================================
// Target Trait
// =============================================================================

/// Receives batches of queue entries.
///
/// `Err` means the batch never got a verdict (network, auth, bad response);
/// per-entry outcomes travel in the response.
#[async_trait]
pub trait SyncTarget: Send + Sync {
    async fn push(&self, batch: &SyncBatch) -> SyncResult<SyncBatchResponse>;

    /// Short description for logs.
    fn describe(&self) -> String;
}

// =============================================================================
// HTTP Target
// =============================================================================

/// Pushes batches as JSON over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSyncTarget {
    client: reqwest::Client,
    url: String,
    api_token: Option<String>,
    timeout: Duration,
}

impl HttpSyncTarget {
    /// Builds a target from `[sync]` settings. Fails without an endpoint.
    pub fn new(config: &SyncConfig) -> SyncResult<Self> {
        let endpoint = config.endpoint().ok_or(SyncError::MissingEndpoint)?;
        let timeout = config.sync.request_timeout();

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("dukan-sync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SyncError::InvalidConfig(e.to_string()))?;

        Ok(HttpSyncTarget {
            client,
            url: batch_url(endpoint),
            api_token: config.sync.api_token.clone(),
            timeout,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn transport_error(&self, err: reqwest::Error) -> SyncError {
        if err.is_timeout() {
            SyncError::Timeout(self.timeout.as_secs())
        } else if err.is_decode() {
            SyncError::DeserializationFailed(err.to_string())
        } else {
            SyncError::ConnectionFailed(err.to_string())
        }
    }
}

fn batch_url(endpoint: &str) -> String {
    format!("{}/sync/batch", endpoint.trim_end_matches('/'))
}

#[async_trait]
impl SyncTarget for HttpSyncTarget {
    async fn push(&self, batch: &SyncBatch) -> SyncResult<SyncBatchResponse> {
        debug!(url = %self.url, count = batch.entries.len(), "Posting sync batch");

        let mut request = self.client.post(&self.url).json(batch);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<SyncBatchResponse>()
            .await
            .map_err(|e| self.transport_error(e))
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_url() {
        assert_eq!(batch_url("https://sync.example.com"), "https://sync.example.com/sync/batch");
        assert_eq!(batch_url("http://10.0.0.5:8080/"), "http://10.0.0.5:8080/sync/batch");
    }

    #[test]
    fn test_http_target_requires_endpoint() {
        let mut config = SyncConfig::default();
        assert!(matches!(
            HttpSyncTarget::new(&config),
            Err(SyncError::MissingEndpoint)
        ));

        config.sync.endpoint = Some("https://sync.example.com/api".to_string());
        let target = HttpSyncTarget::new(&config).unwrap();
        assert_eq!(target.url(), "https://sync.example.com/api/sync/batch");
    }

    #[test]
    fn test_response_defaults() {
        let response: SyncBatchResponse = serde_json::from_str(r#"{"accepted":["a"]}"#).unwrap();
        assert_eq!(response.accepted, ["a"]);
        assert!(response.rejected.is_empty());

        let response: SyncBatchResponse =
            serde_json::from_str(r#"{"rejected":[{"id":"b","error":"stale"}]}"#).unwrap();
        assert_eq!(response.rejected[0].error, "stale");
    }

    #[test]
    fn test_batch_is_camel_case() {
        let mut config = SyncConfig::default();
        config.device.id = "counter-1".to_string();
        let json = serde_json::to_value(SyncBatch::new(&config, Vec::new())).unwrap();
        assert_eq!(json["deviceId"], "counter-1");
        assert_eq!(json["storeId"], "default-store");
        assert!(json["entries"].as_array().unwrap().is_empty());
    }
}
