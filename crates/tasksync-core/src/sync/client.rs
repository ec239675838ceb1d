//! Remote sync client.

use std::future::Future;
use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use super::protocol::{BatchRequest, BatchResponse, ItemStatus, CHECKSUM_HEADER};
use crate::config::SyncSettings;
use crate::models::OutboxEntry;
use crate::util::compact_text;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Invalid sync configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Sync HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Sync API error: {0}")]
    Api(String),
    #[error("Sync request timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("Invalid sync payload: {0}")]
    InvalidPayload(String),
}

/// Remote verdict for a single outbox entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Synced {
        entry_id: String,
        server_id: Option<String>,
    },
    Failed {
        entry_id: String,
        error: String,
    },
}

impl ItemOutcome {
    pub fn entry_id(&self) -> &str {
        match self {
            Self::Synced { entry_id, .. } | Self::Failed { entry_id, .. } => entry_id,
        }
    }
}

/// Transport to the remote batch endpoint.
///
/// `send_batch` either returns per-item outcomes or fails the whole batch;
/// entries missing from the outcomes are treated as failed by the caller.
pub trait RemoteSync: Send + Sync {
    /// Whether the remote answers at all.
    fn check_connectivity(&self) -> impl Future<Output = bool> + Send;

    /// Transmit one batch.
    fn send_batch(
        &self,
        batch: &[OutboxEntry],
    ) -> impl Future<Output = Result<Vec<ItemOutcome>, TransportError>> + Send;
}

/// reqwest-backed `RemoteSync`
#[derive(Clone)]
pub struct HttpSyncClient {
    batch_url: String,
    health_url: String,
    client: reqwest::Client,
}

impl HttpSyncClient {
    pub fn new(settings: &SyncSettings) -> Result<Self, TransportError> {
        if !crate::config::has_http_scheme(&settings.api_base_url) {
            return Err(TransportError::InvalidConfiguration(
                "API base URL must include http:// or https://".to_string(),
            ));
        }

        Ok(Self {
            batch_url: settings.batch_url(),
            health_url: settings.health_url(),
            client: reqwest::Client::builder()
                .timeout(settings.request_timeout)
                .build()?,
        })
    }
}

impl RemoteSync for HttpSyncClient {
    async fn check_connectivity(&self) -> bool {
        match self.client.get(&self.health_url).send().await {
            Ok(response) => response.status().is_success(),
            Err(error) => {
                tracing::debug!("Connectivity check against {} failed: {error}", self.health_url);
                false
            }
        }
    }

    async fn send_batch(&self, batch: &[OutboxEntry]) -> Result<Vec<ItemOutcome>, TransportError> {
        let request = BatchRequest::from_entries(batch, chrono::Utc::now())
            .map_err(|error| TransportError::InvalidPayload(format!("queued snapshot: {error}")))?;
        let checksum = request
            .checksum()
            .map_err(|error| TransportError::InvalidPayload(error.to_string()))?;

        let response = self
            .client
            .post(&self.batch_url)
            .header(CHECKSUM_HEADER, &checksum)
            .header("Accept", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Api(parse_api_error(status, &body)));
        }

        let payload = response.json::<BatchResponse>().await?;
        Ok(into_outcomes(payload))
    }
}

fn into_outcomes(payload: BatchResponse) -> Vec<ItemOutcome> {
    payload
        .processed_items
        .into_iter()
        .map(|item| match item.status {
            ItemStatus::Success => ItemOutcome::Synced {
                entry_id: item.client_id,
                server_id: item.server_id.filter(|id| !id.trim().is_empty()),
            },
            ItemStatus::Error => ItemOutcome::Failed {
                entry_id: item.client_id,
                error: item
                    .error
                    .unwrap_or_else(|| "rejected by server".to_string()),
            },
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}
