//! Wire format for the remote batch endpoint.
//!
//! Request: `POST {base}/batch` with an `X-Checksum` header carrying the
//! SHA-256 hex digest of the serialized `items` array.
//! Response: `{"processed_items": [{"client_id", "status", "server_id"?, "error"?}]}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::models::{OutboxEntry, SyncOperation, TaskId};

/// Header carrying the batch checksum
pub const CHECKSUM_HEADER: &str = "X-Checksum";

/// One queued mutation as sent to the remote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    /// Outbox entry id, echoed back in the response
    pub client_id: String,
    pub task_id: TaskId,
    pub operation: SyncOperation,
    /// Parsed task snapshot
    pub data: serde_json::Value,
}

impl TryFrom<&OutboxEntry> for BatchItem {
    type Error = serde_json::Error;

    fn try_from(entry: &OutboxEntry) -> Result<Self, Self::Error> {
        Ok(Self {
            client_id: entry.id.clone(),
            task_id: entry.task_id,
            operation: entry.operation,
            data: serde_json::from_str(&entry.data)?,
        })
    }
}

/// Batch envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub items: Vec<BatchItem>,
    pub client_timestamp: DateTime<Utc>,
}

impl BatchRequest {
    /// Build an envelope for `entries`, stamped with `client_timestamp`.
    pub fn from_entries(
        entries: &[OutboxEntry],
        client_timestamp: DateTime<Utc>,
    ) -> Result<Self, serde_json::Error> {
        let items = entries
            .iter()
            .map(BatchItem::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            items,
            client_timestamp,
        })
    }

    /// SHA-256 hex digest of the serialized item list.
    pub fn checksum(&self) -> Result<String, serde_json::Error> {
        checksum(&self.items)
    }
}

/// SHA-256 hex digest of `items` serialized as compact JSON.
pub fn checksum(items: &[BatchItem]) -> Result<String, serde_json::Error> {
    let canonical = serde_json::to_string(items)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Per-item verdict reported by the remote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Success,
    Error,
}

/// Remote outcome for one batch item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedItem {
    pub client_id: String,
    pub status: ItemStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Batch endpoint response body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResponse {
    #[serde(default)]
    pub processed_items: Vec<ProcessedItem>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewTask, Task};
    use pretty_assertions::assert_eq;

    fn entry(title: &str) -> OutboxEntry {
        let task = Task::new(NewTask::new(title)).unwrap();
        OutboxEntry::for_task(&task, SyncOperation::Create).unwrap()
    }

    #[test]
    fn request_carries_parsed_snapshot() {
        let e = entry("wire");
        let request = BatchRequest::from_entries(std::slice::from_ref(&e), Utc::now()).unwrap();

        assert_eq!(request.items.len(), 1);
        assert_eq!(request.items[0].client_id, e.id);
        assert_eq!(request.items[0].data["title"], "wire");

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["items"][0]["operation"], "create");
        assert_eq!(json["items"][0]["task_id"], e.task_id.as_str());
        assert!(json["client_timestamp"].is_string());
    }

    #[test]
    fn checksum_is_stable_and_content_sensitive() {
        let a = entry("a");
        let b = entry("b");
        let first = BatchRequest::from_entries(&[a.clone(), b.clone()], Utc::now()).unwrap();
        let later = BatchRequest::from_entries(&[a.clone(), b.clone()], Utc::now()).unwrap();
        let reordered = BatchRequest::from_entries(&[b, a], Utc::now()).unwrap();

        let digest = first.checksum().unwrap();
        assert_eq!(digest.len(), 64);
        // The client timestamp is not part of the digest.
        assert_eq!(digest, later.checksum().unwrap());
        assert_ne!(digest, reordered.checksum().unwrap());
    }

    #[test]
    fn checksum_matches_sha256_of_item_json() {
        let request = BatchRequest::from_entries(&[entry("digest")], Utc::now()).unwrap();
        let json = serde_json::to_string(&request.items).unwrap();
        let expected = hex::encode(Sha256::digest(json.as_bytes()));
        assert_eq!(request.checksum().unwrap(), expected);
    }

    #[test]
    fn corrupt_snapshot_is_rejected() {
        let mut e = entry("broken");
        e.data = "{not json".to_string();
        assert!(BatchRequest::from_entries(&[e], Utc::now()).is_err());
    }

    #[test]
    fn response_parses_optional_fields() {
        let body = r#"{
            "processed_items": [
                {"client_id": "1", "status": "success", "server_id": "srv-1"},
                {"client_id": "2", "status": "error", "error": "conflict"}
            ]
        }"#;
        let response: BatchResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.processed_items[0].status, ItemStatus::Success);
        assert_eq!(response.processed_items[0].server_id.as_deref(), Some("srv-1"));
        assert_eq!(response.processed_items[1].error.as_deref(), Some("conflict"));
    }
}
