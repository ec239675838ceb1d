//! Sync cycle results.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::TaskId;

/// Reasons a sync cycle did not run
#[derive(Debug, Error)]
pub enum SyncError {
    /// Remote did not answer the connectivity check; nothing was touched
    #[error("Server unreachable. Please try later.")]
    Unreachable,
    /// Another cycle holds the in-flight guard
    #[error("A sync cycle is already in progress")]
    AlreadyRunning,
    /// Local store failed before the cycle could start
    #[error(transparent)]
    Store(#[from] crate::Error),
}

/// One failed item in a cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncItemError {
    pub task_id: TaskId,
    pub error: String,
}

/// Aggregate result of one sync cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub success: bool,
    pub synced_items: usize,
    pub failed_items: usize,
    pub errors: Vec<SyncItemError>,
}

impl Default for SyncReport {
    fn default() -> Self {
        Self {
            success: true,
            synced_items: 0,
            failed_items: 0,
            errors: Vec::new(),
        }
    }
}

impl SyncReport {
    pub(crate) fn record_synced(&mut self) {
        self.synced_items += 1;
    }

    pub(crate) fn record_failure(&mut self, task_id: TaskId, error: impl Into<String>) {
        self.failed_items += 1;
        self.success = false;
        self.errors.push(SyncItemError {
            task_id,
            error: error.into(),
        });
    }
}

/// Snapshot of local sync state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatusReport {
    /// Outbox entries whose task is still `pending` or `error`
    pub pending_count: u64,
    /// Most recent successful sync across all tasks (Unix ms)
    pub last_synced_at: Option<i64>,
    /// Result of the connectivity check
    pub online: bool,
}
