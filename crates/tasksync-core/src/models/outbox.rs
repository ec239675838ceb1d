//! Outbox entry model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::task::{Task, TaskId};
use crate::error::{Error, Result};

/// Mutation kind recorded in the outbox
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOperation {
    Create,
    Update,
    Delete,
}

impl SyncOperation {
    /// Stored text form
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncOperation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(Error::Database(format!("unknown sync operation '{other}'"))),
        }
    }
}

/// A queued mutation waiting to be confirmed by the remote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxEntry {
    /// Queue entry identifier, distinct from the task id
    pub id: String,
    /// Owning task
    pub task_id: TaskId,
    /// Mutation kind
    pub operation: SyncOperation,
    /// JSON snapshot of the task at enqueue time
    pub data: String,
    /// Enqueue timestamp (Unix ms), defines FIFO order
    pub created_at: i64,
    /// Failed delivery attempts so far
    pub retry_count: i64,
    /// Last failure message, if any
    pub error_message: Option<String>,
}

impl OutboxEntry {
    /// Build a fresh entry holding a snapshot of `task`.
    pub fn for_task(task: &Task, operation: SyncOperation) -> Result<Self> {
        Ok(Self {
            id: Uuid::now_v7().to_string(),
            task_id: task.id,
            operation,
            data: serde_json::to_string(task)?,
            created_at: chrono::Utc::now().timestamp_millis(),
            retry_count: 0,
            error_message: None,
        })
    }

    /// Parse the stored snapshot back into JSON.
    pub fn payload(&self) -> Result<serde_json::Value> {
        Ok(serde_json::from_str(&self.data)?)
    }
}
