use std::io;

use tasksync_core::SyncError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] tasksync_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No task title provided")]
    EmptyTitle,
    #[error("Task ID cannot be empty")]
    EmptyTaskId,
    #[error("Nothing to change; pass --title, --description or --completed")]
    NothingToEdit,
    #[error("Task not found for id/prefix: {0}")]
    TaskNotFound(String),
    #[error("{0}")]
    AmbiguousTaskId(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Server unreachable. Please try later.")]
    Unreachable,
    #[error("A sync is already in progress")]
    SyncInProgress,
}

impl CliError {
    /// Process exit status for this error
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Unreachable => 2,
            _ => 1,
        }
    }
}

impl From<SyncError> for CliError {
    fn from(error: SyncError) -> Self {
        match error {
            SyncError::Unreachable => Self::Unreachable,
            SyncError::AlreadyRunning => Self::SyncInProgress,
            SyncError::Store(error) => Self::Core(error),
        }
    }
}
