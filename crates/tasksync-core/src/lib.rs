//! tasksync-core - Core library for tasksync
//!
//! This crate contains the task models, the libSQL-backed store with its sync
//! outbox, and the engine that drains the outbox to a remote batch endpoint.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod sync;
pub mod util;

pub use config::SyncSettings;
pub use error::{Error, Result};
pub use models::{OutboxEntry, SyncOperation, SyncStatus, Task, TaskId};
pub use services::TaskService;
pub use sync::{SyncError, SyncItemError, SyncReport, SyncStatusReport};
