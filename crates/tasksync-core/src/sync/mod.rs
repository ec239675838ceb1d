//! Outbox draining and reconciliation against the remote batch endpoint.

pub mod batcher;
pub mod client;
mod engine;
pub mod protocol;
mod reconciler;
mod report;

pub use batcher::partition;
pub use client::{HttpSyncClient, ItemOutcome, RemoteSync, TransportError};
pub use engine::SyncEngine;
pub use reconciler::Reconciler;
pub use report::{SyncError, SyncItemError, SyncReport, SyncStatusReport};
