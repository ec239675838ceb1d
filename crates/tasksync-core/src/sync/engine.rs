//! Sync cycle driver.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::timeout;

use super::batcher::partition;
use super::client::{ItemOutcome, RemoteSync, TransportError};
use super::reconciler::{drained_by_task, Reconciler};
use super::report::{SyncError, SyncReport, SyncStatusReport};
use crate::config::SyncSettings;
use crate::db::{Database, LibSqlOutbox, LibSqlTaskRepository};
use crate::models::OutboxEntry;

/// Runs sync cycles against a `RemoteSync`.
///
/// At most one cycle runs at a time per engine. The database lock is taken
/// for draining and per-batch reconciliation only, never across a send.
pub struct SyncEngine<R> {
    db: Arc<Mutex<Database>>,
    remote: R,
    batch_size: NonZeroUsize,
    batch_timeout: Duration,
    in_flight: Mutex<()>,
}

impl<R: RemoteSync> SyncEngine<R> {
    pub fn new(db: Arc<Mutex<Database>>, remote: R, settings: &SyncSettings) -> Self {
        Self {
            db,
            remote,
            batch_size: settings.batch_size,
            batch_timeout: settings.request_timeout,
            in_flight: Mutex::new(()),
        }
    }

    /// Drain the outbox, send it in batches, and reconcile the results.
    ///
    /// Returns `SyncError::Unreachable` without touching the outbox when the
    /// remote does not answer, and `SyncError::AlreadyRunning` when another
    /// cycle is in flight. Batch and item failures are reported in the
    /// `SyncReport`, never as an error.
    pub async fn run_cycle(&self) -> Result<SyncReport, SyncError> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            tracing::debug!("Sync requested while another cycle is running");
            return Err(SyncError::AlreadyRunning);
        };

        if !self.remote.check_connectivity().await {
            tracing::info!("Skipping sync: remote unreachable");
            return Err(SyncError::Unreachable);
        }

        let entries = {
            let db = self.db.lock().await;
            LibSqlOutbox::new(db.connection()).drain_all().await?
        };

        if entries.is_empty() {
            tracing::debug!("Sync queue is empty");
            return Ok(SyncReport::default());
        }

        let total = entries.len();
        let drained = drained_by_task(&entries);
        let batches = partition(entries, self.batch_size);
        tracing::info!("Syncing {total} queued items in {} batches", batches.len());

        let mut report = SyncReport::default();
        for (index, batch) in batches.iter().enumerate() {
            let outcomes = self.send(index, batch).await;
            let db = self.db.lock().await;
            Reconciler::new(db.connection(), &drained)
                .reconcile_batch(batch, outcomes, &mut report)
                .await;
        }

        tracing::info!(
            synced = report.synced_items,
            failed = report.failed_items,
            "Sync cycle finished"
        );
        Ok(report)
    }

    /// Queue depth, last sync time and remote reachability.
    pub async fn status(&self) -> crate::Result<SyncStatusReport> {
        let (pending_count, last_synced_at) = {
            let db = self.db.lock().await;
            let pending = LibSqlOutbox::new(db.connection()).pending_count().await?;
            let last = LibSqlTaskRepository::new(db.connection())
                .last_synced_at()
                .await?;
            (pending, last)
        };

        Ok(SyncStatusReport {
            pending_count,
            last_synced_at,
            online: self.remote.check_connectivity().await,
        })
    }

    /// Send one batch; transport errors and timeouts fail every item in it.
    async fn send(&self, index: usize, batch: &[OutboxEntry]) -> Vec<ItemOutcome> {
        tracing::debug!("Sending batch {} with {} items", index + 1, batch.len());

        let error = match timeout(self.batch_timeout, self.remote.send_batch(batch)).await {
            Ok(Ok(outcomes)) => return outcomes,
            Ok(Err(error)) => error,
            Err(_) => TransportError::Timeout(self.batch_timeout),
        };

        tracing::warn!("Batch {} failed: {error}", index + 1);
        let message = error.to_string();
        batch
            .iter()
            .map(|entry| ItemOutcome::Failed {
                entry_id: entry.id.clone(),
                error: message.clone(),
            })
            .collect()
    }
}
