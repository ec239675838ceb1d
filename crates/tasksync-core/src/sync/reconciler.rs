//! Folds remote outcomes back into tasks and the outbox.

use std::collections::HashMap;

use libsql::Connection;

use super::client::ItemOutcome;
use super::report::SyncReport;
use crate::db::{finish_transaction, LibSqlOutbox, LibSqlTaskRepository};
use crate::error::Result;
use crate::models::{OutboxEntry, TaskId};
use crate::util::unix_millis_now;

/// Entry ids a cycle drained, grouped by task in FIFO order.
pub type DrainedEntries = HashMap<TaskId, Vec<String>>;

/// Group the entries a cycle drained by task.
pub fn drained_by_task(entries: &[OutboxEntry]) -> DrainedEntries {
    let mut drained = DrainedEntries::new();
    for entry in entries {
        drained
            .entry(entry.task_id)
            .or_default()
            .push(entry.id.clone());
    }
    drained
}

pub struct Reconciler<'a> {
    conn: &'a Connection,
    drained: &'a DrainedEntries,
}

impl<'a> Reconciler<'a> {
    /// `drained` bounds what a success may collapse: entries queued after the
    /// drain are left for the next cycle.
    pub const fn new(conn: &'a Connection, drained: &'a DrainedEntries) -> Self {
        Self { conn, drained }
    }

    /// Apply `outcomes` for `batch`, tallying into `report`.
    ///
    /// Entries without an outcome count as failed. A store error on one item
    /// is logged and reported for that item only.
    pub async fn reconcile_batch(
        &self,
        batch: &[OutboxEntry],
        outcomes: Vec<ItemOutcome>,
        report: &mut SyncReport,
    ) {
        let mut by_entry: HashMap<String, ItemOutcome> = outcomes
            .into_iter()
            .map(|outcome| (outcome.entry_id().to_string(), outcome))
            .collect();

        for entry in batch {
            let outcome = by_entry
                .remove(&entry.id)
                .unwrap_or_else(|| ItemOutcome::Failed {
                    entry_id: entry.id.clone(),
                    error: format!("no outcome returned for item {}", entry.id),
                });

            match outcome {
                ItemOutcome::Synced { server_id, .. } => {
                    match self.apply_synced(entry, server_id.as_deref()).await {
                        Ok(()) => report.record_synced(),
                        Err(error) => {
                            tracing::warn!(
                                task_id = %entry.task_id,
                                "Failed to reconcile synced item {}: {error}",
                                entry.id
                            );
                            report.record_failure(
                                entry.task_id,
                                format!("reconciliation failed: {error}"),
                            );
                        }
                    }
                }
                ItemOutcome::Failed { error, .. } => {
                    tracing::warn!(
                        task_id = %entry.task_id,
                        operation = %entry.operation,
                        "Sync item {} failed: {error}",
                        entry.id
                    );
                    if let Err(store_error) = self.apply_failed(entry, &error).await {
                        tracing::warn!(
                            task_id = %entry.task_id,
                            "Failed to record sync failure for item {}: {store_error}",
                            entry.id
                        );
                    }
                    report.record_failure(entry.task_id, error);
                }
            }
        }

        for entry_id in by_entry.keys() {
            tracing::warn!("Ignoring outcome for unknown item {entry_id}");
        }
    }

    /// Collapse the drained entries for the task. The task only becomes
    /// `synced` when nothing newer is still queued for it.
    async fn apply_synced(&self, entry: &OutboxEntry, server_id: Option<&str>) -> Result<()> {
        let own = [entry.id.clone()];
        let entry_ids = self
            .drained
            .get(&entry.task_id)
            .map_or(&own[..], Vec::as_slice);

        self.conn.execute("BEGIN IMMEDIATE", ()).await?;
        let result: Result<(u64, u64)> = async {
            let outbox = LibSqlOutbox::new(self.conn);
            let removed = outbox.remove_entries(&entry.task_id, entry_ids).await?;
            let remaining = outbox.count_for_task(&entry.task_id).await?;

            let repo = LibSqlTaskRepository::new(self.conn);
            if remaining == 0 {
                repo.mark_synced(&entry.task_id, server_id, unix_millis_now())
                    .await?;
            } else {
                repo.mark_acknowledged(&entry.task_id, server_id, unix_millis_now())
                    .await?;
            }
            Ok((removed, remaining))
        }
        .await;
        let (removed, remaining) = finish_transaction(self.conn, result).await?;
        tracing::debug!(
            task_id = %entry.task_id,
            removed,
            remaining,
            "Reconciled synced item"
        );
        Ok(())
    }

    /// Mark the task errored and keep its entry queued for the next cycle.
    async fn apply_failed(&self, entry: &OutboxEntry, error: &str) -> Result<()> {
        self.conn.execute("BEGIN IMMEDIATE", ()).await?;
        let result: Result<()> = async {
            LibSqlTaskRepository::new(self.conn)
                .mark_sync_error(&entry.task_id)
                .await?;
            let outbox = LibSqlOutbox::new(self.conn);
            // An earlier success for the same task may have collapsed this entry.
            if outbox.restore(entry).await? {
                tracing::debug!(task_id = %entry.task_id, "Restored collapsed entry {}", entry.id);
            }
            outbox.mark_error(&entry.task_id, error).await?;
            Ok(())
        }
        .await;
        finish_transaction(self.conn, result).await
    }
}
