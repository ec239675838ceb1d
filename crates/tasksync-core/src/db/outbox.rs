//! Sync outbox (`sync_queue` table)

use crate::error::{Error, Result};
use crate::models::{OutboxEntry, SyncOperation, Task, TaskId};
use libsql::{params, Connection};

const ENTRY_COLUMNS: &str =
    "id, task_id, operation, data, created_at, retry_count, error_message";

/// Append-only, time-ordered queue of pending sync work
///
/// Borrows a connection so the repository can enqueue inside its own
/// transaction.
pub struct LibSqlOutbox<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlOutbox<'a> {
    /// Create an outbox over the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Queue a snapshot of `task` for the remote.
    ///
    /// No de-duplication: every call adds a new entry.
    pub async fn enqueue(&self, task: &Task, operation: SyncOperation) -> Result<OutboxEntry> {
        let entry = OutboxEntry::for_task(task, operation)?;
        self.insert(&entry).await?;
        tracing::debug!(
            task_id = %entry.task_id,
            operation = %entry.operation,
            "Queued sync entry {}",
            entry.id
        );
        Ok(entry)
    }

    /// Insert a fully-formed entry.
    pub async fn insert(&self, entry: &OutboxEntry) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO sync_queue (id, task_id, operation, data, created_at, retry_count, error_message)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
                params![
                    entry.id.as_str(),
                    entry.task_id.as_str(),
                    entry.operation.as_str(),
                    entry.data.as_str(),
                    entry.created_at,
                    entry.retry_count,
                    entry.error_message.clone()
                ],
            )
            .await?;
        Ok(())
    }

    /// Put an entry back if a reconciliation earlier in the cycle removed it.
    ///
    /// Returns `true` when the entry was missing and has been re-inserted.
    pub async fn restore(&self, entry: &OutboxEntry) -> Result<bool> {
        let inserted = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO sync_queue (id, task_id, operation, data, created_at, retry_count, error_message)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
                params![
                    entry.id.as_str(),
                    entry.task_id.as_str(),
                    entry.operation.as_str(),
                    entry.data.as_str(),
                    entry.created_at,
                    entry.retry_count,
                    entry.error_message.clone()
                ],
            )
            .await?;
        Ok(inserted > 0)
    }

    /// Every entry, oldest first (ties keep insertion order).
    pub async fn drain_all(&self) -> Result<Vec<OutboxEntry>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {ENTRY_COLUMNS} FROM sync_queue ORDER BY created_at ASC, rowid ASC"
                ),
                (),
            )
            .await?;

        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            entries.push(Self::parse_entry(&row)?);
        }
        Ok(entries)
    }

    /// Entries for a single task, oldest first.
    pub async fn list_for_task(&self, task_id: &TaskId) -> Result<Vec<OutboxEntry>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {ENTRY_COLUMNS} FROM sync_queue WHERE task_id = ?
                     ORDER BY created_at ASC, rowid ASC"
                ),
                params![task_id.as_str()],
            )
            .await?;

        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            entries.push(Self::parse_entry(&row)?);
        }
        Ok(entries)
    }

    /// Delete every entry for the task; returns how many were removed.
    pub async fn remove_by_task(&self, task_id: &TaskId) -> Result<u64> {
        let removed = self
            .conn
            .execute(
                "DELETE FROM sync_queue WHERE task_id = ?",
                params![task_id.as_str()],
            )
            .await?;
        Ok(removed)
    }

    /// Delete the listed entries of one task; others (e.g. enqueued after a
    /// drain) are left alone. Returns how many were removed.
    pub async fn remove_entries(&self, task_id: &TaskId, entry_ids: &[String]) -> Result<u64> {
        let mut removed = 0;
        for entry_id in entry_ids {
            removed += self
                .conn
                .execute(
                    "DELETE FROM sync_queue WHERE id = ? AND task_id = ?",
                    params![entry_id.as_str(), task_id.as_str()],
                )
                .await?;
        }
        Ok(removed)
    }

    /// Record a failed delivery on the task's entries without removing them.
    pub async fn mark_error(&self, task_id: &TaskId, message: &str) -> Result<u64> {
        let updated = self
            .conn
            .execute(
                "UPDATE sync_queue
                 SET error_message = ?, retry_count = retry_count + 1
                 WHERE task_id = ?",
                params![message, task_id.as_str()],
            )
            .await?;
        Ok(updated)
    }

    /// Entries whose owning task is still `pending` or `error`.
    pub async fn pending_count(&self) -> Result<u64> {
        self.count(
            "SELECT COUNT(*) FROM sync_queue q
             JOIN tasks t ON t.id = q.task_id
             WHERE t.sync_status IN ('pending', 'error')",
            (),
        )
        .await
    }

    /// Entries queued for one task.
    pub async fn count_for_task(&self, task_id: &TaskId) -> Result<u64> {
        self.count(
            "SELECT COUNT(*) FROM sync_queue WHERE task_id = ?",
            params![task_id.as_str()],
        )
        .await
    }

    async fn count(&self, sql: &str, params: impl libsql::params::IntoParams) -> Result<u64> {
        let mut rows = self.conn.query(sql, params).await?;
        let count = match rows.next().await? {
            Some(row) => row.get::<i64>(0)?,
            None => 0,
        };
        u64::try_from(count).map_err(|_| Error::Database(format!("negative count {count}")))
    }

    fn parse_entry(row: &libsql::Row) -> Result<OutboxEntry> {
        let task_id: String = row.get(1)?;
        let operation: String = row.get(2)?;
        Ok(OutboxEntry {
            id: row.get(0)?,
            task_id: task_id
                .parse()
                .map_err(|_| Error::Database(format!("invalid task id '{task_id}' in outbox")))?,
            operation: operation.parse()?,
            data: row.get(3)?,
            created_at: row.get(4)?,
            retry_count: row.get(5)?,
            error_message: row.get::<Option<String>>(6)?,
        })
    }
}
