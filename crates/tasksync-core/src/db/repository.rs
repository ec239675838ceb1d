//! Task repository implementation

use crate::db::finish_transaction;
use crate::db::outbox::LibSqlOutbox;
use crate::error::{Error, Result};
use crate::models::{NewTask, SyncOperation, SyncStatus, Task, TaskId, TaskUpdate};
use libsql::{params, Connection};

const TASK_COLUMNS: &str = "id, title, description, completed, created_at, updated_at, \
                            is_deleted, sync_status, server_id, last_synced_at";

/// Trait for task storage operations
///
/// Every mutation queues an outbox entry in the same transaction as the row
/// write.
#[allow(async_fn_in_trait)]
pub trait TaskRepository {
    /// Create a new task
    async fn create(&self, input: NewTask) -> Result<Task>;

    /// Get a task by ID (soft-deleted tasks are not returned)
    async fn get(&self, id: &TaskId) -> Result<Option<Task>>;

    /// List all non-deleted tasks in storage order
    async fn list(&self) -> Result<Vec<Task>>;

    /// Merge provided fields over an existing task
    async fn update(&self, id: &TaskId, update: TaskUpdate) -> Result<Task>;

    /// Soft delete a task
    async fn delete(&self, id: &TaskId) -> Result<()>;

    /// Tasks with unconfirmed local changes, including soft-deleted ones
    async fn list_needing_sync(&self) -> Result<Vec<Task>>;
}

/// libSQL implementation of `TaskRepository`
pub struct LibSqlTaskRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlTaskRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Find non-deleted task ids starting with `prefix`.
    pub async fn list_ids_by_prefix(&self, prefix: &str, limit: usize) -> Result<Vec<String>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        // Literal match: `%` and `_` in the prefix are not wildcards.
        let prefix = prefix.to_ascii_lowercase();
        let mut rows = self
            .conn
            .query(
                "SELECT id FROM tasks
                 WHERE is_deleted = 0 AND substr(id, 1, length(?1)) = ?1
                 ORDER BY id
                 LIMIT ?2",
                params![prefix, limit],
            )
            .await?;

        let mut ids = Vec::new();
        while let Some(row) = rows.next().await? {
            ids.push(row.get::<String>(0)?);
        }
        Ok(ids)
    }

    /// Fetch a task regardless of its soft delete flag.
    pub async fn get_any(&self, id: &TaskId) -> Result<Option<Task>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?"),
                params![id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_task(&row)?)),
            None => Ok(None),
        }
    }

    /// Record a confirmed sync. Keeps the existing `server_id` when none is given.
    pub async fn mark_synced(
        &self,
        id: &TaskId,
        server_id: Option<&str>,
        synced_at: i64,
    ) -> Result<()> {
        self.conn
            .execute(
                "UPDATE tasks
                 SET sync_status = ?, last_synced_at = ?, server_id = COALESCE(?, server_id)
                 WHERE id = ?",
                params![
                    SyncStatus::Synced.as_str(),
                    synced_at,
                    server_id.map(str::to_string),
                    id.as_str()
                ],
            )
            .await?;
        Ok(())
    }

    /// Record a remote acknowledgement without touching `sync_status`.
    ///
    /// Used when newer local changes are still queued for the task.
    pub async fn mark_acknowledged(
        &self,
        id: &TaskId,
        server_id: Option<&str>,
        synced_at: i64,
    ) -> Result<()> {
        self.conn
            .execute(
                "UPDATE tasks
                 SET last_synced_at = ?, server_id = COALESCE(?, server_id)
                 WHERE id = ?",
                params![synced_at, server_id.map(str::to_string), id.as_str()],
            )
            .await?;
        Ok(())
    }

    /// Record a rejected sync attempt.
    pub async fn mark_sync_error(&self, id: &TaskId) -> Result<()> {
        self.conn
            .execute(
                "UPDATE tasks SET sync_status = ? WHERE id = ?",
                params![SyncStatus::Error.as_str(), id.as_str()],
            )
            .await?;
        Ok(())
    }

    /// Most recent `last_synced_at` across all tasks.
    pub async fn last_synced_at(&self) -> Result<Option<i64>> {
        let mut rows = self
            .conn
            .query("SELECT MAX(last_synced_at) FROM tasks", ())
            .await?;
        match rows.next().await? {
            Some(row) => Ok(row.get::<Option<i64>>(0)?),
            None => Ok(None),
        }
    }

    async fn insert_row(&self, task: &Task) -> Result<()> {
        self.conn
            .execute(
                &format!(
                    "INSERT INTO tasks ({TASK_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
                ),
                params![
                    task.id.as_str(),
                    task.title.as_str(),
                    task.description.as_str(),
                    i32::from(task.completed),
                    task.created_at,
                    task.updated_at,
                    i32::from(task.is_deleted),
                    task.sync_status.as_str(),
                    task.server_id.clone(),
                    task.last_synced_at
                ],
            )
            .await?;
        Ok(())
    }

    async fn update_row(&self, task: &Task) -> Result<()> {
        self.conn
            .execute(
                "UPDATE tasks
                 SET title = ?, description = ?, completed = ?, updated_at = ?,
                     is_deleted = ?, sync_status = ?
                 WHERE id = ?",
                params![
                    task.title.as_str(),
                    task.description.as_str(),
                    i32::from(task.completed),
                    task.updated_at,
                    i32::from(task.is_deleted),
                    task.sync_status.as_str(),
                    task.id.as_str()
                ],
            )
            .await?;
        Ok(())
    }

    async fn create_in_tx(&self, task: &Task) -> Result<()> {
        self.insert_row(task).await?;
        LibSqlOutbox::new(self.conn)
            .enqueue(task, SyncOperation::Create)
            .await?;
        Ok(())
    }

    async fn update_in_tx(&self, id: &TaskId, update: TaskUpdate) -> Result<Task> {
        let mut task = self
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        task.apply(update)?;
        self.update_row(&task).await?;
        LibSqlOutbox::new(self.conn)
            .enqueue(&task, SyncOperation::Update)
            .await?;
        Ok(task)
    }

    async fn delete_in_tx(&self, id: &TaskId) -> Result<()> {
        let mut task = self
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        task.mark_deleted();
        self.update_row(&task).await?;
        LibSqlOutbox::new(self.conn)
            .enqueue(&task, SyncOperation::Delete)
            .await?;
        Ok(())
    }

    async fn query_tasks(&self, sql: &str) -> Result<Vec<Task>> {
        let mut rows = self.conn.query(sql, ()).await?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next().await? {
            tasks.push(Self::parse_task(&row)?);
        }
        Ok(tasks)
    }

    /// Parse a task from a database row
    fn parse_task(row: &libsql::Row) -> Result<Task> {
        let id: String = row.get(0)?;
        let sync_status: String = row.get(7)?;
        Ok(Task {
            id: id
                .parse()
                .map_err(|_| Error::Database(format!("invalid task id '{id}'")))?,
            title: row.get(1)?,
            description: row.get(2)?,
            completed: row.get::<i32>(3)? != 0,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
            is_deleted: row.get::<i32>(6)? != 0,
            sync_status: sync_status.parse()?,
            server_id: row.get::<Option<String>>(8)?,
            last_synced_at: row.get::<Option<i64>>(9)?,
        })
    }
}

impl TaskRepository for LibSqlTaskRepository<'_> {
    async fn create(&self, input: NewTask) -> Result<Task> {
        // Validation happens before the transaction opens.
        let task = Task::new(input)?;

        self.conn.execute("BEGIN IMMEDIATE", ()).await?;
        let result = self.create_in_tx(&task).await;
        finish_transaction(self.conn, result).await?;

        tracing::debug!(task_id = %task.id, "Created task");
        Ok(task)
    }

    async fn get(&self, id: &TaskId) -> Result<Option<Task>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ? AND is_deleted = 0"),
                params![id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_task(&row)?)),
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<Task>> {
        self.query_tasks(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE is_deleted = 0 ORDER BY rowid ASC"
        ))
        .await
    }

    async fn update(&self, id: &TaskId, update: TaskUpdate) -> Result<Task> {
        self.conn.execute("BEGIN IMMEDIATE", ()).await?;
        let result = self.update_in_tx(id, update).await;
        let task = finish_transaction(self.conn, result).await?;

        tracing::debug!(task_id = %task.id, "Updated task");
        Ok(task)
    }

    async fn delete(&self, id: &TaskId) -> Result<()> {
        self.conn.execute("BEGIN IMMEDIATE", ()).await?;
        let result = self.delete_in_tx(id).await;
        finish_transaction(self.conn, result).await?;

        tracing::debug!(task_id = %id, "Soft-deleted task");
        Ok(())
    }

    async fn list_needing_sync(&self) -> Result<Vec<Task>> {
        self.query_tasks(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE sync_status IN ('pending', 'error')
             ORDER BY updated_at ASC"
        ))
        .await
    }
}
