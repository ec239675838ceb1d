//! Thread-safe task service wrapping the store and the sync engine.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::SyncSettings;
use crate::db::{Database, LibSqlTaskRepository, TaskRepository};
use crate::models::{NewTask, Task, TaskId, TaskUpdate};
use crate::sync::{
    HttpSyncClient, RemoteSync, SyncEngine, SyncError, SyncReport, SyncStatusReport,
};
use crate::{Error, Result};

/// Service for task CRUD and sync, shareable across tasks.
pub struct TaskService<R = HttpSyncClient> {
    db: Arc<Mutex<Database>>,
    engine: Arc<SyncEngine<R>>,
    db_path: Option<PathBuf>,
}

impl<R> Clone for TaskService<R> {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            engine: Arc::clone(&self.engine),
            db_path: self.db_path.clone(),
        }
    }
}

impl TaskService<HttpSyncClient> {
    /// Open a service at the given filesystem path syncing over HTTP.
    pub async fn open_path(db_path: impl Into<PathBuf>, settings: &SyncSettings) -> Result<Self> {
        let remote =
            HttpSyncClient::new(settings).map_err(|error| Error::Config(error.to_string()))?;
        Self::with_remote(db_path, remote, settings).await
    }
}

impl<R: RemoteSync> TaskService<R> {
    /// Open a service at the given path with a custom remote.
    pub async fn with_remote(
        db_path: impl Into<PathBuf>,
        remote: R,
        settings: &SyncSettings,
    ) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        tracing::debug!("Opening task database at {}", db_path.display());
        let db = Database::open(&db_path).await?;
        Ok(Self::from_parts(db, remote, settings, Some(db_path)))
    }

    /// Open an in-memory service (primarily for tests).
    pub async fn open_in_memory(remote: R, settings: &SyncSettings) -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self::from_parts(db, remote, settings, None))
    }

    fn from_parts(
        db: Database,
        remote: R,
        settings: &SyncSettings,
        db_path: Option<PathBuf>,
    ) -> Self {
        let db = Arc::new(Mutex::new(db));
        let engine = SyncEngine::new(Arc::clone(&db), remote, settings);
        Self {
            db,
            engine: Arc::new(engine),
            db_path,
        }
    }

    /// Backing file, if any
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Create a task and queue it for sync.
    pub async fn create_task(&self, input: NewTask) -> Result<Task> {
        let db = self.db.lock().await;
        let repo = LibSqlTaskRepository::new(db.connection());
        repo.create(input).await
    }

    /// Fetch a task by id.
    pub async fn get_task(&self, id: &TaskId) -> Result<Option<Task>> {
        let db = self.db.lock().await;
        let repo = LibSqlTaskRepository::new(db.connection());
        repo.get(id).await
    }

    /// List non-deleted tasks.
    pub async fn list_tasks(&self) -> Result<Vec<Task>> {
        let db = self.db.lock().await;
        let repo = LibSqlTaskRepository::new(db.connection());
        repo.list().await
    }

    /// Update a task.
    pub async fn update_task(&self, id: &TaskId, update: TaskUpdate) -> Result<Task> {
        let db = self.db.lock().await;
        let repo = LibSqlTaskRepository::new(db.connection());
        repo.update(id, update).await
    }

    /// Soft-delete a task.
    pub async fn delete_task(&self, id: &TaskId) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlTaskRepository::new(db.connection());
        repo.delete(id).await
    }

    /// Tasks with unconfirmed local changes, including deleted ones.
    pub async fn list_tasks_needing_sync(&self) -> Result<Vec<Task>> {
        let db = self.db.lock().await;
        let repo = LibSqlTaskRepository::new(db.connection());
        repo.list_needing_sync().await
    }

    /// Ids of non-deleted tasks starting with `prefix`.
    pub async fn resolve_id_prefix(&self, prefix: &str, limit: usize) -> Result<Vec<String>> {
        let db = self.db.lock().await;
        let repo = LibSqlTaskRepository::new(db.connection());
        repo.list_ids_by_prefix(prefix, limit).await
    }

    /// Run one sync cycle.
    pub async fn sync(&self) -> std::result::Result<SyncReport, SyncError> {
        self.engine.run_cycle().await
    }

    /// Queue depth, last sync time and reachability.
    pub async fn sync_status(&self) -> Result<SyncStatusReport> {
        self.engine.status().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OutboxEntry, SyncStatus};
    use crate::sync::{ItemOutcome, TransportError};
    use pretty_assertions::assert_eq;

    struct AcceptAll;

    impl RemoteSync for AcceptAll {
        async fn check_connectivity(&self) -> bool {
            true
        }

        async fn send_batch(
            &self,
            batch: &[OutboxEntry],
        ) -> std::result::Result<Vec<ItemOutcome>, TransportError> {
            Ok(batch
                .iter()
                .map(|entry| ItemOutcome::Synced {
                    entry_id: entry.id.clone(),
                    server_id: Some(format!("srv-{}", entry.task_id)),
                })
                .collect())
        }
    }

    async fn service() -> TaskService<AcceptAll> {
        TaskService::open_in_memory(AcceptAll, &SyncSettings::default())
            .await
            .unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn in_memory_create_and_list_roundtrip() {
        let service = service().await;

        service
            .create_task(NewTask::new("hello core").with_description("first"))
            .await
            .unwrap();
        let tasks = service.list_tasks().await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "hello core");
        assert_eq!(tasks[0].description, "first");
        assert!(service.db_path().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn clones_share_the_same_store() {
        let service = service().await;
        let other = service.clone();

        let task = other.create_task(NewTask::new("shared")).await.unwrap();
        assert_eq!(service.get_task(&task.id).await.unwrap(), Some(task));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn sync_clears_tasks_needing_sync() {
        let service = service().await;
        let keep = service.create_task(NewTask::new("keep")).await.unwrap();
        let gone = service.create_task(NewTask::new("gone")).await.unwrap();
        service.delete_task(&gone.id).await.unwrap();
        assert_eq!(service.list_tasks_needing_sync().await.unwrap().len(), 2);

        let report = service.sync().await.unwrap();

        assert!(report.success);
        assert_eq!(report.synced_items, 3);
        assert!(service.list_tasks_needing_sync().await.unwrap().is_empty());
        let kept = service.get_task(&keep.id).await.unwrap().unwrap();
        assert_eq!(kept.sync_status, SyncStatus::Synced);
        assert_eq!(kept.server_id, Some(format!("srv-{}", keep.id)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn update_after_sync_requeues_task() {
        let service = service().await;
        let task = service.create_task(NewTask::new("draft")).await.unwrap();
        service.sync().await.unwrap();

        let updated = service
            .update_task(
                &task.id,
                TaskUpdate {
                    completed: Some(true),
                    ..TaskUpdate::default()
                },
            )
            .await
            .unwrap();

        assert!(updated.completed);
        assert_eq!(updated.sync_status, SyncStatus::Pending);
        assert_eq!(service.sync_status().await.unwrap().pending_count, 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn resolve_id_prefix_matches_existing_tasks() {
        let service = service().await;
        let task = service.create_task(NewTask::new("find me")).await.unwrap();
        let id = task.id.to_string();

        let matches = service.resolve_id_prefix(&id[..8], 5).await.unwrap();
        assert!(matches.contains(&id));
        assert!(service
            .resolve_id_prefix("zzzz", 5)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn open_path_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tasksync.db");

        let service = TaskService::open_path(&path, &SyncSettings::default())
            .await
            .unwrap();
        service.create_task(NewTask::new("on disk")).await.unwrap();

        assert!(path.exists());
        assert_eq!(service.db_path(), Some(path.as_path()));
    }
}
