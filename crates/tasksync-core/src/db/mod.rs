//! Database layer for tasksync

mod connection;
mod migrations;
mod outbox;
mod repository;

pub use connection::Database;
pub use outbox::LibSqlOutbox;
pub use repository::{LibSqlTaskRepository, TaskRepository};

use crate::error::Result;
use libsql::Connection;

/// Commit when `result` is `Ok`, roll back otherwise.
///
/// Pairs with a preceding `BEGIN` on the same connection.
pub(crate) async fn finish_transaction<T>(conn: &Connection, result: Result<T>) -> Result<T> {
    match result {
        Ok(value) => {
            if let Err(e) = conn.execute("COMMIT", ()).await {
                conn.execute("ROLLBACK", ()).await.ok();
                return Err(e.into());
            }
            Ok(value)
        }
        Err(e) => {
            conn.execute("ROLLBACK", ()).await.ok();
            Err(e)
        }
    }
}
