//! Data models for tasksync

mod outbox;
mod task;

pub use outbox::{OutboxEntry, SyncOperation};
pub use task::{NewTask, SyncStatus, Task, TaskId, TaskUpdate};
