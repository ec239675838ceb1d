//! Shared services used by clients.

mod task;

pub use task::TaskService;
