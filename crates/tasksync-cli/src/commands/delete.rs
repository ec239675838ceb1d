use tasksync_core::TaskService;

use crate::commands::common::{normalize_task_identifier, resolve_task};
use crate::error::CliError;

pub async fn run_delete(id: &str, service: &TaskService) -> Result<(), CliError> {
    let normalized_id = normalize_task_identifier(id)?;
    let task = resolve_task(&normalized_id, service).await?;

    service.delete_task(&task.id).await?;
    println!("{}", task.id);
    Ok(())
}
