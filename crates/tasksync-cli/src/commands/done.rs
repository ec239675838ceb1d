use tasksync_core::models::TaskUpdate;
use tasksync_core::TaskService;

use crate::commands::common::{normalize_task_identifier, resolve_task};
use crate::error::CliError;

pub async fn run_done(id: &str, service: &TaskService) -> Result<(), CliError> {
    let normalized_id = normalize_task_identifier(id)?;
    let task = resolve_task(&normalized_id, service).await?;

    if task.completed {
        println!("{}", task.id);
        return Ok(());
    }

    let update = TaskUpdate {
        completed: Some(true),
        ..TaskUpdate::default()
    };
    let updated = service.update_task(&task.id, update).await?;
    println!("{}", updated.id);
    Ok(())
}
