use tasksync_core::models::TaskUpdate;
use tasksync_core::TaskService;

use crate::commands::common::{normalize_task_identifier, resolve_task};
use crate::error::CliError;

/// Field overrides from `tasksync edit`
#[derive(Debug, Default)]
pub struct EditArgs {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
}

impl EditArgs {
    fn into_update(self) -> Result<TaskUpdate, CliError> {
        let update = TaskUpdate {
            title: self.title,
            description: self.description,
            completed: self.completed,
        };
        if update.is_empty() {
            Err(CliError::NothingToEdit)
        } else {
            Ok(update)
        }
    }
}

pub async fn run_edit(id: &str, args: EditArgs, service: &TaskService) -> Result<(), CliError> {
    let normalized_id = normalize_task_identifier(id)?;
    let update = args.into_update()?;
    let task = resolve_task(&normalized_id, service).await?;

    let updated = service.update_task(&task.id, update).await?;
    println!("{}", updated.id);
    Ok(())
}
