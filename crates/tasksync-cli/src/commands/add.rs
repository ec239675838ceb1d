use tasksync_core::models::NewTask;
use tasksync_core::TaskService;

use crate::commands::common::{normalize_text, resolve_task_title};
use crate::error::CliError;

pub async fn run_add(
    title_parts: &[String],
    description: Option<&str>,
    service: &TaskService,
) -> Result<(), CliError> {
    let title = resolve_task_title(title_parts)?;

    let mut input = NewTask::new(title);
    if let Some(description) = description.and_then(normalize_text) {
        input = input.with_description(description);
    }

    let task = service.create_task(input).await?;
    println!("{}", task.id);
    Ok(())
}
