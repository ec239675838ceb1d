use tasksync_core::TaskService;

use crate::commands::common::{format_task_detail, normalize_task_identifier, resolve_task};
use crate::error::CliError;

pub async fn run_show(id: &str, service: &TaskService) -> Result<(), CliError> {
    let normalized_id = normalize_task_identifier(id)?;
    let task = resolve_task(&normalized_id, service).await?;

    for line in format_task_detail(&task) {
        println!("{line}");
    }
    Ok(())
}
