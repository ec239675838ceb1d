use tasksync_core::TaskService;

use crate::commands::common::{format_task_lines, task_to_list_item, TaskListItem};
use crate::error::CliError;

pub async fn run_list(as_json: bool, service: &TaskService) -> Result<(), CliError> {
    let tasks = service.list_tasks().await?;

    if as_json {
        let json_items = tasks
            .iter()
            .map(task_to_list_item)
            .collect::<Vec<TaskListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if tasks.is_empty() {
        println!("No tasks yet. Add one with `tasksync add <title>`.");
    } else {
        for line in format_task_lines(&tasks) {
            println!("{line}");
        }
    }

    Ok(())
}
