use tasksync_core::TaskService;

use crate::commands::common::format_status_lines;
use crate::error::CliError;

pub async fn run_status(as_json: bool, service: &TaskService) -> Result<(), CliError> {
    let status = service.sync_status().await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    for line in format_status_lines(&status) {
        println!("{line}");
    }
    Ok(())
}
