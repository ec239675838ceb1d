use tasksync_core::TaskService;

use crate::commands::common::format_sync_report_lines;
use crate::error::CliError;

pub async fn run_sync(as_json: bool, service: &TaskService) -> Result<(), CliError> {
    let report = service.sync().await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for line in format_sync_report_lines(&report) {
        println!("{line}");
    }
    Ok(())
}
