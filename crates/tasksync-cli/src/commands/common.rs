use std::env;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use tasksync_core::{SyncReport, SyncSettings, SyncStatusReport, Task, TaskId, TaskService};

use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct TaskListItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub completed: bool,
    pub sync_status: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub relative_time: String,
}

pub async fn open_service(
    db_path: &Path,
    settings: &SyncSettings,
) -> Result<TaskService, CliError> {
    Ok(TaskService::open_path(db_path.to_path_buf(), settings).await?)
}

pub async fn resolve_task(task_query: &str, service: &TaskService) -> Result<Task, CliError> {
    if let Ok(task_id) = task_query.parse::<TaskId>() {
        if let Some(task) = service.get_task(&task_id).await? {
            return Ok(task);
        }
    }

    let matching_ids = service.resolve_id_prefix(task_query, 3).await?;

    match matching_ids.len() {
        0 => Err(CliError::TaskNotFound(task_query.to_string())),
        1 => {
            let resolved_id = matching_ids[0]
                .parse::<TaskId>()
                .map_err(|_| CliError::TaskNotFound(task_query.to_string()))?;
            service
                .get_task(&resolved_id)
                .await?
                .ok_or_else(|| CliError::TaskNotFound(task_query.to_string()))
        }
        _ => {
            let options = matching_ids
                .iter()
                .map(|id| short_id(id))
                .collect::<Vec<_>>()
                .join(", ");

            Err(CliError::AmbiguousTaskId(format!(
                "ID prefix '{task_query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

pub fn short_id(id: &str) -> String {
    id.chars().take(13).collect()
}

pub fn format_task_lines(tasks: &[Task]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    tasks
        .iter()
        .map(|task| {
            let short_id = short_id(&task.id.to_string());
            let check = if task.completed { "[x]" } else { "[ ]" };
            let title = title_preview(&task.title, 40);
            let relative_time = format_relative_time(task.updated_at, now_ms);

            if task.sync_status.needs_sync() {
                format!(
                    "{short_id:<13}  {check} {title:<40}  {relative_time:<10}  ({})",
                    task.sync_status
                )
            } else {
                format!("{short_id:<13}  {check} {title:<40}  {relative_time}")
            }
        })
        .collect()
}

pub fn task_to_list_item(task: &Task) -> TaskListItem {
    let now_ms = Utc::now().timestamp_millis();

    TaskListItem {
        id: task.id.to_string(),
        title: task.title.clone(),
        description: task.description.clone(),
        completed: task.completed,
        sync_status: task.sync_status.to_string(),
        created_at: task.created_at,
        updated_at: task.updated_at,
        relative_time: format_relative_time(task.updated_at, now_ms),
    }
}

pub fn format_task_detail(task: &Task) -> Vec<String> {
    let mut lines = vec![
        format!("id:          {}", task.id),
        format!("title:       {}", task.title),
        format!("completed:   {}", if task.completed { "yes" } else { "no" }),
        format!("created:     {}", format_sync_timestamp(task.created_at)),
        format!("updated:     {}", format_sync_timestamp(task.updated_at)),
        format!("sync status: {}", task.sync_status),
    ];
    if let Some(server_id) = &task.server_id {
        lines.push(format!("server id:   {server_id}"));
    }
    if let Some(synced_at) = task.last_synced_at {
        lines.push(format!("last synced: {}", format_sync_timestamp(synced_at)));
    }
    if !task.description.is_empty() {
        lines.push(String::new());
        lines.extend(task.description.lines().map(str::to_string));
    }
    lines
}

pub fn format_sync_report_lines(report: &SyncReport) -> Vec<String> {
    if report.synced_items == 0 && report.failed_items == 0 {
        return vec!["Nothing to sync.".to_string()];
    }

    let mut lines = vec![format!(
        "Synced {} item(s), {} failed",
        report.synced_items, report.failed_items
    )];
    lines.extend(report.errors.iter().map(|item| {
        format!(
            "  {}  {}",
            short_id(&item.task_id.to_string()),
            item.error
        )
    }));
    lines
}

pub fn format_status_lines(status: &SyncStatusReport) -> Vec<String> {
    let last_synced = status
        .last_synced_at
        .map_or_else(|| "never".to_string(), format_sync_timestamp);

    vec![
        format!("pending:     {}", status.pending_count),
        format!("last synced: {last_synced}"),
        format!(
            "remote:      {}",
            if status.online { "online" } else { "offline" }
        ),
    ]
}

pub fn title_preview(title: &str, max_chars: usize) -> String {
    let collapsed = title.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_sync_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

pub fn resolve_task_title(title_parts: &[String]) -> Result<String, CliError> {
    normalize_text(&title_parts.join(" ")).ok_or(CliError::EmptyTitle)
}

pub fn normalize_text(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn normalize_task_identifier(id: &str) -> Result<String, CliError> {
    normalize_text(id).ok_or(CliError::EmptyTaskId)
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("TASKSYNC_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tasksync")
        .join("tasksync.db")
}
