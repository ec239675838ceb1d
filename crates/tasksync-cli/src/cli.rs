use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tasksync")]
#[command(about = "Track tasks locally and sync them to a remote API")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new task
    #[command(alias = "new")]
    Add {
        /// Task title
        title: Vec<String>,
        /// Optional longer description
        #[arg(short, long)]
        description: Option<String>,
    },
    /// List tasks
    #[command(alias = "ls")]
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one task with its sync state
    Show {
        /// Task ID or unique ID prefix
        id: String,
    },
    /// Edit an existing task
    Edit {
        /// Task ID or unique ID prefix
        id: String,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New description
        #[arg(long)]
        description: Option<String>,
        /// Set the completion flag
        #[arg(long, value_name = "BOOL")]
        completed: Option<bool>,
    },
    /// Mark a task completed
    Done {
        /// Task ID or unique ID prefix
        id: String,
    },
    /// Delete an existing task
    #[command(alias = "rm")]
    Delete {
        /// Task ID or unique ID prefix
        id: String,
    },
    /// Push queued changes to the remote API
    Sync {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show queue depth, last sync time and connectivity
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
