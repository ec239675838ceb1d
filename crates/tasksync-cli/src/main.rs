//! tasksync CLI - local task tracking with batched remote sync
//!
//! Every change is stored locally first and queued; `tasksync sync` pushes
//! the queue to the remote API.

mod cli;
mod commands;
mod error;


use clap::Parser;
use tasksync_core::SyncSettings;

use crate::cli::{Cli, Commands};
use crate::commands::add::run_add;
use crate::commands::common::{open_service, resolve_db_path};
use crate::commands::delete::run_delete;
use crate::commands::done::run_done;
use crate::commands::edit::{run_edit, EditArgs};
use crate::commands::list::run_list;
use crate::commands::show::run_show;
use crate::commands::status::run_status;
use crate::commands::sync::run_sync;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(error.exit_code());
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let directive = "tasksync=info"
        .parse()
        .map_err(|error| CliError::Config(format!("invalid log directive: {error}")))?;
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(directive))
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);
    let settings = SyncSettings::from_env()?;
    let service = open_service(&db_path, &settings).await?;

    match cli.command {
        Commands::Add { title, description } => {
            run_add(&title, description.as_deref(), &service).await?;
        }
        Commands::List { json } => run_list(json, &service).await?,
        Commands::Show { id } => run_show(&id, &service).await?,
        Commands::Edit {
            id,
            title,
            description,
            completed,
        } => {
            let args = EditArgs {
                title,
                description,
                completed,
            };
            run_edit(&id, args, &service).await?;
        }
        Commands::Done { id } => run_done(&id, &service).await?,
        Commands::Delete { id } => run_delete(&id, &service).await?,
        Commands::Sync { json } => run_sync(json, &service).await?,
        Commands::Status { json } => run_status(json, &service).await?,
    }

    Ok(())
}
