//! project-versioner - Main entry point
//!
//! Local project snapshots with an optional SFTP replica.

mod commands;
mod config;
mod db;
mod error;
mod models;
mod progress;
mod prompt;

use crate::commands::remote::RemoteSetupArgs;
use crate::commands::snapshot::SnapshotArgs;
use crate::commands::Context;
use crate::config::AppConfig;
use crate::error::is_cancellation;
use crate::models::settings::SettingsStore;
use crate::progress::ConsoleProgress;
use crate::prompt::ConsolePrompter;
use anyhow::Context as _;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Workspace root (defaults to the current directory)
    #[arg(short = 'C', long, global = true, value_name = "DIR")]
    workspace: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Take a snapshot of the workspace
    Snapshot {
        /// Snapshot the whole project
        #[arg(long, conflicts_with = "folders")]
        full: bool,

        /// Snapshot only these top-level folders
        #[arg(long, value_delimiter = ',')]
        folders: Vec<String>,

        /// Description stored with the version
        #[arg(short, long)]
        message: Option<String>,
    },

    /// List local versions, newest first
    List,

    /// Restore a version over the workspace
    Restore {
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Copy the version store into the backup folder
    Mirror,

    /// Interactive first-time setup
    Setup,

    /// Read or change host-wide settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Remote server replication
    Remote {
        #[command(subcommand)]
        action: RemoteAction,
    },

    /// Restore the newest remote version into an empty workspace
    AutoRestore {
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    Get { key: String },
    Set { key: String, value: String },
    /// Remove a stored setting
    Unset { key: String },
    List,
}

#[derive(Subcommand, Debug)]
enum RemoteAction {
    /// Configure the server for this project
    Setup {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
        #[arg(short, long)]
        user: Option<String>,
        #[arg(long, conflicts_with = "key_file")]
        password: Option<String>,
        /// Private key file; its contents are stored in the project file
        #[arg(long, value_name = "FILE")]
        key_file: Option<PathBuf>,
        #[arg(long)]
        remote_path: Option<String>,
    },
    /// Check that the server answers
    Test,
    /// Upload every local version
    Push,
    /// Download every remote version
    Pull,
    /// List versions on the server
    List,
    /// Download one version into the local catalog
    PullVersion { id: String },
}

impl Command {
    /// Label used in `<operation> failed: <cause>` messages.
    fn operation(&self) -> &'static str {
        match self {
            Command::Snapshot { .. } => "Snapshot",
            Command::List => "Listing versions",
            Command::Restore { .. } => "Restore",
            Command::Mirror => "Mirror",
            Command::Setup => "Setup",
            Command::Config { .. } => "Configuration",
            Command::Remote { action } => match action {
                RemoteAction::Setup { .. } => "Remote setup",
                RemoteAction::Test => "Connection test",
                RemoteAction::Push => "Upload",
                RemoteAction::Pull => "Download",
                RemoteAction::List => "Listing remote versions",
                RemoteAction::PullVersion { .. } => "Download",
            },
            Command::AutoRestore { .. } => "Automatic restore",
        }
    }
}

fn dispatch(mut ctx: Context, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Snapshot { full, folders, message } => {
            commands::snapshot::run(&mut ctx, &SnapshotArgs { full, folders, message })?;
        }
        Command::List => {
            commands::versions::list(&ctx)?;
        }
        Command::Restore { id, yes } => {
            commands::versions::restore(&mut ctx, &id, yes)?;
        }
        Command::Mirror => {
            commands::mirror::run(&mut ctx)?;
        }
        Command::Setup => {
            commands::setup::run(&mut ctx)?;
        }
        Command::Config { action } => match action {
            ConfigAction::Get { key } => {
                commands::config::get(&ctx, &key)?;
            }
            ConfigAction::Set { key, value } => commands::config::set(&ctx, &key, &value)?,
            ConfigAction::Unset { key } => {
                commands::config::unset(&ctx, &key)?;
            }
            ConfigAction::List => {
                commands::config::list(&ctx)?;
            }
        },
        Command::Remote { action } => match action {
            RemoteAction::Setup {
                host,
                port,
                user,
                password,
                key_file,
                remote_path,
            } => {
                let args = RemoteSetupArgs {
                    host,
                    port,
                    username: user,
                    password,
                    key_file,
                    remote_path,
                };
                commands::remote::setup(&mut ctx, &args)?;
            }
            other => remote_operation(&ctx, other)?,
        },
        Command::AutoRestore { yes } => {
            commands::auto_restore::run(&mut ctx, yes)?;
        }
    }
    Ok(())
}

/// Remote actions that need a configured server.
fn remote_operation(ctx: &Context, action: RemoteAction) -> anyhow::Result<()> {
    let client = ctx.remote_client(&ctx.config())?;
    match action {
        RemoteAction::Test => {
            commands::remote::check_connection(&client)?;
        }
        RemoteAction::Push => {
            commands::remote::push(ctx, &client)?;
        }
        RemoteAction::Pull => {
            commands::remote::pull(ctx, &client)?;
        }
        RemoteAction::List => {
            commands::remote::list(ctx, &client)?;
        }
        RemoteAction::PullVersion { id } => {
            commands::remote::pull_version(ctx, &client, &id)?;
        }
        RemoteAction::Setup { .. } => unreachable!("handled by dispatch"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let app_config = AppConfig::from_env();

    let log_level = args.log_level.as_deref().unwrap_or(&app_config.log_level);
    versioner_core::utils::logger::init(log_level)?;

    let workspace_root = match args.workspace {
        Some(path) => path,
        None => std::env::current_dir().context("Cannot determine the current directory")?,
    };
    tracing::debug!(workspace = %workspace_root.display(), "Resolved workspace");

    tracing::debug!(data_dir = %app_config.data_dir.display(), "Using data directory");
    let settings = SettingsStore::open(&app_config.db_path)
        .with_context(|| format!("Cannot open settings at {}", app_config.db_path.display()))?;

    let ctx = Context {
        workspace_root,
        settings,
        prompter: Box::new(ConsolePrompter::stdio()),
        progress: Arc::new(ConsoleProgress::new()),
    };

    let operation = args.command.operation();
    let command = args.command;

    // Engines do blocking file and SSH I/O
    let result = tokio::task::spawn_blocking(move || dispatch(ctx, command))
        .await
        .context("Worker thread panicked")?
        .with_context(|| format!("{operation} failed"));

    match result {
        Ok(()) => Ok(()),
        Err(e) if is_cancellation(&e) => {
            println!("{}", e.root_cause());
            Ok(())
        }
        Err(e) => {
            eprintln!("{e:#}");
            std::process::exit(1);
        }
    }
}
