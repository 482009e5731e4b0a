//! preview CLI
//!
//! One command from a local server to a public URL:
//! - start (default): launch the server and tunnel, print the URL
//! - stop: tear both down and remove the recorded state
//! - status: show what the markers and records say

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use preview::commands::{self, StartOverrides};
use pv_core::config::ServerMode;

#[derive(Parser)]
#[command(name = "preview")]
#[command(author, version, about = "Preview environment orchestrator")]
#[command(propagate_version = true)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,

    /// Options for `start` when no subcommand is given
    #[command(flatten)]
    start: StartArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server and tunnel and print the public URL (default)
    Start(StartArgs),

    /// Stop the server and tunnel and remove recorded state
    Stop {
        #[command(flatten)]
        project: ProjectArgs,
        /// Keep the server and tunnel logs
        #[arg(long)]
        keep_logs: bool,
    },

    /// Show recorded processes and preview URLs
    Status {
        #[command(flatten)]
        project: ProjectArgs,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage configuration
    Config {
        #[command(flatten)]
        project: ProjectArgs,
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args, Clone, Default)]
struct ProjectArgs {
    /// Project root (defaults to the current directory)
    #[arg(long, env = "PREVIEW_PROJECT_DIR")]
    project_dir: Option<PathBuf>,
}

#[derive(Args, Clone, Default)]
struct StartArgs {
    #[command(flatten)]
    project: ProjectArgs,

    /// Preferred server port (overrides config)
    #[arg(short, long, env = "PREVIEW_PORT")]
    port: Option<u16>,

    /// Server mode: production or development (overrides config)
    #[arg(short, long, env = "PREVIEW_MODE")]
    mode: Option<ServerMode>,
}

impl From<StartArgs> for StartOverrides {
    fn from(args: StartArgs) -> Self {
        Self {
            project_dir: args.project.project_dir,
            port: args.port,
            mode: args.mode,
        }
    }
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Get a value of the effective configuration (e.g. server.port)
    Get { key: String },
    /// Show config file path
    Path,
    /// Write a default preview.toml
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config_path = cli.config.as_deref();

    match cli.command.unwrap_or(Commands::Start(cli.start)) {
        Commands::Start(args) => {
            commands::start_command(config_path, args.into()).await?;
        }

        Commands::Stop { project, keep_logs } => {
            commands::stop_command(config_path, project.project_dir.as_deref(), keep_logs).await?;
        }

        Commands::Status { project, json } => {
            commands::status_command(config_path, project.project_dir.as_deref(), json)?;
        }

        Commands::Config { project, action } => {
            let root = commands::project_root(project.project_dir.as_deref())?;
            match action {
                ConfigAction::Show => commands::config_show(config_path, &root)?,
                ConfigAction::Get { key } => commands::config_get(config_path, &root, &key)?,
                ConfigAction::Path => commands::config_path(config_path, &root)?,
                ConfigAction::Init { force } => commands::config_init(config_path, &root, force)?,
            }
        }
    }

    Ok(())
}
