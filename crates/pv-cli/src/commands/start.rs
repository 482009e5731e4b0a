//! Start command implementation

use std::path::{Path, PathBuf};

use anyhow::Result;

use pv_core::config::ServerMode;
use pv_core::{PreviewError, ProcessRole, StateRecorder};
use pv_orchestrator::Orchestrator;

use super::{load_config, project_root};
use crate::output::{format_summary, print_error, print_info, print_success};

/// Command-line values that take precedence over the config file
#[derive(Debug, Clone, Default)]
pub struct StartOverrides {
    pub project_dir: Option<PathBuf>,
    pub port: Option<u16>,
    pub mode: Option<ServerMode>,
}

/// Execute the start command
pub async fn start_command(config_path: Option<&Path>, overrides: StartOverrides) -> Result<()> {
    let root = project_root(overrides.project_dir.as_deref())?;
    let mut config = load_config(config_path, &root)?;
    if let Some(port) = overrides.port {
        config.server.port = port;
    }
    if let Some(mode) = overrides.mode {
        config.server.mode = mode;
    }
    tracing::debug!("Effective start overrides: {:?}", overrides);

    let orchestrator = Orchestrator::new(config, &root)?;
    print_info(&format!(
        "Starting preview for {} ({} mode, preferred port {})",
        orchestrator.root().display(),
        orchestrator.config().server.mode,
        orchestrator.config().server.port
    ));

    match orchestrator.start().await {
        Ok(summary) => {
            print_success("Preview environment is up");
            print!("{}", format_summary(&summary));
            Ok(())
        }
        Err(e) => {
            print_error(&format!("Start failed during {}: {}", e.stage(), e));
            if let Some(log) = log_for(&e, orchestrator.state()) {
                print_info(&format!("Check the log at {}", log.display()));
            }
            print_info("Run 'preview stop' to clean up anything that was started");
            Err(e.into())
        }
    }
}

/// The log most likely to explain `err`
fn log_for(err: &PreviewError, state: &StateRecorder) -> Option<PathBuf> {
    let role = match err {
        PreviewError::ProcessExited { log, .. } => return Some(log.clone()),
        PreviewError::WrongDirectorySpawn { role, .. } | PreviewError::Spawn { role, .. } => *role,
        PreviewError::Timeout { stage, .. } if stage == "server health" => ProcessRole::Server,
        PreviewError::Timeout { .. } => ProcessRole::Tunnel,
        _ => return None,
    };
    Some(state.log_path(role))
}
