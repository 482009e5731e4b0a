//! Start, stop and status flows
//!
//! The orchestrator runs one step at a time. Every step either succeeds or
//! aborts the run; nothing already started is rolled back on failure, since
//! the markers written so far are exactly what `stop` needs to clean up.

use std::path::{Path, PathBuf};

use serde::Serialize;

use pv_core::config::PreviewConfig;
use pv_core::process::ownership;
use pv_core::{
    ManagedProcess, Ownership, PortBinding, PortResolution, PreviewRecord, ProcessRole, Result,
    StateRecorder,
};

use crate::health::HealthChecker;
use crate::identity::{verify_project, ProjectIdentity};
use crate::logscan::poll_log_for_pattern;
use crate::port::PortResolver;
use crate::supervisor::{StopOutcome, Supervisor};
use crate::tunnel::{ensure_tunnel_installed, url_regex};

/// Everything a successful start produced
#[derive(Debug, Clone)]
pub struct StartSummary {
    pub identity: ProjectIdentity,
    pub port: u16,
    /// True when an already running server was adopted instead of spawned
    pub reused_server: bool,
    pub server: ManagedProcess,
    pub tunnel: ManagedProcess,
    pub url: String,
    pub record_path: PathBuf,
}

/// Result of a teardown; never an error
#[derive(Debug, Clone, Default)]
pub struct StopReport {
    pub outcomes: Vec<(ProcessRole, StopOutcome)>,
    pub records_removed: usize,
    pub logs_removed: bool,
    /// Cleanup steps that failed and were skipped
    pub warnings: Vec<String>,
}

impl StopReport {
    /// Whether teardown found nothing at all to clean up
    pub fn was_idle(&self) -> bool {
        self.records_removed == 0
            && self
                .outcomes
                .iter()
                .all(|(_, outcome)| *outcome == StopOutcome::NotRecorded)
    }
}

/// What a marker file says about one role
#[derive(Debug, Clone, Serialize)]
pub struct ProcessStatus {
    pub role: ProcessRole,
    pub pid: Option<u32>,
    #[serde(skip)]
    pub ownership: Option<Ownership>,
    pub state: &'static str,
    pub log_path: PathBuf,
}

/// Read-only view of the on-disk state
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub root: PathBuf,
    pub processes: Vec<ProcessStatus>,
    pub records: Vec<PreviewRecord>,
}

impl StatusReport {
    pub fn is_running(&self) -> bool {
        self.processes
            .iter()
            .all(|p| matches!(p.ownership, Some(Ownership::Owned)))
    }
}

/// Teardown options
#[derive(Debug, Clone, Copy)]
pub struct StopOptions {
    pub remove_logs: bool,
}

impl Default for StopOptions {
    fn default() -> Self {
        Self { remove_logs: true }
    }
}

/// Drives one project's preview environment
pub struct Orchestrator {
    config: PreviewConfig,
    root: PathBuf,
    supervisor: Supervisor,
    health: HealthChecker,
}

impl Orchestrator {
    /// Orchestrator for the project at `root`
    ///
    /// `root` is canonicalized when it exists; `stop` and `status` still work
    /// against a path that does not.
    pub fn new(config: PreviewConfig, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let root = std::fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
        let state = StateRecorder::new(root.clone(), config.state.clone());
        Ok(Self {
            health: HealthChecker::new()?,
            supervisor: Supervisor::new(state),
            config,
            root,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &PreviewConfig {
        &self.config
    }

    pub fn state(&self) -> &StateRecorder {
        self.supervisor.state()
    }

    /// Bring up server and tunnel and record the public URL
    pub async fn start(&self) -> Result<StartSummary> {
        let identity = verify_project(&self.root, &self.config.project)?;

        let tunnel_config = &self.config.tunnel;
        ensure_tunnel_installed(tunnel_config)?;
        let url_pattern = url_regex(tunnel_config)?;

        let server_config = &self.config.server;
        let resolution = PortResolver::new(
            &server_config.host,
            &server_config.health_path,
            &identity.root,
            &self.health,
        )
        .resolve(server_config.port)
        .await?;
        let port = resolution.port();

        let (server, reused_server) = match resolution {
            PortResolution::Existing(PortBinding {
                bound_by: Some(pid),
                ..
            }) => (self.supervisor.adopt(ProcessRole::Server, pid)?, true),
            // An existing server is only reported once its PID is known, so
            // anything else means spawning our own
            _ => {
                self.supervisor
                    .clear_role(ProcessRole::Server, server_config.stop_grace)
                    .await?;

                let server = self.supervisor.spawn_server(server_config, port)?;
                self.supervisor
                    .verify_ownership(&server, server_config.ownership_grace)
                    .await?;
                self.health
                    .wait_until_healthy(
                        &server_config.health_url(port),
                        server_config.health,
                        Some(&server),
                    )
                    .await?;
                tracing::info!("Server is healthy on port {}", port);
                (server, false)
            }
        };

        let tunnel = self.supervisor.spawn_tunnel(tunnel_config, port).await?;
        self.supervisor
            .verify_ownership(&tunnel, tunnel_config.ownership_grace)
            .await?;
        let url = poll_log_for_pattern(
            &tunnel.log_path,
            &url_pattern,
            tunnel_config.poll,
            Some(&tunnel),
        )
        .await?;
        tracing::info!("Tunnel is up at {}", url);

        let record_path = self
            .state()
            .write_preview_record(&identity.school_name, &url)?;

        Ok(StartSummary {
            identity,
            port,
            reused_server,
            server,
            tunnel,
            url,
            record_path,
        })
    }

    /// Tear everything down
    ///
    /// Safe to run any number of times, with or without a prior start.
    pub async fn stop(&self, options: StopOptions) -> StopReport {
        let mut report = StopReport {
            outcomes: self
                .supervisor
                .stop_all(self.config.server.stop_grace, self.config.tunnel.stop_grace)
                .await,
            ..Default::default()
        };

        match self.state().clear_preview_records() {
            Ok(count) => report.records_removed = count,
            Err(e) => {
                tracing::warn!("Failed to remove preview records: {}", e);
                report.warnings.push(format!("preview records: {}", e));
            }
        }

        if options.remove_logs {
            match self.state().remove_logs() {
                Ok(()) => report.logs_removed = true,
                Err(e) => {
                    tracing::warn!("Failed to remove logs: {}", e);
                    report.warnings.push(format!("logs: {}", e));
                }
            }
        }

        report
    }

    /// Inspect markers and records without touching anything
    pub fn status(&self) -> StatusReport {
        let processes = [ProcessRole::Server, ProcessRole::Tunnel]
            .into_iter()
            .map(|role| {
                let pid = self.state().read_marker(role);
                let ownership = pid.map(|pid| ownership(pid, &self.root));
                let state = match &ownership {
                    None => "not recorded",
                    Some(Ownership::Owned) => "running",
                    Some(Ownership::Dead) => "stale",
                    Some(Ownership::Foreign(_)) => "foreign",
                    Some(Ownership::Unknown) => "unverified",
                };
                ProcessStatus {
                    role,
                    pid,
                    ownership,
                    state,
                    log_path: self.state().log_path(role),
                }
            })
            .collect();

        let records = self.state().read_preview_records().unwrap_or_else(|e| {
            tracing::warn!("Failed to read preview records: {}", e);
            Vec::new()
        });

        StatusReport {
            root: self.root.clone(),
            processes,
            records,
        }
    }
}
