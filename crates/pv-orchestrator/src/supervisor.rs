//! Process supervision
//!
//! Server and tunnel are spawned detached, in their own process group, with
//! output redirected to their log files. They are never waited on: the PID
//! marker written right after spawn is the only handle that survives this
//! process, so teardown and later runs re-acquire control through it.

use std::process::{Command, Stdio};
use std::time::Duration;

use pv_core::config::{ServerConfig, TunnelConfig};
use pv_core::process::{is_process_alive, ownership, send_signal, Signal};
use pv_core::{ManagedProcess, Ownership, PreviewError, ProcessRole, Result, StateRecorder};

/// How often a stopping process is checked for exit
const EXIT_CHECK_INTERVAL: Duration = Duration::from_millis(100);

/// Wait after SIGKILL before giving up on a process
const KILL_WAIT: Duration = Duration::from_millis(500);

/// What happened to one role during teardown
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    /// No marker file
    NotRecorded,
    /// Marker named a process that had already exited
    Stale { pid: u32 },
    /// Exited after SIGTERM
    Stopped { pid: u32 },
    /// Needed SIGKILL
    Killed { pid: u32 },
    /// PID is alive but not in this project; left running
    Foreign { pid: u32, detail: String },
    /// Alive but its working directory could not be read; left running
    /// and its marker kept
    Unverified { pid: u32 },
    /// Signaling failed or the process survived SIGKILL
    Failed { pid: u32, reason: String },
}

impl StopOutcome {
    pub fn pid(&self) -> Option<u32> {
        match self {
            StopOutcome::NotRecorded => None,
            StopOutcome::Stale { pid }
            | StopOutcome::Stopped { pid }
            | StopOutcome::Killed { pid }
            | StopOutcome::Foreign { pid, .. }
            | StopOutcome::Unverified { pid }
            | StopOutcome::Failed { pid, .. } => Some(*pid),
        }
    }
}

/// Starts, verifies and stops the supervised processes of one project
#[derive(Debug, Clone)]
pub struct Supervisor {
    state: StateRecorder,
}

impl Supervisor {
    pub fn new(state: StateRecorder) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &StateRecorder {
        &self.state
    }

    /// Launch the application server on `port`
    ///
    /// Port, host and mode reach the server through its environment.
    pub fn spawn_server(&self, config: &ServerConfig, port: u16) -> Result<ManagedProcess> {
        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args)
            .envs(&config.env)
            .env(&config.port_env, port.to_string())
            .env(&config.host_env, &config.host)
            .env(&config.mode_env, config.mode.as_str());

        tracing::info!(
            "Starting server: {} {} ({}={}, {}={})",
            config.command,
            config.args.join(" "),
            config.port_env,
            port,
            config.mode_env,
            config.mode
        );
        self.launch(ProcessRole::Server, cmd)
    }

    /// Launch the tunnel client pointed at the local server on `port`
    ///
    /// A tunnel still recorded from an earlier run is stopped first, so the
    /// project never has two public URLs at once.
    pub async fn spawn_tunnel(&self, config: &TunnelConfig, port: u16) -> Result<ManagedProcess> {
        self.clear_role(ProcessRole::Tunnel, config.stop_grace).await?;

        let args = config.render_args(port);
        let mut cmd = Command::new(&config.binary);
        cmd.args(&args);

        tracing::info!("Starting tunnel: {} {}", config.binary, args.join(" "));
        self.launch(ProcessRole::Tunnel, cmd)
    }

    /// Record an already running server found on the resolved port
    pub fn adopt(&self, role: ProcessRole, pid: u32) -> Result<ManagedProcess> {
        self.state.write_marker(role, pid)?;
        tracing::info!("Adopted running {} (pid={})", role, pid);
        Ok(ManagedProcess::new(
            role,
            pid,
            self.state.log_path(role),
            self.state.root().to_path_buf(),
        ))
    }

    fn launch(&self, role: ProcessRole, mut cmd: Command) -> Result<ManagedProcess> {
        let log = self.state.create_log(role)?;
        let log_err = log.try_clone()?;

        cmd.current_dir(self.state.root())
            .stdin(Stdio::null())
            .stdout(log)
            .stderr(log_err);
        detach(&mut cmd);

        let child = cmd
            .spawn()
            .map_err(|source| PreviewError::Spawn { role, source })?;
        let pid = child.id();
        // Not waited on; the child outlives the orchestrator
        drop(child);

        self.state.write_marker(role, pid)?;
        tracing::info!("Spawned {} (pid={})", role, pid);

        Ok(ManagedProcess::new(
            role,
            pid,
            self.state.log_path(role),
            self.state.root().to_path_buf(),
        ))
    }

    /// Confirm a freshly spawned process runs in the project root
    ///
    /// Waits `grace` first so the process has settled. A process running
    /// elsewhere is killed and its marker removed; one that already exited
    /// has its marker removed.
    pub async fn verify_ownership(&self, process: &ManagedProcess, grace: Duration) -> Result<()> {
        tokio::time::sleep(grace).await;

        match ownership(process.pid, &process.owner_directory) {
            Ownership::Owned => {
                tracing::debug!("{} (pid={}) verified", process.role, process.pid);
                Ok(())
            }
            Ownership::Unknown => {
                tracing::warn!(
                    "Cannot read the working directory of {} (pid={}); trusting the spawn",
                    process.role,
                    process.pid
                );
                Ok(())
            }
            Ownership::Foreign(actual) => {
                if let Err(e) = send_signal(process.pid, Signal::Kill) {
                    tracing::warn!("Failed to kill {} (pid={}): {}", process.role, process.pid, e);
                }
                self.forget(process.role);
                Err(PreviewError::WrongDirectorySpawn {
                    role: process.role,
                    pid: process.pid,
                    expected: process.owner_directory.clone(),
                    actual,
                })
            }
            Ownership::Dead => {
                self.forget(process.role);
                Err(PreviewError::ProcessExited {
                    role: process.role,
                    pid: process.pid,
                    log: process.log_path.clone(),
                })
            }
        }
    }

    /// Stop whatever the marker for `role` names, then remove the marker
    ///
    /// Never fails: every problem is folded into the returned outcome. The
    /// marker of an [`StopOutcome::Unverified`] process is kept, since it is
    /// the only handle left on that process.
    pub async fn stop_role(&self, role: ProcessRole, grace: Duration) -> StopOutcome {
        let Some(pid) = self.state.read_marker(role) else {
            self.forget(role);
            return StopOutcome::NotRecorded;
        };
        self.settle(role, pid, ownership(pid, self.state.root()), grace).await
    }

    /// Stop the recorded `role` so a replacement can be started
    ///
    /// Fails when the recorded process is still alive and could not be
    /// stopped, which would leave two of them running.
    pub async fn clear_role(&self, role: ProcessRole, grace: Duration) -> Result<()> {
        let outcome = self.stop_role(role, grace).await;
        if outcome != StopOutcome::NotRecorded {
            tracing::info!("Cleared previous {}: {:?}", role, outcome);
        }
        replaceable(role, outcome)
    }

    async fn settle(
        &self,
        role: ProcessRole,
        pid: u32,
        ownership: Ownership,
        grace: Duration,
    ) -> StopOutcome {
        let outcome = match ownership {
            Ownership::Dead => StopOutcome::Stale { pid },
            Ownership::Foreign(actual) => StopOutcome::Foreign {
                pid,
                detail: format!("running in {}", actual.display()),
            },
            Ownership::Unknown => StopOutcome::Unverified { pid },
            Ownership::Owned => terminate(pid, grace).await,
        };

        match &outcome {
            StopOutcome::Foreign { pid, detail } => tracing::warn!(
                "Not stopping {} pid {}: {} (PID was likely reused)",
                role,
                pid,
                detail
            ),
            StopOutcome::Unverified { pid } => tracing::warn!(
                "Not stopping {} pid {}: working directory could not be read; keeping its marker",
                role,
                pid
            ),
            StopOutcome::Failed { pid, reason } => {
                tracing::warn!("Failed to stop {} pid {}: {}", role, pid, reason)
            }
            other => tracing::info!("{}: {:?}", role, other),
        }

        if !matches!(outcome, StopOutcome::Unverified { .. }) {
            self.forget(role);
        }
        outcome
    }

    /// Stop both roles, tunnel first
    pub async fn stop_all(
        &self,
        server_grace: Duration,
        tunnel_grace: Duration,
    ) -> Vec<(ProcessRole, StopOutcome)> {
        let mut outcomes = Vec::with_capacity(ProcessRole::ALL.len());
        for role in ProcessRole::ALL {
            let grace = match role {
                ProcessRole::Server => server_grace,
                ProcessRole::Tunnel => tunnel_grace,
            };
            outcomes.push((role, self.stop_role(role, grace).await));
        }
        outcomes
    }

    fn forget(&self, role: ProcessRole) {
        if let Err(e) = self.state.remove_marker(role) {
            tracing::warn!("Failed to remove {} marker: {}", role, e);
        }
    }
}

/// Whether a new `role` process may start after `outcome`
fn replaceable(role: ProcessRole, outcome: StopOutcome) -> Result<()> {
    match outcome {
        StopOutcome::Unverified { pid } => Err(PreviewError::Unverified { role, pid }),
        _ => Ok(()),
    }
}

/// SIGTERM, wait up to `grace`, then SIGKILL
async fn terminate(pid: u32, grace: Duration) -> StopOutcome {
    if let Err(e) = send_signal(pid, Signal::Terminate) {
        if !is_process_alive(pid) {
            return StopOutcome::Stale { pid };
        }
        return StopOutcome::Failed {
            pid,
            reason: e.to_string(),
        };
    }

    if wait_for_exit(pid, grace).await {
        return StopOutcome::Stopped { pid };
    }

    tracing::debug!("pid {} ignored SIGTERM for {:?}, sending SIGKILL", pid, grace);
    if let Err(e) = send_signal(pid, Signal::Kill) {
        if !is_process_alive(pid) {
            return StopOutcome::Stopped { pid };
        }
        return StopOutcome::Failed {
            pid,
            reason: e.to_string(),
        };
    }

    if wait_for_exit(pid, KILL_WAIT).await {
        StopOutcome::Killed { pid }
    } else {
        StopOutcome::Failed {
            pid,
            reason: "still running after SIGKILL".to_string(),
        }
    }
}

/// Whether `pid` exits within `timeout`
async fn wait_for_exit(pid: u32, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if !is_process_alive(pid) {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(EXIT_CHECK_INTERVAL).await;
    }
}

/// Put the child in its own process group so it survives our exit and can
/// be signaled as a group
#[cfg(unix)]
fn detach(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    cmd.process_group(0);
}

#[cfg(not(unix))]
fn detach(_cmd: &mut Command) {}
