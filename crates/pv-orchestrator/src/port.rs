//! Port resolution
//!
//! A bound port is only reused when the listener both answers the health
//! contract and runs in this project's directory. Anything else holding the
//! port is left alone and the search moves upward.

use std::net::{Ipv4Addr, SocketAddr, TcpListener, TcpStream};
use std::path::Path;
use std::time::Duration;

use pv_core::process::{listening_pid, ownership};
use pv_core::{Ownership, PortBinding, PortResolution, PreviewError, Result};

use crate::health::HealthChecker;

/// How long the loopback probe waits for a connection
const CONNECT_PROBE_TIMEOUT: Duration = Duration::from_millis(200);

/// Whether nothing is listening on `port`
///
/// The port must be bindable on `host` and refuse a loopback connection.
/// The second check catches listeners bound to a narrower address than
/// `host` on platforms that let the wildcard bind succeed anyway.
pub fn is_port_free(host: &str, port: u16) -> bool {
    if TcpListener::bind((host, port)).is_err() {
        return false;
    }
    let loopback = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
    TcpStream::connect_timeout(&loopback, CONNECT_PROBE_TIMEOUT).is_err()
}

/// First free port strictly above `after`
pub fn next_free_port(host: &str, after: u16) -> Result<u16> {
    let Some(first) = after.checked_add(1) else {
        return Err(PreviewError::PortExhaustion { start: after });
    };
    (first..=u16::MAX)
        .find(|port| is_port_free(host, *port))
        .ok_or(PreviewError::PortExhaustion { start: first })
}

/// Chooses the port the server will listen on
pub struct PortResolver<'a> {
    host: &'a str,
    health_path: &'a str,
    project_root: &'a Path,
    health: &'a HealthChecker,
}

impl<'a> PortResolver<'a> {
    pub fn new(
        host: &'a str,
        health_path: &'a str,
        project_root: &'a Path,
        health: &'a HealthChecker,
    ) -> Self {
        Self {
            host,
            health_path,
            project_root,
            health,
        }
    }

    /// Resolve `preferred` to a free port or to an adoptable running server
    pub async fn resolve(&self, preferred: u16) -> Result<PortResolution> {
        if is_port_free(self.host, preferred) {
            tracing::info!("Port {} is free", preferred);
            return Ok(PortResolution::Free(preferred));
        }

        if let Some(pid) = self.same_project_server(preferred).await {
            tracing::info!(
                "Port {} is already served by this project (pid={})",
                preferred,
                pid
            );
            return Ok(PortResolution::Existing(PortBinding {
                port: preferred,
                bound_by: Some(pid),
            }));
        }

        let port = next_free_port(self.host, preferred)?;
        tracing::info!(
            "Port {} is held by another process, using {} instead",
            preferred,
            port
        );
        Ok(PortResolution::Free(port))
    }

    /// PID of a healthy listener on `port` running in the project root
    async fn same_project_server(&self, port: u16) -> Option<u32> {
        let url = format!("http://127.0.0.1:{}{}", port, self.health_path);
        if !self.health.is_healthy(&url).await {
            tracing::debug!("Listener on port {} does not answer {}", port, url);
            return None;
        }

        let Some(pid) = listening_pid(port) else {
            tracing::debug!("Could not find the process listening on port {}", port);
            return None;
        };

        match ownership(pid, self.project_root) {
            Ownership::Owned => Some(pid),
            other => {
                tracing::info!(
                    "Healthy server on port {} (pid={}) is not ours: {}",
                    port,
                    pid,
                    other.describe(self.project_root)
                );
                None
            }
        }
    }
}
