//! Core types for the preview orchestrator

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Which of the two supervised processes a handle refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessRole {
    /// The local application server
    Server,
    /// The public tunnel client
    Tunnel,
}

impl ProcessRole {
    /// Both roles, in teardown order (tunnel first so the public URL dies
    /// before its backend)
    pub const ALL: [ProcessRole; 2] = [ProcessRole::Tunnel, ProcessRole::Server];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessRole::Server => "server",
            ProcessRole::Tunnel => "tunnel",
        }
    }
}

impl fmt::Display for ProcessRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detached process this orchestrator started or adopted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedProcess {
    pub role: ProcessRole,
    pub pid: u32,
    /// Unix timestamp in milliseconds
    pub started_at: u64,
    pub log_path: PathBuf,
    /// Project root the process must be running in
    pub owner_directory: PathBuf,
}

impl ManagedProcess {
    pub fn new(role: ProcessRole, pid: u32, log_path: PathBuf, owner_directory: PathBuf) -> Self {
        Self {
            role,
            pid,
            started_at: crate::time::current_time_millis(),
            log_path,
            owner_directory,
        }
    }
}

/// A listening port and the process bound to it, if known
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortBinding {
    pub port: u16,
    pub bound_by: Option<u32>,
}

/// Outcome of port resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortResolution {
    /// Nothing listens here; a server must be spawned
    Free(u16),
    /// A healthy server from this project already listens here
    Existing(PortBinding),
}

impl PortResolution {
    pub fn port(&self) -> u16 {
        match self {
            PortResolution::Free(port) => *port,
            PortResolution::Existing(binding) => binding.port,
        }
    }

    pub fn is_existing(&self) -> bool {
        matches!(self, PortResolution::Existing(_))
    }
}

/// The public URL recorded for one project identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewRecord {
    pub school_name: String,
    pub url: String,
    /// Unix timestamp in milliseconds
    pub created_at: u64,
}

/// Result of checking whether a PID belongs to this project
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ownership {
    /// Alive and running in the expected directory
    Owned,
    /// Alive but running somewhere else
    Foreign(PathBuf),
    /// No such process
    Dead,
    /// Alive but its working directory could not be read
    Unknown,
}

impl Ownership {
    pub fn describe(&self, expected: &Path) -> String {
        match self {
            Ownership::Owned => format!("running in {}", expected.display()),
            Ownership::Foreign(actual) => format!("running in {}", actual.display()),
            Ownership::Dead => "not running".to_string(),
            Ownership::Unknown => "running, directory unknown".to_string(),
        }
    }
}
