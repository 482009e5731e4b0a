//! Core error types for the preview orchestrator

use std::path::PathBuf;
use thiserror::Error;

use crate::types::ProcessRole;

/// Top-level error type for a preview run
///
/// Every variant that involves a supervised process names its role and,
/// where one exists, the log file to inspect.
#[derive(Error, Debug)]
pub enum PreviewError {
    /// Invoked outside of (or against the wrong) project root
    #[error("Wrong project identity at {root}: {reason}")]
    WrongProjectIdentity { root: PathBuf, reason: String },

    /// A required external binary is not installed
    #[error("Required binary '{binary}' not found. {hint}")]
    DependencyMissing { binary: String, hint: String },

    /// No free port between the preferred port and the top of the range
    #[error("No free port found at or above {start}")]
    PortExhaustion { start: u16 },

    /// A spawned process is running in some other project's directory
    #[error(
        "The {role} process (PID {pid}) is running in {actual:?}, expected {expected:?}; it was killed"
    )]
    WrongDirectorySpawn {
        role: ProcessRole,
        pid: u32,
        expected: PathBuf,
        actual: PathBuf,
    },

    /// A recorded process is alive but cannot be confirmed as ours, so it
    /// was neither stopped nor replaced
    #[error(
        "The previous {role} process (PID {pid}) is still running but its working directory cannot be read; stop it by hand and remove its marker"
    )]
    Unverified { role: ProcessRole, pid: u32 },

    /// A bounded poll ran out of attempts
    #[error("Timed out waiting for {stage} after {attempts} attempts (last seen: {last})")]
    Timeout {
        stage: String,
        attempts: u32,
        last: String,
    },

    /// A supervised process exited before it became ready
    #[error("The {role} process (PID {pid}) exited early; see {log:?}")]
    ProcessExited {
        role: ProcessRole,
        pid: u32,
        log: PathBuf,
    },

    /// The OS refused to start a process
    #[error("Failed to spawn the {role} process: {source}")]
    Spawn {
        role: ProcessRole,
        #[source]
        source: std::io::Error,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PreviewError {
    /// Short name of the run stage this error belongs to
    pub fn stage(&self) -> &'static str {
        match self {
            Self::WrongProjectIdentity { .. } => "identity check",
            Self::DependencyMissing { .. } => "dependency check",
            Self::PortExhaustion { .. } => "port resolution",
            Self::WrongDirectorySpawn { role, .. }
            | Self::ProcessExited { role, .. }
            | Self::Unverified { role, .. }
            | Self::Spawn { role, .. } => match role {
                ProcessRole::Server => "server launch",
                ProcessRole::Tunnel => "tunnel launch",
            },
            Self::Timeout { .. } => "readiness",
            Self::Config(_) => "configuration",
            Self::Http(_) | Self::Io(_) => "io",
        }
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Convenience alias used across the workspace
pub type Result<T, E = PreviewError> = std::result::Result<T, E>;
