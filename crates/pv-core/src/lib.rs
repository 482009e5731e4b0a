//! pv-core: Core abstractions and configuration for the preview orchestrator
//!
//! This crate provides the shared types, error taxonomy, configuration,
//! process inspection and on-disk state used by the orchestrator and CLI.

pub mod config;
pub mod error;
pub mod process;
pub mod state;
pub mod time;
pub mod types;

pub use error::{ConfigError, PreviewError, Result};
pub use state::StateRecorder;
pub use types::{
    ManagedProcess, Ownership, PortBinding, PortResolution, PreviewRecord, ProcessRole,
};
