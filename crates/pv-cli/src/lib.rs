//! pv-cli: Command-line interface for the preview orchestrator
//!
//! Provides the `preview` CLI for starting, stopping and inspecting a
//! project's preview environment.

pub mod commands;
pub mod output;
