//! CLI command implementations

mod config;
mod start;
mod status;
mod stop;

pub use config::{config_get, config_init, config_path, config_show};
pub use start::{start_command, StartOverrides};
pub use status::status_command;
pub use stop::stop_command;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use pv_core::config::{load_preview_config, PreviewConfig};

/// The project directory a command operates on
///
/// Defaults to the current directory.
pub fn project_root(project_dir: Option<&Path>) -> Result<PathBuf> {
    match project_dir {
        Some(dir) => Ok(dir.to_path_buf()),
        None => std::env::current_dir().context("Failed to determine the current directory"),
    }
}

/// Load the configuration that applies to `root`
pub fn load_config(config_path: Option<&Path>, root: &Path) -> Result<PreviewConfig> {
    load_preview_config(config_path, root).with_context(|| match config_path {
        Some(path) => format!("Failed to load config from {:?}", path),
        None => format!("Failed to load configuration for {:?}", root),
    })
}
