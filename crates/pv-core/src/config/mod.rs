//! Configuration management for the preview orchestrator

mod preview;
pub mod serde_utils;

pub use preview::{
    PollPolicy, PreviewConfig, ProjectConfig, ServerConfig, ServerMode, StateConfig, TunnelConfig,
};

use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// File name of the per-project configuration
pub const PROJECT_CONFIG_NAME: &str = "preview.toml";

/// Get the user-level configuration directory
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("preview")
}

/// Get the user-level configuration file path
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.toml")
}

/// Get the project-level configuration file path
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(PROJECT_CONFIG_NAME)
}

/// Pick the configuration file to use, if any
///
/// An explicit path wins, then `<root>/preview.toml`, then the user-level
/// file. Only the explicit path is returned when it does not exist, so a
/// typo surfaces as `NotFound` instead of silently using defaults.
pub fn locate_config(explicit: Option<&Path>, project_root: &Path) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    [project_config_path(project_root), default_config_path()]
        .into_iter()
        .find(|p| p.exists())
}

/// Load configuration from a file
pub fn load_config<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Invalid(format!("Failed to read config: {}", e)))?;

    let config: T = toml::from_str(&content)?;
    Ok(config)
}

/// Load and validate the configuration for a project
pub fn load_preview_config(
    explicit: Option<&Path>,
    project_root: &Path,
) -> Result<PreviewConfig, ConfigError> {
    let config = match locate_config(explicit, project_root) {
        Some(path) => {
            tracing::debug!("Loading configuration from {:?}", path);
            load_config::<PreviewConfig>(&path)?
        }
        None => {
            tracing::debug!("No configuration file found, using defaults");
            PreviewConfig::default()
        }
    };
    config.validate()?;
    Ok(config)
}

/// Save configuration to a file
pub fn save_config<T: serde::Serialize>(path: &Path, config: &T) -> Result<(), ConfigError> {
    let content = toml::to_string_pretty(config)?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| ConfigError::Invalid(format!("Failed to create config dir: {}", e)))?;
    }

    std::fs::write(path, content)
        .map_err(|e| ConfigError::Invalid(format!("Failed to write config: {}", e)))?;

    Ok(())
}
