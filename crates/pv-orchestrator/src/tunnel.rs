//! Tunnel client integration
//!
//! The tunnel binary is opaque: it is started with a local URL and its
//! output is scraped for the public address it was given.

use std::process::{Command, Stdio};

use regex::Regex;

use pv_core::config::TunnelConfig;
use pv_core::{ConfigError, PreviewError, Result};

/// Check if the tunnel binary is installed and runnable
pub fn is_tunnel_installed(config: &TunnelConfig) -> bool {
    Command::new(&config.binary)
        .arg("--version")
        .stdin(Stdio::null())
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Fail with `DependencyMissing` unless the tunnel binary can be run
pub fn ensure_tunnel_installed(config: &TunnelConfig) -> Result<()> {
    if is_tunnel_installed(config) {
        tracing::debug!("Found tunnel binary '{}'", config.binary);
        Ok(())
    } else {
        Err(PreviewError::DependencyMissing {
            binary: config.binary.clone(),
            hint: config.install_hint.clone(),
        })
    }
}

/// Compile the configured public-URL pattern
pub fn url_regex(config: &TunnelConfig) -> Result<Regex> {
    Regex::new(&config.url_pattern).map_err(|e| {
        ConfigError::Invalid(format!("tunnel.url_pattern is not a valid regex: {}", e)).into()
    })
}
