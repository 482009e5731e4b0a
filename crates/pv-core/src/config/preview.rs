//! `preview.toml` schema

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use super::serde_utils::duration_millis;
use crate::error::ConfigError;
use crate::types::ProcessRole;

/// Top-level configuration for one preview environment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub project: ProjectConfig,
    pub server: ServerConfig,
    pub tunnel: TunnelConfig,
    pub state: StateConfig,
}

impl PreviewConfig {
    /// Reject values that would make a run impossible
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be non-zero".into()));
        }
        if self.server.command.trim().is_empty() {
            return Err(ConfigError::Invalid("server.command is empty".into()));
        }
        if self.tunnel.binary.trim().is_empty() {
            return Err(ConfigError::Invalid("tunnel.binary is empty".into()));
        }
        if self.tunnel.url_pattern.is_empty() {
            return Err(ConfigError::Invalid("tunnel.url_pattern is empty".into()));
        }
        if !self.server.health_path.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "server.health_path must start with '/': {}",
                self.server.health_path
            )));
        }
        let policies = [
            ("server.health", &self.server.health),
            ("tunnel.poll", &self.tunnel.poll),
        ];
        for (name, policy) in policies {
            if policy.max_attempts == 0 {
                return Err(ConfigError::Invalid(format!(
                    "{}.max_attempts must be at least 1",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// How the project root is recognized and named
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Project identity (school name). Falls back to the manifest name,
    /// then to the directory name.
    pub name: Option<String>,

    /// Manifest file read for the project name
    pub manifest: String,

    /// If set, the manifest's `name` field must equal this value
    pub manifest_name: Option<String>,

    /// Paths (relative to the root) that must exist
    pub required_paths: Vec<String>,

    /// Glob patterns the root directory name must NOT match
    pub forbidden_patterns: Vec<String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: None,
            manifest: "package.json".to_string(),
            manifest_name: None,
            required_paths: vec!["package.json".to_string(), "server".to_string()],
            forbidden_patterns: vec![
                "*-template".to_string(),
                "*-old".to_string(),
                "*.bak".to_string(),
            ],
        }
    }
}

/// Asset-serving mode passed to the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerMode {
    Development,
    Production,
}

impl ServerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerMode::Development => "development",
            ServerMode::Production => "production",
        }
    }
}

impl fmt::Display for ServerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServerMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(ServerMode::Development),
            "production" | "prod" => Ok(ServerMode::Production),
            other => Err(ConfigError::Invalid(format!("unknown server mode: {}", other))),
        }
    }
}

/// Fixed-interval, bounded retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    #[serde(with = "duration_millis")]
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }
}

/// The local application server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Program to run from the project root
    pub command: String,
    pub args: Vec<String>,

    /// Preferred port; resolution may move upward from here
    pub port: u16,

    /// Address the server binds to; also used for the local free-port probe
    pub host: String,

    pub mode: ServerMode,

    /// Environment variable names the server reads its settings from
    pub port_env: String,
    pub host_env: String,
    pub mode_env: String,

    /// Extra environment for the server process
    pub env: BTreeMap<String, String>,

    pub health_path: String,
    pub health: PollPolicy,

    /// Delay before checking a freshly spawned server's working directory
    #[serde(with = "duration_millis")]
    pub ownership_grace: Duration,

    /// How long a stopping server gets before SIGKILL
    #[serde(with = "duration_millis")]
    pub stop_grace: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            command: "node".to_string(),
            args: vec!["server/index.js".to_string()],
            port: 5000,
            host: "0.0.0.0".to_string(),
            mode: ServerMode::Production,
            port_env: "PORT".to_string(),
            host_env: "HOST".to_string(),
            mode_env: "NODE_ENV".to_string(),
            env: BTreeMap::new(),
            health_path: "/health".to_string(),
            health: PollPolicy::new(Duration::from_millis(1000), 30),
            ownership_grace: Duration::from_millis(1000),
            stop_grace: Duration::from_millis(3000),
        }
    }
}

impl ServerConfig {
    /// Health endpoint for a server listening on `port` on this machine
    pub fn health_url(&self, port: u16) -> String {
        format!("http://127.0.0.1:{}{}", port, self.health_path)
    }
}

/// The tunnel client binary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TunnelConfig {
    pub binary: String,

    /// Arguments; `{port}` and `{url}` are replaced with the local port and
    /// `http://localhost:<port>`
    pub args: Vec<String>,

    /// Regex matched against the tunnel log; the last match is the public URL
    pub url_pattern: String,

    pub poll: PollPolicy,

    #[serde(with = "duration_millis")]
    pub ownership_grace: Duration,

    /// How long a previous tunnel gets to exit before the new one starts
    #[serde(with = "duration_millis")]
    pub stop_grace: Duration,

    /// Shown when the binary is missing
    pub install_hint: String,
}

impl Default for TunnelConfig {
    fn default() -> Self {
        Self {
            binary: "cloudflared".to_string(),
            args: vec![
                "tunnel".to_string(),
                "--no-autoupdate".to_string(),
                "--url".to_string(),
                "{url}".to_string(),
            ],
            // Quick-tunnel hosts are hyphenated words; this skips api.trycloudflare.com
            url_pattern: r"https://(?:[a-z0-9]+-)+[a-z0-9]+\.trycloudflare\.com".to_string(),
            poll: PollPolicy::new(Duration::from_millis(1000), 30),
            ownership_grace: Duration::from_millis(500),
            stop_grace: Duration::from_millis(2000),
            install_hint: "Install cloudflared: https://developers.cloudflare.com/cloudflare-one/connections/connect-networks/downloads/".to_string(),
        }
    }
}

impl TunnelConfig {
    /// Tunnel arguments with placeholders filled in for `port`
    pub fn render_args(&self, port: u16) -> Vec<String> {
        let url = format!("http://localhost:{}", port);
        self.args
            .iter()
            .map(|arg| arg.replace("{url}", &url).replace("{port}", &port.to_string()))
            .collect()
    }
}

/// Names of the state files kept in the project root
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    pub server_pid_file: String,
    pub tunnel_pid_file: String,
    pub server_log: String,
    pub tunnel_log: String,
    /// Preview records are `<record_prefix><slug><record_suffix>`
    pub record_prefix: String,
    pub record_suffix: String,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            server_pid_file: ".preview-server.pid".to_string(),
            tunnel_pid_file: ".preview-tunnel.pid".to_string(),
            server_log: "preview-server.log".to_string(),
            tunnel_log: "preview-tunnel.log".to_string(),
            record_prefix: ".preview-url-".to_string(),
            record_suffix: ".txt".to_string(),
        }
    }
}

impl StateConfig {
    pub fn pid_file(&self, role: ProcessRole) -> &str {
        match role {
            ProcessRole::Server => &self.server_pid_file,
            ProcessRole::Tunnel => &self.tunnel_pid_file,
        }
    }

    pub fn log_file(&self, role: ProcessRole) -> &str {
        match role {
            ProcessRole::Server => &self.server_log,
            ProcessRole::Tunnel => &self.tunnel_log,
        }
    }
}
