//! Fixtures shared by the orchestrator integration tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use tempfile::TempDir;

use pv_core::config::{PollPolicy, PreviewConfig};

pub const TUNNEL_URL: &str = "https://quiet-river-lamp.trycloudflare.com";

/// A project laid out the way the identity guard expects
pub struct Project {
    _tmp: TempDir,
    pub root: PathBuf,
}

impl Project {
    pub fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("lincoln-site");
        std::fs::create_dir_all(root.join("server")).unwrap();
        std::fs::write(root.join("package.json"), r#"{"name":"lincoln-high"}"#).unwrap();
        let root = std::fs::canonicalize(root).unwrap();
        Self { _tmp: tmp, root }
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

/// Serve an always-healthy `/health` from this test process
pub async fn serve_healthy() -> u16 {
    let app = Router::new().route("/health", get(|| async { r#"{"status":"healthy"}"# }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    port
}

/// Configuration with a `bash` stand-in for the tunnel client
pub fn config(port: u16, tunnel_script: &str) -> PreviewConfig {
    let mut config = PreviewConfig::default();
    config.server.port = port;
    config.server.host = "127.0.0.1".to_string();
    config.server.stop_grace = Duration::from_millis(500);
    config.tunnel.binary = "bash".to_string();
    config.tunnel.args = vec!["-c".to_string(), tunnel_script.to_string()];
    config.tunnel.poll = PollPolicy::new(Duration::from_millis(50), 100);
    config.tunnel.ownership_grace = Duration::from_millis(100);
    config.tunnel.stop_grace = Duration::from_millis(1000);
    config
}

pub fn exists(path: &Path) -> bool {
    path.try_exists().unwrap()
}
