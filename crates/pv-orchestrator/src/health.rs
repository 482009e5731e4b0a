//! Server health checks
//!
//! A server is ready when `GET <health_path>` answers `200` with a JSON body
//! whose `status` is `"healthy"`. Anything else, including connection
//! errors, counts as not ready.

use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;

use pv_core::config::PollPolicy;
use pv_core::process::is_process_alive;
use pv_core::{ManagedProcess, PreviewError, Result};

use crate::poll::{poll, Probe};

/// Status value a healthy server reports
pub const HEALTHY_STATUS: &str = "healthy";

/// Per-request timeout; a hung server must not stall a poll attempt
const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// Longest response excerpt kept for diagnostics
const MAX_EXCERPT: usize = 120;

#[derive(Debug, Deserialize)]
struct HealthBody {
    status: String,
}

/// Whether a health response body reports the healthy status
pub fn body_is_healthy(body: &str) -> bool {
    serde_json::from_str::<HealthBody>(body)
        .map(|b| b.status == HEALTHY_STATUS)
        .unwrap_or(false)
}

/// HTTP client for the health contract
#[derive(Debug, Clone)]
pub struct HealthChecker {
    client: reqwest::Client,
}

impl HealthChecker {
    pub fn new() -> Result<Self> {
        Self::with_timeout(REQUEST_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        // Health checks always target this machine; never route them through
        // an HTTP proxy picked up from the environment
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .no_proxy()
            .build()?;
        Ok(Self { client })
    }

    /// One health request
    pub async fn probe(&self, url: &str) -> Probe<()> {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => return Probe::Pending(format!("request to {} failed: {}", url, e)),
        };

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status != StatusCode::OK {
            Probe::Pending(format!("HTTP {} {}", status.as_u16(), excerpt(&body)))
        } else if body_is_healthy(&body) {
            Probe::Ready(())
        } else {
            Probe::Pending(format!("HTTP 200 without healthy status: {}", excerpt(&body)))
        }
    }

    /// Single-shot check used when deciding whether to adopt a server
    pub async fn is_healthy(&self, url: &str) -> bool {
        matches!(self.probe(url).await, Probe::Ready(()))
    }

    /// Poll until healthy or the policy's attempts run out
    pub async fn poll_health(&self, url: &str, policy: PollPolicy) -> Result<()> {
        self.wait_until_healthy(url, policy, None).await
    }

    /// Like [`poll_health`](Self::poll_health), but gives up as soon as the
    /// watched server process has exited
    pub async fn wait_until_healthy(
        &self,
        url: &str,
        policy: PollPolicy,
        watch: Option<&ManagedProcess>,
    ) -> Result<()> {
        poll("server health", policy, move |_| async move {
            match (self.probe(url).await, watch) {
                (Probe::Pending(_), Some(process)) if !is_process_alive(process.pid) => {
                    Probe::Abort(PreviewError::ProcessExited {
                        role: process.role,
                        pid: process.pid,
                        log: process.log_path.clone(),
                    })
                }
                (outcome, _) => outcome,
            }
        })
        .await
    }
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX_EXCERPT) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use axum::http::StatusCode as AxumStatus;
    use axum::routing::get;
    use axum::Router;
    use pv_core::ProcessRole;

    /// Serve a /health endpoint that turns healthy on the `healthy_from`th request
    async fn serve_health(healthy_from: u32) -> (String, Arc<AtomicU32>) {
        let hits = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&hits);
        let app = Router::new().route(
            "/health",
            get(move || {
                let counter = Arc::clone(&counter);
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    if n >= healthy_from {
                        (AxumStatus::OK, r#"{"status":"healthy","db":"ok"}"#)
                    } else {
                        (AxumStatus::SERVICE_UNAVAILABLE, r#"{"status":"starting"}"#)
                    }
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}/health", addr), hits)
    }

    #[test]
    fn test_body_is_healthy() {
        assert!(body_is_healthy(r#"{"status":"healthy"}"#));
        assert!(body_is_healthy(r#"{"status":"healthy","uptime":12}"#));
        assert!(!body_is_healthy(r#"{"status":"degraded"}"#));
        assert!(!body_is_healthy("healthy"));
        assert!(!body_is_healthy(""));
    }

    #[test]
    fn test_excerpt_truncates_long_bodies() {
        let long = "x".repeat(500);
        assert_eq!(excerpt(&long).len(), MAX_EXCERPT + 3);
        assert_eq!(excerpt("  short \n"), "short");
    }

    #[tokio::test]
    async fn test_healthy_after_three_attempts() {
        let (url, hits) = serve_health(3).await;
        let checker = HealthChecker::new().unwrap();

        checker
            .poll_health(&url, PollPolicy::new(Duration::from_millis(20), 10))
            .await
            .unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_timeout_carries_last_status() {
        let (url, _) = serve_health(u32::MAX).await;
        let checker = HealthChecker::new().unwrap();

        let err = checker
            .poll_health(&url, PollPolicy::new(Duration::from_millis(10), 3))
            .await
            .unwrap_err();
        match err {
            PreviewError::Timeout { attempts, last, .. } => {
                assert_eq!(attempts, 3);
                assert!(last.contains("503"), "last = {}", last);
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dead_server_stops_the_wait() {
        let (url, hits) = serve_health(u32::MAX).await;
        let checker = HealthChecker::new().unwrap();
        let dead = ManagedProcess::new(
            ProcessRole::Server,
            999_999_999,
            "preview-server.log".into(),
            std::env::current_dir().unwrap(),
        );

        let err = checker
            .wait_until_healthy(&url, PollPolicy::new(Duration::from_millis(10), 50), Some(&dead))
            .await
            .unwrap_err();
        assert!(matches!(err, PreviewError::ProcessExited { .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_not_healthy() {
        // Bind then drop to get a port nothing listens on
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let checker = HealthChecker::with_timeout(Duration::from_millis(500)).unwrap();
        assert!(!checker.is_healthy(&format!("http://127.0.0.1:{}/health", port)).await);
    }
}
