//! Bounded fixed-interval polling
//!
//! Both readiness checks (server health and tunnel URL discovery) run
//! through [`poll`]; they differ only in the probe they pass in.

use std::future::Future;

use pv_core::config::PollPolicy;
use pv_core::{PreviewError, Result};

/// Outcome of a single probe attempt
#[derive(Debug)]
pub enum Probe<T> {
    /// The condition holds; stop polling
    Ready(T),
    /// Not yet; the string describes what was seen, for the timeout message
    Pending(String),
    /// Give up immediately (e.g. the watched process died)
    Abort(PreviewError),
}

/// Run `probe` until it is ready, aborts, or `policy.max_attempts` is used up
///
/// Sleeps `policy.interval` between attempts, never after the last one. On
/// exhaustion returns [`PreviewError::Timeout`] carrying the last pending
/// diagnostic.
pub async fn poll<T, F, Fut>(stage: &str, policy: PollPolicy, mut probe: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Probe<T>>,
{
    let mut last = String::from("no attempt made");

    for attempt in 1..=policy.max_attempts {
        match probe(attempt).await {
            Probe::Ready(value) => {
                tracing::debug!("{} ready after {} attempt(s)", stage, attempt);
                return Ok(value);
            }
            Probe::Pending(diagnostic) => {
                tracing::debug!(
                    "{} not ready ({}/{}): {}",
                    stage,
                    attempt,
                    policy.max_attempts,
                    diagnostic
                );
                last = diagnostic;
            }
            Probe::Abort(err) => return Err(err),
        }

        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }

    Err(PreviewError::Timeout {
        stage: stage.to_string(),
        attempts: policy.max_attempts,
        last,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pv_core::ProcessRole;
    use std::path::PathBuf;
    use std::time::Duration;

    fn policy(max_attempts: u32) -> PollPolicy {
        PollPolicy::new(Duration::from_millis(1), max_attempts)
    }

    #[tokio::test]
    async fn test_ready_on_third_attempt() {
        let mut calls = 0;
        let result = poll("counter", policy(5), |attempt| {
            calls += 1;
            async move {
                if attempt == 3 {
                    Probe::Ready(attempt)
                } else {
                    Probe::Pending(format!("attempt {}", attempt))
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result, 3);
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_timeout_reports_last_diagnostic() {
        let err = poll::<(), _, _>("log scrape", policy(4), |attempt| async move {
            Probe::Pending(format!("attempt {}", attempt))
        })
        .await
        .unwrap_err();

        match err {
            PreviewError::Timeout {
                stage,
                attempts,
                last,
            } => {
                assert_eq!(stage, "log scrape");
                assert_eq!(attempts, 4);
                assert_eq!(last, "attempt 4");
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_abort_stops_early() {
        let mut calls = 0;
        let err = poll::<(), _, _>("health", policy(10), |_| {
            calls += 1;
            async {
                Probe::Abort(PreviewError::ProcessExited {
                    role: ProcessRole::Server,
                    pid: 1234,
                    log: PathBuf::from("preview-server.log"),
                })
            }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, PreviewError::ProcessExited { .. }));
        assert_eq!(calls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleeps_between_attempts_only() {
        let start = tokio::time::Instant::now();
        let _ = poll::<(), _, _>(
            "paused",
            PollPolicy::new(Duration::from_secs(2), 3),
            |_| async { Probe::Pending(String::new()) },
        )
        .await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(4));
        assert!(elapsed < Duration::from_secs(6));
    }
}
