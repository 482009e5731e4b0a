//! Scraping a process log for a URL
//!
//! The tunnel client announces its public URL somewhere in its output. The
//! log is small and append-only, so every attempt rereads it in full and
//! takes the last match.

use std::io;
use std::path::Path;

use regex::Regex;

use pv_core::config::PollPolicy;
use pv_core::process::is_process_alive;
use pv_core::{ManagedProcess, PreviewError, Result};

use crate::poll::{poll, Probe};

/// Lines of log kept in a timeout diagnostic
const TAIL_LINES: usize = 5;

/// Last match of `pattern` in `content`
pub fn last_match(content: &str, pattern: &Regex) -> Option<String> {
    pattern
        .find_iter(content)
        .last()
        .map(|m| m.as_str().to_string())
}

/// The last few lines of a log, joined with ` | `
pub fn tail(content: &str, lines: usize) -> String {
    let all: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join(" | ")
}

async fn scan_once(log_path: &Path, pattern: &Regex) -> Probe<String> {
    match tokio::fs::read(log_path).await {
        Ok(bytes) => {
            let content = String::from_utf8_lossy(&bytes);
            match last_match(&content, pattern) {
                Some(url) => Probe::Ready(url),
                None if content.trim().is_empty() => Probe::Pending("log is empty".to_string()),
                None => Probe::Pending(format!("log tail: {}", tail(&content, TAIL_LINES))),
            }
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Probe::Pending(format!("{} does not exist yet", log_path.display()))
        }
        Err(e) => Probe::Pending(format!("cannot read {}: {}", log_path.display(), e)),
    }
}

/// Poll a log file until `pattern` matches, returning the last match
///
/// With `watch` set, polling stops early with
/// [`PreviewError::ProcessExited`] once that process has died and its log
/// still holds no match.
pub async fn poll_log_for_pattern(
    log_path: &Path,
    pattern: &Regex,
    policy: PollPolicy,
    watch: Option<&ManagedProcess>,
) -> Result<String> {
    let stage = format!("URL in {}", log_path.display());
    poll(&stage, policy, move |_| async move {
        let outcome = scan_once(log_path, pattern).await;
        match (outcome, watch) {
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
