//! Output formatting utilities for the CLI
//!
//! Tables and summaries for the preview environment, plus the colored
//! status-message helpers every command prints through.

use std::path::Path;

use tabled::{settings::Style, Table, Tabled};

use pv_core::time::{elapsed_duration, format_age};
use pv_orchestrator::{StartSummary, StatusReport, StopOutcome, StopReport};

/// Multi-line summary printed after a successful start
pub fn format_summary(summary: &StartSummary) -> String {
    let mut output = String::new();

    output.push_str(&format!("Preview URL: {}\n", summary.url));
    output.push_str(&format!("Project:     {}\n", summary.identity.school_name));
    output.push_str(&format!(
        "Server:      http://localhost:{} (PID {}{})\n",
        summary.port,
        summary.server.pid,
        if summary.reused_server {
            ", already running"
        } else {
            ""
        }
    ));
    output.push_str(&format!("Tunnel:      PID {}\n", summary.tunnel.pid));
    output.push_str(&format!(
        "Logs:        {}, {}\n",
        display_name(&summary.server.log_path),
        display_name(&summary.tunnel.log_path)
    ));
    output.push_str(&format!(
        "Record:      {}\n",
        display_name(&summary.record_path)
    ));

    output
}

/// Format the recorded processes and preview URLs as tables
pub fn format_status(report: &StatusReport) -> String {
    #[derive(Tabled)]
    struct ProcessRow {
        #[tabled(rename = "ROLE")]
        role: String,
        #[tabled(rename = "PID")]
        pid: String,
        #[tabled(rename = "STATE")]
        state: String,
        #[tabled(rename = "LOG")]
        log: String,
    }

    #[derive(Tabled)]
    struct RecordRow {
        #[tabled(rename = "PROJECT")]
        project: String,
        #[tabled(rename = "URL")]
        url: String,
        #[tabled(rename = "AGE")]
        age: String,
    }

    let mut output = format!("Project root: {}\n", report.root.display());

    let rows: Vec<ProcessRow> = report
        .processes
        .iter()
        .map(|p| ProcessRow {
            role: p.role.to_string(),
            pid: p
                .pid
                .map(|pid| pid.to_string())
                .unwrap_or_else(|| "-".to_string()),
            state: p.state.to_string(),
            log: if p.log_path.exists() {
                display_name(&p.log_path)
            } else {
                "-".to_string()
            },
        })
        .collect();
    output.push_str(&Table::new(rows).with(Style::rounded()).to_string());
    output.push('\n');

    if report.records.is_empty() {
        output.push_str("No preview URL recorded\n");
    } else {
        let rows: Vec<RecordRow> = report
            .records
            .iter()
            .map(|r| RecordRow {
                project: r.school_name.clone(),
                url: r.url.clone(),
                age: format_age(elapsed_duration(r.created_at)),
            })
            .collect();
        output.push_str(&Table::new(rows).with(Style::rounded()).to_string());
        output.push('\n');
    }

    output
}

/// One line per role describing what `stop` did
pub fn format_stop_outcome(outcome: &StopOutcome) -> String {
    match outcome {
        StopOutcome::NotRecorded => "not running".to_string(),
        StopOutcome::Stale { pid } => format!("PID {} had already exited", pid),
        StopOutcome::Stopped { pid } => format!("stopped PID {}", pid),
        StopOutcome::Killed { pid } => format!("killed PID {} (ignored SIGTERM)", pid),
        StopOutcome::Foreign { pid, detail } => {
            format!("left PID {} alone: {}", pid, detail)
        }
        StopOutcome::Unverified { pid } => format!(
            "left PID {} running: its directory could not be read, marker kept",
            pid
        ),
        StopOutcome::Failed { pid, reason } => format!("could not stop PID {}: {}", pid, reason),
    }
}

/// Whether a stop outcome deserves a warning rather than a success line
pub fn is_stop_warning(outcome: &StopOutcome) -> bool {
    matches!(
        outcome,
        StopOutcome::Foreign { .. } | StopOutcome::Unverified { .. } | StopOutcome::Failed { .. }
    )
}

/// Summary line for a finished teardown
pub fn format_stop_summary(report: &StopReport) -> String {
    if report.was_idle() {
        return "Nothing was running".to_string();
    }
    match report.records_removed {
        0 => "Preview environment stopped".to_string(),
        1 => "Preview environment stopped, removed 1 preview record".to_string(),
        n => format!("Preview environment stopped, removed {} preview records", n),
    }
}

/// File name only; the full path is noise when everything lives in one root
fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Print a success message in green with a checkmark prefix
pub fn print_success(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Green),
        Print("✓ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an error message in red with an X prefix
///
/// Outputs to stderr.
pub fn print_error(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Red),
        Print("✗ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print a warning message in yellow with a warning symbol prefix
///
/// Outputs to stderr.
pub fn print_warning(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Yellow),
        Print("⚠ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an informational message in cyan with an info symbol prefix
pub fn print_info(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Cyan),
        Print("ℹ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use pv_core::{ManagedProcess, PreviewRecord, ProcessRole};
    use pv_orchestrator::{ProcessStatus, ProjectIdentity};
    use std::path::PathBuf;

    fn process(role: ProcessRole, pid: u32, log: &str) -> ManagedProcess {
        ManagedProcess::new(role, pid, PathBuf::from("/srv/site").join(log), "/srv/site".into())
    }

    #[test]
    fn test_summary_names_url_port_and_pids() {
        let summary = StartSummary {
            identity: ProjectIdentity {
                root: "/srv/site".into(),
                school_name: "lincoln-high".to_string(),
            },
            port: 5001,
            reused_server: true,
            server: process(ProcessRole::Server, 100, "preview-server.log"),
            tunnel: process(ProcessRole::Tunnel, 200, "preview-tunnel.log"),
            url: "https://quiet-river.trycloudflare.com".to_string(),
            record_path: "/srv/site/.preview-url-lincoln-high.txt".into(),
        };

        let text = format_summary(&summary);
        assert!(text.contains("https://quiet-river.trycloudflare.com"));
        assert!(text.contains("http://localhost:5001 (PID 100, already running)"));
        assert!(text.contains("PID 200"));
        assert!(text.contains("preview-server.log, preview-tunnel.log"));
    }

    #[test]
    fn test_status_table_lists_roles_and_records() {
        let report = StatusReport {
            root: "/srv/site".into(),
            processes: vec![
                ProcessStatus {
                    role: ProcessRole::Server,
                    pid: Some(4321),
                    ownership: None,
                    state: "stale",
                    log_path: "/srv/site/preview-server.log".into(),
                },
                ProcessStatus {
                    role: ProcessRole::Tunnel,
                    pid: None,
                    ownership: None,
                    state: "not recorded",
                    log_path: "/srv/site/preview-tunnel.log".into(),
                },
            ],
            records: vec![PreviewRecord {
                school_name: "lincoln-high".to_string(),
                url: "https://quiet-river.trycloudflare.com".to_string(),
                created_at: pv_core::time::current_time_millis(),
            }],
        };

        let text = format_status(&report);
        assert!(text.contains("4321"));
        assert!(text.contains("stale"));
        assert!(text.contains("not recorded"));
        assert!(text.contains("quiet-river"));
    }

    #[test]
    fn test_empty_status_says_no_url() {
        let report = StatusReport {
            root: "/srv/site".into(),
            processes: Vec::new(),
            records: Vec::new(),
        };
        assert!(format_status(&report).contains("No preview URL recorded"));
    }

    #[test]
    fn test_stop_outcome_lines() {
        assert_eq!(format_stop_outcome(&StopOutcome::NotRecorded), "not running");
        assert_eq!(
            format_stop_outcome(&StopOutcome::Killed { pid: 9 }),
            "killed PID 9 (ignored SIGTERM)"
        );
        assert!(is_stop_warning(&StopOutcome::Foreign {
            pid: 9,
            detail: "running in /tmp".to_string()
        }));
        assert!(!is_stop_warning(&StopOutcome::Stale { pid: 9 }));

        let unverified = StopOutcome::Unverified { pid: 9 };
        assert!(is_stop_warning(&unverified));
        assert!(format_stop_outcome(&unverified).contains("marker kept"));
    }

    #[test]
    fn test_idle_stop_summary() {
        let report = StopReport {
            outcomes: vec![
                (ProcessRole::Tunnel, StopOutcome::NotRecorded),
                (ProcessRole::Server, StopOutcome::NotRecorded),
            ],
            ..Default::default()
        };
        assert_eq!(format_stop_summary(&report), "Nothing was running");
    }
}
