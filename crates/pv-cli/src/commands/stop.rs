//! Stop command implementation

use std::path::Path;

use anyhow::Result;

use pv_orchestrator::{Orchestrator, StopOptions};

use super::{load_config, project_root};
use crate::output::{
    format_stop_outcome, format_stop_summary, is_stop_warning, print_info, print_success,
    print_warning,
};

/// Execute the stop command
///
/// Teardown problems are printed as warnings; only a failure to work out
/// what to tear down is an error.
pub async fn stop_command(
    config_path: Option<&Path>,
    project_dir: Option<&Path>,
    keep_logs: bool,
) -> Result<()> {
    let root = project_root(project_dir)?;
    let config = load_config(config_path, &root)?;
    let orchestrator = Orchestrator::new(config, &root)?;

    let report = orchestrator
        .stop(StopOptions {
            remove_logs: !keep_logs,
        })
        .await;

    for (role, outcome) in &report.outcomes {
        let line = format!("{}: {}", role, format_stop_outcome(outcome));
        if is_stop_warning(outcome) {
            print_warning(&line);
        } else {
            print_info(&line);
        }
    }
    for warning in &report.warnings {
        print_warning(&format!("Cleanup skipped for {}", warning));
    }

    print_success(&format_stop_summary(&report));
    Ok(())
}
