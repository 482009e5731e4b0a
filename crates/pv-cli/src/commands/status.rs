//! Status command implementation

use std::path::Path;

use anyhow::Result;

use pv_orchestrator::Orchestrator;

use super::{load_config, project_root};
use crate::output::format_status;

/// Execute the status command
pub fn status_command(
    config_path: Option<&Path>,
    project_dir: Option<&Path>,
    json: bool,
) -> Result<()> {
    let root = project_root(project_dir)?;
    let config = load_config(config_path, &root)?;
    let report = Orchestrator::new(config, &root)?.status();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", format_status(&report));
    }

    Ok(())
}
