//! Config command implementations

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::output::{print_error, print_info, print_success, print_warning};
use pv_core::config::{self, PreviewConfig};

/// File a command reads from: the explicit path, else the first existing
/// candidate, else where `config init` would write
fn effective_path(config_path: Option<&Path>, root: &Path) -> PathBuf {
    config::locate_config(config_path, root).unwrap_or_else(|| config::project_config_path(root))
}

/// Show current configuration
pub fn config_show(config_path: Option<&Path>, root: &Path) -> Result<()> {
    let path = effective_path(config_path, root);

    if !path.exists() {
        print_warning(&format!("No configuration file found at {:?}", path));
        print_info("Built-in defaults in effect:");
        println!();
        println!("{}", toml::to_string_pretty(&PreviewConfig::default())?);
        return Ok(());
    }

    print_info(&format!("Configuration file: {:?}", path));
    println!();

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;
    println!("{}", content);

    Ok(())
}

/// Print the configuration file path
pub fn config_path(config_path: Option<&Path>, root: &Path) -> Result<()> {
    println!("{}", effective_path(config_path, root).display());
    Ok(())
}

/// Print one value of the effective configuration, e.g. `server.port`
pub fn config_get(config_path: Option<&Path>, root: &Path, key: &str) -> Result<()> {
    let config = super::load_config(config_path, root)?;
    let mut current =
        toml::Value::try_from(&config).context("Failed to encode configuration")?;

    for part in key.split('.') {
        current = match current {
            toml::Value::Table(mut table) => match table.remove(part) {
                Some(value) => value,
                None => anyhow::bail!("Key not found: {}", key),
            },
            _ => anyhow::bail!("Key not found: {}", key),
        };
    }

    match current {
        toml::Value::String(s) => println!("{}", s),
        toml::Value::Array(items) => {
            for item in items {
                match item {
                    toml::Value::String(s) => println!("{}", s),
                    other => println!("{}", other),
                }
            }
        }
        toml::Value::Table(_) => println!("{}", toml::to_string_pretty(&current)?),
        other => println!("{}", other),
    }

    Ok(())
}

/// Write a configuration file holding the defaults
pub fn config_init(config_path: Option<&Path>, root: &Path, force: bool) -> Result<()> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config::project_config_path(root));

    if path.exists() && !force {
        print_error(&format!("Config file already exists: {:?}", path));
        print_info("Use --force to overwrite");
        return Ok(());
    }

    config::save_config(&path, &PreviewConfig::default())
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    print_success(&format!("Created configuration file: {:?}", path));
    Ok(())
}
