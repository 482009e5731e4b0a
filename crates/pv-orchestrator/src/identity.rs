//! Project identity guard
//!
//! Refuses to run anywhere but the intended project root. Sibling checkouts
//! of the same app (templates, backups) carry the same manifest and server
//! directory, so the directory name and the manifest name are checked too.

use std::fs;
use std::path::{Path, PathBuf};

use glob::Pattern;
use serde::Deserialize;

use pv_core::config::ProjectConfig;
use pv_core::{ConfigError, PreviewError, Result};

/// The verified project a run operates on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectIdentity {
    /// Canonical project root
    pub root: PathBuf,
    /// Name the preview record is stored under
    pub school_name: String,
}

#[derive(Debug, Deserialize)]
struct Manifest {
    name: Option<String>,
}

fn wrong(root: &Path, reason: impl Into<String>) -> PreviewError {
    PreviewError::WrongProjectIdentity {
        root: root.to_path_buf(),
        reason: reason.into(),
    }
}

/// `name` field of a JSON manifest, if the file exists and has one
pub fn read_manifest_name(path: &Path) -> Option<String> {
    let content = fs::read_to_string(path).ok()?;
    match serde_json::from_str::<Manifest>(&content) {
        Ok(manifest) => manifest.name.filter(|n| !n.trim().is_empty()),
        Err(e) => {
            tracing::warn!("Could not parse manifest {:?}: {}", path, e);
            None
        }
    }
}

/// Verify `root` is the intended project and resolve its identity
pub fn verify_project(root: &Path, config: &ProjectConfig) -> Result<ProjectIdentity> {
    let root = fs::canonicalize(root)
        .map_err(|e| wrong(root, format!("cannot resolve directory: {}", e)))?;
    if !root.is_dir() {
        return Err(wrong(&root, "not a directory"));
    }

    for required in &config.required_paths {
        if !root.join(required).exists() {
            return Err(wrong(&root, format!("missing required path '{}'", required)));
        }
    }

    let dir_name = root
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();

    for raw in &config.forbidden_patterns {
        let pattern = Pattern::new(raw).map_err(|e| {
            ConfigError::Invalid(format!("bad forbidden pattern '{}': {}", raw, e))
        })?;
        if pattern.matches(&dir_name) {
            return Err(wrong(
                &root,
                format!("directory '{}' matches excluded pattern '{}'", dir_name, raw),
            ));
        }
    }

    let manifest_name = read_manifest_name(&root.join(&config.manifest));
    if let Some(expected) = &config.manifest_name {
        match &manifest_name {
            Some(actual) if actual == expected => {}
            Some(actual) => {
                return Err(wrong(
                    &root,
                    format!(
                        "{} names '{}', expected '{}'",
                        config.manifest, actual, expected
                    ),
                ))
            }
            None => {
                return Err(wrong(
                    &root,
                    format!("{} has no name, expected '{}'", config.manifest, expected),
                ))
            }
        }
    }

    let school_name = config
        .name
        .clone()
        .or(manifest_name)
        .unwrap_or_else(|| dir_name.clone());

    tracing::info!("Project identity verified: {} at {:?}", school_name, root);
    Ok(ProjectIdentity { root, school_name })
}
