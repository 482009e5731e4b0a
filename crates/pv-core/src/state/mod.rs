//! On-disk state of a preview environment
//!
//! All state lives as flat files in the project root: one PID marker and one
//! log per [`ProcessRole`], plus one preview record per project identity.
//! Every write replaces the whole file.

mod pidfile;
mod record;

pub use pidfile::{read_pid_file, remove_if_exists, write_pid_file};
pub use record::slugify;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use glob::Pattern;

use crate::config::StateConfig;
use crate::error::{ConfigError, Result};
use crate::time::system_time_millis;
use crate::types::{PreviewRecord, ProcessRole};

/// Reads and writes the marker, log and preview-record files
#[derive(Debug, Clone)]
pub struct StateRecorder {
    root: PathBuf,
    names: StateConfig,
}

impl StateRecorder {
    pub fn new(root: impl Into<PathBuf>, names: StateConfig) -> Self {
        Self {
            root: root.into(),
            names,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn marker_path(&self, role: ProcessRole) -> PathBuf {
        self.root.join(self.names.pid_file(role))
    }

    pub fn log_path(&self, role: ProcessRole) -> PathBuf {
        self.root.join(self.names.log_file(role))
    }

    pub fn record_path(&self, school_name: &str) -> PathBuf {
        self.root.join(format!(
            "{}{}{}",
            self.names.record_prefix,
            slugify(school_name),
            self.names.record_suffix
        ))
    }

    /// Record the PID of a freshly spawned (or adopted) process
    pub fn write_marker(&self, role: ProcessRole, pid: u32) -> Result<()> {
        let path = self.marker_path(role);
        write_pid_file(&path, pid)?;
        tracing::debug!("Wrote {} marker {:?} (pid={})", role, path, pid);
        Ok(())
    }

    /// PID recorded for `role`, if any
    ///
    /// A marker that cannot be read or parsed is treated as absent.
    pub fn read_marker(&self, role: ProcessRole) -> Option<u32> {
        let path = self.marker_path(role);
        match read_pid_file(&path) {
            Ok(pid) => pid,
            Err(e) => {
                tracing::warn!("Ignoring unreadable {} marker {:?}: {}", role, path, e);
                None
            }
        }
    }

    pub fn remove_marker(&self, role: ProcessRole) -> Result<()> {
        remove_if_exists(&self.marker_path(role))?;
        Ok(())
    }

    /// Create (truncating) the log file a process writes its output to
    pub fn create_log(&self, role: ProcessRole) -> io::Result<fs::File> {
        fs::File::create(self.log_path(role))
    }

    pub fn remove_logs(&self) -> Result<()> {
        for role in ProcessRole::ALL {
            remove_if_exists(&self.log_path(role))?;
        }
        Ok(())
    }

    /// Persist the public URL for a project identity
    pub fn write_preview_record(&self, school_name: &str, url: &str) -> Result<PathBuf> {
        let path = self.record_path(school_name);
        fs::write(&path, format!("{}\n", url.trim()))?;
        tracing::info!("Recorded preview URL for {} in {:?}", school_name, path);
        Ok(path)
    }

    /// All preview records currently in the project root
    ///
    /// A record that cannot be read is logged and skipped.
    pub fn read_preview_records(&self) -> Result<Vec<PreviewRecord>> {
        let mut records = Vec::new();
        for path in self.record_files()? {
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let school_name = file_name
                .strip_prefix(self.names.record_prefix.as_str())
                .and_then(|n| n.strip_suffix(self.names.record_suffix.as_str()))
                .unwrap_or(file_name)
                .to_string();
            let url = match fs::read_to_string(&path) {
                Ok(contents) => contents.trim().to_string(),
                Err(e) => {
                    tracing::warn!("Ignoring unreadable preview record {:?}: {}", path, e);
                    continue;
                }
            };
            let created_at = fs::metadata(&path)
                .and_then(|m| m.modified())
                .map(system_time_millis)
                .unwrap_or(0);
            records.push(PreviewRecord {
                school_name,
                url,
                created_at,
            });
        }
        records.sort_by(|a, b| a.school_name.cmp(&b.school_name));
        Ok(records)
    }

    /// Remove every preview record, whichever identity wrote it
    ///
    /// Returns how many files were removed.
    pub fn clear_preview_records(&self) -> Result<usize> {
        let files = self.record_files()?;
        for path in &files {
            remove_if_exists(path)?;
        }
        Ok(files.len())
    }

    fn record_files(&self) -> Result<Vec<PathBuf>> {
        let pattern = Pattern::new(&format!(
            "{}*{}",
            Pattern::escape(&self.names.record_prefix),
            Pattern::escape(&self.names.record_suffix)
        ))
        .map_err(|e| ConfigError::Invalid(format!("Bad preview record name: {}", e)))?;

        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry?;
            let matches = entry
                .file_name()
                .to_str()
                .map(|name| pattern.matches(name))
                .unwrap_or(false);
            if matches && entry.file_type()?.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }
}
