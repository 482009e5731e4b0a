//! PID marker files
//!
//! A marker holds one decimal PID and a trailing newline. It is the only
//! handle the orchestrator keeps on a detached process between invocations.

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

/// Read the PID from a marker file
///
/// Returns `Ok(Some(pid))` if the file exists and contains a valid PID,
/// `Ok(None)` if the file doesn't exist, or an error if the file is malformed.
/// A PID must fit a positive `pid_t`; anything above `i32::MAX` is malformed.
pub fn read_pid_file(path: &Path) -> io::Result<Option<u32>> {
    match fs::File::open(path) {
        Ok(mut file) => {
            let mut contents = String::new();
            file.read_to_string(&mut contents)?;
            let pid = contents
                .trim()
                .parse::<i32>()
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            let pid = u32::try_from(pid).map_err(|_| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("negative PID {}", pid),
                )
            })?;
            Ok(Some(pid))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Write a PID to a marker file, replacing any previous content
pub fn write_pid_file(path: &Path, pid: u32) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    // File::create truncates; a marker must never hold two PIDs
    let mut file = fs::File::create(path)?;
    writeln!(file, "{}", pid)?;
    Ok(())
}

/// Remove a file, treating "already gone" as success
pub fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
