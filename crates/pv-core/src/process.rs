//! OS process inspection and signaling
//!
//! Everything here works on bare PIDs read from marker files or discovered
//! from listening sockets. None of it assumes the PID is ours: callers use
//! [`ownership`] to confirm a PID runs in the expected project directory
//! before acting on it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
#[cfg(all(unix, not(target_os = "linux")))]
use std::process::Command;

use crate::types::Ownership;

/// Signals the supervisor sends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Ask politely (SIGTERM)
    Terminate,
    /// Force (SIGKILL)
    Kill,
}

/// Check if a process with the given PID is still alive
///
/// On Unix, uses kill(pid, 0). On Linux, zombies (exited but not yet reaped)
/// count as dead.
#[cfg(unix)]
pub fn is_process_alive(pid: u32) -> bool {
    let Ok(raw) = libc::pid_t::try_from(pid) else {
        return false;
    };
    if raw == 0 {
        return false;
    }
    // kill(pid, 0) returns 0 if the process exists and we may signal it;
    // EPERM means it exists but belongs to someone else
    let exists = unsafe {
        let result = libc::kill(raw, 0);
        result == 0 || io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
    };
    exists && !is_zombie(pid)
}

#[cfg(not(unix))]
pub fn is_process_alive(_pid: u32) -> bool {
    false
}

#[cfg(target_os = "linux")]
fn is_zombie(pid: u32) -> bool {
    // /proc/<pid>/stat is "pid (comm) S ..."; comm may contain spaces or
    // parentheses, so split after the last ')'
    fs::read_to_string(format!("/proc/{}/stat", pid))
        .ok()
        .and_then(|stat| {
            let (_, rest) = stat.rsplit_once(')')?;
            rest.split_whitespace().next().map(|state| state == "Z")
        })
        .unwrap_or(false)
}

#[cfg(all(unix, not(target_os = "linux")))]
fn is_zombie(_pid: u32) -> bool {
    false
}

/// Send a signal to a process
///
/// Processes spawned by the supervisor lead their own process group, so
/// when `pid` is a group leader the whole group is signaled (this reaches
/// children of wrapper scripts such as `npm start`).
#[cfg(unix)]
pub fn send_signal(pid: u32, signal: Signal) -> io::Result<()> {
    if pid <= 1 || pid == std::process::id() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("refusing to signal PID {}", pid),
        ));
    }

    let sig = match signal {
        Signal::Terminate => libc::SIGTERM,
        Signal::Kill => libc::SIGKILL,
    };
    let pid = libc::pid_t::try_from(pid).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("PID {} is out of range", pid),
        )
    })?;

    let result = unsafe {
        let target = if libc::getpgid(pid) == pid { -pid } else { pid };
        libc::kill(target, sig)
    };
    if result == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
pub fn send_signal(pid: u32, _signal: Signal) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!("signaling PID {} is only supported on Unix", pid),
    ))
}

/// Working directory of a running process
#[cfg(target_os = "linux")]
pub fn process_cwd(pid: u32) -> Option<PathBuf> {
    fs::read_link(format!("/proc/{}/cwd", pid)).ok()
}

#[cfg(all(unix, not(target_os = "linux")))]
pub fn process_cwd(pid: u32) -> Option<PathBuf> {
    // lsof -Fn prints one field per line; the name field starts with 'n'
    let output = Command::new("lsof")
        .args(["-a", "-p", &pid.to_string(), "-d", "cwd", "-Fn"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .find_map(|line| line.strip_prefix('n'))
        .map(PathBuf::from)
}

#[cfg(not(unix))]
pub fn process_cwd(_pid: u32) -> Option<PathBuf> {
    None
}

/// Compare two directories after resolving symlinks
pub fn same_directory(a: &Path, b: &Path) -> bool {
    let a = fs::canonicalize(a).unwrap_or_else(|_| a.to_path_buf());
    let b = fs::canonicalize(b).unwrap_or_else(|_| b.to_path_buf());
    a == b
}

/// Decide whether `pid` is a live process running in `expected_dir`
pub fn ownership(pid: u32, expected_dir: &Path) -> Ownership {
    if !is_process_alive(pid) {
        return Ownership::Dead;
    }
    match process_cwd(pid) {
        Some(actual) if same_directory(&actual, expected_dir) => Ownership::Owned,
        Some(actual) => Ownership::Foreign(actual),
        None => Ownership::Unknown,
    }
}

/// PID of the process listening on a local TCP port, if it can be found
#[cfg(target_os = "linux")]
pub fn listening_pid(port: u16) -> Option<u32> {
    let mut inodes = Vec::new();
    for table in ["/proc/net/tcp", "/proc/net/tcp6"] {
        if let Ok(content) = fs::read_to_string(table) {
            inodes.extend(parse_listening_inodes(&content, port));
        }
    }
    if inodes.is_empty() {
        return None;
    }

    let targets: Vec<String> = inodes.iter().map(|i| format!("socket:[{}]", i)).collect();
    let mut pids: Vec<u32> = fs::read_dir("/proc")
        .ok()?
        .filter_map(|entry| entry.ok()?.file_name().to_str()?.parse::<u32>().ok())
        .collect();
    pids.sort_unstable();

    pids.into_iter().find(|pid| {
        let Ok(fds) = fs::read_dir(format!("/proc/{}/fd", pid)) else {
            return false;
        };
        fds.filter_map(|fd| fs::read_link(fd.ok()?.path()).ok())
            .any(|link| targets.iter().any(|t| link.as_os_str() == t.as_str()))
    })
}

#[cfg(all(unix, not(target_os = "linux")))]
pub fn listening_pid(port: u16) -> Option<u32> {
    let output = Command::new("lsof")
        .args(["-nP", &format!("-iTCP:{}", port), "-sTCP:LISTEN", "-t"])
        .output()
        .ok()?;
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .find_map(|line| line.trim().parse::<u32>().ok())
}

#[cfg(not(unix))]
pub fn listening_pid(_port: u16) -> Option<u32> {
    None
}

/// Socket inodes in LISTEN state for `port` from a `/proc/net/tcp` table
///
/// Columns: `sl local_address rem_address st ... uid timeout inode`, with
/// addresses as `HEXIP:HEXPORT` and LISTEN encoded as state `0A`.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_listening_inodes(table: &str, port: u16) -> Vec<u64> {
    table
        .lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let local = fields.get(1)?;
            let state = fields.get(3)?;
            let inode = fields.get(9)?;
            if *state != "0A" {
                return None;
            }
            let (_, port_hex) = local.rsplit_once(':')?;
            if u16::from_str_radix(port_hex, 16).ok()? != port {
                return None;
            }
            inode.parse::<u64>().ok().filter(|i| *i != 0)
        })
        .collect()
}
