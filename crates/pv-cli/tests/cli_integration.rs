//! CLI integration tests
//!
//! Tests the preview CLI using assert_cmd.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// `preview` run inside `dir`, isolated from the user's config and env
fn preview(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("preview")
        .expect("Failed to locate preview binary - ensure it's built before running tests");
    cmd.current_dir(dir)
        .env("XDG_CONFIG_HOME", dir.join(".config"))
        .env_remove("PREVIEW_PORT")
        .env_remove("PREVIEW_PROJECT_DIR")
        .env_remove("PREVIEW_MODE")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_cli_help() {
    let dir = TempDir::new().unwrap();
    preview(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("preview"))
        .stdout(predicate::str::contains("Preview environment orchestrator"));
}

#[test]
fn test_cli_version() {
    let dir = TempDir::new().unwrap();
    preview(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("preview"));
}

#[test]
fn test_cli_start_help_lists_overrides() {
    let dir = TempDir::new().unwrap();
    preview(dir.path())
        .args(["start", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--port"))
        .stdout(predicate::str::contains("--project-dir"))
        .stdout(predicate::str::contains("--mode"))
        .stdout(predicate::str::contains("PREVIEW_PORT"));
}

#[test]
fn test_cli_unknown_command() {
    let dir = TempDir::new().unwrap();
    preview(dir.path()).arg("deploy").assert().failure();
}

#[test]
fn test_cli_invalid_mode() {
    let dir = TempDir::new().unwrap();
    preview(dir.path())
        .args(["start", "--mode", "staging"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("staging"));
}

#[test]
fn test_cli_stop_without_start_is_idempotent() {
    let dir = TempDir::new().unwrap();
    for _ in 0..2 {
        preview(dir.path())
            .arg("stop")
            .assert()
            .success()
            .stdout(predicate::str::contains("Nothing was running"));
    }
}

#[test]
fn test_cli_stop_clears_stale_state() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join(".preview-tunnel.pid"), "999999999\n").unwrap();
    std::fs::write(
        dir.path().join(".preview-url-lincoln-high.txt"),
        "https://quiet-river.trycloudflare.com\n",
    )
    .unwrap();
    std::fs::write(dir.path().join("preview-tunnel.log"), "old output\n").unwrap();

    preview(dir.path())
        .arg("stop")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exited"))
        .stdout(predicate::str::contains("removed 1 preview record"));

    assert!(!dir.path().join(".preview-tunnel.pid").exists());
    assert!(!dir.path().join(".preview-url-lincoln-high.txt").exists());
    assert!(!dir.path().join("preview-tunnel.log").exists());
}

#[test]
fn test_cli_stop_keep_logs() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("preview-server.log"), "old output\n").unwrap();

    preview(dir.path())
        .args(["stop", "--keep-logs"])
        .assert()
        .success();
    assert!(dir.path().join("preview-server.log").exists());
}

#[test]
fn test_cli_status_of_empty_project() {
    let dir = TempDir::new().unwrap();
    preview(dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("not recorded"))
        .stdout(predicate::str::contains("No preview URL recorded"));
}

#[test]
fn test_cli_status_skips_unreadable_record() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join(".preview-url-bad.txt"), [0xff, 0xfe, 0x00]).unwrap();
    std::fs::write(
        dir.path().join(".preview-url-good.txt"),
        "https://bold-sky.trycloudflare.com\n",
    )
    .unwrap();

    preview(dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("https://bold-sky.trycloudflare.com"))
        .stdout(predicate::str::contains("No preview URL recorded").not());
}

#[test]
fn test_cli_status_ignores_out_of_range_marker() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join(".preview-server.pid"), "4294967295\n").unwrap();

    let output = preview(dir.path())
        .args(["status", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let server = &report["processes"][0];
    assert_eq!(server["role"], "server");
    assert_eq!(server["state"], "not recorded");
}

#[test]
fn test_cli_status_json() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join(".preview-url-oak-ridge.txt"),
        "https://bold-sky.trycloudflare.com\n",
    )
    .unwrap();

    let output = preview(dir.path())
        .args(["status", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["records"][0]["school_name"], "oak-ridge");
    assert_eq!(report["records"][0]["url"], "https://bold-sky.trycloudflare.com");
    assert_eq!(report["processes"].as_array().unwrap().len(), 2);
}

#[test]
fn test_cli_start_outside_project_fails_at_identity_check() {
    let dir = TempDir::new().unwrap();
    preview(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("identity check"))
        .stdout(predicate::str::contains("preview stop"));

    assert!(!dir.path().join(".preview-server.pid").exists());
}

#[test]
fn test_cli_project_dir_flag() {
    let dir = TempDir::new().unwrap();
    let project = dir.path().join("site-old");
    std::fs::create_dir_all(project.join("server")).unwrap();
    std::fs::write(project.join("package.json"), "{}").unwrap();

    preview(dir.path())
        .args(["start", "--project-dir"])
        .arg(&project)
        .assert()
        .failure()
        .stderr(predicate::str::contains("excluded pattern"));
}

#[test]
fn test_cli_config_init_and_get() {
    let dir = TempDir::new().unwrap();
    preview(dir.path())
        .args(["config", "init"])
        .assert()
        .success();
    assert!(dir.path().join("preview.toml").exists());

    preview(dir.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("preview.toml"));

    preview(dir.path())
        .args(["config", "get", "server.port"])
        .assert()
        .success()
        .stdout("5000\n");

    preview(dir.path())
        .args(["config", "get", "server.nope"])
        .assert()
        .failure();
}

#[test]
fn test_cli_config_file_is_honored() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("custom.toml"),
        "[tunnel]\nbinary = \"my-tunnel\"\n",
    )
    .unwrap();

    preview(dir.path())
        .args(["--config", "custom.toml", "config", "get", "tunnel.binary"])
        .assert()
        .success()
        .stdout("my-tunnel\n");
}

#[test]
fn test_cli_invalid_config_is_reported() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("preview.toml"), "[server]\nport = 0\n").unwrap();

    preview(dir.path())
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("server.port"));
}
