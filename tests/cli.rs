//! Command-line harness tests
//!
//! These run the built binary with `--dry-run`, so rows stay in memory and
//! no database is contacted. Each test works in its own temporary directory
//! with `LANDSLIDE_CONFIG` pointed inside it, so no local `.env` or settings
//! file leaks in.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::{tempdir, TempDir};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// The binary, isolated in `dir` with an optional settings file.
fn landslide(dir: &Path, settings: Option<&str>) -> Command {
    let settings_path = dir.join("landslide.toml");
    if let Some(text) = settings {
        fs::write(&settings_path, text).expect("write settings");
    }

    let mut cmd = cargo_bin_cmd!("landslide_risk");
    cmd.timeout(Duration::from_secs(60))
        .current_dir(dir)
        .env("LANDSLIDE_CONFIG", &settings_path)
        .env_remove("RUST_LOG");
    for var in ["DB_HOST", "DB_USER", "DB_PASSWORD", "DB_NAME", "DB_PORT"] {
        cmd.env_remove(var);
    }
    cmd
}

fn workdir() -> TempDir {
    tempdir().expect("create temp dir")
}

fn stdout_json(output: &[u8]) -> Value {
    serde_json::from_slice(output).expect("stdout should be one JSON response")
}

// ---------------------------------------------------------------------------
// Dry run
// ---------------------------------------------------------------------------

#[test]
fn test_dry_run_demo_processes_every_place() {
    let dir = workdir();
    let output = landslide(dir.path(), None)
        .args(["--dry-run", "--demo"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let response = stdout_json(&output);
    assert_eq!(response["status"], "ok");
    assert_eq!(
        response["places_processed"],
        serde_json::json!(["Kasaan", "Craig", "Anchorage"])
    );
    let timestamp = response["timestamp"].as_str().expect("timestamp string");
    assert!(
        timestamp.ends_with("-08:00") || timestamp.ends_with("-09:00"),
        "timestamp should be in Alaska time, got {}",
        timestamp
    );
}

#[test]
fn test_dry_run_reads_event_from_stdin() {
    let dir = workdir();
    let output = landslide(dir.path(), None)
        .args(["--dry-run", "-"])
        .write_stdin(r#"{"place_name": "Craig"}"#)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    assert_eq!(stdout_json(&output)["places_processed"], serde_json::json!(["Craig"]));
}

#[test]
fn test_dry_run_with_unparseable_event_processes_nothing() {
    let dir = workdir();
    let output = landslide(dir.path(), None)
        .args(["--dry-run", "{not json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    assert_eq!(stdout_json(&output)["places_processed"], serde_json::json!([]));
}

// ---------------------------------------------------------------------------
// Startup failures
// ---------------------------------------------------------------------------

#[test]
fn test_invalid_settings_fail_before_processing() {
    let dir = workdir();
    landslide(dir.path(), Some("[run]\nfixed_rainfall_mm = -50.0\n"))
        .args(["--dry-run", "--demo"])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("run.fixed_rainfall_mm"));
}

#[test]
fn test_iem_without_default_station_is_rejected() {
    let dir = workdir();
    landslide(dir.path(), Some("[run]\nrainfall_source = \"iem\"\n"))
        .args(["--dry-run", "--demo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("run.default_asos_station"));
}

#[test]
fn test_missing_credentials_fail_without_dry_run() {
    let dir = workdir();
    landslide(dir.path(), None)
        .arg("--demo")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("DB_HOST"));
}

#[test]
fn test_unknown_flag_is_usage_error() {
    let dir = workdir();
    landslide(dir.path(), None)
        .arg("--verbose")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("usage: landslide_risk"));
}
