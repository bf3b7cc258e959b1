use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;

const BIN: &str = "mcp-server-time-http";

/// Test CLI help output
#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin(BIN).unwrap();
    let assert = cmd.arg("--help").assert();

    assert
        .success()
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--port"));
}

/// Test CLI version output
#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin(BIN).unwrap();
    let assert = cmd.arg("--version").assert();

    assert
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

/// An explicit config file must exist
#[test]
fn test_missing_config_file_fails() {
    let mut cmd = Command::cargo_bin(BIN).unwrap();
    let assert = cmd
        .args(["--config", "/definitely/not/here.toml"])
        .assert();

    assert
        .failure()
        .stderr(predicate::str::contains(
            "Error: Configuration error: config file not found",
        ))
        .stderr(predicate::str::contains("Config {").not());
}

/// Validation problems are reported before anything binds
#[test]
fn test_invalid_config_fails() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[time]\ndefault_timezone = \"Mars/Olympus_Mons\"").unwrap();

    let mut cmd = Command::cargo_bin(BIN).unwrap();
    let assert = cmd
        .arg("--config")
        .arg(file.path())
        .env_remove("MCP_TIME_CONFIG")
        .assert();

    assert
        .failure()
        .stderr(predicate::str::contains("Mars/Olympus_Mons"));
}

/// Malformed environment overrides are rejected
#[test]
fn test_invalid_env_override_fails() {
    let mut cmd = Command::cargo_bin(BIN).unwrap();
    let assert = cmd
        .env("MCP_TIME_SERVER_PORT", "not-a-port")
        .env_remove("MCP_TIME_CONFIG")
        .current_dir(std::env::temp_dir())
        .assert();

    assert
        .failure()
        .stderr(predicate::str::contains("MCP_TIME_SERVER_PORT"));
}

/// A shared-port metrics path may not shadow the health route
#[test]
fn test_metrics_path_collision_fails() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[server]\nport = 8080\n\n[metrics]\nport = 8080\npath = \"/health\""
    )
    .unwrap();

    let mut cmd = Command::cargo_bin(BIN).unwrap();
    let assert = cmd
        .arg("--config")
        .arg(file.path())
        .env_remove("MCP_TIME_CONFIG")
        .env_remove("MCP_TIME_SERVER_PORT")
        .env_remove("MCP_TIME_METRICS_PORT")
        .env_remove("MCP_TIME_METRICS_PATH")
        .assert();

    assert
        .failure()
        .stderr(predicate::str::contains("metrics.path '/health' collides"))
        .stderr(predicate::str::contains("panicked").not());
}
