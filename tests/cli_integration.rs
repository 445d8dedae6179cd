//! CLI Integration Tests
//!
//! End-to-end tests for CLI commands using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const EVENTS: &str = r#"[
    {
        "type": "worker-monthly-benefit-saved",
        "recordId": "00000000-0000-0000-0000-0000000000a1",
        "workerId": "00000000-0000-0000-0000-0000000000b1",
        "employerId": "3b0c8a9e-4f0e-4c51-8a5f-2d1e7b9c6a44",
        "benefitId": "0c5a0f0e-8f4e-4a55-9d7c-2a64c1f0b7d3",
        "year": 2024,
        "month": 8
    },
    {
        "type": "worker-hours-saved",
        "hoursId": "00000000-0000-0000-0000-0000000000c1",
        "workerId": "00000000-0000-0000-0000-0000000000b1",
        "employerId": "3b0c8a9e-4f0e-4c51-8a5f-2d1e7b9c6a44",
        "year": 2024,
        "month": 3,
        "day": 4,
        "hours": "8"
    }
]"#;

/// Get the charge-engine binary for testing
fn engine_cmd() -> Command {
    Command::cargo_bin("charge-engine").unwrap()
}

/// Write the starter config and an events file into a fresh directory.
fn workspace() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    engine_cmd()
        .current_dir(temp_dir.path())
        .args(["config", "init"])
        .assert()
        .success();
    std::fs::write(temp_dir.path().join("events.json"), EVENTS).unwrap();
    temp_dir
}

#[test]
fn test_version_output() {
    engine_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("charge-engine"));
}

#[test]
fn test_help_shows_all_commands() {
    engine_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("plugins"))
        .stdout(predicate::str::contains("config"))
        .stdout(predicate::str::contains("replay"))
        .stdout(predicate::str::contains("completions"));
}

#[test]
fn test_replay_help() {
    engine_cmd()
        .args(["replay", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--events"))
        .stdout(predicate::str::contains("--capabilities"))
        .stdout(predicate::str::contains("--json"));
}

#[test]
fn test_plugins_list_table() {
    engine_cmd()
        .args(["plugins", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hourly-rate"))
        .stdout(predicate::str::contains("monthly-benefit-charge"));
}

#[test]
fn test_plugins_list_json() {
    let output = engine_cmd()
        .args(["plugins", "list", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let parsed: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let ids: Vec<_> = parsed["plugins"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["hourly-rate", "monthly-benefit-charge"]);
}

#[test]
fn test_config_init_creates_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("charge-engine.toml");

    engine_cmd()
        .args(["config", "init", "-o", config_path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration file created"));

    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("[[plugins]]"));
}

#[test]
fn test_config_init_no_overwrite() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("charge-engine.toml");
    std::fs::write(&config_path, "existing content").unwrap();

    engine_cmd()
        .args(["config", "init", "-o", config_path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    let content = std::fs::read_to_string(&config_path).unwrap();
    assert_eq!(content, "existing content");
}

#[test]
fn test_config_validate_starter_config() {
    let temp_dir = workspace();

    engine_cmd()
        .current_dir(temp_dir.path())
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 plugin config(s)"));
}

#[test]
fn test_config_validate_rejects_duplicate_ids() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("charge-engine.toml");
    std::fs::write(
        &config_path,
        r#"
        [[plugins]]
        id = "dup"
        plugin_id = "hourly-rate"
        scope = "global"

        [[plugins]]
        id = "dup"
        plugin_id = "hourly-rate"
        scope = "global"
        "#,
    )
    .unwrap();

    engine_cmd()
        .args(["config", "validate", "-c", config_path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("dup"));
}

#[test]
fn test_replay_json_output() {
    let temp_dir = workspace();

    let output = engine_cmd()
        .current_dir(temp_dir.path())
        .args(["replay", "--events", "events.json", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let parsed: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let amounts: Vec<_> = parsed["ledger"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["amount"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(amounts, vec!["6.00", "17.50"]);
    assert!(parsed["audits"]
        .as_array()
        .unwrap()
        .iter()
        .all(|a| a["invalid"] == 0));
}

#[test]
fn test_replay_without_capabilities_writes_nothing() {
    let temp_dir = workspace();

    let output = engine_cmd()
        .current_dir(temp_dir.path())
        .args(["replay", "--events", "events.json", "--json", "--capabilities", "payroll"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let parsed: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert!(parsed["ledger"].as_array().unwrap().is_empty());
    assert_eq!(parsed["dispatches"][0]["outcomes"][0]["status"], "skipped");
}

#[test]
fn test_replay_table_output() {
    let temp_dir = workspace();

    engine_cmd()
        .current_dir(temp_dir.path())
        .args(["replay", "--events", "events.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Ledger (2 entries)"))
        .stdout(predicate::str::contains("Dental benefit - August 2024"));
}

#[test]
fn test_replay_missing_events_file() {
    let temp_dir = workspace();

    engine_cmd()
        .current_dir(temp_dir.path())
        .args(["replay", "--events", "missing.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read events file"));
}

#[test]
fn test_completions_bash() {
    engine_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("charge-engine"));
}
