//! Basic CLI E2E tests.
//!
//! Tests invoke CLI commands via cargo run against a throwaway HOME so
//! state never leaks between runs or into the real data directory.

use std::path::Path;
use std::process::Command;

fn run_cli(home: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new("cargo")
        .args(["run", "-p", "focusmint-cli", "--quiet", "--"])
        .args(args)
        .env("HOME", home)
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

#[test]
fn test_wallet_balance_starts_empty() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["wallet", "balance"]);
    assert_eq!(code, 0);
    let wallet: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(wallet["currentBalance"], 0);
    assert_eq!(wallet["totalEarned"], 0);
}

#[test]
fn test_session_start_and_status() {
    let home = tempfile::tempdir().unwrap();
    let (_, _, code) = run_cli(home.path(), &["session", "start", "--minutes", "25"]);
    assert_eq!(code, 0);

    let (stdout, _, code) = run_cli(home.path(), &["session", "status"]);
    assert_eq!(code, 0);
    let snapshot: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(snapshot["session"]["status"], "active");
}

#[test]
fn test_double_start_is_rejected() {
    let home = tempfile::tempdir().unwrap();
    run_cli(home.path(), &["session", "start", "--minutes", "25"]);
    let (_, stderr, code) = run_cli(home.path(), &["session", "start", "--minutes", "10"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error"));
}

#[test]
fn test_steps_record_and_today() {
    let home = tempfile::tempdir().unwrap();
    // First sample is the baseline.
    let (_, _, code) = run_cli(home.path(), &["steps", "record", "1000"]);
    assert_eq!(code, 0);

    let (stdout, _, code) = run_cli(home.path(), &["steps", "record", "1050"]);
    assert_eq!(code, 0);
    let line = stdout.lines().next().unwrap_or("");
    assert!(stdout.contains("\"accepted\""), "unexpected output: {line}");
}

#[test]
fn test_bonus_then_spend() {
    let home = tempfile::tempdir().unwrap();
    run_cli(home.path(), &["wallet", "bonus", "50", "--note", "welcome"]);

    let (_, _, code) = run_cli(
        home.path(),
        &["wallet", "spend", "50", "--reason", "theme"],
    );
    assert_eq!(code, 0);

    let (stdout, _, _) = run_cli(home.path(), &["wallet", "balance"]);
    let wallet: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(wallet["currentBalance"], 0);
    assert_eq!(wallet["totalEarned"], 50);
}

#[test]
fn test_overspend_leaves_balance_unchanged() {
    let home = tempfile::tempdir().unwrap();
    run_cli(home.path(), &["wallet", "bonus", "10", "--note", "seed"]);

    let (_, stderr, code) = run_cli(home.path(), &["wallet", "spend", "11"]);
    assert_eq!(code, 0);
    assert!(stderr.contains("insufficient balance"));

    let (stdout, _, _) = run_cli(home.path(), &["wallet", "balance"]);
    let wallet: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(wallet["currentBalance"], 10);
}

#[test]
fn test_config_show() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["config", "show"]);
    assert_eq!(code, 0);
    let config: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(config["session"]["default_duration_min"], 25);
}
