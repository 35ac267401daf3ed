//! Basic CLI E2E tests.
//!
//! Tests invoke the built `refocus` binary against a throwaway data directory
//! and verify outputs.

use std::path::Path;
use std::process::Command;

/// Run a CLI command with `data_dir` as the data directory and return output.
fn run_cli(data_dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_refocus"))
        .env("REFOCUS_DATA_DIR", data_dir)
        .env("REFOCUS_LOG", "off")
        .args(args)
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

/// Run a CLI command and expect success; returns stdout.
fn run_cli_success(data_dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, code) = run_cli(data_dir, args);
    assert_eq!(code, 0, "CLI command failed: {args:?}\nstderr: {stderr}");
    stdout
}

fn run_json(data_dir: &Path, args: &[&str]) -> serde_json::Value {
    let mut full = vec!["--json"];
    full.extend_from_slice(args);
    let stdout = run_cli_success(data_dir, &full);
    serde_json::from_str(&stdout).expect("stdout is JSON")
}

fn capture(data_dir: &Path, extra: &[&str]) -> String {
    let mut args = vec!["capture", "--developer", "dev", "--project", "proj"];
    args.extend_from_slice(extra);
    let ctx = run_json(data_dir, &args);
    ctx["id"].as_str().expect("context id").to_string()
}

#[test]
fn test_capture_and_list() {
    let dir = tempfile::tempdir().unwrap();
    let id = capture(dir.path(), &["--file", "a.go", "--task", "fix bug"]);

    let listed = run_json(dir.path(), &["list", "--developer", "dev"]);
    let entries = listed.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["context"]["id"], id.as_str());
    let priority = entries[0]["priority"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&priority));
}

#[test]
fn test_capture_rejects_negative_cursor() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(
        dir.path(),
        &["capture", "--developer", "dev", "--project", "proj", "--cursor", "-1"],
    );
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_capture_from_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let draft = dir.path().join("draft.json");
    std::fs::write(
        &draft,
        r#"{"developer_id": "dev", "project_id": "proj", "open_files": ["x.rs"], "activity": "debugging"}"#,
    )
    .unwrap();

    let ctx = run_json(dir.path(), &["capture", "--from", draft.to_str().unwrap()]);
    assert_eq!(ctx["activity"], "debugging");
    assert_eq!(ctx["open_files"][0], "x.rs");
}

#[test]
fn test_resume_plans_best_context() {
    let dir = tempfile::tempdir().unwrap();
    capture(
        dir.path(),
        &["--file", "a.go", "--file", "b.go", "--active-file", "a.go", "--cursor", "42"],
    );

    let result = run_json(dir.path(), &["resume", "--developer", "dev"]);
    assert_eq!(result["status"], "success");
    let steps = result["plan"]["steps"].as_array().unwrap();
    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0]["instructions"][0], "Open a.go");

    let text = run_cli_success(dir.path(), &["resume", "--developer", "dev"]);
    assert!(text.contains("1. Open files"));
}

#[test]
fn test_resume_with_nothing_captured() {
    let dir = tempfile::tempdir().unwrap();
    let result = run_json(dir.path(), &["resume", "--developer", "nobody"]);
    assert_eq!(result["status"], "failure");
    assert_eq!(result["error_code"], "STATE_NOT_FOUND");
}

#[test]
fn test_plan_unknown_id_fails() {
    let dir = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(dir.path(), &["plan", "ctx-missing"]);
    assert_eq!(code, 1);
    assert!(stdout.contains("STATE_NOT_FOUND"));
}

#[test]
fn test_show_and_delete() {
    let dir = tempfile::tempdir().unwrap();
    let id = capture(dir.path(), &["--task", "write docs"]);

    let shown = run_json(dir.path(), &["show", &id]);
    assert_eq!(shown["context"]["current_task"], "write docs");
    assert!(shown["priority"]["total"].as_f64().is_some());

    let deleted = run_json(dir.path(), &["delete", &id]);
    assert_eq!(deleted["deleted"], true);
    let (_, _, code) = run_cli(dir.path(), &["show", &id]);
    assert_eq!(code, 1);
}

#[test]
fn test_sweep_reports_count() {
    let dir = tempfile::tempdir().unwrap();
    capture(dir.path(), &[]);
    let swept = run_json(dir.path(), &["sweep"]);
    assert_eq!(swept["removed"], 0);
}

#[test]
fn test_switch_record_and_cost() {
    let dir = tempfile::tempdir().unwrap();
    let recorded = run_json(
        dir.path(),
        &[
            "switch",
            "record",
            "--developer",
            "dev",
            "--type",
            "interruption",
            "--reason",
            "interruption",
            "--impact",
            "-0.5",
            "--recovery",
            "8",
            "--prior-duration",
            "20",
        ],
    );
    assert_eq!(recorded["significant"], true);
    let cost = recorded["cost"].as_f64().unwrap();
    assert!((cost - 25.35).abs() < 1e-9);

    let history = run_json(dir.path(), &["switch", "history", "--developer", "dev"]);
    assert_eq!(history.as_array().unwrap().len(), 1);

    let summary = run_json(dir.path(), &["switch", "cost", "--developer", "dev"]);
    assert_eq!(summary["total_switches"], 1);
}

#[test]
fn test_switch_rejects_unknown_type() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(
        dir.path(),
        &["switch", "record", "--developer", "dev", "--type", "teleport"],
    );
    assert_eq!(code, 1);
    assert!(stderr.contains("teleport"));
}

#[test]
fn test_config_get_set_reset() {
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(
        run_cli_success(dir.path(), &["config", "get", "store.default_ttl_days"]).trim(),
        "7"
    );

    run_cli_success(dir.path(), &["config", "set", "store.default_ttl_days", "3"]);
    assert_eq!(
        run_cli_success(dir.path(), &["config", "get", "store.default_ttl_days"]).trim(),
        "3"
    );

    let (_, _, code) = run_cli(dir.path(), &["config", "get", "store.nope"]);
    assert_eq!(code, 1);

    run_cli_success(dir.path(), &["config", "reset"]);
    assert_eq!(
        run_cli_success(dir.path(), &["config", "get", "store.default_ttl_days"]).trim(),
        "7"
    );
}

#[test]
fn test_config_set_applies_to_capture() {
    let dir = tempfile::tempdir().unwrap();
    run_cli_success(dir.path(), &["config", "set", "store.default_ttl_days", "1"]);
    let ctx = run_json(dir.path(), &["capture", "--developer", "dev", "--project", "proj"]);
    let captured = chrono::DateTime::parse_from_rfc3339(ctx["captured_at"].as_str().unwrap()).unwrap();
    let expires = chrono::DateTime::parse_from_rfc3339(ctx["expires_at"].as_str().unwrap()).unwrap();
    assert_eq!(expires - captured, chrono::Duration::days(1));
}

#[test]
fn test_out_of_range_durations_are_errors() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(
        dir.path(),
        &["capture", "--developer", "dev", "--project", "proj", "--ttl-days", "9999999999999"],
    );
    assert_eq!(code, 1);
    assert!(stderr.contains("out of range"), "stderr: {stderr}");

    let history = run_json(
        dir.path(),
        &["switch", "history", "--developer", "dev", "--hours", "9999999999999"],
    );
    assert!(history.as_array().unwrap().is_empty());

    let (_, _, code) = run_cli(dir.path(), &["config", "set", "store.default_ttl_days", "100000000"]);
    assert_eq!(code, 1);
    assert_eq!(
        run_cli_success(dir.path(), &["config", "get", "store.default_ttl_days"]).trim(),
        "7"
    );
}

#[test]
fn test_config_list_and_reset_show_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let listed = run_cli_success(dir.path(), &["config", "list"]);
    assert!(listed.contains("[store]"));
    assert!(listed.contains("default_ttl_days = 7"));
    assert!(listed.contains("config.toml"));

    let reset = run_cli_success(dir.path(), &["config", "reset"]);
    assert!(reset.contains(&dir.path().join("config.toml").display().to_string()));

    let set = run_json(dir.path(), &["config", "set", "store.max_snapshots_per_developer", "4"]);
    assert_eq!(set["value"], "4");
}
