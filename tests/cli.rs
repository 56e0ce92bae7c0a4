use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn config_file(yaml: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();
    file
}

const CONFIG: &str = r#"
retry:
  max_retries: 1
  base_delay_ms: 10
  max_delay_ms: 20
tools:
  - id: profile
    name: Wallet Profile
    kind: command
    program: sh
    args:
      - "-c"
      - "printf '{\"address\":\"%s\",\"insights\":[\"Long-term holder\"],\"recommendations\":[\"Diversify\"]}' \"{address}\""
  - id: broken
    name: Broken Scanner
    kind: command
    program: sh
    args: ["-c", "echo 'invalid input' >&2; exit 2"]
  - id: retired
    name: Retired
    enabled: false
    kind: command
    program: "true"
"#;

#[test]
fn test_schema_prints_config_schema() {
    Command::cargo_bin("addrscan")
        .unwrap()
        .arg("schema")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"tools\""))
        .stdout(predicate::str::contains("RetryConfig"));
}

#[test]
fn test_tools_lists_configuration() {
    let config = config_file(CONFIG);

    Command::cargo_bin("addrscan")
        .unwrap()
        .args(["tools", "--config"])
        .arg(config.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("profile (command) -> Wallet Profile"))
        .stdout(predicate::str::contains("retired (command) -> Retired [DISABLED]"));
}

#[test]
fn test_run_reports_success_and_failure() {
    let config = config_file(CONFIG);

    let output = Command::cargo_bin("addrscan")
        .unwrap()
        .args(["run", "--address", "0xabc", "--format", "json", "--config"])
        .arg(config.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let state: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(state["status"], "completed");
    assert_eq!(state["results"].as_array().unwrap().len(), 2);
    assert_eq!(state["summary"]["successfulTools"], 1);
    assert_eq!(state["summary"]["failedTools"], 1);
    assert_eq!(state["summary"]["keyInsights"][0], "Long-term holder");
    assert_eq!(state["summary"]["recommendations"][0], "Diversify");

    let issue = state["summary"]["criticalIssues"][0].as_str().unwrap();
    assert!(issue.starts_with("Error in Broken Scanner:"));
    assert!(issue.contains("invalid input"));
}

#[test]
fn test_run_fail_on_error_exits_nonzero() {
    let config = config_file(CONFIG);

    Command::cargo_bin("addrscan")
        .unwrap()
        .args(["run", "--address", "0xabc", "--tools", "broken", "--fail-on-error"])
        .arg("--config")
        .arg(config.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Broken Scanner"));
}

#[test]
fn test_run_markdown_to_file() {
    let config = config_file(CONFIG);
    let dir = tempfile::tempdir().unwrap();
    let report = dir.path().join("report.md");

    Command::cargo_bin("addrscan")
        .unwrap()
        .args(["run", "--address", "0xabc", "--tools", "profile", "--output"])
        .arg(&report)
        .arg("--config")
        .arg(config.path())
        .assert()
        .success();

    let md = std::fs::read_to_string(report).unwrap();
    assert!(md.contains("# Analysis of `0xabc`"));
    assert!(md.contains("Wallet Profile"));
    assert!(md.contains("- Long-term holder"));
}

#[test]
fn test_run_without_tools_is_invalid() {
    let config = config_file("tools: []\n");

    Command::cargo_bin("addrscan")
        .unwrap()
        .args(["run", "--address", "0xabc", "--config"])
        .arg(config.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid request"));
}

#[test]
fn test_run_rejects_invalid_config() {
    let config = config_file(
        r#"
tools:
  - id: dup
    name: One
    kind: command
    program: "true"
  - id: dup
    name: Two
    kind: command
    program: "true"
"#,
    );

    Command::cargo_bin("addrscan")
        .unwrap()
        .args(["run", "--address", "0xabc", "--config"])
        .arg(config.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("defined more than once"));
}

#[test]
fn test_missing_custom_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();

    Command::cargo_bin("addrscan")
        .unwrap()
        .args(["tools", "--config"])
        .arg(dir.path().join("custom.yaml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config file"));
}

#[test]
fn test_missing_default_config_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();

    Command::cargo_bin("addrscan")
        .unwrap()
        .current_dir(dir.path())
        .arg("tools")
        .assert()
        .success()
        .stdout(predicate::str::contains("No tools configured"));
}

#[test]
fn test_timeout_override_applies_to_tools_with_their_own_timeout() {
    let config = config_file(
        r#"
retry:
  max_retries: 0
tools:
  - id: slow
    name: Slow Scanner
    kind: command
    program: sh
    args: ["-c", "sleep 10"]
    timeout_sec: 30
"#,
    );

    let output = Command::cargo_bin("addrscan")
        .unwrap()
        .args(["run", "--address", "0xabc", "--format", "json"])
        .args(["--timeout-sec", "1", "--config"])
        .arg(config.path())
        .timeout(std::time::Duration::from_secs(8))
        .output()
        .unwrap();
    assert!(output.status.success());

    let state: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let error = state["results"][0]["error"].as_str().unwrap();
    assert!(error.contains("timed out"), "{}", error);
}
