//! Integration tests for the `sentinel-lint` binary.
//!
//! Each test launches the binary via `assert_cmd`, writes any required
//! fixture files to a temp directory, and asserts on exit code + output.

use std::fs;
use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::NamedTempFile;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[allow(deprecated)]
fn sentinel_lint() -> Command {
    Command::cargo_bin("sentinel-lint").expect("binary not found")
}

/// Write `contents` to a temporary file with the given suffix and return it.
fn temp_file(suffix: &str, contents: &str) -> NamedTempFile {
    let mut f = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    f.flush().unwrap();
    f
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

const VALID_RULE: &str = r#"
id: 929a690e-bef0-4204-a928-ef5e620d6fcc
name: Brute force against Windows host
description: Detects repeated failed logons.
kind: Scheduled
severity: Medium
enabled: true
query: |
  SecurityEvent
  | where EventID == 4625
  | summarize FailedCount = count() by Account, Computer
queryFrequency: 1h
queryPeriod: 1h
triggerOperator: gt
triggerThreshold: 5
tactics:
  - CredentialAccess
relevantTechniques:
  - T1110
entityMappings:
  - entityType: Host
    fieldMappings:
      - identifier: HostName
        columnName: Computer
"#;

/// Valid except for its timing and an advisory column name.
const TIMING_RULE: &str = r#"
id: 3d4c5b6a-7988-4a1b-8c2d-3e4f5a6b7c8d
name: Timing problem
description: Frequency longer than period.
kind: Scheduled
severity: Low
enabled: true
query: SecurityEvent | project Computer, HostIP
queryFrequency: 2h
queryPeriod: 1h
triggerOperator: gt
triggerThreshold: 0
entityMappings:
  - entityType: IP
    fieldMappings:
      - identifier: Address
        columnName: HostIP
"#;

// ---------------------------------------------------------------------------
// lint: single file
// ---------------------------------------------------------------------------

#[test]
fn lint_valid_file_passes() {
    let f = temp_file(".yaml", VALID_RULE);
    sentinel_lint()
        .args(["lint", f.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("SENTINEL DETECTION LINTER - VALIDATION RESULTS"))
        .stdout(predicate::str::contains("[PASS]"))
        .stdout(predicate::str::contains("Summary: 1/1 files passed"));
}

#[test]
fn lint_reports_errors_and_fails() {
    let f = temp_file(".yaml", TIMING_RULE);
    sentinel_lint()
        .args(["lint", f.path().to_str().unwrap(), "--no-query-validation"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("[FAIL]"))
        .stdout(predicate::str::contains(
            "[ERROR] Timing Validator: queryFrequency '2h' (120 minutes) cannot exceed \
             queryPeriod '1h' (60 minutes)",
        ))
        .stdout(predicate::str::contains("[WARN]").not());
}

#[test]
fn lint_verbose_shows_warnings() {
    let f = temp_file(".yaml", TIMING_RULE);
    sentinel_lint()
        .args(["lint", f.path().to_str().unwrap(), "-v", "--no-query-validation"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("[WARN]  ASIM Field Validator:"));
}

#[test]
fn lint_disable_validator() {
    let f = temp_file(".yaml", TIMING_RULE);
    sentinel_lint()
        .args([
            "lint",
            f.path().to_str().unwrap(),
            "--no-query-validation",
            "--disable",
            "timing",
        ])
        .assert()
        .success();
}

#[test]
fn lint_invalid_yaml_is_attributed_to_parser() {
    let f = temp_file(".yaml", "name: [unclosed\n");
    sentinel_lint()
        .args(["lint", f.path().to_str().unwrap()])
        .assert()
        .failure()
        .stdout(predicate::str::contains("[ERROR] YAML Parser: YAML parsing error at line"));
}

#[test]
fn lint_nonexistent_file() {
    sentinel_lint()
        .args(["lint", "/nonexistent/rule.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ERROR: File not found"));
}

#[test]
fn lint_nonexistent_directory() {
    sentinel_lint()
        .args(["lint", "/nonexistent/rules"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ERROR: Directory not found"));
}

// ---------------------------------------------------------------------------
// lint: directories
// ---------------------------------------------------------------------------

#[test]
fn lint_directory_reports_every_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.yaml"), VALID_RULE).unwrap();
    fs::write(dir.path().join("b.yml"), TIMING_RULE).unwrap();
    fs::write(dir.path().join("c.yaml"), "").unwrap();

    sentinel_lint()
        .args(["lint", dir.path().to_str().unwrap(), "--no-query-validation"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("[PASS] a.yaml"))
        .stdout(predicate::str::contains("[FAIL] b.yml"))
        .stdout(predicate::str::contains("[FAIL] c.yaml"))
        .stdout(predicate::str::contains("File is empty or contains only comments"))
        .stdout(predicate::str::contains("Summary: 1/3 files passed"));
}

#[test]
fn lint_directory_detects_duplicate_ids() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("one.yaml"), VALID_RULE).unwrap();
    fs::write(dir.path().join("two.yaml"), VALID_RULE).unwrap();

    sentinel_lint()
        .args(["lint", dir.path().to_str().unwrap(), "--no-query-validation"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("is not unique. Also found in: two.yaml"))
        .stdout(predicate::str::contains("is not unique. Also found in: one.yaml"));
}

#[test]
fn lint_empty_directory() {
    let dir = tempfile::tempdir().unwrap();
    sentinel_lint()
        .args(["lint", dir.path().to_str().unwrap()])
        .assert()
        .success()
        .stderr(predicate::str::contains("No YAML files found"))
        .stdout(predicate::str::contains("Summary: 0/0 files passed"));
}

#[test]
fn lint_config_file_in_directory_is_discovered() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("rule.yaml"), TIMING_RULE).unwrap();
    fs::write(
        dir.path().join(".sentinel-lint.yml"),
        "disabled_validators: [timing]\nquery:\n  enabled: false\n",
    )
    .unwrap();

    sentinel_lint()
        .args(["lint", dir.path().to_str().unwrap()])
        .assert()
        .success();
}

#[test]
fn lint_invalid_config_fails() {
    let f = temp_file(".yaml", VALID_RULE);
    let config = temp_file(".yml", "severity_overrides:\n  timing: fatal\n");
    sentinel_lint()
        .args([
            "lint",
            f.path().to_str().unwrap(),
            "--config",
            config.path().to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid severity 'fatal'"));
}

// ---------------------------------------------------------------------------
// lint: JSON output
// ---------------------------------------------------------------------------

#[test]
fn lint_json_output() {
    let f = temp_file(".yaml", TIMING_RULE);
    let output = sentinel_lint()
        .args(["lint", f.path().to_str().unwrap(), "-o", "json", "--no-query-validation"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));

    let v: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(v["summary"]["total_files"], 1);
    assert_eq!(v["summary"]["failed"], 1);
    assert_eq!(v["results"][0]["status"], "failed");
    assert_eq!(v["results"][0]["errors"][0]["validator"], "Timing Validator");
    assert_eq!(v["results"][0]["warnings"][0]["validator"], "ASIM Field Validator");
    assert!(v["timestamp"].as_str().unwrap().ends_with('Z'));
}

// ---------------------------------------------------------------------------
// query
// ---------------------------------------------------------------------------

#[test]
fn query_prints_output_columns() {
    sentinel_lint()
        .args(["query", "SecurityEvent | project Computer, Account"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"output_columns\""))
        .stdout(predicate::str::contains("\"Computer\""));
}

#[test]
fn query_syntax_error_fails() {
    sentinel_lint()
        .args(["query", "SecurityEvent | where EventID == "])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"severity\": \"error\""));
}

#[test]
fn query_default_schema_reports_unknown_column() {
    sentinel_lint()
        .args(["query", "--default-schema", "SecurityEvent | where Acount == 'x'"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("does not refer to any known column"));
}

#[test]
fn query_from_stdin() {
    sentinel_lint()
        .args(["query", "-"])
        .write_stdin("print x = 1")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"x\""));
}

#[test]
fn query_bad_schema_file() {
    let schema = temp_file(".json", "{not json");
    sentinel_lint()
        .args(["query", "--schema", schema.path().to_str().unwrap(), "T"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load schema file"));
}
