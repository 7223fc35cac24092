use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::NamedTempFile;

// ============================================================================
// SCRIPT MODE
// ============================================================================

#[test]
fn test_scenario_script() {
    let mut cmd = Command::cargo_bin("account-ledger").unwrap();
    let output = cmd
        .arg("tests/fixtures/scenario.csv")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let output_str = String::from_utf8(output).unwrap();
    let lines: Vec<&str> = output_str.lines().collect();

    assert_eq!(
        lines,
        vec![
            "OK",
            "OK",
            "OK",
            r#"OK {"address":"alice","balance":70}"#,
            r#"OK {"address":"bob","balance":80}"#,
            // Overdraft is rejected silently
            "OK",
            r#"OK {"address":"alice","balance":70}"#,
            "ERROR account does not exist: ghost",
            "ERROR incorrect number of arguments, expecting 3",
            r#"OK [{"Key":"alice","Record":{"address":"alice","balance":70}},{"Key":"bob","Record":{"address":"bob","balance":80}}]"#,
        ]
    );
}

#[test]
fn test_cli_subcommand() {
    let temp_file = NamedTempFile::new().unwrap();
    fs::write(temp_file.path(), "create, carol , 12\nfetch,carol\n").unwrap();

    let mut cmd = Command::cargo_bin("account-ledger").unwrap();
    cmd.arg("cli")
        .arg(temp_file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"OK {"address":"carol","balance":12}"#));
}

#[test]
fn test_history_output_format() {
    let temp_file = NamedTempFile::new().unwrap();
    fs::write(temp_file.path(), "create,dave,5\nscanHistory,dave\n").unwrap();

    let mut cmd = Command::cargo_bin("account-ledger").unwrap();
    cmd.arg(temp_file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""Value":{"address":"dave","balance":5}"#))
        .stdout(predicate::str::contains(r#""IsDelete":"false""#));
}

// ============================================================================
// INPUT VALIDATION
// ============================================================================

#[test]
fn test_unknown_operation_and_empty_address() {
    let temp_file = NamedTempFile::new().unwrap();
    fs::write(temp_file.path(), "burn,alice\ncreate,,10\n").unwrap();

    let mut cmd = Command::cargo_bin("account-ledger").unwrap();
    cmd.arg(temp_file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("ERROR received unknown operation: burn"))
        .stdout(predicate::str::contains("ERROR argument can't be empty: address"));
}

#[test]
fn test_missing_input_file() {
    let mut cmd = Command::cargo_bin("account-ledger").unwrap();
    cmd.arg("nonexistent.csv").assert().failure();
}

#[test]
fn test_empty_script() {
    let temp_file = NamedTempFile::new().unwrap();
    fs::write(temp_file.path(), "# nothing to do\n").unwrap();

    let mut cmd = Command::cargo_bin("account-ledger").unwrap();
    cmd.arg(temp_file.path())
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}
