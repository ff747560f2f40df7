//! Exercises the `codegraph` binary end to end via `assert_cmd`.

use assert_cmd::Command;
use predicates::str::contains;
use tempfile::TempDir;

#[test]
fn init_then_status_on_an_empty_project() {
    let dir = TempDir::new().unwrap();

    Command::cargo_bin("codegraph")
        .unwrap()
        .args(["--root", dir.path().to_str().unwrap(), "init"])
        .assert()
        .success();
    assert!(dir.path().join(".codegraph/config.json").exists());

    Command::cargo_bin("codegraph")
        .unwrap()
        .args(["--root", dir.path().to_str().unwrap(), "status"])
        .assert()
        .success()
        .stdout(contains("nodes: 0"));
}

#[test]
fn commands_before_init_fail_with_not_initialized_exit_code() {
    let dir = TempDir::new().unwrap();

    Command::cargo_bin("codegraph")
        .unwrap()
        .args(["--root", dir.path().to_str().unwrap(), "status"])
        .assert()
        .failure()
        .code(2);
}
