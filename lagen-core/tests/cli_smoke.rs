//! CLI smoke tests for lagen.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn lagen_cmd() -> Command {
    cargo_bin_cmd!("lagen")
}

fn project(config: &str) -> TempDir {
    let temp = TempDir::new().unwrap();
    std::fs::create_dir_all(temp.path().join(".lagen")).unwrap();
    std::fs::write(temp.path().join(".lagen/main.yml"), config).unwrap();
    temp
}

#[test]
fn help_flag_works() {
    lagen_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn two_paths_is_a_usage_error() {
    lagen_cmd()
        .args(["one", "two"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn non_directory_path_fails() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("not-a-dir");
    std::fs::write(&file, "").unwrap();

    lagen_cmd()
        .arg(&file)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not a directory"));
}

#[test]
fn bad_config_fails() {
    let temp = project("entries: [");
    lagen_cmd()
        .arg(temp.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Bad configuration file"));
}

#[test]
fn generates_entries_and_succeeds() {
    let temp = project("entries:\n  - {name: api, type: node}\n  - {name: worker, type: go}\n");

    lagen_cmd()
        .arg(temp.path())
        .arg("--no-install")
        .assert()
        .success()
        .stdout(predicate::str::contains("Entry successfully generated"));

    assert!(temp.path().join("api/Makefile").exists());
    assert!(temp.path().join("api/package.json").exists());
    assert!(temp.path().join("worker/Makefile").exists());
}

#[test]
fn unknown_kind_exits_one() {
    let temp = project("entries:\n  - {name: api, type: rust}\n");

    lagen_cmd()
        .arg(temp.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unknown entry type: rust"));
}

#[test]
fn json_report() {
    let temp = project("entries:\n  - {name: worker, type: go}\n");

    lagen_cmd()
        .args(["--format", "json", "--jobs", "2"])
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\": \"worker\""))
        .stdout(predicate::str::contains("\"stage\": \"done\""))
        .stdout(predicate::str::contains(format!(
            "\"generator_version\": \"{}\"",
            env!("CARGO_PKG_VERSION")
        )));
}
