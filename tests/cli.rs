//! Binary tests for the `dealroom` command line.

use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

/// `dealroom` against a database in `dir`, with the model disabled.
fn dealroom(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("dealroom").unwrap_or_else(|_| unreachable!());
    cmd.env("DEALROOM_DB_PATH", dir.join("dealroom.db"))
        .env("DEALROOM_PROVIDER", "offline")
        .env_remove("OPENAI_API_KEY")
        .env_remove("DEALROOM_API_KEY")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_init_then_status() {
    let temp = TempDir::new().unwrap_or_else(|_| unreachable!());

    dealroom(temp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(contains("Initialized dealroom database"));

    dealroom(temp.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(contains("--force"));

    dealroom(temp.path())
        .arg("status")
        .assert()
        .success()
        .stdout(contains("Startups:       0"));
}

#[test]
fn test_status_without_init_fails() {
    let temp = TempDir::new().unwrap_or_else(|_| unreachable!());
    dealroom(temp.path())
        .arg("status")
        .assert()
        .failure()
        .stderr(contains("dealroom init"));
}

#[test]
fn test_offline_report_json() {
    let temp = TempDir::new().unwrap_or_else(|_| unreachable!());
    dealroom(temp.path()).arg("init").assert().success();

    dealroom(temp.path())
        .args([
            "--format",
            "json",
            "report",
            "competitors",
            "42",
            "--name",
            "Acme",
            "--category",
            "Fintech",
            "--offline",
        ])
        .assert()
        .success()
        .stdout(
            contains(r#""origin": "fallback""#)
                .and(contains("Acme"))
                .and(contains("Fintech")),
        );

    dealroom(temp.path())
        .args(["--format", "json", "status"])
        .assert()
        .success()
        .stdout(contains(r#""reports": 1"#));
}

#[test]
fn test_offline_report_stream_prints_frames() {
    let temp = TempDir::new().unwrap_or_else(|_| unreachable!());
    dealroom(temp.path()).arg("init").assert().success();

    dealroom(temp.path())
        .args(["report", "market", "42", "--name", "Acme", "--stream"])
        .assert()
        .success()
        .stdout(
            contains(r#"data: {"type":"content""#)
                .and(contains(r#"data: {"type":"final_output""#)),
        );
}

#[test]
fn test_report_for_unknown_startup_fails() {
    let temp = TempDir::new().unwrap_or_else(|_| unreachable!());
    dealroom(temp.path()).arg("init").assert().success();

    dealroom(temp.path())
        .args(["report", "memo", "nobody"])
        .assert()
        .failure()
        .stderr(contains("startup not found"));
}

#[test]
fn test_startup_add_feeds_report() {
    let temp = TempDir::new().unwrap_or_else(|_| unreachable!());
    dealroom(temp.path()).arg("init").assert().success();

    dealroom(temp.path())
        .args(["startup", "add", "Acme", "--id", "42", "--sector", "Fintech"])
        .assert()
        .success()
        .stdout(contains("Saved startup 'Acme' (42)"));

    dealroom(temp.path())
        .args(["report", "market", "42"])
        .assert()
        .success()
        .stdout(contains("Market Research Report for Acme").and(contains("Origin: fallback")));
}

#[test]
fn test_init_prompts_custom_dir() {
    let temp = TempDir::new().unwrap_or_else(|_| unreachable!());
    let prompts = temp.path().join("prompts");

    dealroom(temp.path())
        .arg("init-prompts")
        .arg("--dir")
        .arg(&prompts)
        .assert()
        .success()
        .stdout(contains("Wrote 6 prompt file(s)"));

    assert!(prompts.join("competitors.md").exists());
    assert!(prompts.join("memo.md").exists());
    assert!(prompts.join("advisor.md").exists());
}
