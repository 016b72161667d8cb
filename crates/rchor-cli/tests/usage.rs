use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn rchor() -> Command {
    Command::cargo_bin("rchor").expect("binary")
}

#[test]
fn malformed_init_value_is_a_usage_error() {
    let dir = TempDir::new().expect("tempdir");
    let program = dir.path().join("p.rc");
    fs::write(&program, "main { }").expect("write program");

    rchor()
        .args([
            "simulate",
            program.to_str().expect("path"),
            "--init",
            "p.x=maybe",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid init value"));
}

#[test]
fn malformed_init_shape_is_a_usage_error() {
    let dir = TempDir::new().expect("tempdir");
    let program = dir.path().join("p.rc");
    fs::write(&program, "main { }").expect("write program");

    rchor()
        .args([
            "simulate",
            program.to_str().expect("path"),
            "--init",
            "px=1",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("expected P.X=V"));
}

#[test]
fn empty_init_identifier_is_a_usage_error() {
    let dir = TempDir::new().expect("tempdir");
    let program = dir.path().join("p.rc");
    fs::write(&program, "main { }").expect("write program");

    rchor()
        .args([
            "simulate",
            program.to_str().expect("path"),
            "--init",
            ".x=1",
        ])
        .assert()
        .code(2);
}

#[test]
fn missing_file_is_an_io_error() {
    rchor()
        .args(["simulate", "/no/such/file.rc"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn unknown_race_policy_is_a_usage_error() {
    let dir = TempDir::new().expect("tempdir");
    let program = dir.path().join("p.rc");
    fs::write(&program, "main { }").expect("write program");

    rchor()
        .args([
            "simulate",
            program.to_str().expect("path"),
            "--race",
            "coinflip",
        ])
        .assert()
        .code(2);
}

#[test]
fn missing_subcommand_is_a_usage_error() {
    rchor().assert().code(2);
}
