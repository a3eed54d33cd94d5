// crates/vet-clinic-cli/tests/config_commands.rs
// ============================================================================
// Module: CLI Config Command Tests
// Description: Integration tests for the config and health subcommands.
// Purpose: Ensure invalid configuration and missing secrets fail closed.
// Dependencies: vet-clinic-cli binary
// ============================================================================
//! ## Overview
//! Runs the `vet-clinic` binary against temporary config files and checks
//! exit status plus the stdout/stderr split.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Output;

use vet_clinic_config::VetClinicConfig;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn vet_clinic_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_vet-clinic"))
}

fn run(args: &[&str]) -> Output {
    Command::new(vet_clinic_bin())
        .args(args)
        .env_remove("VET_CLINIC_CONFIG")
        .env_remove("VET_CLINIC_CIPHER_KEY")
        .env_remove("VET_CLINIC_TEST_DOC_PASSWORD")
        .output()
        .expect("run vet-clinic")
}

fn write_config(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("vet-clinic.toml");
    fs::write(&path, content.trim()).expect("write config");
    path
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn config_example_is_valid_toml_config() {
    let output = run(&["config", "example"]);
    assert!(output.status.success());
    let text = String::from_utf8(output.stdout).unwrap();
    VetClinicConfig::parse(&text).expect("example parses");
}

#[test]
fn config_validate_accepts_minimal_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "[server]\nbind = \"127.0.0.1:9090\"\n");
    let output = run(&["config", "validate", "--config", path.to_str().unwrap()]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "config ok");
}

#[test]
fn config_validate_rejects_invalid_bind() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "[server]\nbind = \"not-an-address\"\n");
    let output = run(&["config", "validate", "--config", path.to_str().unwrap()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid bind address"), "{stderr}");
    assert!(output.stdout.is_empty());
}

#[test]
fn config_check_requires_cipher_passphrase() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "[logging]\nlevel = \"warn\"\n");
    let output = run(&["config", "check", "--config", path.to_str().unwrap()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cipher passphrase"), "{stderr}");
}

#[test]
fn config_check_resolves_secrets_from_environment() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"
[document]
uri = "file:docs.db?password=<PASSWORD>"
password_env = "VET_CLINIC_TEST_DOC_PASSWORD"
"#,
    );
    let output = Command::new(vet_clinic_bin())
        .args(["config", "check", "--config", path.to_str().unwrap()])
        .env_remove("VET_CLINIC_CONFIG")
        .env("VET_CLINIC_CIPHER_KEY", "cli-test-passphrase")
        .env("VET_CLINIC_TEST_DOC_PASSWORD", "s3cret")
        .output()
        .expect("run vet-clinic");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("s3cret"));
    assert!(!stdout.contains("cli-test-passphrase"));
}

#[test]
fn health_fails_when_server_is_unreachable() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let url = format!("http://{addr}");
    let output = run(&["health", "--url", &url]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("health request failed"), "{stderr}");
}
