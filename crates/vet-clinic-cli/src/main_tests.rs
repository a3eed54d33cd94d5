// crates/vet-clinic-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for log filter selection and health URL building.
// Purpose: Ensure env overrides and wildcard binds resolve predictably.
// Dependencies: vet-clinic-cli main helpers
// ============================================================================

//! ## Overview
//! Validates `log_directive` precedence and `base_url` loopback mapping.

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

use std::net::SocketAddr;

use super::base_url;
use super::log_directive;

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn rust_log_overrides_config_level() {
    assert_eq!(log_directive(Some("vet_clinic_core=debug"), "info"), "vet_clinic_core=debug");
}

#[test]
fn blank_rust_log_falls_back_to_config_level() {
    assert_eq!(log_directive(Some("  "), " warn "), "warn");
    assert_eq!(log_directive(None, "info"), "info");
}

#[test]
fn wildcard_bind_maps_to_loopback() {
    let addr: SocketAddr = "0.0.0.0:8080".parse().unwrap();
    assert_eq!(base_url(addr), "http://127.0.0.1:8080");
    let addr: SocketAddr = "[::]:9000".parse().unwrap();
    assert_eq!(base_url(addr), "http://127.0.0.1:9000");
}

#[test]
fn explicit_bind_is_kept() {
    let addr: SocketAddr = "192.168.1.20:8081".parse().unwrap();
    assert_eq!(base_url(addr), "http://192.168.1.20:8081");
}
