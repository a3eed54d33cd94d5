// crates/vet-clinic-core/tests/health_monitor.rs
// ============================================================================
// Module: Connection Health Monitor Tests
// Description: Ping, close, reinitialize, and re-ping sequencing.
// Purpose: Ensure the monitor recovers once and never raises.
// ============================================================================

//! ## Overview
//! Uses a scripted lifecycle target to observe each recovery step.

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
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use common::ScriptedLifecycle;
use common::refused;
use vet_clinic_core::ConnectionHealthMonitor;

#[tokio::test]
async fn healthy_connection_skips_recovery() {
    let target = Arc::new(ScriptedLifecycle::default());
    let monitor = ConnectionHealthMonitor::new(target.clone());

    assert!(monitor.verify_connection().await);
    assert_eq!(target.ping_calls.load(Ordering::SeqCst), 1);
    assert_eq!(target.close_calls.load(Ordering::SeqCst), 0);
    assert_eq!(target.reinitialize_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failed_ping_rebuilds_pool_and_recovers() {
    let target = Arc::new(ScriptedLifecycle::with_pings([Err(refused()), Ok(())]));
    let monitor = ConnectionHealthMonitor::new(target.clone());

    assert!(monitor.verify_connection().await);
    assert_eq!(target.ping_calls.load(Ordering::SeqCst), 2);
    assert_eq!(target.close_calls.load(Ordering::SeqCst), 1);
    assert_eq!(target.reinitialize_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn second_ping_failure_reports_unhealthy() {
    let target = Arc::new(ScriptedLifecycle::with_pings([Err(refused()), Err(refused())]));
    let monitor = ConnectionHealthMonitor::new(target.clone());

    assert!(!monitor.verify_connection().await);
    assert_eq!(target.ping_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn reinitialize_failure_reports_unhealthy_without_second_ping() {
    let target = Arc::new(ScriptedLifecycle::with_pings([Err(refused())]));
    *target.reinitialize_error.lock().unwrap() = Some(refused());
    let monitor = ConnectionHealthMonitor::new(target.clone());

    assert!(!monitor.verify_connection().await);
    assert_eq!(target.ping_calls.load(Ordering::SeqCst), 1);
    assert_eq!(target.reinitialize_calls.load(Ordering::SeqCst), 1);
}
