// crates/vet-clinic-core/src/runtime/retry.rs
// ============================================================================
// Module: Retry Executor
// Description: Fixed-delay retry wrapper for transient store failures.
// Purpose: Absorb connection resets, timeouts, and refusals without masking real errors.
// Dependencies: crate::interfaces, tokio, tracing
// ============================================================================

//! ## Overview
//! [`with_retry`] re-invokes an async operation while it fails with a
//! transient error and attempts remain, sleeping a fixed delay between
//! attempts. Non-transient errors and the last transient error are returned
//! unchanged.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default number of attempts, including the first call.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
/// Default delay between attempts in milliseconds.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 2_000;

// ============================================================================
// SECTION: Classification
// ============================================================================

/// Classifies errors as retryable.
pub trait RetryClassify {
    /// Returns true when the failure is likely to clear on retry.
    fn is_transient(&self) -> bool;
}

impl RetryClassify for StoreError {
    fn is_transient(&self) -> bool {
        Self::is_transient(self)
    }
}

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Retry policy with a fixed inter-attempt delay.
///
/// # Invariants
/// - `max_attempts` of zero behaves as a single attempt.
/// - The delay never grows between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first call.
    pub max_attempts: u32,
    /// Delay slept before each retry.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Creates a retry policy.
    #[must_use]
    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_ATTEMPTS, Duration::from_millis(DEFAULT_RETRY_DELAY_MS))
    }
}

// ============================================================================
// SECTION: Executor
// ============================================================================

/// Runs `operation` until it succeeds, fails non-transiently, or attempts run out.
///
/// # Errors
///
/// Returns the first non-transient error, or the last transient error once
/// `policy.max_attempts` calls have failed.
pub async fn with_retry<T, E, F, Fut>(policy: RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: RetryClassify + Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                if attempt >= max_attempts || !error.is_transient() {
                    return Err(error);
                }
                warn!(
                    attempt,
                    max_attempts,
                    delay_ms = u64::try_from(policy.delay.as_millis()).unwrap_or(u64::MAX),
                    error = %error,
                    "transient store failure, retrying"
                );
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
        }
    }
}
