// crates/vet-clinic-core/src/runtime/health.rs
// ============================================================================
// Module: Connection Health Monitor
// Description: On-demand relational connectivity check with pool recovery.
// Purpose: Report store reachability as a boolean so callers can degrade to 503.
// Dependencies: crate::interfaces, tracing
// ============================================================================

//! ## Overview
//! The monitor pings the store. When the ping fails it tears down the pool,
//! rebuilds it, and pings once more. Failures are logged and reported as
//! `false`; the monitor never returns an error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use tracing::info;
use tracing::warn;

use crate::interfaces::ConnectionLifecycle;

// ============================================================================
// SECTION: Monitor
// ============================================================================

/// Connection health monitor over a store lifecycle target.
#[derive(Clone)]
pub struct ConnectionHealthMonitor {
    /// Store whose pool is checked and recovered.
    target: Arc<dyn ConnectionLifecycle>,
}

impl ConnectionHealthMonitor {
    /// Creates a monitor for the given store.
    #[must_use]
    pub fn new(target: Arc<dyn ConnectionLifecycle>) -> Self {
        Self {
            target,
        }
    }

    /// Verifies connectivity, rebuilding the pool once when the first ping fails.
    pub async fn verify_connection(&self) -> bool {
        let Err(first) = self.target.ping().await else {
            return true;
        };
        warn!(error = %first, "store ping failed, reinitializing pool");
        if let Err(error) = self.target.close().await {
            warn!(error = %error, "closing store pool failed");
        }
        if let Err(error) = self.target.reinitialize().await {
            warn!(error = %error, "reinitializing store pool failed");
            return false;
        }
        match self.target.ping().await {
            Ok(()) => {
                info!("store connection recovered");
                true
            }
            Err(error) => {
                warn!(error = %error, "store ping failed after reinitialization");
                false
            }
        }
    }
}
