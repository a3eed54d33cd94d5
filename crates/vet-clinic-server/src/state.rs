// crates/vet-clinic-server/src/state.rs
// ============================================================================
// Module: Application State
// Description: Shared handles injected into every HTTP handler.
// Purpose: Hold the coordinator, directory, health probes, and audit sink.
// Dependencies: vet-clinic-core
// ============================================================================

//! ## Overview
//! [`AppState`] is built once at startup and shared behind an [`Arc`]. Store
//! handles inside it are themselves `Arc`s, so handlers never own a store.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use vet_clinic_core::ConnectionHealthMonitor;
use vet_clinic_core::DualWriteCoordinator;
use vet_clinic_core::RelationalDirectory;

use crate::audit::AuditSink;

// ============================================================================
// SECTION: State
// ============================================================================

/// Shared state handle passed to handlers.
pub type SharedState = Arc<AppState>;

/// Named health probe reported by `/health`.
#[derive(Clone)]
pub struct StoreProbe {
    /// Store label used in the health payload.
    pub name: &'static str,
    /// Monitor that pings and recovers the store.
    pub monitor: ConnectionHealthMonitor,
}

/// Application state shared by all handlers.
pub struct AppState {
    /// Split-entity coordinator.
    coordinator: DualWriteCoordinator,
    /// Relational-only directory.
    directory: RelationalDirectory,
    /// Store health probes.
    probes: Vec<StoreProbe>,
    /// Audit sink for mutating requests.
    audit: Arc<dyn AuditSink>,
}

impl AppState {
    /// Creates state without health probes.
    #[must_use]
    pub fn new(
        coordinator: DualWriteCoordinator,
        directory: RelationalDirectory,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            coordinator,
            directory,
            probes: Vec::new(),
            audit,
        }
    }

    /// Adds a store health probe.
    #[must_use]
    pub fn with_probe(mut self, name: &'static str, monitor: ConnectionHealthMonitor) -> Self {
        self.probes.push(StoreProbe {
            name,
            monitor,
        });
        self
    }

    /// Returns the split-entity coordinator.
    #[must_use]
    pub const fn coordinator(&self) -> &DualWriteCoordinator {
        &self.coordinator
    }

    /// Returns the relational directory.
    #[must_use]
    pub const fn directory(&self) -> &RelationalDirectory {
        &self.directory
    }

    /// Returns the configured health probes.
    #[must_use]
    pub fn probes(&self) -> &[StoreProbe] {
        &self.probes
    }

    /// Returns the audit sink.
    #[must_use]
    pub fn audit(&self) -> &dyn AuditSink {
        self.audit.as_ref()
    }
}
