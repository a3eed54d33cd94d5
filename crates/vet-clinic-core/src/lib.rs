// crates/vet-clinic-core/src/lib.rs
// ============================================================================
// Module: Vet Clinic Core Library
// Description: Public API surface for the Vet Clinic core.
// Purpose: Expose core types, store interfaces, entities, and runtime helpers.
// Dependencies: crate::{core, entities, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Vet Clinic core owns the dual-write discipline for entities split across a
//! relational store and a document store. Store backends plug in through the
//! traits in [`interfaces`]; the [`runtime`] modules implement retry,
//! connection health checks, field encryption, and the coordinator that keeps
//! both representations of an entity in step.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod entities;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use entities::Appointment;
pub use entities::Feedback;
pub use entities::ListQuery;
pub use entities::Owner;
pub use entities::Product;
pub use entities::Reservation;
pub use entities::Service;
pub use entities::SplitEntity;
pub use entities::Transition;
pub use entities::ValidationError;
pub use interfaces::CipherError;
pub use interfaces::ConnectionLifecycle;
pub use interfaces::CounterUpdate;
pub use interfaces::DocumentStore;
pub use interfaces::DocumentUpdate;
pub use interfaces::FieldCipher;
pub use interfaces::Filter;
pub use interfaces::OrderBy;
pub use interfaces::RelationalStore;
pub use interfaces::SelectQuery;
pub use interfaces::StoreError;
pub use interfaces::TransientKind;
pub use runtime::AesGcmFieldCipher;
pub use runtime::ConnectionHealthMonitor;
pub use runtime::CoordinatorConfig;
pub use runtime::CoordinatorError;
pub use runtime::CreateOutcome;
pub use runtime::DirectoryKind;
pub use runtime::DualWriteCoordinator;
pub use runtime::InMemoryDocumentStore;
pub use runtime::InMemoryRelationalStore;
pub use runtime::RelationalDirectory;
pub use runtime::RetryClassify;
pub use runtime::RetryPolicy;
pub use runtime::UpdateOutcome;
pub use runtime::safe_decrypt;
pub use runtime::with_retry;
