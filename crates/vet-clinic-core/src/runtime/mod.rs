// crates/vet-clinic-core/src/runtime/mod.rs
// ============================================================================
// Module: Vet Clinic Runtime
// Description: Retry, health checks, field encryption, and the dual-write coordinator.
// Purpose: Execute entity operations against injected store backends.
// Dependencies: crate::{core, entities, interfaces}
// ============================================================================

//! ## Overview
//! Runtime components compose bottom-up: the retry executor wraps relational
//! calls, the health monitor gates mutations, and the coordinator drives both
//! stores for every split entity. In-memory stores are provided for tests.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod cipher;
pub mod coordinator;
pub mod directory;
pub mod health;
pub mod retry;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use cipher::AesGcmFieldCipher;
pub use cipher::CIPHERTEXT_PREFIX;
pub use cipher::safe_decrypt;
pub use coordinator::CoordinatorConfig;
pub use coordinator::CoordinatorError;
pub use coordinator::CreateOutcome;
pub use coordinator::DualWriteCoordinator;
pub use coordinator::UpdateOutcome;
pub use directory::DirectoryKind;
pub use directory::RelationalDirectory;
pub use health::ConnectionHealthMonitor;
pub use retry::RetryClassify;
pub use retry::RetryPolicy;
pub use retry::with_retry;
pub use store::InMemoryDocumentStore;
pub use store::InMemoryRelationalStore;
