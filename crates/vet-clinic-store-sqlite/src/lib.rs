// crates/vet-clinic-store-sqlite/src/lib.rs
// ============================================================================
// Module: Vet Clinic SQLite Store Library
// Description: Pooled SQLite implementations of the store interfaces.
// Purpose: Provide durable relational and document backends for the coordinator.
// Dependencies: crate::{config, document, pool, relational, sql}
// ============================================================================

//! ## Overview
//! [`SqliteRelationalStore`] and [`SqliteDocumentStore`] implement the core
//! store traits over an r2d2 pool of `rusqlite` connections. Both also expose
//! the connection lifecycle hooks the health monitor uses to rebuild a pool
//! after a failed ping.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod document;
pub mod pool;
pub mod relational;
mod sql;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::SqliteJournalMode;
pub use config::SqlitePoolConfig;
pub use config::SqliteStoreError;
pub use config::SqliteSyncMode;
pub use config::SqliteTarget;
pub use document::SqliteDocumentStore;
pub use pool::SqlitePool;
pub use relational::SqliteRelationalStore;
