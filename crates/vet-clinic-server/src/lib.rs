// crates/vet-clinic-server/src/lib.rs
// ============================================================================
// Module: Vet Clinic Server Library
// Description: Axum HTTP surface over the dual-write coordinator.
// Purpose: Expose clinic entities as JSON REST endpoints.
// Dependencies: crate::{audit, extract, response, routes, server, state}
// ============================================================================

//! ## Overview
//! Routes decode untrusted JSON, delegate to the coordinator or directory,
//! and wrap results in a uniform envelope. Mutating requests are audited.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
mod extract;
pub mod response;
pub mod routes;
pub mod server;
pub mod state;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditEvent;
pub use audit::AuditSink;
pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use response::ApiError;
pub use response::Envelope;
pub use routes::router;
pub use server::ServerError;
pub use server::VetClinicServer;
pub use state::AppState;
pub use state::SharedState;
