// crates/vet-clinic-config/src/lib.rs
// ============================================================================
// Module: Vet Clinic Config Library
// Description: Canonical configuration model, loader, and example for the backend.
// Purpose: Single source of truth for vet-clinic.toml semantics.
// Dependencies: crate::{config, examples}
// ============================================================================

//! ## Overview
//! Loads and validates `vet-clinic.toml`, then hands the runtime crates the
//! pool, coordinator, and cipher settings they need.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;
