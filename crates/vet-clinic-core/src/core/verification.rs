// crates/vet-clinic-core/src/core/verification.rs
// ============================================================================
// Module: Vet Clinic Write Verification
// Description: Post-write existence report for split entities.
// Purpose: Surface cross-store asymmetry to callers instead of hiding it.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A split entity is synchronized when its relational row exists and exactly
//! one document carries its cross-reference. Verification is read-only and is
//! reported alongside successful results; it never triggers compensation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;

// ============================================================================
// SECTION: Verification
// ============================================================================

/// Independent read-back of both stores for one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Verification {
    /// Relational row was found by primary key.
    #[serde(rename = "existsInSQL")]
    pub exists_in_relational: bool,
    /// At least one document carries the cross-reference.
    #[serde(rename = "existsInDocument")]
    pub exists_in_document: bool,
    /// Relational row exists and exactly one document matches.
    pub synchronized: bool,
}

impl Verification {
    /// Builds a verification report from the relational lookup and document count.
    #[must_use]
    pub const fn from_counts(exists_in_relational: bool, document_count: u64) -> Self {
        Self {
            exists_in_relational,
            exists_in_document: document_count > 0,
            synchronized: exists_in_relational && document_count == 1,
        }
    }
}
