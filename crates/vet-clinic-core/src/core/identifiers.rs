// crates/vet-clinic-core/src/core/identifiers.rs
// ============================================================================
// Module: Vet Clinic Identifiers
// Description: Relational primary keys and document identifiers.
// Purpose: Provide strongly typed IDs with stable string forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The relational primary key is authoritative: it is generated first and its
//! decimal rendering becomes the cross-reference stored in the paired
//! document. Document identifiers are opaque strings minted by the document
//! store.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Serialize;

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Relational primary key.
///
/// # Invariants
/// - Always strictly positive; zero and negative keys are rejected at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RecordId(i64);

impl RecordId {
    /// Creates a record identifier when the value is a usable key.
    #[must_use]
    pub const fn new(value: i64) -> Option<Self> {
        if value > 0 { Some(Self(value)) } else { None }
    }

    /// Parses a record identifier from its decimal rendering.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        value.trim().parse::<i64>().ok().and_then(Self::new)
    }

    /// Returns the raw key value.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Returns the cross-reference string stored in paired documents.
    #[must_use]
    pub fn cross_ref(self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Document store identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Creates a new document identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DocumentId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}
