// crates/vet-clinic-core/src/entities/mod.rs
// ============================================================================
// Module: Vet Clinic Entities
// Description: Per-entity table descriptors, field mappers, and validation rules.
// Purpose: Parameterize the dual-write coordinator for each split entity.
// Dependencies: crate::core, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Each split entity implements [`SplitEntity`]: it names its relational table
//! and document collection, validates caller input, lists the relational
//! records it references, and partitions input fields between the two stores.
//! Relational-only directory tables live in [`directory`].

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod appointment;
pub mod directory;
pub mod feedback;
pub mod fields;
pub mod owner;
pub mod payment;
pub mod product;
pub mod promotion;
pub mod query;
pub mod reservation;
pub mod service;

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::CollectionSpec;
use crate::core::FieldMap;
use crate::core::RecordId;
use crate::core::TableSpec;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use appointment::Appointment;
pub use feedback::Feedback;
pub use owner::Owner;
pub use product::Product;
pub use query::ListParam;
pub use query::ListQuery;
pub use reservation::Reservation;
pub use service::Service;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Caller input rejected before any store is touched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required fields are absent or empty.
    #[error("missing required fields: {}", .0.join(", "))]
    Missing(Vec<&'static str>),
    /// A field is present but malformed.
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// Human-readable reason.
        reason: String,
    },
}

impl ValidationError {
    /// Builds an invalid-field error.
    #[must_use]
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

// ============================================================================
// SECTION: Entity Contract
// ============================================================================

/// Whether a mapper is building a new entity or rewriting an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// New entity; defaults are applied.
    Create,
    /// Existing entity; only supplied fields are written.
    Update,
}

/// Relational record that must exist and be live before a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
    /// Referenced table.
    pub table: &'static TableSpec,
    /// Referenced key.
    pub id: RecordId,
    /// Input field that carried the key.
    pub field: &'static str,
}

/// Store-specific field changes produced by a workflow operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transition {
    /// Relational columns to update.
    pub relational: FieldMap,
    /// Document fields to merge.
    pub document: FieldMap,
    /// Records the new values point at; checked before anything is written.
    pub references: Vec<Reference>,
}

impl Transition {
    /// Builds a document-only transition.
    #[must_use]
    pub fn document(document: FieldMap) -> Self {
        Self {
            relational: FieldMap::new(),
            document,
            references: Vec::new(),
        }
    }
}

/// Strategy describing how one entity splits across the two stores.
pub trait SplitEntity: Send + Sync + 'static {
    /// Entity label used in messages and logs.
    const NAME: &'static str;
    /// Document status written when the entity is soft-deleted.
    const RETIRED_DOCUMENT_STATUS: &'static str = "inactive";
    /// Whether the entity supports soft delete.
    const DELETABLE: bool = true;
    /// Query parameters accepted by list requests.
    const LIST_PARAMS: &'static [ListParam] = &[];

    /// Relational table descriptor.
    fn table() -> &'static TableSpec;

    /// Document collection descriptor.
    fn collection() -> &'static CollectionSpec;

    /// Checks required fields.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when required input is missing.
    fn validate(input: &FieldMap, mode: WriteMode) -> Result<(), ValidationError>;

    /// Lists referenced records that must be live.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when a reference key is malformed.
    fn references(input: &FieldMap) -> Result<Vec<Reference>, ValidationError>;

    /// Maps input to relational columns.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when a field is malformed.
    fn relational_fields(input: &FieldMap, mode: WriteMode) -> Result<FieldMap, ValidationError>;

    /// Maps input to document fields; the cross-reference is added by the coordinator.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when a field is malformed.
    fn document_fields(input: &FieldMap, mode: WriteMode) -> Result<FieldMap, ValidationError>;
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Every relational table, in dependency order.
pub static ALL_TABLES: [&TableSpec; 11] = [
    &directory::CLIENTS,
    &directory::PETS,
    &directory::STAFF,
    &service::SERVICES,
    &product::PRODUCTS,
    &owner::OWNERS,
    &appointment::APPOINTMENTS,
    &payment::PAYMENTS,
    &promotion::PROMOTIONS,
    &feedback::FEEDBACK,
    &reservation::RESERVATIONS,
];

/// Every document collection.
pub static ALL_COLLECTIONS: [&CollectionSpec; 6] = [
    &appointment::APPOINTMENT_DETAILS,
    &feedback::FEEDBACK_DETAILS,
    &product::PRODUCT_DETAILS,
    &service::SERVICE_DETAILS,
    &owner::OWNER_DETAILS,
    &reservation::RESERVATION_DETAILS,
];
