// crates/vet-clinic-core/src/core/mod.rs
// ============================================================================
// Module: Vet Clinic Core Types
// Description: Identifiers, table and collection descriptors, and status enums.
// Purpose: Provide stable, serializable types shared by stores and entities.
// Dependencies: serde, serde_json, time
// ============================================================================

//! ## Overview
//! Core types describe the shape of split entities: the relational table a
//! record lives in, the document collection that carries its supplementary
//! details, and the identifiers that join the two.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod identifiers;
pub mod schema;
pub mod status;
pub mod time;
pub mod verification;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use identifiers::DocumentId;
pub use identifiers::RecordId;
pub use schema::CREATED_AT;
pub use schema::CollectionSpec;
pub use schema::ColumnKind;
pub use schema::ColumnSpec;
pub use schema::DOCUMENT_CREATED_AT;
pub use schema::DOCUMENT_ID_FIELD;
pub use schema::DOCUMENT_UPDATED_AT;
pub use schema::FieldMap;
pub use schema::JoinColumn;
pub use schema::JoinSpec;
pub use schema::PRIMARY_KEY;
pub use schema::SchemaError;
pub use schema::StatusSpec;
pub use schema::TableSpec;
pub use schema::UPDATED_AT;
pub use status::AppointmentStatus;
pub use status::ContactPreference;
pub use status::DiscountType;
pub use status::FeedbackCategory;
pub use status::PaymentMethod;
pub use status::PaymentStatus;
pub use status::PromotionStatus;
pub use status::RecordStatus;
pub use status::WorkflowStatus;
pub use verification::Verification;
