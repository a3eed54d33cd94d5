// crates/vet-clinic-core/src/entities/owner.rs
// ============================================================================
// Module: Owner Entity
// Description: Pet owner split between identity row and contact details.
// Purpose: Define owner mapping and validation.
// Dependencies: crate::{core, entities}, serde_json
// ============================================================================

//! ## Overview
//! Identity fields (name, national id, email) are encrypted on the relational
//! side. Address, contact preference, and internal notes live in the document.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::json;

use crate::core::CollectionSpec;
use crate::core::ColumnSpec;
use crate::core::ContactPreference;
use crate::core::FieldMap;
use crate::core::RecordStatus;
use crate::core::StatusSpec;
use crate::core::TableSpec;
use crate::entities::Reference;
use crate::entities::SplitEntity;
use crate::entities::ValidationError;
use crate::entities::WriteMode;
use crate::entities::fields;
use crate::entities::query::ListParam;
use crate::entities::query::ParamKind;

// ============================================================================
// SECTION: Descriptors
// ============================================================================

/// Owner identity table.
pub static OWNERS: TableSpec = TableSpec {
    name: "owners",
    columns: &[
        ColumnSpec::text("name", "name").encrypted(),
        ColumnSpec::text("national_id", "nationalId").encrypted(),
        ColumnSpec::text("email", "email").encrypted(),
        ColumnSpec::text("status", "status"),
        ColumnSpec::text("created_at", "createdAt"),
        ColumnSpec::text("updated_at", "updatedAt"),
    ],
    status: Some(StatusSpec {
        column: "status",
        initial: "active",
        retired: "inactive",
    }),
    joins: &[],
};

/// Owner contact detail collection.
pub static OWNER_DETAILS: CollectionSpec = CollectionSpec {
    name: "owners",
    cross_ref_field: "ownerSqlId",
    status_field: Some("status"),
};

// ============================================================================
// SECTION: Entity
// ============================================================================

/// Owner split entity.
#[derive(Debug, Clone, Copy)]
pub struct Owner;

impl SplitEntity for Owner {
    const NAME: &'static str = "owner";
    const LIST_PARAMS: &'static [ListParam] = &[ListParam::relational(
        "status",
        "status",
        ParamKind::OneOf(&RecordStatus::NAMES),
    )];

    fn table() -> &'static TableSpec {
        &OWNERS
    }

    fn collection() -> &'static CollectionSpec {
        &OWNER_DETAILS
    }

    fn validate(input: &FieldMap, _mode: WriteMode) -> Result<(), ValidationError> {
        fields::require(input, &["name", "nationalId", "email"])?;
        let email = fields::required_text(input, "email")?;
        if !email.contains('@') {
            return Err(ValidationError::invalid("email", "expected an email address"));
        }
        contact_preference(input)?;
        Ok(())
    }

    fn references(_input: &FieldMap) -> Result<Vec<Reference>, ValidationError> {
        Ok(Vec::new())
    }

    fn relational_fields(input: &FieldMap, mode: WriteMode) -> Result<FieldMap, ValidationError> {
        let mut row = FieldMap::new();
        row.insert("name".into(), fields::required_text(input, "name")?.into());
        row.insert("national_id".into(), fields::required_text(input, "nationalId")?.into());
        row.insert("email".into(), fields::required_text(input, "email")?.to_lowercase().into());
        if mode == WriteMode::Create {
            row.insert("status".into(), RecordStatus::Active.as_str().into());
        }
        Ok(row)
    }

    fn document_fields(input: &FieldMap, mode: WriteMode) -> Result<FieldMap, ValidationError> {
        let mut document = fields::defaults(
            mode,
            json!({
                "address": "",
                "alternatePhone": "",
                "contactPreference": ContactPreference::Call.as_str(),
                "acceptsNotifications": true,
                "internalNotes": "",
                "references": [],
                "status": RecordStatus::Active.as_str(),
            }),
        );
        fields::put(&mut document, "address", fields::text(input, "address"));
        fields::put(&mut document, "alternatePhone", fields::text(input, "alternatePhone"));
        fields::put(
            &mut document,
            "contactPreference",
            contact_preference(input)?.map(ContactPreference::as_str),
        );
        let notifications = fields::flag(input, "acceptsNotifications")?;
        fields::put(&mut document, "acceptsNotifications", notifications);
        fields::put(&mut document, "internalNotes", fields::text(input, "internalNotes"));
        fields::put(&mut document, "references", fields::string_list(input, "references")?);
        Ok(document)
    }
}

/// Parses the optional contact preference.
fn contact_preference(input: &FieldMap) -> Result<Option<ContactPreference>, ValidationError> {
    fields::text(input, "contactPreference")
        .map(|value| {
            ContactPreference::parse(&value).ok_or_else(|| {
                ValidationError::invalid(
                    "contactPreference",
                    "expected one of call, whatsapp, email",
                )
            })
        })
        .transpose()
}
