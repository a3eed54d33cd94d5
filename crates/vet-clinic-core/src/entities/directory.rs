// crates/vet-clinic-core/src/entities/directory.rs
// ============================================================================
// Module: Directory Tables
// Description: Relational-only clients, pets, and staff.
// Purpose: Describe the records split entities reference.
// Dependencies: crate::{core, entities}
// ============================================================================

//! ## Overview
//! Directory records have no document side. Client, pet, and staff rows are
//! built by [`directory_row`]; payments and promotions live in their own
//! modules. All of them are written through the relational directory service.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;

use crate::core::ColumnSpec;
use crate::core::FieldMap;
use crate::core::JoinColumn;
use crate::core::JoinSpec;
use crate::core::RecordStatus;
use crate::core::StatusSpec;
use crate::core::TableSpec;
use crate::entities::Reference;
use crate::entities::ValidationError;
use crate::entities::fields;
use crate::entities::query::ListParam;
use crate::entities::query::ParamKind;

// ============================================================================
// SECTION: Descriptors
// ============================================================================

/// Active/inactive status shared by directory tables.
const RECORD_STATUS: StatusSpec = StatusSpec {
    column: "status",
    initial: "active",
    retired: "inactive",
};

/// Clinic clients.
pub static CLIENTS: TableSpec = TableSpec {
    name: "clients",
    columns: &[
        ColumnSpec::text("name", "name").encrypted(),
        ColumnSpec::text("national_id", "nationalId").encrypted(),
        ColumnSpec::text("email", "email").encrypted().nullable(),
        ColumnSpec::text("phone", "phone").nullable(),
        ColumnSpec::text("status", "status"),
        ColumnSpec::text("created_at", "createdAt"),
    ],
    status: Some(RECORD_STATUS),
    joins: &[],
};

/// Client pets.
pub static PETS: TableSpec = TableSpec {
    name: "pets",
    columns: &[
        ColumnSpec::integer("client_id", "clientId"),
        ColumnSpec::text("name", "name").encrypted(),
        ColumnSpec::text("species", "species").encrypted(),
        ColumnSpec::text("breed", "breed").nullable(),
        ColumnSpec::text("status", "status"),
        ColumnSpec::text("created_at", "createdAt"),
    ],
    status: Some(RECORD_STATUS),
    joins: &[JoinSpec {
        table: "clients",
        local_column: "client_id",
        columns: &[JoinColumn {
            column: "name",
            alias: "clientName",
            encrypted: true,
        }],
    }],
};

/// Clinic staff.
pub static STAFF: TableSpec = TableSpec {
    name: "staff",
    columns: &[
        ColumnSpec::text("name", "name").encrypted(),
        ColumnSpec::text("email", "email").encrypted().nullable(),
        ColumnSpec::text("role", "role"),
        ColumnSpec::text("status", "status"),
        ColumnSpec::text("created_at", "createdAt"),
    ],
    status: Some(RECORD_STATUS),
    joins: &[],
};

/// List filters accepted for clients and staff.
pub const PERSON_PARAMS: [ListParam; 1] =
    [ListParam::relational("status", "status", ParamKind::OneOf(&RecordStatus::NAMES))];

/// List filters accepted for pets.
pub const PET_PARAMS: [ListParam; 2] = [
    ListParam::relational("clientId", "client_id", ParamKind::RecordId),
    ListParam::relational("status", "status", ParamKind::OneOf(&RecordStatus::NAMES)),
];

/// Role assigned to staff created without one.
const DEFAULT_STAFF_ROLE: &str = "veterinarian";

// ============================================================================
// SECTION: Row Builders
// ============================================================================

/// Validates directory input and builds the row plus its references.
///
/// # Errors
///
/// Returns [`ValidationError`] when required fields are missing or malformed.
pub fn directory_row(
    table: &'static TableSpec,
    input: &FieldMap,
) -> Result<(FieldMap, Vec<Reference>), ValidationError> {
    let mut row = FieldMap::new();
    let mut references = Vec::new();
    match table.name {
        "clients" => {
            fields::require(input, &["name", "nationalId"])?;
            row.insert("name".into(), fields::required_text(input, "name")?.into());
            row.insert("national_id".into(), fields::required_text(input, "nationalId")?.into());
            row.insert("email".into(), optional_text(input, "email"));
            row.insert("phone".into(), optional_text(input, "phone"));
        }
        "pets" => {
            fields::require(input, &["clientId", "name", "species"])?;
            let client = fields::required_record_id(input, "clientId")?;
            references.push(Reference {
                table: &CLIENTS,
                id: client,
                field: "clientId",
            });
            row.insert("client_id".into(), client.get().into());
            row.insert("name".into(), fields::required_text(input, "name")?.into());
            row.insert("species".into(), fields::required_text(input, "species")?.into());
            row.insert("breed".into(), optional_text(input, "breed"));
        }
        _ => {
            fields::require(input, &["name"])?;
            row.insert("name".into(), fields::required_text(input, "name")?.into());
            row.insert("email".into(), optional_text(input, "email"));
            let role =
                fields::text(input, "role").unwrap_or_else(|| DEFAULT_STAFF_ROLE.to_string());
            row.insert("role".into(), role.into());
        }
    }
    row.insert("status".into(), RecordStatus::Active.as_str().into());
    Ok((row, references))
}

/// Returns present text or null.
fn optional_text(input: &FieldMap, key: &str) -> Value {
    fields::text(input, key).map_or(Value::Null, Value::from)
}
