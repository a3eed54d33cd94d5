// crates/vet-clinic-core/src/entities/service.rs
// ============================================================================
// Module: Service Entity
// Description: Clinic service split between the priced row and extended details.
// Purpose: Define service mapping and validation.
// Dependencies: crate::{core, entities}, serde_json
// ============================================================================

//! ## Overview
//! Services are bookable offerings referenced by appointments and
//! reservations. Name and description are encrypted at rest.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::json;

use crate::core::CollectionSpec;
use crate::core::ColumnSpec;
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

/// Service catalog table.
pub static SERVICES: TableSpec = TableSpec {
    name: "services",
    columns: &[
        ColumnSpec::text("name", "name").encrypted(),
        ColumnSpec::text("description", "description").encrypted(),
        ColumnSpec::real("price", "price"),
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

/// Service detail collection.
pub static SERVICE_DETAILS: CollectionSpec = CollectionSpec {
    name: "services",
    cross_ref_field: "serviceSqlId",
    status_field: Some("status"),
};

/// Default appointment length.
const DEFAULT_DURATION_MINUTES: i64 = 60;

/// Free-text detail fields.
const TEXT_DETAILS: [&str; 3] = ["extendedDescription", "preparationNotes", "aftercareNotes"];

/// List-valued detail fields.
const LIST_DETAILS: [&str; 3] = ["requirements", "equipment", "tags"];

// ============================================================================
// SECTION: Entity
// ============================================================================

/// Service split entity.
#[derive(Debug, Clone, Copy)]
pub struct Service;

impl SplitEntity for Service {
    const NAME: &'static str = "service";
    const LIST_PARAMS: &'static [ListParam] = &[ListParam::relational(
        "status",
        "status",
        ParamKind::OneOf(&RecordStatus::NAMES),
    )];

    fn table() -> &'static TableSpec {
        &SERVICES
    }

    fn collection() -> &'static CollectionSpec {
        &SERVICE_DETAILS
    }

    fn validate(input: &FieldMap, _mode: WriteMode) -> Result<(), ValidationError> {
        fields::require(input, &["name", "description", "price"])?;
        fields::non_negative_number(input, "price")?;
        if fields::present(input, "durationMinutes").is_some()
            && fields::non_negative_integer(input, "durationMinutes")? == 0
        {
            return Err(ValidationError::invalid("durationMinutes", "must be positive"));
        }
        Ok(())
    }

    fn references(_input: &FieldMap) -> Result<Vec<Reference>, ValidationError> {
        Ok(Vec::new())
    }

    fn relational_fields(input: &FieldMap, mode: WriteMode) -> Result<FieldMap, ValidationError> {
        let mut row = FieldMap::new();
        row.insert("name".into(), fields::required_text(input, "name")?.into());
        row.insert("description".into(), fields::required_text(input, "description")?.into());
        row.insert("price".into(), fields::non_negative_number(input, "price")?.into());
        if mode == WriteMode::Create {
            row.insert("status".into(), RecordStatus::Active.as_str().into());
        }
        Ok(row)
    }

    fn document_fields(input: &FieldMap, mode: WriteMode) -> Result<FieldMap, ValidationError> {
        let mut document = fields::defaults(
            mode,
            json!({
                "extendedDescription": "",
                "requirements": [],
                "durationMinutes": DEFAULT_DURATION_MINUTES,
                "equipment": [],
                "preparationNotes": "",
                "aftercareNotes": "",
                "tags": [],
                "featured": false,
                "imageUrl": "",
                "status": RecordStatus::Active.as_str(),
            }),
        );
        for key in TEXT_DETAILS {
            fields::put(&mut document, key, fields::text(input, key));
        }
        for key in LIST_DETAILS {
            fields::put(&mut document, key, fields::string_list(input, key)?);
        }
        fields::put(&mut document, "durationMinutes", fields::integer(input, "durationMinutes")?);
        fields::put(&mut document, "featured", fields::flag(input, "featured")?);
        fields::put(&mut document, "imageUrl", fields::text(input, "imageUrl"));
        Ok(document)
    }
}
