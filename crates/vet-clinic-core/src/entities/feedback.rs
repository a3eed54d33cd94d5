// crates/vet-clinic-core/src/entities/feedback.rs
// ============================================================================
// Module: Feedback Entity
// Description: Client feedback split between the comment row and rating details.
// Purpose: Define feedback mapping, validation, and the staff response transition.
// Dependencies: crate::{core, entities}, serde_json
// ============================================================================

//! ## Overview
//! The relational row keeps the client and comment. Rating, category, and the
//! staff response live in the document. Feedback is never deleted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::json;

use crate::core::CollectionSpec;
use crate::core::ColumnSpec;
use crate::core::FeedbackCategory;
use crate::core::FieldMap;
use crate::core::JoinColumn;
use crate::core::JoinSpec;
use crate::core::TableSpec;
use crate::core::time::now_rfc3339;
use crate::entities::Reference;
use crate::entities::SplitEntity;
use crate::entities::Transition;
use crate::entities::ValidationError;
use crate::entities::WriteMode;
use crate::entities::directory::CLIENTS;
use crate::entities::fields;
use crate::entities::query::ListParam;
use crate::entities::query::ParamKind;

// ============================================================================
// SECTION: Descriptors
// ============================================================================

/// Feedback comment table.
pub static FEEDBACK: TableSpec = TableSpec {
    name: "feedback",
    columns: &[
        ColumnSpec::integer("client_id", "clientId"),
        ColumnSpec::text("comment", "comment"),
        ColumnSpec::text("created_at", "createdAt"),
        ColumnSpec::text("updated_at", "updatedAt"),
    ],
    status: None,
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

/// Feedback rating and response collection.
pub static FEEDBACK_DETAILS: CollectionSpec = CollectionSpec {
    name: "feedback",
    cross_ref_field: "feedbackSqlId",
    status_field: None,
};

// ============================================================================
// SECTION: Entity
// ============================================================================

/// Feedback split entity.
#[derive(Debug, Clone, Copy)]
pub struct Feedback;

impl SplitEntity for Feedback {
    const NAME: &'static str = "feedback";
    const DELETABLE: bool = false;
    const LIST_PARAMS: &'static [ListParam] = &[
        ListParam::relational("clientId", "client_id", ParamKind::RecordId),
        ListParam::document("responded", "responded", ParamKind::Flag),
        ListParam::document("rating", "rating", ParamKind::Rating),
    ];

    fn table() -> &'static TableSpec {
        &FEEDBACK
    }

    fn collection() -> &'static CollectionSpec {
        &FEEDBACK_DETAILS
    }

    fn validate(input: &FieldMap, mode: WriteMode) -> Result<(), ValidationError> {
        match mode {
            WriteMode::Create => fields::require(input, &["clientId", "comment", "rating"])?,
            WriteMode::Update => fields::require(input, &["clientId", "comment"])?,
        }
        fields::rating(input, "rating")?;
        category(input)?;
        Ok(())
    }

    fn references(input: &FieldMap) -> Result<Vec<Reference>, ValidationError> {
        Ok(vec![Reference {
            table: &CLIENTS,
            id: fields::required_record_id(input, "clientId")?,
            field: "clientId",
        }])
    }

    fn relational_fields(input: &FieldMap, _mode: WriteMode) -> Result<FieldMap, ValidationError> {
        let mut row = FieldMap::new();
        row.insert("client_id".into(), fields::required_record_id(input, "clientId")?.get().into());
        row.insert("comment".into(), fields::required_text(input, "comment")?.into());
        Ok(row)
    }

    fn document_fields(input: &FieldMap, mode: WriteMode) -> Result<FieldMap, ValidationError> {
        let mut document = fields::defaults(
            mode,
            json!({
                "category": FeedbackCategory::Service.as_str(),
                "anonymous": false,
                "responded": false,
                "response": "",
                "respondedAt": null,
            }),
        );
        fields::put(&mut document, "clientRef", fields::text(input, "clientId"));
        fields::put(&mut document, "rating", fields::rating(input, "rating")?);
        fields::put(&mut document, "category", category(input)?.map(FeedbackCategory::as_str));
        fields::put(&mut document, "anonymous", fields::flag(input, "anonymous")?);
        Ok(document)
    }
}

/// Parses the optional feedback category.
fn category(input: &FieldMap) -> Result<Option<FeedbackCategory>, ValidationError> {
    fields::text(input, "category")
        .map(|value| {
            FeedbackCategory::parse(&value).ok_or_else(|| {
                ValidationError::invalid(
                    "category",
                    "expected one of service, product, care, other",
                )
            })
        })
        .transpose()
}

// ============================================================================
// SECTION: Workflow
// ============================================================================

/// Plans a staff response; touches only the document.
///
/// # Errors
///
/// Returns [`ValidationError::Missing`] when the response is empty.
pub fn respond(input: &FieldMap) -> Result<Transition, ValidationError> {
    let response = fields::required_text(input, "response")?;
    let mut document = FieldMap::new();
    document.insert("responded".into(), true.into());
    document.insert("response".into(), response.into());
    document.insert("respondedAt".into(), now_rfc3339().into());
    Ok(Transition::document(document))
}
