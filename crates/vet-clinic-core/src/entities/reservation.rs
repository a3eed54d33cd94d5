// crates/vet-clinic-core/src/entities/reservation.rs
// ============================================================================
// Module: Reservation Entity
// Description: Service reservation split between booking row and workflow details.
// Purpose: Define reservation mapping and its confirm/cancel/complete/rate workflow.
// Dependencies: crate::{core, entities}, serde_json
// ============================================================================

//! ## Overview
//! The relational row has no status column; reservation workflow state lives
//! entirely in the document. Soft delete therefore only marks the document
//! cancelled and touches the relational `updated_at`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use serde_json::json;

use crate::core::CollectionSpec;
use crate::core::ColumnSpec;
use crate::core::FieldMap;
use crate::core::JoinColumn;
use crate::core::JoinSpec;
use crate::core::TableSpec;
use crate::core::WorkflowStatus;
use crate::entities::Reference;
use crate::entities::SplitEntity;
use crate::entities::Transition;
use crate::entities::ValidationError;
use crate::entities::WriteMode;
use crate::entities::directory::CLIENTS;
use crate::entities::fields;
use crate::entities::query::ListParam;
use crate::entities::query::ParamKind;
use crate::entities::service::SERVICES;

// ============================================================================
// SECTION: Descriptors
// ============================================================================

/// Reservation booking table.
pub static RESERVATIONS: TableSpec = TableSpec {
    name: "reservations",
    columns: &[
        ColumnSpec::integer("client_id", "clientId"),
        ColumnSpec::integer("service_id", "serviceId"),
        ColumnSpec::text("reservation_date", "reservationDate"),
        ColumnSpec::text("created_at", "createdAt"),
        ColumnSpec::text("updated_at", "updatedAt"),
    ],
    status: None,
    joins: &[
        JoinSpec {
            table: "clients",
            local_column: "client_id",
            columns: &[JoinColumn {
                column: "name",
                alias: "clientName",
                encrypted: true,
            }],
        },
        JoinSpec {
            table: "services",
            local_column: "service_id",
            columns: &[JoinColumn {
                column: "name",
                alias: "serviceName",
                encrypted: true,
            }],
        },
    ],
};

/// Reservation workflow collection.
pub static RESERVATION_DETAILS: CollectionSpec = CollectionSpec {
    name: "reservations",
    cross_ref_field: "reservationSqlId",
    status_field: Some("status"),
};

/// Cancellation reason recorded when none is given.
const DEFAULT_CANCELLATION_REASON: &str = "not specified";

// ============================================================================
// SECTION: Entity
// ============================================================================

/// Reservation split entity.
#[derive(Debug, Clone, Copy)]
pub struct Reservation;

impl SplitEntity for Reservation {
    const NAME: &'static str = "reservation";
    const RETIRED_DOCUMENT_STATUS: &'static str = "cancelled";
    const LIST_PARAMS: &'static [ListParam] = &[
        ListParam::relational("clientId", "client_id", ParamKind::RecordId),
        ListParam::relational("date", "reservation_date", ParamKind::Date),
        ListParam::document("status", "status", ParamKind::OneOf(&WorkflowStatus::NAMES)),
    ];

    fn table() -> &'static TableSpec {
        &RESERVATIONS
    }

    fn collection() -> &'static CollectionSpec {
        &RESERVATION_DETAILS
    }

    fn validate(input: &FieldMap, mode: WriteMode) -> Result<(), ValidationError> {
        match mode {
            WriteMode::Create => {
                fields::require(input, &["clientId", "serviceId", "reservationDate"])?;
            }
            WriteMode::Update => fields::require(input, &["reservationDate"])?,
        }
        fields::date(input, "reservationDate")?;
        workflow_status(input)?;
        Ok(())
    }

    fn references(input: &FieldMap) -> Result<Vec<Reference>, ValidationError> {
        let mut references = Vec::new();
        if let Some(id) = fields::optional_record_id(input, "clientId")? {
            references.push(Reference {
                table: &CLIENTS,
                id,
                field: "clientId",
            });
        }
        if let Some(id) = fields::optional_record_id(input, "serviceId")? {
            references.push(Reference {
                table: &SERVICES,
                id,
                field: "serviceId",
            });
        }
        Ok(references)
    }

    fn relational_fields(input: &FieldMap, mode: WriteMode) -> Result<FieldMap, ValidationError> {
        let mut row = FieldMap::new();
        match mode {
            WriteMode::Create => {
                let client = fields::required_record_id(input, "clientId")?;
                let service = fields::required_record_id(input, "serviceId")?;
                row.insert("client_id".into(), client.get().into());
                row.insert("service_id".into(), service.get().into());
            }
            WriteMode::Update => {
                let client = fields::optional_record_id(input, "clientId")?;
                let service = fields::optional_record_id(input, "serviceId")?;
                fields::put(&mut row, "client_id", client.map(|id| id.get()));
                fields::put(&mut row, "service_id", service.map(|id| id.get()));
            }
        }
        fields::put(&mut row, "reservation_date", fields::date(input, "reservationDate")?);
        Ok(row)
    }

    fn document_fields(input: &FieldMap, mode: WriteMode) -> Result<FieldMap, ValidationError> {
        let mut document = fields::defaults(
            mode,
            json!({
                "status": WorkflowStatus::Pending.as_str(),
                "clientComments": "",
                "clientConfirmed": false,
                "cancellationReason": null,
                "handledBy": null,
                "rating": null,
            }),
        );
        fields::put(&mut document, "clientRef", fields::text(input, "clientId"));
        fields::put(&mut document, "serviceRef", fields::text(input, "serviceId"));
        fields::put(&mut document, "clientComments", fields::text(input, "clientComments"));
        if mode == WriteMode::Update {
            let status = workflow_status(input)?;
            fields::put(&mut document, "status", status.map(WorkflowStatus::as_str));
            fields::put(&mut document, "handledBy", fields::text(input, "handledBy"));
        }
        Ok(document)
    }
}

/// Parses an optional workflow status.
fn workflow_status(input: &FieldMap) -> Result<Option<WorkflowStatus>, ValidationError> {
    fields::text(input, "status")
        .map(|raw| {
            WorkflowStatus::parse(&raw).ok_or_else(|| {
                ValidationError::invalid(
                    "status",
                    format!("expected one of {}", WorkflowStatus::NAMES.join(", ")),
                )
            })
        })
        .transpose()
}

// ============================================================================
// SECTION: Workflow
// ============================================================================

/// Plans a client confirmation.
#[must_use]
pub fn confirm() -> Transition {
    let mut document = FieldMap::new();
    document.insert("status".into(), WorkflowStatus::Confirmed.as_str().into());
    document.insert("clientConfirmed".into(), true.into());
    Transition::document(document)
}

/// Plans a cancellation with an optional reason.
#[must_use]
pub fn cancel(input: &FieldMap) -> Transition {
    let reason =
        fields::text(input, "reason").unwrap_or_else(|| DEFAULT_CANCELLATION_REASON.to_string());
    let mut document = FieldMap::new();
    document.insert("status".into(), WorkflowStatus::Cancelled.as_str().into());
    document.insert("cancellationReason".into(), reason.into());
    Transition::document(document)
}

/// Plans completion, recording the staff member who handled it.
#[must_use]
pub fn complete(input: &FieldMap) -> Transition {
    let mut document = FieldMap::new();
    document.insert("status".into(), WorkflowStatus::Completed.as_str().into());
    document.insert(
        "handledBy".into(),
        fields::text(input, "handledBy").map_or(Value::Null, Value::from),
    );
    Transition::document(document)
}

/// Plans a client rating.
///
/// # Errors
///
/// Returns [`ValidationError`] when the rating is missing or outside 1 to 5.
pub fn rate(input: &FieldMap) -> Result<Transition, ValidationError> {
    let rating =
        fields::rating(input, "rating")?.ok_or_else(|| ValidationError::Missing(vec!["rating"]))?;
    let mut document = FieldMap::new();
    document.insert("rating".into(), rating.into());
    Ok(Transition::document(document))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic, reason = "Test-only assertions.")]

    use serde_json::Value;
    use serde_json::json;

    use super::Reservation;
    use crate::core::FieldMap;
    use crate::entities::SplitEntity;
    use crate::entities::ValidationError;
    use crate::entities::WriteMode;

    fn input(value: Value) -> FieldMap {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn updates_only_require_the_reservation_date() {
        let update = input(json!({"reservationDate": "2026-05-02"}));
        Reservation::validate(&update, WriteMode::Update).unwrap();
        assert!(Reservation::references(&update).unwrap().is_empty());
        let row = Reservation::relational_fields(&update, WriteMode::Update).unwrap();
        assert_eq!(row, input(json!({"reservation_date": "2026-05-02"})));

        let create = Reservation::validate(&update, WriteMode::Create).unwrap_err();
        assert_eq!(create, ValidationError::Missing(vec!["clientId", "serviceId"]));
    }

    #[test]
    fn updates_map_workflow_status_and_handler() {
        let update = input(json!({
            "reservationDate": "2026-05-02",
            "serviceId": 3,
            "status": "confirmed",
            "handledBy": "Dr. Vega",
        }));
        let references = Reservation::references(&update).unwrap();
        assert_eq!(references.len(), 1);
        assert_eq!(references[0].table.name, "services");
        let row = Reservation::relational_fields(&update, WriteMode::Update).unwrap();
        assert_eq!(row.get("service_id"), Some(&json!(3)));
        assert!(!row.contains_key("client_id"));
        let document = Reservation::document_fields(&update, WriteMode::Update).unwrap();
        assert_eq!(document.get("status"), Some(&json!("confirmed")));
        assert_eq!(document.get("handledBy"), Some(&json!("Dr. Vega")));
        assert_eq!(document.get("serviceRef"), Some(&json!("3")));
        assert!(!document.contains_key("clientRef"));
    }

    #[test]
    fn unknown_workflow_status_is_rejected() {
        let update = input(json!({"reservationDate": "2026-05-02", "status": "lost"}));
        let error = Reservation::validate(&update, WriteMode::Update).unwrap_err();
        assert!(matches!(error, ValidationError::Invalid { field: "status", .. }));
    }
}
