// crates/vet-clinic-core/src/entities/payment.rs
// ============================================================================
// Module: Payment Table
// Description: Relational-only payments recorded against appointments.
// Purpose: Describe payment rows, their validation, and list filters.
// Dependencies: crate::{core, entities}
// ============================================================================

//! ## Overview
//! A payment belongs to one live appointment. New payments are recorded as
//! completed; updates rewrite amount, method, and status together. Reads
//! carry the appointment's date, time, and client through a join.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::ColumnSpec;
use crate::core::FieldMap;
use crate::core::JoinColumn;
use crate::core::JoinSpec;
use crate::core::PaymentMethod;
use crate::core::PaymentStatus;
use crate::core::StatusSpec;
use crate::core::TableSpec;
use crate::entities::Reference;
use crate::entities::ValidationError;
use crate::entities::WriteMode;
use crate::entities::appointment::APPOINTMENTS;
use crate::entities::fields;
use crate::entities::query::ListParam;
use crate::entities::query::ParamKind;

// ============================================================================
// SECTION: Descriptors
// ============================================================================

/// Payments per appointment.
pub static PAYMENTS: TableSpec = TableSpec {
    name: "payments",
    columns: &[
        ColumnSpec::integer("appointment_id", "appointmentId"),
        ColumnSpec::real("amount", "amount"),
        ColumnSpec::text("method", "method"),
        ColumnSpec::text("status", "status"),
        ColumnSpec::text("created_at", "createdAt"),
        ColumnSpec::text("updated_at", "updatedAt"),
    ],
    status: Some(StatusSpec {
        column: "status",
        initial: "completed",
        retired: "cancelled",
    }),
    joins: &[JoinSpec {
        table: "appointments",
        local_column: "appointment_id",
        columns: &[
            JoinColumn {
                column: "date",
                alias: "appointmentDate",
                encrypted: false,
            },
            JoinColumn {
                column: "time",
                alias: "appointmentTime",
                encrypted: false,
            },
            JoinColumn {
                column: "client_id",
                alias: "clientId",
                encrypted: false,
            },
        ],
    }],
};

/// List filters accepted for payments.
pub const PAYMENT_PARAMS: [ListParam; 3] = [
    ListParam::relational("appointmentId", "appointment_id", ParamKind::RecordId),
    ListParam::relational("status", "status", ParamKind::OneOf(&PaymentStatus::NAMES)),
    ListParam::relational("method", "method", ParamKind::OneOf(&PaymentMethod::NAMES)),
];

// ============================================================================
// SECTION: Rows
// ============================================================================

/// Validates payment input and builds the row plus its references.
///
/// # Errors
///
/// Returns [`ValidationError`] when required fields are missing, the amount
/// is not positive, or the method or status is unknown.
pub fn payment_row(
    input: &FieldMap,
    mode: WriteMode,
) -> Result<(FieldMap, Vec<Reference>), ValidationError> {
    let mut row = FieldMap::new();
    let mut references = Vec::new();
    match mode {
        WriteMode::Create => {
            fields::require(input, &["appointmentId", "amount", "method"])?;
            let appointment = fields::required_record_id(input, "appointmentId")?;
            references.push(Reference {
                table: &APPOINTMENTS,
                id: appointment,
                field: "appointmentId",
            });
            row.insert("appointment_id".into(), appointment.get().into());
            row.insert("status".into(), PaymentStatus::Completed.as_str().into());
        }
        WriteMode::Update => {
            fields::require(input, &["amount", "method", "status"])?;
            row.insert("status".into(), status(input)?.as_str().into());
        }
    }
    let amount = fields::non_negative_number(input, "amount")?;
    if amount <= 0.0 {
        return Err(ValidationError::invalid("amount", "must be greater than zero"));
    }
    row.insert("amount".into(), amount.into());
    row.insert("method".into(), method(input)?.as_str().into());
    Ok((row, references))
}

/// Parses the payment method.
fn method(input: &FieldMap) -> Result<PaymentMethod, ValidationError> {
    fields::text(input, "method").as_deref().and_then(PaymentMethod::parse).ok_or_else(|| {
        ValidationError::invalid(
            "method",
            format!("expected one of {}", PaymentMethod::NAMES.join(", ")),
        )
    })
}

/// Parses the payment status.
fn status(input: &FieldMap) -> Result<PaymentStatus, ValidationError> {
    fields::text(input, "status").as_deref().and_then(PaymentStatus::parse).ok_or_else(|| {
        ValidationError::invalid(
            "status",
            format!("expected one of {}", PaymentStatus::NAMES.join(", ")),
        )
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic, reason = "Test-only assertions.")]

    use serde_json::Value;
    use serde_json::json;

    use super::payment_row;
    use crate::core::FieldMap;
    use crate::entities::ValidationError;
    use crate::entities::WriteMode;

    fn input(value: Value) -> FieldMap {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn new_payments_are_completed_and_reference_their_appointment() {
        let (row, references) = payment_row(
            &input(json!({"appointmentId": 4, "amount": "25.5", "method": "card"})),
            WriteMode::Create,
        )
        .unwrap();
        assert_eq!(row.get("status"), Some(&json!("completed")));
        assert_eq!(row.get("amount"), Some(&json!(25.5)));
        assert_eq!(references.len(), 1);
        assert_eq!(references[0].table.name, "appointments");
    }

    #[test]
    fn amount_must_be_positive_and_method_known() {
        let zero = payment_row(
            &input(json!({"appointmentId": 4, "amount": 0, "method": "card"})),
            WriteMode::Create,
        );
        assert!(matches!(zero, Err(ValidationError::Invalid { field: "amount", .. })));
        let barter = payment_row(
            &input(json!({"appointmentId": 4, "amount": 10, "method": "barter"})),
            WriteMode::Create,
        );
        assert!(matches!(barter, Err(ValidationError::Invalid { field: "method", .. })));
    }

    #[test]
    fn updates_require_a_known_status() {
        let missing =
            payment_row(&input(json!({"amount": 10, "method": "cash"})), WriteMode::Update);
        assert_eq!(missing.unwrap_err(), ValidationError::Missing(vec!["status"]));
        let (row, references) = payment_row(
            &input(json!({"amount": 10, "method": "cash", "status": "refunded"})),
            WriteMode::Update,
        )
        .unwrap();
        assert_eq!(row.get("status"), Some(&json!("refunded")));
        assert!(!row.contains_key("appointment_id"));
        assert!(references.is_empty());
    }
}
