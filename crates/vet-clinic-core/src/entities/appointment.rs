// crates/vet-clinic-core/src/entities/appointment.rs
// ============================================================================
// Module: Appointment Entity
// Description: Appointment split between the schedule table and clinical details.
// Purpose: Define appointment mapping, validation, and workflow transitions.
// Dependencies: crate::{core, entities, interfaces}, serde_json
// ============================================================================

//! ## Overview
//! The relational side holds who, what, and when: client, pet, service, slot,
//! status, and the assigned staff member. The document side holds the
//! clinical narrative and the workflow status mirrored from the relational
//! status.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use serde_json::json;

use crate::core::AppointmentStatus;
use crate::core::CollectionSpec;
use crate::core::ColumnSpec;
use crate::core::FieldMap;
use crate::core::JoinColumn;
use crate::core::JoinSpec;
use crate::core::StatusSpec;
use crate::core::TableSpec;
use crate::core::time::now_rfc3339;
use crate::entities::ListQuery;
use crate::entities::Reference;
use crate::entities::SplitEntity;
use crate::entities::Transition;
use crate::entities::ValidationError;
use crate::entities::WriteMode;
use crate::entities::directory::CLIENTS;
use crate::entities::directory::PETS;
use crate::entities::directory::STAFF;
use crate::entities::fields;
use crate::entities::query::ListParam;
use crate::entities::query::ParamKind;
use crate::entities::service::SERVICES;
use crate::interfaces::Filter;

// ============================================================================
// SECTION: Descriptors
// ============================================================================

/// Appointment schedule table.
pub static APPOINTMENTS: TableSpec = TableSpec {
    name: "appointments",
    columns: &[
        ColumnSpec::integer("client_id", "clientId"),
        ColumnSpec::integer("pet_id", "petId"),
        ColumnSpec::integer("service_id", "serviceId"),
        ColumnSpec::text("date", "date"),
        ColumnSpec::text("time", "time"),
        ColumnSpec::text("status", "status"),
        ColumnSpec::integer("staff_id", "staffId").nullable(),
        ColumnSpec::text("created_at", "createdAt"),
        ColumnSpec::text("updated_at", "updatedAt"),
    ],
    status: Some(StatusSpec {
        column: "status",
        initial: "scheduled",
        retired: "cancelled",
    }),
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
            table: "pets",
            local_column: "pet_id",
            columns: &[
                JoinColumn {
                    column: "name",
                    alias: "petName",
                    encrypted: true,
                },
                JoinColumn {
                    column: "species",
                    alias: "petSpecies",
                    encrypted: true,
                },
            ],
        },
        JoinSpec {
            table: "services",
            local_column: "service_id",
            columns: &[
                JoinColumn {
                    column: "name",
                    alias: "serviceName",
                    encrypted: true,
                },
                JoinColumn {
                    column: "price",
                    alias: "servicePrice",
                    encrypted: false,
                },
            ],
        },
        JoinSpec {
            table: "staff",
            local_column: "staff_id",
            columns: &[JoinColumn {
                column: "name",
                alias: "staffName",
                encrypted: true,
            }],
        },
    ],
};

/// Appointment clinical details collection.
pub static APPOINTMENT_DETAILS: CollectionSpec = CollectionSpec {
    name: "appointments",
    cross_ref_field: "appointmentSqlId",
    status_field: Some("status"),
};

/// Fields every appointment write must carry.
const REQUIRED: [&str; 5] = ["clientId", "petId", "serviceId", "date", "time"];

// ============================================================================
// SECTION: Entity
// ============================================================================

/// Appointment split entity.
#[derive(Debug, Clone, Copy)]
pub struct Appointment;

impl SplitEntity for Appointment {
    const NAME: &'static str = "appointment";
    const RETIRED_DOCUMENT_STATUS: &'static str = "cancelled";
    const LIST_PARAMS: &'static [ListParam] = &[
        ListParam::relational("clientId", "client_id", ParamKind::RecordId),
        ListParam::relational("staffId", "staff_id", ParamKind::RecordId),
        ListParam::relational("status", "status", ParamKind::OneOf(&AppointmentStatus::NAMES)),
        ListParam::relational("date", "date", ParamKind::Date),
    ];

    fn table() -> &'static TableSpec {
        &APPOINTMENTS
    }

    fn collection() -> &'static CollectionSpec {
        &APPOINTMENT_DETAILS
    }

    fn validate(input: &FieldMap, _mode: WriteMode) -> Result<(), ValidationError> {
        fields::require(input, &REQUIRED)
    }

    fn references(input: &FieldMap) -> Result<Vec<Reference>, ValidationError> {
        let mut references = vec![
            Reference {
                table: &CLIENTS,
                id: fields::required_record_id(input, "clientId")?,
                field: "clientId",
            },
            Reference {
                table: &PETS,
                id: fields::required_record_id(input, "petId")?,
                field: "petId",
            },
            Reference {
                table: &SERVICES,
                id: fields::required_record_id(input, "serviceId")?,
                field: "serviceId",
            },
        ];
        if let Some(staff) = fields::optional_record_id(input, "staffId")? {
            references.push(Reference {
                table: &STAFF,
                id: staff,
                field: "staffId",
            });
        }
        Ok(references)
    }

    fn relational_fields(input: &FieldMap, mode: WriteMode) -> Result<FieldMap, ValidationError> {
        let mut row = FieldMap::new();
        row.insert("client_id".into(), fields::required_record_id(input, "clientId")?.get().into());
        row.insert("pet_id".into(), fields::required_record_id(input, "petId")?.get().into());
        row.insert(
            "service_id".into(),
            fields::required_record_id(input, "serviceId")?.get().into(),
        );
        fields::put(&mut row, "date", fields::date(input, "date")?);
        fields::put(&mut row, "time", fields::clock(input, "time")?);
        let staff = fields::optional_record_id(input, "staffId")?;
        row.insert("staff_id".into(), staff.map_or(Value::Null, |id| id.get().into()));
        match mode {
            WriteMode::Create => {
                row.insert("status".into(), AppointmentStatus::Scheduled.as_str().into());
            }
            WriteMode::Update => {
                let status = optional_status(input)?.map(AppointmentStatus::as_str);
                fields::put(&mut row, "status", status);
            }
        }
        Ok(row)
    }

    fn document_fields(input: &FieldMap, mode: WriteMode) -> Result<FieldMap, ValidationError> {
        let mut document = fields::defaults(
            mode,
            json!({
                "motive": "",
                "symptoms": "",
                "priorDiagnosis": "",
                "treatmentHistory": [],
                "notes": "",
                "status": AppointmentStatus::Scheduled.workflow().as_str(),
                "attended": false,
                "actualVisitTime": null,
            }),
        );
        fields::put(&mut document, "clientRef", fields::text(input, "clientId"));
        fields::put(&mut document, "petRef", fields::text(input, "petId"));
        fields::put(&mut document, "motive", fields::text(input, "motive"));
        fields::put(&mut document, "symptoms", fields::text(input, "symptoms"));
        fields::put(&mut document, "priorDiagnosis", fields::text(input, "priorDiagnosis"));
        let history = fields::string_list(input, "treatmentHistory")?;
        fields::put(&mut document, "treatmentHistory", history);
        fields::put(&mut document, "notes", fields::text(input, "notes"));
        if mode == WriteMode::Update {
            fields::put(
                &mut document,
                "status",
                optional_status(input)?.map(|status| status.workflow().as_str()),
            );
        }
        Ok(document)
    }
}

// ============================================================================
// SECTION: Workflow
// ============================================================================

/// Parses the optional `status` input field.
fn optional_status(input: &FieldMap) -> Result<Option<AppointmentStatus>, ValidationError> {
    fields::text(input, "status")
        .map(|value| {
            AppointmentStatus::parse(&value).ok_or_else(|| {
                ValidationError::invalid(
                    "status",
                    "expected one of scheduled, confirmed, cancelled, completed",
                )
            })
        })
        .transpose()
}

/// Plans a status change, mirroring the workflow status into the document.
///
/// Completion stamps the actual visit time; `notes` and `attended` are
/// carried over when supplied.
///
/// # Errors
///
/// Returns [`ValidationError`] when the status is missing or unknown.
pub fn status_change(input: &FieldMap) -> Result<Transition, ValidationError> {
    let status = optional_status(input)?.ok_or_else(|| ValidationError::Missing(vec!["status"]))?;
    let mut transition = Transition::default();
    transition.relational.insert("status".into(), status.as_str().into());
    transition.document.insert("status".into(), status.workflow().as_str().into());
    fields::put(&mut transition.document, "notes", fields::text(input, "notes"));
    fields::put(&mut transition.document, "attended", fields::flag(input, "attended")?);
    if status == AppointmentStatus::Completed {
        transition.document.insert("actualVisitTime".into(), now_rfc3339().into());
    }
    Ok(transition)
}

/// Plans a reschedule of date, time, or assigned staff.
///
/// A `reason` is prepended to the existing document notes.
///
/// # Errors
///
/// Returns [`ValidationError`] when none of date, time, or staff is supplied
/// or a value is malformed. A new staff member is checked as a reference
/// before anything is written.
pub fn reschedule(
    input: &FieldMap,
    current_document: Option<&FieldMap>,
) -> Result<Transition, ValidationError> {
    let date = fields::date(input, "date")?;
    let time = fields::clock(input, "time")?;
    let staff = fields::optional_record_id(input, "staffId")?;
    if date.is_none() && time.is_none() && staff.is_none() {
        return Err(ValidationError::invalid(
            "date",
            "provide at least one of date, time, or staffId",
        ));
    }
    let mut transition = Transition::default();
    fields::put(&mut transition.relational, "date", date);
    fields::put(&mut transition.relational, "time", time);
    if let Some(id) = staff {
        transition.relational.insert("staff_id".into(), id.get().into());
        transition.references.push(Reference {
            table: &STAFF,
            id,
            field: "staffId",
        });
    }
    if let Some(reason) = fields::text(input, "reason") {
        let previous = current_document
            .and_then(|document| document.get("notes"))
            .and_then(Value::as_str)
            .unwrap_or_default();
        let notes = format!("Rescheduled: {reason}. {previous}");
        transition.document.insert("notes".into(), notes.trim_end().into());
    }
    Ok(transition)
}

/// Builds the calendar query: live bookings between two dates, optionally
/// for one staff member, in date and time order.
///
/// # Errors
///
/// Returns [`ValidationError`] when either bound is missing or malformed, or
/// when the range ends before it starts.
pub fn calendar_query(input: &FieldMap) -> Result<ListQuery, ValidationError> {
    fields::require(input, &["from", "to"])?;
    let from = fields::date(input, "from")?.ok_or_else(|| ValidationError::Missing(vec!["from"]))?;
    let to = fields::date(input, "to")?.ok_or_else(|| ValidationError::Missing(vec!["to"]))?;
    if to < from {
        return Err(ValidationError::invalid("to", "must not be before from"));
    }
    let mut filters = vec![
        Filter::at_least("date", from),
        Filter::at_most("date", to),
        Filter::any_of("status", live_statuses()),
    ];
    if let Some(staff) = fields::optional_record_id(input, "staffId")? {
        filters.push(Filter::eq("staff_id", staff.get()));
    }
    Ok(ListQuery::relational(filters).order_by("date", false).order_by("time", false))
}

/// Statuses that hold a slot.
fn live_statuses() -> Vec<Value> {
    vec![AppointmentStatus::Scheduled.as_str().into(), AppointmentStatus::Confirmed.as_str().into()]
}

/// Builds the filters selecting live bookings in a slot.
///
/// # Errors
///
/// Returns [`ValidationError`] when the date or time is missing or malformed.
pub fn slot_filters(input: &FieldMap) -> Result<Vec<Filter>, ValidationError> {
    fields::require(input, &["date", "time"])?;
    let date = fields::date(input, "date")?.ok_or_else(|| ValidationError::Missing(vec!["date"]))?;
    let time = fields::clock(input, "time")?.ok_or_else(|| ValidationError::Missing(vec!["time"]))?;
    Ok(vec![
        Filter::eq("date", date),
        Filter::eq("time", time),
        Filter::any_of("status", live_statuses()),
    ])
}
