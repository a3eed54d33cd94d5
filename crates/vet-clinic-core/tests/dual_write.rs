// crates/vet-clinic-core/tests/dual_write.rs
// ============================================================================
// Module: Dual-Write Coordinator Tests
// Description: Create, update, delete, transition, and read protocols.
// Purpose: Validate compensation, verification, and short-circuit guarantees.
// ============================================================================

//! ## Overview
//! Exercises the coordinator against fault-injecting in-memory stores:
//! - no orphaned relational row survives a failed create
//! - a successful create reads back as synchronized
//! - validation and reference failures write nothing
//! - update failures restore the relational snapshot

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use common::Harness;
use common::ScriptedLifecycle;
use common::fast_config;
use common::object;
use common::refused;
use serde_json::Value;
use serde_json::json;
use vet_clinic_core::ConnectionHealthMonitor;
use vet_clinic_core::CoordinatorConfig;
use vet_clinic_core::CoordinatorError;
use vet_clinic_core::DocumentStore;
use vet_clinic_core::Filter;
use vet_clinic_core::ListQuery;
use vet_clinic_core::RecordId;
use vet_clinic_core::RelationalStore;
use vet_clinic_core::SplitEntity;
use vet_clinic_core::StoreError;
use vet_clinic_core::TransientKind;
use vet_clinic_core::ValidationError;
use vet_clinic_core::entities::Appointment;
use vet_clinic_core::entities::Feedback;
use vet_clinic_core::entities::Product;
use vet_clinic_core::entities::Reservation;
use vet_clinic_core::entities::appointment;
use vet_clinic_core::entities::appointment::APPOINTMENT_DETAILS;
use vet_clinic_core::entities::appointment::APPOINTMENTS;
use vet_clinic_core::entities::directory::CLIENTS;
use vet_clinic_core::entities::product;
use vet_clinic_core::entities::product::PRODUCT_DETAILS;
use vet_clinic_core::entities::product::PRODUCTS;
use vet_clinic_core::entities::reservation;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn detail<'a>(record: &'a serde_json::Map<String, Value>, key: &str) -> &'a Value {
    record.get("details").and_then(|details| details.get(key)).unwrap_or(&Value::Null)
}

fn product_input() -> serde_json::Map<String, Value> {
    object(json!({
        "name": "Flea collar",
        "description": "Eight month protection",
        "price": "12.50",
        "stock": 8,
        "sideEffects": "itching, redness",
    }))
}

// ============================================================================
// SECTION: Create
// ============================================================================

#[tokio::test]
async fn create_reports_synchronized_and_encrypts_pii() {
    let harness = Harness::new();
    let seed = harness.seed().await;

    let outcome = harness.coordinator.create::<Appointment>(seed.appointment()).await.unwrap();

    assert!(outcome.verification.synchronized);
    assert!(outcome.verification.exists_in_relational);
    assert!(outcome.verification.exists_in_document);
    assert_eq!(outcome.record.get("status"), Some(&json!("scheduled")));
    assert_eq!(detail(&outcome.record, "appointmentSqlId"), &json!(outcome.id.cross_ref()));
    assert_eq!(detail(&outcome.record, "status"), &json!("pending"));

    let stored_client = harness.relational.find(&CLIENTS, seed.client).await.unwrap().unwrap();
    let stored_name = stored_client.get("name").and_then(Value::as_str).unwrap();
    assert!(stored_name.starts_with("enc:v1:"));

    let fetched = harness.coordinator.fetch::<Appointment>(outcome.id).await.unwrap();
    assert_eq!(fetched.get("clientName"), Some(&json!("Ana Ruiz")));
    assert_eq!(fetched.get("petName"), Some(&json!("Luna")));
    assert_eq!(fetched.get("serviceName"), Some(&json!("Consultation")));
    assert_eq!(fetched.get("documentId"), Some(&json!(outcome.document_id.as_str())));
    assert_eq!(detail(&fetched, "motive"), &json!("Vaccination"));
}

#[tokio::test]
async fn document_failure_compensates_relational_row_42() {
    let harness = Harness::new();
    let seed = harness.seed().await;
    for _ in 0 .. 41 {
        harness.coordinator.create::<Appointment>(seed.appointment()).await.unwrap();
    }
    harness.documents.fail_inserts.store(true, Ordering::SeqCst);

    let error = harness.coordinator.create::<Appointment>(seed.appointment()).await.unwrap_err();

    assert!(matches!(error, CoordinatorError::PartialWrite { compensated: true, .. }));
    let orphan = RecordId::new(42).unwrap();
    assert!(harness.relational.find(&APPOINTMENTS, orphan).await.unwrap().is_none());
    assert_eq!(harness.document_count(&APPOINTMENT_DETAILS, orphan).await, 0);
    assert_eq!(harness.table_count(&APPOINTMENTS).await, 41);
}

#[tokio::test]
async fn missing_document_id_compensates() {
    let harness = Harness::new();
    harness.documents.no_id_on_insert.store(true, Ordering::SeqCst);

    let error = harness.coordinator.create::<Product>(product_input()).await.unwrap_err();

    assert!(matches!(error, CoordinatorError::PartialWrite { compensated: true, .. }));
    assert_eq!(harness.table_count(&PRODUCTS).await, 0);
}

#[tokio::test]
async fn missing_relational_key_skips_document_write() {
    let harness = Harness::new();
    *harness.relational.no_key_for.lock().unwrap() = Some("products");

    let error = harness.coordinator.create::<Product>(product_input()).await.unwrap_err();

    assert!(matches!(error, CoordinatorError::MissingIdentifier { entity: "product" }));
    let documents = harness.documents.count_by_ref(&PRODUCT_DETAILS, "1").await.unwrap();
    assert_eq!(documents, 0);
}

#[tokio::test(start_paused = true)]
async fn transient_relational_failures_are_retried() {
    let harness = Harness::new();
    let reset = StoreError::transient(TransientKind::ConnectionReset, "ECONNRESET");
    harness.relational.fail_next_inserts([reset.clone(), reset]);

    let outcome = harness.coordinator.create::<Product>(product_input()).await.unwrap();

    assert!(outcome.verification.synchronized);
    assert_eq!(harness.relational.insert_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_surface_storage_error_without_document() {
    let harness = Harness::new();
    let timeout = StoreError::transient(TransientKind::Timeout, "ETIMEDOUT");
    harness.relational.fail_next_inserts([timeout.clone(), timeout.clone(), timeout]);

    let error = harness.coordinator.create::<Product>(product_input()).await.unwrap_err();

    assert!(matches!(error, CoordinatorError::Storage(StoreError::Transient { .. })));
    assert_eq!(harness.relational.insert_calls.load(Ordering::SeqCst), 3);
    assert_eq!(harness.table_count(&PRODUCTS).await, 0);
}

#[tokio::test(start_paused = true)]
async fn deadline_expiry_compensates_written_row() {
    let harness = Harness::with_config(CoordinatorConfig {
        create_deadline: Duration::from_millis(500),
        ..fast_config()
    });
    *harness.documents.insert_delay.lock().unwrap() = Some(Duration::from_secs(2));
    let id = RecordId::new(1).unwrap();

    let error = harness.coordinator.create::<Product>(product_input()).await.unwrap_err();

    assert!(matches!(error, CoordinatorError::DeadlineExceeded { compensated: true, .. }));
    assert_eq!(harness.table_count(&PRODUCTS).await, 0);
    assert_eq!(harness.document_count(&PRODUCT_DETAILS, id).await, 0);
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(harness.document_count(&PRODUCT_DETAILS, id).await, 0);
}

#[tokio::test(start_paused = true)]
async fn deadline_with_unsettled_document_insert_reports_uncompensated() {
    let harness = Harness::with_config(CoordinatorConfig {
        create_deadline: Duration::from_millis(500),
        ..fast_config()
    });
    *harness.documents.insert_delay.lock().unwrap() = Some(Duration::from_secs(120));
    let id = RecordId::new(1).unwrap();

    let error = harness.coordinator.create::<Product>(product_input()).await.unwrap_err();

    assert!(matches!(error, CoordinatorError::DeadlineExceeded { compensated: false, .. }));
    assert_eq!(harness.table_count(&PRODUCTS).await, 0);
    tokio::time::sleep(Duration::from_secs(180)).await;
    assert_eq!(harness.document_count(&PRODUCT_DETAILS, id).await, 1);
}

#[tokio::test]
async fn duplicate_documents_report_unsynchronized() {
    let harness = Harness::new();
    let stray = object(json!({"productSqlId": "1", "longDescription": "stray"}));
    harness.documents.insert(&PRODUCT_DETAILS, stray).await.unwrap();

    let outcome = harness.coordinator.create::<Product>(product_input()).await.unwrap();

    assert_eq!(outcome.id, RecordId::new(1).unwrap());
    assert!(outcome.verification.exists_in_relational);
    assert!(outcome.verification.exists_in_document);
    assert!(!outcome.verification.synchronized);
}

#[tokio::test]
async fn validation_failure_writes_nothing() {
    let harness = Harness::new();
    let seed = harness.seed().await;
    let mut input = seed.appointment();
    input.insert("petId".to_string(), json!("undefined"));
    input.insert("time".to_string(), json!("  "));

    let error = harness.coordinator.create::<Appointment>(input).await.unwrap_err();

    match error {
        CoordinatorError::Validation(ValidationError::Missing(fields)) => {
            assert_eq!(fields, vec!["petId", "time"]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(harness.table_count(&APPOINTMENTS).await, 0);
    assert_eq!(harness.relational.insert_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn missing_reference_writes_nothing() {
    let harness = Harness::new();
    let seed = harness.seed().await;
    let mut input = seed.appointment();
    input.insert("petId".to_string(), json!(999));

    let error = harness.coordinator.create::<Appointment>(input).await.unwrap_err();

    assert!(matches!(error, CoordinatorError::ReferenceNotFound { table: "pets", .. }));
    assert_eq!(harness.table_count(&APPOINTMENTS).await, 0);
}

#[tokio::test]
async fn unhealthy_store_rejects_create() {
    let lifecycle = Arc::new(ScriptedLifecycle::with_pings([Err(refused()), Err(refused())]));
    let mut harness = Harness::new();
    harness.coordinator =
        harness.coordinator.clone().with_health_monitor(ConnectionHealthMonitor::new(lifecycle));

    let error = harness.coordinator.create::<Product>(product_input()).await.unwrap_err();

    assert!(matches!(error, CoordinatorError::Unavailable));
    assert_eq!(harness.relational.insert_calls.load(Ordering::SeqCst), 0);
}

// ============================================================================
// SECTION: Update and Delete
// ============================================================================

#[tokio::test]
async fn update_rewrites_both_stores() {
    let harness = Harness::new();
    let seed = harness.seed().await;
    let created = harness.coordinator.create::<Appointment>(seed.appointment()).await.unwrap();
    let mut input = seed.appointment();
    input.insert("date".to_string(), json!("2026-11-04"));
    input.insert("symptoms".to_string(), json!("coughing"));

    let outcome = harness.coordinator.update::<Appointment>(created.id, input).await.unwrap();

    assert!(!outcome.document_upserted);
    assert_eq!(outcome.record.get("date"), Some(&json!("2026-11-04")));
    assert_eq!(detail(&outcome.record, "symptoms"), &json!("coughing"));
    assert_eq!(detail(&outcome.record, "motive"), &json!("Vaccination"));
}

#[tokio::test]
async fn update_upserts_missing_document() {
    let harness = Harness::new();
    let created = harness.coordinator.create::<Product>(product_input()).await.unwrap();
    harness.documents.delete_by_ref(&PRODUCT_DETAILS, &created.id.cross_ref()).await.unwrap();

    let outcome = harness.coordinator.update::<Product>(created.id, product_input()).await.unwrap();

    assert!(outcome.document_upserted);
    assert!(harness.coordinator.verify::<Product>(created.id).await.synchronized);
}

#[tokio::test]
async fn update_document_failure_restores_snapshot() {
    let harness = Harness::new();
    let created = harness.coordinator.create::<Product>(product_input()).await.unwrap();
    harness.documents.fail_updates.store(true, Ordering::SeqCst);
    let mut input = product_input();
    input.insert("stock".to_string(), json!(99));

    let error = harness.coordinator.update::<Product>(created.id, input).await.unwrap_err();

    assert!(matches!(error, CoordinatorError::PartialWrite { compensated: true, .. }));
    let row = harness.relational.find(&PRODUCTS, created.id).await.unwrap().unwrap();
    assert_eq!(row.get("stock"), Some(&json!(8)));
}

#[tokio::test]
async fn update_of_missing_record_is_not_found() {
    let harness = Harness::new();
    let error = harness
        .coordinator
        .update::<Product>(RecordId::new(7).unwrap(), product_input())
        .await
        .unwrap_err();
    assert!(matches!(error, CoordinatorError::NotFound { entity: "product", .. }));
}

#[tokio::test]
async fn soft_delete_mirrors_status() {
    let harness = Harness::new();
    let created = harness.coordinator.create::<Product>(product_input()).await.unwrap();

    harness.coordinator.soft_delete::<Product>(created.id).await.unwrap();

    let fetched = harness.coordinator.fetch::<Product>(created.id).await.unwrap();
    assert_eq!(fetched.get("status"), Some(&json!("inactive")));
    assert_eq!(detail(&fetched, "status"), &json!("inactive"));
    assert_eq!(harness.table_count(&PRODUCTS).await, 1);
}

#[tokio::test]
async fn feedback_cannot_be_deleted() {
    let harness = Harness::new();
    let seed = harness.seed().await;
    let created = harness
        .coordinator
        .create::<Feedback>(object(json!({
            "clientId": seed.client.get(),
            "comment": "Great care",
            "rating": 5,
        })))
        .await
        .unwrap();

    let error = harness.coordinator.soft_delete::<Feedback>(created.id).await.unwrap_err();
    assert!(matches!(error, CoordinatorError::Validation(_)));
}

// ============================================================================
// SECTION: Transitions and Reads
// ============================================================================

#[tokio::test]
async fn appointment_completion_stamps_visit_time() {
    let harness = Harness::new();
    let seed = harness.seed().await;
    let created = harness.coordinator.create::<Appointment>(seed.appointment()).await.unwrap();
    let input = object(json!({"status": "completed", "attended": true}));

    let record = harness
        .coordinator
        .transition::<Appointment, _>(created.id, |_, _| appointment::status_change(&input))
        .await
        .unwrap();

    assert_eq!(record.get("status"), Some(&json!("completed")));
    assert_eq!(detail(&record, "status"), &json!("completed"));
    assert_eq!(detail(&record, "attended"), &json!(true));
    assert!(detail(&record, "actualVisitTime").is_string());
}

#[tokio::test]
async fn reschedule_prepends_reason_to_notes() {
    let harness = Harness::new();
    let seed = harness.seed().await;
    let mut input = seed.appointment();
    input.insert("notes".to_string(), json!("bring records"));
    let created = harness.coordinator.create::<Appointment>(input).await.unwrap();
    let change = object(json!({"time": "11:00", "reason": "owner request"}));

    let record = harness
        .coordinator
        .transition::<Appointment, _>(created.id, |_, document| {
            appointment::reschedule(&change, document)
        })
        .await
        .unwrap();

    assert_eq!(record.get("time"), Some(&json!("11:00")));
    assert_eq!(detail(&record, "notes"), &json!("Rescheduled: owner request. bring records"));
}

#[tokio::test]
async fn reschedule_to_unknown_staff_writes_nothing() {
    let harness = Harness::new();
    let seed = harness.seed().await;
    let created = harness.coordinator.create::<Appointment>(seed.appointment()).await.unwrap();
    let change = object(json!({"time": "15:00", "staffId": 999, "reason": "swap"}));

    let error = harness
        .coordinator
        .transition::<Appointment, _>(created.id, |_, document| {
            appointment::reschedule(&change, document)
        })
        .await
        .unwrap_err();

    assert!(matches!(error, CoordinatorError::ReferenceNotFound { table: "staff", .. }));
    let record = harness.coordinator.fetch::<Appointment>(created.id).await.unwrap();
    assert_eq!(record.get("time"), Some(&json!("09:30")));
    assert_eq!(detail(&record, "notes"), &json!(""));
}

#[tokio::test]
async fn availability_counts_live_bookings() {
    let harness = Harness::new();
    let seed = harness.seed().await;
    let created = harness.coordinator.create::<Appointment>(seed.appointment()).await.unwrap();
    let slot = object(json!({"date": "2026-11-03", "time": "09:30:00"}));

    let taken = harness
        .coordinator
        .count::<Appointment>(appointment::slot_filters(&slot).unwrap())
        .await
        .unwrap();
    assert_eq!(taken, 1);

    harness.coordinator.soft_delete::<Appointment>(created.id).await.unwrap();
    let taken = harness
        .coordinator
        .count::<Appointment>(appointment::slot_filters(&slot).unwrap())
        .await
        .unwrap();
    assert_eq!(taken, 0);
}

#[tokio::test]
async fn stock_adjustment_never_goes_negative() {
    let harness = Harness::new();
    let created = harness.coordinator.create::<Product>(product_input()).await.unwrap();

    let error =
        harness.coordinator.adjust_counter::<Product>(created.id, "stock", -9).await.unwrap_err();
    assert!(matches!(
        error,
        CoordinatorError::Validation(ValidationError::Invalid { field: "quantity", .. })
    ));

    let record =
        harness.coordinator.adjust_counter::<Product>(created.id, "stock", 4).await.unwrap();
    assert_eq!(record.get("stock"), Some(&json!(12)));
    assert_eq!(record.get("name"), Some(&json!("Flea collar")));

    let missing = RecordId::new(99).unwrap();
    let error =
        harness.coordinator.adjust_counter::<Product>(missing, "stock", 1).await.unwrap_err();
    assert!(matches!(error, CoordinatorError::NotFound { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_stock_adjustments_are_not_lost() {
    let harness = Arc::new(Harness::new());
    let created = harness.coordinator.create::<Product>(product_input()).await.unwrap();
    let id = created.id;

    let tasks: Vec<_> = (0 .. 20)
        .map(|index| {
            let harness = Arc::clone(&harness);
            let delta = if index % 4 == 0 { -1 } else { 3 };
            tokio::spawn(async move {
                harness.coordinator.adjust_counter::<Product>(id, "stock", delta).await
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let record = harness.coordinator.fetch::<Product>(id).await.unwrap();
    assert_eq!(record.get("stock"), Some(&json!(8 + 15 * 3 - 5)));
}

#[tokio::test]
async fn absolute_stock_level_replaces_the_count() {
    let harness = Harness::new();
    let created = harness.coordinator.create::<Product>(product_input()).await.unwrap();
    let input = object(json!({"operation": "set", "quantity": 3}));
    let product::StockChange::Set(level) = product::stock_change(&input).unwrap() else {
        panic!("expected an absolute stock level");
    };

    let record = harness
        .coordinator
        .transition::<Product, _>(created.id, |_, _| Ok(product::stock_level(level)))
        .await
        .unwrap();
    assert_eq!(record.get("stock"), Some(&json!(3)));
}

#[tokio::test]
async fn reservation_workflow_updates_document_only() {
    let harness = Harness::new();
    let seed = harness.seed().await;
    let created = harness
        .coordinator
        .create::<Reservation>(object(json!({
            "clientId": seed.client.get(),
            "serviceId": seed.service.get(),
            "reservationDate": "2026-12-01",
        })))
        .await
        .unwrap();

    let record = harness
        .coordinator
        .transition::<Reservation, _>(created.id, |_, _| Ok(reservation::confirm()))
        .await
        .unwrap();
    assert_eq!(detail(&record, "status"), &json!("confirmed"));
    assert_eq!(detail(&record, "clientConfirmed"), &json!(true));

    let bad = object(json!({"rating": 6}));
    let error = harness
        .coordinator
        .transition::<Reservation, _>(created.id, |_, _| reservation::rate(&bad))
        .await
        .unwrap_err();
    assert!(matches!(error, CoordinatorError::Validation(_)));

    harness.coordinator.soft_delete::<Reservation>(created.id).await.unwrap();
    let record = harness.coordinator.fetch::<Reservation>(created.id).await.unwrap();
    assert_eq!(detail(&record, "status"), &json!("cancelled"));
    assert_eq!(record.get("clientName"), Some(&json!("Ana Ruiz")));
}

#[tokio::test]
async fn list_filters_and_orders_newest_first() {
    let harness = Harness::new();
    let first = harness.coordinator.create::<Product>(product_input()).await.unwrap();
    let second = harness.coordinator.create::<Product>(product_input()).await.unwrap();
    harness.coordinator.soft_delete::<Product>(first.id).await.unwrap();

    let all = harness.coordinator.list::<Product>(Vec::new()).await.unwrap();
    let ids: Vec<i64> = all.iter().filter_map(|r| r.get("id").and_then(Value::as_i64)).collect();
    assert_eq!(ids, vec![second.id.get(), first.id.get()]);

    let active =
        harness.coordinator.list::<Product>(vec![Filter::eq("status", "active")]).await.unwrap();
    assert_eq!(active.len(), 1);
}

#[tokio::test]
async fn search_applies_document_filters_after_the_select() {
    let harness = Harness::new();
    let seed = harness.seed().await;
    let input = object(json!({
        "clientId": seed.client.get(),
        "serviceId": seed.service.get(),
        "reservationDate": "2026-12-01",
    }));
    let pending = harness.coordinator.create::<Reservation>(input.clone()).await.unwrap();
    let confirmed = harness.coordinator.create::<Reservation>(input).await.unwrap();
    harness
        .coordinator
        .transition::<Reservation, _>(confirmed.id, |_, _| Ok(reservation::confirm()))
        .await
        .unwrap();

    let query = ListQuery::from_params(
        Reservation::NAME,
        Reservation::LIST_PARAMS,
        &object(json!({"status": "confirmed", "clientId": seed.client.get()})),
    )
    .unwrap();
    let records = harness.coordinator.search::<Reservation>(query).await.unwrap();
    let ids: Vec<i64> =
        records.iter().filter_map(|r| r.get("id").and_then(Value::as_i64)).collect();
    assert_eq!(ids, vec![confirmed.id.get()]);

    let query = ListQuery::from_params(
        Reservation::NAME,
        Reservation::LIST_PARAMS,
        &object(json!({"status": "pending"})),
    )
    .unwrap();
    let records = harness.coordinator.search::<Reservation>(query).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].get("id"), Some(&json!(pending.id.get())));
}

#[tokio::test]
async fn reservation_update_needs_only_the_date() {
    let harness = Harness::new();
    let seed = harness.seed().await;
    let created = harness
        .coordinator
        .create::<Reservation>(object(json!({
            "clientId": seed.client.get(),
            "serviceId": seed.service.get(),
            "reservationDate": "2026-12-01",
        })))
        .await
        .unwrap();

    let outcome = harness
        .coordinator
        .update::<Reservation>(
            created.id,
            object(json!({
                "reservationDate": "2026-12-05",
                "status": "confirmed",
                "handledBy": "Dr. Vega",
            })),
        )
        .await
        .unwrap();
    assert_eq!(outcome.record.get("reservationDate"), Some(&json!("2026-12-05")));
    assert_eq!(outcome.record.get("clientId"), Some(&json!(seed.client.get())));
    assert_eq!(detail(&outcome.record, "status"), &json!("confirmed"));
    assert_eq!(detail(&outcome.record, "handledBy"), &json!("Dr. Vega"));

    let error = harness
        .coordinator
        .update::<Reservation>(
            created.id,
            object(json!({"reservationDate": "2026-12-06", "serviceId": 404})),
        )
        .await
        .unwrap_err();
    assert!(matches!(error, CoordinatorError::ReferenceNotFound { table: "services", .. }));
}

#[tokio::test]
async fn calendar_orders_live_bookings_in_range() {
    let harness = Harness::new();
    let seed = harness.seed().await;
    let mut ids = Vec::new();
    for (date, time) in [
        ("2026-11-04", "08:00"),
        ("2026-11-03", "15:00"),
        ("2026-11-03", "09:30"),
        ("2026-12-01", "10:00"),
    ] {
        let mut input = seed.appointment();
        input.insert("date".to_string(), json!(date));
        input.insert("time".to_string(), json!(time));
        ids.push(harness.coordinator.create::<Appointment>(input).await.unwrap().id);
    }
    harness.coordinator.soft_delete::<Appointment>(ids[0]).await.unwrap();

    let query =
        appointment::calendar_query(&object(json!({"from": "2026-11-01", "to": "2026-11-30"})))
            .unwrap();
    let records = harness.coordinator.search::<Appointment>(query).await.unwrap();
    let slots: Vec<(&Value, &Value)> =
        records.iter().map(|record| (&record["date"], &record["time"])).collect();
    assert_eq!(slots, vec![
        (&json!("2026-11-03"), &json!("09:30")),
        (&json!("2026-11-03"), &json!("15:00"))
    ]);

    let backwards =
        appointment::calendar_query(&object(json!({"from": "2026-11-30", "to": "2026-11-01"})));
    assert!(matches!(backwards, Err(ValidationError::Invalid { field: "to", .. })));
}
