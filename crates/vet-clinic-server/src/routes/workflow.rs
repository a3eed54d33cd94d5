// crates/vet-clinic-server/src/routes/workflow.rs
// ============================================================================
// Module: Workflow Routes
// Description: Appointment, feedback, product, and reservation workflow handlers.
// Purpose: Expose entity transitions planned by the entity modules.
// Dependencies: axum, vet-clinic-core
// ============================================================================

//! ## Overview
//! Each handler decodes its body and hands the coordinator a planner from
//! the entity module. The coordinator checks the record exists, writes the
//! relational side first, and restores it if the document write fails.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;

use axum::Router;
use axum::body::Bytes;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::routing::get;
use axum::routing::put;
use serde_json::Value;
use serde_json::json;
use vet_clinic_core::Appointment;
use vet_clinic_core::Feedback;
use vet_clinic_core::FieldMap;
use vet_clinic_core::Product;
use vet_clinic_core::RecordId;
use vet_clinic_core::Reservation;
use vet_clinic_core::entities::appointment;
use vet_clinic_core::entities::feedback;
use vet_clinic_core::entities::product;
use vet_clinic_core::entities::product::StockChange;
use vet_clinic_core::entities::reservation;

use crate::extract::json_object;
use crate::extract::query_fields;
use crate::extract::record_id;
use crate::response::ApiError;
use crate::response::ApiResponse;
use crate::state::SharedState;

// ============================================================================
// SECTION: Routes
// ============================================================================

/// Registers every workflow route.
pub(super) fn routes(router: Router<SharedState>) -> Router<SharedState> {
    router
        .route("/api/appointments/availability", get(appointment_availability))
        .route("/api/appointments/calendar", get(appointment_calendar))
        .route("/api/appointments/{id}/status", put(appointment_status))
        .route("/api/appointments/{id}/reschedule", put(appointment_reschedule))
        .route("/api/feedback/{id}/response", put(feedback_response))
        .route("/api/products/{id}/stock", put(product_stock))
        .route("/api/reservations/{id}/confirm", put(reservation_confirm))
        .route("/api/reservations/{id}/cancel", put(reservation_cancel))
        .route("/api/reservations/{id}/complete", put(reservation_complete))
        .route("/api/reservations/{id}/rate", put(reservation_rate))
}

/// Decodes the path id and JSON body shared by every transition.
fn transition_input(id: &str, body: &Bytes) -> Result<(RecordId, FieldMap), ApiError> {
    Ok((record_id(id)?, json_object(body)?))
}

// ============================================================================
// SECTION: Appointments
// ============================================================================

/// Counts live bookings in a date/time slot.
async fn appointment_availability(
    State(state): State<SharedState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<ApiResponse, ApiError> {
    let input = query_fields(params);
    let filters = appointment::slot_filters(&input)?;
    let bookings = state.coordinator().count::<Appointment>(filters).await?;
    let available = bookings == 0;
    let message = if available { "slot available" } else { "slot taken" };
    Ok(ApiResponse::ok(
        message,
        json!({
            "date": input.get("date"),
            "time": input.get("time"),
            "available": available,
            "bookings": bookings,
        }),
    ))
}

/// Lists live bookings between two dates in date and time order.
async fn appointment_calendar(
    State(state): State<SharedState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<ApiResponse, ApiError> {
    let query = appointment::calendar_query(&query_fields(params))?;
    let records = state.coordinator().search::<Appointment>(query).await?;
    let message = format!("{} appointments in range", records.len());
    Ok(ApiResponse::ok(message, records.into_iter().map(Value::Object).collect::<Vec<_>>()))
}

/// Changes appointment status, mirrored into the document workflow status.
async fn appointment_status(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<ApiResponse, ApiError> {
    let (id, input) = transition_input(&id, &body)?;
    let record = state
        .coordinator()
        .transition::<Appointment, _>(id, move |_, _| appointment::status_change(&input))
        .await?;
    Ok(ApiResponse::ok("appointment status updated", record))
}

/// Moves an appointment to a new date, time, or staff member.
async fn appointment_reschedule(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<ApiResponse, ApiError> {
    let (id, input) = transition_input(&id, &body)?;
    let record = state
        .coordinator()
        .transition::<Appointment, _>(id, move |_, document| {
            appointment::reschedule(&input, document)
        })
        .await?;
    Ok(ApiResponse::ok("appointment rescheduled", record))
}

// ============================================================================
// SECTION: Feedback
// ============================================================================

/// Records a staff response to feedback.
async fn feedback_response(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<ApiResponse, ApiError> {
    let (id, input) = transition_input(&id, &body)?;
    let record = state
        .coordinator()
        .transition::<Feedback, _>(id, move |_, _| feedback::respond(&input))
        .await?;
    Ok(ApiResponse::ok("feedback response recorded", record))
}

// ============================================================================
// SECTION: Products
// ============================================================================

/// Sets, adds to, or subtracts from product stock.
///
/// Additions and subtractions are applied atomically in the relational store.
async fn product_stock(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<ApiResponse, ApiError> {
    let (id, input) = transition_input(&id, &body)?;
    let coordinator = state.coordinator();
    let record = match product::stock_change(&input)? {
        StockChange::Set(level) => {
            coordinator
                .transition::<Product, _>(id, move |_, _| Ok(product::stock_level(level)))
                .await?
        }
        StockChange::Delta(delta) => {
            coordinator.adjust_counter::<Product>(id, product::STOCK_COLUMN, delta).await?
        }
    };
    Ok(ApiResponse::ok("product stock updated", record))
}

// ============================================================================
// SECTION: Reservations
// ============================================================================

/// Marks a reservation confirmed by the client.
async fn reservation_confirm(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<ApiResponse, ApiError> {
    let id = record_id(&id)?;
    let record = state
        .coordinator()
        .transition::<Reservation, _>(id, |_, _| Ok(reservation::confirm()))
        .await?;
    Ok(ApiResponse::ok("reservation confirmed", record))
}

/// Cancels a reservation with an optional reason.
async fn reservation_cancel(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<ApiResponse, ApiError> {
    let (id, input) = transition_input(&id, &body)?;
    let record = state
        .coordinator()
        .transition::<Reservation, _>(id, move |_, _| Ok(reservation::cancel(&input)))
        .await?;
    Ok(ApiResponse::ok("reservation cancelled", record))
}

/// Completes a reservation.
async fn reservation_complete(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<ApiResponse, ApiError> {
    let (id, input) = transition_input(&id, &body)?;
    let record = state
        .coordinator()
        .transition::<Reservation, _>(id, move |_, _| Ok(reservation::complete(&input)))
        .await?;
    Ok(ApiResponse::ok("reservation completed", record))
}

/// Rates a reservation from 1 to 5.
async fn reservation_rate(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<ApiResponse, ApiError> {
    let (id, input) = transition_input(&id, &body)?;
    let record = state
        .coordinator()
        .transition::<Reservation, _>(id, move |_, _| reservation::rate(&input))
        .await?;
    Ok(ApiResponse::ok("reservation rated", record))
}
