// crates/vet-clinic-server/src/routes/directory.rs
// ============================================================================
// Module: Directory Routes
// Description: Handlers for clients, pets, staff, payments, and promotions.
// Purpose: Expose the relational-only directory over HTTP.
// Dependencies: axum, vet-clinic-core
// ============================================================================

//! ## Overview
//! Directory records live only in the relational store, so these handlers
//! return no verification report. Payments and promotions also accept
//! updates and soft deletes; promotions add window and code lookups.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;

use axum::Router;
use axum::body::Bytes;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::routing::MethodRouter;
use axum::routing::get;
use axum::routing::put;
use serde_json::Value;
use serde_json::json;
use vet_clinic_core::DirectoryKind;
use vet_clinic_core::FieldMap;
use vet_clinic_core::entities::promotion;

use crate::extract::json_object;
use crate::extract::list_query;
use crate::extract::query_fields;
use crate::extract::record_id;
use crate::response::ApiError;
use crate::response::ApiResponse;
use crate::state::SharedState;

// ============================================================================
// SECTION: Routes
// ============================================================================

/// Registers the directory routes for `kind` under `base`.
pub(super) fn routes(
    router: Router<SharedState>,
    base: &str,
    kind: DirectoryKind,
) -> Router<SharedState> {
    let mut item: MethodRouter<SharedState> =
        get(move |state: State<SharedState>, id: Path<String>| fetch(kind, state, id));
    if kind.accepts_updates() {
        item = item
            .put(move |state: State<SharedState>, id: Path<String>, body: Bytes| {
                update(kind, state, id, body)
            })
            .delete(move |state: State<SharedState>, id: Path<String>| retire(kind, state, id));
    }
    router
        .route(
            base,
            get(move |state: State<SharedState>, query: Query<HashMap<String, String>>| {
                list(kind, state, query)
            })
            .post(move |state: State<SharedState>, body: Bytes| create(kind, state, body)),
        )
        .route(&format!("{base}/{{id}}"), item)
}

/// Registers the per-client payment history.
pub(super) fn payment_routes(router: Router<SharedState>) -> Router<SharedState> {
    router.route("/api/clients/{id}/payments", get(client_payments))
}

/// Registers promotion status changes, window reads, and code lookups.
pub(super) fn promotion_routes(router: Router<SharedState>) -> Router<SharedState> {
    router
        .route("/api/promotions/active", get(active_promotions))
        .route("/api/promotions/expiring", get(expiring_promotions))
        .route("/api/promotions/code/{code}", get(promotion_by_code))
        .route("/api/promotions/code/{code}/validate", get(validate_code))
        .route("/api/promotions/{id}/status", put(promotion_status))
}

/// Wraps rendered records as a JSON array.
fn records(records: Vec<FieldMap>) -> Vec<Value> {
    records.into_iter().map(Value::Object).collect()
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Lists directory records.
async fn list(
    kind: DirectoryKind,
    State(state): State<SharedState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<ApiResponse, ApiError> {
    let query = list_query(kind.label(), kind.list_params(), params)?;
    let found = state.directory().list(kind, query.relational).await?;
    let message = format!("{} {} records", found.len(), kind.label());
    Ok(ApiResponse::ok(message, records(found)))
}

/// Creates a directory record.
async fn create(
    kind: DirectoryKind,
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<ApiResponse, ApiError> {
    let input = json_object(&body)?;
    let record = state.directory().create(kind, input).await?;
    Ok(ApiResponse::created(format!("{} created", kind.label()), record))
}

/// Fetches one directory record.
async fn fetch(
    kind: DirectoryKind,
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<ApiResponse, ApiError> {
    let id = record_id(&id)?;
    let record = state.directory().get(kind, id).await?;
    Ok(ApiResponse::ok(format!("{} found", kind.label()), record))
}

/// Rewrites a directory record.
async fn update(
    kind: DirectoryKind,
    State(state): State<SharedState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<ApiResponse, ApiError> {
    let id = record_id(&id)?;
    let input = json_object(&body)?;
    let record = state.directory().update(kind, id, input).await?;
    Ok(ApiResponse::ok(format!("{} updated", kind.label()), record))
}

/// Moves a directory record to its retired status.
async fn retire(
    kind: DirectoryKind,
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<ApiResponse, ApiError> {
    let id = record_id(&id)?;
    state.directory().retire(kind, id).await?;
    Ok(ApiResponse::ok(format!("{} deleted", kind.label()), json!({ "id": id.get() })))
}

// ============================================================================
// SECTION: Payments
// ============================================================================

/// Lists the payments recorded against a client's appointments.
async fn client_payments(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<ApiResponse, ApiError> {
    let client = record_id(&id)?;
    state.directory().get(DirectoryKind::Client, client).await?;
    let found = state.directory().payments_for_client(client).await?;
    let message = format!("{} payment records", found.len());
    Ok(ApiResponse::ok(message, records(found)))
}

// ============================================================================
// SECTION: Promotions
// ============================================================================

/// Lists promotions redeemable today.
async fn active_promotions(State(state): State<SharedState>) -> Result<ApiResponse, ApiError> {
    let found = state.directory().active_promotions().await?;
    let message = format!("{} active promotions", found.len());
    Ok(ApiResponse::ok(message, records(found)))
}

/// Lists active promotions ending within `days` (default 7).
async fn expiring_promotions(
    State(state): State<SharedState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<ApiResponse, ApiError> {
    let days = promotion::expiry_window(&query_fields(params))?;
    let found = state.directory().expiring_promotions(days).await?;
    let message = format!("{} promotions expiring within {days} days", found.len());
    Ok(ApiResponse::ok(message, records(found)))
}

/// Fetches the redeemable promotion carrying a code.
async fn promotion_by_code(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<ApiResponse, ApiError> {
    let code = promotion::normalize_code(&code)?;
    let found = state.directory().redeemable_promotion(&code).await?;
    let record =
        found.ok_or_else(|| ApiError::NotFound(format!("no redeemable promotion for {code}")))?;
    Ok(ApiResponse::ok("promotion found", record))
}

/// Reports whether a code is redeemable today; never fails on a bad code.
async fn validate_code(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<ApiResponse, ApiError> {
    let found = match promotion::normalize_code(&code) {
        Ok(code) => state.directory().redeemable_promotion(&code).await?,
        Err(_) => None,
    };
    let message = if found.is_some() { "code valid" } else { "code not valid" };
    Ok(ApiResponse::ok(
        message,
        json!({
            "valid": found.is_some(),
            "promotion": found.map(Value::Object),
        }),
    ))
}

/// Changes a promotion's status.
async fn promotion_status(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<ApiResponse, ApiError> {
    let id = record_id(&id)?;
    let status = promotion::requested_status(&json_object(&body)?)?;
    let record =
        state.directory().set_status(DirectoryKind::Promotion, id, status.as_str()).await?;
    Ok(ApiResponse::ok("promotion status updated", record))
}
