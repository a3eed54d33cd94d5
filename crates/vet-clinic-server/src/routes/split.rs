// crates/vet-clinic-server/src/routes/split.rs
// ============================================================================
// Module: Split Entity Routes
// Description: Generic list, create, fetch, update, delete, and verify handlers.
// Purpose: Expose the dual-write coordinator for every split entity.
// Dependencies: axum, vet-clinic-core
// ============================================================================

//! ## Overview
//! One handler set is instantiated per [`SplitEntity`]; the entity type
//! selects the table, collection, and validation rules.

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
use serde_json::Value;
use serde_json::json;
use vet_clinic_core::SplitEntity;

use crate::extract::json_object;
use crate::extract::list_query;
use crate::extract::record_id;
use crate::response::ApiError;
use crate::response::ApiResponse;
use crate::state::SharedState;

// ============================================================================
// SECTION: Routes
// ============================================================================

/// Registers the collection, item, and verify routes for `E` under `base`.
pub(super) fn routes<E: SplitEntity>(
    router: Router<SharedState>,
    base: &str,
) -> Router<SharedState> {
    router
        .route(base, get(list::<E>).post(create::<E>))
        .route(&format!("{base}/{{id}}"), get(fetch::<E>).put(update::<E>).delete(remove::<E>))
        .route(&format!("{base}/{{id}}/verify"), get(verify::<E>))
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Lists records matching the filters the entity declares.
async fn list<E: SplitEntity>(
    State(state): State<SharedState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<ApiResponse, ApiError> {
    let query = list_query(E::NAME, E::LIST_PARAMS, params)?;
    let records = state.coordinator().search::<E>(query).await?;
    let message = format!("{} {} records", records.len(), E::NAME);
    Ok(ApiResponse::ok(message, records.into_iter().map(Value::Object).collect::<Vec<_>>()))
}

/// Creates a record in both stores.
async fn create<E: SplitEntity>(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<ApiResponse, ApiError> {
    let input = json_object(&body)?;
    let outcome = state.coordinator().create::<E>(input).await?;
    Ok(ApiResponse::created(format!("{} created", E::NAME), outcome.record)
        .verified(outcome.verification))
}

/// Fetches one record with its details.
async fn fetch<E: SplitEntity>(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<ApiResponse, ApiError> {
    let id = record_id(&id)?;
    let record = state.coordinator().fetch::<E>(id).await?;
    Ok(ApiResponse::ok(format!("{} found", E::NAME), record))
}

/// Updates both sides of a record.
async fn update<E: SplitEntity>(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<ApiResponse, ApiError> {
    let id = record_id(&id)?;
    let input = json_object(&body)?;
    let outcome = state.coordinator().update::<E>(id, input).await?;
    let message = if outcome.document_upserted {
        format!("{} updated, details recreated", E::NAME)
    } else {
        format!("{} updated", E::NAME)
    };
    Ok(ApiResponse::ok(message, outcome.record))
}

/// Soft-deletes a record.
async fn remove<E: SplitEntity>(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<ApiResponse, ApiError> {
    let id = record_id(&id)?;
    state.coordinator().soft_delete::<E>(id).await?;
    Ok(ApiResponse::ok(format!("{} deleted", E::NAME), json!({ "id": id.get() })))
}

/// Reports whether both stores hold the record.
async fn verify<E: SplitEntity>(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<ApiResponse, ApiError> {
    let id = record_id(&id)?;
    let verification = state.coordinator().verify::<E>(id).await;
    let message = if verification.synchronized {
        format!("{} synchronized", E::NAME)
    } else {
        format!("{} not synchronized", E::NAME)
    };
    Ok(ApiResponse::ok(message, json!({ "id": id.get() })).verified(verification))
}
