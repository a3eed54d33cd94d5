// crates/vet-clinic-server/src/extract.rs
// ============================================================================
// Module: Request Decoding
// Description: JSON body, path id, and list-filter decoding for handlers.
// Purpose: Turn untrusted HTTP input into typed coordinator arguments.
// Dependencies: axum, serde_json, vet-clinic-core
// ============================================================================

//! ## Overview
//! Bodies must be JSON objects. Path ids must be positive integers. List
//! parameters are checked against the filters each record declares; a
//! `clientId` or `status` the record cannot filter by is rejected, and
//! enumerated values outside their set are rejected.
//! Security posture: every input here is untrusted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;

use axum::body::Bytes;
use serde_json::Value;
use vet_clinic_core::FieldMap;
use vet_clinic_core::ListQuery;
use vet_clinic_core::RecordId;
use vet_clinic_core::entities::ListParam;

use crate::response::ApiError;

// ============================================================================
// SECTION: Decoding
// ============================================================================

/// Decodes a JSON object body; an empty body is an empty object.
pub(crate) fn json_object(bytes: &Bytes) -> Result<FieldMap, ApiError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(FieldMap::new());
    }
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ApiError::BadRequest("request body must be a JSON object".to_string())),
        Err(_) => Err(ApiError::BadRequest("request body is not valid JSON".to_string())),
    }
}

/// Parses a path identifier.
pub(crate) fn record_id(raw: &str) -> Result<RecordId, ApiError> {
    RecordId::parse(raw).ok_or_else(|| ApiError::BadRequest(format!("invalid id: {raw}")))
}

/// Converts query parameters into a field map of strings.
pub(crate) fn query_fields(params: HashMap<String, String>) -> FieldMap {
    params.into_iter().map(|(key, value)| (key, Value::String(value))).collect()
}

/// Resolves list query parameters against the filters a record declares.
///
/// Each accepted parameter is validated before it reaches either store.
pub(crate) fn list_query(
    label: &str,
    params: &[ListParam],
    query: HashMap<String, String>,
) -> Result<ListQuery, ApiError> {
    Ok(ListQuery::from_params(label, params, &query_fields(query))?)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
