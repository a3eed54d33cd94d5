// crates/vet-clinic-server/src/response.rs
// ============================================================================
// Module: HTTP Response Envelope
// Description: JSON envelope and error-to-status mapping for every route.
// Purpose: Keep response shape and status codes uniform across handlers.
// Dependencies: axum, serde, vet-clinic-core
// ============================================================================

//! ## Overview
//! Every response body is an [`Envelope`]:
//! `{success, message, data?, error?, verification?}`. Failures carry the
//! error display string in `error`; nothing else from the failure leaks.

// ============================================================================
// SECTION: Imports
// ============================================================================

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::error;
use tracing::warn;
use vet_clinic_core::CoordinatorError;
use vet_clinic_core::ValidationError;
use vet_clinic_core::Verification;

// ============================================================================
// SECTION: Envelope
// ============================================================================

/// Uniform JSON response body.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Human-readable summary.
    pub message: String,
    /// Operation payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Error detail on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Dual-store read-back, when the operation produced one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification: Option<Verification>,
}

/// Successful response with status code and envelope.
#[derive(Debug)]
pub struct ApiResponse {
    /// Response status.
    status: StatusCode,
    /// Response body.
    body: Envelope,
}

impl ApiResponse {
    /// Builds a 200 response carrying `data`.
    pub fn ok(message: impl Into<String>, data: impl Into<Value>) -> Self {
        Self::with_status(StatusCode::OK, message, data)
    }

    /// Builds a 201 response carrying `data`.
    pub fn created(message: impl Into<String>, data: impl Into<Value>) -> Self {
        Self::with_status(StatusCode::CREATED, message, data)
    }

    /// Builds a success response with an explicit status.
    pub fn with_status(
        status: StatusCode,
        message: impl Into<String>,
        data: impl Into<Value>,
    ) -> Self {
        Self {
            status,
            body: Envelope {
                success: true,
                message: message.into(),
                data: Some(data.into()),
                error: None,
                verification: None,
            },
        }
    }

    /// Attaches a verification report.
    #[must_use]
    pub const fn verified(mut self, verification: Verification) -> Self {
        self.body.verification = Some(verification);
        self
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Handler failure mapped to an HTTP status.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Coordinator or directory failure.
    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),
    /// Request body or path could not be decoded.
    #[error("{0}")]
    BadRequest(String),
    /// A lookup by something other than a record key matched nothing.
    #[error("{0}")]
    NotFound(String),
    /// A store failed its health check.
    #[error("{0}")]
    Unavailable(String),
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::Coordinator(CoordinatorError::Validation(err))
    }
}

impl ApiError {
    /// Returns the status code and summary message for the error.
    #[must_use]
    pub const fn classify(&self) -> (StatusCode, &'static str) {
        match self {
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "invalid request"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "record not found"),
            Self::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "service unavailable"),
            Self::Coordinator(err) => match err {
                CoordinatorError::Validation(_) => (StatusCode::BAD_REQUEST, "validation failed"),
                CoordinatorError::ReferenceNotFound {
                    ..
                } => (StatusCode::NOT_FOUND, "referenced record not found"),
                CoordinatorError::NotFound {
                    ..
                } => (StatusCode::NOT_FOUND, "record not found"),
                CoordinatorError::Unavailable => {
                    (StatusCode::SERVICE_UNAVAILABLE, "database unavailable")
                }
                CoordinatorError::Storage(_)
                | CoordinatorError::MissingIdentifier {
                    ..
                }
                | CoordinatorError::PartialWrite {
                    ..
                }
                | CoordinatorError::DeadlineExceeded {
                    ..
                }
                | CoordinatorError::Cipher(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "operation failed")
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.classify();
        let detail = self.to_string();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %detail, "request failed");
        } else {
            warn!(status = status.as_u16(), error = %detail, "request rejected");
        }
        let body = Envelope {
            success: false,
            message: message.to_string(),
            data: None,
            error: Some(detail),
            verification: None,
        };
        (status, Json(body)).into_response()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
