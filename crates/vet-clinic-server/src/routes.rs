// crates/vet-clinic-server/src/routes.rs
// ============================================================================
// Module: HTTP Routes
// Description: Axum router assembly, health endpoint, and audit middleware.
// Purpose: Map REST paths onto coordinator and directory operations.
// Dependencies: axum, tokio, vet-clinic-core
// ============================================================================

//! ## Overview
//! Split entities share one generic set of handlers (see [`split`]); the
//! workflow endpoints in [`workflow`] plan transitions on top of them. Every
//! mutating request is recorded by the audit middleware after the response
//! status is known.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod directory;
mod split;
mod workflow;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Instant;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::extract::Request;
use axum::extract::State;
use axum::http::Method;
use axum::middleware;
use axum::middleware::Next;
use axum::response::Response;
use axum::routing::get;
use serde_json::Map;
use serde_json::Value;
use tracing::warn;
use vet_clinic_core::Appointment;
use vet_clinic_core::DirectoryKind;
use vet_clinic_core::Feedback;
use vet_clinic_core::Owner;
use vet_clinic_core::Product;
use vet_clinic_core::Reservation;
use vet_clinic_core::Service;

use crate::audit::AuditEvent;
use crate::response::ApiError;
use crate::response::ApiResponse;
use crate::state::SharedState;

// ============================================================================
// SECTION: Router
// ============================================================================

/// Builds the full application router.
pub fn router(state: SharedState, max_body_bytes: usize) -> Router {
    let mut router = Router::new().route("/health", get(health));
    for (base, kind) in [
        ("/api/clients", DirectoryKind::Client),
        ("/api/pets", DirectoryKind::Pet),
        ("/api/staff", DirectoryKind::Staff),
        ("/api/payments", DirectoryKind::Payment),
        ("/api/promotions", DirectoryKind::Promotion),
    ] {
        router = directory::routes(router, base, kind);
    }
    router = directory::payment_routes(router);
    router = directory::promotion_routes(router);
    router = workflow::routes(router);
    router = split::routes::<Appointment>(router, "/api/appointments");
    router = split::routes::<Feedback>(router, "/api/feedback");
    router = split::routes::<Product>(router, "/api/products");
    router = split::routes::<Service>(router, "/api/services");
    router = split::routes::<Owner>(router, "/api/owners");
    router = split::routes::<Reservation>(router, "/api/reservations");
    router
        .layer(middleware::from_fn_with_state(state.clone(), audit_mutations))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

// ============================================================================
// SECTION: Health
// ============================================================================

/// Runs every store probe; a failed probe rebuilds its pool once.
async fn health(State(state): State<SharedState>) -> Result<ApiResponse, ApiError> {
    let mut report = Map::new();
    let mut failed = Vec::new();
    for probe in state.probes() {
        let healthy = probe.monitor.verify_connection().await;
        if !healthy {
            failed.push(probe.name);
        }
        report.insert(probe.name.to_string(), Value::Bool(healthy));
    }
    if failed.is_empty() {
        Ok(ApiResponse::ok("healthy", report))
    } else {
        warn!(stores = %failed.join(", "), "health check failed");
        Err(ApiError::Unavailable(format!("unreachable: {}", failed.join(", "))))
    }
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Records an audit event for every mutating request.
async fn audit_mutations(
    State(state): State<SharedState>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    if !matches!(method, Method::POST | Method::PUT | Method::DELETE) {
        return next.run(request).await;
    }
    let path = request.uri().path().to_string();
    let started = Instant::now();
    let response = next.run(request).await;
    let event = AuditEvent::new(
        method.to_string(),
        path,
        response.status().as_u16(),
        started.elapsed().as_millis(),
    );
    state.audit().record(&event);
    response
}
