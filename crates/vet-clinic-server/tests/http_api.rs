// crates/vet-clinic-server/tests/http_api.rs
// ============================================================================
// Module: HTTP API Tests
// Description: End-to-end requests against the router over SQLite stores.
// Purpose: Validate envelopes, status codes, workflows, and audit output.
// ============================================================================

//! ## Overview
//! Each test boots a fresh server on an ephemeral port:
//! - Creates return 201 with a synchronized verification report
//! - Validation, reference, and lookup failures map to 400 and 404
//! - Workflow endpoints plan transitions through the coordinator
//! - Mutations append audit lines; reads do not

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

use reqwest::StatusCode;
use serde_json::Value;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use vet_clinic_core::core::time::days_from_today;
use vet_clinic_server::ServerError;
use vet_clinic_server::VetClinicServer;

use crate::common::TestServer;
use crate::common::test_config;

#[tokio::test(flavor = "multi_thread")]
async fn health_reports_both_stores() {
    let server = TestServer::start().await;
    let (status, body) = server.get("/health").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"], json!({"relational": true, "document": true}));
    server.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn appointment_create_is_synchronized() {
    let server = TestServer::start().await;
    let (client, pet, service) = server.seed().await;
    let (status, body) = server
        .post(
            "/api/appointments",
            json!({
                "clientId": client,
                "petId": pet,
                "serviceId": service,
                "date": "2026-11-03",
                "time": "09:30",
                "motive": "Vaccination",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["success"], json!(true));
    assert_eq!(
        body["verification"],
        json!({"existsInSQL": true, "existsInDocument": true, "synchronized": true})
    );
    let id = body["data"]["id"].as_i64().unwrap();

    let (status, fetched) = server.get(&format!("/api/appointments/{id}")).await;
    assert_eq!(status, StatusCode::OK, "{fetched}");
    assert_eq!(fetched["data"]["clientName"], json!("Ana Ruiz"));
    assert_eq!(fetched["data"]["petName"], json!("Luna"));
    assert_eq!(fetched["data"]["details"]["motive"], json!("Vaccination"));

    let (status, verified) = server.get(&format!("/api/appointments/{id}/verify")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(verified["verification"]["synchronized"], json!(true));

    let (status, listed) = server.get(&format!("/api/appointments?clientId={client}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["data"].as_array().map(Vec::len), Some(1));
    server.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn failures_use_the_error_envelope() {
    let server = TestServer::start().await;
    let (client, pet, service) = server.seed().await;

    let (status, body) = server.post("/api/appointments", json!({"clientId": client})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["success"], json!(false));
    assert!(body["error"].as_str().is_some());
    assert!(body.get("data").is_none());

    let (status, body) = server
        .post(
            "/api/appointments",
            json!({
                "clientId": client + 100,
                "petId": pet,
                "serviceId": service,
                "date": "2026-11-03",
                "time": "09:30",
                "motive": "Vaccination",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{body}");

    let (status, _) = server.get("/api/products/999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = server.get("/api/products/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = server.post_raw("/api/products", "[1, 2, 3]").await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (status, _) = server.get("/api/appointments?clientId=seven").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, listed) = server.get("/api/appointments").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["data"], json!([]));
    server.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn appointment_workflow_and_availability() {
    let server = TestServer::start().await;
    let (client, pet, service) = server.seed().await;
    let (_, body) = server
        .post(
            "/api/appointments",
            json!({
                "clientId": client,
                "petId": pet,
                "serviceId": service,
                "date": "2026-11-03",
                "time": "09:30",
                "motive": "Vaccination",
            }),
        )
        .await;
    let id = body["data"]["id"].as_i64().unwrap();

    let (status, slot) =
        server.get("/api/appointments/availability?date=2026-11-03&time=09:30").await;
    assert_eq!(status, StatusCode::OK, "{slot}");
    assert_eq!(slot["data"]["available"], json!(false));

    let (status, moved) = server
        .put(
            &format!("/api/appointments/{id}/reschedule"),
            json!({"date": "2026-11-04", "reason": "vet unavailable"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{moved}");
    assert_eq!(moved["data"]["date"], json!("2026-11-04"));

    let (_, slot) = server.get("/api/appointments/availability?date=2026-11-03&time=09:30").await;
    assert_eq!(slot["data"]["available"], json!(true));

    let (status, done) =
        server.put(&format!("/api/appointments/{id}/status"), json!({"status": "completed"})).await;
    assert_eq!(status, StatusCode::OK, "{done}");
    assert_eq!(done["data"]["status"], json!("completed"));
    assert_eq!(done["data"]["details"]["status"], json!("completed"));
    assert!(done["data"]["details"]["actualVisitTime"].is_string());

    let (status, _) =
        server.put(&format!("/api/appointments/{id}/status"), json!({"status": "lost"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    server.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn product_stock_never_goes_negative() {
    let server = TestServer::start().await;
    let (status, body) = server
        .post(
            "/api/products",
            json!({
                "name": "Dewormer",
                "description": "Broad spectrum",
                "price": 12.5,
                "stock": 10,
                "category": "medicine",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let id = body["data"]["id"].as_i64().unwrap();

    let (status, _) = server
        .put(&format!("/api/products/{id}/stock"), json!({"operation": "subtract", "quantity": 15}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = server
        .put(&format!("/api/products/{id}/stock"), json!({"operation": "subtract", "quantity": 4}))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["stock"], json!(6));
    server.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn reservation_and_feedback_workflows() {
    let server = TestServer::start().await;
    let (client, _, service) = server.seed().await;
    let (status, body) = server
        .post(
            "/api/reservations",
            json!({"clientId": client, "serviceId": service, "reservationDate": "2026-12-01"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let reservation = body["data"]["id"].as_i64().unwrap();

    let (status, body) =
        server.put(&format!("/api/reservations/{reservation}/confirm"), json!({})).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["details"]["status"], json!("confirmed"));

    let (status, _) =
        server.put(&format!("/api/reservations/{reservation}/rate"), json!({"rating": 7})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) =
        server.put(&format!("/api/reservations/{reservation}/cancel"), json!({})).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["details"]["cancellationReason"], json!("not specified"));

    let (status, body) = server
        .post("/api/feedback", json!({"clientId": client, "comment": "Great care", "rating": 5}))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let feedback = body["data"]["id"].as_i64().unwrap();

    let (status, _) =
        server.put(&format!("/api/feedback/{feedback}/response"), json!({"response": ""})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = server
        .put(&format!("/api/feedback/{feedback}/response"), json!({"response": "Thank you"}))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["details"]["responded"], json!(true));

    let (status, _) = server.delete(&format!("/api/feedback/{feedback}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    server.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn soft_delete_marks_service_inactive() {
    let server = TestServer::start().await;
    let (_, _, service) = server.seed().await;
    let (status, body) = server.delete(&format!("/api/services/{service}")).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let (status, body) = server.get(&format!("/api/services/{service}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], json!("inactive"));
    assert_eq!(body["data"]["details"]["status"], json!("inactive"));

    let (status, listed) = server.get("/api/services?status=active").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["data"], json!([]));
    server.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn mutations_are_audited() {
    let server = TestServer::start().await;
    let (status, _) = server.post("/api/clients", json!({"name": "Ana Ruiz"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) =
        server.post("/api/clients", json!({"name": "Ana Ruiz", "nationalId": "0102"})).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = server.get("/api/clients").await;
    assert_eq!(status, StatusCode::OK);
    let path = server.audit_path();
    let _dir = server.shutdown().await;

    let content = std::fs::read_to_string(path).unwrap();
    let events = content
        .lines()
        .map(|line| serde_json::from_str::<Value>(line).unwrap())
        .collect::<Vec<_>>();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["outcome"], json!("rejected"));
    assert_eq!(events[1]["status"], json!(201));
    assert_eq!(events[1]["path"], json!("/api/clients"));
    assert!(!content.contains("0102"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_stock_subtractions_are_not_lost() {
    let server = TestServer::start().await;
    let (status, body) = server
        .post(
            "/api/products",
            json!({
                "name": "Dewormer",
                "description": "Broad spectrum",
                "price": 12.5,
                "stock": 10,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let id = body["data"]["id"].as_i64().unwrap();

    let url = format!("{}/api/products/{id}/stock", server.base);
    let mut requests = JoinSet::new();
    for _ in 0 .. 25 {
        let client = server.client.clone();
        let url = url.clone();
        requests.spawn(async move {
            let response = client
                .put(url)
                .json(&json!({"operation": "subtract", "quantity": 1}))
                .send()
                .await
                .unwrap();
            response.status()
        });
    }
    let mut accepted = 0;
    let mut rejected = 0;
    while let Some(status) = requests.join_next().await {
        match status.unwrap() {
            StatusCode::OK => accepted += 1,
            StatusCode::BAD_REQUEST => rejected += 1,
            other => panic!("unexpected status {other}"),
        }
    }
    assert_eq!((accepted, rejected), (10, 15));

    let (_, body) = server.get(&format!("/api/products/{id}")).await;
    assert_eq!(body["data"]["stock"], json!(0));
    server.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn list_filters_reach_the_store_that_holds_them() {
    let server = TestServer::start().await;
    let (client, _, service) = server.seed().await;
    let mut reservations = Vec::new();
    for date in ["2026-12-01", "2026-12-02"] {
        let (status, body) = server
            .post(
                "/api/reservations",
                json!({"clientId": client, "serviceId": service, "reservationDate": date}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        reservations.push(body["data"]["id"].as_i64().unwrap());
    }
    server.put(&format!("/api/reservations/{}/confirm", reservations[1]), json!({})).await;

    let (status, body) = server.get("/api/reservations?status=confirmed").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["data"][0]["id"], json!(reservations[1]));

    let (status, body) = server.get("/api/reservations?date=2026-12-01").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"][0]["id"], json!(reservations[0]));

    let (status, body) = server.get("/api/reservations?status=bogus").await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    let (status, _) = server.get("/api/appointments?status=bogus").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = server.get("/api/products?clientId=1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    for (comment, rating) in [("Great care", 5), ("Long wait", 2)] {
        let input = json!({"clientId": client, "comment": comment, "rating": rating});
        let (status, body) = server.post("/api/feedback", input).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }
    let (status, body) = server.get("/api/feedback?rating=2&responded=false").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["data"][0]["comment"], json!("Long wait"));
    let (status, _) = server.get("/api/feedback?status=new").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    server.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn reschedule_and_reservation_updates_check_references() {
    let server = TestServer::start().await;
    let (client, pet, service) = server.seed().await;
    let (_, body) = server
        .post(
            "/api/appointments",
            json!({
                "clientId": client,
                "petId": pet,
                "serviceId": service,
                "date": "2026-11-03",
                "time": "09:30",
                "motive": "Vaccination",
            }),
        )
        .await;
    let appointment = body["data"]["id"].as_i64().unwrap();
    let (status, body) = server
        .put(&format!("/api/appointments/{appointment}/reschedule"), json!({"staffId": 999}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{body}");

    let (_, body) = server
        .post(
            "/api/reservations",
            json!({"clientId": client, "serviceId": service, "reservationDate": "2026-12-01"}),
        )
        .await;
    let reservation = body["data"]["id"].as_i64().unwrap();
    let (status, body) = server
        .put(
            &format!("/api/reservations/{reservation}"),
            json!({
                "reservationDate": "2026-12-03",
                "status": "confirmed",
                "handledBy": "Dr. Vega",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["reservationDate"], json!("2026-12-03"));
    assert_eq!(body["data"]["details"]["status"], json!("confirmed"));
    assert_eq!(body["data"]["details"]["handledBy"], json!("Dr. Vega"));
    server.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn calendar_lists_live_bookings_in_order() {
    let server = TestServer::start().await;
    let (client, pet, service) = server.seed().await;
    for (date, time) in
        [("2026-11-05", "08:00"), ("2026-11-03", "15:00"), ("2026-11-03", "09:30")]
    {
        let (status, body) = server
            .post(
                "/api/appointments",
                json!({
                    "clientId": client,
                    "petId": pet,
                    "serviceId": service,
                    "date": date,
                    "time": time,
                    "motive": "Check-up",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }

    let (status, body) =
        server.get("/api/appointments/calendar?from=2026-11-01&to=2026-11-04").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let slots: Vec<(&Value, &Value)> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|record| (&record["date"], &record["time"]))
        .collect();
    assert_eq!(slots, vec![
        (&json!("2026-11-03"), &json!("09:30")),
        (&json!("2026-11-03"), &json!("15:00"))
    ]);

    let (status, _) = server.get("/api/appointments/calendar?from=2026-11-01").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    server.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn payments_follow_their_appointments() {
    let server = TestServer::start().await;
    let (client, pet, service) = server.seed().await;
    let (_, body) = server
        .post(
            "/api/appointments",
            json!({
                "clientId": client,
                "petId": pet,
                "serviceId": service,
                "date": "2026-11-03",
                "time": "09:30",
                "motive": "Vaccination",
            }),
        )
        .await;
    let appointment = body["data"]["id"].as_i64().unwrap();

    let input = json!({"appointmentId": appointment, "amount": 25, "method": "cash"});
    let (status, body) = server.post("/api/payments", input).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let payment = body["data"]["id"].as_i64().unwrap();

    let (status, body) = server
        .post("/api/payments", json!({"appointmentId": 999, "amount": 25, "method": "cash"}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{body}");

    let (status, body) = server
        .put(
            &format!("/api/payments/{payment}"),
            json!({"amount": 20, "method": "card", "status": "refunded"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], json!("refunded"));

    let (status, body) = server.get(&format!("/api/clients/{client}/payments")).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"][0]["appointmentDate"], json!("2026-11-03"));

    let (status, body) = server.get("/api/payments?method=barter").await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    let (status, body) = server.get("/api/payments?status=refunded").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
    server.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn promotions_are_redeemable_inside_their_window() {
    let server = TestServer::start().await;
    let (status, body) = server
        .post(
            "/api/promotions",
            json!({
                "description": "Winter checkup",
                "startDate": days_from_today(-1),
                "endDate": days_from_today(3),
                "discount": 10,
                "code": "WINTER26",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let promotion = body["data"]["id"].as_i64().unwrap();

    let (status, body) = server.get("/api/promotions/active").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"][0]["code"], json!("WINTER26"));
    let (_, body) = server.get("/api/promotions/expiring?days=5").await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
    let (status, _) = server.get("/api/promotions/expiring?days=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = server.get("/api/promotions/code/WINTER26").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["description"], json!("Winter checkup"));
    let (_, body) = server.get("/api/promotions/code/WINTER26/validate").await;
    assert_eq!(body["data"]["valid"], json!(true));

    let (status, body) = server
        .put(&format!("/api/promotions/{promotion}/status"), json!({"status": "paused"}))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let (status, _) = server.get("/api/promotions/code/WINTER26").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, body) = server.get("/api/promotions/code/winter/validate").await;
    assert_eq!(body["data"], json!({"valid": false, "promotion": null}));

    let (status, _) = server.delete(&format!("/api/promotions/{promotion}")).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = server.get(&format!("/api/promotions/{promotion}")).await;
    assert_eq!(body["data"]["status"], json!("inactive"));

    let response = server
        .client
        .put(format!("{}/api/clients/1", server.base))
        .json(&json!({"name": "x"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    server.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn bind_failure_reports_the_io_error() {
    let occupied = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = occupied.local_addr().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), &addr.to_string());
    let server = VetClinicServer::with_passphrase(config, "http-test-passphrase").unwrap();

    let message = match server.serve().await {
        Err(ServerError::Transport(message)) => message,
        other => panic!("expected transport error, got {other:?}"),
    };
    let detail = message.strip_prefix("http bind failed: ").unwrap();
    assert!(!detail.is_empty(), "{message}");
    drop(occupied);
}
