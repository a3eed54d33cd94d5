// crates/vet-clinic-server/tests/common/mod.rs
// ============================================================================
// Module: HTTP Test Harness
// Description: Boots the server on an ephemeral port over temporary databases.
// Purpose: Share server lifecycle and request helpers across HTTP tests.
// ============================================================================

//! ## Overview
//! [`TestServer`] writes a config pointing both stores and the audit log at a
//! temporary directory, serves the router on `127.0.0.1:0`, and shuts down
//! gracefully when dropped through [`TestServer::shutdown`].

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
    dead_code,
    reason = "Test-only harness helpers; not every test uses every helper."
)]

use std::path::Path;
use std::path::PathBuf;

use reqwest::StatusCode;
use serde_json::Value;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use vet_clinic_config::VetClinicConfig;
use vet_clinic_server::ServerError;
use vet_clinic_server::VetClinicServer;

/// Running server plus the handles needed to stop it.
pub struct TestServer {
    pub base: String,
    pub client: reqwest::Client,
    pub dir: TempDir,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<Result<(), ServerError>>>,
}

impl TestServer {
    pub async fn start() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), "127.0.0.1:0");
        let server = VetClinicServer::with_passphrase(config, "http-test-passphrase").unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(server.serve_with(listener, async move {
            let _ = rx.await;
        }));
        Self {
            base: format!("http://{addr}"),
            client: reqwest::Client::new(),
            dir,
            shutdown: Some(tx),
            handle: Some(handle),
        }
    }

    pub fn audit_path(&self) -> PathBuf {
        self.dir.path().join("audit.jsonl")
    }

    pub async fn get(&self, path: &str) -> (StatusCode, Value) {
        let response = self.client.get(format!("{}{path}", self.base)).send().await.unwrap();
        read(response).await
    }

    pub async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let response =
            self.client.post(format!("{}{path}", self.base)).json(&body).send().await.unwrap();
        read(response).await
    }

    pub async fn put(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let response =
            self.client.put(format!("{}{path}", self.base)).json(&body).send().await.unwrap();
        read(response).await
    }

    pub async fn delete(&self, path: &str) -> (StatusCode, Value) {
        let response = self.client.delete(format!("{}{path}", self.base)).send().await.unwrap();
        read(response).await
    }

    pub async fn post_raw(&self, path: &str, body: &'static str) -> (StatusCode, Value) {
        let response = self
            .client
            .post(format!("{}{path}", self.base))
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .unwrap();
        read(response).await
    }

    /// Creates a client, pet, and service; returns their ids.
    pub async fn seed(&self) -> (i64, i64, i64) {
        let input = serde_json::json!({"name": "Ana Ruiz", "nationalId": "0102030405"});
        let (status, client) = self.post("/api/clients", input).await;
        assert_eq!(status, StatusCode::CREATED, "{client}");
        let client = client["data"]["id"].as_i64().unwrap();
        let input = serde_json::json!({"clientId": client, "name": "Luna", "species": "cat"});
        let (status, pet) = self.post("/api/pets", input).await;
        assert_eq!(status, StatusCode::CREATED, "{pet}");
        let pet = pet["data"]["id"].as_i64().unwrap();
        let input = serde_json::json!({
            "name": "Consultation",
            "description": "General check-up",
            "price": 25.0,
        });
        let (status, service) = self.post("/api/services", input).await;
        assert_eq!(status, StatusCode::CREATED, "{service}");
        let service = service["data"]["id"].as_i64().unwrap();
        (client, pet, service)
    }

    pub async fn shutdown(mut self) -> TempDir {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.await.unwrap().unwrap();
        }
        self.dir
    }
}

/// Builds a config pointing both stores and the audit log under `dir`.
pub fn test_config(dir: &Path, bind: &str) -> VetClinicConfig {
    let toml = format!(
        r#"
[server]
bind = "{bind}"

[relational]
path = "{relational}"

[document]
uri = "file:{documents}"

[coordinator]
retry_attempts = 2
retry_delay_ms = 10

[audit]
sink = "file"
path = "{audit}"
"#,
        relational = dir.join("clinic.db").display(),
        documents = dir.join("documents.db").display(),
        audit = dir.join("audit.jsonl").display(),
    );
    VetClinicConfig::parse(&toml).unwrap()
}

async fn read(response: reqwest::Response) -> (StatusCode, Value) {
    let status = response.status();
    let body = response.json::<Value>().await.unwrap();
    (status, body)
}
