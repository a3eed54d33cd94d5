// crates/vet-clinic-server/src/server.rs
// ============================================================================
// Module: Vet Clinic Server
// Description: Store wiring, HTTP listener, and graceful shutdown.
// Purpose: Build every runtime handle from configuration and serve the router.
// Dependencies: axum, tokio, vet-clinic-config, vet-clinic-core, vet-clinic-store-sqlite
// ============================================================================

//! ## Overview
//! [`VetClinicServer`] opens both `SQLite` pools, derives the field cipher from
//! the configured passphrase, and wires the coordinator with a relational
//! health monitor. On shutdown both pools are closed before `serve` returns.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tracing::info;
use tracing::warn;
use vet_clinic_config::VetClinicConfig;
use vet_clinic_core::AesGcmFieldCipher;
use vet_clinic_core::ConnectionHealthMonitor;
use vet_clinic_core::ConnectionLifecycle;
use vet_clinic_core::DualWriteCoordinator;
use vet_clinic_core::FieldCipher;
use vet_clinic_core::RelationalDirectory;
use vet_clinic_store_sqlite::SqliteDocumentStore;
use vet_clinic_store_sqlite::SqliteRelationalStore;

use crate::audit::sink_from_config;
use crate::routes::router;
use crate::state::AppState;
use crate::state::SharedState;

// ============================================================================
// SECTION: Server
// ============================================================================

/// Vet Clinic HTTP server instance.
pub struct VetClinicServer {
    /// Server configuration.
    config: VetClinicConfig,
    /// Relational store handle, closed on shutdown.
    relational: Arc<SqliteRelationalStore>,
    /// Document store handle, closed on shutdown.
    documents: Arc<SqliteDocumentStore>,
    /// Shared handler state.
    state: SharedState,
}

impl VetClinicServer {
    /// Builds a server, reading the cipher passphrase from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when configuration or initialization fails.
    pub fn from_config(config: VetClinicConfig) -> Result<Self, ServerError> {
        let passphrase =
            config.cipher.passphrase().map_err(|err| ServerError::Config(err.to_string()))?;
        Self::with_passphrase(config, &passphrase)
    }

    /// Builds a server with an explicit cipher passphrase.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when configuration or initialization fails.
    pub fn with_passphrase(config: VetClinicConfig, passphrase: &str) -> Result<Self, ServerError> {
        config.validate().map_err(|err| ServerError::Config(err.to_string()))?;
        let cipher: Arc<dyn FieldCipher> = Arc::new(
            AesGcmFieldCipher::from_passphrase(passphrase)
                .map_err(|err| ServerError::Init(err.to_string()))?,
        );
        let document_pool =
            config.document.pool_config().map_err(|err| ServerError::Config(err.to_string()))?;
        let relational = Arc::new(
            SqliteRelationalStore::open(config.relational.clone())
                .map_err(|err| ServerError::Init(format!("relational store: {err}")))?,
        );
        let documents = Arc::new(
            SqliteDocumentStore::open(document_pool)
                .map_err(|err| ServerError::Init(format!("document store: {err}")))?,
        );
        let audit = sink_from_config(&config.audit)
            .map_err(|err| ServerError::Init(format!("audit sink: {err}")))?;

        let coordinator_config = config.coordinator.coordinator_config();
        let relational_health = ConnectionHealthMonitor::new(relational.clone());
        let coordinator = DualWriteCoordinator::new(
            relational.clone(),
            documents.clone(),
            Arc::clone(&cipher),
            coordinator_config,
        )
        .with_health_monitor(relational_health.clone());
        let directory =
            RelationalDirectory::new(relational.clone(), cipher, coordinator_config.retry);
        let state = AppState::new(coordinator, directory, audit)
            .with_probe("relational", relational_health)
            .with_probe("document", ConnectionHealthMonitor::new(documents.clone()));
        info!("vet clinic server initialized");
        Ok(Self {
            config,
            relational,
            documents,
            state: Arc::new(state),
        })
    }

    /// Returns the application router.
    #[must_use]
    pub fn router(&self) -> Router {
        router(Arc::clone(&self.state), self.config.server.max_body_bytes)
    }

    /// Returns the configured bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] when the address is invalid.
    pub fn bind_addr(&self) -> Result<SocketAddr, ServerError> {
        self.config.server.bind_addr().map_err(|err| ServerError::Config(err.to_string()))
    }

    /// Serves on the configured address until ctrl-c.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), ServerError> {
        let addr = self.bind_addr()?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|err| ServerError::Transport(format!("http bind failed: {err}")))?;
        self.serve_with(listener, shutdown_signal()).await
    }

    /// Serves on an existing listener until `shutdown` resolves, then closes the stores.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Transport`] when the server fails.
    pub async fn serve_with<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if let Ok(addr) = listener.local_addr() {
            info!(%addr, "vet clinic server listening");
        }
        let result = axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|err| ServerError::Transport(format!("http server failed: {err}")));
        self.close().await;
        result
    }

    /// Closes both store pools.
    pub async fn close(&self) {
        if let Err(err) = self.relational.close().await {
            warn!(error = %err, "closing relational store failed");
        }
        if let Err(err) = self.documents.close().await {
            warn!(error = %err, "closing document store failed");
        }
        info!("stores closed");
    }
}

/// Resolves when ctrl-c is received; never resolves if the handler cannot be installed.
async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "ctrl-c handler failed, graceful shutdown disabled");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}
