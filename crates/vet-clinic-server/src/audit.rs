// crates/vet-clinic-server/src/audit.rs
// ============================================================================
// Module: HTTP Audit Logging
// Description: Structured audit events for mutating HTTP requests.
// Purpose: Emit one JSON line per create, update, delete, or workflow call.
// Dependencies: serde, serde_json, vet-clinic-config
// ============================================================================

//! ## Overview
//! Every `POST`, `PUT`, and `DELETE` handled by the router produces an
//! [`AuditEvent`]. Request and response bodies are never recorded, so PII
//! submitted by clients stays out of the audit trail.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;
use vet_clinic_config::AuditConfig;
use vet_clinic_config::AuditSinkKind;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Outcome classification for an audited request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    /// 2xx response.
    Success,
    /// 4xx response.
    Rejected,
    /// 5xx response.
    Failed,
}

impl AuditOutcome {
    /// Classifies an HTTP status code.
    #[must_use]
    pub const fn from_status(status: u16) -> Self {
        match status {
            200 ..= 399 => Self::Success,
            400 ..= 499 => Self::Rejected,
            _ => Self::Failed,
        }
    }
}

/// Audit event for one mutating request.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// HTTP method.
    pub method: String,
    /// Request path.
    pub path: String,
    /// Response status code.
    pub status: u16,
    /// Outcome classification.
    pub outcome: AuditOutcome,
    /// Handling time in milliseconds.
    pub elapsed_ms: u128,
}

impl AuditEvent {
    /// Creates a new audit event with a consistent timestamp.
    #[must_use]
    pub fn new(method: String, path: String, status: u16, elapsed_ms: u128) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event: "http_mutation",
            timestamp_ms,
            method,
            path,
            status,
            outcome: AuditOutcome::from_status(status),
            elapsed_ms,
        }
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink for HTTP mutation events.
pub trait AuditSink: Send + Sync {
    /// Record an audit event.
    fn record(&self, event: &AuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl AuditSink for StderrAuditSink {
    fn record(&self, event: &AuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that appends JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl AuditSink for FileAuditSink {
    fn record(&self, event: &AuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _event: &AuditEvent) {}
}

/// Builds the configured audit sink.
///
/// # Errors
///
/// Returns an error when the file sink cannot open its path.
pub fn sink_from_config(config: &AuditConfig) -> io::Result<Arc<dyn AuditSink>> {
    let sink: Arc<dyn AuditSink> = match (config.sink, config.path.as_deref()) {
        (AuditSinkKind::Stderr, _) => Arc::new(StderrAuditSink),
        (AuditSinkKind::None, _) => Arc::new(NoopAuditSink),
        (AuditSinkKind::File, Some(path)) => Arc::new(FileAuditSink::new(Path::new(path))?),
        (AuditSinkKind::File, None) => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "audit file sink requires path",
            ));
        }
    };
    Ok(sink)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
