// crates/vet-clinic-store-sqlite/src/config.rs
// ============================================================================
// Module: SQLite Store Configuration
// Description: Connection target, pool sizing, and pragma settings.
// Purpose: Validate store settings before any connection is opened.
// Dependencies: serde, thiserror, vet-clinic-core
// ============================================================================

//! ## Overview
//! Both SQLite backends share one configuration shape. A store is addressed
//! either by a filesystem `path` or by a `file:` URI; exactly one must be set.
//! Pool settings bound connection count, acquisition wait, and idle lifetime.
//! Security posture: configuration is untrusted input and fails closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use vet_clinic_core::StoreError;
use vet_clinic_core::TransientKind;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Default maximum pool size.
const DEFAULT_MAX_CONNECTIONS: u32 = 10;
/// Default idle connections kept warm.
const DEFAULT_MIN_CONNECTIONS: u32 = 1;
/// Default pool acquisition timeout (ms).
const DEFAULT_ACQUIRE_TIMEOUT_MS: u64 = 5_000;
/// Default idle connection lifetime (ms).
const DEFAULT_IDLE_TIMEOUT_MS: u64 = 600_000;
/// Default number of initial pool build attempts.
const DEFAULT_CONNECT_RETRIES: u32 = 3;
/// Maximum pool size accepted by validation.
pub const MAX_POOL_CONNECTIONS: u32 = 256;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// URI scheme accepted for SQLite URI filenames.
const SQLITE_URI_SCHEME: &str = "file:";

// ============================================================================
// SECTION: Modes
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteJournalMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteJournalMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `synchronous` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

// ============================================================================
// SECTION: Config
// ============================================================================

/// Connection pool configuration for a `SQLite` store.
///
/// # Invariants
/// - Exactly one of `path` and `uri` is set.
/// - `path` must resolve to a file path (not a directory).
/// - `min_connections <= max_connections <= MAX_POOL_CONNECTIONS`.
/// - Timeouts are interpreted as milliseconds and must be non-zero.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SqlitePoolConfig {
    /// Path to the `SQLite` database file.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// `SQLite` URI filename (`file:...`).
    #[serde(default)]
    pub uri: Option<String>,
    /// Maximum pool size.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Idle connections kept open.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Maximum wait for a pooled connection (ms).
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
    /// Idle lifetime before a pooled connection is closed (ms).
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// Attempts made when the pool is first built.
    #[serde(default = "default_connect_retries")]
    pub connect_retries: u32,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteJournalMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

/// Returns the default maximum pool size.
const fn default_max_connections() -> u32 {
    DEFAULT_MAX_CONNECTIONS
}

/// Returns the default idle connection count.
const fn default_min_connections() -> u32 {
    DEFAULT_MIN_CONNECTIONS
}

/// Returns the default acquisition timeout.
const fn default_acquire_timeout_ms() -> u64 {
    DEFAULT_ACQUIRE_TIMEOUT_MS
}

/// Returns the default idle lifetime.
const fn default_idle_timeout_ms() -> u64 {
    DEFAULT_IDLE_TIMEOUT_MS
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// Returns the default initial connect attempts.
const fn default_connect_retries() -> u32 {
    DEFAULT_CONNECT_RETRIES
}

impl SqlitePoolConfig {
    /// Builds a configuration addressing a database file with default pool settings.
    #[must_use]
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::unaddressed()
        }
    }

    /// Builds a configuration addressing a `file:` URI with default pool settings.
    #[must_use]
    pub fn for_uri(uri: impl Into<String>) -> Self {
        Self {
            uri: Some(uri.into()),
            ..Self::unaddressed()
        }
    }

    /// Returns defaults with no connection target.
    const fn unaddressed() -> Self {
        Self {
            path: None,
            uri: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            acquire_timeout_ms: DEFAULT_ACQUIRE_TIMEOUT_MS,
            idle_timeout_ms: DEFAULT_IDLE_TIMEOUT_MS,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            connect_retries: DEFAULT_CONNECT_RETRIES,
            journal_mode: SqliteJournalMode::Wal,
            sync_mode: SqliteSyncMode::Full,
        }
    }

    /// Returns the pool acquisition timeout.
    #[must_use]
    pub const fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    /// Returns the idle connection lifetime.
    #[must_use]
    pub const fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    /// Returns the busy timeout.
    #[must_use]
    pub const fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Returns the resolved connection target.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Invalid`] when the target is missing,
    /// ambiguous, or malformed.
    pub fn target(&self) -> Result<SqliteTarget, SqliteStoreError> {
        match (&self.path, &self.uri) {
            (Some(path), None) => {
                validate_store_path(path)?;
                Ok(SqliteTarget::Path(path.clone()))
            }
            (None, Some(uri)) => {
                if !uri.starts_with(SQLITE_URI_SCHEME) {
                    return Err(SqliteStoreError::Invalid(format!(
                        "sqlite uri must start with {SQLITE_URI_SCHEME}"
                    )));
                }
                if uri.len() > MAX_TOTAL_PATH_LENGTH {
                    return Err(SqliteStoreError::Invalid(
                        "sqlite uri exceeds length limit".to_string(),
                    ));
                }
                Ok(SqliteTarget::Uri(uri.clone()))
            }
            (Some(_), Some(_)) => Err(SqliteStoreError::Invalid(
                "set exactly one of path and uri".to_string(),
            )),
            (None, None) => {
                Err(SqliteStoreError::Invalid("path or uri is required".to_string()))
            }
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Invalid`] when a setting is out of range.
    pub fn validate(&self) -> Result<(), SqliteStoreError> {
        self.target()?;
        if self.max_connections == 0 || self.max_connections > MAX_POOL_CONNECTIONS {
            return Err(SqliteStoreError::Invalid(format!(
                "max_connections out of range: {} (max {MAX_POOL_CONNECTIONS})",
                self.max_connections
            )));
        }
        if self.min_connections > self.max_connections {
            return Err(SqliteStoreError::Invalid(
                "min_connections must not exceed max_connections".to_string(),
            ));
        }
        if self.acquire_timeout_ms == 0 || self.idle_timeout_ms == 0 || self.busy_timeout_ms == 0
        {
            return Err(SqliteStoreError::Invalid(
                "timeouts must be greater than zero".to_string(),
            ));
        }
        if self.connect_retries == 0 {
            return Err(SqliteStoreError::Invalid(
                "connect_retries must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Resolved connection target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqliteTarget {
    /// Database file on disk.
    Path(PathBuf),
    /// `SQLite` URI filename.
    Uri(String),
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Database busy or locked past the busy timeout.
    #[error("sqlite store busy: {0}")]
    Busy(String),
    /// Database file could not be opened.
    #[error("sqlite store unreachable: {0}")]
    Unreachable(String),
    /// Pool could not hand out a connection in time.
    #[error("sqlite pool timeout: {0}")]
    Pool(String),
    /// Pool has been closed and not rebuilt.
    #[error("sqlite store closed")]
    Closed,
    /// Invalid store data or configuration.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        let message = error.to_string();
        match error {
            SqliteStoreError::Io(_) | SqliteStoreError::Db(_) => Self::from_message(message),
            SqliteStoreError::Busy(_) => Self::transient(TransientKind::Driver, message),
            SqliteStoreError::Unreachable(_) | SqliteStoreError::Closed => {
                Self::transient(TransientKind::ConnectionRefused, message)
            }
            SqliteStoreError::Pool(_) => Self::transient(TransientKind::Timeout, message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
        }
    }
}

/// Maps a `rusqlite` error onto the store taxonomy.
pub(crate) fn db_error(error: &rusqlite::Error) -> SqliteStoreError {
    let message = error.to_string();
    match error.sqlite_error_code() {
        Some(rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked) => {
            SqliteStoreError::Busy(message)
        }
        Some(rusqlite::ErrorCode::CannotOpen) => SqliteStoreError::Unreachable(message),
        _ => SqliteStoreError::Db(message),
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Ensures the parent directory for the store exists.
pub(crate) fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}
