// crates/vet-clinic-store-sqlite/src/pool.rs
// ============================================================================
// Module: SQLite Connection Pool
// Description: r2d2 connection manager and a closable, rebuildable pool handle.
// Purpose: Run blocking SQLite work off the async executor with bounded connections.
// Dependencies: r2d2, rusqlite, tokio, tracing
// ============================================================================

//! ## Overview
//! [`SqliteConnectionManager`] opens connections with the configured pragmas.
//! [`SqlitePool`] owns the r2d2 pool behind an async lock so the health
//! monitor can tear it down and build a fresh one while requests continue to
//! hold the old handle. Every operation runs on the blocking thread pool.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use r2d2::ManageConnection;
use r2d2::Pool;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use tokio::sync::RwLock;
use tracing::info;
use tracing::warn;
use vet_clinic_core::StoreError;

use crate::config::SqlitePoolConfig;
use crate::config::SqliteStoreError;
use crate::config::SqliteTarget;
use crate::config::db_error;
use crate::config::ensure_parent_dir;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Pause between initial pool build attempts.
const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(250);

/// Schema initializer run on a fresh pool.
pub type SchemaInit = fn(&mut Connection) -> Result<(), SqliteStoreError>;

// ============================================================================
// SECTION: Connection Manager
// ============================================================================

/// r2d2 connection manager for `SQLite`.
#[derive(Debug, Clone)]
pub struct SqliteConnectionManager {
    /// Database file or URI.
    target: SqliteTarget,
    /// Settings applied to every new connection.
    config: SqlitePoolConfig,
}

impl SqliteConnectionManager {
    /// Creates a manager, creating the parent directory of file targets.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the configuration is invalid.
    pub fn new(config: &SqlitePoolConfig) -> Result<Self, SqliteStoreError> {
        let target = config.target()?;
        if let SqliteTarget::Path(path) = &target {
            ensure_parent_dir(path)?;
        }
        Ok(Self {
            target,
            config: config.clone(),
        })
    }

    /// Opens a connection with secure defaults.
    fn open(&self) -> Result<Connection, rusqlite::Error> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
        let connection = match &self.target {
            SqliteTarget::Path(path) => Connection::open_with_flags(path, flags)?,
            SqliteTarget::Uri(uri) => {
                Connection::open_with_flags(uri, flags | OpenFlags::SQLITE_OPEN_URI)?
            }
        };
        apply_pragmas(&connection, &self.config)?;
        Ok(connection)
    }
}

impl ManageConnection for SqliteConnectionManager {
    type Connection = Connection;
    type Error = rusqlite::Error;

    fn connect(&self) -> Result<Connection, rusqlite::Error> {
        self.open()
    }

    fn is_valid(&self, connection: &mut Connection) -> Result<(), rusqlite::Error> {
        connection.query_row("SELECT 1", [], |row| row.get::<_, i64>(0)).map(|_| ())
    }

    fn has_broken(&self, _connection: &mut Connection) -> bool {
        false
    }
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqlitePoolConfig,
) -> Result<(), rusqlite::Error> {
    connection.execute_batch("PRAGMA foreign_keys = ON;")?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))?;
    connection.busy_timeout(config.busy_timeout())?;
    Ok(())
}

// ============================================================================
// SECTION: Pool
// ============================================================================

/// Closable `SQLite` connection pool.
///
/// # Invariants
/// - A closed pool rejects work with [`SqliteStoreError::Closed`] until rebuilt.
/// - The schema initializer runs on every freshly built pool.
pub struct SqlitePool {
    /// Pool settings, reused on rebuild.
    config: SqlitePoolConfig,
    /// Idempotent schema initializer.
    init: SchemaInit,
    /// Active pool; `None` after close.
    pool: RwLock<Option<Pool<SqliteConnectionManager>>>,
}

impl Drop for SqlitePool {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.get_mut().take() {
            let _ = std::thread::spawn(move || drop(pool));
        }
    }
}

impl SqlitePool {
    /// Builds the pool, retrying up to `connect_retries` times, and initializes the schema.
    ///
    /// Blocks the calling thread while connections are opened.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the configuration is invalid or no
    /// attempt produced a usable pool.
    pub fn open(config: SqlitePoolConfig, init: SchemaInit) -> Result<Self, SqliteStoreError> {
        config.validate()?;
        let mut attempt = 1;
        let pool = loop {
            match build_pool(&config, init) {
                Ok(pool) => break pool,
                Err(err) if attempt < config.connect_retries => {
                    warn!(attempt, error = %err, "sqlite pool build failed; retrying");
                    std::thread::sleep(CONNECT_RETRY_DELAY);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        };
        info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "sqlite pool ready"
        );
        Ok(Self {
            config,
            init,
            pool: RwLock::new(Some(pool)),
        })
    }

    /// Returns the pool configuration.
    #[must_use]
    pub const fn config(&self) -> &SqlitePoolConfig {
        &self.config
    }

    /// Runs blocking work against a pooled connection.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the pool is closed, acquisition times out,
    /// or the work fails.
    pub async fn run<T, F>(&self, work: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, SqliteStoreError> + Send + 'static,
    {
        let pool = self.pool.read().await.clone().ok_or(SqliteStoreError::Closed)?;
        tokio::task::spawn_blocking(move || {
            let mut connection =
                pool.get().map_err(|err| SqliteStoreError::Pool(err.to_string()))?;
            work(&mut *connection)
        })
        .await
        .map_err(|err| StoreError::Store(format!("sqlite task failed: {err}")))?
        .map_err(StoreError::from)
    }

    /// Runs a trivial query to confirm the database answers.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the round trip fails.
    pub async fn ping(&self) -> Result<(), StoreError> {
        self.run(|connection| {
            connection
                .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map(|_| ())
                .map_err(|err| db_error(&err))
        })
        .await
    }

    /// Drops the pool; in-flight work keeps its own handle until it finishes.
    pub async fn close(&self) {
        if let Some(pool) = self.pool.write().await.take() {
            let _ = std::thread::spawn(move || drop(pool));
            info!("sqlite pool closed");
        }
    }

    /// Builds a fresh pool and swaps it in.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the rebuild fails; the previous pool state is kept.
    pub async fn reinitialize(&self) -> Result<(), StoreError> {
        let config = self.config.clone();
        let init = self.init;
        let fresh = tokio::task::spawn_blocking(move || build_pool(&config, init))
            .await
            .map_err(|err| StoreError::Store(format!("sqlite task failed: {err}")))??;
        let previous = self.pool.write().await.replace(fresh);
        if let Some(previous) = previous {
            let _ = std::thread::spawn(move || drop(previous));
        }
        info!("sqlite pool reinitialized");
        Ok(())
    }
}

/// Builds a pool and runs the schema initializer on one of its connections.
fn build_pool(
    config: &SqlitePoolConfig,
    init: SchemaInit,
) -> Result<Pool<SqliteConnectionManager>, SqliteStoreError> {
    let manager = SqliteConnectionManager::new(config)?;
    let pool = Pool::builder()
        .max_size(config.max_connections)
        .min_idle(Some(config.min_connections))
        .connection_timeout(config.acquire_timeout())
        .idle_timeout(Some(config.idle_timeout()))
        .build(manager)
        .map_err(|err| SqliteStoreError::Unreachable(err.to_string()))?;
    let mut connection = pool.get().map_err(|err| SqliteStoreError::Pool(err.to_string()))?;
    init(&mut *connection)?;
    drop(connection);
    Ok(pool)
}
