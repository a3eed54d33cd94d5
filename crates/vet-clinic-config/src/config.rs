// crates/vet-clinic-config/src/config.rs
// ============================================================================
// Module: Vet Clinic Configuration
// Description: Configuration loading and validation for the Vet Clinic backend.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, toml, url, vet-clinic-core, vet-clinic-store-sqlite
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Missing or invalid configuration fails closed. Secrets never live in the
//! file: the cipher passphrase and the document store password are read from
//! environment variables named by the config.
//! Security posture: config inputs are untrusted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use vet_clinic_core::CoordinatorConfig;
use vet_clinic_core::RetryPolicy;
use vet_clinic_store_sqlite::SqliteJournalMode;
use vet_clinic_store_sqlite::SqlitePoolConfig;
use vet_clinic_store_sqlite::SqliteSyncMode;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "vet-clinic.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "VET_CLINIC_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default bind address for the HTTP server.
const DEFAULT_BIND: &str = "127.0.0.1:8080";
/// Default maximum request body size in bytes.
const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
/// Hard upper bound for request bodies.
const MAX_BODY_BYTES_LIMIT: usize = 16 * 1024 * 1024;
/// Default relational database file.
const DEFAULT_RELATIONAL_PATH: &str = "vet-clinic.db";
/// Default document store URI.
const DEFAULT_DOCUMENT_URI: &str = "file:vet-clinic-documents.db";
/// Placeholder replaced by the document store secret.
pub const PASSWORD_PLACEHOLDER: &str = "<PASSWORD>";
/// Default document store pool size.
const DEFAULT_DOCUMENT_MAX_CONNECTIONS: u32 = 10;
/// Default document store connect timeout (ms).
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;
/// Default document store socket timeout (ms).
const DEFAULT_SOCKET_TIMEOUT_MS: u64 = 45_000;
/// Default retry attempts for relational operations.
const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
/// Maximum retry attempts accepted by validation.
const MAX_RETRY_ATTEMPTS: u32 = 10;
/// Default delay between retry attempts (ms).
const DEFAULT_RETRY_DELAY_MS: u64 = 2_000;
/// Maximum retry delay accepted by validation (ms).
const MAX_RETRY_DELAY_MS: u64 = 60_000;
/// Default create deadline (ms).
const DEFAULT_CREATE_DEADLINE_MS: u64 = 15_000;
/// Maximum create deadline accepted by validation (ms).
const MAX_CREATE_DEADLINE_MS: u64 = 300_000;
/// Default environment variable holding the cipher passphrase.
const DEFAULT_PASSPHRASE_ENV: &str = "VET_CLINIC_CIPHER_KEY";
/// Maximum length of an environment variable name.
const MAX_ENV_NAME_LENGTH: usize = 128;
/// Default log filter.
const DEFAULT_LOG_LEVEL: &str = "info";
/// Maximum length of a log filter directive.
const MAX_LOG_LEVEL_LENGTH: usize = 256;

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Vet Clinic configuration root.
///
/// # Invariants
/// - Unknown keys are rejected at every level.
/// - [`VetClinicConfig::validate`] has succeeded for any value returned by
///   [`VetClinicConfig::load`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VetClinicConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Relational store configuration.
    #[serde(default = "default_relational")]
    pub relational: SqlitePoolConfig,
    /// Document store configuration.
    #[serde(default)]
    pub document: DocumentStoreConfig,
    /// Dual-write coordinator tuning.
    #[serde(default)]
    pub coordinator: CoordinatorSettings,
    /// Field cipher configuration.
    #[serde(default)]
    pub cipher: CipherConfig,
    /// Audit sink configuration.
    #[serde(default)]
    pub audit: AuditConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for VetClinicConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            relational: default_relational(),
            document: DocumentStoreConfig::default(),
            coordinator: CoordinatorSettings::default(),
            cipher: CipherConfig::default(),
            audit: AuditConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Returns the default relational store configuration.
fn default_relational() -> SqlitePoolConfig {
    SqlitePoolConfig::for_path(DEFAULT_RELATIONAL_PATH)
}

impl VetClinicConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::parse(content)
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// Environment-backed secrets are not read here; see
    /// [`CipherConfig::passphrase`] and [`DocumentStoreConfig::pool_config`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.relational
            .validate()
            .map_err(|err| ConfigError::Invalid(format!("relational: {err}")))?;
        self.document.validate()?;
        self.coordinator.validate()?;
        self.cipher.validate()?;
        self.audit.validate()?;
        self.logging.validate()?;
        let document_file = self.document.uri.trim_start_matches("file:").split('?').next();
        if let Some(path) = &self.relational.path
            && document_file == Some(&*path.to_string_lossy())
        {
            return Err(ConfigError::Invalid(
                "relational and document stores must use different databases".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Socket address to bind.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// Returns the default bind address.
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

/// Returns the default body size limit.
const fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

impl ServerConfig {
    /// Returns the parsed bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the address does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid("invalid bind address".to_string()))
    }

    /// Validates server settings.
    fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_body_bytes must be greater than zero".to_string(),
            ));
        }
        if self.max_body_bytes > MAX_BODY_BYTES_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "max_body_bytes too large (max {MAX_BODY_BYTES_LIMIT})"
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Document Store
// ============================================================================

/// Document store configuration.
///
/// # Invariants
/// - `uri` contains [`PASSWORD_PLACEHOLDER`] exactly when `password_env` is set.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DocumentStoreConfig {
    /// Connection URI, optionally carrying [`PASSWORD_PLACEHOLDER`].
    #[serde(default = "default_document_uri")]
    pub uri: String,
    /// Environment variable holding the secret substituted into `uri`.
    #[serde(default)]
    pub password_env: Option<String>,
    /// Maximum pool size.
    #[serde(default = "default_document_max_connections")]
    pub max_connections: u32,
    /// Pool acquisition timeout (ms).
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Busy timeout applied to each statement (ms).
    #[serde(default = "default_socket_timeout_ms")]
    pub socket_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteJournalMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for DocumentStoreConfig {
    fn default() -> Self {
        Self {
            uri: default_document_uri(),
            password_env: None,
            max_connections: default_document_max_connections(),
            connect_timeout_ms: default_connect_timeout_ms(),
            socket_timeout_ms: default_socket_timeout_ms(),
            journal_mode: SqliteJournalMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default document store URI.
fn default_document_uri() -> String {
    DEFAULT_DOCUMENT_URI.to_string()
}

/// Returns the default document store pool size.
const fn default_document_max_connections() -> u32 {
    DEFAULT_DOCUMENT_MAX_CONNECTIONS
}

/// Returns the default connect timeout.
const fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

/// Returns the default socket timeout.
const fn default_socket_timeout_ms() -> u64 {
    DEFAULT_SOCKET_TIMEOUT_MS
}

impl DocumentStoreConfig {
    /// Validates document store settings without reading secrets.
    fn validate(&self) -> Result<(), ConfigError> {
        let has_placeholder = self.uri.contains(PASSWORD_PLACEHOLDER);
        match &self.password_env {
            Some(name) => {
                validate_env_name("document.password_env", name)?;
                if !has_placeholder {
                    return Err(ConfigError::Invalid(format!(
                        "document.uri must contain {PASSWORD_PLACEHOLDER} when password_env is set"
                    )));
                }
            }
            None if has_placeholder => {
                return Err(ConfigError::Invalid(format!(
                    "document.uri contains {PASSWORD_PLACEHOLDER} but password_env is unset"
                )));
            }
            None => {}
        }
        let probe = self.build_pool_config(self.uri.replace(PASSWORD_PLACEHOLDER, "redacted"));
        probe.validate().map_err(|err| ConfigError::Invalid(format!("document: {err}")))
    }

    /// Returns the connection URI with the secret substituted from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the secret variable is unset or empty.
    pub fn resolved_uri(&self) -> Result<String, ConfigError> {
        self.resolved_uri_with(|name| env::var(name).ok())
    }

    /// Returns the connection URI with the secret taken from `lookup`.
    ///
    /// The secret is percent-encoded before substitution.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the secret is missing or empty.
    pub fn resolved_uri_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<String, ConfigError> {
        let Some(name) = &self.password_env else {
            return Ok(self.uri.clone());
        };
        let secret = lookup(name)
            .filter(|secret| !secret.is_empty())
            .ok_or_else(|| ConfigError::Invalid(format!("environment variable {name} is unset")))?;
        Ok(self.uri.replace(PASSWORD_PLACEHOLDER, &percent_encode(&secret)))
    }

    /// Returns the pool configuration for the resolved URI.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the secret cannot be resolved.
    pub fn pool_config(&self) -> Result<SqlitePoolConfig, ConfigError> {
        Ok(self.build_pool_config(self.resolved_uri()?))
    }

    /// Maps document settings onto a pool configuration.
    fn build_pool_config(&self, uri: String) -> SqlitePoolConfig {
        SqlitePoolConfig {
            max_connections: self.max_connections,
            min_connections: self.max_connections.min(1),
            acquire_timeout_ms: self.connect_timeout_ms,
            busy_timeout_ms: self.socket_timeout_ms,
            journal_mode: self.journal_mode,
            sync_mode: self.sync_mode,
            ..SqlitePoolConfig::for_uri(uri)
        }
    }
}

/// Percent-encodes a secret for URI embedding.
fn percent_encode(secret: &str) -> String {
    url::form_urlencoded::byte_serialize(secret.as_bytes()).collect::<String>().replace('+', "%20")
}

// ============================================================================
// SECTION: Coordinator
// ============================================================================

/// Dual-write coordinator tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CoordinatorSettings {
    /// Attempts per relational operation.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    /// Fixed delay between attempts (ms).
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Deadline for a whole create (ms).
    #[serde(default = "default_create_deadline_ms")]
    pub create_deadline_ms: u64,
    /// Check connection health before mutations.
    #[serde(default = "default_verify_connection")]
    pub verify_connection: bool,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            create_deadline_ms: default_create_deadline_ms(),
            verify_connection: default_verify_connection(),
        }
    }
}

/// Returns the default retry attempts.
const fn default_retry_attempts() -> u32 {
    DEFAULT_RETRY_ATTEMPTS
}

/// Returns the default retry delay.
const fn default_retry_delay_ms() -> u64 {
    DEFAULT_RETRY_DELAY_MS
}

/// Returns the default create deadline.
const fn default_create_deadline_ms() -> u64 {
    DEFAULT_CREATE_DEADLINE_MS
}

/// Returns the default connection check flag.
const fn default_verify_connection() -> bool {
    true
}

impl CoordinatorSettings {
    /// Returns the runtime coordinator configuration.
    #[must_use]
    pub const fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            retry: RetryPolicy::new(
                self.retry_attempts,
                Duration::from_millis(self.retry_delay_ms),
            ),
            create_deadline: Duration::from_millis(self.create_deadline_ms),
            verify_connection: self.verify_connection,
        }
    }

    /// Validates coordinator tuning.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.retry_attempts == 0 || self.retry_attempts > MAX_RETRY_ATTEMPTS {
            return Err(ConfigError::Invalid(format!(
                "coordinator.retry_attempts out of range (1..={MAX_RETRY_ATTEMPTS})"
            )));
        }
        if self.retry_delay_ms > MAX_RETRY_DELAY_MS {
            return Err(ConfigError::Invalid(format!(
                "coordinator.retry_delay_ms too large (max {MAX_RETRY_DELAY_MS})"
            )));
        }
        if self.create_deadline_ms == 0 || self.create_deadline_ms > MAX_CREATE_DEADLINE_MS {
            return Err(ConfigError::Invalid(format!(
                "coordinator.create_deadline_ms out of range (1..={MAX_CREATE_DEADLINE_MS})"
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Cipher
// ============================================================================

/// Field cipher configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CipherConfig {
    /// Environment variable holding the passphrase.
    #[serde(default = "default_passphrase_env")]
    pub passphrase_env: String,
}

impl Default for CipherConfig {
    fn default() -> Self {
        Self {
            passphrase_env: default_passphrase_env(),
        }
    }
}

/// Returns the default passphrase variable name.
fn default_passphrase_env() -> String {
    DEFAULT_PASSPHRASE_ENV.to_string()
}

impl CipherConfig {
    /// Reads the passphrase from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the variable is unset or empty.
    pub fn passphrase(&self) -> Result<String, ConfigError> {
        self.passphrase_with(|name| env::var(name).ok())
    }

    /// Reads the passphrase through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the value is missing or empty.
    pub fn passphrase_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<String, ConfigError> {
        lookup(&self.passphrase_env).filter(|value| !value.is_empty()).ok_or_else(|| {
            ConfigError::Invalid(format!("environment variable {} is unset", self.passphrase_env))
        })
    }

    /// Validates cipher settings.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_env_name("cipher.passphrase_env", &self.passphrase_env)
    }
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit sink selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to a file.
    File,
    /// Audit events are discarded.
    None,
}

/// Audit logging configuration for mutating requests.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Sink receiving audit events.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Audit log path (JSON lines); required for the file sink.
    #[serde(default)]
    pub path: Option<String>,
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("audit.path", path)?;
        }
        if self.sink == AuditSinkKind::File && self.path.is_none() {
            return Err(ConfigError::Invalid(
                "audit.path is required for the file sink".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Logging
// ============================================================================

/// Diagnostic logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Returns the default log filter.
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl LoggingConfig {
    /// Validates logging configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        let level = self.level.trim();
        if level.is_empty() {
            return Err(ConfigError::Invalid("logging.level must be non-empty".to_string()));
        }
        if level.len() > MAX_LOG_LEVEL_LENGTH {
            return Err(ConfigError::Invalid("logging.level too long".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} component too long")));
        }
    }
    Ok(())
}

/// Validates an environment variable name.
fn validate_env_name(field: &str, name: &str) -> Result<(), ConfigError> {
    if name.is_empty() || name.len() > MAX_ENV_NAME_LENGTH {
        return Err(ConfigError::Invalid(format!(
            "{field} must be 1..={MAX_ENV_NAME_LENGTH} chars"
        )));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ConfigError::Invalid(format!("{field} must be [A-Za-z0-9_]")));
    }
    Ok(())
}
