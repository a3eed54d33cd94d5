// crates/vet-clinic-core/src/interfaces/mod.rs
// ============================================================================
// Module: Vet Clinic Interfaces
// Description: Backend-agnostic interfaces for stores, connection lifecycle, and ciphers.
// Purpose: Define the contract surface the coordinator depends on.
// Dependencies: crate::core, async-trait, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Interfaces define how the coordinator reaches the relational store, the
//! document store, and the field cipher. Backends must classify connection
//! failures as [`StoreError::Transient`] so the retry executor can absorb them.
//! Security posture: stored values are untrusted and must be validated on read.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;
use std::fmt;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::core::CollectionSpec;
use crate::core::ColumnKind;
use crate::core::DocumentId;
use crate::core::FieldMap;
use crate::core::PRIMARY_KEY;
use crate::core::RecordId;
use crate::core::SchemaError;
use crate::core::TableSpec;

// ============================================================================
// SECTION: Store Errors
// ============================================================================

/// Classification of a likely-recoverable store failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientKind {
    /// Peer reset the connection.
    ConnectionReset,
    /// Operation or connection acquisition timed out.
    Timeout,
    /// Connection could not be established.
    ConnectionRefused,
    /// Driver reported a retryable condition (busy, locked).
    Driver,
}

impl TransientKind {
    /// Returns a stable label for logs and error messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ConnectionReset => "connection_reset",
            Self::Timeout => "timeout",
            Self::ConnectionRefused => "connection_refused",
            Self::Driver => "driver",
        }
    }

    /// Classifies a backend error message by its well-known markers.
    #[must_use]
    pub fn classify(message: &str) -> Option<Self> {
        let lower = message.to_ascii_lowercase();
        if lower.contains("econnreset") || lower.contains("connection reset") {
            Some(Self::ConnectionReset)
        } else if lower.contains("etimedout") || lower.contains("timed out") {
            Some(Self::Timeout)
        } else if lower.contains("econnrefused") || lower.contains("connection refused") {
            Some(Self::ConnectionRefused)
        } else if lower.contains("database is locked") || lower.contains("database is busy") {
            Some(Self::Driver)
        } else {
            None
        }
    }
}

impl fmt::Display for TransientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Store errors shared by relational and document backends.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Likely-recoverable connection or driver failure.
    #[error("transient store failure ({kind}): {message}")]
    Transient {
        /// Failure classification.
        kind: TransientKind,
        /// Backend message.
        message: String,
    },
    /// Store rejected or returned invalid data.
    #[error("store invalid data: {0}")]
    Invalid(String),
    /// Store reported a non-retryable error.
    #[error("store error: {0}")]
    Store(String),
}

impl StoreError {
    /// Builds a transient error.
    #[must_use]
    pub fn transient(kind: TransientKind, message: impl Into<String>) -> Self {
        Self::Transient {
            kind,
            message: message.into(),
        }
    }

    /// Builds an error from a backend message, classifying well-known transient markers.
    #[must_use]
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        match TransientKind::classify(&message) {
            Some(kind) => Self::Transient {
                kind,
                message,
            },
            None => Self::Store(message),
        }
    }

    /// Returns true when the failure is eligible for retry.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

impl From<SchemaError> for StoreError {
    fn from(error: SchemaError) -> Self {
        Self::Invalid(error.to_string())
    }
}

// ============================================================================
// SECTION: Queries
// ============================================================================

/// Row filter applied to base-table columns.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Column equals the value.
    Eq {
        /// Column name.
        column: String,
        /// Expected value.
        value: Value,
    },
    /// Column equals any of the values.
    In {
        /// Column name.
        column: String,
        /// Accepted values.
        values: Vec<Value>,
    },
    /// Column is greater than or equal to the value.
    AtLeast {
        /// Column name.
        column: String,
        /// Inclusive lower bound.
        value: Value,
    },
    /// Column is less than or equal to the value.
    AtMost {
        /// Column name.
        column: String,
        /// Inclusive upper bound.
        value: Value,
    },
}

impl Filter {
    /// Builds an equality filter.
    #[must_use]
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Builds a membership filter.
    #[must_use]
    pub fn any_of(column: impl Into<String>, values: Vec<Value>) -> Self {
        Self::In {
            column: column.into(),
            values,
        }
    }

    /// Builds an inclusive lower-bound filter.
    #[must_use]
    pub fn at_least(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::AtLeast {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Builds an inclusive upper-bound filter.
    #[must_use]
    pub fn at_most(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::AtMost {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Returns the filtered column name.
    #[must_use]
    pub fn column(&self) -> &str {
        match self {
            Self::Eq {
                column, ..
            }
            | Self::In {
                column, ..
            }
            | Self::AtLeast {
                column, ..
            }
            | Self::AtMost {
                column, ..
            } => column,
        }
    }

    /// Returns true when the row satisfies the filter.
    ///
    /// Range bounds never match a null or a value of a different JSON type.
    #[must_use]
    pub fn matches(&self, row: &FieldMap) -> bool {
        let actual = row.get(self.column()).unwrap_or(&Value::Null);
        match self {
            Self::Eq {
                value, ..
            } => actual == value,
            Self::In {
                values, ..
            } => values.iter().any(|value| actual == value),
            Self::AtLeast {
                value, ..
            } => same_kind(actual, value) && compare_scalars(actual, value) != Ordering::Less,
            Self::AtMost {
                value, ..
            } => same_kind(actual, value) && compare_scalars(actual, value) != Ordering::Greater,
        }
    }
}

/// Returns true when both values are numbers or both are strings.
fn same_kind(left: &Value, right: &Value) -> bool {
    matches!(
        (left, right),
        (Value::Number(_), Value::Number(_)) | (Value::String(_), Value::String(_))
    )
}

/// Orders JSON scalars: nulls first, then numbers, then strings.
pub(crate) fn compare_scalars(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => {
            let left = left.as_f64().unwrap_or_default();
            let right = right.as_f64().unwrap_or_default();
            left.partial_cmp(&right).unwrap_or(Ordering::Equal)
        }
        (Value::String(left), Value::String(right)) => left.cmp(right),
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Number(_), _) => Ordering::Less,
        (_, Value::Number(_)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

/// Result ordering on a base-table column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    /// Column name.
    pub column: String,
    /// Sort descending when true.
    pub descending: bool,
}

/// Filtered select over a table and its declared joins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectQuery {
    /// Conjunctive filters.
    pub filters: Vec<Filter>,
    /// Ordering, applied in sequence.
    pub order: Vec<OrderBy>,
    /// Optional row limit.
    pub limit: Option<u32>,
}

impl SelectQuery {
    /// Builds a point lookup by primary key.
    #[must_use]
    pub fn by_id(id: RecordId) -> Self {
        Self::default().filter(Filter::eq(PRIMARY_KEY, id.get())).limit(1)
    }

    /// Adds a filter.
    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Adds an ordering clause.
    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>, descending: bool) -> Self {
        self.order.push(OrderBy {
            column: column.into(),
            descending,
        });
        self
    }

    /// Sets the row limit.
    #[must_use]
    pub const fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Validates filter and order columns against the table.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Invalid`] when a column is not declared.
    pub fn validate(&self, table: &TableSpec) -> Result<(), StoreError> {
        let columns = self
            .filters
            .iter()
            .map(Filter::column)
            .chain(self.order.iter().map(|order| order.column.as_str()));
        for column in columns {
            if !table.knows_column(column) {
                return Err(StoreError::Invalid(format!(
                    "unknown column {column} for table {}",
                    table.name
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Relational Store
// ============================================================================

/// Outcome of an atomic counter adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterUpdate {
    /// The adjustment committed; carries the new value.
    Applied(i64),
    /// No row has the key.
    Missing,
    /// The adjustment would take the counter below zero; carries the current value.
    Insufficient(i64),
}

/// Relational store for normalized entity tables.
///
/// Rows returned by `find` and `select` carry the primary key under
/// [`PRIMARY_KEY`]; `select` additionally carries join aliases.
#[async_trait]
pub trait RelationalStore: Send + Sync {
    /// Inserts a row and returns the generated primary key, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the insert fails.
    async fn insert(
        &self,
        table: &'static TableSpec,
        row: FieldMap,
    ) -> Result<Option<RecordId>, StoreError>;

    /// Loads a row by primary key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    async fn find(
        &self,
        table: &'static TableSpec,
        id: RecordId,
    ) -> Result<Option<FieldMap>, StoreError>;

    /// Updates columns of a row by primary key; returns whether a row matched.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the update fails.
    async fn update(
        &self,
        table: &'static TableSpec,
        id: RecordId,
        fields: FieldMap,
    ) -> Result<bool, StoreError>;

    /// Deletes a row by primary key inside a transaction; returns whether a row matched.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the delete fails.
    async fn delete(&self, table: &'static TableSpec, id: RecordId) -> Result<bool, StoreError>;

    /// Selects rows with the table's joins applied.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails or references unknown columns.
    async fn select(
        &self,
        table: &'static TableSpec,
        query: SelectQuery,
    ) -> Result<Vec<FieldMap>, StoreError>;

    /// Counts rows matching the filters.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails or references unknown columns.
    async fn count(&self, table: &'static TableSpec, filters: Vec<Filter>)
    -> Result<u64, StoreError>;

    /// Adds `delta` to an integer column in one atomic step and writes
    /// `touch` alongside it.
    ///
    /// The row is left unchanged when the result would be negative.
    /// Concurrent adjustments of the same row never lose an update.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the column is not an integer column or the
    /// write fails.
    async fn increment(
        &self,
        table: &'static TableSpec,
        id: RecordId,
        column: &'static str,
        delta: i64,
        touch: FieldMap,
    ) -> Result<CounterUpdate, StoreError>;
}

/// Checks that `column` is a declared integer column of `table`.
///
/// # Errors
///
/// Returns [`StoreError::Invalid`] otherwise.
pub fn ensure_counter_column(table: &TableSpec, column: &str) -> Result<(), StoreError> {
    match table.column(column) {
        Some(spec) if spec.kind == ColumnKind::Integer => Ok(()),
        _ => Err(StoreError::Invalid(format!(
            "{column} is not an integer column of {}",
            table.name
        ))),
    }
}

// ============================================================================
// SECTION: Document Store
// ============================================================================

/// Result of an update-by-cross-reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentUpdate {
    /// Number of documents matched.
    pub matched: u64,
    /// Identifier of the document inserted by an upsert.
    pub upserted: Option<DocumentId>,
}

/// Document store keyed by the relational cross-reference.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Inserts a document and returns its identifier, if any.
    ///
    /// The document must carry the collection's cross-reference field.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the insert fails.
    async fn insert(
        &self,
        collection: &'static CollectionSpec,
        document: FieldMap,
    ) -> Result<Option<DocumentId>, StoreError>;

    /// Loads the first document carrying the cross-reference.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    async fn find_by_ref(
        &self,
        collection: &'static CollectionSpec,
        cross_ref: &str,
    ) -> Result<Option<FieldMap>, StoreError>;

    /// Counts documents carrying the cross-reference.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the count fails.
    async fn count_by_ref(
        &self,
        collection: &'static CollectionSpec,
        cross_ref: &str,
    ) -> Result<u64, StoreError>;

    /// Merges fields into the first matching document, inserting when `upsert` is set.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the update fails.
    async fn update_by_ref(
        &self,
        collection: &'static CollectionSpec,
        cross_ref: &str,
        fields: FieldMap,
        upsert: bool,
    ) -> Result<DocumentUpdate, StoreError>;

    /// Deletes every document carrying the cross-reference; returns the count removed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the delete fails.
    async fn delete_by_ref(
        &self,
        collection: &'static CollectionSpec,
        cross_ref: &str,
    ) -> Result<u64, StoreError>;
}

// ============================================================================
// SECTION: Connection Lifecycle
// ============================================================================

/// Connection pool lifecycle hooks used by the health monitor.
#[async_trait]
pub trait ConnectionLifecycle: Send + Sync {
    /// Runs a lightweight round trip against the store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unreachable.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Tears down the connection pool.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when teardown fails.
    async fn close(&self) -> Result<(), StoreError>;

    /// Builds a fresh connection pool.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the pool cannot be rebuilt.
    async fn reinitialize(&self) -> Result<(), StoreError>;
}

// ============================================================================
// SECTION: Field Cipher
// ============================================================================

/// Field cipher errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CipherError {
    /// Value does not carry the ciphertext envelope.
    #[error("value is not encrypted")]
    NotEncrypted,
    /// Ciphertext envelope is malformed.
    #[error("malformed ciphertext: {0}")]
    Malformed(String),
    /// Ciphertext failed authentication.
    #[error("ciphertext failed authentication")]
    Authentication,
    /// Key material is unusable.
    #[error("invalid cipher key: {0}")]
    Key(String),
    /// Encryption failed.
    #[error("encryption failed: {0}")]
    Encrypt(String),
}

/// Symmetric cipher for individual string fields.
pub trait FieldCipher: Send + Sync {
    /// Encrypts a plaintext field value.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError`] when encryption fails.
    fn encrypt(&self, plaintext: &str) -> Result<String, CipherError>;

    /// Decrypts a stored field value.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError`] when the value is not valid ciphertext.
    fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError>;
}
