// crates/vet-clinic-store-sqlite/src/document.rs
// ============================================================================
// Module: SQLite Document Store
// Description: DocumentStore backed by JSON bodies in a single SQLite table.
// Purpose: Hold supplementary entity details keyed by the relational cross-reference.
// Dependencies: async-trait, rand, rusqlite, serde_json, vet-clinic-core
// ============================================================================

//! ## Overview
//! Every collection shares one `documents` table; rows carry the collection
//! name, the cross-reference string, and the document body as JSON text.
//! Identifiers are 24 lowercase hex characters drawn from the OS-seeded RNG
//! and surface to callers under `_id`.
//! Security posture: stored bodies are untrusted and must parse as JSON objects.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use rand::Rng;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::params;
use serde_json::Value;
use vet_clinic_core::CollectionSpec;
use vet_clinic_core::ConnectionLifecycle;
use vet_clinic_core::DOCUMENT_ID_FIELD;
use vet_clinic_core::DocumentId;
use vet_clinic_core::DocumentStore;
use vet_clinic_core::DocumentUpdate;
use vet_clinic_core::FieldMap;
use vet_clinic_core::StoreError;

use crate::config::SqlitePoolConfig;
use crate::config::SqliteStoreError;
use crate::config::db_error;
use crate::pool::SqlitePool;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Document table and its unique cross-reference index.
///
/// At most one document per relational row exists in a collection; a second
/// insert for the same reference fails with a constraint error.
const DOCUMENT_SCHEMA: &str = "CREATE TABLE IF NOT EXISTS documents (id TEXT PRIMARY KEY, \
                               collection TEXT NOT NULL, cross_ref TEXT NOT NULL, body TEXT NOT \
                               NULL, created_at INTEGER NOT NULL, updated_at INTEGER NOT NULL); \
                               CREATE UNIQUE INDEX IF NOT EXISTS idx_documents_unique_ref ON \
                               documents (collection, cross_ref);";
/// Random bytes per document identifier.
const DOCUMENT_ID_BYTES: usize = 12;

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed document store.
pub struct SqliteDocumentStore {
    /// Connection pool.
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    /// Opens the store and creates the document table.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the pool cannot be built.
    pub fn open(config: SqlitePoolConfig) -> Result<Self, SqliteStoreError> {
        Ok(Self {
            pool: SqlitePool::open(config, initialize_schema)?,
        })
    }

    /// Returns the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Creates the document table.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    connection.execute_batch(DOCUMENT_SCHEMA).map_err(|err| db_error(&err))
}

/// Generates a fresh document identifier.
fn new_document_id() -> String {
    let bytes: [u8; DOCUMENT_ID_BYTES] = rand::thread_rng().r#gen();
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

/// Returns the current unix epoch in milliseconds.
fn unix_millis() -> i64 {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}

/// Serializes a document body, dropping the identifier field.
fn encode_body(mut document: FieldMap) -> Result<String, SqliteStoreError> {
    document.remove(DOCUMENT_ID_FIELD);
    serde_json::to_string(&Value::Object(document))
        .map_err(|err| SqliteStoreError::Invalid(err.to_string()))
}

/// Parses a stored body and attaches its identifier.
fn decode_body(id: String, body: &str) -> Result<FieldMap, SqliteStoreError> {
    let Value::Object(mut document) = serde_json::from_str::<Value>(body)
        .map_err(|err| SqliteStoreError::Invalid(format!("document {id}: {err}")))?
    else {
        return Err(SqliteStoreError::Invalid(format!("document {id} is not an object")));
    };
    document.insert(DOCUMENT_ID_FIELD.to_string(), Value::String(id));
    Ok(document)
}

/// Inserts a document row and returns its identifier.
fn insert_row(
    connection: &Connection,
    collection: &str,
    cross_ref: &str,
    document: FieldMap,
) -> Result<String, SqliteStoreError> {
    let id = new_document_id();
    let body = encode_body(document)?;
    let now = unix_millis();
    connection
        .execute(
            "INSERT INTO documents (id, collection, cross_ref, body, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![id, collection, cross_ref, body, now],
        )
        .map_err(|err| db_error(&err))?;
    Ok(id)
}

/// Loads the first document carrying the cross-reference as `(id, body)`.
fn first_by_ref(
    connection: &Connection,
    collection: &str,
    cross_ref: &str,
) -> Result<Option<(String, String)>, SqliteStoreError> {
    connection
        .query_row(
            "SELECT id, body FROM documents WHERE collection = ?1 AND cross_ref = ?2 ORDER BY \
             created_at ASC, rowid ASC LIMIT 1",
            params![collection, cross_ref],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()
        .map_err(|err| db_error(&err))
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn insert(
        &self,
        collection: &'static CollectionSpec,
        document: FieldMap,
    ) -> Result<Option<DocumentId>, StoreError> {
        let Some(cross_ref) =
            document.get(collection.cross_ref_field).and_then(Value::as_str).map(str::to_string)
        else {
            return Err(StoreError::Invalid(format!(
                "document for {} missing {}",
                collection.name, collection.cross_ref_field
            )));
        };
        self.pool
            .run(move |connection| {
                let id = insert_row(connection, collection.name, &cross_ref, document)?;
                Ok(Some(DocumentId::new(id)))
            })
            .await
    }

    async fn find_by_ref(
        &self,
        collection: &'static CollectionSpec,
        cross_ref: &str,
    ) -> Result<Option<FieldMap>, StoreError> {
        let cross_ref = cross_ref.to_string();
        self.pool
            .run(move |connection| {
                first_by_ref(connection, collection.name, &cross_ref)?
                    .map(|(id, body)| decode_body(id, &body))
                    .transpose()
            })
            .await
    }

    async fn count_by_ref(
        &self,
        collection: &'static CollectionSpec,
        cross_ref: &str,
    ) -> Result<u64, StoreError> {
        let cross_ref = cross_ref.to_string();
        self.pool
            .run(move |connection| {
                let count: i64 = connection
                    .query_row(
                        "SELECT COUNT(*) FROM documents WHERE collection = ?1 AND cross_ref = ?2",
                        params![collection.name, cross_ref],
                        |row| row.get(0),
                    )
                    .map_err(|err| db_error(&err))?;
                u64::try_from(count)
                    .map_err(|_| SqliteStoreError::Invalid("negative document count".to_string()))
            })
            .await
    }

    async fn update_by_ref(
        &self,
        collection: &'static CollectionSpec,
        cross_ref: &str,
        mut fields: FieldMap,
        upsert: bool,
    ) -> Result<DocumentUpdate, StoreError> {
        fields.remove(DOCUMENT_ID_FIELD);
        let cross_ref = cross_ref.to_string();
        self.pool
            .run(move |connection| {
                let tx = connection.transaction().map_err(|err| db_error(&err))?;
                let outcome = match first_by_ref(&tx, collection.name, &cross_ref)? {
                    Some((id, body)) => {
                        let mut document = decode_body(id.clone(), &body)?;
                        document.extend(fields);
                        tx.execute(
                            "UPDATE documents SET body = ?1, updated_at = ?2 WHERE id = ?3",
                            params![encode_body(document)?, unix_millis(), id],
                        )
                        .map_err(|err| db_error(&err))?;
                        DocumentUpdate {
                            matched: 1,
                            upserted: None,
                        }
                    }
                    None if upsert => {
                        fields.insert(
                            collection.cross_ref_field.to_string(),
                            Value::String(cross_ref.clone()),
                        );
                        let id = insert_row(&tx, collection.name, &cross_ref, fields)?;
                        DocumentUpdate {
                            matched: 0,
                            upserted: Some(DocumentId::new(id)),
                        }
                    }
                    None => DocumentUpdate {
                        matched: 0,
                        upserted: None,
                    },
                };
                tx.commit().map_err(|err| db_error(&err))?;
                Ok(outcome)
            })
            .await
    }

    async fn delete_by_ref(
        &self,
        collection: &'static CollectionSpec,
        cross_ref: &str,
    ) -> Result<u64, StoreError> {
        let cross_ref = cross_ref.to_string();
        self.pool
            .run(move |connection| {
                let removed = connection
                    .execute(
                        "DELETE FROM documents WHERE collection = ?1 AND cross_ref = ?2",
                        params![collection.name, cross_ref],
                    )
                    .map_err(|err| db_error(&err))?;
                Ok(u64::try_from(removed).unwrap_or(u64::MAX))
            })
            .await
    }
}

#[async_trait]
impl ConnectionLifecycle for SqliteDocumentStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.pool.ping().await
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.pool.close().await;
        Ok(())
    }

    async fn reinitialize(&self) -> Result<(), StoreError> {
        self.pool.reinitialize().await
    }
}
