// crates/vet-clinic-core/src/runtime/coordinator.rs
// ============================================================================
// Module: Dual-Write Coordinator
// Description: Create, update, delete, and read split entities across both stores.
// Purpose: Keep relational and document representations in step with compensation.
// Dependencies: crate::{core, entities, interfaces, runtime}, thiserror, tokio, tracing
// ============================================================================

//! ## Overview
//! The coordinator owns the dual-write protocol for every [`SplitEntity`]:
//! the relational record is written first and its generated key becomes the
//! document cross-reference. When the document write fails, or the create
//! deadline expires, the relational record is deleted again so no orphan is
//! left behind. The document insert runs as its own task; after a deadline
//! the coordinator waits a bounded settle window for it before compensating,
//! and only reports compensation once no document remains for the key.
//!
//! Security posture: PII columns are encrypted before they reach the
//! relational store and decrypted with the pass-through policy on every read.
//!
//! ## Invariants
//! - A returned [`CreateOutcome`] always carries a freshly read [`Verification`];
//!   asymmetric state is reported there and never raised.
//! - Validation and reference failures never touch either store.
//! - Hard deletes happen only during compensation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tokio::sync::watch;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::core::CREATED_AT;
use crate::core::DOCUMENT_CREATED_AT;
use crate::core::DOCUMENT_ID_FIELD;
use crate::core::DOCUMENT_UPDATED_AT;
use crate::core::DocumentId;
use crate::core::FieldMap;
use crate::core::PRIMARY_KEY;
use crate::core::RecordId;
use crate::core::TableSpec;
use crate::core::UPDATED_AT;
use crate::core::Verification;
use crate::core::time::now_rfc3339;
use crate::entities::ListQuery;
use crate::entities::Reference;
use crate::entities::SplitEntity;
use crate::entities::Transition;
use crate::entities::ValidationError;
use crate::entities::WriteMode;
use crate::interfaces::CipherError;
use crate::interfaces::CounterUpdate;
use crate::interfaces::DocumentStore;
use crate::interfaces::FieldCipher;
use crate::interfaces::Filter;
use crate::interfaces::RelationalStore;
use crate::interfaces::SelectQuery;
use crate::interfaces::StoreError;
use crate::runtime::cipher::decrypt_columns;
use crate::runtime::cipher::encrypt_columns;
use crate::runtime::health::ConnectionHealthMonitor;
use crate::runtime::retry::RetryPolicy;
use crate::runtime::retry::with_retry;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default deadline for the whole create protocol.
pub const DEFAULT_CREATE_DEADLINE_MS: u64 = 15_000;

/// Time an in-flight document insert gets to finish after a create deadline.
pub const DOCUMENT_SETTLE_WINDOW: Duration = Duration::from_secs(5);

/// Record field carrying the paired document identifier.
pub const DOCUMENT_ID_OUTPUT: &str = "documentId";

/// Record field carrying the paired document body.
pub const DETAILS_OUTPUT: &str = "details";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors returned by coordinated operations.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - `PartialWrite` and `DeadlineExceeded` are only returned after compensation ran.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// Caller input was rejected; nothing was written.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    /// A referenced record is missing or inactive; nothing was written.
    #[error("referenced {table} record {id} not found")]
    ReferenceNotFound {
        /// Referenced table.
        table: &'static str,
        /// Referenced key.
        id: RecordId,
    },
    /// The addressed record does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Entity label.
        entity: &'static str,
        /// Requested key.
        id: RecordId,
    },
    /// The relational store failed its health check; nothing was written.
    #[error("relational store unavailable")]
    Unavailable,
    /// A store call failed after retries.
    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
    /// The relational insert returned no key; no document was written.
    #[error("{entity} insert returned no identifier")]
    MissingIdentifier {
        /// Entity label.
        entity: &'static str,
    },
    /// The document write failed after the relational write succeeded.
    #[error("{entity} document write failed (compensated: {compensated}): {reason}")]
    PartialWrite {
        /// Entity label.
        entity: &'static str,
        /// Whether the relational write was rolled back.
        compensated: bool,
        /// Underlying failure.
        reason: String,
    },
    /// The create deadline expired.
    #[error("{entity} create exceeded its deadline (compensated: {compensated})")]
    DeadlineExceeded {
        /// Entity label.
        entity: &'static str,
        /// Whether every observed write was rolled back.
        compensated: bool,
    },
    /// Field encryption failed.
    #[error("field encryption failed: {0}")]
    Cipher(#[from] CipherError),
}

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Coordinator tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Retry policy for relational writes and lookups.
    pub retry: RetryPolicy,
    /// Deadline for the whole create protocol.
    pub create_deadline: Duration,
    /// Run the health monitor before each mutation.
    pub verify_connection: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            create_deadline: Duration::from_millis(DEFAULT_CREATE_DEADLINE_MS),
            verify_connection: true,
        }
    }
}

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Result of a successful create.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateOutcome {
    /// Generated relational key.
    pub id: RecordId,
    /// Generated document identifier.
    pub document_id: DocumentId,
    /// Plaintext record as written, with its document details.
    pub record: FieldMap,
    /// Independent read-back of both stores.
    pub verification: Verification,
}

/// Result of a successful update.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutcome {
    /// Updated key.
    pub id: RecordId,
    /// Record as read back after the update.
    pub record: FieldMap,
    /// Whether the document side had to be created.
    pub document_upserted: bool,
}

// ============================================================================
// SECTION: Coordinator
// ============================================================================

/// Dual-write coordinator shared by every split entity.
#[derive(Clone)]
pub struct DualWriteCoordinator {
    /// Relational store handle.
    relational: Arc<dyn RelationalStore>,
    /// Document store handle.
    documents: Arc<dyn DocumentStore>,
    /// Field cipher for PII columns.
    cipher: Arc<dyn FieldCipher>,
    /// Optional relational health monitor.
    health: Option<ConnectionHealthMonitor>,
    /// Coordinator tuning.
    config: CoordinatorConfig,
}

impl DualWriteCoordinator {
    /// Creates a coordinator over the given store handles.
    #[must_use]
    pub fn new(
        relational: Arc<dyn RelationalStore>,
        documents: Arc<dyn DocumentStore>,
        cipher: Arc<dyn FieldCipher>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            relational,
            documents,
            cipher,
            health: None,
            config,
        }
    }

    /// Attaches a health monitor consulted before mutations.
    #[must_use]
    pub fn with_health_monitor(mut self, monitor: ConnectionHealthMonitor) -> Self {
        self.health = Some(monitor);
        self
    }

    /// Returns the coordinator tuning.
    #[must_use]
    pub const fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    // ------------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------------

    /// Creates an entity in both stores.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError`] when validation, references, storage, or
    /// the deadline fail. Partial writes are compensated before returning.
    pub async fn create<E: SplitEntity>(
        &self,
        input: FieldMap,
    ) -> Result<CreateOutcome, CoordinatorError> {
        self.ensure_available().await?;
        E::validate(&input, WriteMode::Create)?;
        let row = E::relational_fields(&input, WriteMode::Create)?;
        let document = E::document_fields(&input, WriteMode::Create)?;
        ensure_references(self.relational.as_ref(), self.config.retry, E::references(&input)?)
            .await?;

        let written = AtomicI64::new(0);
        let (settled_tx, mut settled_rx) = watch::channel(true);
        let deadline = self.config.create_deadline;
        let attempt = self.create_inner::<E>(row, document, &written, settled_tx);
        match tokio::time::timeout(deadline, attempt).await {
            Ok(result) => result,
            Err(_) => {
                let settled =
                    tokio::time::timeout(DOCUMENT_SETTLE_WINDOW, settled_rx.wait_for(|done| *done))
                        .await
                        .is_ok();
                let compensated = match RecordId::new(written.load(Ordering::SeqCst)) {
                    Some(id) => {
                        let removed = self.compensate::<E>(id).await;
                        if !settled {
                            warn!(
                                entity = E::NAME,
                                id = id.get(),
                                "document insert still in flight after settle window"
                            );
                        }
                        removed && settled
                    }
                    None => {
                        warn!(
                            entity = E::NAME,
                            "create deadline expired before a key was observed"
                        );
                        false
                    }
                };
                error!(entity = E::NAME, compensated, "create deadline exceeded");
                Err(CoordinatorError::DeadlineExceeded {
                    entity: E::NAME,
                    compensated,
                })
            }
        }
    }

    /// Runs the write sequence of a create; records the key once known.
    ///
    /// `settled` is cleared while the document insert task runs and set again
    /// when it finishes, whether or not this future is still polled.
    async fn create_inner<E: SplitEntity>(
        &self,
        mut row: FieldMap,
        mut document: FieldMap,
        written: &AtomicI64,
        settled: watch::Sender<bool>,
    ) -> Result<CreateOutcome, CoordinatorError> {
        let table = E::table();
        let collection = E::collection();
        let now = now_rfc3339();
        stamp(table, &mut row, &now, WriteMode::Create);
        let plaintext = row.clone();
        encrypt_columns(self.cipher.as_ref(), table, &mut row)?;

        let inserted =
            with_retry(self.config.retry, || self.relational.insert(table, row.clone())).await?;
        let Some(id) = inserted else {
            error!(entity = E::NAME, "relational insert returned no key");
            return Err(CoordinatorError::MissingIdentifier {
                entity: E::NAME,
            });
        };
        written.store(id.get(), Ordering::SeqCst);

        document.insert(collection.cross_ref_field.to_string(), Value::String(id.cross_ref()));
        document.insert(DOCUMENT_CREATED_AT.to_string(), Value::String(now.clone()));
        document.insert(DOCUMENT_UPDATED_AT.to_string(), Value::String(now));
        settled.send_replace(false);
        let documents = Arc::clone(&self.documents);
        let body = document.clone();
        let insert = tokio::spawn(async move {
            let result = documents.insert(collection, body).await;
            settled.send_replace(true);
            result
        });
        let document_id = match insert.await {
            Ok(Ok(Some(document_id))) => document_id,
            Ok(Ok(None)) => {
                return Err(self
                    .fail_create::<E>(id, "document store returned no identifier".to_string())
                    .await);
            }
            Ok(Err(err)) => return Err(self.fail_create::<E>(id, err.to_string()).await),
            Err(err) => {
                let reason = format!("document insert task failed: {err}");
                return Err(self.fail_create::<E>(id, reason).await);
            }
        };

        let verification = self.verify::<E>(id).await;
        if !verification.synchronized {
            warn!(
                entity = E::NAME,
                id = id.get(),
                exists_in_relational = verification.exists_in_relational,
                exists_in_document = verification.exists_in_document,
                "stores out of sync after create"
            );
        }
        info!(entity = E::NAME, id = id.get(), document_id = %document_id, "entity created");

        let mut record = table.render(plaintext);
        record.insert(PRIMARY_KEY.to_string(), Value::from(id.get()));
        record.insert(DOCUMENT_ID_OUTPUT.to_string(), Value::String(document_id.to_string()));
        record.insert(DETAILS_OUTPUT.to_string(), Value::Object(document));
        Ok(CreateOutcome {
            id,
            document_id,
            record,
            verification,
        })
    }

    /// Compensates a failed document write and builds the error.
    async fn fail_create<E: SplitEntity>(&self, id: RecordId, reason: String) -> CoordinatorError {
        error!(entity = E::NAME, id = id.get(), reason = %reason, "document write failed");
        let compensated = self.compensate::<E>(id).await;
        CoordinatorError::PartialWrite {
            entity: E::NAME,
            compensated,
            reason,
        }
    }

    /// Removes both sides of a half-written entity; returns true when the
    /// relational record is gone and no document remains for its key.
    async fn compensate<E: SplitEntity>(&self, id: RecordId) -> bool {
        let collection = E::collection();
        let cross_ref = id.cross_ref();
        if let Err(err) = self.documents.delete_by_ref(collection, &cross_ref).await {
            warn!(
                entity = E::NAME,
                id = id.get(),
                error = %err,
                "compensating document delete failed"
            );
        }
        let relational_removed =
            match with_retry(self.config.retry, || self.relational.delete(E::table(), id)).await {
                Ok(_) => {
                    info!(entity = E::NAME, id = id.get(), "relational write compensated");
                    true
                }
                Err(err) => {
                    error!(
                        entity = E::NAME,
                        id = id.get(),
                        error = %err,
                        "compensation failed, relational record orphaned"
                    );
                    false
                }
            };
        let documents_removed = match self.documents.count_by_ref(collection, &cross_ref).await {
            Ok(0) => true,
            Ok(remaining) => {
                error!(
                    entity = E::NAME,
                    id = id.get(),
                    remaining,
                    "document orphaned after compensation"
                );
                false
            }
            Err(err) => {
                warn!(entity = E::NAME, id = id.get(), error = %err, "compensation recheck failed");
                false
            }
        };
        relational_removed && documents_removed
    }

    // ------------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------------

    /// Updates both sides of an entity, upserting the document.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::NotFound`] when the record is missing and
    /// [`CoordinatorError::PartialWrite`] when the document write fails after
    /// the relational snapshot was restored.
    pub async fn update<E: SplitEntity>(
        &self,
        id: RecordId,
        input: FieldMap,
    ) -> Result<UpdateOutcome, CoordinatorError> {
        self.ensure_available().await?;
        E::validate(&input, WriteMode::Update)?;
        let mut row = E::relational_fields(&input, WriteMode::Update)?;
        let mut document = E::document_fields(&input, WriteMode::Update)?;
        ensure_references(self.relational.as_ref(), self.config.retry, E::references(&input)?)
            .await?;
        let table = E::table();
        let snapshot = self.find_row(table, id).await?.ok_or(CoordinatorError::NotFound {
            entity: E::NAME,
            id,
        })?;

        let now = now_rfc3339();
        stamp(table, &mut row, &now, WriteMode::Update);
        encrypt_columns(self.cipher.as_ref(), table, &mut row)?;
        self.update_row::<E>(id, row).await?;

        document.insert(DOCUMENT_UPDATED_AT.to_string(), Value::String(now));
        let cross_ref = id.cross_ref();
        let update =
            match self.documents.update_by_ref(E::collection(), &cross_ref, document, true).await {
                Ok(update) => update,
                Err(err) => return Err(self.fail_update::<E>(id, snapshot, err).await),
            };
        if update.upserted.is_some() {
            warn!(entity = E::NAME, id = id.get(), "document missing on update, upserted");
        }
        let record = self.fetch::<E>(id).await?;
        Ok(UpdateOutcome {
            id,
            record,
            document_upserted: update.upserted.is_some(),
        })
    }

    /// Restores the relational snapshot after a failed document write.
    async fn fail_update<E: SplitEntity>(
        &self,
        id: RecordId,
        snapshot: FieldMap,
        cause: StoreError,
    ) -> CoordinatorError {
        error!(entity = E::NAME, id = id.get(), error = %cause, "document update failed");
        let compensated = self.restore::<E>(id, snapshot).await;
        CoordinatorError::PartialWrite {
            entity: E::NAME,
            compensated,
            reason: cause.to_string(),
        }
    }

    /// Writes a snapshot back over the relational row.
    async fn restore<E: SplitEntity>(&self, id: RecordId, mut snapshot: FieldMap) -> bool {
        snapshot.remove(PRIMARY_KEY);
        match with_retry(self.config.retry, || {
            self.relational.update(E::table(), id, snapshot.clone())
        })
        .await
        {
            Ok(_) => {
                info!(entity = E::NAME, id = id.get(), "relational snapshot restored");
                true
            }
            Err(err) => {
                error!(entity = E::NAME, id = id.get(), error = %err, "snapshot restore failed");
                false
            }
        }
    }

    // ------------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------------

    /// Soft-deletes an entity, mirroring the retired status into the document.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Validation`] for entities that cannot be
    /// deleted and [`CoordinatorError::NotFound`] when the record is missing.
    pub async fn soft_delete<E: SplitEntity>(&self, id: RecordId) -> Result<(), CoordinatorError> {
        if !E::DELETABLE {
            return Err(ValidationError::invalid("id", format!("{} cannot be deleted", E::NAME))
                .into());
        }
        self.ensure_available().await?;
        let table = E::table();
        if self.find_row(table, id).await?.is_none() {
            return Err(CoordinatorError::NotFound {
                entity: E::NAME,
                id,
            });
        }

        let now = now_rfc3339();
        let mut row = FieldMap::new();
        if let Some(status) = table.status {
            row.insert(status.column.to_string(), Value::from(status.retired));
        }
        stamp(table, &mut row, &now, WriteMode::Update);
        if !row.is_empty() {
            self.update_row::<E>(id, row).await?;
        }

        let collection = E::collection();
        if let Some(field) = collection.status_field {
            let mut document = FieldMap::new();
            document.insert(field.to_string(), Value::from(E::RETIRED_DOCUMENT_STATUS));
            document.insert(DOCUMENT_UPDATED_AT.to_string(), Value::String(now));
            match self.documents.update_by_ref(collection, &id.cross_ref(), document, false).await
            {
                Ok(update) if update.matched == 0 => {
                    warn!(entity = E::NAME, id = id.get(), "no document to retire");
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(entity = E::NAME, id = id.get(), error = %err, "document retire failed");
                }
            }
        }
        info!(entity = E::NAME, id = id.get(), "entity retired");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------------

    /// Applies a workflow transition planned from the current state.
    ///
    /// The planner receives the decrypted relational row and the current
    /// document, if any. The relational side is written first; a failed
    /// document write restores the relational row.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::NotFound`] when the record is missing, or
    /// when a document-only transition finds no document, and
    /// [`CoordinatorError::ReferenceNotFound`] when the plan points at a
    /// missing or inactive record. Nothing is written in either case.
    pub async fn transition<E, P>(
        &self,
        id: RecordId,
        plan: P,
    ) -> Result<FieldMap, CoordinatorError>
    where
        E: SplitEntity,
        P: FnOnce(&FieldMap, Option<&FieldMap>) -> Result<Transition, ValidationError> + Send,
    {
        self.ensure_available().await?;
        let table = E::table();
        let collection = E::collection();
        let not_found = CoordinatorError::NotFound {
            entity: E::NAME,
            id,
        };
        let Some(snapshot) = self.find_row(table, id).await? else {
            return Err(not_found);
        };
        let cross_ref = id.cross_ref();
        let current_document = self.documents.find_by_ref(collection, &cross_ref).await?;
        let mut current = snapshot.clone();
        decrypt_columns(self.cipher.as_ref(), table, &mut current);
        let Transition {
            relational: mut row,
            mut document,
            references,
        } = plan(&current, current_document.as_ref())?;
        ensure_references(self.relational.as_ref(), self.config.retry, references).await?;

        let now = now_rfc3339();
        let relational_written = !row.is_empty();
        if relational_written {
            stamp(table, &mut row, &now, WriteMode::Update);
            encrypt_columns(self.cipher.as_ref(), table, &mut row)?;
            self.update_row::<E>(id, row).await?;
        }
        if !document.is_empty() {
            document.insert(DOCUMENT_UPDATED_AT.to_string(), Value::String(now));
            match self.documents.update_by_ref(collection, &cross_ref, document, false).await {
                Ok(update) if update.matched == 0 => {
                    if !relational_written {
                        return Err(not_found);
                    }
                    warn!(entity = E::NAME, id = id.get(), "no document to transition");
                }
                Ok(_) => {}
                Err(err) if relational_written => {
                    return Err(self.fail_update::<E>(id, snapshot, err).await);
                }
                Err(err) => return Err(err.into()),
            }
        }
        info!(entity = E::NAME, id = id.get(), "entity transitioned");
        self.fetch::<E>(id).await
    }

    /// Merges fields into the document of an existing entity.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::NotFound`] when the record or its document
    /// is missing.
    pub async fn patch_document<E: SplitEntity>(
        &self,
        id: RecordId,
        fields: FieldMap,
    ) -> Result<FieldMap, CoordinatorError> {
        self.transition::<E, _>(id, move |_, _| Ok(Transition::document(fields))).await
    }

    /// Adds `delta` to an integer column in one relational statement.
    ///
    /// Concurrent adjustments never overwrite each other, and a result below
    /// zero is rejected without writing.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::NotFound`] when the record is missing and
    /// [`CoordinatorError::Validation`] when the column would go negative.
    pub async fn adjust_counter<E: SplitEntity>(
        &self,
        id: RecordId,
        column: &'static str,
        delta: i64,
    ) -> Result<FieldMap, CoordinatorError> {
        self.ensure_available().await?;
        let table = E::table();
        let mut touch = FieldMap::new();
        stamp(table, &mut touch, &now_rfc3339(), WriteMode::Update);
        let outcome = with_retry(self.config.retry, || {
            self.relational.increment(table, id, column, delta, touch.clone())
        })
        .await?;
        match outcome {
            CounterUpdate::Applied(value) => {
                info!(entity = E::NAME, id = id.get(), column, delta, value, "counter adjusted");
                self.fetch::<E>(id).await
            }
            CounterUpdate::Missing => Err(CoordinatorError::NotFound {
                entity: E::NAME,
                id,
            }),
            CounterUpdate::Insufficient(current) => {
                warn!(
                    entity = E::NAME,
                    id = id.get(),
                    column,
                    delta,
                    current,
                    "counter adjustment rejected"
                );
                Err(ValidationError::invalid(
                    "quantity",
                    format!("{column} cannot go below zero (current {current})"),
                )
                .into())
            }
        }
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// Fetches one entity with its joins, decrypted, and its document details.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::NotFound`] when the record is missing.
    pub async fn fetch<E: SplitEntity>(&self, id: RecordId) -> Result<FieldMap, CoordinatorError> {
        let table = E::table();
        let rows =
            with_retry(self.config.retry, || self.relational.select(table, SelectQuery::by_id(id)))
                .await?;
        let Some(row) = rows.into_iter().next() else {
            return Err(CoordinatorError::NotFound {
                entity: E::NAME,
                id,
            });
        };
        self.assemble::<E>(row).await
    }

    /// Lists entities matching relational filters, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError`] when a store read fails.
    pub async fn list<E: SplitEntity>(
        &self,
        filters: Vec<Filter>,
    ) -> Result<Vec<FieldMap>, CoordinatorError> {
        self.search::<E>(ListQuery::relational(filters)).await
    }

    /// Lists entities matching a resolved query.
    ///
    /// Relational filters narrow the select; document filters are then
    /// applied to each record's details.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError`] when a store read fails.
    pub async fn search<E: SplitEntity>(
        &self,
        query: ListQuery,
    ) -> Result<Vec<FieldMap>, CoordinatorError> {
        let table = E::table();
        let select = SelectQuery {
            filters: query.relational.clone(),
            order: query.ordering(),
            limit: None,
        };
        let rows =
            with_retry(self.config.retry, || self.relational.select(table, select.clone())).await?;
        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let record = self.assemble::<E>(row).await?;
            let details = match record.get(DETAILS_OUTPUT) {
                Some(Value::Object(details)) => Some(details),
                _ => None,
            };
            if query.matches_details(details) {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Counts relational rows matching the filters.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError`] when the store read fails.
    pub async fn count<E: SplitEntity>(
        &self,
        filters: Vec<Filter>,
    ) -> Result<u64, CoordinatorError> {
        let table = E::table();
        Ok(with_retry(self.config.retry, || self.relational.count(table, filters.clone())).await?)
    }

    /// Reads both stores independently and reports whether they agree.
    ///
    /// Store errors count as absence.
    pub async fn verify<E: SplitEntity>(&self, id: RecordId) -> Verification {
        let exists_in_relational = match self.relational.find(E::table(), id).await {
            Ok(row) => row.is_some(),
            Err(err) => {
                warn!(
                    entity = E::NAME,
                    id = id.get(),
                    error = %err,
                    "relational verify read failed"
                );
                false
            }
        };
        let document_count =
            match self.documents.count_by_ref(E::collection(), &id.cross_ref()).await {
                Ok(count) => count,
                Err(err) => {
                    warn!(
                        entity = E::NAME,
                        id = id.get(),
                        error = %err,
                        "document verify read failed"
                    );
                    0
                }
            };
        Verification::from_counts(exists_in_relational, document_count)
    }

    /// Decrypts, renames, and attaches document details to a relational row.
    async fn assemble<E: SplitEntity>(
        &self,
        mut row: FieldMap,
    ) -> Result<FieldMap, CoordinatorError> {
        let table = E::table();
        decrypt_columns(self.cipher.as_ref(), table, &mut row);
        let id = row.get(PRIMARY_KEY).and_then(Value::as_i64).and_then(RecordId::new);
        let mut record = table.render(row);
        let details = match id {
            Some(id) => self.documents.find_by_ref(E::collection(), &id.cross_ref()).await?,
            None => None,
        };
        match details {
            Some(mut details) => {
                let document_id = details.remove(DOCUMENT_ID_FIELD).unwrap_or(Value::Null);
                record.insert(DOCUMENT_ID_OUTPUT.to_string(), document_id);
                record.insert(DETAILS_OUTPUT.to_string(), Value::Object(details));
            }
            None => {
                record.insert(DOCUMENT_ID_OUTPUT.to_string(), Value::Null);
                record.insert(DETAILS_OUTPUT.to_string(), Value::Null);
            }
        }
        Ok(record)
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    /// Fails fast when the health monitor reports the relational store down.
    async fn ensure_available(&self) -> Result<(), CoordinatorError> {
        if self.config.verify_connection
            && let Some(health) = &self.health
            && !health.verify_connection().await
        {
            error!("relational store unavailable, rejecting mutation");
            return Err(CoordinatorError::Unavailable);
        }
        Ok(())
    }

    /// Point lookup with retry.
    async fn find_row(
        &self,
        table: &'static TableSpec,
        id: RecordId,
    ) -> Result<Option<FieldMap>, CoordinatorError> {
        Ok(with_retry(self.config.retry, || self.relational.find(table, id)).await?)
    }

    /// Relational update with retry; a vanished row maps to not found.
    async fn update_row<E: SplitEntity>(
        &self,
        id: RecordId,
        row: FieldMap,
    ) -> Result<(), CoordinatorError> {
        let updated =
            with_retry(self.config.retry, || self.relational.update(E::table(), id, row.clone()))
                .await?;
        if updated {
            Ok(())
        } else {
            Err(CoordinatorError::NotFound {
                entity: E::NAME,
                id,
            })
        }
    }
}

// ============================================================================
// SECTION: Shared Helpers
// ============================================================================

/// Sets the timestamp columns the table declares.
pub(crate) fn stamp(table: &TableSpec, row: &mut FieldMap, now: &str, mode: WriteMode) {
    if mode == WriteMode::Create && table.has_column(CREATED_AT) {
        row.insert(CREATED_AT.to_string(), Value::String(now.to_string()));
    }
    if table.has_column(UPDATED_AT) {
        row.insert(UPDATED_AT.to_string(), Value::String(now.to_string()));
    }
}

/// Checks that every referenced record exists and is live.
///
/// # Errors
///
/// Returns [`CoordinatorError::ReferenceNotFound`] for the first failing reference.
pub(crate) async fn ensure_references(
    relational: &dyn RelationalStore,
    retry: RetryPolicy,
    references: Vec<Reference>,
) -> Result<(), CoordinatorError> {
    for reference in references {
        let row = with_retry(retry, || relational.find(reference.table, reference.id)).await?;
        if !row.is_some_and(|row| reference.table.is_live(&row)) {
            warn!(
                table = reference.table.name,
                field = reference.field,
                id = reference.id.get(),
                "referenced record missing or inactive"
            );
            return Err(CoordinatorError::ReferenceNotFound {
                table: reference.table.name,
                id: reference.id,
            });
        }
    }
    Ok(())
}
