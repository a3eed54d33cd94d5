// crates/vet-clinic-core/tests/common/mod.rs
// ============================================================================
// Module: Core Test Fixtures
// Description: Fault-injecting store wrappers and seeded coordinators.
// Purpose: Drive coordinator failure paths deterministically.
// ============================================================================

//! ## Overview
//! Wraps the in-memory stores with switches that inject errors, missing
//! identifiers, and delays at chosen points of the dual-write protocol.

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use serde_json::json;
use vet_clinic_core::AesGcmFieldCipher;
use vet_clinic_core::CollectionSpec;
use vet_clinic_core::ConnectionLifecycle;
use vet_clinic_core::CoordinatorConfig;
use vet_clinic_core::CounterUpdate;
use vet_clinic_core::DirectoryKind;
use vet_clinic_core::DocumentId;
use vet_clinic_core::DocumentStore;
use vet_clinic_core::DocumentUpdate;
use vet_clinic_core::DualWriteCoordinator;
use vet_clinic_core::FieldMap;
use vet_clinic_core::Filter;
use vet_clinic_core::InMemoryDocumentStore;
use vet_clinic_core::InMemoryRelationalStore;
use vet_clinic_core::RecordId;
use vet_clinic_core::RelationalDirectory;
use vet_clinic_core::RelationalStore;
use vet_clinic_core::RetryPolicy;
use vet_clinic_core::SelectQuery;
use vet_clinic_core::StoreError;
use vet_clinic_core::TableSpec;
use vet_clinic_core::TransientKind;
use vet_clinic_core::entities::Service;

// ============================================================================
// SECTION: Relational Faults
// ============================================================================

/// Relational store with injectable insert failures.
#[derive(Default)]
pub struct FaultyRelational {
    pub inner: InMemoryRelationalStore,
    /// Errors returned by the next inserts, in order.
    pub insert_errors: Mutex<VecDeque<StoreError>>,
    /// Return no key from inserts into this table.
    pub no_key_for: Mutex<Option<&'static str>>,
    pub insert_calls: AtomicU32,
}

impl FaultyRelational {
    pub fn fail_next_inserts(&self, errors: impl IntoIterator<Item = StoreError>) {
        self.insert_errors.lock().unwrap().extend(errors);
    }
}

#[async_trait]
impl RelationalStore for FaultyRelational {
    async fn insert(
        &self,
        table: &'static TableSpec,
        row: FieldMap,
    ) -> Result<Option<RecordId>, StoreError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.insert_errors.lock().unwrap().pop_front() {
            return Err(error);
        }
        if *self.no_key_for.lock().unwrap() == Some(table.name) {
            return Ok(None);
        }
        self.inner.insert(table, row).await
    }

    async fn find(
        &self,
        table: &'static TableSpec,
        id: RecordId,
    ) -> Result<Option<FieldMap>, StoreError> {
        self.inner.find(table, id).await
    }

    async fn update(
        &self,
        table: &'static TableSpec,
        id: RecordId,
        fields: FieldMap,
    ) -> Result<bool, StoreError> {
        self.inner.update(table, id, fields).await
    }

    async fn delete(&self, table: &'static TableSpec, id: RecordId) -> Result<bool, StoreError> {
        self.inner.delete(table, id).await
    }

    async fn select(
        &self,
        table: &'static TableSpec,
        query: SelectQuery,
    ) -> Result<Vec<FieldMap>, StoreError> {
        self.inner.select(table, query).await
    }

    async fn count(
        &self,
        table: &'static TableSpec,
        filters: Vec<Filter>,
    ) -> Result<u64, StoreError> {
        self.inner.count(table, filters).await
    }

    async fn increment(
        &self,
        table: &'static TableSpec,
        id: RecordId,
        column: &'static str,
        delta: i64,
        touch: FieldMap,
    ) -> Result<CounterUpdate, StoreError> {
        self.inner.increment(table, id, column, delta, touch).await
    }
}

// ============================================================================
// SECTION: Document Faults
// ============================================================================

/// Document store with injectable insert and update failures.
#[derive(Default)]
pub struct FaultyDocuments {
    pub inner: InMemoryDocumentStore,
    pub fail_inserts: AtomicBool,
    pub no_id_on_insert: AtomicBool,
    pub fail_updates: AtomicBool,
    /// Delay applied before each insert.
    pub insert_delay: Mutex<Option<Duration>>,
}

#[async_trait]
impl DocumentStore for FaultyDocuments {
    async fn insert(
        &self,
        collection: &'static CollectionSpec,
        document: FieldMap,
    ) -> Result<Option<DocumentId>, StoreError> {
        let delay = *self.insert_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::Store("document insert rejected".to_string()));
        }
        if self.no_id_on_insert.load(Ordering::SeqCst) {
            return Ok(None);
        }
        self.inner.insert(collection, document).await
    }

    async fn find_by_ref(
        &self,
        collection: &'static CollectionSpec,
        cross_ref: &str,
    ) -> Result<Option<FieldMap>, StoreError> {
        self.inner.find_by_ref(collection, cross_ref).await
    }

    async fn count_by_ref(
        &self,
        collection: &'static CollectionSpec,
        cross_ref: &str,
    ) -> Result<u64, StoreError> {
        self.inner.count_by_ref(collection, cross_ref).await
    }

    async fn update_by_ref(
        &self,
        collection: &'static CollectionSpec,
        cross_ref: &str,
        fields: FieldMap,
        upsert: bool,
    ) -> Result<DocumentUpdate, StoreError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(StoreError::Store("document update rejected".to_string()));
        }
        self.inner.update_by_ref(collection, cross_ref, fields, upsert).await
    }

    async fn delete_by_ref(
        &self,
        collection: &'static CollectionSpec,
        cross_ref: &str,
    ) -> Result<u64, StoreError> {
        self.inner.delete_by_ref(collection, cross_ref).await
    }
}

// ============================================================================
// SECTION: Scripted Lifecycle
// ============================================================================

/// Lifecycle target that replays scripted ping results.
#[derive(Default)]
pub struct ScriptedLifecycle {
    /// Ping results in order; an empty script pings successfully.
    pub pings: Mutex<VecDeque<Result<(), StoreError>>>,
    pub reinitialize_error: Mutex<Option<StoreError>>,
    pub ping_calls: AtomicU32,
    pub close_calls: AtomicU32,
    pub reinitialize_calls: AtomicU32,
}

impl ScriptedLifecycle {
    pub fn with_pings(pings: impl IntoIterator<Item = Result<(), StoreError>>) -> Self {
        Self {
            pings: Mutex::new(pings.into_iter().collect()),
            ..Self::default()
        }
    }
}

#[async_trait]
impl ConnectionLifecycle for ScriptedLifecycle {
    async fn ping(&self) -> Result<(), StoreError> {
        self.ping_calls.fetch_add(1, Ordering::SeqCst);
        self.pings.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn reinitialize(&self) -> Result<(), StoreError> {
        self.reinitialize_calls.fetch_add(1, Ordering::SeqCst);
        self.reinitialize_error.lock().unwrap().take().map_or(Ok(()), Err)
    }
}

pub fn refused() -> StoreError {
    StoreError::transient(TransientKind::ConnectionRefused, "connect ECONNREFUSED 127.0.0.1:5432")
}

// ============================================================================
// SECTION: Harness
// ============================================================================

/// Coordinator wired to fault-injecting in-memory stores.
pub struct Harness {
    pub relational: Arc<FaultyRelational>,
    pub documents: Arc<FaultyDocuments>,
    pub cipher: Arc<AesGcmFieldCipher>,
    pub coordinator: DualWriteCoordinator,
    pub directory: RelationalDirectory,
}

pub fn fast_config() -> CoordinatorConfig {
    CoordinatorConfig {
        retry: RetryPolicy::new(3, Duration::from_millis(10)),
        create_deadline: Duration::from_secs(5),
        verify_connection: true,
    }
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(fast_config())
    }

    pub fn with_config(config: CoordinatorConfig) -> Self {
        let relational = Arc::new(FaultyRelational::default());
        let documents = Arc::new(FaultyDocuments::default());
        let cipher = Arc::new(AesGcmFieldCipher::from_passphrase("test-passphrase").unwrap());
        let coordinator = DualWriteCoordinator::new(
            relational.clone(),
            documents.clone(),
            cipher.clone(),
            config,
        );
        let directory = RelationalDirectory::new(relational.clone(), cipher.clone(), config.retry);
        Self {
            relational,
            documents,
            cipher,
            coordinator,
            directory,
        }
    }

    pub async fn table_count(&self, table: &'static TableSpec) -> u64 {
        self.relational.count(table, Vec::new()).await.unwrap()
    }

    pub async fn document_count(&self, collection: &'static CollectionSpec, id: RecordId) -> u64 {
        self.documents.count_by_ref(collection, &id.cross_ref()).await.unwrap()
    }

    /// Seeds a client, pet, and service; returns their keys.
    pub async fn seed(&self) -> Seed {
        let client = self
            .directory
            .create(
                DirectoryKind::Client,
                object(json!({"name": "Ana Ruiz", "nationalId": "0102030405"})),
            )
            .await
            .unwrap();
        let client = record_id(&client);
        let pet = self
            .directory
            .create(
                DirectoryKind::Pet,
                object(json!({"clientId": client.get(), "name": "Luna", "species": "cat"})),
            )
            .await
            .unwrap();
        let service = self
            .coordinator
            .create::<Service>(object(json!({
                "name": "Consultation",
                "description": "General check-up",
                "price": 25.0,
            })))
            .await
            .unwrap();
        Seed {
            client,
            pet: record_id(&pet),
            service: service.id,
        }
    }
}

/// Keys of seeded reference records.
#[derive(Debug, Clone, Copy)]
pub struct Seed {
    pub client: RecordId,
    pub pet: RecordId,
    pub service: RecordId,
}

impl Seed {
    pub fn appointment(&self) -> FieldMap {
        object(json!({
            "clientId": self.client.get(),
            "petId": self.pet.get(),
            "serviceId": self.service.get(),
            "date": "2026-11-03",
            "time": "09:30",
            "motive": "Vaccination",
            "symptoms": "none",
        }))
    }
}

pub fn object(value: Value) -> FieldMap {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

pub fn record_id(record: &FieldMap) -> RecordId {
    record.get("id").and_then(Value::as_i64).and_then(RecordId::new).unwrap()
}
