// crates/vet-clinic-core/src/runtime/store.rs
// ============================================================================
// Module: Vet Clinic In-Memory Stores
// Description: In-memory relational and document stores for tests and demos.
// Purpose: Provide deterministic store implementations without external deps.
// Dependencies: crate::{core, interfaces}, async-trait, serde_json
// ============================================================================

//! ## Overview
//! This module provides in-memory implementations of [`RelationalStore`] and
//! [`DocumentStore`]. They apply the same column coercion and join semantics
//! as the durable backends. They are not intended for production use.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::core::CollectionSpec;
use crate::core::DOCUMENT_ID_FIELD;
use crate::core::DocumentId;
use crate::core::FieldMap;
use crate::core::PRIMARY_KEY;
use crate::core::RecordId;
use crate::core::TableSpec;
use crate::interfaces::CounterUpdate;
use crate::interfaces::DocumentStore;
use crate::interfaces::DocumentUpdate;
use crate::interfaces::Filter;
use crate::interfaces::RelationalStore;
use crate::interfaces::SelectQuery;
use crate::interfaces::StoreError;
use crate::interfaces::compare_scalars;
use crate::interfaces::ensure_counter_column;

// ============================================================================
// SECTION: Relational Store
// ============================================================================

/// Rows of one in-memory table.
#[derive(Debug, Default)]
struct TableRows {
    /// Last assigned primary key.
    last_id: i64,
    /// Rows by primary key.
    rows: BTreeMap<i64, FieldMap>,
}

/// In-memory relational store for tests and examples.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRelationalStore {
    /// Tables by name, protected by a mutex.
    tables: Arc<Mutex<BTreeMap<String, TableRows>>>,
}

impl InMemoryRelationalStore {
    /// Creates an empty in-memory relational store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs a closure against the locked table map.
    fn with_tables<T>(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, TableRows>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut guard = self
            .tables
            .lock()
            .map_err(|_| StoreError::Store("relational store mutex poisoned".to_string()))?;
        f(&mut guard)
    }
}

#[async_trait]
impl RelationalStore for InMemoryRelationalStore {
    async fn insert(
        &self,
        table: &'static TableSpec,
        row: FieldMap,
    ) -> Result<Option<RecordId>, StoreError> {
        let mut row = table.coerce_insert(row)?;
        self.with_tables(|tables| {
            let rows = tables.entry(table.name.to_string()).or_default();
            rows.last_id += 1;
            let id = rows.last_id;
            row.insert(PRIMARY_KEY.to_string(), Value::from(id));
            rows.rows.insert(id, row);
            Ok(RecordId::new(id))
        })
    }

    async fn find(
        &self,
        table: &'static TableSpec,
        id: RecordId,
    ) -> Result<Option<FieldMap>, StoreError> {
        self.with_tables(|tables| {
            Ok(tables.get(table.name).and_then(|rows| rows.rows.get(&id.get())).cloned())
        })
    }

    async fn update(
        &self,
        table: &'static TableSpec,
        id: RecordId,
        fields: FieldMap,
    ) -> Result<bool, StoreError> {
        let fields = table.coerce_update(fields)?;
        self.with_tables(|tables| {
            let Some(row) = tables.get_mut(table.name).and_then(|rows| rows.rows.get_mut(&id.get()))
            else {
                return Ok(false);
            };
            row.extend(fields);
            Ok(true)
        })
    }

    async fn delete(&self, table: &'static TableSpec, id: RecordId) -> Result<bool, StoreError> {
        self.with_tables(|tables| {
            Ok(tables
                .get_mut(table.name)
                .and_then(|rows| rows.rows.remove(&id.get()))
                .is_some())
        })
    }

    async fn select(
        &self,
        table: &'static TableSpec,
        query: SelectQuery,
    ) -> Result<Vec<FieldMap>, StoreError> {
        query.validate(table)?;
        self.with_tables(|tables| {
            let mut rows: Vec<FieldMap> = tables
                .get(table.name)
                .map(|rows| {
                    rows.rows
                        .values()
                        .filter(|row| query.filters.iter().all(|filter| filter.matches(row)))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            rows.sort_by(|left, right| {
                for order in &query.order {
                    let ordering = compare_scalars(
                        left.get(&order.column).unwrap_or(&Value::Null),
                        right.get(&order.column).unwrap_or(&Value::Null),
                    );
                    let ordering = if order.descending { ordering.reverse() } else { ordering };
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                Ordering::Equal
            });
            if let Some(limit) = query.limit {
                rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
            }
            for row in &mut rows {
                apply_joins(table, tables, row);
            }
            Ok(rows)
        })
    }

    async fn count(
        &self,
        table: &'static TableSpec,
        filters: Vec<Filter>,
    ) -> Result<u64, StoreError> {
        SelectQuery {
            filters: filters.clone(),
            ..SelectQuery::default()
        }
        .validate(table)?;
        self.with_tables(|tables| {
            let count = tables.get(table.name).map_or(0, |rows| {
                rows.rows
                    .values()
                    .filter(|row| filters.iter().all(|filter| filter.matches(row)))
                    .count()
            });
            Ok(u64::try_from(count).unwrap_or(u64::MAX))
        })
    }

    async fn increment(
        &self,
        table: &'static TableSpec,
        id: RecordId,
        column: &'static str,
        delta: i64,
        touch: FieldMap,
    ) -> Result<CounterUpdate, StoreError> {
        ensure_counter_column(table, column)?;
        let touch = table.coerce_update(touch)?;
        self.with_tables(|tables| {
            let Some(row) = tables.get_mut(table.name).and_then(|rows| rows.rows.get_mut(&id.get()))
            else {
                return Ok(CounterUpdate::Missing);
            };
            let current = row.get(column).and_then(Value::as_i64).unwrap_or_default();
            let next = current.checked_add(delta).filter(|next| *next >= 0);
            let Some(next) = next else {
                return Ok(CounterUpdate::Insufficient(current));
            };
            row.insert(column.to_string(), Value::from(next));
            row.extend(touch);
            Ok(CounterUpdate::Applied(next))
        })
    }
}

/// Copies joined columns into the row under their aliases.
fn apply_joins(table: &TableSpec, tables: &BTreeMap<String, TableRows>, row: &mut FieldMap) {
    for join in table.joins {
        let related = row
            .get(join.local_column)
            .and_then(Value::as_i64)
            .and_then(|key| tables.get(join.table).and_then(|rows| rows.rows.get(&key)));
        for column in join.columns {
            let value = related.and_then(|related| related.get(column.column)).cloned();
            row.insert(column.alias.to_string(), value.unwrap_or(Value::Null));
        }
    }
}

// ============================================================================
// SECTION: Document Store
// ============================================================================

/// Mutable state of the in-memory document store.
#[derive(Debug, Default)]
struct DocumentState {
    /// Last assigned document sequence number.
    last_id: u64,
    /// Documents by collection name.
    collections: BTreeMap<String, Vec<FieldMap>>,
}

/// In-memory document store for tests and examples.
#[derive(Debug, Default, Clone)]
pub struct InMemoryDocumentStore {
    /// Store state protected by a mutex.
    state: Arc<Mutex<DocumentState>>,
}

impl InMemoryDocumentStore {
    /// Creates an empty in-memory document store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs a closure against the locked store state.
    fn with_state<T>(
        &self,
        f: impl FnOnce(&mut DocumentState) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut guard = self
            .state
            .lock()
            .map_err(|_| StoreError::Store("document store mutex poisoned".to_string()))?;
        f(&mut guard)
    }
}

impl DocumentState {
    /// Appends a document, assigning its identifier.
    fn push(&mut self, collection: &CollectionSpec, mut document: FieldMap) -> DocumentId {
        self.last_id += 1;
        let id = DocumentId::new(format!("{:024x}", self.last_id));
        document.insert(DOCUMENT_ID_FIELD.to_string(), Value::String(id.as_str().to_string()));
        self.collections.entry(collection.name.to_string()).or_default().push(document);
        id
    }
}

/// Returns true when the document carries the cross-reference.
fn carries_ref(collection: &CollectionSpec, document: &FieldMap, cross_ref: &str) -> bool {
    document.get(collection.cross_ref_field).and_then(Value::as_str) == Some(cross_ref)
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn insert(
        &self,
        collection: &'static CollectionSpec,
        document: FieldMap,
    ) -> Result<Option<DocumentId>, StoreError> {
        if document.get(collection.cross_ref_field).and_then(Value::as_str).is_none() {
            return Err(StoreError::Invalid(format!(
                "document for {} missing {}",
                collection.name, collection.cross_ref_field
            )));
        }
        self.with_state(|state| Ok(Some(state.push(collection, document))))
    }

    async fn find_by_ref(
        &self,
        collection: &'static CollectionSpec,
        cross_ref: &str,
    ) -> Result<Option<FieldMap>, StoreError> {
        self.with_state(|state| {
            Ok(state.collections.get(collection.name).and_then(|documents| {
                documents
                    .iter()
                    .find(|document| carries_ref(collection, document, cross_ref))
                    .cloned()
            }))
        })
    }

    async fn count_by_ref(
        &self,
        collection: &'static CollectionSpec,
        cross_ref: &str,
    ) -> Result<u64, StoreError> {
        self.with_state(|state| {
            let count = state.collections.get(collection.name).map_or(0, |documents| {
                documents
                    .iter()
                    .filter(|document| carries_ref(collection, document, cross_ref))
                    .count()
            });
            Ok(u64::try_from(count).unwrap_or(u64::MAX))
        })
    }

    async fn update_by_ref(
        &self,
        collection: &'static CollectionSpec,
        cross_ref: &str,
        mut fields: FieldMap,
        upsert: bool,
    ) -> Result<DocumentUpdate, StoreError> {
        fields.remove(DOCUMENT_ID_FIELD);
        self.with_state(|state| {
            let existing = state.collections.get_mut(collection.name).and_then(|documents| {
                documents.iter_mut().find(|document| carries_ref(collection, document, cross_ref))
            });
            if let Some(document) = existing {
                document.extend(fields);
                return Ok(DocumentUpdate {
                    matched: 1,
                    upserted: None,
                });
            }
            if !upsert {
                return Ok(DocumentUpdate {
                    matched: 0,
                    upserted: None,
                });
            }
            fields.insert(
                collection.cross_ref_field.to_string(),
                Value::String(cross_ref.to_string()),
            );
            let id = state.push(collection, fields);
            Ok(DocumentUpdate {
                matched: 0,
                upserted: Some(id),
            })
        })
    }

    async fn delete_by_ref(
        &self,
        collection: &'static CollectionSpec,
        cross_ref: &str,
    ) -> Result<u64, StoreError> {
        self.with_state(|state| {
            let Some(documents) = state.collections.get_mut(collection.name) else {
                return Ok(0);
            };
            let before = documents.len();
            documents.retain(|document| !carries_ref(collection, document, cross_ref));
            Ok(u64::try_from(before - documents.len()).unwrap_or(u64::MAX))
        })
    }
}
