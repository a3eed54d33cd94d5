// crates/vet-clinic-store-sqlite/src/relational.rs
// ============================================================================
// Module: SQLite Relational Store
// Description: RelationalStore and ConnectionLifecycle backed by a pooled SQLite database.
// Purpose: Persist normalized entity rows with joins, keyed lookups, and transactional deletes.
// Dependencies: async-trait, rusqlite, vet-clinic-core
// ============================================================================

//! ## Overview
//! One table per [`TableSpec`] in [`ALL_TABLES`], created idempotently when
//! the pool is built. Rows are coerced against the descriptor before they are
//! bound, so the database only ever sees declared columns.
//! Security posture: database contents are untrusted and decoded defensively.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::TransactionBehavior;
use rusqlite::params_from_iter;
use rusqlite::types::Value as SqlValue;
use vet_clinic_core::ConnectionLifecycle;
use vet_clinic_core::CounterUpdate;
use vet_clinic_core::FieldMap;
use vet_clinic_core::Filter;
use vet_clinic_core::PRIMARY_KEY;
use vet_clinic_core::RecordId;
use vet_clinic_core::RelationalStore;
use vet_clinic_core::SelectQuery;
use vet_clinic_core::StoreError;
use vet_clinic_core::TableSpec;
use vet_clinic_core::entities::ALL_TABLES;
use vet_clinic_core::interfaces::ensure_counter_column;

use crate::config::SqlitePoolConfig;
use crate::config::SqliteStoreError;
use crate::config::db_error;
use crate::pool::SqlitePool;
use crate::sql::BASE_ALIAS;
use crate::sql::create_tables;
use crate::sql::read_row;
use crate::sql::to_sql;
use crate::sql::where_clause;

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed relational store.
pub struct SqliteRelationalStore {
    /// Connection pool.
    pool: SqlitePool,
}

impl SqliteRelationalStore {
    /// Opens the store and creates any missing entity tables.
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

/// Creates every entity table.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    create_tables(connection, &ALL_TABLES)
}

/// Returns `id` followed by every declared column.
fn base_columns(table: &TableSpec) -> Vec<&'static str> {
    std::iter::once(PRIMARY_KEY).chain(table.columns.iter().map(|column| column.column)).collect()
}

#[async_trait]
impl RelationalStore for SqliteRelationalStore {
    async fn insert(
        &self,
        table: &'static TableSpec,
        row: FieldMap,
    ) -> Result<Option<RecordId>, StoreError> {
        let row = table.coerce_insert(row)?;
        self.pool
            .run(move |connection| {
                let columns = row.keys().map(String::as_str).collect::<Vec<_>>();
                let slots =
                    (1 ..= columns.len()).map(|index| format!("?{index}")).collect::<Vec<_>>();
                let sql = format!(
                    "INSERT INTO {} ({}) VALUES ({})",
                    table.name,
                    columns.join(", "),
                    slots.join(", ")
                );
                let params = row.values().map(to_sql).collect::<Vec<_>>();
                connection
                    .execute(&sql, params_from_iter(params.iter()))
                    .map_err(|err| db_error(&err))?;
                Ok(RecordId::new(connection.last_insert_rowid()))
            })
            .await
    }

    async fn find(
        &self,
        table: &'static TableSpec,
        id: RecordId,
    ) -> Result<Option<FieldMap>, StoreError> {
        self.pool
            .run(move |connection| {
                let names = base_columns(table);
                let sql = format!(
                    "SELECT {} FROM {} WHERE {PRIMARY_KEY} = ?1",
                    names.join(", "),
                    table.name
                );
                connection
                    .query_row(&sql, [id.get()], |row| read_row(row, &names))
                    .optional()
                    .map_err(|err| db_error(&err))
            })
            .await
    }

    async fn update(
        &self,
        table: &'static TableSpec,
        id: RecordId,
        fields: FieldMap,
    ) -> Result<bool, StoreError> {
        let fields = table.coerce_update(fields)?;
        if fields.is_empty() {
            return Ok(self.find(table, id).await?.is_some());
        }
        self.pool
            .run(move |connection| {
                let assignments = fields
                    .keys()
                    .enumerate()
                    .map(|(index, column)| format!("{column} = ?{}", index + 1))
                    .collect::<Vec<_>>();
                let sql = format!(
                    "UPDATE {} SET {} WHERE {PRIMARY_KEY} = ?{}",
                    table.name,
                    assignments.join(", "),
                    fields.len() + 1
                );
                let mut params = fields.values().map(to_sql).collect::<Vec<_>>();
                params.push(SqlValue::Integer(id.get()));
                let changed = connection
                    .execute(&sql, params_from_iter(params.iter()))
                    .map_err(|err| db_error(&err))?;
                Ok(changed > 0)
            })
            .await
    }

    async fn delete(&self, table: &'static TableSpec, id: RecordId) -> Result<bool, StoreError> {
        self.pool
            .run(move |connection| {
                let tx = connection.transaction().map_err(|err| db_error(&err))?;
                let sql = format!("DELETE FROM {} WHERE {PRIMARY_KEY} = ?1", table.name);
                let changed = tx.execute(&sql, [id.get()]).map_err(|err| db_error(&err))?;
                tx.commit().map_err(|err| db_error(&err))?;
                Ok(changed > 0)
            })
            .await
    }

    async fn select(
        &self,
        table: &'static TableSpec,
        query: SelectQuery,
    ) -> Result<Vec<FieldMap>, StoreError> {
        query.validate(table)?;
        self.pool
            .run(move |connection| {
                let mut names = base_columns(table);
                let mut projection = names
                    .iter()
                    .map(|column| format!("{BASE_ALIAS}.{column}"))
                    .collect::<Vec<_>>();
                let mut joins = String::new();
                for (index, join) in table.joins.iter().enumerate() {
                    let alias = format!("j{index}");
                    joins.push_str(&format!(
                        " LEFT JOIN {} AS {alias} ON {alias}.{PRIMARY_KEY} = {BASE_ALIAS}.{}",
                        join.table, join.local_column
                    ));
                    for column in join.columns {
                        projection
                            .push(format!("{alias}.{} AS \"{}\"", column.column, column.alias));
                        names.push(column.alias);
                    }
                }
                let mut params = Vec::new();
                let filter = where_clause(&query.filters, &mut params);
                let order = if query.order.is_empty() {
                    format!("{BASE_ALIAS}.{PRIMARY_KEY} ASC")
                } else {
                    query
                        .order
                        .iter()
                        .map(|order| {
                            let direction = if order.descending { "DESC" } else { "ASC" };
                            format!("{BASE_ALIAS}.{} {direction}", order.column)
                        })
                        .collect::<Vec<_>>()
                        .join(", ")
                };
                let limit = query.limit.map(|limit| format!(" LIMIT {limit}")).unwrap_or_default();
                let sql = format!(
                    "SELECT {} FROM {} AS {BASE_ALIAS}{joins}{filter} ORDER BY {order}{limit}",
                    projection.join(", "),
                    table.name
                );
                let mut statement = connection.prepare(&sql).map_err(|err| db_error(&err))?;
                let rows = statement
                    .query_map(params_from_iter(params.iter()), |row| read_row(row, &names))
                    .map_err(|err| db_error(&err))?;
                rows.collect::<Result<Vec<_>, _>>().map_err(|err| db_error(&err))
            })
            .await
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
        self.pool
            .run(move |connection| {
                let mut params = Vec::new();
                let filter = where_clause(&filters, &mut params);
                let sql = format!("SELECT COUNT(*) FROM {} AS {BASE_ALIAS}{filter}", table.name);
                let count: i64 = connection
                    .query_row(&sql, params_from_iter(params.iter()), |row| row.get(0))
                    .map_err(|err| db_error(&err))?;
                u64::try_from(count)
                    .map_err(|_| SqliteStoreError::Invalid("negative row count".to_string()))
            })
            .await
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
        self.pool
            .run(move |connection| {
                let tx = connection
                    .transaction_with_behavior(TransactionBehavior::Immediate)
                    .map_err(|err| db_error(&err))?;
                let mut assignments = vec![format!("{column} = {column} + ?1")];
                let mut params = vec![SqlValue::Integer(delta), SqlValue::Integer(id.get())];
                for (name, value) in &touch {
                    params.push(to_sql(value));
                    assignments.push(format!("{name} = ?{}", params.len()));
                }
                let sql = format!(
                    "UPDATE {} SET {} WHERE {PRIMARY_KEY} = ?2 AND {column} + ?1 >= 0 RETURNING \
                     {column}",
                    table.name,
                    assignments.join(", ")
                );
                let applied = tx
                    .query_row(&sql, params_from_iter(params.iter()), |row| row.get::<_, i64>(0))
                    .optional()
                    .map_err(|err| db_error(&err))?;
                let outcome = match applied {
                    Some(value) => CounterUpdate::Applied(value),
                    None => {
                        let sql =
                            format!("SELECT {column} FROM {} WHERE {PRIMARY_KEY} = ?1", table.name);
                        tx.query_row(&sql, [id.get()], |row| row.get::<_, Option<i64>>(0))
                            .optional()
                            .map_err(|err| db_error(&err))?
                            .map_or(CounterUpdate::Missing, |current| {
                                CounterUpdate::Insufficient(current.unwrap_or_default())
                            })
                    }
                };
                tx.commit().map_err(|err| db_error(&err))?;
                Ok(outcome)
            })
            .await
    }
}

#[async_trait]
impl ConnectionLifecycle for SqliteRelationalStore {
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
