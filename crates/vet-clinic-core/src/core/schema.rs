// crates/vet-clinic-core/src/core/schema.rs
// ============================================================================
// Module: Vet Clinic Table and Collection Descriptors
// Description: Static descriptions of relational tables and document collections.
// Purpose: Let generic stores and the coordinator operate on any split entity.
// Dependencies: serde_json, thiserror
// ============================================================================

//! ## Overview
//! Every relational table is described by a static [`TableSpec`]: its columns,
//! which of them hold ciphertext, the optional status column used for soft
//! deletes, and the read-side joins. Each column also names the API field it
//! renders as. Document collections are described by a [`CollectionSpec`]
//! naming the cross-reference field that points back at the relational key.
//!
//! Rows and documents travel as JSON maps ([`FieldMap`]). Values are coerced
//! against the column kind before they reach a store so every backend sees the
//! same normalized shape.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Primary key column shared by every relational table.
pub const PRIMARY_KEY: &str = "id";
/// Creation timestamp column, stamped on insert when a table declares it.
pub const CREATED_AT: &str = "created_at";
/// Modification timestamp column, stamped on insert and update when declared.
pub const UPDATED_AT: &str = "updated_at";
/// Identifier field carried by every stored document.
pub const DOCUMENT_ID_FIELD: &str = "_id";
/// Document creation timestamp field.
pub const DOCUMENT_CREATED_AT: &str = "createdAt";
/// Document modification timestamp field.
pub const DOCUMENT_UPDATED_AT: &str = "updatedAt";

/// Row or document payload keyed by column or field name.
pub type FieldMap = Map<String, Value>;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while coercing rows against a table descriptor.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// Column is not declared on the table.
    #[error("unknown column {column} for table {table}")]
    UnknownColumn {
        /// Table name.
        table: &'static str,
        /// Offending column name.
        column: String,
    },
    /// A non-nullable column is missing or null.
    #[error("column {table}.{column} is required")]
    Required {
        /// Table name.
        table: &'static str,
        /// Column name.
        column: &'static str,
    },
    /// A value does not fit the declared column kind.
    #[error("column {table}.{column} expects {expected}")]
    TypeMismatch {
        /// Table name.
        table: &'static str,
        /// Column name.
        column: &'static str,
        /// Expected kind label.
        expected: &'static str,
    },
    /// Caller attempted to write the store-assigned primary key.
    #[error("primary key of {0} is store-assigned")]
    PrimaryKey(&'static str),
}

// ============================================================================
// SECTION: Columns
// ============================================================================

/// Storage kind of a relational column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// 64-bit signed integer.
    Integer,
    /// Double precision float.
    Real,
    /// UTF-8 text.
    Text,
}

impl ColumnKind {
    /// Returns the SQL type affinity for the column kind.
    #[must_use]
    pub const fn sql_type(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Text => "TEXT",
        }
    }

    /// Returns a human-readable label used in error messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Integer => "an integer",
            Self::Real => "a number",
            Self::Text => "text",
        }
    }
}

/// Relational column descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Column name in the relational store.
    pub column: &'static str,
    /// Field name used when the column is rendered to callers.
    pub field: &'static str,
    /// Storage kind.
    pub kind: ColumnKind,
    /// Whether the column accepts null.
    pub nullable: bool,
    /// Whether the column holds ciphertext at rest.
    pub encrypted: bool,
}

impl ColumnSpec {
    /// Declares an integer column.
    #[must_use]
    pub const fn integer(column: &'static str, field: &'static str) -> Self {
        Self::declare(column, field, ColumnKind::Integer)
    }

    /// Declares a real column.
    #[must_use]
    pub const fn real(column: &'static str, field: &'static str) -> Self {
        Self::declare(column, field, ColumnKind::Real)
    }

    /// Declares a text column.
    #[must_use]
    pub const fn text(column: &'static str, field: &'static str) -> Self {
        Self::declare(column, field, ColumnKind::Text)
    }

    /// Marks the column as nullable.
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Marks the column as ciphertext-at-rest.
    #[must_use]
    pub const fn encrypted(mut self) -> Self {
        self.encrypted = true;
        self
    }

    /// Builds a non-null plaintext column descriptor.
    const fn declare(column: &'static str, field: &'static str, kind: ColumnKind) -> Self {
        Self {
            column,
            field,
            kind,
            nullable: false,
            encrypted: false,
        }
    }

    /// Coerces a JSON value to the column kind.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] when the value is null for a non-null column or
    /// cannot be represented in the column kind.
    pub fn coerce(&self, table: &'static str, value: Value) -> Result<Value, SchemaError> {
        let mismatch = || SchemaError::TypeMismatch {
            table,
            column: self.column,
            expected: self.kind.label(),
        };
        match (self.kind, value) {
            (_, Value::Null) => {
                if self.nullable {
                    Ok(Value::Null)
                } else {
                    Err(SchemaError::Required {
                        table,
                        column: self.column,
                    })
                }
            }
            (ColumnKind::Integer, Value::Number(number)) => {
                number.as_i64().map(Value::from).ok_or_else(mismatch)
            }
            (ColumnKind::Integer, Value::String(text)) => {
                text.trim().parse::<i64>().map(Value::from).map_err(|_| mismatch())
            }
            (ColumnKind::Integer, Value::Bool(flag)) => Ok(Value::from(i64::from(flag))),
            (ColumnKind::Real, Value::Number(number)) => {
                number.as_f64().map(Value::from).ok_or_else(mismatch)
            }
            (ColumnKind::Real, Value::String(text)) => text
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .map(Value::from)
                .ok_or_else(mismatch),
            (ColumnKind::Text, Value::String(text)) => Ok(Value::String(text)),
            (ColumnKind::Text, Value::Number(number)) => Ok(Value::String(number.to_string())),
            (ColumnKind::Text, Value::Bool(flag)) => Ok(Value::String(flag.to_string())),
            _ => Err(mismatch()),
        }
    }
}

// ============================================================================
// SECTION: Tables
// ============================================================================

/// Status column used for soft deletes and reference liveness checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusSpec {
    /// Column holding the status value.
    pub column: &'static str,
    /// Value assigned on create.
    pub initial: &'static str,
    /// Value assigned by a soft delete; rows carrying it are not live.
    pub retired: &'static str,
}

/// Column pulled from a joined table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinColumn {
    /// Column on the joined table.
    pub column: &'static str,
    /// Alias the value is returned under.
    pub alias: &'static str,
    /// Whether the joined column holds ciphertext.
    pub encrypted: bool,
}

/// Left join from a table to a related table by foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinSpec {
    /// Joined table name.
    pub table: &'static str,
    /// Foreign key column on the base table.
    pub local_column: &'static str,
    /// Columns selected from the joined table.
    pub columns: &'static [JoinColumn],
}

/// Relational table descriptor.
///
/// # Invariants
/// - The primary key is always [`PRIMARY_KEY`] and is assigned by the store.
/// - Column names are trusted static identifiers and may be interpolated into SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSpec {
    /// Table name.
    pub name: &'static str,
    /// Declared columns, excluding the primary key.
    pub columns: &'static [ColumnSpec],
    /// Optional status column.
    pub status: Option<StatusSpec>,
    /// Read-side joins applied by `select`.
    pub joins: &'static [JoinSpec],
}

impl TableSpec {
    /// Returns the column descriptor by column name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|column| column.column == name)
    }

    /// Returns true when the name is the primary key or a declared column.
    #[must_use]
    pub fn knows_column(&self, name: &str) -> bool {
        name == PRIMARY_KEY || self.column(name).is_some()
    }

    /// Returns true when the table declares the column.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Returns true when the row is not soft-deleted.
    #[must_use]
    pub fn is_live(&self, row: &FieldMap) -> bool {
        self.status.is_none_or(|status| {
            row.get(status.column).and_then(Value::as_str) != Some(status.retired)
        })
    }

    /// Coerces a complete row for insertion.
    ///
    /// Missing nullable columns are filled with null.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] when a column is unknown, mistyped, or missing.
    pub fn coerce_insert(&self, row: FieldMap) -> Result<FieldMap, SchemaError> {
        let mut coerced = self.coerce_update(row)?;
        for column in self.columns {
            if coerced.contains_key(column.column) {
                continue;
            }
            if !column.nullable {
                return Err(SchemaError::Required {
                    table: self.name,
                    column: column.column,
                });
            }
            coerced.insert(column.column.to_string(), Value::Null);
        }
        Ok(coerced)
    }

    /// Coerces a partial row for update.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] when a column is unknown or mistyped.
    pub fn coerce_update(&self, row: FieldMap) -> Result<FieldMap, SchemaError> {
        let mut coerced = FieldMap::new();
        for (name, value) in row {
            if name == PRIMARY_KEY {
                return Err(SchemaError::PrimaryKey(self.name));
            }
            let Some(column) = self.column(&name) else {
                return Err(SchemaError::UnknownColumn {
                    table: self.name,
                    column: name,
                });
            };
            let value = column.coerce(self.name, value)?;
            coerced.insert(name, value);
        }
        Ok(coerced)
    }

    /// Renames stored columns to their API field names.
    ///
    /// The primary key and join aliases pass through unchanged.
    #[must_use]
    pub fn render(&self, row: FieldMap) -> FieldMap {
        row.into_iter()
            .map(|(name, value)| match self.column(&name) {
                Some(column) => (column.field.to_string(), value),
                None => (name, value),
            })
            .collect()
    }
}

// ============================================================================
// SECTION: Collections
// ============================================================================

/// Document collection descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionSpec {
    /// Collection name.
    pub name: &'static str,
    /// Field holding the relational key rendered as a string.
    pub cross_ref_field: &'static str,
    /// Optional workflow status field mirrored on soft delete.
    pub status_field: Option<&'static str>,
}
