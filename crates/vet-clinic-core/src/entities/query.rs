// crates/vet-clinic-core/src/entities/query.rs
// ============================================================================
// Module: List Queries
// Description: Declared list filters and their resolution into store filters.
// Purpose: Validate list query parameters and route each to the store that owns it.
// Dependencies: crate::{core, entities, interfaces}, serde_json
// ============================================================================

//! ## Overview
//! Every listable record declares the query parameters it accepts as
//! [`ListParam`]s. A parameter targets either a relational column or a
//! document field, and carries the value kind used to validate it.
//!
//! ## Invariants
//! - The shared parameters in [`SHARED_PARAMS`] are never dropped silently:
//!   a record that does not declare one rejects it.
//! - Enumerated values are checked against their closed set before any store
//!   is read.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;

use crate::core::FieldMap;
use crate::core::PRIMARY_KEY;
use crate::entities::ValidationError;
use crate::entities::fields;
use crate::interfaces::Filter;
use crate::interfaces::OrderBy;

// ============================================================================
// SECTION: Parameters
// ============================================================================

/// Query parameters every list understands; undeclared ones are rejected.
pub const SHARED_PARAMS: [&str; 2] = ["clientId", "status"];

/// Store a list parameter is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterTarget {
    /// Base-table column, filtered in SQL.
    Relational,
    /// Document field, filtered after the paired document is loaded.
    Document,
}

/// Accepted value shape of a list parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Positive relational key.
    RecordId,
    /// `YYYY-MM-DD` date.
    Date,
    /// Boolean flag.
    Flag,
    /// Rating from 1 to 5.
    Rating,
    /// One of a closed set of strings.
    OneOf(&'static [&'static str]),
}

/// Query parameter accepted by a list endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListParam {
    /// Query parameter name.
    pub name: &'static str,
    /// Column or document field compared against.
    pub field: &'static str,
    /// Store holding `field`.
    pub target: FilterTarget,
    /// Accepted value shape.
    pub kind: ParamKind,
}

impl ListParam {
    /// Declares a parameter filtered on a relational column.
    #[must_use]
    pub const fn relational(name: &'static str, column: &'static str, kind: ParamKind) -> Self {
        Self {
            name,
            field: column,
            target: FilterTarget::Relational,
            kind,
        }
    }

    /// Declares a parameter filtered on a document field.
    #[must_use]
    pub const fn document(name: &'static str, field: &'static str, kind: ParamKind) -> Self {
        Self {
            name,
            field,
            target: FilterTarget::Document,
            kind,
        }
    }

    /// Parses the parameter's value from the query, if present.
    fn value(&self, query: &FieldMap) -> Result<Option<Value>, ValidationError> {
        if fields::present(query, self.name).is_none() {
            return Ok(None);
        }
        let value = match self.kind {
            ParamKind::RecordId => {
                Some(Value::from(fields::required_record_id(query, self.name)?.get()))
            }
            ParamKind::Date => fields::date(query, self.name)?.map(Value::from),
            ParamKind::Flag => fields::flag(query, self.name)?.map(Value::from),
            ParamKind::Rating => fields::rating(query, self.name)?.map(Value::from),
            ParamKind::OneOf(choices) => {
                let raw = fields::text(query, self.name).unwrap_or_default();
                if !choices.contains(&raw.as_str()) {
                    return Err(ValidationError::invalid(
                        self.name,
                        format!("expected one of {}", choices.join(", ")),
                    ));
                }
                Some(Value::from(raw))
            }
        };
        Ok(value)
    }
}

// ============================================================================
// SECTION: Queries
// ============================================================================

/// Resolved list query split by store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    /// Filters applied in the relational select.
    pub relational: Vec<Filter>,
    /// Filters applied to each record's document details.
    pub document: Vec<Filter>,
    /// Ordering; newest first when empty.
    pub order: Vec<OrderBy>,
}

impl ListQuery {
    /// Builds a query from relational filters only.
    #[must_use]
    pub const fn relational(filters: Vec<Filter>) -> Self {
        Self {
            relational: filters,
            document: Vec::new(),
            order: Vec::new(),
        }
    }

    /// Resolves query parameters against the declared list parameters.
    ///
    /// Parameters outside [`SHARED_PARAMS`] that are not declared are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when a value is malformed or outside its
    /// closed set, or when a shared parameter is not supported by `label`.
    pub fn from_params(
        label: &str,
        params: &[ListParam],
        query: &FieldMap,
    ) -> Result<Self, ValidationError> {
        for name in SHARED_PARAMS {
            if query.contains_key(name) && !params.iter().any(|param| param.name == name) {
                return Err(ValidationError::invalid(
                    name,
                    format!("{label} lists cannot be filtered by {name}"),
                ));
            }
        }
        let mut resolved = Self::default();
        for param in params {
            let Some(value) = param.value(query)? else {
                continue;
            };
            let filter = Filter::eq(param.field, value);
            match param.target {
                FilterTarget::Relational => resolved.relational.push(filter),
                FilterTarget::Document => resolved.document.push(filter),
            }
        }
        Ok(resolved)
    }

    /// Adds an ordering clause.
    #[must_use]
    pub fn order_by(mut self, column: &str, descending: bool) -> Self {
        self.order.push(OrderBy {
            column: column.to_string(),
            descending,
        });
        self
    }

    /// Returns the relational ordering, defaulting to newest first.
    #[must_use]
    pub fn ordering(&self) -> Vec<OrderBy> {
        if self.order.is_empty() {
            vec![OrderBy {
                column: PRIMARY_KEY.to_string(),
                descending: true,
            }]
        } else {
            self.order.clone()
        }
    }

    /// Returns true when the document details satisfy every document filter.
    ///
    /// A record without details only matches an unfiltered query.
    #[must_use]
    pub fn matches_details(&self, details: Option<&FieldMap>) -> bool {
        if self.document.is_empty() {
            return true;
        }
        details.is_some_and(|details| self.document.iter().all(|filter| filter.matches(details)))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
