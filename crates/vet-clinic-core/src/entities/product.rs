// crates/vet-clinic-core/src/entities/product.rs
// ============================================================================
// Module: Product Entity
// Description: Catalog product split between price/stock and long-form details.
// Purpose: Define product mapping, validation, and stock adjustments.
// Dependencies: crate::{core, entities}, serde_json
// ============================================================================

//! ## Overview
//! Name, description, and category are encrypted at rest. Stock is an
//! integer on the relational side; the document carries the critical stock
//! threshold alongside usage and safety notes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use serde_json::json;

use crate::core::CollectionSpec;
use crate::core::ColumnSpec;
use crate::core::FieldMap;
use crate::core::RecordStatus;
use crate::core::StatusSpec;
use crate::core::TableSpec;
use crate::entities::Reference;
use crate::entities::SplitEntity;
use crate::entities::Transition;
use crate::entities::ValidationError;
use crate::entities::WriteMode;
use crate::entities::fields;
use crate::entities::query::ListParam;
use crate::entities::query::ParamKind;

// ============================================================================
// SECTION: Descriptors
// ============================================================================

/// Product catalog table.
pub static PRODUCTS: TableSpec = TableSpec {
    name: "products",
    columns: &[
        ColumnSpec::text("name", "name").encrypted(),
        ColumnSpec::text("description", "description").encrypted(),
        ColumnSpec::real("price", "price"),
        ColumnSpec::integer("stock", "stock"),
        ColumnSpec::text("category", "category").encrypted().nullable(),
        ColumnSpec::text("status", "status"),
        ColumnSpec::text("created_at", "createdAt"),
        ColumnSpec::text("updated_at", "updatedAt"),
    ],
    status: Some(StatusSpec {
        column: "status",
        initial: "active",
        retired: "inactive",
    }),
    joins: &[],
};

/// Product detail collection.
pub static PRODUCT_DETAILS: CollectionSpec = CollectionSpec {
    name: "products",
    cross_ref_field: "productSqlId",
    status_field: Some("status"),
};

/// Stock level below which a product is flagged, unless overridden.
const DEFAULT_CRITICAL_STOCK: i64 = 10;

// ============================================================================
// SECTION: Entity
// ============================================================================

/// Product split entity.
#[derive(Debug, Clone, Copy)]
pub struct Product;

impl SplitEntity for Product {
    const NAME: &'static str = "product";
    const LIST_PARAMS: &'static [ListParam] = &[ListParam::relational(
        "status",
        "status",
        ParamKind::OneOf(&RecordStatus::NAMES),
    )];

    fn table() -> &'static TableSpec {
        &PRODUCTS
    }

    fn collection() -> &'static CollectionSpec {
        &PRODUCT_DETAILS
    }

    fn validate(input: &FieldMap, _mode: WriteMode) -> Result<(), ValidationError> {
        fields::require(input, &["name", "description", "price", "stock"])?;
        fields::non_negative_number(input, "price")?;
        fields::non_negative_integer(input, "stock")?;
        Ok(())
    }

    fn references(_input: &FieldMap) -> Result<Vec<Reference>, ValidationError> {
        Ok(Vec::new())
    }

    fn relational_fields(input: &FieldMap, mode: WriteMode) -> Result<FieldMap, ValidationError> {
        let mut row = FieldMap::new();
        row.insert("name".into(), fields::required_text(input, "name")?.into());
        row.insert("description".into(), fields::required_text(input, "description")?.into());
        row.insert("price".into(), fields::non_negative_number(input, "price")?.into());
        row.insert("stock".into(), fields::non_negative_integer(input, "stock")?.into());
        let category = fields::text(input, "category");
        if mode == WriteMode::Create || category.is_some() {
            row.insert("category".into(), category.map_or(Value::Null, Value::from));
        }
        if mode == WriteMode::Create {
            row.insert("status".into(), RecordStatus::Active.as_str().into());
        }
        Ok(row)
    }

    fn document_fields(input: &FieldMap, mode: WriteMode) -> Result<FieldMap, ValidationError> {
        let mut document = fields::defaults(
            mode,
            json!({
                "longDescription": "",
                "usageNotes": "",
                "sideEffects": [],
                "ingredients": [],
                "applicationMode": "",
                "precautions": "",
                "imageUrls": [],
                "featured": false,
                "criticalStock": DEFAULT_CRITICAL_STOCK,
                "status": RecordStatus::Active.as_str(),
            }),
        );
        for key in ["longDescription", "usageNotes", "applicationMode", "precautions"] {
            fields::put(&mut document, key, fields::text(input, key));
        }
        fields::put(&mut document, "sideEffects", fields::string_list(input, "sideEffects")?);
        fields::put(&mut document, "ingredients", fields::string_list(input, "ingredients")?);
        fields::put(&mut document, "imageUrls", fields::string_list(input, "imageUrls")?);
        fields::put(&mut document, "featured", fields::flag(input, "featured")?);
        if fields::present(input, "criticalStock").is_some() {
            document.insert(
                "criticalStock".into(),
                fields::non_negative_integer(input, "criticalStock")?.into(),
            );
        }
        Ok(document)
    }
}

// ============================================================================
// SECTION: Stock
// ============================================================================

/// Stock adjustment operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockOperation {
    /// Replace the stock level.
    Set,
    /// Add to the stock level.
    Add,
    /// Subtract from the stock level.
    Subtract,
}

impl StockOperation {
    /// Parses an operation name.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "set" => Some(Self::Set),
            "add" => Some(Self::Add),
            "subtract" => Some(Self::Subtract),
            _ => None,
        }
    }
}

/// Integer column holding the stock level.
pub const STOCK_COLUMN: &str = "stock";

/// Requested change to a product's stock level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockChange {
    /// Replace the level with the value.
    Set(i64),
    /// Add the signed delta to the level stored at write time.
    Delta(i64),
}

/// Parses a stock adjustment request.
///
/// Relative operations become deltas so the store applies them atomically
/// against the committed level, never against a level read earlier.
///
/// # Errors
///
/// Returns [`ValidationError`] when the quantity is missing or negative or
/// the operation is unknown.
pub fn stock_change(input: &FieldMap) -> Result<StockChange, ValidationError> {
    let quantity = fields::non_negative_integer(input, "quantity")?;
    let operation = match fields::text(input, "operation") {
        None => StockOperation::Set,
        Some(value) => StockOperation::parse(&value).ok_or_else(|| {
            ValidationError::invalid("operation", "expected one of set, add, subtract")
        })?,
    };
    Ok(match operation {
        StockOperation::Set => StockChange::Set(quantity),
        StockOperation::Add => StockChange::Delta(quantity),
        StockOperation::Subtract => StockChange::Delta(-quantity),
    })
}

/// Relational transition replacing the stock level.
#[must_use]
pub fn stock_level(level: i64) -> Transition {
    let mut transition = Transition::default();
    transition.relational.insert(STOCK_COLUMN.into(), level.into());
    transition
}
