// crates/vet-clinic-core/src/entities/promotion.rs
// ============================================================================
// Module: Promotion Table
// Description: Relational-only promotions with a date window and redemption code.
// Purpose: Describe promotion rows, their validation, and code normalization.
// Dependencies: crate::{core, entities}
// ============================================================================

//! ## Overview
//! A promotion is redeemable while its status is `active` and today falls
//! inside `[startDate, endDate]`. Dates are stored as `YYYY-MM-DD`, so window
//! checks compare them as text. The description is encrypted at rest.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;

use crate::core::ColumnSpec;
use crate::core::DiscountType;
use crate::core::FieldMap;
use crate::core::PromotionStatus;
use crate::core::StatusSpec;
use crate::core::TableSpec;
use crate::entities::ValidationError;
use crate::entities::WriteMode;
use crate::entities::fields;
use crate::entities::query::ListParam;
use crate::entities::query::ParamKind;

// ============================================================================
// SECTION: Descriptors
// ============================================================================

/// Clinic promotions.
pub static PROMOTIONS: TableSpec = TableSpec {
    name: "promotions",
    columns: &[
        ColumnSpec::text("description", "description").encrypted(),
        ColumnSpec::text("start_date", "startDate"),
        ColumnSpec::text("end_date", "endDate"),
        ColumnSpec::real("discount", "discount"),
        ColumnSpec::text("discount_type", "discountType"),
        ColumnSpec::text("code", "code").nullable(),
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

/// List filters accepted for promotions.
pub const PROMOTION_PARAMS: [ListParam; 1] =
    [ListParam::relational("status", "status", ParamKind::OneOf(&PromotionStatus::NAMES))];

/// Highest percentage or amount a promotion may discount.
const MAX_DISCOUNT: f64 = 100.0;
/// Accepted redemption code length.
const CODE_LENGTH: std::ops::RangeInclusive<usize> = 3 ..= 20;
/// Default window, in days, for expiring-promotion queries.
pub const DEFAULT_EXPIRY_WINDOW_DAYS: i64 = 7;
/// Accepted window, in days, for expiring-promotion queries.
pub const EXPIRY_WINDOW_DAYS: std::ops::RangeInclusive<i64> = 1 ..= 365;

// ============================================================================
// SECTION: Rows
// ============================================================================

/// Validates promotion input and builds the row.
///
/// Both modes require the description and the date window. Creates fill in
/// the discount defaults and start `active`; updates only write what is given.
///
/// # Errors
///
/// Returns [`ValidationError`] when required fields are missing, the window
/// is empty, or a discount, code, or status is out of range.
pub fn promotion_row(input: &FieldMap, mode: WriteMode) -> Result<FieldMap, ValidationError> {
    fields::require(input, &["description", "startDate", "endDate"])?;
    let start = required_date(input, "startDate")?;
    let end = required_date(input, "endDate")?;
    if end <= start {
        return Err(ValidationError::invalid("endDate", "must be after startDate"));
    }
    let mut row = FieldMap::new();
    row.insert("description".into(), fields::required_text(input, "description")?.into());
    row.insert("start_date".into(), start.into());
    row.insert("end_date".into(), end.into());

    let discount = fields::number(input, "discount")?;
    if let Some(discount) = discount
        && !(0.0 ..= MAX_DISCOUNT).contains(&discount)
    {
        return Err(ValidationError::invalid("discount", "must be between 0 and 100"));
    }
    let discount_type = fields::text(input, "discountType")
        .map(|raw| {
            DiscountType::parse(&raw).ok_or_else(|| {
                ValidationError::invalid("discountType", "expected percentage or fixed_amount")
            })
        })
        .transpose()?;
    let code = fields::text(input, "code").map(|raw| normalize_code(&raw)).transpose()?;
    let status = fields::text(input, "status")
        .map(|raw| {
            PromotionStatus::parse(&raw).ok_or_else(|| {
                ValidationError::invalid(
                    "status",
                    format!("expected one of {}", PromotionStatus::NAMES.join(", ")),
                )
            })
        })
        .transpose()?;

    match mode {
        WriteMode::Create => {
            row.insert("discount".into(), discount.unwrap_or_default().into());
            let discount_type = discount_type.unwrap_or(DiscountType::Percentage);
            row.insert("discount_type".into(), discount_type.as_str().into());
            row.insert("code".into(), code.map_or(Value::Null, Value::from));
            row.insert("status".into(), PromotionStatus::Active.as_str().into());
        }
        WriteMode::Update => {
            fields::put(&mut row, "discount", discount);
            fields::put(&mut row, "discount_type", discount_type.map(DiscountType::as_str));
            fields::put(&mut row, "code", code);
            fields::put(&mut row, "status", status.map(PromotionStatus::as_str));
        }
    }
    Ok(row)
}

/// Validates a redemption code: 3 to 20 uppercase letters or digits.
///
/// # Errors
///
/// Returns [`ValidationError::Invalid`] when the code is malformed.
pub fn normalize_code(raw: &str) -> Result<String, ValidationError> {
    let code = raw.trim();
    let valid = CODE_LENGTH.contains(&code.len())
        && code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());
    if valid {
        Ok(code.to_string())
    } else {
        Err(ValidationError::invalid("code", "expected 3 to 20 uppercase letters or digits"))
    }
}

/// Parses a requested promotion status.
///
/// # Errors
///
/// Returns [`ValidationError`] when the status is missing or unknown.
pub fn requested_status(input: &FieldMap) -> Result<PromotionStatus, ValidationError> {
    fields::require(input, &["status"])?;
    fields::text(input, "status").as_deref().and_then(PromotionStatus::parse).ok_or_else(|| {
        ValidationError::invalid(
            "status",
            format!("expected one of {}", PromotionStatus::NAMES.join(", ")),
        )
    })
}

/// Parses the expiring-promotion window, defaulting to a week.
///
/// # Errors
///
/// Returns [`ValidationError::Invalid`] when the window is not 1 to 365 days.
pub fn expiry_window(input: &FieldMap) -> Result<i64, ValidationError> {
    let days = fields::integer(input, "days")?.unwrap_or(DEFAULT_EXPIRY_WINDOW_DAYS);
    if EXPIRY_WINDOW_DAYS.contains(&days) {
        Ok(days)
    } else {
        Err(ValidationError::invalid("days", "must be between 1 and 365"))
    }
}

/// Returns a required normalized date.
fn required_date(input: &FieldMap, key: &'static str) -> Result<String, ValidationError> {
    fields::date(input, key)?.ok_or_else(|| ValidationError::Missing(vec![key]))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
