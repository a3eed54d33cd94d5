// crates/vet-clinic-core/src/entities/fields.rs
// ============================================================================
// Module: Entity Field Helpers
// Description: Typed extraction of caller input fields.
// Purpose: Share presence, type, and range checks across entity mappers.
// Dependencies: crate::core, serde_json
// ============================================================================

//! ## Overview
//! Caller input arrives as a JSON object. A field counts as absent when it is
//! missing, null, blank, or one of the literal strings `null`/`undefined`
//! that form clients commonly submit. Numbers may arrive as JSON numbers or
//! numeric strings.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;

use crate::core::FieldMap;
use crate::core::RecordId;
use crate::core::time::normalize_clock;
use crate::core::time::normalize_date;
use crate::entities::ValidationError;
use crate::entities::WriteMode;

// ============================================================================
// SECTION: Presence
// ============================================================================

/// Returns the field value when it is meaningfully present.
#[must_use]
pub fn present<'a>(input: &'a FieldMap, key: &str) -> Option<&'a Value> {
    let value = input.get(key)?;
    match value {
        Value::Null => None,
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() || trimmed == "null" || trimmed == "undefined" {
                None
            } else {
                Some(value)
            }
        }
        _ => Some(value),
    }
}

/// Fails with every missing key when any required field is absent.
///
/// # Errors
///
/// Returns [`ValidationError::Missing`] listing the absent keys.
pub fn require(input: &FieldMap, keys: &[&'static str]) -> Result<(), ValidationError> {
    let missing: Vec<&'static str> =
        keys.iter().copied().filter(|key| present(input, key).is_none()).collect();
    if missing.is_empty() { Ok(()) } else { Err(ValidationError::Missing(missing)) }
}

// ============================================================================
// SECTION: Text
// ============================================================================

/// Returns trimmed text for a present scalar field.
#[must_use]
pub fn text(input: &FieldMap, key: &str) -> Option<String> {
    match present(input, key)? {
        Value::String(text) => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// Returns trimmed text for a required field.
///
/// # Errors
///
/// Returns [`ValidationError::Missing`] when the field is absent.
pub fn required_text(input: &FieldMap, key: &'static str) -> Result<String, ValidationError> {
    text(input, key).ok_or_else(|| ValidationError::Missing(vec![key]))
}

/// Returns a list of strings from an array or a comma-separated string.
///
/// # Errors
///
/// Returns [`ValidationError::Invalid`] when the field is neither.
pub fn string_list(input: &FieldMap, key: &'static str) -> Result<Option<Value>, ValidationError> {
    let Some(value) = present(input, key) else {
        return Ok(None);
    };
    let items: Vec<Value> = match value {
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(text) => Ok(Value::String(text.trim().to_string())),
                Value::Number(number) => Ok(Value::String(number.to_string())),
                _ => Err(ValidationError::invalid(key, "expected a list of strings")),
            })
            .collect::<Result<_, _>>()?,
        Value::String(text) => text
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| Value::String(item.to_string()))
            .collect(),
        _ => return Err(ValidationError::invalid(key, "expected a list of strings")),
    };
    Ok(Some(Value::Array(items)))
}

// ============================================================================
// SECTION: Numbers
// ============================================================================

/// Returns an integer field.
///
/// # Errors
///
/// Returns [`ValidationError::Invalid`] when the field is not an integer.
pub fn integer(input: &FieldMap, key: &'static str) -> Result<Option<i64>, ValidationError> {
    match present(input, key) {
        None => Ok(None),
        Some(Value::Number(number)) => number
            .as_i64()
            .map(Some)
            .ok_or_else(|| ValidationError::invalid(key, "expected an integer")),
        Some(Value::String(text)) => text
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| ValidationError::invalid(key, "expected an integer")),
        Some(_) => Err(ValidationError::invalid(key, "expected an integer")),
    }
}

/// Returns a finite numeric field.
///
/// # Errors
///
/// Returns [`ValidationError::Invalid`] when the field is not a number.
pub fn number(input: &FieldMap, key: &'static str) -> Result<Option<f64>, ValidationError> {
    let parsed = match present(input, key) {
        None => return Ok(None),
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    parsed
        .filter(|value| value.is_finite())
        .map(Some)
        .ok_or_else(|| ValidationError::invalid(key, "expected a number"))
}

/// Returns a required non-negative number.
///
/// # Errors
///
/// Returns [`ValidationError`] when the field is absent, malformed, or negative.
pub fn non_negative_number(input: &FieldMap, key: &'static str) -> Result<f64, ValidationError> {
    let value = number(input, key)?.ok_or_else(|| ValidationError::Missing(vec![key]))?;
    if value < 0.0 {
        return Err(ValidationError::invalid(key, "must not be negative"));
    }
    Ok(value)
}

/// Returns a required non-negative integer.
///
/// # Errors
///
/// Returns [`ValidationError`] when the field is absent, malformed, or negative.
pub fn non_negative_integer(input: &FieldMap, key: &'static str) -> Result<i64, ValidationError> {
    let value = integer(input, key)?.ok_or_else(|| ValidationError::Missing(vec![key]))?;
    if value < 0 {
        return Err(ValidationError::invalid(key, "must not be negative"));
    }
    Ok(value)
}

/// Returns an optional rating in the 1 to 5 range.
///
/// # Errors
///
/// Returns [`ValidationError::Invalid`] when the rating is out of range.
pub fn rating(input: &FieldMap, key: &'static str) -> Result<Option<i64>, ValidationError> {
    match integer(input, key)? {
        Some(value) if !(1 ..= 5).contains(&value) => {
            Err(ValidationError::invalid(key, "must be between 1 and 5"))
        }
        other => Ok(other),
    }
}

/// Returns an optional boolean flag.
///
/// # Errors
///
/// Returns [`ValidationError::Invalid`] when the field is not a boolean.
pub fn flag(input: &FieldMap, key: &'static str) -> Result<Option<bool>, ValidationError> {
    match present(input, key) {
        None => Ok(None),
        Some(Value::Bool(flag)) => Ok(Some(*flag)),
        Some(Value::String(text)) => match text.trim() {
            "true" => Ok(Some(true)),
            "false" => Ok(Some(false)),
            _ => Err(ValidationError::invalid(key, "expected true or false")),
        },
        Some(_) => Err(ValidationError::invalid(key, "expected true or false")),
    }
}

// ============================================================================
// SECTION: Identifiers
// ============================================================================

/// Returns a required positive record key.
///
/// # Errors
///
/// Returns [`ValidationError`] when the key is absent or not positive.
pub fn required_record_id(
    input: &FieldMap,
    key: &'static str,
) -> Result<RecordId, ValidationError> {
    let value = integer(input, key)?.ok_or_else(|| ValidationError::Missing(vec![key]))?;
    RecordId::new(value).ok_or_else(|| ValidationError::invalid(key, "must be a positive id"))
}

/// Returns an optional record key; absent, zero, and negative keys map to none.
///
/// # Errors
///
/// Returns [`ValidationError::Invalid`] when the key is not an integer.
pub fn optional_record_id(
    input: &FieldMap,
    key: &'static str,
) -> Result<Option<RecordId>, ValidationError> {
    Ok(integer(input, key)?.and_then(RecordId::new))
}

// ============================================================================
// SECTION: Calendar
// ============================================================================

/// Returns a normalized `YYYY-MM-DD` date.
///
/// # Errors
///
/// Returns [`ValidationError::Invalid`] when the date does not parse.
pub fn date(input: &FieldMap, key: &'static str) -> Result<Option<String>, ValidationError> {
    text(input, key)
        .map(|value| {
            normalize_date(&value)
                .ok_or_else(|| ValidationError::invalid(key, "expected YYYY-MM-DD"))
        })
        .transpose()
}

/// Returns a normalized `HH:MM` time.
///
/// # Errors
///
/// Returns [`ValidationError::Invalid`] when the time does not parse.
pub fn clock(input: &FieldMap, key: &'static str) -> Result<Option<String>, ValidationError> {
    text(input, key)
        .map(|value| {
            normalize_clock(&value).ok_or_else(|| ValidationError::invalid(key, "expected HH:MM"))
        })
        .transpose()
}

// ============================================================================
// SECTION: Builders
// ============================================================================

/// Inserts a value when present.
pub fn put(map: &mut FieldMap, key: &str, value: Option<impl Into<Value>>) {
    if let Some(value) = value {
        map.insert(key.to_string(), value.into());
    }
}

/// Returns the default fields for a new entity, or nothing for an update.
#[must_use]
pub fn defaults(mode: WriteMode, defaults: Value) -> FieldMap {
    match (mode, defaults) {
        (WriteMode::Create, Value::Object(map)) => map,
        _ => FieldMap::new(),
    }
}
