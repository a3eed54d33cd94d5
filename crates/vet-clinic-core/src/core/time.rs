// crates/vet-clinic-core/src/core/time.rs
// ============================================================================
// Module: Vet Clinic Time Helpers
// Description: Wall-clock stamps and calendar value parsing.
// Purpose: Keep timestamp and date formats consistent across both stores.
// Dependencies: time
// ============================================================================

//! ## Overview
//! Audit timestamps are RFC 3339 strings in UTC. Appointment dates use
//! `YYYY-MM-DD` and clock times `HH:MM`; parsing normalizes accepted input to
//! those canonical forms.

// ============================================================================
// SECTION: Imports
// ============================================================================

use time::Date;
use time::Duration;
use time::OffsetDateTime;
use time::Time;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;

// ============================================================================
// SECTION: Timestamps
// ============================================================================

/// Returns the current UTC time as an RFC 3339 string.
#[must_use]
pub fn now_rfc3339() -> String {
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default()
}

// ============================================================================
// SECTION: Calendar Values
// ============================================================================

/// Parses a `YYYY-MM-DD` date and returns its canonical rendering.
#[must_use]
pub fn normalize_date(value: &str) -> Option<String> {
    let format = format_description!("[year]-[month]-[day]");
    let date = Date::parse(value.trim(), format).ok()?;
    date.format(format).ok()
}

/// Parses an `HH:MM` or `HH:MM:SS` clock time and returns `HH:MM`.
#[must_use]
pub fn normalize_clock(value: &str) -> Option<String> {
    let trimmed = value.trim();
    let short = format_description!("[hour]:[minute]");
    let long = format_description!("[hour]:[minute]:[second]");
    let time = Time::parse(trimmed, short).or_else(|_| Time::parse(trimmed, long)).ok()?;
    time.format(short).ok()
}

/// Returns today's UTC date as `YYYY-MM-DD`.
#[must_use]
pub fn today() -> String {
    days_from_today(0)
}

/// Returns the UTC date `days` from today as `YYYY-MM-DD`.
///
/// Saturates at the calendar bounds the `time` crate supports.
#[must_use]
pub fn days_from_today(days: i64) -> String {
    let format = format_description!("[year]-[month]-[day]");
    let today = OffsetDateTime::now_utc().date();
    let date = today.checked_add(Duration::days(days)).unwrap_or(today);
    date.format(format).unwrap_or_default()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
