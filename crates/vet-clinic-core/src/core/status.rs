// crates/vet-clinic-core/src/core/status.rs
// ============================================================================
// Module: Vet Clinic Status Enums
// Description: Enumerated status and category values stored by entities.
// Purpose: Keep the closed value sets in one place with stable string forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Status values are persisted as lowercase strings in both stores. Each enum
//! exposes `as_str` for storage and `parse` for validating caller input.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Appointment Status
// ============================================================================

/// Relational appointment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    /// Booked, awaiting confirmation.
    Scheduled,
    /// Confirmed by the clinic.
    Confirmed,
    /// Cancelled; also the soft-delete state.
    Cancelled,
    /// Visit took place.
    Completed,
}

impl AppointmentStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [Self; 4] = [Self::Scheduled, Self::Confirmed, Self::Cancelled, Self::Completed];
    /// Stored values, in lifecycle order.
    pub const NAMES: [&'static str; 4] = ["scheduled", "confirmed", "cancelled", "completed"];

    /// Returns the stored string value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }

    /// Parses a stored string value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == value.trim())
    }

    /// Returns the document workflow status mirrored for this status.
    #[must_use]
    pub const fn workflow(self) -> WorkflowStatus {
        match self {
            Self::Scheduled => WorkflowStatus::Pending,
            Self::Confirmed => WorkflowStatus::Confirmed,
            Self::Cancelled => WorkflowStatus::Cancelled,
            Self::Completed => WorkflowStatus::Completed,
        }
    }
}

// ============================================================================
// SECTION: Workflow Status
// ============================================================================

/// Document-side workflow status for appointments and reservations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    /// Awaiting action.
    Pending,
    /// Confirmed.
    Confirmed,
    /// Cancelled.
    Cancelled,
    /// Completed.
    Completed,
}

impl WorkflowStatus {
    /// All workflow statuses.
    pub const ALL: [Self; 4] = [Self::Pending, Self::Confirmed, Self::Cancelled, Self::Completed];
    /// Stored values.
    pub const NAMES: [&'static str; 4] = ["pending", "confirmed", "cancelled", "completed"];

    /// Returns the stored string value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }

    /// Parses a stored string value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == value.trim())
    }
}

// ============================================================================
// SECTION: Record Status
// ============================================================================

/// Active/inactive flag for catalog and directory records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// Live record.
    Active,
    /// Soft-deleted record.
    Inactive,
}

impl RecordStatus {
    /// Stored values.
    pub const NAMES: [&'static str; 2] = ["active", "inactive"];

    /// Returns the stored string value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }

    /// Parses a stored string value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Categories
// ============================================================================

/// Feedback category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackCategory {
    /// Feedback about a clinic service.
    Service,
    /// Feedback about a product.
    Product,
    /// Feedback about staff care.
    Care,
    /// Anything else.
    Other,
}

impl FeedbackCategory {
    /// Returns the stored string value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Service => "service",
            Self::Product => "product",
            Self::Care => "care",
            Self::Other => "other",
        }
    }

    /// Parses a stored string value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "service" => Some(Self::Service),
            "product" => Some(Self::Product),
            "care" => Some(Self::Care),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

/// Preferred contact channel for an owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactPreference {
    /// Phone call.
    Call,
    /// Messaging app.
    Whatsapp,
    /// Email.
    Email,
}

impl ContactPreference {
    /// Returns the stored string value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Whatsapp => "whatsapp",
            Self::Email => "email",
        }
    }

    /// Parses a stored string value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "call" => Some(Self::Call),
            "whatsapp" => Some(Self::Whatsapp),
            "email" => Some(Self::Email),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Payments
// ============================================================================

/// How a payment was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash at the desk.
    Cash,
    /// Debit or credit card.
    Card,
    /// Bank transfer.
    Transfer,
    /// Anything else.
    Other,
}

impl PaymentMethod {
    /// All methods.
    pub const ALL: [Self; 4] = [Self::Cash, Self::Card, Self::Transfer, Self::Other];
    /// Stored values.
    pub const NAMES: [&'static str; 4] = ["cash", "card", "transfer", "other"];

    /// Returns the stored string value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Card => "card",
            Self::Transfer => "transfer",
            Self::Other => "other",
        }
    }

    /// Parses a stored string value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|method| method.as_str() == value.trim())
    }
}

/// Settlement state of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Not yet settled.
    Pending,
    /// Settled; the state of a newly recorded payment.
    Completed,
    /// Voided.
    Cancelled,
    /// Returned to the client.
    Refunded,
}

impl PaymentStatus {
    /// All statuses.
    pub const ALL: [Self; 4] = [Self::Pending, Self::Completed, Self::Cancelled, Self::Refunded];
    /// Stored values.
    pub const NAMES: [&'static str; 4] = ["pending", "completed", "cancelled", "refunded"];

    /// Returns the stored string value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        }
    }

    /// Parses a stored string value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == value.trim())
    }
}

// ============================================================================
// SECTION: Promotions
// ============================================================================

/// Lifecycle state of a promotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromotionStatus {
    /// Redeemable while inside its date window.
    Active,
    /// Withdrawn; also the soft-delete state.
    Inactive,
    /// Temporarily suspended.
    Paused,
    /// Past its end date.
    Expired,
}

impl PromotionStatus {
    /// All statuses.
    pub const ALL: [Self; 4] = [Self::Active, Self::Inactive, Self::Paused, Self::Expired];
    /// Stored values.
    pub const NAMES: [&'static str; 4] = ["active", "inactive", "paused", "expired"];

    /// Returns the stored string value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Paused => "paused",
            Self::Expired => "expired",
        }
    }

    /// Parses a stored string value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == value.trim())
    }
}

/// How a promotion's discount applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// Percentage of the price.
    Percentage,
    /// Fixed amount off the price.
    FixedAmount,
}

impl DiscountType {
    /// Returns the stored string value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::FixedAmount => "fixed_amount",
        }
    }

    /// Parses a stored string value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "percentage" => Some(Self::Percentage),
            "fixed_amount" => Some(Self::FixedAmount),
            _ => None,
        }
    }
}
