// crates/vet-clinic-core/src/runtime/directory.rs
// ============================================================================
// Module: Relational Directory
// Description: Create, read, update, and status changes for relational-only records.
// Purpose: Manage clients, pets, staff, payments, and promotions.
// Dependencies: crate::{core, entities, interfaces, runtime}, tracing
// ============================================================================

//! ## Overview
//! Directory records have no document side, so writes are a single retried
//! relational statement. Encryption and read-side decryption follow the same
//! rules as the dual-write coordinator. Only payments and promotions accept
//! updates; every kind accepts status changes within its own value set.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::core::FieldMap;
use crate::core::PRIMARY_KEY;
use crate::core::PaymentStatus;
use crate::core::PromotionStatus;
use crate::core::RecordId;
use crate::core::RecordStatus;
use crate::core::TableSpec;
use crate::core::time::days_from_today;
use crate::core::time::now_rfc3339;
use crate::core::time::today;
use crate::entities::ListParam;
use crate::entities::Reference;
use crate::entities::ValidationError;
use crate::entities::WriteMode;
use crate::entities::appointment::APPOINTMENTS;
use crate::entities::directory::CLIENTS;
use crate::entities::directory::PERSON_PARAMS;
use crate::entities::directory::PETS;
use crate::entities::directory::PET_PARAMS;
use crate::entities::directory::STAFF;
use crate::entities::directory::directory_row;
use crate::entities::payment::PAYMENTS;
use crate::entities::payment::PAYMENT_PARAMS;
use crate::entities::payment::payment_row;
use crate::entities::promotion::PROMOTIONS;
use crate::entities::promotion::PROMOTION_PARAMS;
use crate::entities::promotion::promotion_row;
use crate::interfaces::FieldCipher;
use crate::interfaces::Filter;
use crate::interfaces::RelationalStore;
use crate::interfaces::SelectQuery;
use crate::runtime::cipher::decrypt_columns;
use crate::runtime::cipher::encrypt_columns;
use crate::runtime::coordinator::CoordinatorError;
use crate::runtime::coordinator::ensure_references;
use crate::runtime::coordinator::stamp;
use crate::runtime::retry::RetryPolicy;
use crate::runtime::retry::with_retry;

// ============================================================================
// SECTION: Kinds
// ============================================================================

/// Directory record kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryKind {
    /// Clinic client.
    Client,
    /// Client pet.
    Pet,
    /// Staff member.
    Staff,
    /// Payment against an appointment.
    Payment,
    /// Dated promotion.
    Promotion,
}

impl DirectoryKind {
    /// All directory kinds.
    pub const ALL: [Self; 5] =
        [Self::Client, Self::Pet, Self::Staff, Self::Payment, Self::Promotion];

    /// Returns the backing table.
    #[must_use]
    pub const fn table(self) -> &'static TableSpec {
        match self {
            Self::Client => &CLIENTS,
            Self::Pet => &PETS,
            Self::Staff => &STAFF,
            Self::Payment => &PAYMENTS,
            Self::Promotion => &PROMOTIONS,
        }
    }

    /// Returns the label used in messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Pet => "pet",
            Self::Staff => "staff",
            Self::Payment => "payment",
            Self::Promotion => "promotion",
        }
    }

    /// Returns true for kinds whose records can be rewritten and retired.
    #[must_use]
    pub const fn accepts_updates(self) -> bool {
        matches!(self, Self::Payment | Self::Promotion)
    }

    /// Returns the list filters the kind accepts.
    #[must_use]
    pub const fn list_params(self) -> &'static [ListParam] {
        match self {
            Self::Client | Self::Staff => &PERSON_PARAMS,
            Self::Pet => &PET_PARAMS,
            Self::Payment => &PAYMENT_PARAMS,
            Self::Promotion => &PROMOTION_PARAMS,
        }
    }

    /// Returns the values the status column accepts.
    #[must_use]
    pub const fn statuses(self) -> &'static [&'static str] {
        match self {
            Self::Client | Self::Pet | Self::Staff => &RecordStatus::NAMES,
            Self::Payment => &PaymentStatus::NAMES,
            Self::Promotion => &PromotionStatus::NAMES,
        }
    }

    /// Validates input and builds the row plus its references.
    fn row(
        self,
        input: &FieldMap,
        mode: WriteMode,
    ) -> Result<(FieldMap, Vec<Reference>), ValidationError> {
        match (self, mode) {
            (Self::Payment, _) => payment_row(input, mode),
            (Self::Promotion, _) => Ok((promotion_row(input, mode)?, Vec::new())),
            (_, WriteMode::Create) => directory_row(self.table(), input),
            (_, WriteMode::Update) => Err(ValidationError::invalid(
                "id",
                format!("{} records cannot be updated", self.label()),
            )),
        }
    }
}

// ============================================================================
// SECTION: Directory
// ============================================================================

/// Relational-only directory service.
#[derive(Clone)]
pub struct RelationalDirectory {
    /// Relational store handle.
    relational: Arc<dyn RelationalStore>,
    /// Field cipher for PII columns.
    cipher: Arc<dyn FieldCipher>,
    /// Retry policy for store calls.
    retry: RetryPolicy,
}

impl RelationalDirectory {
    /// Creates a directory over the relational store.
    #[must_use]
    pub fn new(
        relational: Arc<dyn RelationalStore>,
        cipher: Arc<dyn FieldCipher>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            relational,
            cipher,
            retry,
        }
    }

    /// Creates a directory record and returns it in plaintext.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError`] when validation, references, or storage fail.
    pub async fn create(
        &self,
        kind: DirectoryKind,
        input: FieldMap,
    ) -> Result<FieldMap, CoordinatorError> {
        let table = kind.table();
        let (mut row, references) = kind.row(&input, WriteMode::Create)?;
        ensure_references(self.relational.as_ref(), self.retry, references).await?;
        stamp(table, &mut row, &now_rfc3339(), WriteMode::Create);
        let plaintext = row.clone();
        encrypt_columns(self.cipher.as_ref(), table, &mut row)?;
        let inserted = with_retry(self.retry, || self.relational.insert(table, row.clone())).await?;
        let Some(id) = inserted else {
            return Err(CoordinatorError::MissingIdentifier {
                entity: kind.label(),
            });
        };
        info!(entity = kind.label(), id = id.get(), "directory record created");
        let mut record = table.render(plaintext);
        record.insert(PRIMARY_KEY.to_string(), Value::from(id.get()));
        Ok(record)
    }

    /// Fetches one directory record.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::NotFound`] when the record is missing.
    pub async fn get(
        &self,
        kind: DirectoryKind,
        id: RecordId,
    ) -> Result<FieldMap, CoordinatorError> {
        let table = kind.table();
        let rows =
            with_retry(self.retry, || self.relational.select(table, SelectQuery::by_id(id))).await?;
        rows.into_iter().next().map(|row| self.render(table, row)).ok_or(
            CoordinatorError::NotFound {
                entity: kind.label(),
                id,
            },
        )
    }

    /// Lists directory records matching the filters, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError`] when the store read fails.
    pub async fn list(
        &self,
        kind: DirectoryKind,
        filters: Vec<Filter>,
    ) -> Result<Vec<FieldMap>, CoordinatorError> {
        let query = SelectQuery {
            filters,
            ..SelectQuery::default()
        }
        .order_by(PRIMARY_KEY, true);
        self.select(kind, query).await
    }

    /// Rewrites a payment or promotion and returns it as stored.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Validation`] for kinds that cannot be
    /// updated or malformed input, and [`CoordinatorError::NotFound`] when the
    /// record is missing.
    pub async fn update(
        &self,
        kind: DirectoryKind,
        id: RecordId,
        input: FieldMap,
    ) -> Result<FieldMap, CoordinatorError> {
        let table = kind.table();
        let (mut row, references) = kind.row(&input, WriteMode::Update)?;
        ensure_references(self.relational.as_ref(), self.retry, references).await?;
        stamp(table, &mut row, &now_rfc3339(), WriteMode::Update);
        encrypt_columns(self.cipher.as_ref(), table, &mut row)?;
        self.write(kind, id, row).await?;
        info!(entity = kind.label(), id = id.get(), "directory record updated");
        self.get(kind, id).await
    }

    /// Moves a record to another status within its kind's value set.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Validation`] for an unknown status and
    /// [`CoordinatorError::NotFound`] when the record is missing.
    pub async fn set_status(
        &self,
        kind: DirectoryKind,
        id: RecordId,
        status: &str,
    ) -> Result<FieldMap, CoordinatorError> {
        let status = status.trim();
        if !kind.statuses().contains(&status) {
            return Err(ValidationError::invalid(
                "status",
                format!("expected one of {}", kind.statuses().join(", ")),
            )
            .into());
        }
        let table = kind.table();
        let mut row = FieldMap::new();
        row.insert("status".to_string(), Value::from(status));
        stamp(table, &mut row, &now_rfc3339(), WriteMode::Update);
        self.write(kind, id, row).await?;
        info!(entity = kind.label(), id = id.get(), status, "directory status changed");
        self.get(kind, id).await
    }

    /// Soft-deletes a record by moving it to its retired status.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::NotFound`] when the record is missing.
    pub async fn retire(&self, kind: DirectoryKind, id: RecordId) -> Result<(), CoordinatorError> {
        if let Some(status) = kind.table().status {
            self.set_status(kind, id, status.retired).await?;
        }
        Ok(())
    }

    /// Lists the payments of every appointment the client booked, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError`] when a store read fails.
    pub async fn payments_for_client(
        &self,
        client: RecordId,
    ) -> Result<Vec<FieldMap>, CoordinatorError> {
        let appointments = SelectQuery::default().filter(Filter::eq("client_id", client.get()));
        let appointments =
            with_retry(self.retry, || self.relational.select(&APPOINTMENTS, appointments.clone()))
                .await?;
        let keys = appointments
            .iter()
            .filter_map(|row| row.get(PRIMARY_KEY).cloned())
            .collect::<Vec<_>>();
        self.list(DirectoryKind::Payment, vec![Filter::any_of("appointment_id", keys)]).await
    }

    /// Lists active promotions whose window contains today, ending soonest first.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError`] when the store read fails.
    pub async fn active_promotions(&self) -> Result<Vec<FieldMap>, CoordinatorError> {
        let today = today();
        let query = SelectQuery::default()
            .filter(Filter::eq("status", PromotionStatus::Active.as_str()))
            .filter(Filter::at_most("start_date", today.clone()))
            .filter(Filter::at_least("end_date", today))
            .order_by("end_date", false);
        self.select(DirectoryKind::Promotion, query).await
    }

    /// Lists active promotions ending within `days` from today, ending soonest first.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError`] when the store read fails.
    pub async fn expiring_promotions(&self, days: i64) -> Result<Vec<FieldMap>, CoordinatorError> {
        let query = SelectQuery::default()
            .filter(Filter::eq("status", PromotionStatus::Active.as_str()))
            .filter(Filter::at_least("end_date", today()))
            .filter(Filter::at_most("end_date", days_from_today(days)))
            .order_by("end_date", false);
        self.select(DirectoryKind::Promotion, query).await
    }

    /// Finds the active, in-window promotion carrying the code.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError`] when the store read fails.
    pub async fn redeemable_promotion(
        &self,
        code: &str,
    ) -> Result<Option<FieldMap>, CoordinatorError> {
        let today = today();
        let query = SelectQuery::default()
            .filter(Filter::eq("code", code))
            .filter(Filter::eq("status", PromotionStatus::Active.as_str()))
            .filter(Filter::at_most("start_date", today.clone()))
            .filter(Filter::at_least("end_date", today))
            .limit(1);
        Ok(self.select(DirectoryKind::Promotion, query).await?.into_iter().next())
    }

    /// Runs a select and renders every row.
    async fn select(
        &self,
        kind: DirectoryKind,
        query: SelectQuery,
    ) -> Result<Vec<FieldMap>, CoordinatorError> {
        let table = kind.table();
        let rows = with_retry(self.retry, || self.relational.select(table, query.clone())).await?;
        Ok(rows.into_iter().map(|row| self.render(table, row)).collect())
    }

    /// Retried relational update; a missing row maps to not found.
    async fn write(
        &self,
        kind: DirectoryKind,
        id: RecordId,
        row: FieldMap,
    ) -> Result<(), CoordinatorError> {
        let table = kind.table();
        let updated =
            with_retry(self.retry, || self.relational.update(table, id, row.clone())).await?;
        if updated {
            Ok(())
        } else {
            Err(CoordinatorError::NotFound {
                entity: kind.label(),
                id,
            })
        }
    }

    /// Decrypts and renames a stored row.
    fn render(&self, table: &TableSpec, mut row: FieldMap) -> FieldMap {
        decrypt_columns(self.cipher.as_ref(), table, &mut row);
        table.render(row)
    }
}
