//! Ledger store collaborator.
//!
//! The engine decides what a ledger entry should contain; physical storage
//! belongs to an implementation of [`LedgerStore`]. Every store must enforce
//! at most one entry per `(plugin id, charge key)`.

mod error;
mod memory;

pub use error::StoreError;
pub use memory::InMemoryLedgerStore;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Kind of entity that owns a ledger account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Employer,
    Worker,
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityType::Employer => f.write_str("employer"),
            EntityType::Worker => f.write_str("worker"),
        }
    }
}

/// An entity account: one entity's balance within one ledger account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRef {
    /// Entity account id
    pub id: Uuid,
    /// Ledger account the entity account belongs to
    pub account_id: Uuid,
    pub entity_type: EntityType,
    pub entity_id: Uuid,
}

/// Type of the source record a ledger entry was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceType {
    WorkerHours,
    WorkerMonthlyBenefit,
}

impl fmt::Display for ReferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceType::WorkerHours => f.write_str("worker_hours"),
            ReferenceType::WorkerMonthlyBenefit => f.write_str("worker_monthly_benefit"),
        }
    }
}

/// A persisted ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: Uuid,
    pub plugin_id: String,
    pub charge_key: String,
    pub account: AccountRef,
    pub amount: Decimal,
    pub memo: String,
    pub reference_type: ReferenceType,
    pub reference_id: Uuid,
    pub transaction_date: NaiveDate,
    /// Everything needed to recompute this entry without live source data
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields of an entry to be created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLedgerEntry {
    pub plugin_id: String,
    pub charge_key: String,
    pub account: AccountRef,
    pub amount: Decimal,
    pub memo: String,
    pub reference_type: ReferenceType,
    pub reference_id: Uuid,
    pub transaction_date: NaiveDate,
    pub metadata: serde_json::Value,
}

/// Replacement values for the mutable fields of an existing entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryUpdate {
    pub amount: Decimal,
    pub memo: String,
    pub reference_type: ReferenceType,
    pub reference_id: Uuid,
    pub transaction_date: NaiveDate,
    pub metadata: serde_json::Value,
}

impl From<&NewLedgerEntry> for EntryUpdate {
    fn from(entry: &NewLedgerEntry) -> Self {
        Self {
            amount: entry.amount,
            memo: entry.memo.clone(),
            reference_type: entry.reference_type,
            reference_id: entry.reference_id,
            transaction_date: entry.transaction_date,
            metadata: entry.metadata.clone(),
        }
    }
}

/// A mutation a plugin asks its caller to persist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum LedgerTransaction {
    Create(NewLedgerEntry),
    Update {
        #[serde(rename = "entryId")]
        entry_id: Uuid,
        #[serde(rename = "chargeKey")]
        charge_key: String,
        update: EntryUpdate,
    },
    Delete {
        #[serde(rename = "pluginId")]
        plugin_id: String,
        #[serde(rename = "chargeKey")]
        charge_key: String,
    },
}

impl LedgerTransaction {
    /// Short operation name for logs and metrics labels.
    pub fn op(&self) -> &'static str {
        match self {
            LedgerTransaction::Create(_) => "create",
            LedgerTransaction::Update { .. } => "update",
            LedgerTransaction::Delete { .. } => "delete",
        }
    }

    pub fn charge_key(&self) -> &str {
        match self {
            LedgerTransaction::Create(entry) => &entry.charge_key,
            LedgerTransaction::Update { charge_key, .. } => charge_key,
            LedgerTransaction::Delete { charge_key, .. } => charge_key,
        }
    }
}

/// Storage backend for ledger entries.
///
/// Every call is an await point; callers must not assume two calls happen
/// atomically with each other.
#[async_trait]
pub trait LedgerStore: Send + Sync + 'static {
    /// Look up the single entry owned by `(plugin_id, charge_key)`.
    async fn get_by_key(
        &self,
        plugin_id: &str,
        charge_key: &str,
    ) -> Result<Option<LedgerEntry>, StoreError>;

    /// Insert a new entry.
    ///
    /// Returns `StoreError::Conflict` if an entry already exists for the
    /// same `(plugin_id, charge_key)`.
    async fn create(&self, entry: NewLedgerEntry) -> Result<LedgerEntry, StoreError>;

    /// Replace the mutable fields of entry `id`.
    async fn update(&self, id: Uuid, update: EntryUpdate) -> Result<LedgerEntry, StoreError>;

    /// Delete the entry owned by `(plugin_id, charge_key)`.
    ///
    /// Returns whether an entry was removed.
    async fn delete_by_key(&self, plugin_id: &str, charge_key: &str) -> Result<bool, StoreError>;

    /// Get or create the entity account for `entity` within `account_id`.
    async fn resolve_account(
        &self,
        entity_type: EntityType,
        entity_id: Uuid,
        account_id: Uuid,
    ) -> Result<AccountRef, StoreError>;

    /// All entries written by `plugin_id`, ordered by charge key.
    async fn list_by_plugin(&self, plugin_id: &str) -> Result<Vec<LedgerEntry>, StoreError>;
}
