//! In-process ledger store.

use super::{
    AccountRef, EntityType, EntryUpdate, LedgerEntry, LedgerStore, NewLedgerEntry, StoreError,
};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

type ChargeKey = (String, String);

/// Thread-safe in-memory [`LedgerStore`].
///
/// Enforces the `(plugin id, charge key)` uniqueness constraint the way a
/// database unique index would: a second `create` for the same key fails
/// with `StoreError::Conflict`. Entity accounts are created on first use.
#[derive(Default)]
pub struct InMemoryLedgerStore {
    entries: DashMap<Uuid, LedgerEntry>,
    keys: DashMap<ChargeKey, Uuid>,
    accounts: DashMap<(EntityType, Uuid, Uuid), AccountRef>,
    unavailable: AtomicBool,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `StoreError::Unavailable`.
    ///
    /// Lets callers exercise their outage handling without a real backend.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of stored entries.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Number of entity accounts created so far.
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Snapshot of every stored entry, ordered by plugin id then charge key.
    pub fn all_entries(&self) -> Vec<LedgerEntry> {
        let mut entries: Vec<LedgerEntry> =
            self.entries.iter().map(|e| e.value().clone()).collect();
        entries.sort_by(|a, b| {
            (a.plugin_id.as_str(), a.charge_key.as_str())
                .cmp(&(b.plugin_id.as_str(), b.charge_key.as_str()))
        });
        entries
    }

    /// Overwrite a stored entry as-is, bypassing the engine.
    ///
    /// Simulates out-of-band edits (manual corrections, imports) so drift
    /// detection can be exercised.
    pub fn overwrite(&self, entry: LedgerEntry) -> Result<(), StoreError> {
        match self.entries.get_mut(&entry.id) {
            Some(mut slot) => {
                *slot = entry;
                Ok(())
            }
            None => Err(StoreError::NotFound(entry.id)),
        }
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "in-memory store marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn get_by_key(
        &self,
        plugin_id: &str,
        charge_key: &str,
    ) -> Result<Option<LedgerEntry>, StoreError> {
        self.check_available()?;
        let id = match self.keys.get(&(plugin_id.to_string(), charge_key.to_string())) {
            Some(id) => *id,
            None => return Ok(None),
        };
        Ok(self.entries.get(&id).map(|e| e.value().clone()))
    }

    async fn create(&self, entry: NewLedgerEntry) -> Result<LedgerEntry, StoreError> {
        self.check_available()?;
        let key = (entry.plugin_id.clone(), entry.charge_key.clone());

        // The key shard stays locked until the entry is inserted.
        match self.keys.entry(key) {
            Entry::Occupied(_) => Err(StoreError::Conflict {
                plugin_id: entry.plugin_id,
                charge_key: entry.charge_key,
            }),
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let stored = LedgerEntry {
                    id: Uuid::new_v4(),
                    plugin_id: entry.plugin_id,
                    charge_key: entry.charge_key,
                    account: entry.account,
                    amount: entry.amount,
                    memo: entry.memo,
                    reference_type: entry.reference_type,
                    reference_id: entry.reference_id,
                    transaction_date: entry.transaction_date,
                    metadata: entry.metadata,
                    created_at: now,
                    updated_at: now,
                };
                self.entries.insert(stored.id, stored.clone());
                slot.insert(stored.id);
                Ok(stored)
            }
        }
    }

    async fn update(&self, id: Uuid, update: EntryUpdate) -> Result<LedgerEntry, StoreError> {
        self.check_available()?;
        let mut entry = self.entries.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        entry.amount = update.amount;
        entry.memo = update.memo;
        entry.reference_type = update.reference_type;
        entry.reference_id = update.reference_id;
        entry.transaction_date = update.transaction_date;
        entry.metadata = update.metadata;
        entry.updated_at = Utc::now();
        Ok(entry.value().clone())
    }

    async fn delete_by_key(&self, plugin_id: &str, charge_key: &str) -> Result<bool, StoreError> {
        self.check_available()?;
        match self
            .keys
            .remove(&(plugin_id.to_string(), charge_key.to_string()))
        {
            Some((_, id)) => {
                self.entries.remove(&id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn resolve_account(
        &self,
        entity_type: EntityType,
        entity_id: Uuid,
        account_id: Uuid,
    ) -> Result<AccountRef, StoreError> {
        self.check_available()?;
        let account = self
            .accounts
            .entry((entity_type, entity_id, account_id))
            .or_insert_with(|| AccountRef {
                id: Uuid::new_v4(),
                account_id,
                entity_type,
                entity_id,
            });
        Ok(account.value().clone())
    }

    async fn list_by_plugin(&self, plugin_id: &str) -> Result<Vec<LedgerEntry>, StoreError> {
        self.check_available()?;
        Ok(self
            .all_entries()
            .into_iter()
            .filter(|e| e.plugin_id == plugin_id)
            .collect())
    }
}
