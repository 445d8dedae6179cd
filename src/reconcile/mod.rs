//! Reconciliation driver.
//!
//! Diffs what a plugin expects to exist against what the ledger holds and
//! emits the single corrective transaction, if any:
//!
//! | expected \ existing | absent  | present        |
//! |---------------------|---------|----------------|
//! | absent              | no-op   | delete         |
//! | present             | create  | update / no-op |
//!
//! The decision is a pure function of its inputs, so re-running it against
//! unchanged inputs and unchanged storage always lands on no-op.

use crate::ledger::{
    AccountRef, EntryUpdate, LedgerEntry, LedgerTransaction, NewLedgerEntry, ReferenceType,
};
use crate::plugin::{
    ExecutionResult, Notification, NotificationKind, PluginConfig, PluginError, PluginMetadata,
};
use crate::trigger::TriggerContext;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::future::Future;
use uuid::Uuid;

/// The ledger entry a plugin believes should exist right now.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpectedEntry {
    pub charge_key: String,
    pub amount: Decimal,
    pub description: String,
    pub transaction_date: NaiveDate,
    pub account: AccountRef,
    pub reference_type: ReferenceType,
    pub reference_id: Uuid,
    pub metadata: serde_json::Value,
}

impl ExpectedEntry {
    pub fn to_new_entry(&self, plugin_id: &str) -> NewLedgerEntry {
        NewLedgerEntry {
            plugin_id: plugin_id.to_string(),
            charge_key: self.charge_key.clone(),
            account: self.account.clone(),
            amount: self.amount,
            memo: self.description.clone(),
            reference_type: self.reference_type,
            reference_id: self.reference_id,
            transaction_date: self.transaction_date,
            metadata: self.metadata.clone(),
        }
    }

    pub fn to_update(&self) -> EntryUpdate {
        EntryUpdate {
            amount: self.amount,
            memo: self.description.clone(),
            reference_type: self.reference_type,
            reference_id: self.reference_id,
            transaction_date: self.transaction_date,
            metadata: self.metadata.clone(),
        }
    }

    /// Names of the compared fields that differ from `entry`.
    pub fn changed_fields(&self, entry: &LedgerEntry) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if self.amount != entry.amount {
            changed.push("amount");
        }
        if self.description != entry.memo {
            changed.push("description");
        }
        if self.reference_type != entry.reference_type {
            changed.push("reference type");
        }
        if self.reference_id != entry.reference_id {
            changed.push("reference id");
        }
        if self.metadata != entry.metadata {
            changed.push("metadata");
        }
        changed
    }
}

/// What a plugin concluded for one event.
#[derive(Debug, Clone, PartialEq)]
pub enum Expectation {
    /// A charge should exist with exactly these values.
    Charge(ExpectedEntry),
    /// No charge is justified for this key; an existing entry is stale.
    NoCharge(String),
    /// The event is outside this config's concern. Never touches storage,
    /// whatever exists under the key.
    NotApplicable(String),
}

/// Metadata stored on every entry so it can be recomputed later without
/// reading live source data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeMetadata {
    pub config_id: String,
    pub trigger: TriggerContext,
    pub rate: Decimal,
    pub rate_effective_date: NaiveDate,
}

impl ChargeMetadata {
    pub fn to_value(&self) -> Result<serde_json::Value, PluginError> {
        serde_json::to_value(self).map_err(|e| PluginError::InvalidMetadata(e.to_string()))
    }

    pub fn from_entry(entry: &LedgerEntry) -> Result<Self, PluginError> {
        serde_json::from_value(entry.metadata.clone())
            .map_err(|e| PluginError::InvalidMetadata(format!("entry {}: {}", entry.id, e)))
    }
}

/// Whether `entry` was written for the source record `reference_id`.
pub fn references(entry: &LedgerEntry, reference_type: ReferenceType, reference_id: Uuid) -> bool {
    entry.reference_type == reference_type && entry.reference_id == reference_id
}

/// Narrow a record-level outcome to the entry that record owns.
///
/// A deleted record only removes an entry it wrote; an entry another record
/// wrote under the same key is left alone. A record that stops applying to
/// the config still removes the entry it wrote earlier.
pub fn scope_to_record(
    expectation: Expectation,
    existing: Option<&LedgerEntry>,
    reference_type: ReferenceType,
    reference_id: Uuid,
    record_deleted: bool,
) -> Expectation {
    let Some(entry) = existing else {
        return expectation;
    };
    let owned = references(entry, reference_type, reference_id);
    match expectation {
        Expectation::NoCharge(reason) if record_deleted && !owned => Expectation::NotApplicable(
            format!("{}; charge belongs to {} {}", reason, entry.reference_type, entry.reference_id),
        ),
        Expectation::NotApplicable(reason) if owned => Expectation::NoCharge(reason),
        other => other,
    }
}

/// Format an amount for notifications, e.g. `$12.00`.
pub fn format_amount(amount: Decimal) -> String {
    format!("${:.2}", amount)
}

/// Decide the corrective transaction for one charge key.
pub fn reconcile(
    plugin_id: &str,
    charge_key: &str,
    expectation: Expectation,
    existing: Option<&LedgerEntry>,
) -> ExecutionResult {
    match (expectation, existing) {
        (Expectation::Charge(expected), None) => {
            tracing::debug!(plugin_id, charge_key, amount = %expected.amount, "Creating charge");
            let notification = Notification {
                kind: NotificationKind::Created,
                charge_key: charge_key.to_string(),
                message: format!(
                    "Created charge of {}: {}",
                    format_amount(expected.amount),
                    expected.description
                ),
                amount: expected.amount,
                previous_amount: None,
            };
            ExecutionResult::change(
                LedgerTransaction::Create(expected.to_new_entry(plugin_id)),
                notification,
            )
        }
        (Expectation::Charge(expected), Some(entry)) => {
            let changed = expected.changed_fields(entry);
            if changed.is_empty() {
                return ExecutionResult::noop(format!("Charge {} is up to date", charge_key));
            }
            tracing::debug!(plugin_id, charge_key, fields = ?changed, "Updating charge");

            let amount_changed = expected.amount != entry.amount;
            let message = if amount_changed {
                format!(
                    "Updated charge: {} → {} ({})",
                    format_amount(entry.amount),
                    format_amount(expected.amount),
                    expected.description
                )
            } else {
                format!(
                    "Updated charge {}: {}",
                    changed.join(", "),
                    expected.description
                )
            };
            let notification = Notification {
                kind: NotificationKind::Updated,
                charge_key: charge_key.to_string(),
                message,
                amount: expected.amount,
                previous_amount: amount_changed.then_some(entry.amount),
            };
            ExecutionResult::change(
                LedgerTransaction::Update {
                    entry_id: entry.id,
                    charge_key: charge_key.to_string(),
                    update: expected.to_update(),
                },
                notification,
            )
        }
        (Expectation::NoCharge(reason), Some(entry)) => {
            tracing::debug!(plugin_id, charge_key, reason = %reason, "Deleting stale charge");
            let notification = Notification {
                kind: NotificationKind::Deleted,
                charge_key: charge_key.to_string(),
                message: format!(
                    "Deleted charge of {}: {} ({})",
                    format_amount(entry.amount),
                    entry.memo,
                    reason
                ),
                amount: entry.amount,
                previous_amount: None,
            };
            ExecutionResult::change(
                LedgerTransaction::Delete {
                    plugin_id: plugin_id.to_string(),
                    charge_key: charge_key.to_string(),
                },
                notification,
            )
        }
        (Expectation::NoCharge(reason), None)
        | (Expectation::NotApplicable(reason), None)
        | (Expectation::NotApplicable(reason), Some(_)) => ExecutionResult::noop(reason),
    }
}

/// Run one plugin invocation behind the plugin boundary.
///
/// Rejects mis-routed triggers and foreign configs before `work` is polled,
/// and converts any error `work` returns into a failed result after logging
/// it with full context.
pub async fn guarded<F>(
    metadata: &PluginMetadata,
    context: &TriggerContext,
    config: &PluginConfig,
    work: F,
) -> ExecutionResult
where
    F: Future<Output = Result<ExecutionResult, PluginError>>,
{
    let trigger = context.trigger_type();

    let routing_error = if !metadata.trigger_types.contains(&trigger) {
        Some(PluginError::UnsupportedTrigger {
            plugin_id: metadata.id.to_string(),
            trigger,
        })
    } else if config.plugin_id != metadata.id {
        Some(PluginError::ConfigMismatch {
            config_id: config.id.clone(),
            config_plugin: config.plugin_id.clone(),
            plugin_id: metadata.id.to_string(),
        })
    } else {
        None
    };
    if let Some(err) = routing_error {
        tracing::warn!(
            plugin_id = metadata.id,
            config_id = %config.id,
            trigger = %trigger,
            error = %err,
            "Trigger routed to wrong plugin"
        );
        return ExecutionResult::failure(err.to_string());
    }

    match work.await {
        Ok(result) => {
            tracing::debug!(
                plugin_id = metadata.id,
                config_id = %config.id,
                trigger = %trigger,
                transactions = result.transactions.len(),
                outcome = result.message.as_deref().unwrap_or(""),
                "Charge plugin executed"
            );
            result
        }
        Err(err) => {
            tracing::error!(
                plugin_id = metadata.id,
                config_id = %config.id,
                trigger = %trigger,
                worker_id = %context.worker_id(),
                employer_id = %context.employer_id(),
                error = %err,
                "Charge plugin execution failed"
            );
            metrics::counter!(
                "charge_engine_plugin_failures_total",
                "plugin" => metadata.id,
            )
            .increment(1);
            ExecutionResult::failure(err.to_string())
        }
    }
}
