//! Drift audit.
//!
//! Recomputes the expected value of already-persisted entries from their own
//! stored metadata and the current config, then reports every mismatch.
//! Nothing here writes to the ledger.

mod error;

pub use error::AuditError;

use crate::ledger::{LedgerEntry, LedgerStore};
use crate::plugin::{ChargePlugin, PluginConfig, PluginError, VerificationResult};
use crate::reconcile::{format_amount, Expectation};
use crate::registry::PluginRegistry;
use serde::Serialize;

/// Compare a persisted entry with what a plugin recomputed for it.
pub fn compare(
    entry: &LedgerEntry,
    recomputed: Result<Expectation, PluginError>,
) -> VerificationResult {
    let mut result = VerificationResult {
        entry_id: entry.id,
        charge_key: entry.charge_key.clone(),
        valid: false,
        actual_amount: entry.amount,
        expected_amount: None,
        actual_description: entry.memo.clone(),
        expected_description: None,
        discrepancies: Vec::new(),
    };

    let expected = match recomputed {
        Ok(Expectation::Charge(expected)) => expected,
        Ok(Expectation::NoCharge(reason)) => {
            result
                .discrepancies
                .push(format!("No charge expected: {}", reason));
            return result;
        }
        Ok(Expectation::NotApplicable(reason)) => {
            result
                .discrepancies
                .push(format!("Entry no longer applies: {}", reason));
            return result;
        }
        Err(err) => {
            result
                .discrepancies
                .push(format!("Unable to recompute: {}", err));
            return result;
        }
    };

    if expected.amount != entry.amount {
        result.discrepancies.push(format!(
            "Amount mismatch: expected {}, actual {}",
            format_amount(expected.amount),
            format_amount(entry.amount)
        ));
    }
    if expected.description != entry.memo {
        result.discrepancies.push(format!(
            "Description mismatch: expected \"{}\", actual \"{}\"",
            expected.description, entry.memo
        ));
    }
    if expected.charge_key != entry.charge_key {
        result.discrepancies.push(format!(
            "Charge key mismatch: expected {}, actual {}",
            expected.charge_key, entry.charge_key
        ));
    }
    if expected.reference_type != entry.reference_type
        || expected.reference_id != entry.reference_id
    {
        result.discrepancies.push(format!(
            "Reference mismatch: expected {} {}, actual {} {}",
            expected.reference_type,
            expected.reference_id,
            entry.reference_type,
            entry.reference_id
        ));
    }

    result.valid = result.discrepancies.is_empty();
    result.expected_amount = Some(expected.amount);
    result.expected_description = Some(expected.description);
    result
}

/// Verify a batch of entries against `config`.
///
/// Entries written by a different plugin are reported invalid rather than
/// recomputed.
pub fn verify(
    plugin: &dyn ChargePlugin,
    entries: &[LedgerEntry],
    config: &PluginConfig,
) -> Vec<VerificationResult> {
    entries
        .iter()
        .map(|entry| {
            if entry.plugin_id != plugin.id() {
                compare(
                    entry,
                    Err(PluginError::ConfigMismatch {
                        config_id: config.id.clone(),
                        config_plugin: entry.plugin_id.clone(),
                        plugin_id: plugin.id().to_string(),
                    }),
                )
            } else {
                plugin.verify_entry(entry, config)
            }
        })
        .collect()
}

/// Summary of one audit run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub plugin_id: String,
    pub config_id: String,
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    pub results: Vec<VerificationResult>,
}

impl AuditReport {
    pub fn new(plugin_id: &str, config_id: &str, results: Vec<VerificationResult>) -> Self {
        let valid = results.iter().filter(|r| r.valid).count();
        Self {
            plugin_id: plugin_id.to_string(),
            config_id: config_id.to_string(),
            total: results.len(),
            valid,
            invalid: results.len() - valid,
            results,
        }
    }

    /// Results that reported at least one discrepancy.
    pub fn discrepancies(&self) -> impl Iterator<Item = &VerificationResult> {
        self.results.iter().filter(|r| !r.valid)
    }

    pub fn is_clean(&self) -> bool {
        self.invalid == 0
    }
}

/// Audit every entry `config` owns in the store.
///
/// An entry belongs to a config when its charge key starts with the config
/// id followed by `:`.
pub async fn audit_plugin(
    registry: &PluginRegistry,
    store: &dyn LedgerStore,
    plugin_id: &str,
    config: &PluginConfig,
) -> Result<AuditReport, AuditError> {
    let plugin = registry.require(plugin_id)?;
    if config.plugin_id != plugin_id {
        return Err(AuditError::ConfigMismatch {
            config_id: config.id.clone(),
            config_plugin: config.plugin_id.clone(),
            plugin_id: plugin_id.to_string(),
        });
    }

    let prefix = format!("{}:", config.id);
    let entries: Vec<LedgerEntry> = store
        .list_by_plugin(plugin_id)
        .await?
        .into_iter()
        .filter(|entry| entry.charge_key.starts_with(&prefix))
        .collect();

    let report = AuditReport::new(plugin_id, &config.id, verify(plugin.as_ref(), &entries, config));
    for result in report.discrepancies() {
        tracing::warn!(
            plugin_id,
            config_id = %config.id,
            key = %result.charge_key,
            entry_id = %result.entry_id,
            discrepancies = ?result.discrepancies,
            "Ledger entry drifted from its config"
        );
    }
    if report.invalid > 0 {
        metrics::counter!(
            "charge_engine_audit_discrepancies_total",
            "plugin" => plugin_id.to_string(),
        )
        .increment(report.invalid as u64);
    }
    tracing::info!(
        plugin_id,
        config_id = %config.id,
        total = report.total,
        invalid = report.invalid,
        "Audit complete"
    );
    Ok(report)
}
