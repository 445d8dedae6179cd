//! Types shared by every charge plugin.

use crate::ledger::LedgerTransaction;
use crate::trigger::TriggerType;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Whether a plugin config applies to every employer or to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginScope {
    Global,
    Employer,
}

impl fmt::Display for PluginScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginScope::Global => f.write_str("global"),
            PluginScope::Employer => f.write_str("employer"),
        }
    }
}

fn default_enabled() -> bool {
    true
}

/// One administrator-configured instance of a plugin.
///
/// Read-only to the engine. `settings` is opaque here and validated by the
/// plugin named by `plugin_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PluginConfig {
    /// Config id, the first segment of every charge key it produces
    pub id: String,
    pub plugin_id: String,
    pub scope: PluginScope,
    /// Owning employer, required iff `scope` is `employer`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employer_id: Option<Uuid>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub settings: serde_json::Value,
}

impl PluginConfig {
    /// Whether this config should run for an event raised by `employer_id`.
    pub fn applies_to(&self, employer_id: Uuid) -> bool {
        match self.scope {
            PluginScope::Global => true,
            PluginScope::Employer => self.employer_id == Some(employer_id),
        }
    }
}

/// One field of a plugin's settings schema, for administrative listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingField {
    pub name: &'static str,
    pub kind: &'static str,
    pub required: bool,
    pub description: &'static str,
}

/// Static description of a plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginMetadata {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub trigger_types: Vec<TriggerType>,
    pub default_scope: PluginScope,
    /// Capability flag that must be enabled before any config of this plugin runs
    pub required_capability: Option<&'static str>,
    pub settings_schema: Vec<SettingField>,
}

/// Outcome of [`ChargePlugin::validate_settings`](super::ChargePlugin::validate_settings).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsValidation {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl SettingsValidation {
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Created,
    Updated,
    Deleted,
}

/// Human-readable record of a change, suitable for display and audit logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub kind: NotificationKind,
    pub charge_key: String,
    pub message: String,
    /// New amount, or the removed amount for deletions
    pub amount: Decimal,
    /// Previous amount when an update changed it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_amount: Option<Decimal>,
}

/// Result of one plugin invocation.
///
/// A value rather than an error so the dispatcher can keep running other
/// plugins when one fails.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub transactions: Vec<LedgerTransaction>,
    pub notifications: Vec<Notification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionResult {
    /// Successful run that requires no ledger change.
    pub fn noop(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            ..Default::default()
        }
    }

    /// Successful run that requires one ledger change.
    pub fn change(transaction: LedgerTransaction, notification: Notification) -> Self {
        Self {
            success: true,
            message: Some(notification.message.clone()),
            transactions: vec![transaction],
            notifications: vec![notification],
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn is_noop(&self) -> bool {
        self.success && self.transactions.is_empty()
    }
}

/// Outcome of re-verifying one persisted entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub entry_id: Uuid,
    pub charge_key: String,
    pub valid: bool,
    pub actual_amount: Decimal,
    pub expected_amount: Option<Decimal>,
    pub actual_description: String,
    pub expected_description: Option<String>,
    pub discrepancies: Vec<String>,
}
