//! Charge plugins.
//!
//! This module provides the [`ChargePlugin`] trait and its supporting types.
//! A plugin reacts to one or more trigger kinds, owns its settings schema and
//! charge-key rule, and decides what ledger entry should exist for an event.

use async_trait::async_trait;

pub mod error;
pub mod factory;
pub mod hourly;
pub mod monthly_benefit;
pub mod settings;
pub mod types;

pub use error::PluginError;
pub use hourly::HourlyRatePlugin;
pub use monthly_benefit::MonthlyBenefitChargePlugin;
pub use types::{
    ExecutionResult, Notification, NotificationKind, PluginConfig, PluginMetadata, PluginScope,
    SettingField, SettingsValidation, VerificationResult,
};

use crate::ledger::LedgerEntry;
use crate::trigger::{TriggerContext, TriggerType};

/// Unified interface for all charge plugins.
///
/// # Object Safety
///
/// This trait is object-safe and designed to be used as `Arc<dyn ChargePlugin>`.
/// Async methods use `async_trait` for compatibility with trait objects.
///
/// # Contract
///
/// - `validate_settings` runs before `execute` is trusted with a config.
/// - `execute` never returns an error or panics on bad input; failures come
///   back as `ExecutionResult { success: false, .. }`.
/// - `execute` is idempotent: with unchanged inputs and storage, a second
///   call produces no transactions.
/// - `verify_entry` is read-only and recomputes from the entry's own metadata.
#[async_trait]
pub trait ChargePlugin: Send + Sync + 'static {
    /// Static description: id, accepted triggers, scope, settings schema.
    fn metadata(&self) -> &PluginMetadata;

    /// Unique plugin identifier (e.g., "monthly-benefit-charge").
    fn id(&self) -> &'static str {
        self.metadata().id
    }

    /// Whether this plugin handles `trigger`.
    fn accepts(&self, trigger: TriggerType) -> bool {
        self.metadata().trigger_types.contains(&trigger)
    }

    /// Structural and semantic validation of raw settings.
    fn validate_settings(&self, raw: &serde_json::Value) -> SettingsValidation;

    /// Reconcile the ledger entry owned by this event and config.
    ///
    /// Returns the transactions the caller should persist. Never writes
    /// ledger entries itself; it only resolves the account and looks up the
    /// existing entry.
    async fn execute(&self, context: &TriggerContext, config: &PluginConfig) -> ExecutionResult;

    /// Recompute the expected entry for a persisted `entry` and compare.
    fn verify_entry(&self, entry: &LedgerEntry, config: &PluginConfig) -> VerificationResult;
}
