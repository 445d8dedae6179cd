//! Trigger dispatcher.
//!
//! The caller side of the plugin contract: finds the configs an event
//! concerns, runs each plugin under a per-key lock and persists the
//! transactions it returns. One plugin failing never stops the others.

pub mod config_store;
pub mod locks;

pub use config_store::{ConfigStore, StaticConfigStore};
pub use locks::KeyLocks;

use crate::config::EngineSettings;
use crate::ledger::{LedgerStore, LedgerTransaction, StoreError};
use crate::plugin::{ChargePlugin, ExecutionResult, Notification, PluginConfig};
use crate::registry::PluginRegistry;
use crate::trigger::{TriggerContext, TriggerType};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Failed to load plugin configs: {0}")]
    ConfigStore(#[source] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    /// The ledger was changed.
    Applied,
    /// The ledger already matched.
    Unchanged,
    /// The config was not run.
    Skipped,
    /// The plugin or the ledger write failed.
    Failed,
}

/// What happened for one config.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginOutcome {
    pub config_id: String,
    pub plugin_id: String,
    pub status: OutcomeStatus,
    pub notifications: Vec<Notification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PluginOutcome {
    fn skipped(config: &PluginConfig, reason: String) -> Self {
        Self {
            config_id: config.id.clone(),
            plugin_id: config.plugin_id.clone(),
            status: OutcomeStatus::Skipped,
            notifications: Vec::new(),
            message: Some(reason),
        }
    }

    fn failed(config: &PluginConfig, error: String) -> Self {
        Self {
            config_id: config.id.clone(),
            plugin_id: config.plugin_id.clone(),
            status: OutcomeStatus::Failed,
            notifications: Vec::new(),
            message: Some(error),
        }
    }
}

/// Outcomes of one dispatched event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchReport {
    pub trigger: TriggerType,
    pub serialization_key: String,
    pub outcomes: Vec<PluginOutcome>,
}

impl DispatchReport {
    fn count(&self, status: OutcomeStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    pub fn applied(&self) -> usize {
        self.count(OutcomeStatus::Applied)
    }

    pub fn failed(&self) -> usize {
        self.count(OutcomeStatus::Failed)
    }

    pub fn skipped(&self) -> usize {
        self.count(OutcomeStatus::Skipped)
    }

    pub fn notifications(&self) -> impl Iterator<Item = &Notification> {
        self.outcomes.iter().flat_map(|o| o.notifications.iter())
    }
}

/// Runs every matching plugin config for an event and persists the result.
pub struct TriggerDispatcher {
    registry: Arc<PluginRegistry>,
    configs: Arc<dyn ConfigStore>,
    ledger: Arc<dyn LedgerStore>,
    locks: KeyLocks,
    settings: EngineSettings,
}

impl TriggerDispatcher {
    pub fn new(
        registry: Arc<PluginRegistry>,
        configs: Arc<dyn ConfigStore>,
        ledger: Arc<dyn LedgerStore>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            registry,
            configs,
            ledger,
            locks: KeyLocks::new(),
            settings,
        }
    }

    /// Dispatch one event to every enabled config that concerns it.
    ///
    /// # Errors
    ///
    /// Only fails when the config store cannot be read. Plugin and ledger
    /// failures are reported per config in the returned report.
    pub async fn dispatch(&self, context: &TriggerContext) -> Result<DispatchReport, DispatchError> {
        let start = Instant::now();
        let trigger = context.trigger_type();
        let serialization_key = context.serialization_key();

        let configs = self
            .configs
            .enabled_configs(trigger, context.employer_id())
            .await
            .map_err(DispatchError::ConfigStore)?;

        tracing::debug!(
            trigger = %trigger,
            key = %serialization_key,
            configs = configs.len(),
            "Dispatching trigger"
        );

        let mut outcomes = Vec::with_capacity(configs.len());
        for config in &configs {
            outcomes.push(self.run_config(context, config, &serialization_key).await);
        }
        self.locks.prune();

        metrics::histogram!("charge_engine_dispatch_duration_seconds")
            .record(start.elapsed().as_secs_f64());

        Ok(DispatchReport {
            trigger,
            serialization_key,
            outcomes,
        })
    }

    async fn run_config(
        &self,
        context: &TriggerContext,
        config: &PluginConfig,
        serialization_key: &str,
    ) -> PluginOutcome {
        let trigger = context.trigger_type();

        let Some(plugin) = self.registry.get(&config.plugin_id) else {
            tracing::warn!(
                config_id = %config.id,
                plugin_id = %config.plugin_id,
                "Config names an unknown plugin, skipping"
            );
            return PluginOutcome::skipped(config, format!("Unknown plugin '{}'", config.plugin_id));
        };
        if !plugin.accepts(trigger) {
            return PluginOutcome::skipped(
                config,
                format!("Plugin '{}' does not handle {}", plugin.id(), trigger),
            );
        }
        if let Some(capability) = plugin.metadata().required_capability {
            if !self.settings.has_capability(capability) {
                tracing::warn!(
                    config_id = %config.id,
                    plugin_id = plugin.id(),
                    capability,
                    "Required capability disabled, skipping"
                );
                return PluginOutcome::skipped(
                    config,
                    format!("Capability '{}' is not enabled", capability),
                );
            }
        }

        let _guard = self
            .locks
            .lock(&format!("{}|{}", config.id, serialization_key))
            .await;

        let mut attempt = 0;
        loop {
            let result = plugin.execute(context, config).await;
            if !result.success {
                let error = result
                    .error
                    .unwrap_or_else(|| "plugin reported failure".to_string());
                return PluginOutcome::failed(config, error);
            }

            match self.apply(plugin.as_ref(), config, &result).await {
                Ok(()) => return Self::finished(config, result),
                Err(err) if Self::is_retryable(&err) && attempt < self.settings.max_conflict_retries => {
                    attempt += 1;
                    tracing::info!(
                        config_id = %config.id,
                        plugin_id = plugin.id(),
                        attempt,
                        error = %err,
                        "Ledger changed underneath, re-running plugin"
                    );
                }
                Err(err) => {
                    tracing::error!(
                        config_id = %config.id,
                        plugin_id = plugin.id(),
                        trigger = %trigger,
                        key = %serialization_key,
                        error = %err,
                        "Failed to persist charge"
                    );
                    return PluginOutcome::failed(config, format!("Failed to persist charge: {}", err));
                }
            }
        }
    }

    /// A create that lost a race, or an update/delete whose target vanished,
    /// is resolved by re-running the plugin against the new ledger state.
    fn is_retryable(err: &StoreError) -> bool {
        matches!(err, StoreError::Conflict { .. } | StoreError::NotFound(_))
    }

    fn finished(config: &PluginConfig, result: ExecutionResult) -> PluginOutcome {
        let status = if result.transactions.is_empty() {
            OutcomeStatus::Unchanged
        } else {
            OutcomeStatus::Applied
        };
        PluginOutcome {
            config_id: config.id.clone(),
            plugin_id: config.plugin_id.clone(),
            status,
            notifications: result.notifications,
            message: result.message,
        }
    }

    async fn apply(
        &self,
        plugin: &dyn ChargePlugin,
        config: &PluginConfig,
        result: &ExecutionResult,
    ) -> Result<(), StoreError> {
        for transaction in &result.transactions {
            match transaction {
                LedgerTransaction::Create(entry) => {
                    self.ledger.create(entry.clone()).await?;
                }
                LedgerTransaction::Update {
                    entry_id, update, ..
                } => {
                    self.ledger.update(*entry_id, update.clone()).await?;
                }
                LedgerTransaction::Delete {
                    plugin_id,
                    charge_key,
                } => {
                    if !self.ledger.delete_by_key(plugin_id, charge_key).await? {
                        tracing::debug!(key = %charge_key, "Charge already deleted");
                    }
                }
            }
            tracing::info!(
                config_id = %config.id,
                plugin_id = plugin.id(),
                op = transaction.op(),
                key = %transaction.charge_key(),
                "Applied ledger transaction"
            );
            metrics::counter!(
                "charge_engine_transactions_total",
                "op" => transaction.op(),
            )
            .increment(1);
        }
        Ok(())
    }
}
