//! Plugin configuration source.

use crate::ledger::StoreError;
use crate::plugin::PluginConfig;
use crate::registry::PluginRegistry;
use crate::trigger::TriggerType;
use async_trait::async_trait;
use uuid::Uuid;

/// Read-only source of administrator-managed plugin configs.
#[async_trait]
pub trait ConfigStore: Send + Sync + 'static {
    /// Enabled configs that should run for `trigger` raised by `employer_id`:
    /// global ones plus those bound to that employer.
    async fn enabled_configs(
        &self,
        trigger: TriggerType,
        employer_id: Uuid,
    ) -> Result<Vec<PluginConfig>, StoreError>;
}

/// Fixed list of configs, typically the `[[plugins]]` tables of the config
/// file.
pub struct StaticConfigStore {
    configs: Vec<(PluginConfig, Option<Vec<TriggerType>>)>,
}

impl StaticConfigStore {
    /// Index `configs` by the triggers their plugin accepts.
    ///
    /// Configs naming a plugin the registry does not know are served for
    /// every trigger so the dispatcher can report them.
    pub fn new(configs: Vec<PluginConfig>, registry: &PluginRegistry) -> Self {
        let configs = configs
            .into_iter()
            .map(|config| {
                let triggers = registry
                    .get(&config.plugin_id)
                    .map(|plugin| plugin.metadata().trigger_types.clone());
                (config, triggers)
            })
            .collect();
        Self { configs }
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}

#[async_trait]
impl ConfigStore for StaticConfigStore {
    async fn enabled_configs(
        &self,
        trigger: TriggerType,
        employer_id: Uuid,
    ) -> Result<Vec<PluginConfig>, StoreError> {
        Ok(self
            .configs
            .iter()
            .filter(|(config, triggers)| {
                config.enabled
                    && config.applies_to(employer_id)
                    && triggers.as_ref().map_or(true, |t| t.contains(&trigger))
            })
            .map(|(config, _)| config.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::InMemoryLedgerStore;
    use crate::plugin::PluginScope;
    use std::sync::Arc;

    const EMPLOYER: Uuid = Uuid::from_u128(0xE1);

    fn config(id: &str, plugin_id: &str, employer_id: Option<Uuid>) -> PluginConfig {
        PluginConfig {
            id: id.to_string(),
            plugin_id: plugin_id.to_string(),
            scope: if employer_id.is_some() {
                PluginScope::Employer
            } else {
                PluginScope::Global
            },
            employer_id,
            enabled: true,
            settings: serde_json::Value::Null,
        }
    }

    fn store(configs: Vec<PluginConfig>) -> StaticConfigStore {
        let registry =
            PluginRegistry::with_builtin_plugins(Arc::new(InMemoryLedgerStore::new())).unwrap();
        StaticConfigStore::new(configs, &registry)
    }

    fn ids(configs: &[PluginConfig]) -> Vec<&str> {
        configs.iter().map(|c| c.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_filters_by_trigger() {
        let store = store(vec![
            config("benefit", "monthly-benefit-charge", None),
            config("hours", "hourly-rate", Some(EMPLOYER)),
        ]);

        let configs = store
            .enabled_configs(TriggerType::WorkerHoursSaved, EMPLOYER)
            .await
            .unwrap();
        assert_eq!(ids(&configs), vec!["hours"]);
    }

    #[tokio::test]
    async fn test_filters_by_employer_and_enabled() {
        let mut disabled = config("off", "monthly-benefit-charge", None);
        disabled.enabled = false;
        let store = store(vec![
            config("global", "monthly-benefit-charge", None),
            config("mine", "monthly-benefit-charge", Some(EMPLOYER)),
            config("theirs", "monthly-benefit-charge", Some(Uuid::from_u128(0xE2))),
            disabled,
        ]);

        let configs = store
            .enabled_configs(TriggerType::WorkerMonthlyBenefitSaved, EMPLOYER)
            .await
            .unwrap();
        assert_eq!(ids(&configs), vec!["global", "mine"]);
    }

    #[tokio::test]
    async fn test_unknown_plugin_served_for_every_trigger() {
        let store = store(vec![config("mystery", "per-mile", None)]);
        for trigger in TriggerType::all() {
            let configs = store.enabled_configs(trigger, EMPLOYER).await.unwrap();
            assert_eq!(ids(&configs), vec!["mystery"]);
        }
    }
}
