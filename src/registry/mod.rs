//! Plugin Registry module.
//!
//! Maps plugin identifiers to plugin instances. Populated once at startup by
//! explicit registration and shared read-only behind an `Arc` afterwards.

mod error;

pub use error::*;

use crate::ledger::LedgerStore;
use crate::plugin::{factory, ChargePlugin, PluginMetadata};
use crate::trigger::TriggerType;
use std::collections::BTreeMap;
use std::sync::Arc;

/// The Plugin Registry stores every known charge plugin.
///
/// Iteration order is the plugin id order, so listings are stable across
/// runs.
///
/// # Examples
///
/// ```
/// use charge_engine::ledger::InMemoryLedgerStore;
/// use charge_engine::plugin::HourlyRatePlugin;
/// use charge_engine::registry::PluginRegistry;
/// use std::sync::Arc;
///
/// let ledger = Arc::new(InMemoryLedgerStore::new());
/// let mut registry = PluginRegistry::new();
///
/// registry.register(Arc::new(HourlyRatePlugin::new(ledger))).unwrap();
/// assert_eq!(registry.len(), 1);
/// assert!(registry.get("hourly-rate").is_some());
/// ```
#[derive(Default)]
pub struct PluginRegistry {
    plugins: BTreeMap<String, Arc<dyn ChargePlugin>>,
}

impl PluginRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in plugin.
    pub fn with_builtin_plugins(ledger: Arc<dyn LedgerStore>) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for plugin in factory::builtin_plugins(ledger) {
            registry.register(plugin)?;
        }
        Ok(registry)
    }

    /// Add a plugin to the registry.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::DuplicatePlugin` if a plugin with the same id
    /// is already registered. The existing plugin is kept.
    pub fn register(&mut self, plugin: Arc<dyn ChargePlugin>) -> Result<(), RegistryError> {
        let id = plugin.id().to_string();
        if self.plugins.contains_key(&id) {
            return Err(RegistryError::DuplicatePlugin(id));
        }
        tracing::debug!(plugin_id = %id, "Registered charge plugin");
        self.plugins.insert(id, plugin);
        Ok(())
    }

    /// Get a plugin by id.
    pub fn get(&self, id: &str) -> Option<Arc<dyn ChargePlugin>> {
        self.plugins.get(id).cloned()
    }

    /// Get a plugin by id, or `RegistryError::PluginNotFound`.
    pub fn require(&self, id: &str) -> Result<Arc<dyn ChargePlugin>, RegistryError> {
        self.get(id)
            .ok_or_else(|| RegistryError::PluginNotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.plugins.contains_key(id)
    }

    /// All registered plugins, ordered by id.
    pub fn all(&self) -> Vec<Arc<dyn ChargePlugin>> {
        self.plugins.values().cloned().collect()
    }

    /// Metadata of all registered plugins, ordered by id.
    pub fn metadata(&self) -> Vec<&PluginMetadata> {
        self.plugins.values().map(|p| p.metadata()).collect()
    }

    /// Plugins that accept `trigger`.
    pub fn for_trigger(&self, trigger: TriggerType) -> Vec<Arc<dyn ChargePlugin>> {
        self.plugins
            .values()
            .filter(|p| p.accepts(trigger))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
