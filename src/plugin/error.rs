//! Error types for charge plugin operations.

use crate::ledger::StoreError;
use crate::trigger::TriggerType;
use thiserror::Error;

/// Errors raised inside a plugin invocation.
///
/// These never escape [`ChargePlugin::execute`](super::ChargePlugin::execute);
/// the plugin boundary turns them into a failed `ExecutionResult`.
#[derive(Error, Debug)]
pub enum PluginError {
    /// The trigger was routed to a plugin that does not accept it.
    #[error("Plugin '{plugin_id}' does not handle trigger '{trigger}'")]
    UnsupportedTrigger {
        plugin_id: String,
        trigger: TriggerType,
    },

    /// The config belongs to a different plugin.
    #[error("Config '{config_id}' belongs to plugin '{config_plugin}', not '{plugin_id}'")]
    ConfigMismatch {
        config_id: String,
        config_plugin: String,
        plugin_id: String,
    },

    /// Settings failed structural or semantic validation.
    #[error("Invalid settings: {}", .0.join("; "))]
    InvalidSettings(Vec<String>),

    /// The trigger payload is internally inconsistent (e.g. month 13).
    #[error("Invalid trigger: {0}")]
    InvalidTrigger(String),

    /// A persisted entry's metadata cannot be decoded.
    #[error("Invalid entry metadata: {0}")]
    InvalidMetadata(String),

    /// No plugin is registered under the requested id.
    #[error("Unknown plugin: {0}")]
    UnknownPlugin(String),

    /// The ledger store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}
