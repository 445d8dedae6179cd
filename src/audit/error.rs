//! Audit error types.

use crate::ledger::StoreError;
use crate::registry::RegistryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Config '{config_id}' belongs to plugin '{config_plugin}', not '{plugin_id}'")]
    ConfigMismatch {
        config_id: String,
        config_plugin: String,
        plugin_id: String,
    },

    #[error("Failed to list ledger entries: {0}")]
    Store(#[from] StoreError),
}
