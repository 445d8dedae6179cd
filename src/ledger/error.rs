//! Ledger store error types.

use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by a [`LedgerStore`](super::LedgerStore) implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No entry with the given id exists.
    #[error("Ledger entry not found: {0}")]
    NotFound(Uuid),

    /// An entry already exists for `(plugin_id, charge_key)`.
    #[error("Ledger entry already exists for {plugin_id} key '{charge_key}'")]
    Conflict {
        plugin_id: String,
        charge_key: String,
    },

    /// The backing store could not be reached or rejected the operation.
    #[error("Ledger store unavailable: {0}")]
    Unavailable(String),
}
