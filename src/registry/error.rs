/// Errors that can occur during registry operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("plugin already registered: {0}")]
    DuplicatePlugin(String),

    #[error("plugin not found: {0}")]
    PluginNotFound(String),
}
