//! Engine configuration

use serde::{Deserialize, Serialize};

/// Dispatcher settings.
///
/// # Example
///
/// ```toml
/// [engine]
/// capabilities = ["ledger"]
/// max_conflict_retries = 3
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Capability flags switched on for this deployment.
    ///
    /// A plugin whose `required_capability` is not listed here is skipped.
    pub capabilities: Vec<String>,

    /// How many times a dispatch re-runs a plugin after losing a create
    /// race on the same charge key.
    ///
    /// Default: 3
    pub max_conflict_retries: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            capabilities: vec!["ledger".to_string()],
            max_conflict_retries: 3,
        }
    }
}

impl EngineSettings {
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_settings_defaults() {
        let settings = EngineSettings::default();
        assert!(settings.has_capability("ledger"));
        assert!(!settings.has_capability("dispatch"));
        assert_eq!(settings.max_conflict_retries, 3);
    }

    #[test]
    fn test_engine_settings_partial_toml() {
        let settings: EngineSettings = toml::from_str("max_conflict_retries = 0").unwrap();
        assert_eq!(settings.max_conflict_retries, 0);
        assert_eq!(settings.capabilities, vec!["ledger"]);
    }
}
