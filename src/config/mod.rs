//! Configuration module for the charge engine
//!
//! Provides layered configuration loading from files, environment variables, and defaults.
//!
//! # Configuration Precedence
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (`CHARGE_ENGINE_*`)
//! 3. Configuration file (TOML)
//! 4. Default values (lowest priority)
//!
//! # Example
//!
//! ```rust
//! use charge_engine::config::ChargeEngineConfig;
//!
//! let toml = r#"
//! [engine]
//! max_conflict_retries = 5
//!
//! [[plugins]]
//! id = "benefit-dental"
//! plugin_id = "monthly-benefit-charge"
//! scope = "global"
//!
//! [plugins.settings]
//! accountId = "6f1c1f4e-3c1a-4d0e-9a59-0b0f7f4a6a11"
//! benefitId = "0c5a0f0e-8f4e-4a55-9d7c-2a64c1f0b7d3"
//! rateHistory = [{ effectiveDate = "2024-01-01", rate = "15.00" }]
//! "#;
//! let config: ChargeEngineConfig = toml::from_str(toml).unwrap();
//! assert_eq!(config.engine.max_conflict_retries, 5);
//! assert_eq!(config.plugins.len(), 1);
//! assert!(config.validate().is_ok());
//! ```

pub mod engine;
pub mod error;
pub mod logging;

pub use engine::EngineSettings;
pub use error::ConfigError;
pub use logging::{LogFormat, LoggingConfig};

use crate::plugin::{PluginConfig, PluginScope};
use crate::registry::PluginRegistry;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Example configuration written by `charge-engine config init`.
pub const EXAMPLE_CONFIG: &str = include_str!("../../charge-engine.example.toml");

/// Unified configuration for the charge engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ChargeEngineConfig {
    /// Dispatcher settings
    pub engine: EngineSettings,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Static plugin configurations
    pub plugins: Vec<PluginConfig>,
}

impl ChargeEngineConfig {
    /// Load configuration from a TOML file
    ///
    /// If path is None, returns default configuration.
    /// If path doesn't exist, returns NotFound error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound(p.to_path_buf()));
                }
                let content = std::fs::read_to_string(p)?;
                toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supports CHARGE_ENGINE_* environment variables for common settings.
    /// Invalid values are silently ignored (defaults are kept).
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(level) = std::env::var("CHARGE_ENGINE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("CHARGE_ENGINE_LOG_FORMAT") {
            if let Ok(f) = format.parse() {
                self.logging.format = f;
            }
        }

        if let Ok(capabilities) = std::env::var("CHARGE_ENGINE_CAPABILITIES") {
            self.engine.capabilities = capabilities
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(String::from)
                .collect();
        }
        if let Ok(retries) = std::env::var("CHARGE_ENGINE_MAX_CONFLICT_RETRIES") {
            if let Ok(r) = retries.parse() {
                self.engine.max_conflict_retries = r;
            }
        }

        self
    }

    /// Validate configuration
    ///
    /// Checks the shape of each plugin config. Plugin settings are checked
    /// separately by [`plugin_settings_errors`](Self::plugin_settings_errors),
    /// which needs the registry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();

        for (i, plugin) in self.plugins.iter().enumerate() {
            if plugin.id.trim().is_empty() {
                return Err(ConfigError::validation(
                    format!("plugins[{}].id", i),
                    "id cannot be empty",
                ));
            }
            // Config ids lead every charge key, where ':' separates segments.
            if plugin.id.contains(':') {
                return Err(ConfigError::validation(
                    format!("plugins[{}].id", i),
                    "id cannot contain ':'",
                ));
            }
            if !seen.insert(plugin.id.as_str()) {
                return Err(ConfigError::validation(
                    format!("plugins[{}].id", i),
                    format!("duplicate config id '{}'", plugin.id),
                ));
            }
            if plugin.plugin_id.trim().is_empty() {
                return Err(ConfigError::validation(
                    format!("plugins[{}].plugin_id", i),
                    "plugin_id cannot be empty",
                ));
            }
            match (plugin.scope, plugin.employer_id) {
                (PluginScope::Employer, None) => {
                    return Err(ConfigError::validation(
                        format!("plugins[{}].employer_id", i),
                        "employer scope requires employer_id",
                    ));
                }
                (PluginScope::Global, Some(_)) => {
                    return Err(ConfigError::validation(
                        format!("plugins[{}].employer_id", i),
                        "global scope must not set employer_id",
                    ));
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Run each configured plugin's own settings validation.
    ///
    /// Returns every problem found rather than stopping at the first.
    pub fn plugin_settings_errors(&self, registry: &PluginRegistry) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        for (i, config) in self.plugins.iter().enumerate() {
            let Some(plugin) = registry.get(&config.plugin_id) else {
                errors.push(ConfigError::validation(
                    format!("plugins[{}].plugin_id", i),
                    format!("unknown plugin '{}'", config.plugin_id),
                ));
                continue;
            };
            let validation = plugin.validate_settings(&config.settings);
            errors.extend(validation.errors.into_iter().map(|message| {
                ConfigError::validation(format!("plugins[{}].settings", i), message)
            }));
        }
        errors
    }
}
