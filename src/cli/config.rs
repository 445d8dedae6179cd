//! Config command handlers

use crate::cli::{ConfigInitArgs, ConfigValidateArgs};
use crate::config::{ChargeEngineConfig, EXAMPLE_CONFIG};
use crate::ledger::InMemoryLedgerStore;
use crate::registry::PluginRegistry;
use std::fs;
use std::sync::Arc;

/// Handle `charge-engine config init` command
pub fn handle_config_init(args: &ConfigInitArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.output.exists() && !args.force {
        return Err(format!(
            "File already exists: {}. Use --force to overwrite.",
            args.output.display()
        )
        .into());
    }

    fs::write(&args.output, EXAMPLE_CONFIG)?;

    println!("✓ Configuration file created: {}", args.output.display());
    println!("  Edit the [[plugins]] tables to configure your charges.");

    Ok(())
}

/// Handle `charge-engine config validate` command
///
/// Returns a summary on success. On failure every problem found is listed
/// in the error.
pub fn handle_config_validate(
    args: &ConfigValidateArgs,
) -> Result<String, Box<dyn std::error::Error>> {
    let config = ChargeEngineConfig::load(Some(&args.config))?;
    config.validate()?;

    // Settings validation is pure; the ledger handle is never touched.
    let registry = PluginRegistry::with_builtin_plugins(Arc::new(InMemoryLedgerStore::new()))?;
    let errors = config.plugin_settings_errors(&registry);
    if !errors.is_empty() {
        let lines: Vec<String> = errors.iter().map(|e| format!("  - {}", e)).collect();
        return Err(format!(
            "{} problem(s) in {}:\n{}",
            errors.len(),
            args.config.display(),
            lines.join("\n")
        )
        .into());
    }

    Ok(format!(
        "✓ {} is valid ({} plugin config(s))",
        args.config.display(),
        config.plugins.len()
    ))
}
