//! Plugins command implementation

use crate::cli::output::{format_plugins_json, format_plugins_table};
use crate::cli::PluginsListArgs;
use crate::registry::PluginRegistry;

/// Handle plugins list command
pub fn handle_plugins_list(
    args: &PluginsListArgs,
    registry: &PluginRegistry,
) -> Result<String, Box<dyn std::error::Error>> {
    let plugins = registry.metadata();

    if args.json {
        Ok(format_plugins_json(&plugins)?)
    } else {
        Ok(format_plugins_table(&plugins))
    }
}
