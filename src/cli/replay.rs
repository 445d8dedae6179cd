//! Replay command implementation
//!
//! Dispatches a file of events through the configured plugins into a fresh
//! in-memory ledger, then audits every config against what was written.

use crate::audit::{audit_plugin, AuditReport};
use crate::cli::output::{format_audit_table, format_dispatch_lines, format_ledger_table};
use crate::cli::ReplayArgs;
use crate::config::ChargeEngineConfig;
use crate::dispatch::{DispatchReport, StaticConfigStore, TriggerDispatcher};
use crate::ledger::{InMemoryLedgerStore, LedgerEntry};
use crate::registry::PluginRegistry;
use crate::trigger::TriggerContext;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// Everything a replay produced.
#[derive(Debug, Serialize)]
pub struct ReplayOutcome {
    pub dispatches: Vec<DispatchReport>,
    pub ledger: Vec<LedgerEntry>,
    pub audits: Vec<AuditReport>,
}

/// Load the config for a replay, applying env and CLI overrides.
pub fn load_config(args: &ReplayArgs) -> Result<ChargeEngineConfig, Box<dyn std::error::Error>> {
    let mut config = ChargeEngineConfig::load(Some(&args.config))?.with_env_overrides();
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    if let Some(capabilities) = &args.capabilities {
        config.engine.capabilities = capabilities.clone();
    }
    config.validate()?;
    Ok(config)
}

/// Read a JSON array of trigger events.
pub fn load_events(path: &Path) -> Result<Vec<TriggerContext>, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read events file {}: {}", path.display(), e))?;
    let events = serde_json::from_str(&content)
        .map_err(|e| format!("Failed to parse events file {}: {}", path.display(), e))?;
    Ok(events)
}

/// Dispatch `events` in order, then audit every enabled config.
pub async fn replay(
    config: &ChargeEngineConfig,
    events: &[TriggerContext],
) -> Result<ReplayOutcome, Box<dyn std::error::Error>> {
    let ledger = Arc::new(InMemoryLedgerStore::new());
    let registry = Arc::new(PluginRegistry::with_builtin_plugins(ledger.clone())?);
    let configs = Arc::new(StaticConfigStore::new(config.plugins.clone(), &registry));
    let dispatcher = TriggerDispatcher::new(
        registry.clone(),
        configs,
        ledger.clone(),
        config.engine.clone(),
    );

    let mut dispatches = Vec::with_capacity(events.len());
    for event in events {
        dispatches.push(dispatcher.dispatch(event).await?);
    }

    let mut audits = Vec::new();
    for plugin_config in config.plugins.iter().filter(|c| c.enabled) {
        if !registry.contains(&plugin_config.plugin_id) {
            continue;
        }
        audits.push(
            audit_plugin(
                &registry,
                ledger.as_ref(),
                &plugin_config.plugin_id,
                plugin_config,
            )
            .await?,
        );
    }

    tracing::info!(
        events = events.len(),
        entries = ledger.entry_count(),
        "Replay complete"
    );

    Ok(ReplayOutcome {
        dispatches,
        ledger: ledger.all_entries(),
        audits,
    })
}

/// Handle `charge-engine replay` once the config is loaded.
pub async fn handle_replay(
    args: &ReplayArgs,
    config: &ChargeEngineConfig,
) -> Result<String, Box<dyn std::error::Error>> {
    let events = load_events(&args.events)?;
    let outcome = replay(config, &events).await?;

    if args.json {
        return Ok(serde_json::to_string_pretty(&outcome)?);
    }

    let mut sections = Vec::new();
    let lines: Vec<String> = outcome
        .dispatches
        .iter()
        .enumerate()
        .flat_map(|(i, report)| format_dispatch_lines(i, report))
        .collect();
    sections.push(format!("Events ({})\n{}", events.len(), lines.join("\n")));
    sections.push(format!(
        "Ledger ({} entries)\n{}",
        outcome.ledger.len(),
        format_ledger_table(&outcome.ledger)
    ));
    sections.push(format!("Audit\n{}", format_audit_table(&outcome.audits)));
    Ok(sections.join("\n\n"))
}
