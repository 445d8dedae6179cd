//! Output formatting helpers for CLI commands

use crate::audit::AuditReport;
use crate::dispatch::{DispatchReport, OutcomeStatus};
use crate::ledger::LedgerEntry;
use crate::plugin::{NotificationKind, PluginMetadata};
use crate::reconcile::format_amount;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use serde_json::json;

fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header);
    table
}

/// Format plugins as a table
pub fn format_plugins_table(plugins: &[&PluginMetadata]) -> String {
    let mut table = table(vec!["Id", "Name", "Triggers", "Scope", "Capability", "Settings"]);

    for p in plugins {
        let triggers: Vec<_> = p.trigger_types.iter().map(|t| t.as_str()).collect();
        let settings: Vec<_> = p
            .settings_schema
            .iter()
            .map(|f| {
                if f.required {
                    format!("{} ({})", f.name, f.kind)
                } else {
                    format!("{}? ({})", f.name, f.kind)
                }
            })
            .collect();

        table.add_row(vec![
            Cell::new(p.id),
            Cell::new(p.name),
            Cell::new(triggers.join("\n")),
            Cell::new(p.default_scope),
            Cell::new(p.required_capability.unwrap_or("-")),
            Cell::new(settings.join("\n")),
        ]);
    }

    table.to_string()
}

/// Format plugins as JSON
pub fn format_plugins_json(plugins: &[&PluginMetadata]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&json!({ "plugins": plugins }))
}

/// Format ledger entries as a table
pub fn format_ledger_table(entries: &[LedgerEntry]) -> String {
    let mut table = table(vec!["Plugin", "Charge Key", "Date", "Amount", "Memo"]);

    for e in entries {
        table.add_row(vec![
            Cell::new(&e.plugin_id),
            Cell::new(&e.charge_key),
            Cell::new(e.transaction_date),
            Cell::new(format_amount(e.amount)),
            Cell::new(&e.memo),
        ]);
    }

    table.to_string()
}

/// One line per dispatch outcome, with its notifications indented below.
pub fn format_dispatch_lines(index: usize, report: &DispatchReport) -> Vec<String> {
    let mut lines = Vec::new();
    if report.outcomes.is_empty() {
        lines.push(format!(
            "#{} {} ({}): no matching configs",
            index + 1,
            report.trigger,
            report.serialization_key
        ));
        return lines;
    }

    for outcome in &report.outcomes {
        let status = match outcome.status {
            OutcomeStatus::Applied => "applied".green().to_string(),
            OutcomeStatus::Unchanged => "unchanged".normal().to_string(),
            OutcomeStatus::Skipped => "skipped".yellow().to_string(),
            OutcomeStatus::Failed => "failed".red().to_string(),
        };
        lines.push(format!(
            "#{} {} [{}] {}{}",
            index + 1,
            report.trigger,
            outcome.config_id,
            status,
            outcome
                .message
                .as_deref()
                .filter(|_| outcome.notifications.is_empty())
                .map(|m| format!(": {}", m))
                .unwrap_or_default()
        ));
        for note in &outcome.notifications {
            let marker = match note.kind {
                NotificationKind::Created => "+",
                NotificationKind::Updated => "~",
                NotificationKind::Deleted => "-",
            };
            lines.push(format!("    {} {}", marker, note.message));
        }
    }
    lines
}

/// Format audit reports as a table
pub fn format_audit_table(reports: &[AuditReport]) -> String {
    let mut table = table(vec!["Config", "Plugin", "Entries", "Valid", "Invalid", "Discrepancies"]);

    for r in reports {
        let invalid = if r.invalid > 0 {
            r.invalid.to_string().red().to_string()
        } else {
            r.invalid.to_string()
        };
        let discrepancies: Vec<String> = r
            .discrepancies()
            .flat_map(|result| {
                result
                    .discrepancies
                    .iter()
                    .map(move |d| format!("{}: {}", result.charge_key, d))
            })
            .collect();

        table.add_row(vec![
            Cell::new(&r.config_id),
            Cell::new(&r.plugin_id),
            Cell::new(r.total),
            Cell::new(r.valid),
            Cell::new(invalid),
            Cell::new(discrepancies.join("\n")),
        ]);
    }

    table.to_string()
}
