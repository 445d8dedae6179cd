//! Settings parsing and validation shared by the built-in plugins.
//!
//! Settings arrive as opaque JSON. Validation is two-phase: a structural
//! pass (serde decoding into the plugin's typed settings, which also checks
//! UUID and date formats) and a semantic pass over the decoded value.

use super::SettingsValidation;
use crate::rate::RateHistoryEntry;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// Typed settings of one plugin.
pub trait ChargeSettings: DeserializeOwned {
    /// Semantic checks that run after a successful decode.
    fn semantic_errors(&self) -> Vec<String>;
}

/// Decode and validate raw settings.
pub fn parse_settings<T: ChargeSettings>(raw: &serde_json::Value) -> Result<T, Vec<String>> {
    if raw.is_null() {
        return Err(vec!["settings are required".to_string()]);
    }
    let settings: T = serde_json::from_value(raw.clone()).map_err(|e| vec![e.to_string()])?;
    let errors = settings.semantic_errors();
    if errors.is_empty() {
        Ok(settings)
    } else {
        Err(errors)
    }
}

/// Run both validation phases and report the outcome as a value.
pub fn validate<T: ChargeSettings>(raw: &serde_json::Value) -> SettingsValidation {
    match parse_settings::<T>(raw) {
        Ok(_) => SettingsValidation::ok(),
        Err(errors) => SettingsValidation::from_errors(errors),
    }
}

pub(crate) fn uuid_errors(field: &str, value: &Uuid) -> Vec<String> {
    if value.is_nil() {
        vec![format!("{} must not be the nil UUID", field)]
    } else {
        Vec::new()
    }
}

pub(crate) fn rate_history_errors(history: &[RateHistoryEntry]) -> Vec<String> {
    let mut errors = Vec::new();
    if history.is_empty() {
        errors.push("rateHistory must contain at least one entry".to_string());
    }
    for (i, entry) in history.iter().enumerate() {
        if entry.rate < Decimal::ZERO {
            errors.push(format!(
                "rateHistory[{}].rate must not be negative (got {})",
                i, entry.rate
            ));
        }
    }
    errors
}

pub(crate) fn template_errors(template: Option<&str>, allowed: &[&str]) -> Vec<String> {
    let Some(template) = template else {
        return Vec::new();
    };
    if template.trim().is_empty() {
        return vec!["descriptionTemplate must not be empty".to_string()];
    }
    placeholders(template)
        .into_iter()
        .filter(|name| !allowed.contains(name))
        .map(|name| format!("descriptionTemplate has unknown placeholder {{{}}}", name))
        .collect()
}

fn placeholders(template: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) => {
                names.push(&after[..end]);
                rest = &after[end + 1..];
            }
            None => break,
        }
    }
    names
}

/// Substitute `{name}` placeholders in `template`.
pub fn render_description(template: &str, vars: &[(&str, String)]) -> String {
    vars.iter().fold(template.to_string(), |text, (name, value)| {
        text.replace(&format!("{{{}}}", name), value)
    })
}
