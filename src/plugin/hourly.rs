//! Fixed hourly rate charge.
//!
//! Charges an employer `hours × rate` for each worker-day of recorded hours,
//! using the rate in effect on the day worked.

use super::settings::{
    self, parse_settings, rate_history_errors, render_description, template_errors, uuid_errors,
    ChargeSettings,
};
use super::{
    ChargePlugin, ExecutionResult, PluginConfig, PluginError, PluginMetadata, PluginScope,
    SettingField, SettingsValidation, VerificationResult,
};
use crate::ledger::{AccountRef, EntityType, LedgerEntry, LedgerStore, ReferenceType};
use crate::rate::{self, RateHistoryEntry, ResolvedRate};
use crate::reconcile::{self, ChargeMetadata, Expectation, ExpectedEntry};
use crate::trigger::{period_label, TriggerContext, TriggerType, WorkerHoursEvent};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

pub const PLUGIN_ID: &str = "hourly-rate";

const DEFAULT_TEMPLATE: &str = "Hourly charge - {hours} hours on {date}";
const TEMPLATE_VARS: &[&str] = &["period", "worker", "employer", "rate", "hours", "date"];

/// Settings for [`HourlyRatePlugin`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HourlyRateSettings {
    pub account_id: Uuid,
    pub rate_history: Vec<RateHistoryEntry>,
    #[serde(default)]
    pub description_template: Option<String>,
}

impl ChargeSettings for HourlyRateSettings {
    fn semantic_errors(&self) -> Vec<String> {
        let mut errors = uuid_errors("accountId", &self.account_id);
        errors.extend(rate_history_errors(&self.rate_history));
        errors.extend(template_errors(
            self.description_template.as_deref(),
            TEMPLATE_VARS,
        ));
        errors
    }
}

pub struct HourlyRatePlugin {
    metadata: PluginMetadata,
    ledger: Arc<dyn LedgerStore>,
}

impl HourlyRatePlugin {
    pub fn new(ledger: Arc<dyn LedgerStore>) -> Self {
        Self {
            metadata: PluginMetadata {
                id: PLUGIN_ID,
                name: "Hourly Rate",
                description: "Charges the employer a fixed rate per hour worked",
                trigger_types: vec![TriggerType::WorkerHoursSaved],
                default_scope: PluginScope::Employer,
                required_capability: Some("ledger"),
                settings_schema: vec![
                    SettingField {
                        name: "accountId",
                        kind: "uuid",
                        required: true,
                        description: "Ledger account the charge is posted to",
                    },
                    SettingField {
                        name: "rateHistory",
                        kind: "array<{effectiveDate: date, rate: decimal}>",
                        required: true,
                        description: "Effective-dated hourly rates",
                    },
                    SettingField {
                        name: "descriptionTemplate",
                        kind: "string",
                        required: false,
                        description: "Memo template; placeholders {period} {worker} {employer} {rate} {hours} {date}",
                    },
                ],
            },
            ledger,
        }
    }

    /// One entry per hours record: `config:account:worker:year:month:day:hours`.
    pub fn charge_key(config_id: &str, account: &AccountRef, event: &WorkerHoursEvent) -> String {
        format!(
            "{}:{}:{}:{}:{}:{}:{}",
            config_id,
            account.id,
            event.worker_id,
            event.year,
            event.month,
            event.day,
            event.hours_id
        )
    }

    fn work_date(event: &WorkerHoursEvent) -> Result<NaiveDate, PluginError> {
        event.work_date().ok_or_else(|| {
            PluginError::InvalidTrigger(format!(
                "invalid work date {}-{}-{}",
                event.year, event.month, event.day
            ))
        })
    }

    pub fn expected_entry(
        config_id: &str,
        settings: &HourlyRateSettings,
        account: &AccountRef,
        event: &WorkerHoursEvent,
    ) -> Result<Expectation, PluginError> {
        let work_date = Self::work_date(event)?;

        if event.is_deleted {
            return Ok(Expectation::NoCharge(format!(
                "Hours for {} were deleted",
                work_date
            )));
        }
        if event.hours <= Decimal::ZERO {
            return Ok(Expectation::NoCharge(format!(
                "No hours recorded for {}",
                work_date
            )));
        }

        let rate = match rate::classify(&settings.rate_history, work_date) {
            ResolvedRate::NotFound => {
                return Ok(Expectation::NoCharge(format!(
                    "No hourly rate in effect on {}",
                    work_date
                )))
            }
            ResolvedRate::Zero(_) => {
                return Ok(Expectation::NoCharge(format!(
                    "Hourly rate on {} is zero",
                    work_date
                )))
            }
            ResolvedRate::Charge(entry) => entry,
        };

        let amount = event
            .hours
            .checked_mul(rate.rate)
            .ok_or_else(|| {
                PluginError::InvalidTrigger(format!(
                    "{} hours at {} overflows the charge amount",
                    event.hours, rate.rate
                ))
            })?
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        let template = settings
            .description_template
            .as_deref()
            .unwrap_or(DEFAULT_TEMPLATE);
        let description = render_description(
            template,
            &[
                ("period", period_label(work_date)),
                ("worker", event.worker_id.to_string()),
                ("employer", event.employer_id.to_string()),
                ("rate", format!("{:.2}", rate.rate)),
                ("hours", event.hours.normalize().to_string()),
                ("date", work_date.to_string()),
            ],
        );
        let metadata = ChargeMetadata {
            config_id: config_id.to_string(),
            trigger: TriggerContext::WorkerHoursSaved(event.clone()),
            rate: rate.rate,
            rate_effective_date: rate.effective_date,
        };

        Ok(Expectation::Charge(ExpectedEntry {
            charge_key: Self::charge_key(config_id, account, event),
            amount,
            description,
            transaction_date: work_date,
            account: account.clone(),
            reference_type: ReferenceType::WorkerHours,
            reference_id: event.hours_id,
            metadata: metadata.to_value()?,
        }))
    }

    async fn run(
        &self,
        context: &TriggerContext,
        config: &PluginConfig,
    ) -> Result<ExecutionResult, PluginError> {
        let TriggerContext::WorkerHoursSaved(event) = context else {
            return Err(PluginError::UnsupportedTrigger {
                plugin_id: PLUGIN_ID.to_string(),
                trigger: context.trigger_type(),
            });
        };
        let settings: HourlyRateSettings =
            parse_settings(&config.settings).map_err(PluginError::InvalidSettings)?;
        Self::work_date(event)?;

        let account = self
            .ledger
            .resolve_account(EntityType::Employer, event.employer_id, settings.account_id)
            .await?;
        let charge_key = Self::charge_key(&config.id, &account, event);
        let expectation = Self::expected_entry(&config.id, &settings, &account, event)?;
        let existing = self.ledger.get_by_key(PLUGIN_ID, &charge_key).await?;
        let expectation = reconcile::scope_to_record(
            expectation,
            existing.as_ref(),
            ReferenceType::WorkerHours,
            event.hours_id,
            event.is_deleted,
        );

        Ok(reconcile::reconcile(
            PLUGIN_ID,
            &charge_key,
            expectation,
            existing.as_ref(),
        ))
    }

    fn recompute(
        &self,
        entry: &LedgerEntry,
        config: &PluginConfig,
    ) -> Result<Expectation, PluginError> {
        let settings: HourlyRateSettings =
            parse_settings(&config.settings).map_err(PluginError::InvalidSettings)?;
        let metadata = ChargeMetadata::from_entry(entry)?;
        let TriggerContext::WorkerHoursSaved(event) = &metadata.trigger else {
            return Err(PluginError::InvalidMetadata(format!(
                "entry {} was not produced by a {} trigger",
                entry.id,
                TriggerType::WorkerHoursSaved
            )));
        };
        Self::expected_entry(&config.id, &settings, &entry.account, event)
    }
}

#[async_trait]
impl ChargePlugin for HourlyRatePlugin {
    fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    fn validate_settings(&self, raw: &serde_json::Value) -> SettingsValidation {
        settings::validate::<HourlyRateSettings>(raw)
    }

    async fn execute(&self, context: &TriggerContext, config: &PluginConfig) -> ExecutionResult {
        reconcile::guarded(&self.metadata, context, config, self.run(context, config)).await
    }

    fn verify_entry(&self, entry: &LedgerEntry, config: &PluginConfig) -> VerificationResult {
        crate::audit::compare(entry, self.recompute(entry, config))
    }
}
