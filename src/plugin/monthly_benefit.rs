//! Monthly flat benefit charge.
//!
//! Charges an employer a flat monthly amount for every worker enrolled in a
//! configured benefit. The rate is effective-dated and resolved at the first
//! day of the benefit month. One entry exists per (config, employer account,
//! worker, year, month).

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
use crate::trigger::{period_label, TriggerContext, TriggerType, WorkerMonthlyBenefitEvent};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

pub const PLUGIN_ID: &str = "monthly-benefit-charge";

const DEFAULT_TEMPLATE: &str = "Monthly benefit charge - {period}";
const TEMPLATE_VARS: &[&str] = &["period", "worker", "employer", "benefit", "rate", "date"];

/// Settings for [`MonthlyBenefitChargePlugin`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MonthlyBenefitSettings {
    /// Ledger account charged
    pub account_id: Uuid,
    /// Only enrollments in this benefit are charged
    pub benefit_id: Uuid,
    pub rate_history: Vec<RateHistoryEntry>,
    #[serde(default)]
    pub description_template: Option<String>,
}

impl ChargeSettings for MonthlyBenefitSettings {
    fn semantic_errors(&self) -> Vec<String> {
        let mut errors = uuid_errors("accountId", &self.account_id);
        errors.extend(uuid_errors("benefitId", &self.benefit_id));
        errors.extend(rate_history_errors(&self.rate_history));
        errors.extend(template_errors(
            self.description_template.as_deref(),
            TEMPLATE_VARS,
        ));
        errors
    }
}

/// Flat monthly charge per enrolled worker.
pub struct MonthlyBenefitChargePlugin {
    metadata: PluginMetadata,
    ledger: Arc<dyn LedgerStore>,
}

impl MonthlyBenefitChargePlugin {
    pub fn new(ledger: Arc<dyn LedgerStore>) -> Self {
        Self {
            metadata: PluginMetadata {
                id: PLUGIN_ID,
                name: "Monthly Benefit Charge",
                description: "Flat monthly charge to the employer for each worker enrolled in a benefit",
                trigger_types: vec![TriggerType::WorkerMonthlyBenefitSaved],
                default_scope: PluginScope::Global,
                required_capability: Some("ledger"),
                settings_schema: vec![
                    SettingField {
                        name: "accountId",
                        kind: "uuid",
                        required: true,
                        description: "Ledger account the charge is posted to",
                    },
                    SettingField {
                        name: "benefitId",
                        kind: "uuid",
                        required: true,
                        description: "Benefit whose enrollments are charged",
                    },
                    SettingField {
                        name: "rateHistory",
                        kind: "array<{effectiveDate: date, rate: decimal}>",
                        required: true,
                        description: "Effective-dated monthly rates",
                    },
                    SettingField {
                        name: "descriptionTemplate",
                        kind: "string",
                        required: false,
                        description: "Memo template; placeholders {period} {worker} {employer} {benefit} {rate} {date}",
                    },
                ],
            },
            ledger,
        }
    }

    /// Deterministic key of the entry owned by this config and event.
    pub fn charge_key(
        config_id: &str,
        account: &AccountRef,
        event: &WorkerMonthlyBenefitEvent,
    ) -> String {
        format!(
            "{}:{}:{}:{}:{}",
            config_id, account.id, event.worker_id, event.year, event.month
        )
    }

    fn period_start(event: &WorkerMonthlyBenefitEvent) -> Result<NaiveDate, PluginError> {
        event.period_start().ok_or_else(|| {
            PluginError::InvalidTrigger(format!(
                "invalid benefit period {}-{}",
                event.year, event.month
            ))
        })
    }

    /// Compute the expected entry from the event and settings alone.
    pub fn expected_entry(
        config_id: &str,
        settings: &MonthlyBenefitSettings,
        account: &AccountRef,
        event: &WorkerMonthlyBenefitEvent,
    ) -> Result<Expectation, PluginError> {
        let period = Self::period_start(event)?;
        let label = period_label(period);

        if event.benefit_id != settings.benefit_id {
            return Ok(Expectation::NotApplicable(format!(
                "Benefit {} is not charged by config {}",
                event.benefit_id, config_id
            )));
        }
        if event.is_deleted {
            return Ok(Expectation::NoCharge(format!(
                "Benefit enrollment for {} was deleted",
                label
            )));
        }

        let rate = match rate::classify(&settings.rate_history, period) {
            ResolvedRate::NotFound => {
                return Ok(Expectation::NoCharge(format!("No rate in effect for {}", label)))
            }
            ResolvedRate::Zero(_) => {
                return Ok(Expectation::NoCharge(format!("Rate for {} is zero", label)))
            }
            ResolvedRate::Charge(entry) => entry,
        };

        let amount = rate.rate.round_dp_with_strategy(
            2,
            rust_decimal::RoundingStrategy::MidpointAwayFromZero,
        );
        let template = settings
            .description_template
            .as_deref()
            .unwrap_or(DEFAULT_TEMPLATE);
        let description = render_description(
            template,
            &[
                ("period", label),
                ("worker", event.worker_id.to_string()),
                ("employer", event.employer_id.to_string()),
                ("benefit", event.benefit_id.to_string()),
                ("rate", format!("{:.2}", rate.rate)),
                ("date", period.to_string()),
            ],
        );
        let metadata = ChargeMetadata {
            config_id: config_id.to_string(),
            trigger: TriggerContext::WorkerMonthlyBenefitSaved(event.clone()),
            rate: rate.rate,
            rate_effective_date: rate.effective_date,
        };

        Ok(Expectation::Charge(ExpectedEntry {
            charge_key: Self::charge_key(config_id, account, event),
            amount,
            description,
            transaction_date: period,
            account: account.clone(),
            reference_type: ReferenceType::WorkerMonthlyBenefit,
            reference_id: event.record_id,
            metadata: metadata.to_value()?,
        }))
    }

    async fn run(
        &self,
        context: &TriggerContext,
        config: &PluginConfig,
    ) -> Result<ExecutionResult, PluginError> {
        let TriggerContext::WorkerMonthlyBenefitSaved(event) = context else {
            return Err(PluginError::UnsupportedTrigger {
                plugin_id: PLUGIN_ID.to_string(),
                trigger: context.trigger_type(),
            });
        };
        let settings: MonthlyBenefitSettings =
            parse_settings(&config.settings).map_err(PluginError::InvalidSettings)?;
        Self::period_start(event)?;

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
            ReferenceType::WorkerMonthlyBenefit,
            event.record_id,
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
        let settings: MonthlyBenefitSettings =
            parse_settings(&config.settings).map_err(PluginError::InvalidSettings)?;
        let metadata = ChargeMetadata::from_entry(entry)?;
        let TriggerContext::WorkerMonthlyBenefitSaved(event) = &metadata.trigger else {
            return Err(PluginError::InvalidMetadata(format!(
                "entry {} was not produced by a {} trigger",
                entry.id,
                TriggerType::WorkerMonthlyBenefitSaved
            )));
        };
        Self::expected_entry(&config.id, &settings, &entry.account, event)
    }
}

#[async_trait]
impl ChargePlugin for MonthlyBenefitChargePlugin {
    fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    fn validate_settings(&self, raw: &serde_json::Value) -> SettingsValidation {
        settings::validate::<MonthlyBenefitSettings>(raw)
    }

    async fn execute(&self, context: &TriggerContext, config: &PluginConfig) -> ExecutionResult {
        reconcile::guarded(&self.metadata, context, config, self.run(context, config)).await
    }

    fn verify_entry(&self, entry: &LedgerEntry, config: &PluginConfig) -> VerificationResult {
        crate::audit::compare(entry, self.recompute(entry, config))
    }
}
