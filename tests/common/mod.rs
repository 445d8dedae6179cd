//! Shared test utilities for charge engine integration tests.
//!
//! Provides builders for events, plugin configs and a fully wired
//! dispatcher over an in-memory ledger.

#![allow(dead_code)]

use charge_engine::config::EngineSettings;
use charge_engine::dispatch::{StaticConfigStore, TriggerDispatcher};
use charge_engine::ledger::InMemoryLedgerStore;
use charge_engine::plugin::{PluginConfig, PluginScope};
use charge_engine::registry::PluginRegistry;
use charge_engine::trigger::{TriggerContext, WorkerHoursEvent, WorkerMonthlyBenefitEvent};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

// =============================================================================
// Well-Known Test Identifiers
// =============================================================================

pub const ACCOUNT: Uuid = Uuid::from_u128(0x6f1c_1f4e_3c1a_4d0e_9a59_0b0f_7f4a_6a11);
pub const DENTAL: Uuid = Uuid::from_u128(0x0c5a_0f0e_8f4e_4a55_9d7c_2a64_c1f0_b7d3);
pub const VISION: Uuid = Uuid::from_u128(0x1d6b_1f1f_9f5f_4b66_8e8d_3b75_d201_c8e4);
pub const EMPLOYER: Uuid = Uuid::from_u128(0x3b0c_8a9e_4f0e_4c51_8a5f_2d1e_7b9c_6a44);
pub const OTHER_EMPLOYER: Uuid = Uuid::from_u128(0x9a7e_2c4d_1b3f_4e5a_8c6d_7f8e_9a0b_1c2d);

pub fn worker(n: u128) -> Uuid {
    Uuid::from_u128(0x5000 + n)
}

// =============================================================================
// Config Builders
// =============================================================================

/// Monthly benefit config charging `rates` as `(effective date, rate)`.
pub fn benefit_config(id: &str, benefit_id: Uuid, rates: &[(&str, &str)]) -> PluginConfig {
    PluginConfig {
        id: id.to_string(),
        plugin_id: "monthly-benefit-charge".to_string(),
        scope: PluginScope::Global,
        employer_id: None,
        enabled: true,
        settings: serde_json::json!({
            "accountId": ACCOUNT,
            "benefitId": benefit_id,
            "rateHistory": rate_history(rates),
        }),
    }
}

/// Hourly config bound to [`EMPLOYER`].
pub fn hourly_config(id: &str, rates: &[(&str, &str)]) -> PluginConfig {
    PluginConfig {
        id: id.to_string(),
        plugin_id: "hourly-rate".to_string(),
        scope: PluginScope::Employer,
        employer_id: Some(EMPLOYER),
        enabled: true,
        settings: serde_json::json!({
            "accountId": ACCOUNT,
            "rateHistory": rate_history(rates),
        }),
    }
}

fn rate_history(rates: &[(&str, &str)]) -> serde_json::Value {
    rates
        .iter()
        .map(|(date, rate)| serde_json::json!({"effectiveDate": date, "rate": rate}))
        .collect()
}

// =============================================================================
// Event Builders
// =============================================================================

pub fn benefit_event(
    record: u128,
    worker_id: Uuid,
    benefit_id: Uuid,
    year: i32,
    month: u32,
) -> TriggerContext {
    TriggerContext::WorkerMonthlyBenefitSaved(WorkerMonthlyBenefitEvent {
        record_id: Uuid::from_u128(0xA000 + record),
        worker_id,
        employer_id: EMPLOYER,
        benefit_id,
        year,
        month,
        is_deleted: false,
    })
}

pub fn deleted(context: TriggerContext) -> TriggerContext {
    match context {
        TriggerContext::WorkerMonthlyBenefitSaved(e) => {
            TriggerContext::WorkerMonthlyBenefitSaved(WorkerMonthlyBenefitEvent {
                is_deleted: true,
                ..e
            })
        }
        TriggerContext::WorkerHoursSaved(e) => {
            TriggerContext::WorkerHoursSaved(WorkerHoursEvent {
                is_deleted: true,
                ..e
            })
        }
    }
}

/// Hours for one worker on one day; the record id is derived from both.
pub fn hours_event(worker_id: Uuid, date: (i32, u32, u32), hours: Decimal) -> TriggerContext {
    let day = (date.0 as u128) * 10_000 + (date.1 as u128) * 100 + date.2 as u128;
    TriggerContext::WorkerHoursSaved(WorkerHoursEvent {
        hours_id: Uuid::from_u128((worker_id.as_u128() << 32) | day),
        worker_id,
        employer_id: EMPLOYER,
        year: date.0,
        month: date.1,
        day: date.2,
        hours,
        is_deleted: false,
    })
}

// =============================================================================
// Engine
// =============================================================================

/// A dispatcher wired to a fresh in-memory ledger.
pub struct Engine {
    pub ledger: Arc<InMemoryLedgerStore>,
    pub registry: Arc<PluginRegistry>,
    pub dispatcher: Arc<TriggerDispatcher>,
}

pub fn engine(configs: Vec<PluginConfig>) -> Engine {
    engine_with(configs, EngineSettings::default())
}

pub fn engine_with(configs: Vec<PluginConfig>, settings: EngineSettings) -> Engine {
    let ledger = Arc::new(InMemoryLedgerStore::new());
    engine_on(ledger, configs, settings)
}

/// A second engine over an existing ledger, e.g. after a config edit.
pub fn engine_on(
    ledger: Arc<InMemoryLedgerStore>,
    configs: Vec<PluginConfig>,
    settings: EngineSettings,
) -> Engine {
    let registry = Arc::new(
        PluginRegistry::with_builtin_plugins(ledger.clone()).expect("builtin plugins register"),
    );
    let config_store = Arc::new(StaticConfigStore::new(configs, &registry));
    let dispatcher = Arc::new(TriggerDispatcher::new(
        registry.clone(),
        config_store,
        ledger.clone(),
        settings,
    ));
    Engine {
        ledger,
        registry,
        dispatcher,
    }
}
