//! Benchmarks for the per-event hot path: rate lookup, expected-entry
//! computation, reconciliation and a full in-memory dispatch.

use charge_engine::config::{ChargeEngineConfig, EngineSettings, EXAMPLE_CONFIG};
use charge_engine::dispatch::{StaticConfigStore, TriggerDispatcher};
use charge_engine::ledger::{AccountRef, EntityType, InMemoryLedgerStore};
use charge_engine::plugin::monthly_benefit::MonthlyBenefitSettings;
use charge_engine::plugin::MonthlyBenefitChargePlugin;
use charge_engine::rate::{self, RateHistoryEntry};
use charge_engine::reconcile::{self, Expectation};
use charge_engine::registry::PluginRegistry;
use charge_engine::trigger::{TriggerContext, WorkerMonthlyBenefitEvent};
use chrono::{Datelike, Months, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

const BENEFIT: Uuid = Uuid::from_u128(0x0c5a_0f0e_8f4e_4a55_9d7c_2a64_c1f0_b7d3);
const EMPLOYER: Uuid = Uuid::from_u128(0x3b0c_8a9e_4f0e_4c51_8a5f_2d1e_7b9c_6a44);

/// One rate change per month starting January 2000.
fn history(len: u32) -> Vec<RateHistoryEntry> {
    let start = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
    (0..len)
        .map(|i| {
            RateHistoryEntry::new(
                start.checked_add_months(Months::new(i)).unwrap(),
                Decimal::new(1500 + i64::from(i), 2),
            )
        })
        .collect()
}

fn event(month: u32) -> WorkerMonthlyBenefitEvent {
    WorkerMonthlyBenefitEvent {
        record_id: Uuid::from_u128(0xA1),
        worker_id: Uuid::from_u128(0xB1),
        employer_id: EMPLOYER,
        benefit_id: BENEFIT,
        year: 2024,
        month,
        is_deleted: false,
    }
}

fn bench_rate_resolve_by_history_len(c: &mut Criterion) {
    let mut group = c.benchmark_group("rate_resolve");
    for len in [1u32, 12, 120, 600] {
        let history = history(len);
        let last = history[history.len() - 1].effective_date;
        let as_of = NaiveDate::from_ymd_opt(last.year(), last.month(), 15).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(len), &history, |b, history| {
            b.iter(|| black_box(rate::resolve(black_box(history), black_box(as_of))));
        });
    }
    group.finish();
}

fn bench_expected_entry(c: &mut Criterion) {
    let settings = MonthlyBenefitSettings {
        account_id: Uuid::from_u128(0xACC),
        benefit_id: BENEFIT,
        rate_history: history(12),
        description_template: Some("Benefit {benefit} for {worker} - {period}".to_string()),
    };
    let account = AccountRef {
        id: Uuid::from_u128(0xEA),
        account_id: settings.account_id,
        entity_type: EntityType::Employer,
        entity_id: EMPLOYER,
    };
    let event = event(3);

    c.bench_function("monthly_expected_entry", |b| {
        b.iter(|| {
            black_box(MonthlyBenefitChargePlugin::expected_entry(
                "benefit-dental",
                black_box(&settings),
                &account,
                black_box(&event),
            ))
        });
    });
}

fn bench_reconcile_decision(c: &mut Criterion) {
    let settings = MonthlyBenefitSettings {
        account_id: Uuid::from_u128(0xACC),
        benefit_id: BENEFIT,
        rate_history: history(1),
        description_template: None,
    };
    let account = AccountRef {
        id: Uuid::from_u128(0xEA),
        account_id: settings.account_id,
        entity_type: EntityType::Employer,
        entity_id: EMPLOYER,
    };
    let Ok(Expectation::Charge(expected)) =
        MonthlyBenefitChargePlugin::expected_entry("benefit-dental", &settings, &account, &event(3))
    else {
        panic!("expected a charge");
    };

    c.bench_function("reconcile_create", |b| {
        b.iter(|| {
            black_box(reconcile::reconcile(
                "monthly-benefit-charge",
                &expected.charge_key,
                Expectation::Charge(expected.clone()),
                None,
            ))
        });
    });
}

fn bench_dispatch_in_memory(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let config: ChargeEngineConfig = toml::from_str(EXAMPLE_CONFIG).unwrap();

    let ledger = Arc::new(InMemoryLedgerStore::new());
    let registry = Arc::new(PluginRegistry::with_builtin_plugins(ledger.clone()).unwrap());
    let configs = Arc::new(StaticConfigStore::new(config.plugins, &registry));
    let dispatcher = TriggerDispatcher::new(registry, configs, ledger, EngineSettings::default());
    let context = TriggerContext::WorkerMonthlyBenefitSaved(event(3));

    // First dispatch creates the entry; every measured one is a replay.
    runtime.block_on(dispatcher.dispatch(&context)).unwrap();

    c.bench_function("dispatch_replay_unchanged", |b| {
        b.iter(|| black_box(runtime.block_on(dispatcher.dispatch(black_box(&context))).unwrap()));
    });
}

criterion_group!(
    benches,
    bench_rate_resolve_by_history_len,
    bench_expected_entry,
    bench_reconcile_decision,
    bench_dispatch_in_memory,
);
criterion_main!(benches);
