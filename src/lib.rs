//! Charge engine - plugin-driven ledger charge reconciliation
//!
//! Domain events (hours saved, benefit enrollments saved) are routed to
//! configured charge plugins. Each plugin computes the ledger entry that
//! should exist for the event, compares it with what is stored under a
//! deterministic charge key, and emits the one transaction that converges
//! the two. Replaying an event any number of times leaves
//! the ledger unchanged after the first application.

pub mod audit;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod ledger;
pub mod logging;
pub mod plugin;
pub mod rate;
pub mod reconcile;
pub mod registry;
pub mod trigger;

pub use audit::AuditReport;
pub use dispatch::{DispatchReport, TriggerDispatcher};
pub use plugin::{ChargePlugin, ExecutionResult, PluginConfig};
pub use registry::PluginRegistry;
pub use trigger::TriggerContext;
