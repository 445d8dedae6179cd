//! Plugin factory for creating ChargePlugin trait objects by id.

use super::{hourly, monthly_benefit, ChargePlugin, HourlyRatePlugin, MonthlyBenefitChargePlugin};
use super::PluginError;
use crate::ledger::LedgerStore;
use std::sync::Arc;

/// Ids of every plugin this crate ships, in registration order.
pub const BUILTIN_PLUGIN_IDS: &[&str] = &[monthly_benefit::PLUGIN_ID, hourly::PLUGIN_ID];

/// Create a built-in plugin by id.
///
/// # Examples
///
/// ```
/// use charge_engine::ledger::InMemoryLedgerStore;
/// use charge_engine::plugin::factory::create_plugin;
/// use std::sync::Arc;
///
/// let ledger = Arc::new(InMemoryLedgerStore::new());
/// let plugin = create_plugin("hourly-rate", ledger).unwrap();
/// assert_eq!(plugin.id(), "hourly-rate");
/// ```
pub fn create_plugin(
    id: &str,
    ledger: Arc<dyn LedgerStore>,
) -> Result<Arc<dyn ChargePlugin>, PluginError> {
    match id {
        monthly_benefit::PLUGIN_ID => Ok(Arc::new(MonthlyBenefitChargePlugin::new(ledger))),
        hourly::PLUGIN_ID => Ok(Arc::new(HourlyRatePlugin::new(ledger))),
        other => Err(PluginError::UnknownPlugin(other.to_string())),
    }
}

/// All built-in plugins sharing one ledger handle.
pub fn builtin_plugins(ledger: Arc<dyn LedgerStore>) -> Vec<Arc<dyn ChargePlugin>> {
    BUILTIN_PLUGIN_IDS
        .iter()
        .filter_map(|id| create_plugin(id, ledger.clone()).ok())
        .collect()
}
