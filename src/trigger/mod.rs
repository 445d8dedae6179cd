//! Trigger contexts.
//!
//! A trigger is an immutable description of a domain event that may cause a
//! charge to be created, changed or removed. Trigger kinds form a closed set;
//! adding one means extending [`TriggerContext`] and every exhaustive match.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Discriminant of [`TriggerContext`], used for routing and config lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TriggerType {
    /// A worker-hours record was saved or deleted
    WorkerHoursSaved,
    /// A worker monthly benefit record was saved or deleted
    WorkerMonthlyBenefitSaved,
}

impl TriggerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerType::WorkerHoursSaved => "worker-hours-saved",
            TriggerType::WorkerMonthlyBenefitSaved => "worker-monthly-benefit-saved",
        }
    }

    pub fn all() -> [TriggerType; 2] {
        [
            TriggerType::WorkerHoursSaved,
            TriggerType::WorkerMonthlyBenefitSaved,
        ]
    }
}

impl fmt::Display for TriggerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TriggerType::all()
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("Unknown trigger type: {}", s))
    }
}

/// Hours worked by one worker on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerHoursEvent {
    pub hours_id: Uuid,
    pub worker_id: Uuid,
    pub employer_id: Uuid,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hours: Decimal,
    #[serde(default)]
    pub is_deleted: bool,
}

impl WorkerHoursEvent {
    /// The day the hours were worked, if the triple is a real date.
    pub fn work_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
    }
}

/// One worker enrolled in one benefit for one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerMonthlyBenefitEvent {
    /// Id of the worker monthly benefit record that changed
    pub record_id: Uuid,
    pub worker_id: Uuid,
    pub employer_id: Uuid,
    pub benefit_id: Uuid,
    pub year: i32,
    pub month: u32,
    #[serde(default)]
    pub is_deleted: bool,
}

impl WorkerMonthlyBenefitEvent {
    /// First day of the benefit month, if `year`/`month` are valid.
    pub fn period_start(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }
}

/// An immutable domain event, constructed once per occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TriggerContext {
    WorkerHoursSaved(WorkerHoursEvent),
    WorkerMonthlyBenefitSaved(WorkerMonthlyBenefitEvent),
}

impl TriggerContext {
    pub fn trigger_type(&self) -> TriggerType {
        match self {
            TriggerContext::WorkerHoursSaved(_) => TriggerType::WorkerHoursSaved,
            TriggerContext::WorkerMonthlyBenefitSaved(_) => TriggerType::WorkerMonthlyBenefitSaved,
        }
    }

    pub fn worker_id(&self) -> Uuid {
        match self {
            TriggerContext::WorkerHoursSaved(e) => e.worker_id,
            TriggerContext::WorkerMonthlyBenefitSaved(e) => e.worker_id,
        }
    }

    pub fn employer_id(&self) -> Uuid {
        match self {
            TriggerContext::WorkerHoursSaved(e) => e.employer_id,
            TriggerContext::WorkerMonthlyBenefitSaved(e) => e.employer_id,
        }
    }

    pub fn is_deletion(&self) -> bool {
        match self {
            TriggerContext::WorkerHoursSaved(e) => e.is_deleted,
            TriggerContext::WorkerMonthlyBenefitSaved(e) => e.is_deleted,
        }
    }

    /// Date rates are resolved at: the worked day, or the first of the
    /// benefit month. `None` when the event carries an impossible date.
    pub fn as_of(&self) -> Option<NaiveDate> {
        match self {
            TriggerContext::WorkerHoursSaved(e) => e.work_date(),
            TriggerContext::WorkerMonthlyBenefitSaved(e) => e.period_start(),
        }
    }

    /// Natural business key of the event.
    ///
    /// Two events with the same serialization key can touch the same ledger
    /// entry for a given plugin config, so the dispatcher never processes
    /// them concurrently.
    pub fn serialization_key(&self) -> String {
        match self {
            TriggerContext::WorkerHoursSaved(e) => format!(
                "hours:{}:{}:{}:{}",
                e.worker_id, e.year, e.month, e.day
            ),
            TriggerContext::WorkerMonthlyBenefitSaved(e) => {
                format!("benefit:{}:{}:{}", e.worker_id, e.year, e.month)
            }
        }
    }
}

/// Human-readable billing period, e.g. "March 2024".
pub fn period_label(date: NaiveDate) -> String {
    date.format("%B %Y").to_string()
}
