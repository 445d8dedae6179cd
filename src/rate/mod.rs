//! Effective-dated rate resolution.
//!
//! Plugins keep their rates as a history of `(effective date, rate)` pairs so
//! that a retroactive rate change is a settings edit rather than a data
//! migration. Resolution picks the entry in force on a given date.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One `(effective date, rate)` pair from a plugin's settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateHistoryEntry {
    /// First day on which `rate` applies
    pub effective_date: NaiveDate,
    /// Rate in force from `effective_date` until superseded
    pub rate: Decimal,
}

impl RateHistoryEntry {
    pub fn new(effective_date: NaiveDate, rate: Decimal) -> Self {
        Self {
            effective_date,
            rate,
        }
    }
}

/// Resolve the rate in force on `as_of`.
///
/// Selects the entry with the latest `effective_date <= as_of`. The history
/// does not need to be sorted. When several entries share the winning
/// effective date, the one appearing last in `history` wins.
///
/// Returns `None` when every entry takes effect after `as_of`. A returned
/// entry with a zero rate is a valid "no charge this period" answer and is
/// distinct from `None`.
///
/// # Examples
///
/// ```
/// use charge_engine::rate::{resolve, RateHistoryEntry};
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
///
/// let history = vec![
///     RateHistoryEntry::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), Decimal::new(1000, 2)),
///     RateHistoryEntry::new(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(), Decimal::new(1200, 2)),
/// ];
///
/// let may = NaiveDate::from_ymd_opt(2024, 5, 31).unwrap();
/// assert_eq!(resolve(&history, may).unwrap().rate, Decimal::new(1000, 2));
/// ```
pub fn resolve(history: &[RateHistoryEntry], as_of: NaiveDate) -> Option<&RateHistoryEntry> {
    history
        .iter()
        .filter(|entry| entry.effective_date <= as_of)
        .fold(None, |best: Option<&RateHistoryEntry>, entry| match best {
            // Strictly later wins; equal dates fall through so the later input wins.
            Some(current) if current.effective_date > entry.effective_date => Some(current),
            _ => Some(entry),
        })
}

/// Outcome of resolving a rate, with the zero-rate case made explicit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedRate<'a> {
    /// No entry is in force on the requested date
    NotFound,
    /// An entry is in force but its rate is zero
    Zero(&'a RateHistoryEntry),
    /// A positive (or negative, for credits) rate is in force
    Charge(&'a RateHistoryEntry),
}

/// Resolve and classify the rate in force on `as_of`.
pub fn classify(history: &[RateHistoryEntry], as_of: NaiveDate) -> ResolvedRate<'_> {
    match resolve(history, as_of) {
        None => ResolvedRate::NotFound,
        Some(entry) if entry.rate.is_zero() => ResolvedRate::Zero(entry),
        Some(entry) => ResolvedRate::Charge(entry),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn boundary_history() -> Vec<RateHistoryEntry> {
        vec![
            RateHistoryEntry::new(date(2024, 1, 1), dec!(10.00)),
            RateHistoryEntry::new(date(2024, 6, 1), dec!(12.00)),
        ]
    }

    #[test]
    fn test_resolve_day_before_change_uses_old_rate() {
        let history = boundary_history();
        assert_eq!(resolve(&history, date(2024, 5, 31)).unwrap().rate, dec!(10.00));
    }

    #[test]
    fn test_resolve_on_effective_date_uses_new_rate() {
        let history = boundary_history();
        assert_eq!(resolve(&history, date(2024, 6, 1)).unwrap().rate, dec!(12.00));
    }

    #[test]
    fn test_resolve_before_first_entry_is_none() {
        let history = boundary_history();
        assert!(resolve(&history, date(2023, 12, 31)).is_none());
    }

    #[test]
    fn test_resolve_empty_history_is_none() {
        assert!(resolve(&[], date(2024, 1, 1)).is_none());
    }

    #[test]
    fn test_resolve_unsorted_history() {
        let history = vec![
            RateHistoryEntry::new(date(2024, 6, 1), dec!(12.00)),
            RateHistoryEntry::new(date(2023, 1, 1), dec!(8.00)),
            RateHistoryEntry::new(date(2024, 1, 1), dec!(10.00)),
        ];
        assert_eq!(resolve(&history, date(2024, 3, 15)).unwrap().rate, dec!(10.00));
        assert_eq!(resolve(&history, date(2023, 7, 1)).unwrap().rate, dec!(8.00));
        assert_eq!(resolve(&history, date(2030, 1, 1)).unwrap().rate, dec!(12.00));
    }

    #[test]
    fn test_resolve_same_effective_date_last_in_input_wins() {
        let history = vec![
            RateHistoryEntry::new(date(2024, 1, 1), dec!(10.00)),
            RateHistoryEntry::new(date(2024, 1, 1), dec!(11.00)),
        ];
        assert_eq!(resolve(&history, date(2024, 2, 1)).unwrap().rate, dec!(11.00));

        let reversed: Vec<_> = history.into_iter().rev().collect();
        assert_eq!(resolve(&reversed, date(2024, 2, 1)).unwrap().rate, dec!(10.00));
    }

    #[test]
    fn test_resolve_tie_does_not_beat_later_date() {
        let history = vec![
            RateHistoryEntry::new(date(2024, 6, 1), dec!(12.00)),
            RateHistoryEntry::new(date(2024, 1, 1), dec!(10.00)),
            RateHistoryEntry::new(date(2024, 1, 1), dec!(11.00)),
        ];
        assert_eq!(resolve(&history, date(2024, 7, 1)).unwrap().rate, dec!(12.00));
    }

    #[test]
    fn test_classify_zero_rate_is_distinct_from_not_found() {
        let history = vec![
            RateHistoryEntry::new(date(2024, 1, 1), dec!(15.00)),
            RateHistoryEntry::new(date(2024, 4, 1), dec!(0.00)),
        ];
        assert_eq!(classify(&history, date(2023, 1, 1)), ResolvedRate::NotFound);
        assert!(matches!(classify(&history, date(2024, 2, 1)), ResolvedRate::Charge(_)));
        assert!(matches!(classify(&history, date(2024, 4, 1)), ResolvedRate::Zero(_)));
    }

    #[test]
    fn test_rate_history_entry_serde_camel_case() {
        let json = r#"{"effectiveDate":"2024-01-01","rate":"15.00"}"#;
        let entry: RateHistoryEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.effective_date, date(2024, 1, 1));
        assert_eq!(entry.rate, dec!(15.00));

        let numeric: RateHistoryEntry =
            serde_json::from_str(r#"{"effectiveDate":"2024-01-01","rate":15.5}"#).unwrap();
        assert_eq!(numeric.rate, dec!(15.5));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn arb_history() -> impl Strategy<Value = Vec<(i64, i64)>> {
            proptest::collection::vec((0i64..2000, 0i64..100_000), 0..20)
        }

        proptest! {
            #[test]
            fn prop_resolved_entry_is_latest_not_after_as_of(raw in arb_history(), offset in 0i64..2000) {
                let base = date(2020, 1, 1);
                let history: Vec<_> = raw
                    .iter()
                    .map(|(days, cents)| RateHistoryEntry::new(
                        base + chrono::Duration::days(*days),
                        Decimal::new(*cents, 2),
                    ))
                    .collect();
                let as_of = base + chrono::Duration::days(offset);

                match resolve(&history, as_of) {
                    None => prop_assert!(history.iter().all(|e| e.effective_date > as_of)),
                    Some(found) => {
                        prop_assert!(found.effective_date <= as_of);
                        prop_assert!(history
                            .iter()
                            .filter(|e| e.effective_date <= as_of)
                            .all(|e| e.effective_date <= found.effective_date));
                        // last-write-wins among ties
                        let last_tie = history
                            .iter()
                            .rev()
                            .find(|e| e.effective_date == found.effective_date)
                            .unwrap();
                        prop_assert!(std::ptr::eq(last_tie, found));
                    }
                }
            }
        }
    }
}
