//! Submission cycle resolution.
//!
//! # Responsibility
//! - Map a calendar date to the yearly submission cycle it belongs to.
//! - Hold the configurable rollover months that push late-year dates forward.
//!
//! # Invariants
//! - Resolution is pure: same date and policy always give the same cycle.
//! - Rollover months are always within `1..=12`.

use crate::model::corpus_entry::CycleId;
use chrono::{Datelike, Local, NaiveDate};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Months that roll into the next cycle unless configured otherwise.
pub const DEFAULT_ROLLOVER_MONTHS: [u32; 3] = [10, 11, 12];

/// Error raised when a rollover month list cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CyclePolicyError {
    InvalidMonth(String),
    MonthOutOfRange(u32),
}

impl Display for CyclePolicyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidMonth(value) => write!(f, "invalid rollover month `{value}`"),
            Self::MonthOutOfRange(month) => {
                write!(f, "rollover month {month} is outside 1..=12")
            }
        }
    }
}

impl Error for CyclePolicyError {}

/// Rollover rule deciding which months belong to the following cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CyclePolicy {
    rollover_months: BTreeSet<u32>,
}

impl Default for CyclePolicy {
    fn default() -> Self {
        Self {
            rollover_months: DEFAULT_ROLLOVER_MONTHS.into_iter().collect(),
        }
    }
}

impl CyclePolicy {
    /// Builds a policy from explicit month numbers.
    pub fn new<I>(months: I) -> Result<Self, CyclePolicyError>
    where
        I: IntoIterator<Item = u32>,
    {
        let mut rollover_months = BTreeSet::new();
        for month in months {
            if !(1..=12).contains(&month) {
                return Err(CyclePolicyError::MonthOutOfRange(month));
            }
            rollover_months.insert(month);
        }
        Ok(Self { rollover_months })
    }

    pub fn rollover_months(&self) -> impl Iterator<Item = u32> + '_ {
        self.rollover_months.iter().copied()
    }

    pub fn is_rollover_month(&self, month: u32) -> bool {
        self.rollover_months.contains(&month)
    }
}

impl FromStr for CyclePolicy {
    type Err = CyclePolicyError;

    /// Parses a comma-separated month list such as `10,11,12`.
    ///
    /// An empty string disables rollover.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let months = value
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                part.parse::<u32>()
                    .map_err(|_| CyclePolicyError::InvalidMonth(part.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(months)
    }
}

impl Display for CyclePolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let months = self
            .rollover_months
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>();
        write!(f, "{}", months.join(","))
    }
}

/// Resolves the submission cycle for `now`.
///
/// The cycle is the calendar year of `now`, or the following year when the
/// month of `now` is one of the policy's rollover months.
pub fn resolve_cycle<D: Datelike>(now: &D, policy: &CyclePolicy) -> CycleId {
    let calendar_year = now.year();
    if policy.is_rollover_month(now.month()) {
        calendar_year + 1
    } else {
        calendar_year
    }
}

/// Source of the current date for cycle resolution.
pub trait Clock {
    fn today(&self) -> NaiveDate;
}

/// Local wall-clock date.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Clock pinned to one date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::{resolve_cycle, CyclePolicy, CyclePolicyError};
    use chrono::NaiveDate;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
    }

    #[test]
    fn late_year_dates_roll_into_next_cycle() {
        let policy = CyclePolicy::default();
        assert_eq!(resolve_cycle(&date(2024, 11, 15), &policy), 2025);
        assert_eq!(resolve_cycle(&date(2024, 10, 1), &policy), 2025);
        assert_eq!(resolve_cycle(&date(2024, 12, 31), &policy), 2025);
    }

    #[test]
    fn other_months_stay_in_calendar_year() {
        let policy = CyclePolicy::default();
        assert_eq!(resolve_cycle(&date(2024, 3, 10), &policy), 2024);
        assert_eq!(resolve_cycle(&date(2024, 9, 30), &policy), 2024);
        assert_eq!(resolve_cycle(&date(2025, 1, 1), &policy), 2025);
    }

    #[test]
    fn custom_policy_changes_rollover_window() {
        let policy: CyclePolicy = "9, 10".parse().unwrap();
        assert_eq!(resolve_cycle(&date(2024, 9, 1), &policy), 2025);
        assert_eq!(resolve_cycle(&date(2024, 11, 1), &policy), 2024);

        let no_rollover: CyclePolicy = "".parse().unwrap();
        assert_eq!(resolve_cycle(&date(2024, 12, 1), &no_rollover), 2024);
    }

    #[test]
    fn policy_parsing_rejects_bad_months() {
        assert_eq!(
            "13".parse::<CyclePolicy>(),
            Err(CyclePolicyError::MonthOutOfRange(13))
        );
        assert_eq!(
            "10,x".parse::<CyclePolicy>(),
            Err(CyclePolicyError::InvalidMonth("x".to_string()))
        );
        assert_eq!(
            "0".parse::<CyclePolicy>(),
            Err(CyclePolicyError::MonthOutOfRange(0))
        );
    }

    #[test]
    fn policy_display_round_trips_through_parse() {
        let policy = CyclePolicy::default();
        assert_eq!(policy.to_string(), "10,11,12");
        assert_eq!(policy.to_string().parse::<CyclePolicy>().unwrap(), policy);
    }
}
