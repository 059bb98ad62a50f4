//! Salary-cycle resolution and date/time parsing.
//!
//! Budgets run from the 25th of one month to the 24th of the next instead of
//! calendar months. [`resolve_cycle`] is the only windowing primitive: every
//! "current cycle" query applies it to the caller's reference date.

use crate::errors::{Error, Result};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Serialize;
use std::fmt;

/// Day of month on which a new cycle begins.
pub const CYCLE_START_DAY: u32 = 25;
/// Day of month on which a cycle ends.
pub const CYCLE_END_DAY: u32 = 24;

/// Expected date format, named in parse errors.
pub const DATE_FORMAT: &str = "YYYY-MM-DD";
/// Expected time format, named in parse errors.
pub const TIME_FORMAT: &str = "HH:MM[:SS]";
/// Expected month format, named in parse errors.
pub const MONTH_FORMAT: &str = "YYYY-MM";
/// Expected date-time format, named in parse errors. Without an offset the
/// value is taken as UTC.
pub const DATETIME_FORMAT: &str = "YYYY-MM-DDTHH:MM[:SS][Z|+HH:MM]";

/// An inclusive date range. Produced by [`resolve_cycle`] or given explicitly
/// for historical queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Cycle {
    /// First day, inclusive
    pub start: NaiveDate,
    /// Last day, inclusive
    pub end: NaiveDate,
}

impl Cycle {
    /// Builds an explicit range. The end must not precede the start.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(Error::validation(format!(
                "End date {end} is before start date {start}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Whether `date` falls inside the range, both ends included.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// Maps a date to the 25th-to-24th cycle enclosing it.
///
/// The 25th itself opens a new cycle. December rolls into January and January
/// reaches back into December of the previous year.
#[must_use]
pub fn resolve_cycle(reference: NaiveDate) -> Cycle {
    let (year, month) = (reference.year(), reference.month());

    let (start, end) = if reference.day() >= CYCLE_START_DAY {
        let (end_year, end_month) = if month == 12 {
            (year + 1, 1)
        } else {
            (year, month + 1)
        };
        (
            ymd(year, month, CYCLE_START_DAY),
            ymd(end_year, end_month, CYCLE_END_DAY),
        )
    } else {
        let (start_year, start_month) = if month == 1 {
            (year - 1, 12)
        } else {
            (year, month - 1)
        };
        (
            ymd(start_year, start_month, CYCLE_START_DAY),
            ymd(year, month, CYCLE_END_DAY),
        )
    };

    tracing::debug!("Resolved {reference} to cycle {start} to {end}");
    Cycle { start, end }
}

// Day 24 and 25 exist in every month, so construction never falls through.
fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| Error::InvalidDate {
        value: value.to_string(),
        expected: DATE_FORMAT,
    })
}

/// Parses an optional date, treating blank input as absent.
pub fn parse_optional_date(value: Option<&str>) -> Result<Option<NaiveDate>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => parse_date(raw).map(Some),
    }
}

/// Parses an `HH:MM` or `HH:MM:SS` time of day.
pub fn parse_time(value: &str) -> Result<NaiveTime> {
    let trimmed = value.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M"))
        .map_err(|_| Error::InvalidTime {
            value: value.to_string(),
            expected: TIME_FORMAT,
        })
}

/// Parses a `YYYY-MM` month into its first day.
pub fn parse_month(value: &str) -> Result<NaiveDate> {
    let invalid = || Error::InvalidDate {
        value: value.to_string(),
        expected: MONTH_FORMAT,
    };
    let (year, month) = value.trim().split_once('-').ok_or_else(invalid)?;
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month: u32 = month.parse().map_err(|_| invalid())?;
    NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)
}

/// Parses an ISO 8601 date-time. A trailing `Z` or offset is honoured;
/// a value without one is taken as UTC.
pub fn parse_datetime(value: &str) -> Result<DateTime<Utc>> {
    let trimmed = value.trim();
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(with_offset.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| Error::InvalidDate {
            value: value.to_string(),
            expected: DATETIME_FORMAT,
        })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_early_days_end_on_24th_of_same_month() {
        for month in 1..=12 {
            for day in 1..=24 {
                let d = date(2025, month, day);
                let cycle = resolve_cycle(d);
                assert_eq!(cycle.end.day(), 24);
                assert_eq!(cycle.end.month(), d.month());
                assert!(cycle.contains(d));
            }
        }
    }

    #[test]
    fn test_late_days_start_on_25th_of_same_month() {
        let mut d = date(2024, 1, 25);
        while d.year() == 2024 {
            if d.day() >= 25 {
                let cycle = resolve_cycle(d);
                assert_eq!(cycle.start, date(d.year(), d.month(), 25));
                assert!(cycle.contains(d));
            }
            d = d.succ_opt().unwrap();
        }
    }

    #[test]
    fn test_year_wrap_both_directions() {
        assert_eq!(
            resolve_cycle(date(2024, 12, 25)),
            Cycle {
                start: date(2024, 12, 25),
                end: date(2025, 1, 24)
            }
        );
        assert_eq!(
            resolve_cycle(date(2024, 1, 10)),
            Cycle {
                start: date(2023, 12, 25),
                end: date(2024, 1, 24)
            }
        );
    }

    #[test]
    fn test_25th_opens_new_cycle() {
        let before = resolve_cycle(date(2025, 3, 24));
        let on = resolve_cycle(date(2025, 3, 25));
        assert_eq!(before.end, date(2025, 3, 24));
        assert_eq!(on.start, date(2025, 3, 25));
        assert_eq!(on.end, date(2025, 4, 24));
    }

    #[test]
    fn test_contains_is_inclusive() {
        let cycle = resolve_cycle(date(2025, 6, 1));
        assert!(cycle.contains(cycle.start));
        assert!(cycle.contains(cycle.end));
        assert!(!cycle.contains(date(2025, 5, 24)));
        assert!(!cycle.contains(date(2025, 6, 25)));
    }

    #[test]
    fn test_explicit_range_rejects_inverted_bounds() {
        assert!(Cycle::new(date(2025, 1, 1), date(2025, 1, 1)).is_ok());
        assert!(matches!(
            Cycle::new(date(2025, 2, 1), date(2025, 1, 1)),
            Err(Error::Validation { .. })
        ));
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2025-02-28").unwrap(), date(2025, 2, 28));
        let err = parse_date("28/02/2025").unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidDate {
                expected: DATE_FORMAT,
                ..
            }
        ));
        assert!(err.to_string().contains("YYYY-MM-DD"));
        assert!(parse_date("2025-02-30").is_err());
        assert_eq!(parse_optional_date(Some("  ")).unwrap(), None);
        assert_eq!(parse_optional_date(None).unwrap(), None);
    }

    #[test]
    fn test_parse_time() {
        assert_eq!(
            parse_time("12:30").unwrap(),
            NaiveTime::from_hms_opt(12, 30, 0).unwrap()
        );
        assert_eq!(
            parse_time("07:05:09").unwrap(),
            NaiveTime::from_hms_opt(7, 5, 9).unwrap()
        );
        let err = parse_time("noon").unwrap_err();
        assert!(err.to_string().contains("HH:MM"));
    }

    #[test]
    fn test_parse_month() {
        assert_eq!(parse_month("2025-02").unwrap(), date(2025, 2, 1));
        assert_eq!(parse_month(" 2024-12 ").unwrap(), date(2024, 12, 1));
        assert!(parse_month("2025-13").is_err());
        assert!(parse_month("202502").is_err());
        let err = parse_month("Feb 2025").unwrap_err();
        assert!(err.to_string().contains(MONTH_FORMAT));
    }

    #[test]
    fn test_parse_datetime() {
        let expected = date(2025, 3, 10).and_hms_opt(9, 30, 0).unwrap().and_utc();
        assert_eq!(parse_datetime("2025-03-10T09:30:00Z").unwrap(), expected);
        assert_eq!(parse_datetime("2025-03-10T11:30:00+02:00").unwrap(), expected);
        assert_eq!(parse_datetime("2025-03-10 09:30").unwrap(), expected);
        assert!(parse_datetime("tomorrow morning").is_err());
    }
}
