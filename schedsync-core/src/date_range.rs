//! The schedule window a run mirrors.

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};

/// Longest window a run may mirror.
pub const MAX_WINDOW_DAYS: i64 = 366;

/// Half-open window `[from, to)` in UTC.
///
/// Both the scrape and the event listing use the same window, so events
/// outside it are never seen and never deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl DateRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> SyncResult<Self> {
        if from >= to {
            return Err(SyncError::Config(format!(
                "Invalid date range: {} is not before {}",
                from.to_rfc3339(),
                to.to_rfc3339()
            )));
        }
        Ok(DateRange { from, to })
    }

    /// `window_days` days starting at the beginning of today, clamped to
    /// `1..=MAX_WINDOW_DAYS`.
    pub fn upcoming(window_days: i64) -> Self {
        let from = start_of_day(Utc::now().date_naive());
        DateRange {
            from,
            to: from + window(window_days),
        }
    }

    /// Parse CLI arguments.
    /// - `from`: YYYY-MM-DD, defaults to today
    /// - `to`: YYYY-MM-DD inclusive, defaults to `from + window_days`
    pub fn from_args(from: Option<&str>, to: Option<&str>, window_days: i64) -> SyncResult<Self> {
        let from_dt = match from {
            Some(s) => start_of_day(parse_date(s)?),
            None => start_of_day(Utc::now().date_naive()),
        };

        let to_dt = match to {
            Some(s) => add(start_of_day(parse_date(s)?), Duration::days(1))?,
            None => add(from_dt, window(window_days))?,
        };

        Self::new(from_dt, to_dt)
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.from <= instant && instant < self.to
    }

    pub fn from_rfc3339(&self) -> String {
        self.from.to_rfc3339()
    }

    pub fn to_rfc3339(&self) -> String {
        self.to.to_rfc3339()
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} .. {}",
            self.from.format("%Y-%m-%d"),
            self.to.format("%Y-%m-%d")
        )
    }
}

fn parse_date(s: &str) -> SyncResult<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| SyncError::Config(format!("Invalid date format '{}'. Expected YYYY-MM-DD", s)))
}

fn window(window_days: i64) -> Duration {
    Duration::days(window_days.clamp(1, MAX_WINDOW_DAYS))
}

fn add(instant: DateTime<Utc>, delta: Duration) -> SyncResult<DateTime<Utc>> {
    instant
        .checked_add_signed(delta)
        .ok_or_else(|| SyncError::Config(format!("Date out of range: {} + {delta}", instant.format("%Y-%m-%d"))))
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::default()).and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_from_args_includes_end_date() {
        let range = DateRange::from_args(Some("2024-02-12"), Some("2024-02-18"), 14).unwrap();
        assert_eq!(range.from, Utc.with_ymd_and_hms(2024, 2, 12, 0, 0, 0).unwrap());
        assert_eq!(range.to, Utc.with_ymd_and_hms(2024, 2, 19, 0, 0, 0).unwrap());
        assert!(range.contains(Utc.with_ymd_and_hms(2024, 2, 18, 23, 59, 0).unwrap()));
        assert!(!range.contains(range.to));
    }

    #[test]
    fn test_from_args_defaults_to_window() {
        let range = DateRange::from_args(Some("2024-02-12"), None, 7).unwrap();
        assert_eq!(range.to - range.from, Duration::days(7));
    }

    #[test]
    fn test_oversized_window_is_clamped() {
        let range = DateRange::from_args(Some("2024-02-12"), None, 1_000_000_000).unwrap();
        assert_eq!(range.to - range.from, Duration::days(MAX_WINDOW_DAYS));

        let upcoming = DateRange::upcoming(1_000_000_000);
        assert_eq!(upcoming.to - upcoming.from, Duration::days(MAX_WINDOW_DAYS));
    }

    #[test]
    fn test_rejects_inverted_range() {
        assert!(DateRange::from_args(Some("2024-02-12"), Some("2024-02-10"), 7).is_err());
        assert!(DateRange::from_args(Some("12.02.2024"), None, 7).is_err());
    }
}
