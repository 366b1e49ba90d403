//! Calendar-week arithmetic. A week always runs Monday through Sunday.

use chrono::{Datelike, Days, NaiveDate};
use thiserror::Error;

pub const DAYS_PER_WEEK: u64 = 7;

#[derive(Debug, Error)]
pub enum WeekError {
    #[error("Invalid date: {0}")]
    InvalidDate(#[from] chrono::ParseError),

    #[error("Date {0} is outside the supported calendar range")]
    OutOfRange(NaiveDate),
}

/// Monday..Sunday range a schedule covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Week {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Week {
    /// The week containing `date`, or `None` when its Monday or Sunday
    /// falls outside the representable calendar.
    #[must_use]
    pub fn containing(date: NaiveDate) -> Option<Self> {
        let start = monday_of(date)?;
        let end = start.checked_add_days(Days::new(DAYS_PER_WEEK - 1))?;
        Some(Self { start, end })
    }

    /// Date of the zero-based `index` day, clamped to Sunday.
    #[must_use]
    pub fn day(&self, index: usize) -> NaiveDate {
        let offset = u64::try_from(index).unwrap_or(u64::MAX).min(DAYS_PER_WEEK - 1);
        self.start.checked_add_days(Days::new(offset)).unwrap_or(self.end)
    }
}

#[must_use]
pub fn monday_of(date: NaiveDate) -> Option<NaiveDate> {
    date.checked_sub_days(Days::new(u64::from(date.weekday().num_days_from_monday())))
}

/// Parses an ISO `YYYY-MM-DD` date as sent by clients.
pub fn parse_date(value: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
}

/// Resolves the target week for a generation request.
pub fn resolve_week(requested: Option<&str>, today: NaiveDate) -> Result<Week, WeekError> {
    let anchor = match requested {
        Some(raw) if !raw.trim().is_empty() => parse_date(raw)?,
        _ => today,
    };
    Week::containing(anchor).ok_or(WeekError::OutOfRange(anchor))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn week_of(s: &str) -> Week {
        Week::containing(date(s)).unwrap()
    }

    #[test]
    fn monday_is_its_own_week_start() {
        let week = week_of("2024-09-23");
        assert_eq!(week.start, date("2024-09-23"));
        assert_eq!(week.end, date("2024-09-29"));
    }

    #[test]
    fn sunday_belongs_to_the_preceding_monday() {
        let week = week_of("2024-09-29");
        assert_eq!(week.start, date("2024-09-23"));
    }

    #[test]
    fn week_crossing_year_boundary() {
        let week = week_of("2025-01-01");
        assert_eq!(week.start, date("2024-12-30"));
        assert_eq!(week.end, date("2025-01-05"));
    }

    #[test]
    fn days_are_contiguous() {
        let week = week_of("2024-09-25");
        let days: Vec<_> = (0..7).map(|i| week.day(i)).collect();
        assert_eq!(days[0], week.start);
        assert_eq!(days[6], week.end);
        assert_eq!(week.day(3), date("2024-09-26"));
        assert_eq!(week.day(40), week.end);
    }

    #[test]
    fn resolve_defaults_to_today() {
        let today = date("2024-10-03");
        assert_eq!(resolve_week(None, today).unwrap().start, date("2024-09-30"));
        assert_eq!(resolve_week(Some("  "), today).unwrap().start, date("2024-09-30"));
        assert_eq!(
            resolve_week(Some("2024-09-27"), today).unwrap().start,
            date("2024-09-23")
        );
        assert!(resolve_week(Some("09/27/2024"), today).is_err());
    }

    #[test]
    fn calendar_edges_are_rejected_not_overflowed() {
        let today = date("2024-10-03");
        for raw in ["+262142-12-31", "-262143-01-01"] {
            assert!(parse_date(raw).is_ok(), "{raw} should parse");
            assert!(matches!(
                resolve_week(Some(raw), today),
                Err(WeekError::OutOfRange(_))
            ));
        }
        assert!(Week::containing(NaiveDate::MAX).is_none());
        assert!(Week::containing(NaiveDate::MIN).is_none());
        assert!(matches!(
            resolve_week(Some("2024-13-01"), today),
            Err(WeekError::InvalidDate(_))
        ));
    }
}
