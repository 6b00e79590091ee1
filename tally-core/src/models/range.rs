//! Calendar periods.
//!
//! - [`YearMonth`] - A calendar month
//! - [`DateRange`] - An inclusive range of calendar dates

use std::fmt;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// First month covered by batch mode.
pub const BATCH_EPOCH: YearMonth = YearMonth {
    year: 2024,
    month: 1,
};

/// Date format expected by the remote API's `start`/`end` parameters.
pub const API_DATE_FORMAT: &str = "%m/%d/%Y";

// ============================================================================
// Year/Month
// ============================================================================

/// A calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    /// Calendar year.
    pub year: i32,
    /// Month number, 1-12.
    pub month: u32,
}

impl YearMonth {
    /// Creates a month, rejecting month numbers outside 1-12.
    pub fn new(year: i32, month: u32) -> Result<Self, CoreError> {
        if !(1..=12).contains(&month) {
            return Err(CoreError::InvalidData(format!("month out of range: {month}")));
        }
        Ok(Self { year, month })
    }

    /// Returns the month containing `date`.
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Returns the following month.
    pub fn next(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Returns the first day of this month.
    pub fn first_day(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Returns the last day of this month.
    pub fn last_day(self) -> NaiveDate {
        self.next()
            .first_day()
            .pred_opt()
            .unwrap_or_else(|| self.first_day())
    }

    /// Returns every month from `from` through `to`, inclusive.
    ///
    /// Empty when `from` is after `to`.
    pub fn range_inclusive(from: Self, to: Self) -> Vec<Self> {
        let mut months = Vec::new();
        let mut current = from;
        while current <= to {
            months.push(current);
            current = current.next();
        }
        months
    }

    /// Returns the full English month name and year, e.g. "October 2025".
    pub fn long_name(self) -> String {
        self.first_day().format("%B %Y").to_string()
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

// ============================================================================
// Date Range
// ============================================================================

/// An inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// First date in the range.
    pub start: NaiveDate,
    /// Last date in the range (inclusive).
    pub end: NaiveDate,
}

impl DateRange {
    /// Creates a range, rejecting `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, CoreError> {
        if start > end {
            return Err(CoreError::InvalidData(format!(
                "range start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// The whole of a calendar month.
    pub fn month(month: YearMonth) -> Self {
        Self {
            start: month.first_day(),
            end: month.last_day(),
        }
    }

    /// First day of the month containing `today` through `today`.
    pub fn month_to_date(today: NaiveDate) -> Self {
        Self {
            start: YearMonth::of(today).first_day(),
            end: today,
        }
    }

    /// The range a normal-mode run exports on `today`.
    ///
    /// This is the current month to date, except on the first day of a
    /// month, where the previous month is exported in full so that its
    /// last day is not missed.
    pub fn reporting_period(today: NaiveDate) -> Self {
        if today.day() == 1 {
            if let Some(yesterday) = today.pred_opt() {
                return Self::month_to_date(yesterday);
            }
        }
        Self::month_to_date(today)
    }

    /// One range per month from `epoch` through the month containing
    /// `today`. The current month ends at `today`.
    pub fn batch_months(epoch: YearMonth, today: NaiveDate) -> Vec<Self> {
        let current = YearMonth::of(today);
        YearMonth::range_inclusive(epoch, current)
            .into_iter()
            .map(|m| {
                if m == current {
                    Self::month_to_date(today)
                } else {
                    Self::month(m)
                }
            })
            .collect()
    }

    /// The last `days` days up to and including `today`.
    pub fn trailing_days(today: NaiveDate, days: i64) -> Self {
        Self {
            start: today - Duration::days(days),
            end: today,
        }
    }

    /// The part of a trailing window that falls inside `year`.
    ///
    /// Returns `None` when the window ends before the year starts or
    /// starts after it ends.
    pub fn trailing_days_in_year(today: NaiveDate, days: i64, year: i32) -> Option<Self> {
        let window = Self::trailing_days(today, days);
        let year_start = NaiveDate::from_ymd_opt(year, 1, 1)?;
        let year_end = NaiveDate::from_ymd_opt(year, 12, 31)?;
        let start = window.start.max(year_start);
        let end = window.end.min(year_end);
        (start <= end).then_some(Self { start, end })
    }

    /// Returns true if `date` lies within the range.
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Returns true if the local calendar date of `ts` lies within the range.
    pub fn contains(&self, ts: &DateTime<FixedOffset>) -> bool {
        self.contains_date(ts.date_naive())
    }

    /// The month the range starts in; used for file naming.
    pub fn year_month(&self) -> YearMonth {
        YearMonth::of(self.start)
    }

    /// Range start in the API's query format.
    pub fn api_start(&self) -> String {
        self.start.format(API_DATE_FORMAT).to_string()
    }

    /// Range end in the API's query format.
    pub fn api_end(&self) -> String {
        self.end.format(API_DATE_FORMAT).to_string()
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.api_start(), self.api_end())
    }
}

// ============================================================================
// Tests
// ============================================================================
