//! Calendar windows for imagery queries
//!
//! Every imagery query in the pipeline is bounded by a half-open
//! `[start, end)` window of whole days, in UTC.

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Half-open `[start, end)` date window
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DateWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateWindow {
    /// Create a window; `end` must be strictly after `start`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end <= start {
            return Err(Error::InvalidParameter {
                name: "end",
                value: end.to_string(),
                reason: format!("must be after start {}", start),
            });
        }
        Ok(Self { start, end })
    }

    /// Window of `months` calendar months beginning at `start`
    pub fn months_from(start: NaiveDate, months: u32) -> Result<Self> {
        let end = add_months(start, months)?;
        Self::new(start, end)
    }

    /// The calendar month `year-month`
    pub fn month(year: i32, month: u32) -> Result<Self> {
        Self::months_from(ymd(year, month, 1)?, 1)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Exclusive end
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Calendar year of the window start
    pub fn year(&self) -> i32 {
        self.start.year()
    }

    /// Calendar month (1-12) of the window start
    pub fn month_of_year(&self) -> u32 {
        self.start.month()
    }

    /// Whether an acquisition time falls inside the window
    pub fn contains(&self, time: &DateTime<Utc>) -> bool {
        let day = time.date_naive();
        day >= self.start && day < self.end
    }

    /// Start of the window as a UTC timestamp (midnight)
    pub fn start_time(&self) -> DateTime<Utc> {
        self.start.and_time(chrono::NaiveTime::MIN).and_utc()
    }

    /// End of the window as a UTC timestamp (midnight, exclusive)
    pub fn end_time(&self) -> DateTime<Utc> {
        self.end.and_time(chrono::NaiveTime::MIN).and_utc()
    }
}

impl std::fmt::Display for DateWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.start, self.end)
    }
}

/// Build a date, rejecting impossible calendar values
pub fn ymd(year: i32, month: u32, day: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| Error::InvalidParameter {
        name: "date",
        value: format!("{}-{}-{}", year, month, day),
        reason: "not a calendar date".to_string(),
    })
}

/// Advance a date by whole calendar months
pub fn add_months(date: NaiveDate, months: u32) -> Result<NaiveDate> {
    date.checked_add_months(Months::new(months))
        .ok_or_else(|| Error::InvalidParameter {
            name: "months",
            value: months.to_string(),
            reason: format!("overflows the calendar from {}", date),
        })
}

/// One window per calendar month from `first` (a month start) up to `end` (exclusive)
pub fn monthly_windows(first: NaiveDate, end: NaiveDate) -> Result<Vec<DateWindow>> {
    let mut windows = Vec::new();
    let mut start = ymd(first.year(), first.month(), 1)?;
    while start < end {
        let window = DateWindow::months_from(start, 1)?;
        start = window.end();
        windows.push(window);
    }
    Ok(windows)
}
