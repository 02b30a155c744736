//! Relative date choices for admin list filters.

use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};

use crate::error::DomainError;

/// One of the fixed ranges an admin can narrow a date column to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateRange {
    Today,
    PastSevenDays,
    ThisMonth,
    ThisYear,
}

/// Half-open `[start, end)` timestamp window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateWindow {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn first_of_month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
}

impl DateRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            DateRange::Today => "today",
            DateRange::PastSevenDays => "past_7_days",
            DateRange::ThisMonth => "this_month",
            DateRange::ThisYear => "this_year",
        }
    }

    /// The window this range covers, measured from `now`. Every range ends at
    /// the start of the following period, so rows stamped later today match.
    pub fn window(&self, now: DateTime<Utc>) -> DateWindow {
        let today = now.date_naive();
        let tomorrow = midnight(today) + Duration::days(1);
        match self {
            DateRange::Today => DateWindow {
                start: midnight(today),
                end: tomorrow,
            },
            DateRange::PastSevenDays => DateWindow {
                start: midnight(today) - Duration::days(7),
                end: tomorrow,
            },
            DateRange::ThisMonth => {
                let (next_year, next_month) = if today.month() == 12 {
                    (today.year() + 1, 1)
                } else {
                    (today.year(), today.month() + 1)
                };
                DateWindow {
                    start: midnight(first_of_month(today.year(), today.month())),
                    end: midnight(first_of_month(next_year, next_month)),
                }
            }
            DateRange::ThisYear => DateWindow {
                start: midnight(first_of_month(today.year(), 1)),
                end: midnight(first_of_month(today.year() + 1, 1)),
            },
        }
    }
}

impl FromStr for DateRange {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "today" => Ok(DateRange::Today),
            "past_7_days" => Ok(DateRange::PastSevenDays),
            "this_month" => Ok(DateRange::ThisMonth),
            "this_year" => Ok(DateRange::ThisYear),
            other => Err(DomainError::Validation(format!(
                "Select a valid choice. {} is not one of the available choices.",
                other
            ))),
        }
    }
}
