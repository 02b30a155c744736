//! Publish-timestamp normalization for the post editing form.
//!
//! The editing form submits the publish moment as separate date and time
//! fields with whole-second resolution. Saving stamps the current
//! microsecond onto that value, except when an edit leaves the date and time
//! untouched: then the stored timestamp is kept bit-for-bit.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SubsecRound, Timelike, Utc};

use crate::error::DomainError;

/// How a save relates to existing data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMode {
    /// A new post: always adopt the submitted moment.
    Create,
    /// An edit: keep `stored` unless the submitted moment differs from it at
    /// whole-second resolution.
    UpdateIfChanged { stored: DateTime<Utc> },
}

/// Parse the form's date (`YYYY-MM-DD`) and time (`HH:MM:SS` or `HH:MM`)
/// fields into a whole-second moment. Times are interpreted as UTC.
pub fn parse_submitted(date: &str, time: &str) -> Result<NaiveDateTime, DomainError> {
    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|_| DomainError::Validation("Enter a valid date.".to_string()))?;
    let time = time.trim();
    let time = NaiveTime::parse_from_str(time, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M"))
        .map_err(|_| DomainError::Validation("Enter a valid time.".to_string()))?;
    Ok(date.and_time(time))
}

/// Decide the publish timestamp to store.
///
/// The fresh value is `submitted` plus the sub-second part of `now`. The
/// comparison against the stored value ignores sub-seconds on both sides.
pub fn normalize_publish(
    submitted: NaiveDateTime,
    mode: SaveMode,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    let submitted = submitted.trunc_subsecs(0);
    if let SaveMode::UpdateIfChanged { stored } = mode {
        if stored.trunc_subsecs(0).naive_utc() == submitted {
            return stored;
        }
    }

    let micros = now.timestamp_subsec_micros() % 1_000_000;
    let fresh = submitted
        .with_nanosecond(micros * 1_000)
        .unwrap_or(submitted);
    fresh.and_utc()
}
