//! Pure Gregorian calendar arithmetic.
//!
//! Nothing in this module reads the system clock. Callers pass the "now"
//! instant or "today" date explicitly, which keeps every function
//! deterministic and testable.
//!
//! # Functions
//!
//! - [`add_interval`] — Step a date forward by N days, weeks, months or years
//! - [`days_in_month`] — Month length, leap years included
//! - [`is_past`] — Whether a date lies before a reference day
//! - [`today_in`] — The calendar date of a UTC instant in an IANA timezone

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScheduleError};

/// Unit of repetition for a recurring schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Yearly => "yearly",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            "yearly" => Ok(Frequency::Yearly),
            other => Err(ScheduleError::InvalidRule(format!(
                "unknown frequency '{other}'"
            ))),
        }
    }
}

// ── Month arithmetic ────────────────────────────────────────────────────────

/// Gregorian leap-year rule: divisible by 4, except centuries not divisible by 400.
pub fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

/// Number of days in `month` (1-12) of `year`.
///
/// Returns 0 for a month outside 1-12 so callers comparing a day against the
/// result always reject it.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

/// Add `interval` units of `frequency` to `date`.
///
/// - Daily adds `interval` days, weekly adds `7 * interval` days.
/// - Monthly adds calendar months and clamps the day to the target month's
///   length (Jan 31 + 1 month = Feb 28, or Feb 29 in a leap year).
/// - Yearly adds years; Feb 29 lands on Feb 28 in a non-leap target year.
///
/// Negative intervals step backwards. Returns `None` only when the result
/// falls outside the range `chrono` can represent.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use schedule_engine::calendar::{add_interval, Frequency};
///
/// let jan31 = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
/// let next = add_interval(jan31, Frequency::Monthly, 1).unwrap();
/// assert_eq!(next, NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());
/// ```
pub fn add_interval(date: NaiveDate, frequency: Frequency, interval: i32) -> Option<NaiveDate> {
    match frequency {
        Frequency::Daily => date.checked_add_signed(Duration::days(i64::from(interval))),
        Frequency::Weekly => date.checked_add_signed(Duration::weeks(i64::from(interval))),
        Frequency::Monthly => add_months_clamped(date, i64::from(interval)),
        Frequency::Yearly => add_months_clamped(date, i64::from(interval) * 12),
    }
}

fn add_months_clamped(date: NaiveDate, months: i64) -> Option<NaiveDate> {
    let zero_based = i64::from(date.year()) * 12 + i64::from(date.month0()) + months;
    let year = i32::try_from(zero_based.div_euclid(12)).ok()?;
    let month = zero_based.rem_euclid(12) as u32 + 1;
    let day = date.day().min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day)
}

// ── "Today" handling ────────────────────────────────────────────────────────

/// Whether `date` is strictly earlier than `today`.
///
/// Both sides are calendar dates, so time of day never participates.
pub fn is_past(date: NaiveDate, today: NaiveDate) -> bool {
    date < today
}

/// The calendar date of the instant `now` as seen in `timezone`.
///
/// # Errors
///
/// Returns [`ScheduleError::InvalidTimezone`] if `timezone` is not a valid
/// IANA name.
pub fn today_in(now: DateTime<Utc>, timezone: &str) -> Result<NaiveDate> {
    let tz = parse_timezone(timezone)?;
    Ok(now.with_timezone(&tz).date_naive())
}

pub(crate) fn parse_timezone(s: &str) -> Result<Tz> {
    s.parse::<Tz>()
        .map_err(|_| ScheduleError::InvalidTimezone(format!("'{s}'")))
}

// ── ISO formatting ──────────────────────────────────────────────────────────

/// Format a date as `YYYY-MM-DD`.
pub fn format_iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_iso_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| ScheduleError::InvalidDate(format!("'{s}': {e}")))
}

// ── Tests ───────────────────────────────────────────────────────────────────
