//! End-date entry validation.
//!
//! Users type an end date as three separate fields. [`validate_end_date`] turns
//! them into the exclusive end date stored on a [`RecurrenceRule`], checking in
//! this order:
//!
//! 1. every field is filled in
//! 2. every field is a number
//! 3. year has 4 digits, month and day have 2, exactly as typed
//! 4. year within the configured range
//! 5. month within 1-12
//! 6. day exists in that month
//! 7. the end date is after the series start, by at least a day
//! 8. the end date is not before today
//! 9. the end date is within the configured number of years from today
//!
//! The first failing check wins.
//!
//! [`RecurrenceRule`]: crate::recurrence::RecurrenceRule

use std::num::{IntErrorKind, ParseIntError};
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::calendar::{add_interval, days_in_month, Frequency};
use crate::config::EngineConfig;
use crate::error::{DateField, Result, ScheduleError};

/// Raw text of the three end-date inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndDateInput {
    pub year: String,
    pub month: String,
    pub day: String,
}

impl EndDateInput {
    pub fn new(year: impl Into<String>, month: impl Into<String>, day: impl Into<String>) -> Self {
        EndDateInput {
            year: year.into(),
            month: month.into(),
            day: day.into(),
        }
    }

    /// Prefill the inputs from a stored (exclusive) end date, showing the last
    /// day the series still occurs on.
    pub fn from_stored_end(end_exclusive: NaiveDate) -> Self {
        let shown = end_exclusive.pred_opt().unwrap_or(end_exclusive);
        EndDateInput {
            year: format!("{:04}", shown.year()),
            month: format!("{:02}", shown.month()),
            day: format!("{:02}", shown.day()),
        }
    }

    fn fields(&self) -> [(DateField, &str); 3] {
        [
            (DateField::Year, self.year.as_str()),
            (DateField::Month, self.month.as_str()),
            (DateField::Day, self.day.as_str()),
        ]
    }
}

/// Validate the typed end date and return it as an **exclusive** end date
/// (the typed day plus one), ready to store on a recurrence rule.
///
/// `start` is the series base date, when one has been picked. `today` is the
/// caller's current calendar day (see [`today_in`](crate::calendar::today_in)).
///
/// # Errors
///
/// Returns the first failing check's error; see the module docs for order.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use schedule_engine::config::EngineConfig;
/// use schedule_engine::end_date::{validate_end_date, EndDateInput};
///
/// let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
/// let input = EndDateInput::new("2025", "06", "10");
/// let end = validate_end_date(&input, None, today, &EngineConfig::default()).unwrap();
/// assert_eq!(end, NaiveDate::from_ymd_opt(2025, 6, 11).unwrap());
/// ```
pub fn validate_end_date(
    input: &EndDateInput,
    start: Option<NaiveDate>,
    today: NaiveDate,
    config: &EngineConfig,
) -> Result<NaiveDate> {
    let end = parse_calendar_date(input, config)?;

    if let Some(start) = start {
        if end < start {
            return Err(ScheduleError::BeforeStart { start, end });
        }
        if end == start {
            return Err(ScheduleError::MinGap { start });
        }
    }

    if end < today {
        return Err(ScheduleError::PastDate { end });
    }

    let years_ahead = i32::try_from(config.max_years_ahead).unwrap_or(i32::MAX);
    if let Some(limit) = add_interval(today, Frequency::Yearly, years_ahead) {
        if end > limit {
            return Err(ScheduleError::TooFarFuture {
                max_years: config.max_years_ahead,
            });
        }
    }

    end.succ_opt()
        .ok_or_else(|| ScheduleError::InvalidDate(format!("no day follows {end}")))
}

/// Keystroke-time check of the year field.
///
/// Returns `None` while fewer than four characters have been typed, otherwise
/// the verdict of the number, format and range checks for the year alone.
pub fn validate_year_live(year: &str, config: &EngineConfig) -> Option<Result<i32>> {
    if year.chars().count() < DateField::Year.width() {
        return None;
    }
    Some(parse_field(DateField::Year, year).and_then(|y| check_year(y, config)))
}

// ── Field checks ────────────────────────────────────────────────────────────

/// Steps 1-6: the three fields name a real calendar day.
fn parse_calendar_date(input: &EndDateInput, config: &EngineConfig) -> Result<NaiveDate> {
    for (field, text) in input.fields() {
        if text.trim().is_empty() {
            return Err(ScheduleError::MissingField(field));
        }
    }

    let mut values = [0i64; 3];
    for (slot, (field, text)) in values.iter_mut().zip(input.fields()) {
        *slot = parse_number(field, text)?;
    }

    for (field, text) in input.fields() {
        check_format(field, text)?;
    }

    // Format check guarantees at most 4 digits, so these fit.
    let year = check_year(values[0] as i32, config)?;
    let month = values[1] as u32;
    if !(1..=12).contains(&month) {
        return Err(ScheduleError::MonthRange);
    }
    let day = values[2] as u32;
    let max_day = days_in_month(year, month);
    if day < 1 || day > max_day {
        return Err(ScheduleError::DayRange {
            year,
            month,
            max_day,
        });
    }

    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| ScheduleError::InvalidDate(format!("{year:04}-{month:02}-{day:02}")))
}

fn parse_field(field: DateField, text: &str) -> Result<i32> {
    let value = parse_number(field, text)?;
    check_format(field, text)?;
    Ok(value)
}

/// Digits that overflow `T` still count as a number. They come back as
/// zero and the format check that follows rejects them for their length.
fn parse_number<T>(field: DateField, text: &str) -> Result<T>
where
    T: FromStr<Err = ParseIntError> + Default,
{
    match text.parse::<T>() {
        Ok(value) => Ok(value),
        Err(e) if matches!(e.kind(), IntErrorKind::PosOverflow | IntErrorKind::NegOverflow) => {
            Ok(T::default())
        }
        Err(_) => Err(ScheduleError::NotANumber(field)),
    }
}

fn check_format(field: DateField, text: &str) -> Result<()> {
    if text.len() == field.width() && text.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ScheduleError::Format { field })
    }
}

fn check_year(year: i32, config: &EngineConfig) -> Result<i32> {
    if (config.min_year..=config.max_year).contains(&year) {
        Ok(year)
    } else {
        Err(ScheduleError::YearRange {
            min: config.min_year,
            max: config.max_year,
        })
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn today() -> NaiveDate {
        date(2025, 1, 15)
    }

    fn check(y: &str, m: &str, d: &str) -> Result<NaiveDate> {
        validate_end_date(
            &EndDateInput::new(y, m, d),
            None,
            today(),
            &EngineConfig::default(),
        )
    }

    fn check_with_start(y: &str, m: &str, d: &str, start: NaiveDate) -> Result<NaiveDate> {
        validate_end_date(
            &EndDateInput::new(y, m, d),
            Some(start),
            today(),
            &EngineConfig::default(),
        )
    }

    // ── Success path ────────────────────────────────────────────────────

    #[test]
    fn test_valid_date_returns_next_day() {
        assert_eq!(check("2025", "06", "10").unwrap(), date(2025, 6, 11));
    }

    #[test]
    fn test_year_end_rolls_over() {
        assert_eq!(check("2025", "12", "31").unwrap(), date(2026, 1, 1));
    }

    #[test]
    fn test_today_is_accepted() {
        assert_eq!(check("2025", "01", "15").unwrap(), date(2025, 1, 16));
    }

    // ── Steps 1-3 ───────────────────────────────────────────────────────

    #[test]
    fn test_missing_fields_in_order() {
        assert_eq!(
            check("", "", "").unwrap_err(),
            ScheduleError::MissingField(DateField::Year)
        );
        assert_eq!(
            check("2025", " ", "10").unwrap_err(),
            ScheduleError::MissingField(DateField::Month)
        );
        assert_eq!(
            check("2025", "06", "").unwrap_err(),
            ScheduleError::MissingField(DateField::Day)
        );
    }

    #[test]
    fn test_not_a_number() {
        assert_eq!(
            check("20x5", "06", "10").unwrap_err(),
            ScheduleError::NotANumber(DateField::Year)
        );
        assert_eq!(
            check("2025", "ab", "10").unwrap_err(),
            ScheduleError::NotANumber(DateField::Month)
        );
    }

    #[test]
    fn test_not_padded_is_format_error() {
        assert_eq!(
            check("2025", "6", "10").unwrap_err(),
            ScheduleError::Format {
                field: DateField::Month
            }
        );
        assert_eq!(
            check("2025", "06", "9").unwrap_err(),
            ScheduleError::Format {
                field: DateField::Day
            }
        );
        assert_eq!(
            check("25", "06", "10").unwrap_err(),
            ScheduleError::Format {
                field: DateField::Year
            }
        );
    }

    #[test]
    fn test_overlong_number_is_format_error() {
        assert_eq!(
            check("99999999999999999999", "06", "10").unwrap_err(),
            ScheduleError::Format {
                field: DateField::Year
            }
        );
        // Every field is number-checked before any length check.
        assert_eq!(
            check("99999999999999999999", "ab", "10").unwrap_err(),
            ScheduleError::NotANumber(DateField::Month)
        );
        assert_eq!(
            validate_year_live("99999999999", &EngineConfig::default()),
            Some(Err(ScheduleError::Format {
                field: DateField::Year
            }))
        );
    }

    #[test]
    fn test_signed_number_is_format_error() {
        assert_eq!(
            check("2025", "+6", "10").unwrap_err(),
            ScheduleError::Format {
                field: DateField::Month
            }
        );
    }

    // ── Steps 4-6 ───────────────────────────────────────────────────────

    #[test]
    fn test_year_range() {
        assert!(matches!(
            check("1899", "06", "10").unwrap_err(),
            ScheduleError::YearRange { min: 1900, max: 2100 }
        ));
        assert!(matches!(
            check("2101", "06", "10").unwrap_err(),
            ScheduleError::YearRange { .. }
        ));
    }

    #[test]
    fn test_month_range() {
        assert_eq!(check("2025", "13", "10").unwrap_err(), ScheduleError::MonthRange);
        assert_eq!(check("2025", "00", "10").unwrap_err(), ScheduleError::MonthRange);
    }

    #[test]
    fn test_thirty_day_months_reject_31() {
        for month in ["04", "06", "09", "11"] {
            let err = check("2025", month, "31").unwrap_err();
            assert!(
                matches!(err, ScheduleError::DayRange { max_day: 30, .. }),
                "month {month}: {err:?}"
            );
        }
    }

    #[test]
    fn test_day_zero_rejected() {
        assert!(matches!(
            check("2025", "03", "00").unwrap_err(),
            ScheduleError::DayRange { max_day: 31, .. }
        ));
    }

    #[test]
    fn test_february_leap_rules() {
        assert_eq!(check("2028", "02", "29").unwrap(), date(2028, 3, 1));
        let err = check("2027", "02", "29").unwrap_err();
        assert_eq!(err.to_string(), "2027-02 only has 28 days");
    }

    // ── Steps 7-9 ───────────────────────────────────────────────────────

    #[test]
    fn test_end_before_start() {
        let err = check_with_start("2025", "03", "01", date(2025, 3, 5)).unwrap_err();
        assert_eq!(
            err,
            ScheduleError::BeforeStart {
                start: date(2025, 3, 5),
                end: date(2025, 3, 1)
            }
        );
    }

    #[test]
    fn test_end_equal_to_start_is_min_gap() {
        let err = check_with_start("2025", "03", "05", date(2025, 3, 5)).unwrap_err();
        assert_eq!(
            err,
            ScheduleError::MinGap {
                start: date(2025, 3, 5)
            }
        );
    }

    #[test]
    fn test_end_day_after_start_accepted() {
        let end = check_with_start("2025", "03", "06", date(2025, 3, 5)).unwrap();
        assert_eq!(end, date(2025, 3, 7));
    }

    #[test]
    fn test_past_date() {
        let err = check("2025", "01", "14").unwrap_err();
        assert_eq!(
            err,
            ScheduleError::PastDate {
                end: date(2025, 1, 14)
            }
        );
    }

    #[test]
    fn test_too_far_future() {
        let config = EngineConfig {
            max_years_ahead: 5,
            ..EngineConfig::default()
        };
        let input = EndDateInput::new("2030", "01", "16");
        let err = validate_end_date(&input, None, today(), &config).unwrap_err();
        assert_eq!(err, ScheduleError::TooFarFuture { max_years: 5 });

        let input = EndDateInput::new("2030", "01", "15");
        assert!(validate_end_date(&input, None, today(), &config).is_ok());
    }

    // ── Live year check / prefill ───────────────────────────────────────

    #[test]
    fn test_live_year_waits_for_four_chars() {
        let config = EngineConfig::default();
        assert!(validate_year_live("", &config).is_none());
        assert!(validate_year_live("202", &config).is_none());
        assert_eq!(validate_year_live("2025", &config), Some(Ok(2025)));
    }

    #[test]
    fn test_live_year_reports_range_and_format() {
        let config = EngineConfig::default();
        assert!(matches!(
            validate_year_live("2500", &config),
            Some(Err(ScheduleError::YearRange { .. }))
        ));
        assert_eq!(
            validate_year_live("20250", &config),
            Some(Err(ScheduleError::Format {
                field: DateField::Year
            }))
        );
        assert_eq!(
            validate_year_live("20a5", &config),
            Some(Err(ScheduleError::NotANumber(DateField::Year)))
        );
    }

    #[test]
    fn test_prefill_from_stored_end_shows_inclusive_day() {
        let input = EndDateInput::from_stored_end(date(2025, 3, 1));
        assert_eq!(input, EndDateInput::new("2025", "02", "28"));
    }
}
