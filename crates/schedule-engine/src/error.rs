//! Error types for schedule-engine operations.
//!
//! Every variant is a recoverable, user-facing condition. Validation variants
//! name the input field they belong to so a host can render the message next
//! to it.

use std::fmt;

use chrono::NaiveDate;
use thiserror::Error;

/// One of the three free-text end-date inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    Year,
    Month,
    Day,
}

impl DateField {
    /// Number of digits the field must be typed with.
    pub fn width(self) -> usize {
        match self {
            DateField::Year => 4,
            DateField::Month | DateField::Day => 2,
        }
    }
}

impl fmt::Display for DateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DateField::Year => "year",
            DateField::Month => "month",
            DateField::Day => "day",
        })
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("Invalid recurrence rule: {0}")]
    InvalidRule(String),

    #[error("Please enter the {0}")]
    MissingField(DateField),

    #[error("The {0} must be a number")]
    NotANumber(DateField),

    #[error("The {field} must be entered as {width} digits", width = .field.width())]
    Format { field: DateField },

    #[error("Year must be between {min} and {max}")]
    YearRange { min: i32, max: i32 },

    #[error("Month must be between 1 and 12")]
    MonthRange,

    #[error("{year}-{month:02} only has {max_day} days")]
    DayRange { year: i32, month: u32, max_day: u32 },

    #[error("End date {end} is before the start date {start}")]
    BeforeStart { start: NaiveDate, end: NaiveDate },

    #[error("End date must be at least one day after the start date {start}")]
    MinGap { start: NaiveDate },

    #[error("End date {end} is in the past")]
    PastDate { end: NaiveDate },

    #[error("End date must be within {max_years} years from today")]
    TooFarFuture { max_years: u32 },

    #[error("{date} is not an occurrence of schedule {master_id}")]
    NotAnOccurrence { master_id: String, date: NaiveDate },

    #[error("A single-date edit cannot move {occurrence} to {picked}; edit the whole series or change its recurrence")]
    OccurrenceMoved {
        occurrence: NaiveDate,
        picked: NaiveDate,
    },

    #[error("Unknown schedule: {0}")]
    UnknownSchedule(String),

    #[error("Invalid schedule record: {0}")]
    InvalidRecord(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to save schedule: {0}")]
    Persistence(String),
}

impl ScheduleError {
    /// The end-date input this error should be displayed next to, if any.
    pub fn field(&self) -> Option<DateField> {
        match self {
            ScheduleError::MissingField(field)
            | ScheduleError::NotANumber(field)
            | ScheduleError::Format { field } => Some(*field),
            ScheduleError::YearRange { .. } => Some(DateField::Year),
            ScheduleError::MonthRange => Some(DateField::Month),
            ScheduleError::DayRange { .. } => Some(DateField::Day),
            _ => None,
        }
    }

    /// Whether this is a local input-validation error rather than a
    /// collaborator or configuration failure.
    pub fn is_validation(&self) -> bool {
        !matches!(
            self,
            ScheduleError::Persistence(_)
                | ScheduleError::Config(_)
                | ScheduleError::InvalidTimezone(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ScheduleError>;
