//! Recurrence rules and occurrence expansion.
//!
//! A series starts on its base date and repeats every `interval` units of its
//! [`Frequency`]. The k-th occurrence is always computed from the base date
//! (`base + k * interval`), never from the previous occurrence, so month-end
//! clamping does not drift: a series anchored on Jan 31 yields Feb 28 and then
//! Mar 31.
//!
//! # End semantics
//!
//! A rule's `end_date` is **exclusive**. The end-date validator already adds
//! one day to what the user typed, so "ends on June 10" is stored as June 11
//! and June 10 stays an occurrence day.
//!
//! A rule that never ends is expanded up to
//! [`EngineConfig::horizon_years`](crate::config::EngineConfig) after its base
//! date so that expansion always terminates.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::calendar::{add_interval, format_iso_date, Frequency};
use crate::config::EngineConfig;
use crate::error::{Result, ScheduleError};

/// How a series ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndPolicy {
    #[default]
    Never,
    OnDate,
}

fn default_interval() -> i32 {
    1
}

/// The (frequency, interval, end policy) tuple governing a series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    /// Every N units. Must be positive.
    #[serde(default = "default_interval")]
    pub interval: i32,
    #[serde(default)]
    pub end_policy: EndPolicy,
    /// Exclusive end. Only consulted when `end_policy` is [`EndPolicy::OnDate`].
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl RecurrenceRule {
    /// A rule that never ends.
    pub fn new(frequency: Frequency, interval: i32) -> Self {
        RecurrenceRule {
            frequency,
            interval,
            end_policy: EndPolicy::Never,
            end_date: None,
        }
    }

    /// End the series before `end_date` (exclusive).
    pub fn until(mut self, end_date: NaiveDate) -> Self {
        self.end_policy = EndPolicy::OnDate;
        self.end_date = Some(end_date);
        self
    }

    /// The exclusive end date, if the rule has one in effect.
    pub fn effective_end_date(&self) -> Option<NaiveDate> {
        match self.end_policy {
            EndPolicy::Never => None,
            EndPolicy::OnDate => self.end_date,
        }
    }

    /// Check the rule against the base date of the series it governs.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::InvalidRule`] if the interval is not positive,
    /// an `on_date` rule has no end date, or the end date is not strictly
    /// after `base_date`.
    pub fn validate(&self, base_date: NaiveDate) -> Result<()> {
        if self.interval <= 0 {
            return Err(ScheduleError::InvalidRule(format!(
                "interval must be positive, got {}",
                self.interval
            )));
        }
        if self.end_policy == EndPolicy::OnDate {
            let end = self.end_date.ok_or_else(|| {
                ScheduleError::InvalidRule("end policy is on_date but no end date is set".into())
            })?;
            if end <= base_date {
                return Err(ScheduleError::InvalidRule(format!(
                    "end date {end} must be after the base date {base_date}"
                )));
            }
        }
        Ok(())
    }
}

// ── Occurrence iteration ────────────────────────────────────────────────────

/// Lazy, strictly increasing sequence of occurrence dates.
///
/// Built by [`occurrences`]; yields dates in `[base_date, last]`.
#[derive(Debug, Clone)]
pub struct Occurrences {
    base_date: NaiveDate,
    frequency: Frequency,
    interval: i32,
    last: Option<NaiveDate>,
    step: i32,
}

impl Iterator for Occurrences {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        let last = self.last?;
        let offset = self.step.checked_mul(self.interval)?;
        let date = add_interval(self.base_date, self.frequency, offset)?;
        if date > last {
            self.last = None;
            return None;
        }
        self.step = self.step.checked_add(1)?;
        Some(date)
    }
}

/// The exclusive date at which a never-ending series stops being expanded.
pub fn horizon_end(base_date: NaiveDate, config: &EngineConfig) -> Option<NaiveDate> {
    let years = i32::try_from(config.horizon_years).ok()?;
    add_interval(base_date, Frequency::Yearly, years)
}

/// Iterate the occurrences of `rule` from `base_date` through `window_end`
/// (inclusive), stopping early at the rule's exclusive end date or at the
/// configured horizon.
pub fn occurrences(
    base_date: NaiveDate,
    rule: &RecurrenceRule,
    window_end: NaiveDate,
    config: &EngineConfig,
) -> Result<Occurrences> {
    rule.validate(base_date)?;

    let exclusive_end = match rule.effective_end_date() {
        Some(end) => Some(end),
        None => horizon_end(base_date, config),
    };
    let last = match exclusive_end.and_then(|end| end.pred_opt()) {
        Some(before_end) => before_end.min(window_end),
        None => window_end,
    };

    Ok(Occurrences {
        base_date,
        frequency: rule.frequency,
        interval: rule.interval,
        last: (last >= base_date).then_some(last),
        step: 0,
    })
}

/// Expand a series into its occurrence dates within `[base_date, window_end]`,
/// using the default engine configuration.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use schedule_engine::calendar::Frequency;
/// use schedule_engine::recurrence::{expand, RecurrenceRule};
///
/// let base = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
/// let end = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
/// let rule = RecurrenceRule::new(Frequency::Weekly, 2).until(end);
///
/// let dates = expand(base, &rule, NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()).unwrap();
/// assert_eq!(dates.len(), 3); // Jan 1, Jan 15, Jan 29
/// ```
pub fn expand(
    base_date: NaiveDate,
    rule: &RecurrenceRule,
    window_end: NaiveDate,
) -> Result<Vec<NaiveDate>> {
    expand_with_config(base_date, rule, window_end, &EngineConfig::default())
}

/// Expand a series with an explicit configuration (horizon length).
pub fn expand_with_config(
    base_date: NaiveDate,
    rule: &RecurrenceRule,
    window_end: NaiveDate,
    config: &EngineConfig,
) -> Result<Vec<NaiveDate>> {
    let dates: Vec<NaiveDate> = occurrences(base_date, rule, window_end, config)?.collect();
    debug!(
        "expanded {} every {} {} from {base_date} to {window_end}: {} occurrences",
        rule.frequency,
        rule.interval,
        match rule.effective_end_date() {
            Some(end) => format!("(until {end})"),
            None => "(no end)".to_string(),
        },
        dates.len()
    );
    Ok(dates)
}

/// Whether `date` is one of the occurrences of the series.
pub fn is_occurrence(
    base_date: NaiveDate,
    rule: &RecurrenceRule,
    date: NaiveDate,
    config: &EngineConfig,
) -> Result<bool> {
    Ok(occurrences(base_date, rule, date, config)?.any(|d| d == date))
}

// ── Marked dates ────────────────────────────────────────────────────────────

/// Display marker for one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateMarker {
    pub selected: bool,
    pub marked: bool,
}

/// ISO date (`YYYY-MM-DD`) → marker, ordered by date.
pub type MarkedDateMap = BTreeMap<String, DateMarker>;

/// Build the calendar markers for a schedule.
///
/// The base date is `selected`; every later occurrence up to `window_end` is
/// `marked`. A schedule without a rule marks only its base date.
pub fn marked_dates(
    base_date: NaiveDate,
    rule: Option<&RecurrenceRule>,
    window_end: NaiveDate,
    config: &EngineConfig,
) -> Result<MarkedDateMap> {
    let mut map = MarkedDateMap::new();
    if let Some(rule) = rule {
        for date in occurrences(base_date, rule, window_end, config)?.skip(1) {
            map.insert(
                format_iso_date(date),
                DateMarker {
                    selected: false,
                    marked: true,
                },
            );
        }
    }
    map.insert(
        format_iso_date(base_date),
        DateMarker {
            selected: true,
            marked: false,
        },
    );
    Ok(map)
}

// ── Tests ───────────────────────────────────────────────────────────────────
