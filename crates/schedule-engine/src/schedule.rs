//! Master schedules, single-occurrence exceptions, and the in-memory book
//! that holds them.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::{Result, ScheduleError};
use crate::recurrence::{occurrences, RecurrenceRule};

/// Opaque identifier assigned by the storage collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScheduleId(pub String);

impl fmt::Display for ScheduleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScheduleId {
    fn from(s: &str) -> Self {
        ScheduleId(s.to_string())
    }
}

impl From<String> for ScheduleId {
    fn from(s: String) -> Self {
        ScheduleId(s)
    }
}

/// Display data carried by a schedule. The engine passes it through untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulePayload {
    pub title: String,
    #[serde(default, with = "hhmm")]
    pub time: Option<NaiveTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub attendees: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The canonical record of a schedule; recurring when `recurrence` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleMaster {
    pub id: ScheduleId,
    pub base_date: NaiveDate,
    pub recurrence: Option<RecurrenceRule>,
    pub payload: SchedulePayload,
}

impl ScheduleMaster {
    pub fn is_recurring(&self) -> bool {
        self.recurrence.is_some()
    }

    /// Whether `date` is one of this schedule's occurrences.
    pub fn occurs_on(&self, date: NaiveDate, config: &EngineConfig) -> Result<bool> {
        match &self.recurrence {
            Some(rule) => crate::recurrence::is_occurrence(self.base_date, rule, date, config),
            None => Ok(date == self.base_date),
        }
    }
}

/// Overrides one occurrence of a master schedule without touching the master.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleException {
    pub id: ScheduleId,
    /// Lookup-only link to the overridden master.
    pub master_id: ScheduleId,
    pub occurrence_date: NaiveDate,
    pub payload: SchedulePayload,
}

/// One concrete day of a schedule, resolved against its exceptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence<'a> {
    pub date: NaiveDate,
    pub payload: &'a SchedulePayload,
    /// Set when an exception supplies the payload for this day.
    pub exception_id: Option<&'a ScheduleId>,
}

/// In-memory view of masters and their exceptions.
///
/// Holds at most one exception per (master, occurrence date).
#[derive(Debug, Clone, Default)]
pub struct ScheduleBook {
    masters: BTreeMap<ScheduleId, ScheduleMaster>,
    exceptions: BTreeMap<(ScheduleId, NaiveDate), ScheduleException>,
}

impl ScheduleBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a master.
    pub fn insert_master(&mut self, master: ScheduleMaster) -> Option<ScheduleMaster> {
        self.masters.insert(master.id.clone(), master)
    }

    /// Insert an exception, replacing any existing one for the same
    /// (master, occurrence date) pair.
    pub fn upsert_exception(&mut self, exception: ScheduleException) -> Option<ScheduleException> {
        let key = (exception.master_id.clone(), exception.occurrence_date);
        self.exceptions.insert(key, exception)
    }

    pub fn master(&self, id: &ScheduleId) -> Result<&ScheduleMaster> {
        self.masters
            .get(id)
            .ok_or_else(|| ScheduleError::UnknownSchedule(id.to_string()))
    }

    pub fn exception(&self, master_id: &ScheduleId, date: NaiveDate) -> Option<&ScheduleException> {
        self.exceptions.get(&(master_id.clone(), date))
    }

    pub fn exceptions_for<'a>(
        &'a self,
        master_id: &'a ScheduleId,
    ) -> impl Iterator<Item = &'a ScheduleException> + 'a {
        self.exceptions
            .values()
            .filter(move |exception| &exception.master_id == master_id)
    }

    pub fn masters(&self) -> impl Iterator<Item = &ScheduleMaster> {
        self.masters.values()
    }

    /// Occurrences of a master through `window_end`, with each exception's
    /// payload replacing the master's on its date.
    pub fn occurrences(
        &self,
        master_id: &ScheduleId,
        window_end: NaiveDate,
        config: &EngineConfig,
    ) -> Result<Vec<Occurrence<'_>>> {
        let master = self.master(master_id)?;
        let dates: Vec<NaiveDate> = match &master.recurrence {
            Some(rule) => occurrences(master.base_date, rule, window_end, config)?.collect(),
            None if master.base_date <= window_end => vec![master.base_date],
            None => Vec::new(),
        };

        Ok(dates
            .into_iter()
            .map(|date| match self.exception(master_id, date) {
                Some(exception) => Occurrence {
                    date,
                    payload: &exception.payload,
                    exception_id: Some(&exception.id),
                },
                None => Occurrence {
                    date,
                    payload: &master.payload,
                    exception_id: None,
                },
            })
            .collect())
    }
}

/// `HH:MM` (de)serialization for optional times. Seconds are accepted on
/// input and dropped on output.
pub(crate) mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &Option<NaiveTime>, s: S) -> Result<S::Ok, S::Error> {
        match time {
            Some(t) => s.serialize_str(&t.format("%H:%M").to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveTime>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(text) => NaiveTime::parse_from_str(text, "%H:%M")
                .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M:%S"))
                .map(Some)
                .map_err(|e| serde::de::Error::custom(format!("invalid time '{text}': {e}"))),
        }
    }
}
