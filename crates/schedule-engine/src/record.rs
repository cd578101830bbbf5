//! The record shape exchanged with the schedule storage collaborator.
//!
//! This is the one place where field names are normalized. Older clients send
//! camelCase keys (`recurrenceType`, `startDate`, ...); they are accepted on
//! input and the snake_case form is always written back.

use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::calendar::Frequency;
use crate::error::{Result, ScheduleError};
use crate::recurrence::{EndPolicy, RecurrenceRule};
use crate::schedule::{hhmm, ScheduleException, ScheduleId, ScheduleMaster, SchedulePayload};

/// `recurrence_type` on the wire: a frequency, or `none` for a one-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceType {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl RecurrenceType {
    pub fn frequency(self) -> Option<Frequency> {
        match self {
            RecurrenceType::None => None,
            RecurrenceType::Daily => Some(Frequency::Daily),
            RecurrenceType::Weekly => Some(Frequency::Weekly),
            RecurrenceType::Monthly => Some(Frequency::Monthly),
            RecurrenceType::Yearly => Some(Frequency::Yearly),
        }
    }
}

impl From<Option<Frequency>> for RecurrenceType {
    fn from(frequency: Option<Frequency>) -> Self {
        match frequency {
            None => RecurrenceType::None,
            Some(Frequency::Daily) => RecurrenceType::Daily,
            Some(Frequency::Weekly) => RecurrenceType::Weekly,
            Some(Frequency::Monthly) => RecurrenceType::Monthly,
            Some(Frequency::Yearly) => RecurrenceType::Yearly,
        }
    }
}

impl fmt::Display for RecurrenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.frequency() {
            Some(frequency) => fmt::Display::fmt(&frequency, f),
            None => f.write_str("none"),
        }
    }
}

fn default_interval() -> i32 {
    1
}

/// A schedule as the storage collaborator sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ScheduleId>,

    pub title: String,

    /// Base date for a master, overridden date for an exception.
    #[serde(alias = "startDate")]
    pub start_date: NaiveDate,

    #[serde(default, with = "hhmm")]
    pub time: Option<NaiveTime>,

    #[serde(default, alias = "recurrenceType")]
    pub recurrence_type: RecurrenceType,

    #[serde(default = "default_interval", alias = "recurrenceInterval")]
    pub recurrence_interval: i32,

    /// Exclusive end of the series, `null` when it never ends.
    #[serde(default, alias = "recurrenceEndDate")]
    pub recurrence_end_date: Option<NaiveDate>,

    #[serde(default)]
    pub attendees: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, alias = "isException")]
    pub is_exception: bool,

    #[serde(
        default,
        alias = "originalRecurringScheduleId",
        skip_serializing_if = "Option::is_none"
    )]
    pub original_recurring_schedule_id: Option<ScheduleId>,
}

impl ScheduleRecord {
    /// Record for a (possibly not yet stored) master schedule.
    pub fn for_series(
        id: Option<ScheduleId>,
        base_date: NaiveDate,
        recurrence: Option<&RecurrenceRule>,
        payload: &SchedulePayload,
    ) -> Self {
        let mut record = Self::from_payload(id, base_date, payload);
        if let Some(rule) = recurrence {
            record.recurrence_type = Some(rule.frequency).into();
            record.recurrence_interval = rule.interval;
            record.recurrence_end_date = rule.effective_end_date();
        }
        record
    }

    /// Record for a (possibly not yet stored) single-occurrence exception.
    pub fn for_exception(
        id: Option<ScheduleId>,
        master_id: &ScheduleId,
        occurrence_date: NaiveDate,
        payload: &SchedulePayload,
    ) -> Self {
        let mut record = Self::from_payload(id, occurrence_date, payload);
        record.is_exception = true;
        record.original_recurring_schedule_id = Some(master_id.clone());
        record
    }

    fn from_payload(id: Option<ScheduleId>, start_date: NaiveDate, payload: &SchedulePayload) -> Self {
        ScheduleRecord {
            id,
            title: payload.title.clone(),
            start_date,
            time: payload.time,
            recurrence_type: RecurrenceType::None,
            recurrence_interval: default_interval(),
            recurrence_end_date: None,
            attendees: payload.attendees.clone(),
            location: payload.location.clone(),
            description: payload.description.clone(),
            is_exception: false,
            original_recurring_schedule_id: None,
        }
    }

    pub fn payload(&self) -> SchedulePayload {
        SchedulePayload {
            title: self.title.clone(),
            time: self.time,
            location: self.location.clone(),
            attendees: self.attendees.clone(),
            description: self.description.clone(),
        }
    }

    /// The recurrence rule this record describes, if any.
    pub fn recurrence_rule(&self) -> Option<RecurrenceRule> {
        let frequency = self.recurrence_type.frequency()?;
        Some(RecurrenceRule {
            frequency,
            interval: self.recurrence_interval,
            end_policy: match self.recurrence_end_date {
                Some(_) => EndPolicy::OnDate,
                None => EndPolicy::Never,
            },
            end_date: self.recurrence_end_date,
        })
    }

    fn require_id(&self) -> Result<ScheduleId> {
        self.id
            .clone()
            .ok_or_else(|| ScheduleError::InvalidRecord(format!("'{}' has no id", self.title)))
    }
}

impl From<&ScheduleMaster> for ScheduleRecord {
    fn from(master: &ScheduleMaster) -> Self {
        ScheduleRecord::for_series(
            Some(master.id.clone()),
            master.base_date,
            master.recurrence.as_ref(),
            &master.payload,
        )
    }
}

impl From<&ScheduleException> for ScheduleRecord {
    fn from(exception: &ScheduleException) -> Self {
        ScheduleRecord::for_exception(
            Some(exception.id.clone()),
            &exception.master_id,
            exception.occurrence_date,
            &exception.payload,
        )
    }
}

impl TryFrom<ScheduleRecord> for ScheduleMaster {
    type Error = ScheduleError;

    fn try_from(record: ScheduleRecord) -> Result<Self> {
        if record.is_exception {
            return Err(ScheduleError::InvalidRecord(format!(
                "'{}' is an exception, not a master schedule",
                record.title
            )));
        }
        let id = record.require_id()?;
        let recurrence = record.recurrence_rule();
        if let Some(rule) = &recurrence {
            rule.validate(record.start_date)?;
        }
        Ok(ScheduleMaster {
            id,
            base_date: record.start_date,
            recurrence,
            payload: record.payload(),
        })
    }
}

impl TryFrom<ScheduleRecord> for ScheduleException {
    type Error = ScheduleError;

    fn try_from(record: ScheduleRecord) -> Result<Self> {
        let master_id = match (&record.original_recurring_schedule_id, record.is_exception) {
            (Some(master_id), true) => master_id.clone(),
            _ => {
                return Err(ScheduleError::InvalidRecord(format!(
                    "'{}' is not linked to a recurring schedule",
                    record.title
                )))
            }
        };
        Ok(ScheduleException {
            id: record.require_id()?,
            master_id,
            occurrence_date: record.start_date,
            payload: record.payload(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn master() -> ScheduleMaster {
        ScheduleMaster {
            id: "42".into(),
            base_date: date(2025, 1, 1),
            recurrence: Some(RecurrenceRule::new(Frequency::Weekly, 2).until(date(2025, 2, 1))),
            payload: SchedulePayload {
                title: "Lunch".into(),
                time: NaiveTime::from_hms_opt(12, 0, 0),
                attendees: vec!["7".into(), "9".into()],
                ..SchedulePayload::default()
            },
        }
    }

    #[test]
    fn test_master_record_shape() {
        let value = serde_json::to_value(ScheduleRecord::from(&master())).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "42",
                "title": "Lunch",
                "start_date": "2025-01-01",
                "time": "12:00",
                "recurrence_type": "weekly",
                "recurrence_interval": 2,
                "recurrence_end_date": "2025-02-01",
                "attendees": ["7", "9"],
                "is_exception": false
            })
        );
    }

    #[test]
    fn test_one_off_record_has_null_end_date() {
        let mut one_off = master();
        one_off.recurrence = None;
        let value = serde_json::to_value(ScheduleRecord::from(&one_off)).unwrap();
        assert_eq!(value["recurrence_type"], "none");
        assert_eq!(value["recurrence_end_date"], serde_json::Value::Null);
    }

    #[test]
    fn test_exception_record_links_master() {
        let exception = ScheduleException {
            id: "43".into(),
            master_id: "42".into(),
            occurrence_date: date(2025, 1, 15),
            payload: master().payload,
        };
        let value = serde_json::to_value(ScheduleRecord::from(&exception)).unwrap();
        assert_eq!(value["is_exception"], true);
        assert_eq!(value["original_recurring_schedule_id"], "42");
        assert_eq!(value["start_date"], "2025-01-15");
    }

    #[test]
    fn test_camel_case_input_is_normalized() {
        let record: ScheduleRecord = serde_json::from_value(json!({
            "id": "42",
            "title": "Lunch",
            "startDate": "2025-01-01",
            "time": "12:00",
            "recurrenceType": "weekly",
            "recurrenceInterval": 2,
            "recurrenceEndDate": "2025-02-01"
        }))
        .unwrap();
        let parsed = ScheduleMaster::try_from(record).unwrap();
        assert_eq!(parsed.recurrence, master().recurrence);
        assert_eq!(parsed.base_date, date(2025, 1, 1));

        let value = serde_json::to_value(ScheduleRecord::from(&parsed)).unwrap();
        assert!(value.get("recurrenceType").is_none());
        assert_eq!(value["recurrence_type"], "weekly");
    }

    #[test]
    fn test_master_record_requires_id() {
        let mut record = ScheduleRecord::from(&master());
        record.id = None;
        let err = ScheduleMaster::try_from(record).unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidRecord(_)));
    }

    #[test]
    fn test_master_record_rejects_bad_interval() {
        let mut record = ScheduleRecord::from(&master());
        record.recurrence_interval = 0;
        let err = ScheduleMaster::try_from(record).unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidRule(_)));
    }

    #[test]
    fn test_exception_round_trip_through_record() {
        let exception = ScheduleException {
            id: "43".into(),
            master_id: "42".into(),
            occurrence_date: date(2025, 1, 15),
            payload: master().payload,
        };
        let back = ScheduleException::try_from(ScheduleRecord::from(&exception)).unwrap();
        assert_eq!(back, exception);
        assert!(ScheduleException::try_from(ScheduleRecord::from(&master())).is_err());
    }
}
