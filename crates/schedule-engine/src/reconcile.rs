//! Reconciling an edit of one occurrence with its recurring series.
//!
//! When a user edits a day of a recurring schedule they choose an
//! [`EditMode`]:
//!
//! - [`EditMode::Single`] leaves the master alone. A pure override becomes a
//!   [`ScheduleException`] linked to the master (or updates the existing one
//!   for that date); changing the recurrence too splits the occurrence off into
//!   a brand-new master. An override stays on the date it overrides, so
//!   picking a different date without a new rule is rejected.
//! - [`EditMode::RecurringAll`] applies the changes to the master itself. Its
//!   base date only moves when the user explicitly picked a new date.
//!
//! [`plan_edit`] decides without side effects. [`apply_edit`] persists the
//! decision through a [`ScheduleStore`] and only then updates the in-memory
//! [`ScheduleBook`], so a failed save leaves local state exactly as it was.
//!
//! A split does not touch the parent master, which still produces the split
//! date. Hosts listing both series should hide the parent's occurrence on the
//! new master's base date.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::{Result, ScheduleError};
use crate::record::ScheduleRecord;
use crate::recurrence::RecurrenceRule;
use crate::schedule::{
    ScheduleBook, ScheduleException, ScheduleId, ScheduleMaster, SchedulePayload,
};

/// Scope of an edit made from one occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditMode {
    /// This date only.
    Single,
    /// Every occurrence of the series.
    #[serde(alias = "all")]
    RecurringAll,
}

/// What the edit does to the recurrence settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "action", content = "rule", rename_all = "snake_case")]
pub enum RecurrenceChange {
    /// Leave the recurrence as it is.
    #[default]
    Keep,
    /// Repeat with this rule from now on.
    Set(RecurrenceRule),
    /// Stop repeating.
    Clear,
}

/// The user's changes to one occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEdit {
    pub payload: SchedulePayload,
    #[serde(default)]
    pub recurrence: RecurrenceChange,
    /// A date the user explicitly re-picked in the date picker.
    #[serde(default)]
    pub picked_date: Option<NaiveDate>,
}

/// How an edit will be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    UpdateMaster(ScheduleMaster),
    CreateMaster {
        base_date: NaiveDate,
        recurrence: Option<RecurrenceRule>,
        payload: SchedulePayload,
    },
    CreateException {
        master_id: ScheduleId,
        occurrence_date: NaiveDate,
        payload: SchedulePayload,
    },
    UpdateException(ScheduleException),
}

impl Reconciliation {
    /// The record handed to the storage collaborator.
    pub fn record(&self) -> ScheduleRecord {
        match self {
            Reconciliation::UpdateMaster(master) => ScheduleRecord::from(master),
            Reconciliation::CreateMaster {
                base_date,
                recurrence,
                payload,
            } => ScheduleRecord::for_series(None, *base_date, recurrence.as_ref(), payload),
            Reconciliation::CreateException {
                master_id,
                occurrence_date,
                payload,
            } => ScheduleRecord::for_exception(None, master_id, *occurrence_date, payload),
            Reconciliation::UpdateException(exception) => ScheduleRecord::from(exception),
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Reconciliation::UpdateMaster(_) => "update master",
            Reconciliation::CreateMaster { .. } => "create master",
            Reconciliation::CreateException { .. } => "create exception",
            Reconciliation::UpdateException(_) => "update exception",
        }
    }
}

/// Decide how an edit of `master`'s occurrence on `occurrence_date` is stored.
///
/// `existing` is the exception already recorded for that date, if any.
///
/// A schedule without recurrence has a single occurrence, so it is always
/// updated in place whatever the mode.
///
/// # Errors
///
/// Returns [`ScheduleError::NotAnOccurrence`] if the series never lands on
/// `occurrence_date`, [`ScheduleError::OccurrenceMoved`] if a single-date
/// override picks another date, or [`ScheduleError::InvalidRule`] if the
/// resulting recurrence rule does not fit its base date.
pub fn plan_edit(
    master: &ScheduleMaster,
    existing: Option<&ScheduleException>,
    occurrence_date: NaiveDate,
    mode: EditMode,
    edit: &ScheduleEdit,
    config: &EngineConfig,
) -> Result<Reconciliation> {
    if !master.occurs_on(occurrence_date, config)? {
        return Err(ScheduleError::NotAnOccurrence {
            master_id: master.id.to_string(),
            date: occurrence_date,
        });
    }

    let plan = if !master.is_recurring() || mode == EditMode::RecurringAll {
        Reconciliation::UpdateMaster(edited_master(master, edit)?)
    } else {
        split_occurrence(master, existing, occurrence_date, edit)?
    };

    debug!(
        "edit of {} on {occurrence_date} ({mode:?}) planned as {}",
        master.id,
        plan.describe()
    );
    Ok(plan)
}

fn edited_master(master: &ScheduleMaster, edit: &ScheduleEdit) -> Result<ScheduleMaster> {
    let base_date = edit.picked_date.unwrap_or(master.base_date);
    let recurrence = match &edit.recurrence {
        RecurrenceChange::Keep => master.recurrence.clone(),
        RecurrenceChange::Set(rule) => Some(rule.clone()),
        RecurrenceChange::Clear => None,
    };
    if let Some(rule) = &recurrence {
        rule.validate(base_date)?;
    }
    Ok(ScheduleMaster {
        id: master.id.clone(),
        base_date,
        recurrence,
        payload: edit.payload.clone(),
    })
}

fn split_occurrence(
    master: &ScheduleMaster,
    existing: Option<&ScheduleException>,
    occurrence_date: NaiveDate,
    edit: &ScheduleEdit,
) -> Result<Reconciliation> {
    if let RecurrenceChange::Set(rule) = &edit.recurrence {
        if master.recurrence.as_ref() != Some(rule) {
            let base_date = edit.picked_date.unwrap_or(occurrence_date);
            rule.validate(base_date)?;
            return Ok(Reconciliation::CreateMaster {
                base_date,
                recurrence: Some(rule.clone()),
                payload: edit.payload.clone(),
            });
        }
    }

    if let Some(picked) = edit.picked_date.filter(|picked| *picked != occurrence_date) {
        return Err(ScheduleError::OccurrenceMoved {
            occurrence: occurrence_date,
            picked,
        });
    }

    Ok(match existing {
        Some(exception) => Reconciliation::UpdateException(ScheduleException {
            payload: edit.payload.clone(),
            ..exception.clone()
        }),
        None => Reconciliation::CreateException {
            master_id: master.id.clone(),
            occurrence_date,
            payload: edit.payload.clone(),
        },
    })
}

// ── Persistence ─────────────────────────────────────────────────────────────

/// The schedule storage collaborator.
///
/// Implementations report failures as [`ScheduleError::Persistence`].
pub trait ScheduleStore {
    /// Store a new record and return the id assigned to it.
    fn create(&mut self, record: &ScheduleRecord) -> Result<ScheduleId>;

    /// Replace the record stored under `id`.
    fn update(&mut self, id: &ScheduleId, record: &ScheduleRecord) -> Result<()>;
}

/// The outcome of a committed edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "id", rename_all = "snake_case")]
pub enum Applied {
    MasterUpdated(ScheduleId),
    MasterCreated(ScheduleId),
    ExceptionCreated(ScheduleId),
    ExceptionUpdated(ScheduleId),
}

impl Applied {
    pub fn id(&self) -> &ScheduleId {
        match self {
            Applied::MasterUpdated(id)
            | Applied::MasterCreated(id)
            | Applied::ExceptionCreated(id)
            | Applied::ExceptionUpdated(id) => id,
        }
    }
}

/// Plan, persist and commit an edit of one occurrence.
///
/// The book is only modified after the store accepted the record. A store
/// failure is logged and returned unchanged; there is no retry.
pub fn apply_edit<S: ScheduleStore + ?Sized>(
    store: &mut S,
    book: &mut ScheduleBook,
    master_id: &ScheduleId,
    occurrence_date: NaiveDate,
    mode: EditMode,
    edit: &ScheduleEdit,
    config: &EngineConfig,
) -> Result<Applied> {
    let master = book.master(master_id)?;
    let existing = book.exception(master_id, occurrence_date);
    let plan = plan_edit(master, existing, occurrence_date, mode, edit, config)?;
    let record = plan.record();

    let saved = match &plan {
        Reconciliation::UpdateMaster(master) => store.update(&master.id, &record).map(|_| None),
        Reconciliation::UpdateException(exception) => {
            store.update(&exception.id, &record).map(|_| None)
        }
        Reconciliation::CreateMaster { .. } | Reconciliation::CreateException { .. } => {
            store.create(&record).map(Some)
        }
    };
    let new_id = match saved {
        Ok(new_id) => new_id,
        Err(err) => {
            warn!("failed to {} for {master_id}: {err}", plan.describe());
            return Err(err);
        }
    };

    let applied = match (plan, new_id) {
        (Reconciliation::UpdateMaster(master), _) => {
            let id = master.id.clone();
            book.insert_master(master);
            Applied::MasterUpdated(id)
        }
        (Reconciliation::UpdateException(exception), _) => {
            let id = exception.id.clone();
            book.upsert_exception(exception);
            Applied::ExceptionUpdated(id)
        }
        (
            Reconciliation::CreateMaster {
                base_date,
                recurrence,
                payload,
            },
            Some(id),
        ) => {
            book.insert_master(ScheduleMaster {
                id: id.clone(),
                base_date,
                recurrence,
                payload,
            });
            Applied::MasterCreated(id)
        }
        (
            Reconciliation::CreateException {
                master_id,
                occurrence_date,
                payload,
            },
            Some(id),
        ) => {
            book.upsert_exception(ScheduleException {
                id: id.clone(),
                master_id,
                occurrence_date,
                payload,
            });
            Applied::ExceptionCreated(id)
        }
        (_, None) => {
            return Err(ScheduleError::Persistence(
                "store did not return an id for a new record".to_string(),
            ))
        }
    };

    info!("committed edit of {master_id} on {occurrence_date}: {applied:?}");
    Ok(applied)
}

// ── In-memory store ─────────────────────────────────────────────────────────

/// A [`ScheduleStore`] that keeps records in memory and hands out sequential
/// numeric ids. A failure can be armed to exercise error paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: BTreeMap<ScheduleId, ScheduleRecord>,
    next_id: u64,
    failure: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record under a known id.
    pub fn insert(&mut self, id: ScheduleId, record: ScheduleRecord) {
        self.records.insert(id, record);
    }

    /// Make every following call fail with `message` until cleared.
    pub fn fail_with(&mut self, message: impl Into<String>) {
        self.failure = Some(message.into());
    }

    pub fn clear_failure(&mut self) {
        self.failure = None;
    }

    pub fn get(&self, id: &ScheduleId) -> Option<&ScheduleRecord> {
        self.records.get(id)
    }

    pub fn records(&self) -> &BTreeMap<ScheduleId, ScheduleRecord> {
        &self.records
    }

    fn check_failure(&self) -> Result<()> {
        match &self.failure {
            Some(message) => Err(ScheduleError::Persistence(message.clone())),
            None => Ok(()),
        }
    }
}

impl ScheduleStore for MemoryStore {
    fn create(&mut self, record: &ScheduleRecord) -> Result<ScheduleId> {
        self.check_failure()?;
        let id = loop {
            self.next_id += 1;
            let candidate = ScheduleId(self.next_id.to_string());
            if !self.records.contains_key(&candidate) {
                break candidate;
            }
        };
        let mut stored = record.clone();
        stored.id = Some(id.clone());
        self.records.insert(id.clone(), stored);
        Ok(id)
    }

    fn update(&mut self, id: &ScheduleId, record: &ScheduleRecord) -> Result<()> {
        self.check_failure()?;
        let slot = self
            .records
            .get_mut(id)
            .ok_or_else(|| ScheduleError::Persistence(format!("no schedule stored under {id}")))?;
        let mut stored = record.clone();
        stored.id = Some(id.clone());
        *slot = stored;
        Ok(())
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
