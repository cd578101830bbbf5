//! # schedule-engine
//!
//! Deterministic date computation for recurring lunch and social schedules.
//!
//! The engine expands recurring schedules into concrete occurrence dates,
//! validates user-typed end dates, and decides how an edit to one occurrence
//! is persisted (exception record, new series, or master update). It never
//! reads the system clock: "today" is always an argument.
//!
//! ## Modules
//!
//! - [`calendar`] — Date arithmetic: intervals with month-end clamping, month lengths, "today"
//! - [`recurrence`] — Recurrence rules, occurrence expansion, calendar markers
//! - [`end_date`] — Year/month/day end-date entry validation
//! - [`schedule`] — Master schedules, exceptions, and the in-memory schedule book
//! - [`record`] — The record shape sent to schedule storage
//! - [`reconcile`] — Single-occurrence vs whole-series edit reconciliation
//! - [`config`] — Engine configuration
//! - [`error`] — Error types

pub mod calendar;
pub mod config;
pub mod end_date;
pub mod error;
pub mod reconcile;
pub mod record;
pub mod recurrence;
pub mod schedule;

pub use calendar::{add_interval, days_in_month, is_leap_year, is_past, today_in, Frequency};
pub use config::EngineConfig;
pub use end_date::{validate_end_date, validate_year_live, EndDateInput};
pub use error::{DateField, ScheduleError};
pub use reconcile::{
    apply_edit, plan_edit, Applied, EditMode, MemoryStore, Reconciliation, RecurrenceChange,
    ScheduleEdit, ScheduleStore,
};
pub use record::{RecurrenceType, ScheduleRecord};
pub use recurrence::{
    expand, expand_with_config, marked_dates, DateMarker, EndPolicy, MarkedDateMap,
    RecurrenceRule,
};
pub use schedule::{
    Occurrence, ScheduleBook, ScheduleException, ScheduleId, ScheduleMaster, SchedulePayload,
};
