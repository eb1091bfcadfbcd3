//! Error types for `timetable-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::slot::Slot;

/// A timetable configuration that cannot be turned into a grid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
  #[error("periods per day must be at least 1")]
  NoPeriods,

  #[error("period duration must be positive, got {0} minutes")]
  NonPositiveDuration(i64),

  #[error(
    "{periods_per_day} periods of {period_duration} minutes do not fit in one \
     day"
  )]
  DayTooLong {
    periods_per_day: u32,
    period_duration: i64,
  },

  #[error("school end time {end} is not after start time {start}")]
  EndNotAfterStart { start: String, end: String },

  #[error("at least one day of the week must be configured")]
  NoDays,

  #[error("break {name:?} ends before it starts")]
  BreakEndsBeforeStart { name: String },

  #[error(
    "break {name:?} is anchored after period {period_after}, outside \
     1..={periods_per_day}"
  )]
  BreakAnchorOutOfRange {
    name:            String,
    period_after:    u32,
    periods_per_day: u32,
  },

  #[error("more than one break is anchored after period {0}")]
  DuplicateBreakAnchor(u32),

  #[error("period {period} would end after the school day ends at {school_end}")]
  PeriodPastSchoolEnd { period: u32, school_end: String },
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid configuration: {0}")]
  InvalidConfig(#[from] ConfigError),

  #[error("timetable not found: {0}")]
  TimetableNotFound(Uuid),

  #[error("timetable config not found: {0}")]
  ConfigNotFound(Uuid),

  #[error("no active timetable config")]
  NoActiveConfig,

  #[error("timetable entry not found: {0}")]
  EntryNotFound(Uuid),

  #[error("timetable version not found: {0}")]
  VersionNotFound(Uuid),

  #[error("timetable entry {0} is locked")]
  EntryLocked(Uuid),

  #[error("{0} is outside the configured grid")]
  SlotOutsideGrid(Slot),

  #[error("end date {end} is before start date {start}")]
  InvalidDateRange { start: String, end: String },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend error.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
