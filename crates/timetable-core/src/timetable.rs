//! Timetables and their entries.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  slot::{Day, Period, Slot},
};

// ─── Timetable ───────────────────────────────────────────────────────────────

/// A named timetable for one term. Owns its entries; deleting it cascades.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timetable {
  pub timetable_id:  Uuid,
  pub name:          String,
  pub term:          String,
  pub academic_year: String,
  pub start_date:    Option<NaiveDate>,
  pub end_date:      Option<NaiveDate>,
  pub is_active:     bool,
  /// Nulled when the referenced config is deleted.
  pub config_id:     Option<Uuid>,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

/// Input for creating or replacing a [`Timetable`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTimetable {
  pub name:          String,
  pub term:          String,
  pub academic_year: String,
  #[serde(default)]
  pub start_date:    Option<NaiveDate>,
  #[serde(default)]
  pub end_date:      Option<NaiveDate>,
  #[serde(default)]
  pub is_active:     bool,
  #[serde(default)]
  pub config_id:     Option<Uuid>,
}

impl NewTimetable {
  pub fn validate(&self) -> Result<()> {
    if let (Some(start), Some(end)) = (self.start_date, self.end_date)
      && end < start
    {
      return Err(Error::InvalidDateRange {
        start: start.to_string(),
        end:   end.to_string(),
      });
    }
    Ok(())
  }
}

// ─── Entries ─────────────────────────────────────────────────────────────────

/// One lesson placed in a timetable slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimetableEntry {
  pub entry_id:     Uuid,
  pub timetable_id: Uuid,
  pub day:          Day,
  pub period:       Period,
  pub room:         Option<String>,
  pub class_id:     Option<Uuid>,
  pub teacher_id:   Option<Uuid>,
  pub subject_id:   Option<Uuid>,
  /// Locked entries survive regeneration and refuse deletion until unlocked.
  pub is_locked:    bool,
  pub created_at:   DateTime<Utc>,
  pub updated_at:   DateTime<Utc>,
}

impl TimetableEntry {
  pub fn slot(&self) -> Slot { Slot::new(self.day, self.period) }
}

/// Input for placing or replacing a single entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEntry {
  pub day:        Day,
  pub period:     Period,
  #[serde(default)]
  pub room:       Option<String>,
  #[serde(default)]
  pub class_id:   Option<Uuid>,
  #[serde(default)]
  pub teacher_id: Option<Uuid>,
  #[serde(default)]
  pub subject_id: Option<Uuid>,
  #[serde(default)]
  pub is_locked:  bool,
}

impl NewEntry {
  pub fn slot(&self) -> Slot { Slot::new(self.day, self.period) }
}

impl From<&TimetableEntry> for NewEntry {
  fn from(e: &TimetableEntry) -> Self {
    Self {
      day:        e.day,
      period:     e.period,
      room:       e.room.clone(),
      class_id:   e.class_id,
      teacher_id: e.teacher_id,
      subject_id: e.subject_id,
      is_locked:  e.is_locked,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn reversed_dates_are_rejected() {
    let mut input = NewTimetable {
      name:          "Main".into(),
      term:          "Term 1".into(),
      academic_year: "2026/2027".into(),
      start_date:    NaiveDate::from_ymd_opt(2026, 9, 1),
      end_date:      NaiveDate::from_ymd_opt(2026, 8, 1),
      is_active:     true,
      config_id:     None,
    };
    assert!(matches!(input.validate(), Err(Error::InvalidDateRange { .. })));

    input.end_date = NaiveDate::from_ymd_opt(2026, 12, 18);
    assert!(input.validate().is_ok());
  }

  #[test]
  fn new_entry_accepts_numeric_period_and_defaults() {
    let entry: NewEntry = serde_json::from_value(serde_json::json!({
      "day": "Monday",
      "period": 3,
    }))
    .unwrap();
    assert_eq!(entry.period.get(), 3);
    assert!(entry.teacher_id.is_none());
    assert!(!entry.is_locked);
  }
}
