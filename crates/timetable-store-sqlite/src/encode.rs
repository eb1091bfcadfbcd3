//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, dates are ISO 8601, clock times are
//! `HH:MM`. Days are stored by name and periods as integers. Nested config
//! fields and snapshots are compact JSON. UUIDs are hyphenated lowercase.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rusqlite::Row;
use serde::{Serialize, de::DeserializeOwned};
use timetable_core::{
  config::{SchoolDay, TimetableConfig, hhmm},
  slot::{Day, Period},
  timetable::{Timetable, TimetableEntry},
  version::{ChangeAction, ChangeLog, TimetableVersion},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

fn decode_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
  s.as_deref().map(decode_uuid).transpose()
}

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_time(t: NaiveTime) -> String { hhmm::format(t) }

fn decode_time(s: &str) -> Result<NaiveTime> {
  hhmm::parse(s).map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_day(d: Day) -> String { d.to_string() }

fn decode_day(s: &str) -> Result<Day> {
  s.parse().map_err(|_| Error::Decode { column: "day", value: s.to_owned() })
}

pub fn encode_period(p: Period) -> i64 { i64::from(p.get()) }

fn decode_period(n: i64) -> Result<Period> {
  u32::try_from(n)
    .ok()
    .and_then(Period::new)
    .ok_or_else(|| Error::Decode { column: "period", value: n.to_string() })
}

pub fn decode_count(column: &'static str, n: i64) -> Result<u32> {
  u32::try_from(n).map_err(|_| Error::Decode { column, value: n.to_string() })
}

pub fn encode_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
  Ok(serde_json::to_string(value)?)
}

fn decode_json<T: DeserializeOwned>(s: &str) -> Result<T> { Ok(serde_json::from_str(s)?) }

fn decode_action(s: &str) -> Result<ChangeAction> {
  s.parse().map_err(|_| Error::Decode { column: "action", value: s.to_owned() })
}

// ─── Configs ─────────────────────────────────────────────────────────────────

pub const CONFIG_COLUMNS: &str = "config_id, name, periods_per_day, school_start_time, \
                                  school_end_time, period_duration, break_periods, \
                                  days_of_week, preferences, is_active, created_at, \
                                  updated_at";

/// Raw values read directly from a `timetable_configs` row.
pub struct RawConfig {
  pub config_id:         String,
  pub name:              String,
  pub periods_per_day:   i64,
  pub school_start_time: String,
  pub school_end_time:   String,
  pub period_duration:   i64,
  pub break_periods:     String,
  pub days_of_week:      String,
  pub preferences:       String,
  pub is_active:         bool,
  pub created_at:        String,
  pub updated_at:        String,
}

impl RawConfig {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      config_id:         row.get(0)?,
      name:              row.get(1)?,
      periods_per_day:   row.get(2)?,
      school_start_time: row.get(3)?,
      school_end_time:   row.get(4)?,
      period_duration:   row.get(5)?,
      break_periods:     row.get(6)?,
      days_of_week:      row.get(7)?,
      preferences:       row.get(8)?,
      is_active:         row.get(9)?,
      created_at:        row.get(10)?,
      updated_at:        row.get(11)?,
    })
  }

  pub fn into_config(self) -> Result<TimetableConfig> {
    Ok(TimetableConfig {
      config_id:  decode_uuid(&self.config_id)?,
      name:       self.name,
      school_day: SchoolDay {
        periods_per_day:   decode_count("periods_per_day", self.periods_per_day)?,
        school_start_time: decode_time(&self.school_start_time)?,
        school_end_time:   decode_time(&self.school_end_time)?,
        period_duration:   self.period_duration,
        break_periods:     decode_json(&self.break_periods)?,
        days_of_week:      decode_json(&self.days_of_week)?,
        preferences:       decode_json(&self.preferences)?,
      },
      is_active:  self.is_active,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

// ─── Timetables ──────────────────────────────────────────────────────────────

pub const TIMETABLE_COLUMNS: &str = "timetable_id, name, term, academic_year, start_date, \
                                     end_date, is_active, config_id, created_at, updated_at";

pub struct RawTimetable {
  pub timetable_id:  String,
  pub name:          String,
  pub term:          String,
  pub academic_year: String,
  pub start_date:    Option<String>,
  pub end_date:      Option<String>,
  pub is_active:     bool,
  pub config_id:     Option<String>,
  pub created_at:    String,
  pub updated_at:    String,
}

impl RawTimetable {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      timetable_id:  row.get(0)?,
      name:          row.get(1)?,
      term:          row.get(2)?,
      academic_year: row.get(3)?,
      start_date:    row.get(4)?,
      end_date:      row.get(5)?,
      is_active:     row.get(6)?,
      config_id:     row.get(7)?,
      created_at:    row.get(8)?,
      updated_at:    row.get(9)?,
    })
  }

  pub fn into_timetable(self) -> Result<Timetable> {
    Ok(Timetable {
      timetable_id:  decode_uuid(&self.timetable_id)?,
      name:          self.name,
      term:          self.term,
      academic_year: self.academic_year,
      start_date:    self.start_date.as_deref().map(decode_date).transpose()?,
      end_date:      self.end_date.as_deref().map(decode_date).transpose()?,
      is_active:     self.is_active,
      config_id:     decode_opt_uuid(self.config_id)?,
      created_at:    decode_dt(&self.created_at)?,
      updated_at:    decode_dt(&self.updated_at)?,
    })
  }
}

// ─── Entries ─────────────────────────────────────────────────────────────────

pub const ENTRY_COLUMNS: &str = "entry_id, timetable_id, day, period, room, class_id, \
                                 teacher_id, subject_id, is_locked, created_at, updated_at";

pub struct RawEntry {
  pub entry_id:     String,
  pub timetable_id: String,
  pub day:          String,
  pub period:       i64,
  pub room:         Option<String>,
  pub class_id:     Option<String>,
  pub teacher_id:   Option<String>,
  pub subject_id:   Option<String>,
  pub is_locked:    bool,
  pub created_at:   String,
  pub updated_at:   String,
}

impl RawEntry {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      entry_id:     row.get(0)?,
      timetable_id: row.get(1)?,
      day:          row.get(2)?,
      period:       row.get(3)?,
      room:         row.get(4)?,
      class_id:     row.get(5)?,
      teacher_id:   row.get(6)?,
      subject_id:   row.get(7)?,
      is_locked:    row.get(8)?,
      created_at:   row.get(9)?,
      updated_at:   row.get(10)?,
    })
  }

  pub fn into_entry(self) -> Result<TimetableEntry> {
    Ok(TimetableEntry {
      entry_id:     decode_uuid(&self.entry_id)?,
      timetable_id: decode_uuid(&self.timetable_id)?,
      day:          decode_day(&self.day)?,
      period:       decode_period(self.period)?,
      room:         self.room,
      class_id:     decode_opt_uuid(self.class_id)?,
      teacher_id:   decode_opt_uuid(self.teacher_id)?,
      subject_id:   decode_opt_uuid(self.subject_id)?,
      is_locked:    self.is_locked,
      created_at:   decode_dt(&self.created_at)?,
      updated_at:   decode_dt(&self.updated_at)?,
    })
  }
}

// ─── Versions ────────────────────────────────────────────────────────────────

pub const VERSION_COLUMNS: &str = "version_id, timetable_id, version_number, description, \
                                   is_active, created_by, snapshot, checksum, created_at";

pub struct RawVersion {
  pub version_id:     String,
  pub timetable_id:   String,
  pub version_number: i64,
  pub description:    Option<String>,
  pub is_active:      bool,
  pub created_by:     Option<String>,
  pub snapshot:       String,
  pub checksum:       String,
  pub created_at:     String,
}

impl RawVersion {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      version_id:     row.get(0)?,
      timetable_id:   row.get(1)?,
      version_number: row.get(2)?,
      description:    row.get(3)?,
      is_active:      row.get(4)?,
      created_by:     row.get(5)?,
      snapshot:       row.get(6)?,
      checksum:       row.get(7)?,
      created_at:     row.get(8)?,
    })
  }

  pub fn into_version(self) -> Result<TimetableVersion> {
    Ok(TimetableVersion {
      version_id:     decode_uuid(&self.version_id)?,
      timetable_id:   decode_uuid(&self.timetable_id)?,
      version_number: decode_count("version_number", self.version_number)?,
      description:    self.description,
      is_active:      self.is_active,
      created_by:     decode_opt_uuid(self.created_by)?,
      snapshot:       decode_json(&self.snapshot)?,
      checksum:       self.checksum,
      created_at:     decode_dt(&self.created_at)?,
    })
  }
}

// ─── Change logs ─────────────────────────────────────────────────────────────

pub const CHANGE_COLUMNS: &str = "change_id, version_id, entry_id, action, old_value, \
                                  new_value, changed_by, reason, created_at";

pub struct RawChange {
  pub change_id:  String,
  pub version_id: String,
  pub entry_id:   Option<String>,
  pub action:     String,
  pub old_value:  Option<String>,
  pub new_value:  Option<String>,
  pub changed_by: String,
  pub reason:     Option<String>,
  pub created_at: String,
}

impl RawChange {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      change_id:  row.get(0)?,
      version_id: row.get(1)?,
      entry_id:   row.get(2)?,
      action:     row.get(3)?,
      old_value:  row.get(4)?,
      new_value:  row.get(5)?,
      changed_by: row.get(6)?,
      reason:     row.get(7)?,
      created_at: row.get(8)?,
    })
  }

  pub fn into_change(self) -> Result<ChangeLog> {
    Ok(ChangeLog {
      change_id:  decode_uuid(&self.change_id)?,
      version_id: decode_uuid(&self.version_id)?,
      entry_id:   decode_opt_uuid(self.entry_id)?,
      action:     decode_action(&self.action)?,
      old_value:  self.old_value.as_deref().map(decode_json).transpose()?,
      new_value:  self.new_value.as_deref().map(decode_json).transpose()?,
      changed_by: decode_uuid(&self.changed_by)?,
      reason:     self.reason,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn days_round_trip_by_name() {
    assert_eq!(encode_day(Day::Wednesday), "Wednesday");
    assert_eq!(decode_day("Wednesday").unwrap(), Day::Wednesday);
    assert!(matches!(decode_day("Someday"), Err(Error::Decode { column: "day", .. })));
  }

  #[test]
  fn period_zero_is_rejected_on_read() {
    assert!(decode_period(0).is_err());
    assert!(decode_period(-1).is_err());
    assert_eq!(decode_period(4).unwrap().get(), 4);
  }
}
