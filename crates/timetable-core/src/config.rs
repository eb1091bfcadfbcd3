//! Timetable configuration: the shape of the school day and week.
//!
//! A config is the input to the grid builder. It is validated before any
//! grid is constructed, and normalised (breaks sorted by anchor, duplicate
//! days removed) before it is stored.

use chrono::{DateTime, NaiveTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ConfigError, slot::Day};

/// Longest teaching day the grid builder accepts, in minutes.
const MINUTES_PER_DAY: i64 = 24 * 60;

// ─── Time of day ─────────────────────────────────────────────────────────────

/// Serde adapter for clock times as `HH:MM` (`HH:MM:SS` accepted on input).
pub mod hhmm {
  use chrono::NaiveTime;
  use serde::{Deserialize, Deserializer, Serializer, de};

  const FORMAT: &str = "%H:%M";

  pub fn serialize<S: Serializer>(t: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(&t.format(FORMAT))
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
    let raw = String::deserialize(d)?;
    parse(&raw).map_err(de::Error::custom)
  }

  pub fn parse(s: &str) -> Result<NaiveTime, chrono::ParseError> {
    NaiveTime::parse_from_str(s, FORMAT)
      .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
  }

  pub fn format(t: NaiveTime) -> String { t.format(FORMAT).to_string() }
}

// ─── Breaks ──────────────────────────────────────────────────────────────────

/// A break inserted into the day after a given teaching period.
///
/// Its clock times are authoritative: the grid builder emits them verbatim
/// and resumes the running clock from `end_time`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakPeriod {
  pub name:         String,
  #[serde(with = "hhmm")]
  pub start_time:   NaiveTime,
  #[serde(with = "hhmm")]
  pub end_time:     NaiveTime,
  /// The teaching period this break follows (1-based).
  pub period_after: u32,
}

// ─── Preferences ─────────────────────────────────────────────────────────────

/// How lessons should be spread across the week. Advisory only; the
/// placement engine does not read it.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Distribution {
  #[default]
  Balanced,
  Compact,
  Spread,
}

/// Free-form scheduling preferences carried with a config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
  #[serde(default)]
  pub allow_double_periods:    bool,
  #[serde(default)]
  pub max_consecutive_periods: Option<u32>,
  #[serde(default)]
  pub distribution:            Distribution,
}

// ─── School day ──────────────────────────────────────────────────────────────

/// The structural part of a config: everything the grid builder reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchoolDay {
  pub periods_per_day:   u32,
  #[serde(with = "hhmm")]
  pub school_start_time: NaiveTime,
  #[serde(with = "hhmm")]
  pub school_end_time:   NaiveTime,
  /// Length of one teaching period in minutes.
  pub period_duration:   i64,
  #[serde(default)]
  pub break_periods:     Vec<BreakPeriod>,
  pub days_of_week:      Vec<Day>,
  #[serde(default)]
  pub preferences:       Preferences,
}

impl SchoolDay {
  /// Reject layouts the grid builder cannot honour.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.periods_per_day == 0 {
      return Err(ConfigError::NoPeriods);
    }
    if self.period_duration <= 0 {
      return Err(ConfigError::NonPositiveDuration(self.period_duration));
    }
    let teaching_minutes =
      i64::from(self.periods_per_day).saturating_mul(self.period_duration);
    if teaching_minutes >= MINUTES_PER_DAY {
      return Err(ConfigError::DayTooLong {
        periods_per_day: self.periods_per_day,
        period_duration: self.period_duration,
      });
    }
    if self.school_end_time <= self.school_start_time {
      return Err(ConfigError::EndNotAfterStart {
        start: hhmm::format(self.school_start_time),
        end:   hhmm::format(self.school_end_time),
      });
    }
    if self.days_of_week.is_empty() {
      return Err(ConfigError::NoDays);
    }

    for b in &self.break_periods {
      if b.end_time < b.start_time {
        return Err(ConfigError::BreakEndsBeforeStart { name: b.name.clone() });
      }
      if !(1..=self.periods_per_day).contains(&b.period_after) {
        return Err(ConfigError::BreakAnchorOutOfRange {
          name:            b.name.clone(),
          period_after:    b.period_after,
          periods_per_day: self.periods_per_day,
        });
      }
    }

    let mut anchors: Vec<u32> =
      self.break_periods.iter().map(|b| b.period_after).collect();
    anchors.sort_unstable();
    if let Some(w) = anchors.windows(2).find(|w| w[0] == w[1]) {
      return Err(ConfigError::DuplicateBreakAnchor(w[0]));
    }

    self.check_fits_school_day()
  }

  /// Walk the running clock the grid builder uses and reject a layout whose
  /// teaching periods run past `school_end_time` or past midnight.
  fn check_fits_school_day(&self) -> Result<(), ConfigError> {
    let step =
      TimeDelta::try_minutes(self.period_duration).unwrap_or_else(TimeDelta::zero);
    let mut clock = self.school_start_time;
    for period in 1..=self.periods_per_day {
      let (end, wrapped) = clock.overflowing_add_signed(step);
      if wrapped != 0 || end > self.school_end_time {
        return Err(ConfigError::PeriodPastSchoolEnd {
          period,
          school_end: hhmm::format(self.school_end_time),
        });
      }
      clock = self
        .break_periods
        .iter()
        .find(|b| b.period_after == period)
        .map_or(end, |b| b.end_time);
    }
    Ok(())
  }

  /// Breaks sorted by anchor; days deduplicated keeping first occurrence.
  pub fn normalized(mut self) -> Self {
    self.break_periods.sort_by_key(|b| b.period_after);
    let mut seen = Vec::with_capacity(self.days_of_week.len());
    self.days_of_week.retain(|d| {
      if seen.contains(d) {
        false
      } else {
        seen.push(*d);
        true
      }
    });
    self
  }
}

// ─── Stored config ───────────────────────────────────────────────────────────

/// A persisted timetable configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimetableConfig {
  pub config_id:  Uuid,
  pub name:       String,
  #[serde(flatten)]
  pub school_day: SchoolDay,
  /// At most one config is active; it is the fallback for generation.
  pub is_active:  bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Input to [`crate::store::TimetableStore::save_config`] and
/// [`crate::store::TimetableStore::update_config`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewConfig {
  pub name:       String,
  #[serde(flatten)]
  pub school_day: SchoolDay,
}

impl NewConfig {
  /// Validate, then normalise.
  pub fn prepared(self) -> Result<Self, ConfigError> {
    self.school_day.validate()?;
    Ok(Self {
      name:       self.name,
      school_day: self.school_day.normalized(),
    })
  }
}
