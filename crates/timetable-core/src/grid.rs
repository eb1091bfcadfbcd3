//! Period grid construction.
//!
//! A config expands into one day's sequence of teaching periods and breaks;
//! [`WeekGrid`] repeats that sequence over the configured days and yields
//! every teaching [`Slot`] in day-major order.

use chrono::{NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::{
  config::{SchoolDay, hhmm},
  slot::{Day, Period, Slot},
};

/// One cell of a day grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GridCell {
  Teaching {
    period: Period,
    #[serde(with = "hhmm")]
    start:  NaiveTime,
    #[serde(with = "hhmm")]
    end:    NaiveTime,
  },
  Break {
    name:         String,
    #[serde(with = "hhmm")]
    start:        NaiveTime,
    #[serde(with = "hhmm")]
    end:          NaiveTime,
    after_period: Period,
  },
}

impl GridCell {
  pub fn teaching_period(&self) -> Option<Period> {
    match self {
      Self::Teaching { period, .. } => Some(*period),
      Self::Break { .. } => None,
    }
  }
}

/// Expand one school day into its ordered cells.
///
/// Teaching periods advance a running clock from `school_start_time`. After
/// period `i`, a break anchored at `i` is emitted with its own clock times and
/// the running clock resumes from the break's end, so gaps or overlaps against
/// the computed times are kept as configured. Breaks anchored past the last
/// period are never emitted. A period that would run past midnight ends the
/// day; validated layouts never reach it.
pub fn build_day(day: &SchoolDay) -> Vec<GridCell> {
  let mut breaks: Vec<_> = day.break_periods.iter().collect();
  breaks.sort_by_key(|b| b.period_after);
  let mut breaks = breaks.into_iter().peekable();

  let step =
    TimeDelta::try_minutes(day.period_duration).unwrap_or_else(TimeDelta::zero);
  let mut clock = day.school_start_time;
  let mut cells =
    Vec::with_capacity(day.periods_per_day as usize + day.break_periods.len());

  for n in 1..=day.periods_per_day {
    let (end, wrapped) = clock.overflowing_add_signed(step);
    if wrapped != 0 {
      tracing::warn!(period = n, "grid runs past midnight; truncating the day");
      break;
    }
    let Some(period) = Period::new(n) else { continue };
    cells.push(GridCell::Teaching { period, start: clock, end });
    clock = end;

    // Anchors below `n` can only appear in unvalidated configs; skip them.
    while breaks.next_if(|b| b.period_after < n).is_some() {}
    while let Some(b) = breaks.next_if(|b| b.period_after == n) {
      cells.push(GridCell::Break {
        name:         b.name.clone(),
        start:        b.start_time,
        end:          b.end_time,
        after_period: period,
      });
      clock = b.end_time;
    }
  }

  cells
}

/// The day grid repeated over the configured week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekGrid {
  pub days:  Vec<Day>,
  pub cells: Vec<GridCell>,
}

impl WeekGrid {
  pub fn build(day: &SchoolDay) -> Self {
    Self {
      days:  day.days_of_week.clone(),
      cells: build_day(day),
    }
  }

  /// Teaching periods of one day, in order.
  pub fn periods(&self) -> impl Iterator<Item = Period> + '_ {
    self.cells.iter().filter_map(GridCell::teaching_period)
  }

  /// Every teaching slot of the week: days in configured order, periods in
  /// order within each day.
  pub fn slots(&self) -> impl Iterator<Item = Slot> + '_ {
    self
      .days
      .iter()
      .flat_map(move |&day| self.periods().map(move |p| Slot::new(day, p)))
  }

  pub fn slot_count(&self) -> usize { self.days.len() * self.periods().count() }

  pub fn contains(&self, slot: Slot) -> bool {
    self.days.contains(&slot.day) && self.periods().any(|p| p == slot.period)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::{BreakPeriod, Preferences};

  fn t(s: &str) -> NaiveTime { hhmm::parse(s).unwrap() }

  fn p(n: u32) -> Period { Period::new(n).unwrap() }

  fn layout(periods: u32, breaks: Vec<BreakPeriod>) -> SchoolDay {
    SchoolDay {
      periods_per_day:   periods,
      school_start_time: t("08:00"),
      school_end_time:   t("15:00"),
      period_duration:   40,
      break_periods:     breaks,
      days_of_week:      vec![Day::Monday, Day::Tuesday],
      preferences:       Preferences::default(),
    }
  }

  fn brk(name: &str, start: &str, end: &str, after: u32) -> BreakPeriod {
    BreakPeriod {
      name:         name.into(),
      start_time:   t(start),
      end_time:     t(end),
      period_after: after,
    }
  }

  fn teaching(n: u32, start: &str, end: &str) -> GridCell {
    GridCell::Teaching { period: p(n), start: t(start), end: t(end) }
  }

  #[test]
  fn break_times_are_authoritative() {
    let day = layout(3, vec![brk("Break", "10:00", "10:20", 2)]);
    assert_eq!(build_day(&day), vec![
      teaching(1, "08:00", "08:40"),
      teaching(2, "08:40", "09:20"),
      GridCell::Break {
        name:         "Break".into(),
        start:        t("10:00"),
        end:          t("10:20"),
        after_period: p(2),
      },
      teaching(3, "10:20", "11:00"),
    ]);
  }

  #[test]
  fn no_breaks_is_an_arithmetic_sequence() {
    let cells = build_day(&layout(4, vec![]));
    assert_eq!(cells, vec![
      teaching(1, "08:00", "08:40"),
      teaching(2, "08:40", "09:20"),
      teaching(3, "09:20", "10:00"),
      teaching(4, "10:00", "10:40"),
    ]);
  }

  #[test]
  fn breaks_are_sorted_and_out_of_range_anchors_dropped() {
    let day = layout(4, vec![
      brk("Lunch", "11:00", "11:30", 3),
      brk("Late", "14:00", "14:10", 9),
      brk("Recess", "09:20", "09:30", 1),
    ]);
    let cells = build_day(&day);

    let teaching_count = cells.iter().filter(|c| c.teaching_period().is_some()).count();
    assert_eq!(teaching_count, 4);

    let names: Vec<&str> = cells
      .iter()
      .filter_map(|c| match c {
        GridCell::Break { name, .. } => Some(name.as_str()),
        GridCell::Teaching { .. } => None,
      })
      .collect();
    assert_eq!(names, vec!["Recess", "Lunch"]);

    // Break after period 1 sits between periods 1 and 2.
    assert!(matches!(cells[1], GridCell::Break { .. }));
    assert_eq!(cells[2], teaching(2, "09:30", "10:10"));
  }

  #[test]
  fn break_after_last_period_is_emitted() {
    let cells = build_day(&layout(2, vec![brk("Dismissal", "09:30", "09:40", 2)]));
    assert_eq!(cells.len(), 3);
    assert!(matches!(cells.last(), Some(GridCell::Break { .. })));
  }

  #[test]
  fn periods_never_wrap_past_midnight() {
    let mut day = layout(4, vec![]);
    day.school_start_time = t("22:30");
    day.period_duration = 40;
    let periods: Vec<u32> = build_day(&day)
      .iter()
      .filter_map(GridCell::teaching_period)
      .map(Period::get)
      .collect();
    assert_eq!(periods, vec![1, 2]);
  }

  #[test]
  fn week_grid_enumerates_day_major_slots() {
    let grid = WeekGrid::build(&layout(2, vec![brk("Break", "10:00", "10:20", 1)]));
    let slots: Vec<Slot> = grid.slots().collect();
    assert_eq!(slots, vec![
      Slot::new(Day::Monday, p(1)),
      Slot::new(Day::Monday, p(2)),
      Slot::new(Day::Tuesday, p(1)),
      Slot::new(Day::Tuesday, p(2)),
    ]);
    assert_eq!(grid.slot_count(), 4);
    assert!(grid.contains(Slot::new(Day::Tuesday, p(2))));
    assert!(!grid.contains(Slot::new(Day::Friday, p(1))));
    assert!(!grid.contains(Slot::new(Day::Monday, p(3))));
  }

  #[test]
  fn grid_cells_serialise_with_kind_tag() {
    let json = serde_json::to_value(teaching(1, "08:00", "08:40")).unwrap();
    assert_eq!(json["kind"], "teaching");
    assert_eq!(json["period"], "1");
    assert_eq!(json["start"], "08:00");
  }
}
