//! Greedy slot placement.
//!
//! Days are walked in configured order and periods in order within a day. At
//! each slot, pending demands are scanned in the order the assignments were
//! supplied and every demand whose teacher and class are both free is placed
//! there. There is no backtracking and no balancing: preferences in the
//! config are not consulted. Demand that cannot be met is reported in
//! [`PlacementPlan::unplaced`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  assignment::{Assignment, AssignmentIndex},
  grid::WeekGrid,
  slot::Slot,
  timetable::{NewEntry, TimetableEntry},
};

/// Periods required by an assignment that does not state its own count.
pub const DEFAULT_PERIODS: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementOptions {
  pub default_periods: u32,
}

impl Default for PlacementOptions {
  fn default() -> Self { Self { default_periods: DEFAULT_PERIODS } }
}

/// An assignment whose required periods could not all be placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unplaced {
  pub assignment: Assignment,
  pub required:   u32,
  pub placed:     u32,
  pub missing:    u32,
}

/// The engine's proposal: new entries plus any demand left over.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlacementPlan {
  pub entries:  Vec<NewEntry>,
  pub unplaced: Vec<Unplaced>,
}

impl PlacementPlan {
  /// Total periods left unplaced, summed wide so large requests cannot wrap.
  pub fn unplaced_periods(&self) -> u64 {
    self.unplaced.iter().map(|u| u64::from(u.missing)).sum()
  }
}

// ─── Occupancy ───────────────────────────────────────────────────────────────

#[derive(Default)]
struct Occupancy {
  teachers: HashSet<(Slot, Uuid)>,
  classes:  HashSet<(Slot, Uuid)>,
}

impl Occupancy {
  fn is_free(&self, slot: Slot, teacher: Uuid, class: Uuid) -> bool {
    !self.teachers.contains(&(slot, teacher)) && !self.classes.contains(&(slot, class))
  }

  fn book(&mut self, slot: Slot, teacher: Option<Uuid>, class: Option<Uuid>) {
    if let Some(t) = teacher {
      self.teachers.insert((slot, t));
    }
    if let Some(c) = class {
      self.classes.insert((slot, c));
    }
  }
}

struct Demand {
  position:  usize,
  required:  u32,
  remaining: u32,
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// Plan entries for every assignment in `index` around the `locked` entries.
///
/// Locked entries keep their teacher and class busy in their slot, and a
/// locked entry matching an assignment's tuple counts toward that
/// assignment's required periods. Never fails.
pub fn place(
  grid: &WeekGrid,
  index: &AssignmentIndex,
  locked: &[TimetableEntry],
  options: PlacementOptions,
) -> PlacementPlan {
  let assignments = index.assignments();
  let mut demands: Vec<Demand> = assignments
    .iter()
    .enumerate()
    .map(|(position, a)| {
      let required = a.required_periods(options.default_periods);
      Demand { position, required, remaining: required }
    })
    .collect();

  let mut occupancy = Occupancy::default();
  for entry in locked {
    occupancy.book(entry.slot(), entry.teacher_id, entry.class_id);

    let (Some(t), Some(c), Some(s)) = (entry.teacher_id, entry.class_id, entry.subject_id)
    else {
      continue;
    };
    if !index.contains(t, c, s) {
      continue;
    }
    if let Some(&i) = index
      .positions_for_teacher(t)
      .iter()
      .find(|&&i| assignments[i].matches(t, c, s) && demands[i].remaining > 0)
    {
      demands[i].remaining -= 1;
    }
  }

  let mut entries = Vec::new();

  for slot in grid.slots() {
    if demands.iter().all(|d| d.remaining == 0) {
      break;
    }
    for demand in demands.iter_mut().filter(|d| d.remaining > 0) {
      let a = &assignments[demand.position];
      if !occupancy.is_free(slot, a.teacher_id, a.class_id) {
        continue;
      }
      occupancy.book(slot, Some(a.teacher_id), Some(a.class_id));
      entries.push(NewEntry {
        day:        slot.day,
        period:     slot.period,
        room:       a.room.clone(),
        class_id:   Some(a.class_id),
        teacher_id: Some(a.teacher_id),
        subject_id: Some(a.subject_id),
        is_locked:  false,
      });
      demand.remaining -= 1;
    }
  }

  let unplaced: Vec<Unplaced> = demands
    .iter()
    .filter(|d| d.remaining > 0)
    .map(|d| Unplaced {
      assignment: assignments[d.position].clone(),
      required:   d.required,
      placed:     d.required - d.remaining,
      missing:    d.remaining,
    })
    .collect();

  for u in &unplaced {
    tracing::warn!(
      teacher_id = %u.assignment.teacher_id,
      class_id = %u.assignment.class_id,
      subject_id = %u.assignment.subject_id,
      required = u.required,
      missing = u.missing,
      "could not place all required periods"
    );
  }

  PlacementPlan { entries, unplaced }
}
