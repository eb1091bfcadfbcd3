//! Teacher and class double-booking detection.
//!
//! Entries are grouped by slot in a single pass. Each (slot, kind, entity)
//! seen on two or more entries yields exactly one [`Conflict`], however many
//! entries collide.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  slot::{Day, Period, Slot},
  timetable::{NewEntry, TimetableEntry},
};

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ConflictKind {
  Teacher,
  Class,
}

/// One entity double-booked in one slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
  pub day:       Day,
  pub period:    Period,
  #[serde(rename = "type")]
  pub kind:      ConflictKind,
  pub entity_id: Uuid,
  pub message:   String,
}

/// The part of an entry the detector looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Booking {
  pub slot:       Slot,
  pub teacher_id: Option<Uuid>,
  pub class_id:   Option<Uuid>,
}

impl From<&TimetableEntry> for Booking {
  fn from(e: &TimetableEntry) -> Self {
    Self { slot: e.slot(), teacher_id: e.teacher_id, class_id: e.class_id }
  }
}

impl From<&NewEntry> for Booking {
  fn from(e: &NewEntry) -> Self {
    Self { slot: e.slot(), teacher_id: e.teacher_id, class_id: e.class_id }
  }
}

/// Report every teacher or class booked more than once in the same slot.
///
/// Output is ordered by slot, then teacher before class, then entity id.
pub fn detect_conflicts<I>(bookings: I) -> Vec<Conflict>
where
  I: IntoIterator<Item = Booking>,
{
  let mut counts: BTreeMap<(Slot, ConflictKind, Uuid), usize> = BTreeMap::new();

  for b in bookings {
    if let Some(t) = b.teacher_id {
      *counts.entry((b.slot, ConflictKind::Teacher, t)).or_default() += 1;
    }
    if let Some(c) = b.class_id {
      *counts.entry((b.slot, ConflictKind::Class, c)).or_default() += 1;
    }
  }

  counts
    .into_iter()
    .filter(|(_, n)| *n > 1)
    .map(|((slot, kind, entity_id), n)| Conflict {
      day: slot.day,
      period: slot.period,
      kind,
      entity_id,
      message: match kind {
        ConflictKind::Teacher => {
          format!("teacher {entity_id} is booked {n} times on {slot}")
        }
        ConflictKind::Class => {
          format!("class {entity_id} is booked {n} times on {slot}")
        }
      },
    })
    .collect()
}

/// Conflicts a candidate booking would cause in its own slot.
///
/// `existing` may span the whole timetable; only bookings in the candidate's
/// slot are considered, and only conflicts on the candidate's own teacher or
/// class are returned.
pub fn conflicts_for_candidate<I>(existing: I, candidate: Booking) -> Vec<Conflict>
where
  I: IntoIterator<Item = Booking>,
{
  let in_slot = existing.into_iter().filter(|b| b.slot == candidate.slot);

  detect_conflicts(in_slot.chain(std::iter::once(candidate)))
    .into_iter()
    .filter(|c| match c.kind {
      ConflictKind::Teacher => candidate.teacher_id == Some(c.entity_id),
      ConflictKind::Class => candidate.class_id == Some(c.entity_id),
    })
    .collect()
}
