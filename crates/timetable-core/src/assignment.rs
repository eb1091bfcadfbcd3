//! Assignment tuples and the index the placement engine plans from.
//!
//! An assignment says that a teacher teaches a subject to a class. Inputs
//! arrive with optional references; an input missing any of the three is
//! dropped with a warning and reported back, never treated as fatal.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// An assignment as supplied by a caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentInput {
  #[serde(default)]
  pub teacher_id: Option<Uuid>,
  #[serde(default)]
  pub class_id:   Option<Uuid>,
  #[serde(default)]
  pub subject_id: Option<Uuid>,
  /// Teaching periods the subject needs; the engine default applies if unset.
  #[serde(default)]
  pub periods:    Option<u32>,
  #[serde(default)]
  pub room:       Option<String>,
}

/// A reference an [`AssignmentInput`] was missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingReference {
  Teacher,
  Class,
  Subject,
}

/// An input that did not make it into the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedAssignment {
  /// Position of the input in the caller's list.
  pub position: usize,
  pub input:    AssignmentInput,
  pub missing:  Vec<MissingReference>,
}

// ─── Assignment ──────────────────────────────────────────────────────────────

/// A complete (teacher, class, subject) teaching obligation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
  pub teacher_id: Uuid,
  pub class_id:   Uuid,
  pub subject_id: Uuid,
  pub periods:    Option<u32>,
  pub room:       Option<String>,
}

impl Assignment {
  pub fn required_periods(&self, default: u32) -> u32 {
    self.periods.unwrap_or(default)
  }

  pub fn matches(&self, teacher: Uuid, class: Uuid, subject: Uuid) -> bool {
    self.teacher_id == teacher && self.class_id == class && self.subject_id == subject
  }
}

impl TryFrom<AssignmentInput> for Assignment {
  type Error = Vec<MissingReference>;

  fn try_from(input: AssignmentInput) -> Result<Self, Self::Error> {
    match (input.teacher_id, input.class_id, input.subject_id) {
      (Some(teacher_id), Some(class_id), Some(subject_id)) => Ok(Self {
        teacher_id,
        class_id,
        subject_id,
        periods: input.periods,
        room: input.room,
      }),
      (teacher, class, subject) => Err(
        [
          (teacher.is_none(), MissingReference::Teacher),
          (class.is_none(), MissingReference::Class),
          (subject.is_none(), MissingReference::Subject),
        ]
        .into_iter()
        .filter_map(|(missing, r)| missing.then_some(r))
        .collect(),
      ),
    }
  }
}

// ─── Index ───────────────────────────────────────────────────────────────────

/// Assignments in stable input order, with lookups by teacher and by class.
#[derive(Debug, Clone, Default)]
pub struct AssignmentIndex {
  assignments: Vec<Assignment>,
  by_teacher:  HashMap<Uuid, Vec<usize>>,
  by_class:    HashMap<Uuid, Vec<usize>>,
  dropped:     Vec<DroppedAssignment>,
}

impl AssignmentIndex {
  pub fn build<I>(inputs: I) -> Self
  where
    I: IntoIterator<Item = AssignmentInput>,
  {
    let mut index = Self::default();

    for (position, input) in inputs.into_iter().enumerate() {
      match Assignment::try_from(input.clone()) {
        Ok(a) => {
          let at = index.assignments.len();
          index.by_teacher.entry(a.teacher_id).or_default().push(at);
          index.by_class.entry(a.class_id).or_default().push(at);
          index.assignments.push(a);
        }
        Err(missing) => {
          tracing::warn!(
            position,
            ?missing,
            "dropping assignment with missing references"
          );
          index.dropped.push(DroppedAssignment { position, input, missing });
        }
      }
    }

    index
  }

  pub fn assignments(&self) -> &[Assignment] { &self.assignments }

  pub fn dropped(&self) -> &[DroppedAssignment] { &self.dropped }

  pub fn len(&self) -> usize { self.assignments.len() }

  pub fn is_empty(&self) -> bool { self.assignments.is_empty() }

  /// Positions (into [`Self::assignments`]) of a teacher's assignments.
  pub fn positions_for_teacher(&self, teacher: Uuid) -> &[usize] {
    self.by_teacher.get(&teacher).map_or(&[][..], Vec::as_slice)
  }

  pub fn for_teacher(&self, teacher: Uuid) -> impl Iterator<Item = &Assignment> {
    self
      .positions_for_teacher(teacher)
      .iter()
      .map(|&i| &self.assignments[i])
  }

  pub fn for_class(&self, class: Uuid) -> impl Iterator<Item = &Assignment> {
    self
      .by_class
      .get(&class)
      .map_or(&[][..], Vec::as_slice)
      .iter()
      .map(|&i| &self.assignments[i])
  }

  /// Whether the tuple corresponds to a real assignment.
  pub fn contains(&self, teacher: Uuid, class: Uuid, subject: Uuid) -> bool {
    self.for_teacher(teacher).any(|a| a.matches(teacher, class, subject))
  }

  pub fn periods_owed_by_teacher(&self, teacher: Uuid, default: u32) -> u64 {
    self.for_teacher(teacher).map(|a| u64::from(a.required_periods(default))).sum()
  }

  pub fn periods_owed_by_class(&self, class: Uuid, default: u32) -> u64 {
    self.for_class(class).map(|a| u64::from(a.required_periods(default))).sum()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn input(t: Option<Uuid>, c: Option<Uuid>, s: Option<Uuid>) -> AssignmentInput {
    AssignmentInput { teacher_id: t, class_id: c, subject_id: s, ..Default::default() }
  }

  #[test]
  fn incomplete_inputs_are_dropped_not_fatal() {
    let (t, c, s) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let index = AssignmentIndex::build(vec![
      input(Some(t), Some(c), Some(s)),
      input(Some(t), None, Some(s)),
      input(None, None, None),
    ]);

    assert_eq!(index.len(), 1);
    assert_eq!(index.dropped().len(), 2);
    assert_eq!(index.dropped()[0].position, 1);
    assert_eq!(index.dropped()[0].missing, vec![MissingReference::Class]);
    assert_eq!(index.dropped()[1].missing, vec![
      MissingReference::Teacher,
      MissingReference::Class,
      MissingReference::Subject,
    ]);
  }

  #[test]
  fn lookups_by_teacher_and_class_keep_input_order() {
    let (t1, t2) = (Uuid::new_v4(), Uuid::new_v4());
    let (x, y) = (Uuid::new_v4(), Uuid::new_v4());
    let (math, sci) = (Uuid::new_v4(), Uuid::new_v4());

    let mut a = input(Some(t1), Some(x), Some(math));
    a.periods = Some(3);
    let index = AssignmentIndex::build(vec![
      a,
      input(Some(t2), Some(x), Some(sci)),
      input(Some(t1), Some(y), Some(sci)),
    ]);

    let t1_classes: Vec<Uuid> = index.for_teacher(t1).map(|a| a.class_id).collect();
    assert_eq!(t1_classes, vec![x, y]);
    let x_subjects: Vec<Uuid> = index.for_class(x).map(|a| a.subject_id).collect();
    assert_eq!(x_subjects, vec![math, sci]);

    assert!(index.contains(t1, y, sci));
    assert!(!index.contains(t2, y, sci));
    assert_eq!(index.periods_owed_by_teacher(t1, 1), 4);
    assert_eq!(index.periods_owed_by_class(x, 2), 5);
    assert_eq!(index.for_teacher(Uuid::new_v4()).count(), 0);
  }

  #[test]
  fn owed_periods_do_not_wrap() {
    let t = Uuid::new_v4();
    let mut a = input(Some(t), Some(Uuid::new_v4()), Some(Uuid::new_v4()));
    a.periods = Some(u32::MAX);
    let index = AssignmentIndex::build(vec![a.clone(), a]);
    assert_eq!(index.periods_owed_by_teacher(t, 1), 2 * u64::from(u32::MAX));
  }
}
