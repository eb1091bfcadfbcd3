//! The `TimetableStore` trait and the outcomes of its guarded writes.
//!
//! The trait is implemented by storage backends (e.g.
//! `timetable-store-sqlite`). Higher layers depend on this abstraction, not on
//! any concrete backend.
//!
//! Writes that must be checked against current state (manual entry
//! placement, regeneration, version numbering) are single trait methods so a
//! backend can run the read, the check and the write in one transaction.

use std::future::Future;

use uuid::Uuid;

use crate::{
  config::{NewConfig, TimetableConfig},
  conflict::Conflict,
  placement::PlacementPlan,
  timetable::{NewEntry, NewTimetable, Timetable, TimetableEntry},
  version::{ChangeLog, NewChangeLog, NewVersion, TimetableVersion},
};

// ─── Write outcomes ──────────────────────────────────────────────────────────

/// Result of a conflict-checked entry write.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryOutcome {
  /// The entry was written. `previous` is the row it replaced, if any.
  Applied {
    entry:    TimetableEntry,
    previous: Option<TimetableEntry>,
  },
  /// Nothing was written; the entry would double-book its slot.
  Conflicts(Vec<Conflict>),
  /// The target timetable or entry does not exist.
  NotFound,
  /// The target entry is locked and was left untouched.
  Locked(TimetableEntry),
}

/// Result of an entry deletion.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryRemoval {
  Removed(TimetableEntry),
  NotFound,
  Locked(TimetableEntry),
}

/// Result of regenerating a timetable's unlocked entries.
#[derive(Debug, Clone, PartialEq)]
pub struct Regeneration {
  /// The timetable's full entry list afterwards, locked entries included.
  pub entries: Vec<TimetableEntry>,
  /// The locked entries the plan was built around.
  pub locked:  Vec<TimetableEntry>,
  pub plan:    PlacementPlan,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a timetable store backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait TimetableStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Configs ───────────────────────────────────────────────────────────

  /// Persist a config and make it the active one.
  fn save_config(
    &self,
    input: NewConfig,
  ) -> impl Future<Output = Result<TimetableConfig, Self::Error>> + Send + '_;

  /// Replace a config's contents, keeping its id and active flag.
  fn update_config(
    &self,
    id: Uuid,
    input: NewConfig,
  ) -> impl Future<Output = Result<Option<TimetableConfig>, Self::Error>> + Send + '_;

  fn get_config(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<TimetableConfig>, Self::Error>> + Send + '_;

  fn active_config(
    &self,
  ) -> impl Future<Output = Result<Option<TimetableConfig>, Self::Error>> + Send + '_;

  fn list_configs(
    &self,
  ) -> impl Future<Output = Result<Vec<TimetableConfig>, Self::Error>> + Send + '_;

  /// Delete a config; timetables referencing it keep existing with no
  /// config. Returns `false` if it did not exist.
  fn delete_config(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Timetables ────────────────────────────────────────────────────────

  fn create_timetable(
    &self,
    input: NewTimetable,
  ) -> impl Future<Output = Result<Timetable, Self::Error>> + Send + '_;

  fn get_timetable(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Timetable>, Self::Error>> + Send + '_;

  fn list_timetables(
    &self,
  ) -> impl Future<Output = Result<Vec<Timetable>, Self::Error>> + Send + '_;

  fn update_timetable(
    &self,
    id: Uuid,
    input: NewTimetable,
  ) -> impl Future<Output = Result<Option<Timetable>, Self::Error>> + Send + '_;

  /// Delete a timetable together with its entries, versions and change
  /// logs. Returns `false` if it did not exist.
  fn delete_timetable(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Entries ───────────────────────────────────────────────────────────

  /// All entries of a timetable, ordered by day, period and creation.
  fn list_entries(
    &self,
    timetable_id: Uuid,
  ) -> impl Future<Output = Result<Vec<TimetableEntry>, Self::Error>> + Send + '_;

  fn get_entry(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<TimetableEntry>, Self::Error>> + Send + '_;

  /// Insert one entry after checking its slot for teacher and class
  /// conflicts, atomically. With `force`, conflicts are ignored.
  fn place_entry(
    &self,
    timetable_id: Uuid,
    input: NewEntry,
    force: bool,
  ) -> impl Future<Output = Result<EntryOutcome, Self::Error>> + Send + '_;

  /// Replace an unlocked entry after checking its (new) slot, atomically.
  /// The entry's own row is excluded from the check.
  fn update_entry(
    &self,
    id: Uuid,
    input: NewEntry,
    force: bool,
  ) -> impl Future<Output = Result<EntryOutcome, Self::Error>> + Send + '_;

  /// Delete an entry unless it is locked.
  fn delete_entry(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<EntryRemoval, Self::Error>> + Send + '_;

  /// Set the lock flag. Returns `(before, after)`, or `None` if missing.
  fn set_entry_locked(
    &self,
    id: Uuid,
    locked: bool,
  ) -> impl Future<
    Output = Result<Option<(TimetableEntry, TimetableEntry)>, Self::Error>,
  > + Send
  + '_;

  /// Replace every unlocked entry of the timetable with the entries `plan`
  /// proposes, in one transaction.
  ///
  /// `plan` is handed the locked entries as read inside that transaction, so
  /// an entry locked or placed concurrently is either planned around or not
  /// yet visible. Returns `None` if the timetable does not exist.
  fn replace_unlocked_entries<F>(
    &self,
    timetable_id: Uuid,
    plan: F,
  ) -> impl Future<Output = Result<Option<Regeneration>, Self::Error>> + Send + '_
  where
    F: FnOnce(&[TimetableEntry]) -> PlacementPlan + Send + 'static;

  // ── Versions ──────────────────────────────────────────────────────────

  /// Snapshot the timetable's current entries as the next version and make
  /// it the only active one. Returns `None` if the timetable is missing.
  fn create_version(
    &self,
    timetable_id: Uuid,
    input: NewVersion,
  ) -> impl Future<Output = Result<Option<TimetableVersion>, Self::Error>> + Send + '_;

  fn get_version(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<TimetableVersion>, Self::Error>> + Send + '_;

  /// Versions of a timetable, oldest first.
  fn list_versions(
    &self,
    timetable_id: Uuid,
  ) -> impl Future<Output = Result<Vec<TimetableVersion>, Self::Error>> + Send + '_;

  fn active_version(
    &self,
    timetable_id: Uuid,
  ) -> impl Future<Output = Result<Option<TimetableVersion>, Self::Error>> + Send + '_;

  fn append_change(
    &self,
    input: NewChangeLog,
  ) -> impl Future<Output = Result<ChangeLog, Self::Error>> + Send + '_;

  /// Change log of a version, oldest first.
  fn list_changes(
    &self,
    version_id: Uuid,
  ) -> impl Future<Output = Result<Vec<ChangeLog>, Self::Error>> + Send + '_;
}
