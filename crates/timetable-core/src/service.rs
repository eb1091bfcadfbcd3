//! Request-level operations composed from a [`TimetableStore`] and the
//! scheduling engine.
//!
//! Version and change-log writes that accompany a generation or a manual edit
//! are best-effort: a failure there never fails the primary operation. It is
//! logged and reported as a [`Degradation`] in the returned [`Outcome`].

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  assignment::{AssignmentIndex, AssignmentInput, DroppedAssignment},
  config::{NewConfig, TimetableConfig},
  conflict::{Booking, Conflict, detect_conflicts},
  grid::WeekGrid,
  placement::{self, PlacementOptions, Unplaced},
  slot::Slot,
  store::{EntryOutcome, EntryRemoval, Regeneration, TimetableStore},
  timetable::{NewEntry, NewTimetable, Timetable, TimetableEntry},
  version::{ChangeAction, ChangeLog, NewChangeLog, NewVersion, TimetableVersion},
};

const MANUAL_VERSION_DESCRIPTION: &str = "Manual changes";

// ─── Outcome ─────────────────────────────────────────────────────────────────

/// A best-effort side effect that did not happen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Degradation {
  VersionNotRecorded { reason: String },
  ChangeNotLogged { reason: String },
}

/// A successful result, possibly with degraded side effects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome<T> {
  #[serde(flatten)]
  pub value:    T,
  pub degraded: Vec<Degradation>,
}

impl<T> Outcome<T> {
  pub fn clean(value: T) -> Self { Self { value, degraded: Vec::new() } }

  pub fn is_degraded(&self) -> bool { !self.degraded.is_empty() }
}

// ─── Configs ─────────────────────────────────────────────────────────────────

/// Validate, normalise and store a config as the new active config.
pub async fn save_config<S: TimetableStore>(
  store: &S,
  input: NewConfig,
) -> Result<TimetableConfig> {
  let input = input.prepared()?;
  store.save_config(input).await.map_err(Error::store)
}

pub async fn update_config<S: TimetableStore>(
  store: &S,
  id: Uuid,
  input: NewConfig,
) -> Result<TimetableConfig> {
  let input = input.prepared()?;
  store
    .update_config(id, input)
    .await
    .map_err(Error::store)?
    .ok_or(Error::ConfigNotFound(id))
}

/// Pick the config for an operation: the explicitly requested one, else the
/// one linked to the timetable, else the store's active config. The result is
/// validated and normalised.
pub async fn resolve_config<S: TimetableStore>(
  store: &S,
  requested: Option<Uuid>,
  linked: Option<Uuid>,
) -> Result<TimetableConfig> {
  let config = match requested.or(linked) {
    Some(id) => store
      .get_config(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::ConfigNotFound(id))?,
    None => store
      .active_config()
      .await
      .map_err(Error::store)?
      .ok_or(Error::NoActiveConfig)?,
  };

  config.school_day.validate()?;
  Ok(TimetableConfig {
    school_day: config.school_day.normalized(),
    ..config
  })
}

// ─── Timetables ──────────────────────────────────────────────────────────────

pub async fn create_timetable<S: TimetableStore>(
  store: &S,
  input: NewTimetable,
) -> Result<Timetable> {
  check_timetable(store, &input).await?;
  store.create_timetable(input).await.map_err(Error::store)
}

pub async fn update_timetable<S: TimetableStore>(
  store: &S,
  id: Uuid,
  input: NewTimetable,
) -> Result<Timetable> {
  check_timetable(store, &input).await?;
  store
    .update_timetable(id, input)
    .await
    .map_err(Error::store)?
    .ok_or(Error::TimetableNotFound(id))
}

/// Dates must be ordered and a linked config must exist.
async fn check_timetable<S: TimetableStore>(store: &S, input: &NewTimetable) -> Result<()> {
  input.validate()?;
  if let Some(id) = input.config_id {
    store
      .get_config(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::ConfigNotFound(id))?;
  }
  Ok(())
}

pub async fn require_timetable<S: TimetableStore>(store: &S, id: Uuid) -> Result<Timetable> {
  store
    .get_timetable(id)
    .await
    .map_err(Error::store)?
    .ok_or(Error::TimetableNotFound(id))
}

/// The grid of the config a timetable resolves to.
pub async fn timetable_grid<S: TimetableStore>(store: &S, timetable_id: Uuid) -> Result<WeekGrid> {
  let timetable = require_timetable(store, timetable_id).await?;
  let config = resolve_config(store, None, timetable.config_id).await?;
  Ok(WeekGrid::build(&config.school_day))
}

/// Every teacher and class double-booking in a timetable.
pub async fn conflicts<S: TimetableStore>(store: &S, timetable_id: Uuid) -> Result<Vec<Conflict>> {
  require_timetable(store, timetable_id).await?;
  let entries = store.list_entries(timetable_id).await.map_err(Error::store)?;
  Ok(detect_conflicts(entries.iter().map(Booking::from)))
}

// ─── Generation ──────────────────────────────────────────────────────────────

/// Input to [`generate`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateRequest {
  /// Overrides the timetable's linked config.
  #[serde(default)]
  pub config_id:   Option<Uuid>,
  #[serde(default)]
  pub assignments: Vec<AssignmentInput>,
  #[serde(default)]
  pub created_by:  Option<Uuid>,
  #[serde(default)]
  pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationReport {
  pub config_id: Uuid,
  /// The timetable's full entry list after generation, locked entries
  /// included.
  pub entries:   Vec<TimetableEntry>,
  pub conflicts: Vec<Conflict>,
  pub unplaced:  Vec<Unplaced>,
  pub dropped:   Vec<DroppedAssignment>,
  pub version:   Option<TimetableVersion>,
}

/// Regenerate a timetable: replace every unlocked entry with a fresh greedy
/// placement of `request.assignments`, then record a version.
pub async fn generate<S: TimetableStore>(
  store: &S,
  timetable_id: Uuid,
  request: GenerateRequest,
  options: PlacementOptions,
) -> Result<Outcome<GenerationReport>> {
  let timetable = require_timetable(store, timetable_id).await?;
  let config = resolve_config(store, request.config_id, timetable.config_id).await?;
  let index = AssignmentIndex::build(request.assignments);
  let dropped = index.dropped().to_vec();
  let grid = WeekGrid::build(&config.school_day);

  let regeneration = store
    .replace_unlocked_entries(timetable_id, move |locked: &[TimetableEntry]| {
      placement::place(&grid, &index, locked, options)
    })
    .await
    .map_err(Error::store)?;
  let Some(Regeneration { entries, locked, plan }) = regeneration else {
    return Err(Error::TimetableNotFound(timetable_id));
  };
  let placed = plan.entries.len();
  let conflicts = detect_conflicts(entries.iter().map(Booking::from));

  tracing::info!(
    %timetable_id,
    config_id = %config.config_id,
    placed,
    locked = locked.len(),
    unplaced = plan.unplaced.len(),
    dropped = dropped.len(),
    conflicts = conflicts.len(),
    "generated timetable"
  );

  let mut degraded = Vec::new();
  let input = NewVersion {
    description: request
      .description
      .or_else(|| Some(format!("Generated from config {:?}", config.name))),
    created_by:  request.created_by,
  };
  let version = match store.create_version(timetable_id, input).await {
    Ok(Some(v)) => Some(v),
    Ok(None) => {
      degraded.push(version_not_recorded(timetable_id, "timetable no longer exists"));
      None
    }
    Err(e) => {
      degraded.push(version_not_recorded(timetable_id, &e.to_string()));
      None
    }
  };

  Ok(Outcome {
    value: GenerationReport {
      config_id: config.config_id,
      entries,
      conflicts,
      unplaced: plan.unplaced,
      dropped,
      version,
    },
    degraded,
  })
}

fn version_not_recorded(timetable_id: Uuid, reason: &str) -> Degradation {
  tracing::warn!(%timetable_id, reason, "timetable version not recorded");
  Degradation::VersionNotRecorded { reason: reason.to_owned() }
}

// ─── Versions ────────────────────────────────────────────────────────────────

/// Explicitly snapshot a timetable. Unlike the versions recorded alongside
/// generation, failure here is an error.
pub async fn create_version<S: TimetableStore>(
  store: &S,
  timetable_id: Uuid,
  input: NewVersion,
) -> Result<TimetableVersion> {
  store
    .create_version(timetable_id, input)
    .await
    .map_err(Error::store)?
    .ok_or(Error::TimetableNotFound(timetable_id))
}

pub async fn list_versions<S: TimetableStore>(
  store: &S,
  timetable_id: Uuid,
) -> Result<Vec<TimetableVersion>> {
  require_timetable(store, timetable_id).await?;
  store.list_versions(timetable_id).await.map_err(Error::store)
}

pub async fn list_changes<S: TimetableStore>(store: &S, version_id: Uuid) -> Result<Vec<ChangeLog>> {
  store
    .get_version(version_id)
    .await
    .map_err(Error::store)?
    .ok_or(Error::VersionNotFound(version_id))?;
  store.list_changes(version_id).await.map_err(Error::store)
}

// ─── Manual edits ────────────────────────────────────────────────────────────

/// Who made a manual change, and why.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangeMeta {
  #[serde(default)]
  pub changed_by: Option<Uuid>,
  #[serde(default)]
  pub reason:     Option<String>,
}

/// A manual entry write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryRequest {
  #[serde(flatten)]
  pub entry: NewEntry,
  /// Write even if the slot has conflicts.
  #[serde(default)]
  pub force: bool,
  #[serde(flatten)]
  pub meta:  ChangeMeta,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Placement {
  Placed(TimetableEntry),
  /// Nothing was written.
  Conflicts(Vec<Conflict>),
}

/// Place one entry by hand. Conflicts in its slot are returned instead of
/// persisting, unless `request.force` is set.
pub async fn place_entry<S: TimetableStore>(
  store: &S,
  timetable_id: Uuid,
  request: EntryRequest,
) -> Result<Outcome<Placement>> {
  let timetable = require_timetable(store, timetable_id).await?;
  check_slot(store, &timetable, request.entry.slot()).await?;

  let outcome = store
    .place_entry(timetable_id, request.entry, request.force)
    .await
    .map_err(Error::store)?;
  match outcome {
    EntryOutcome::Applied { entry, previous } => {
      let degraded = record_change(
        store,
        timetable_id,
        ChangeAction::Create,
        previous.as_ref(),
        Some(&entry),
        &request.meta,
      )
      .await;
      Ok(Outcome { value: Placement::Placed(entry), degraded })
    }
    EntryOutcome::Conflicts(c) => Ok(Outcome::clean(Placement::Conflicts(c))),
    EntryOutcome::NotFound => Err(Error::TimetableNotFound(timetable_id)),
    EntryOutcome::Locked(e) => Err(Error::EntryLocked(e.entry_id)),
  }
}

/// Move or edit an unlocked entry by hand, with the same conflict rules as
/// [`place_entry`].
pub async fn update_entry<S: TimetableStore>(
  store: &S,
  entry_id: Uuid,
  request: EntryRequest,
) -> Result<Outcome<Placement>> {
  let current = require_entry(store, entry_id).await?;
  let timetable = require_timetable(store, current.timetable_id).await?;
  check_slot(store, &timetable, request.entry.slot()).await?;

  let outcome = store
    .update_entry(entry_id, request.entry, request.force)
    .await
    .map_err(Error::store)?;
  match outcome {
    EntryOutcome::Applied { entry, previous } => {
      let degraded = record_change(
        store,
        entry.timetable_id,
        ChangeAction::Update,
        previous.as_ref(),
        Some(&entry),
        &request.meta,
      )
      .await;
      Ok(Outcome { value: Placement::Placed(entry), degraded })
    }
    EntryOutcome::Conflicts(c) => Ok(Outcome::clean(Placement::Conflicts(c))),
    EntryOutcome::NotFound => Err(Error::EntryNotFound(entry_id)),
    EntryOutcome::Locked(e) => Err(Error::EntryLocked(e.entry_id)),
  }
}

pub async fn delete_entry<S: TimetableStore>(
  store: &S,
  entry_id: Uuid,
  meta: ChangeMeta,
) -> Result<Outcome<TimetableEntry>> {
  match store.delete_entry(entry_id).await.map_err(Error::store)? {
    EntryRemoval::Removed(entry) => {
      let degraded = record_change(
        store,
        entry.timetable_id,
        ChangeAction::Delete,
        Some(&entry),
        None,
        &meta,
      )
      .await;
      Ok(Outcome { value: entry, degraded })
    }
    EntryRemoval::NotFound => Err(Error::EntryNotFound(entry_id)),
    EntryRemoval::Locked(e) => Err(Error::EntryLocked(e.entry_id)),
  }
}

pub async fn set_lock<S: TimetableStore>(
  store: &S,
  entry_id: Uuid,
  locked: bool,
  meta: ChangeMeta,
) -> Result<Outcome<TimetableEntry>> {
  let (before, after) = store
    .set_entry_locked(entry_id, locked)
    .await
    .map_err(Error::store)?
    .ok_or(Error::EntryNotFound(entry_id))?;

  let action = if locked { ChangeAction::Lock } else { ChangeAction::Unlock };
  let degraded =
    record_change(store, after.timetable_id, action, Some(&before), Some(&after), &meta).await;
  Ok(Outcome { value: after, degraded })
}

async fn require_entry<S: TimetableStore>(store: &S, id: Uuid) -> Result<TimetableEntry> {
  store
    .get_entry(id)
    .await
    .map_err(Error::store)?
    .ok_or(Error::EntryNotFound(id))
}

/// Reject slots outside the timetable's grid. Without any config to check
/// against, every slot is accepted.
async fn check_slot<S: TimetableStore>(store: &S, timetable: &Timetable, slot: Slot) -> Result<()> {
  let config = match resolve_config(store, None, timetable.config_id).await {
    Ok(c) => c,
    Err(Error::NoActiveConfig) => return Ok(()),
    Err(e) => return Err(e),
  };
  if WeekGrid::build(&config.school_day).contains(slot) {
    Ok(())
  } else {
    Err(Error::SlotOutsideGrid(slot))
  }
}

// ─── Change log ──────────────────────────────────────────────────────────────

async fn record_change<S: TimetableStore>(
  store: &S,
  timetable_id: Uuid,
  action: ChangeAction,
  old: Option<&TimetableEntry>,
  new: Option<&TimetableEntry>,
  meta: &ChangeMeta,
) -> Vec<Degradation> {
  let Some(changed_by) = meta.changed_by else {
    return vec![change_not_logged(timetable_id, action, "no actor supplied")];
  };

  let input = NewChangeLog {
    version_id: Uuid::nil(),
    entry_id: new.or(old).map(|e| e.entry_id),
    action,
    old_value: old.and_then(|e| serde_json::to_value(e).ok()),
    new_value: new.and_then(|e| serde_json::to_value(e).ok()),
    changed_by,
    reason: meta.reason.clone(),
  };

  match append_to_active_version(store, timetable_id, input).await {
    Ok(Some(change)) => {
      tracing::debug!(
        %timetable_id,
        change_id = %change.change_id,
        %action,
        "logged timetable change"
      );
      Vec::new()
    }
    Ok(None) => vec![change_not_logged(timetable_id, action, "timetable no longer exists")],
    Err(e) => vec![change_not_logged(timetable_id, action, &e.to_string())],
  }
}

/// Append to the timetable's active version, opening a manual-changes version
/// first if there is none.
async fn append_to_active_version<S: TimetableStore>(
  store: &S,
  timetable_id: Uuid,
  mut input: NewChangeLog,
) -> Result<Option<ChangeLog>, S::Error> {
  let version = match store.active_version(timetable_id).await? {
    Some(v) => v,
    None => {
      let manual = NewVersion {
        description: Some(MANUAL_VERSION_DESCRIPTION.to_owned()),
        created_by:  Some(input.changed_by),
      };
      match store.create_version(timetable_id, manual).await? {
        Some(v) => v,
        None => return Ok(None),
      }
    }
  };

  input.version_id = version.version_id;
  store.append_change(input).await.map(Some)
}

fn change_not_logged(timetable_id: Uuid, action: ChangeAction, reason: &str) -> Degradation {
  tracing::warn!(%timetable_id, %action, reason, "timetable change not logged");
  Degradation::ChangeNotLogged { reason: reason.to_owned() }
}
