//! [`SqliteStore`], the SQLite implementation of [`TimetableStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use timetable_core::{
  config::{NewConfig, TimetableConfig},
  conflict::{Booking, conflicts_for_candidate},
  placement::PlacementPlan,
  snapshot::Snapshot,
  store::{EntryOutcome, EntryRemoval, Regeneration, TimetableStore},
  timetable::{NewEntry, NewTimetable, Timetable, TimetableEntry},
  version::{ChangeLog, NewChangeLog, NewVersion, TimetableVersion},
};

use crate::{
  Error, Result,
  encode::{
    CHANGE_COLUMNS, CONFIG_COLUMNS, ENTRY_COLUMNS, RawChange, RawConfig, RawEntry,
    RawTimetable, RawVersion, TIMETABLE_COLUMNS, VERSION_COLUMNS, decode_count, encode_date,
    encode_day, encode_dt, encode_json, encode_period, encode_time, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A timetable store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run arbitrary SQL against the connection.
  #[cfg(test)]
  pub(crate) async fn execute_raw(&self, sql: &'static str) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(sql)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Row helpers ─────────────────────────────────────────────────────────────
//
// These run inside `tokio_rusqlite` closures, usually within a transaction.
// `&Transaction` derefs to `&Connection`.

fn read_config(conn: &Connection, id: Uuid) -> Result<Option<TimetableConfig>> {
  let sql = format!("SELECT {CONFIG_COLUMNS} FROM timetable_configs WHERE config_id = ?1");
  conn
    .query_row(&sql, rusqlite::params![encode_uuid(id)], RawConfig::from_row)
    .optional()?
    .map(RawConfig::into_config)
    .transpose()
}

fn read_timetable(conn: &Connection, id: Uuid) -> Result<Option<Timetable>> {
  let sql = format!("SELECT {TIMETABLE_COLUMNS} FROM timetables WHERE timetable_id = ?1");
  conn
    .query_row(&sql, rusqlite::params![encode_uuid(id)], RawTimetable::from_row)
    .optional()?
    .map(RawTimetable::into_timetable)
    .transpose()
}

fn timetable_exists(conn: &Connection, id: Uuid) -> Result<bool> {
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM timetables WHERE timetable_id = ?1",
        rusqlite::params![encode_uuid(id)],
        |_| Ok(true),
      )
      .optional()?
      .unwrap_or(false),
  )
}

/// Entries matching `filter`, ordered by slot and then by insertion.
fn read_entries(
  conn: &Connection,
  filter: &str,
  params: impl rusqlite::Params,
) -> Result<Vec<TimetableEntry>> {
  let sql = format!(
    "SELECT {ENTRY_COLUMNS} FROM timetable_entries WHERE {filter} ORDER BY created_at, rowid"
  );
  let mut stmt = conn.prepare(&sql)?;
  let raws = stmt
    .query_map(params, RawEntry::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  let mut entries = raws
    .into_iter()
    .map(RawEntry::into_entry)
    .collect::<Result<Vec<_>>>()?;
  entries.sort_by_key(TimetableEntry::slot);
  Ok(entries)
}

fn read_timetable_entries(conn: &Connection, timetable_id: Uuid) -> Result<Vec<TimetableEntry>> {
  read_entries(conn, "timetable_id = ?1", rusqlite::params![encode_uuid(timetable_id)])
}

fn read_entry(conn: &Connection, id: Uuid) -> Result<Option<TimetableEntry>> {
  let sql = format!("SELECT {ENTRY_COLUMNS} FROM timetable_entries WHERE entry_id = ?1");
  conn
    .query_row(&sql, rusqlite::params![encode_uuid(id)], RawEntry::from_row)
    .optional()?
    .map(RawEntry::into_entry)
    .transpose()
}

/// Bookings already in `input`'s slot, other than the entry `exclude`.
fn slot_bookings(
  conn: &Connection,
  timetable_id: Uuid,
  input: &NewEntry,
  exclude: Option<Uuid>,
) -> Result<Vec<Booking>> {
  let entries = read_entries(
    conn,
    "timetable_id = ?1 AND day = ?2 AND period = ?3",
    rusqlite::params![
      encode_uuid(timetable_id),
      encode_day(input.day),
      encode_period(input.period),
    ],
  )?;
  Ok(
    entries
      .iter()
      .filter(|e| Some(e.entry_id) != exclude)
      .map(Booking::from)
      .collect(),
  )
}

fn new_entry_row(timetable_id: Uuid, input: NewEntry, now: DateTime<Utc>) -> TimetableEntry {
  TimetableEntry {
    entry_id: Uuid::new_v4(),
    timetable_id,
    day: input.day,
    period: input.period,
    room: input.room,
    class_id: input.class_id,
    teacher_id: input.teacher_id,
    subject_id: input.subject_id,
    is_locked: input.is_locked,
    created_at: now,
    updated_at: now,
  }
}

fn insert_entry(conn: &Connection, e: &TimetableEntry) -> Result<()> {
  conn.execute(
    &format!(
      "INSERT INTO timetable_entries ({ENTRY_COLUMNS})
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
    ),
    rusqlite::params![
      encode_uuid(e.entry_id),
      encode_uuid(e.timetable_id),
      encode_day(e.day),
      encode_period(e.period),
      e.room,
      e.class_id.map(encode_uuid),
      e.teacher_id.map(encode_uuid),
      e.subject_id.map(encode_uuid),
      e.is_locked,
      encode_dt(e.created_at),
      encode_dt(e.updated_at),
    ],
  )?;
  Ok(())
}

fn insert_config(conn: &Connection, c: &TimetableConfig) -> Result<()> {
  let day = &c.school_day;
  conn.execute(
    &format!(
      "INSERT INTO timetable_configs ({CONFIG_COLUMNS})
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
    ),
    rusqlite::params![
      encode_uuid(c.config_id),
      c.name,
      i64::from(day.periods_per_day),
      encode_time(day.school_start_time),
      encode_time(day.school_end_time),
      day.period_duration,
      encode_json(&day.break_periods)?,
      encode_json(&day.days_of_week)?,
      encode_json(&day.preferences)?,
      c.is_active,
      encode_dt(c.created_at),
      encode_dt(c.updated_at),
    ],
  )?;
  Ok(())
}

// ─── Transactions ────────────────────────────────────────────────────────────
//
// Each function opens a `BEGIN IMMEDIATE` transaction so the write lock is
// held from the first read. Returning early drops the transaction, which
// rolls it back.

fn save_config_tx(conn: &mut Connection, config: &TimetableConfig) -> Result<()> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  tx.execute(
    "UPDATE timetable_configs SET is_active = 0, updated_at = ?1 WHERE is_active = 1",
    rusqlite::params![encode_dt(config.created_at)],
  )?;
  insert_config(&tx, config)?;
  tx.commit()?;
  Ok(())
}

fn update_config_tx(
  conn: &mut Connection,
  id: Uuid,
  input: &NewConfig,
  now: DateTime<Utc>,
) -> Result<Option<TimetableConfig>> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  let day = &input.school_day;
  let changed = tx.execute(
    "UPDATE timetable_configs
     SET name = ?2, periods_per_day = ?3, school_start_time = ?4, school_end_time = ?5,
         period_duration = ?6, break_periods = ?7, days_of_week = ?8, preferences = ?9,
         updated_at = ?10
     WHERE config_id = ?1",
    rusqlite::params![
      encode_uuid(id),
      input.name,
      i64::from(day.periods_per_day),
      encode_time(day.school_start_time),
      encode_time(day.school_end_time),
      day.period_duration,
      encode_json(&day.break_periods)?,
      encode_json(&day.days_of_week)?,
      encode_json(&day.preferences)?,
      encode_dt(now),
    ],
  )?;
  if changed == 0 {
    return Ok(None);
  }
  let config = read_config(&tx, id)?;
  tx.commit()?;
  Ok(config)
}

fn place_entry_tx(
  conn: &mut Connection,
  timetable_id: Uuid,
  input: NewEntry,
  force: bool,
) -> Result<EntryOutcome> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  if !timetable_exists(&tx, timetable_id)? {
    return Ok(EntryOutcome::NotFound);
  }

  if !force {
    let existing = slot_bookings(&tx, timetable_id, &input, None)?;
    let conflicts = conflicts_for_candidate(existing, Booking::from(&input));
    if !conflicts.is_empty() {
      return Ok(EntryOutcome::Conflicts(conflicts));
    }
  }

  let entry = new_entry_row(timetable_id, input, Utc::now());
  insert_entry(&tx, &entry)?;
  tx.commit()?;
  Ok(EntryOutcome::Applied { entry, previous: None })
}

fn update_entry_tx(
  conn: &mut Connection,
  id: Uuid,
  input: NewEntry,
  force: bool,
) -> Result<EntryOutcome> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  let Some(current) = read_entry(&tx, id)? else {
    return Ok(EntryOutcome::NotFound);
  };
  if current.is_locked {
    return Ok(EntryOutcome::Locked(current));
  }

  if !force {
    let existing = slot_bookings(&tx, current.timetable_id, &input, Some(id))?;
    let conflicts = conflicts_for_candidate(existing, Booking::from(&input));
    if !conflicts.is_empty() {
      return Ok(EntryOutcome::Conflicts(conflicts));
    }
  }

  let entry = TimetableEntry {
    day: input.day,
    period: input.period,
    room: input.room,
    class_id: input.class_id,
    teacher_id: input.teacher_id,
    subject_id: input.subject_id,
    is_locked: input.is_locked,
    updated_at: Utc::now(),
    ..current.clone()
  };
  tx.execute(
    "UPDATE timetable_entries
     SET day = ?2, period = ?3, room = ?4, class_id = ?5, teacher_id = ?6,
         subject_id = ?7, is_locked = ?8, updated_at = ?9
     WHERE entry_id = ?1",
    rusqlite::params![
      encode_uuid(id),
      encode_day(entry.day),
      encode_period(entry.period),
      entry.room,
      entry.class_id.map(encode_uuid),
      entry.teacher_id.map(encode_uuid),
      entry.subject_id.map(encode_uuid),
      entry.is_locked,
      encode_dt(entry.updated_at),
    ],
  )?;
  tx.commit()?;
  Ok(EntryOutcome::Applied { entry, previous: Some(current) })
}

fn delete_entry_tx(conn: &mut Connection, id: Uuid) -> Result<EntryRemoval> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  let Some(current) = read_entry(&tx, id)? else {
    return Ok(EntryRemoval::NotFound);
  };
  if current.is_locked {
    return Ok(EntryRemoval::Locked(current));
  }
  tx.execute(
    "DELETE FROM timetable_entries WHERE entry_id = ?1",
    rusqlite::params![encode_uuid(id)],
  )?;
  tx.commit()?;
  Ok(EntryRemoval::Removed(current))
}

fn set_locked_tx(
  conn: &mut Connection,
  id: Uuid,
  locked: bool,
) -> Result<Option<(TimetableEntry, TimetableEntry)>> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  let Some(before) = read_entry(&tx, id)? else {
    return Ok(None);
  };
  let after = TimetableEntry { is_locked: locked, updated_at: Utc::now(), ..before.clone() };
  tx.execute(
    "UPDATE timetable_entries SET is_locked = ?2, updated_at = ?3 WHERE entry_id = ?1",
    rusqlite::params![encode_uuid(id), locked, encode_dt(after.updated_at)],
  )?;
  tx.commit()?;
  Ok(Some((before, after)))
}

fn replace_unlocked_tx<F>(
  conn: &mut Connection,
  timetable_id: Uuid,
  plan: F,
) -> Result<Option<Regeneration>>
where
  F: FnOnce(&[TimetableEntry]) -> PlacementPlan,
{
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  if !timetable_exists(&tx, timetable_id)? {
    return Ok(None);
  }

  let locked: Vec<TimetableEntry> = read_timetable_entries(&tx, timetable_id)?
    .into_iter()
    .filter(|e| e.is_locked)
    .collect();
  let plan = plan(&locked);

  let removed = tx.execute(
    "DELETE FROM timetable_entries WHERE timetable_id = ?1 AND is_locked = 0",
    rusqlite::params![encode_uuid(timetable_id)],
  )?;
  let now = Utc::now();
  for input in &plan.entries {
    insert_entry(&tx, &new_entry_row(timetable_id, input.clone(), now))?;
  }

  let entries = read_timetable_entries(&tx, timetable_id)?;
  tx.commit()?;
  tracing::debug!(
    %timetable_id,
    removed,
    inserted = plan.entries.len(),
    locked = locked.len(),
    "replaced unlocked entries"
  );
  Ok(Some(Regeneration { entries, locked, plan }))
}

fn create_version_tx(
  conn: &mut Connection,
  timetable_id: Uuid,
  input: NewVersion,
) -> Result<Option<TimetableVersion>> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  if !timetable_exists(&tx, timetable_id)? {
    return Ok(None);
  }

  let snapshot = Snapshot::capture(&read_timetable_entries(&tx, timetable_id)?)?;
  let id_str = encode_uuid(timetable_id);
  let next: i64 = tx.query_row(
    "SELECT COALESCE(MAX(version_number), 0) + 1 FROM timetable_versions WHERE timetable_id = ?1",
    rusqlite::params![id_str],
    |r| r.get(0),
  )?;
  tx.execute(
    "UPDATE timetable_versions SET is_active = 0 WHERE timetable_id = ?1 AND is_active = 1",
    rusqlite::params![id_str],
  )?;

  let version = TimetableVersion {
    version_id: Uuid::new_v4(),
    timetable_id,
    version_number: decode_count("version_number", next)?,
    description: input.description,
    is_active: true,
    created_by: input.created_by,
    snapshot: snapshot.entries,
    checksum: snapshot.checksum,
    created_at: Utc::now(),
  };
  tx.execute(
    &format!(
      "INSERT INTO timetable_versions ({VERSION_COLUMNS})
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
    ),
    rusqlite::params![
      encode_uuid(version.version_id),
      id_str,
      next,
      version.description,
      version.is_active,
      version.created_by.map(encode_uuid),
      encode_json(&version.snapshot)?,
      version.checksum,
      encode_dt(version.created_at),
    ],
  )?;
  tx.commit()?;
  Ok(Some(version))
}

// ─── TimetableStore impl ─────────────────────────────────────────────────────

impl TimetableStore for SqliteStore {
  type Error = Error;

  // ── Configs ───────────────────────────────────────────────────────────────

  async fn save_config(&self, input: NewConfig) -> Result<TimetableConfig> {
    let now = Utc::now();
    let config = TimetableConfig {
      config_id:  Uuid::new_v4(),
      name:       input.name,
      school_day: input.school_day,
      is_active:  true,
      created_at: now,
      updated_at: now,
    };

    let config = self
      .conn
      .call(move |conn| {
        save_config_tx(conn, &config).map_err(Error::into_call)?;
        Ok(config)
      })
      .await?;

    tracing::info!(config_id = %config.config_id, name = %config.name, "activated timetable config");
    Ok(config)
  }

  async fn update_config(&self, id: Uuid, input: NewConfig) -> Result<Option<TimetableConfig>> {
    let now = Utc::now();
    Ok(
      self
        .conn
        .call(move |conn| update_config_tx(conn, id, &input, now).map_err(Error::into_call))
        .await?,
    )
  }

  async fn get_config(&self, id: Uuid) -> Result<Option<TimetableConfig>> {
    Ok(
      self
        .conn
        .call(move |conn| read_config(conn, id).map_err(Error::into_call))
        .await?,
    )
  }

  async fn active_config(&self) -> Result<Option<TimetableConfig>> {
    let raw: Option<RawConfig> = self
      .conn
      .call(|conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {CONFIG_COLUMNS} FROM timetable_configs
                 WHERE is_active = 1 ORDER BY updated_at DESC LIMIT 1"
              ),
              [],
              RawConfig::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawConfig::into_config).transpose()
  }

  async fn list_configs(&self) -> Result<Vec<TimetableConfig>> {
    let raws: Vec<RawConfig> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CONFIG_COLUMNS} FROM timetable_configs ORDER BY created_at, rowid"
        ))?;
        let rows = stmt
          .query_map([], RawConfig::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawConfig::into_config).collect()
  }

  async fn delete_config(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM timetable_configs WHERE config_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;
    Ok(deleted > 0)
  }

  // ── Timetables ────────────────────────────────────────────────────────────

  async fn create_timetable(&self, input: NewTimetable) -> Result<Timetable> {
    let now = Utc::now();
    let timetable = Timetable {
      timetable_id:  Uuid::new_v4(),
      name:          input.name,
      term:          input.term,
      academic_year: input.academic_year,
      start_date:    input.start_date,
      end_date:      input.end_date,
      is_active:     input.is_active,
      config_id:     input.config_id,
      created_at:    now,
      updated_at:    now,
    };

    let id_str         = encode_uuid(timetable.timetable_id);
    let name           = timetable.name.clone();
    let term           = timetable.term.clone();
    let academic_year  = timetable.academic_year.clone();
    let start_date_str = timetable.start_date.map(encode_date);
    let end_date_str   = timetable.end_date.map(encode_date);
    let is_active      = timetable.is_active;
    let config_id_str  = timetable.config_id.map(encode_uuid);
    let at_str         = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!(
            "INSERT INTO timetables ({TIMETABLE_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)"
          ),
          rusqlite::params![
            id_str,
            name,
            term,
            academic_year,
            start_date_str,
            end_date_str,
            is_active,
            config_id_str,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(timetable)
  }

  async fn get_timetable(&self, id: Uuid) -> Result<Option<Timetable>> {
    Ok(
      self
        .conn
        .call(move |conn| read_timetable(conn, id).map_err(Error::into_call))
        .await?,
    )
  }

  async fn list_timetables(&self) -> Result<Vec<Timetable>> {
    let raws: Vec<RawTimetable> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {TIMETABLE_COLUMNS} FROM timetables ORDER BY created_at, rowid"
        ))?;
        let rows = stmt
          .query_map([], RawTimetable::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawTimetable::into_timetable).collect()
  }

  async fn update_timetable(&self, id: Uuid, input: NewTimetable) -> Result<Option<Timetable>> {
    let start_date_str = input.start_date.map(encode_date);
    let end_date_str   = input.end_date.map(encode_date);
    let config_id_str  = input.config_id.map(encode_uuid);
    let at_str         = encode_dt(Utc::now());

    Ok(
      self
        .conn
        .call(move |conn| {
          let changed = conn.execute(
            "UPDATE timetables
             SET name = ?2, term = ?3, academic_year = ?4, start_date = ?5, end_date = ?6,
                 is_active = ?7, config_id = ?8, updated_at = ?9
             WHERE timetable_id = ?1",
            rusqlite::params![
              encode_uuid(id),
              input.name,
              input.term,
              input.academic_year,
              start_date_str,
              end_date_str,
              input.is_active,
              config_id_str,
              at_str,
            ],
          )?;
          if changed == 0 {
            return Ok(None);
          }
          read_timetable(conn, id).map_err(Error::into_call)
        })
        .await?,
    )
  }

  async fn delete_timetable(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM timetables WHERE timetable_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;
    Ok(deleted > 0)
  }

  // ── Entries ───────────────────────────────────────────────────────────────

  async fn list_entries(&self, timetable_id: Uuid) -> Result<Vec<TimetableEntry>> {
    Ok(
      self
        .conn
        .call(move |conn| read_timetable_entries(conn, timetable_id).map_err(Error::into_call))
        .await?,
    )
  }

  async fn get_entry(&self, id: Uuid) -> Result<Option<TimetableEntry>> {
    Ok(
      self
        .conn
        .call(move |conn| read_entry(conn, id).map_err(Error::into_call))
        .await?,
    )
  }

  async fn place_entry(
    &self,
    timetable_id: Uuid,
    input: NewEntry,
    force: bool,
  ) -> Result<EntryOutcome> {
    Ok(
      self
        .conn
        .call(move |conn| {
          place_entry_tx(conn, timetable_id, input, force).map_err(Error::into_call)
        })
        .await?,
    )
  }

  async fn update_entry(&self, id: Uuid, input: NewEntry, force: bool) -> Result<EntryOutcome> {
    Ok(
      self
        .conn
        .call(move |conn| update_entry_tx(conn, id, input, force).map_err(Error::into_call))
        .await?,
    )
  }

  async fn delete_entry(&self, id: Uuid) -> Result<EntryRemoval> {
    Ok(
      self
        .conn
        .call(move |conn| delete_entry_tx(conn, id).map_err(Error::into_call))
        .await?,
    )
  }

  async fn set_entry_locked(
    &self,
    id: Uuid,
    locked: bool,
  ) -> Result<Option<(TimetableEntry, TimetableEntry)>> {
    Ok(
      self
        .conn
        .call(move |conn| set_locked_tx(conn, id, locked).map_err(Error::into_call))
        .await?,
    )
  }

  async fn replace_unlocked_entries<F>(
    &self,
    timetable_id: Uuid,
    plan: F,
  ) -> Result<Option<Regeneration>>
  where
    F: FnOnce(&[TimetableEntry]) -> PlacementPlan + Send + 'static,
  {
    Ok(
      self
        .conn
        .call(move |conn| replace_unlocked_tx(conn, timetable_id, plan).map_err(Error::into_call))
        .await?,
    )
  }

  // ── Versions ──────────────────────────────────────────────────────────────

  async fn create_version(
    &self,
    timetable_id: Uuid,
    input: NewVersion,
  ) -> Result<Option<TimetableVersion>> {
    let version = self
      .conn
      .call(move |conn| create_version_tx(conn, timetable_id, input).map_err(Error::into_call))
      .await?;

    if let Some(v) = &version {
      tracing::info!(
        %timetable_id,
        version_number = v.version_number,
        checksum = %v.checksum,
        "recorded timetable version"
      );
    }
    Ok(version)
  }

  async fn get_version(&self, id: Uuid) -> Result<Option<TimetableVersion>> {
    let id_str = encode_uuid(id);
    let raw: Option<RawVersion> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {VERSION_COLUMNS} FROM timetable_versions WHERE version_id = ?1"),
              rusqlite::params![id_str],
              RawVersion::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawVersion::into_version).transpose()
  }

  async fn list_versions(&self, timetable_id: Uuid) -> Result<Vec<TimetableVersion>> {
    let id_str = encode_uuid(timetable_id);
    let raws: Vec<RawVersion> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {VERSION_COLUMNS} FROM timetable_versions
           WHERE timetable_id = ?1 ORDER BY version_number"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawVersion::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawVersion::into_version).collect()
  }

  async fn active_version(&self, timetable_id: Uuid) -> Result<Option<TimetableVersion>> {
    let id_str = encode_uuid(timetable_id);
    let raw: Option<RawVersion> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {VERSION_COLUMNS} FROM timetable_versions
                 WHERE timetable_id = ?1 AND is_active = 1
                 ORDER BY version_number DESC LIMIT 1"
              ),
              rusqlite::params![id_str],
              RawVersion::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawVersion::into_version).transpose()
  }

  async fn append_change(&self, input: NewChangeLog) -> Result<ChangeLog> {
    let change = ChangeLog {
      change_id:  Uuid::new_v4(),
      version_id: input.version_id,
      entry_id:   input.entry_id,
      action:     input.action,
      old_value:  input.old_value,
      new_value:  input.new_value,
      changed_by: input.changed_by,
      reason:     input.reason,
      created_at: Utc::now(),
    };

    let change_id_str  = encode_uuid(change.change_id);
    let version_id_str = encode_uuid(change.version_id);
    let entry_id_str   = change.entry_id.map(encode_uuid);
    let action_str     = change.action.to_string();
    let old_value_str  = change.old_value.as_ref().map(encode_json).transpose()?;
    let new_value_str  = change.new_value.as_ref().map(encode_json).transpose()?;
    let changed_by_str = encode_uuid(change.changed_by);
    let reason         = change.reason.clone();
    let at_str         = encode_dt(change.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!(
            "INSERT INTO timetable_change_logs ({CHANGE_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
          ),
          rusqlite::params![
            change_id_str,
            version_id_str,
            entry_id_str,
            action_str,
            old_value_str,
            new_value_str,
            changed_by_str,
            reason,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(change)
  }

  async fn list_changes(&self, version_id: Uuid) -> Result<Vec<ChangeLog>> {
    let id_str = encode_uuid(version_id);
    let raws: Vec<RawChange> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CHANGE_COLUMNS} FROM timetable_change_logs
           WHERE version_id = ?1 ORDER BY created_at, rowid"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawChange::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawChange::into_change).collect()
  }
}
