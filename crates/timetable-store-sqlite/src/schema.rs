//! SQL schema for the timetable SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
PRAGMA busy_timeout = 5000;

-- At most one row has is_active = 1; saving a config moves the flag.
CREATE TABLE IF NOT EXISTS timetable_configs (
    config_id         TEXT PRIMARY KEY,
    name              TEXT NOT NULL,
    periods_per_day   INTEGER NOT NULL,
    school_start_time TEXT NOT NULL,   -- HH:MM
    school_end_time   TEXT NOT NULL,   -- HH:MM
    period_duration   INTEGER NOT NULL,-- minutes
    break_periods     TEXT NOT NULL DEFAULT '[]',
    days_of_week      TEXT NOT NULL,   -- JSON array of day names
    preferences       TEXT NOT NULL DEFAULT '{}',
    is_active         INTEGER NOT NULL DEFAULT 0,
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS timetables (
    timetable_id  TEXT PRIMARY KEY,
    name          TEXT NOT NULL,
    term          TEXT NOT NULL,
    academic_year TEXT NOT NULL,
    start_date    TEXT,
    end_date      TEXT,
    is_active     INTEGER NOT NULL DEFAULT 0,
    config_id     TEXT REFERENCES timetable_configs(config_id) ON DELETE SET NULL,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

-- No uniqueness on (timetable_id, day, period, ...): a forced manual
-- placement may deliberately double-book a slot.
CREATE TABLE IF NOT EXISTS timetable_entries (
    entry_id     TEXT PRIMARY KEY,
    timetable_id TEXT NOT NULL REFERENCES timetables(timetable_id) ON DELETE CASCADE,
    day          TEXT NOT NULL,
    period       INTEGER NOT NULL,
    room         TEXT,
    class_id     TEXT,
    teacher_id   TEXT,
    subject_id   TEXT,
    is_locked    INTEGER NOT NULL DEFAULT 0,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS timetable_versions (
    version_id     TEXT PRIMARY KEY,
    timetable_id   TEXT NOT NULL REFERENCES timetables(timetable_id) ON DELETE CASCADE,
    version_number INTEGER NOT NULL,
    description    TEXT,
    is_active      INTEGER NOT NULL DEFAULT 0,
    created_by     TEXT,
    snapshot       TEXT NOT NULL,   -- JSON array of entries
    checksum       TEXT NOT NULL,   -- SHA-256 hex of snapshot
    created_at     TEXT NOT NULL,
    UNIQUE (timetable_id, version_number)
);

-- Change logs are append-only.
CREATE TABLE IF NOT EXISTS timetable_change_logs (
    change_id  TEXT PRIMARY KEY,
    version_id TEXT NOT NULL REFERENCES timetable_versions(version_id) ON DELETE CASCADE,
    entry_id   TEXT,
    action     TEXT NOT NULL,   -- create | update | delete | lock | unlock
    old_value  TEXT,
    new_value  TEXT,
    changed_by TEXT NOT NULL,
    reason     TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS entries_slot_idx      ON timetable_entries(timetable_id, day, period);
CREATE INDEX IF NOT EXISTS versions_timetable_idx ON timetable_versions(timetable_id);
CREATE INDEX IF NOT EXISTS changes_version_idx   ON timetable_change_logs(version_id);

PRAGMA user_version = 1;
";
