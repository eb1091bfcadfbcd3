//! Timetable versions and the per-entry change log.
//!
//! Both are append-only audit records. A version is never edited after it is
//! written; a newer version supersedes it by taking over the active flag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// A snapshot of a timetable's entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimetableVersion {
  pub version_id:     Uuid,
  pub timetable_id:   Uuid,
  /// Monotonic per timetable, starting at 1.
  pub version_number: u32,
  pub description:    Option<String>,
  pub is_active:      bool,
  pub created_by:     Option<Uuid>,
  /// The entries at creation time, ordered by slot.
  pub snapshot:       serde_json::Value,
  /// SHA-256 hex digest of `snapshot`.
  pub checksum:       String,
  pub created_at:     DateTime<Utc>,
}

/// Input to [`crate::store::TimetableStore::create_version`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewVersion {
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub created_by:  Option<Uuid>,
}

/// What happened to an entry.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChangeAction {
  Create,
  Update,
  Delete,
  Lock,
  Unlock,
}

/// One audited mutation of an entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeLog {
  pub change_id:  Uuid,
  pub version_id: Uuid,
  pub entry_id:   Option<Uuid>,
  pub action:     ChangeAction,
  pub old_value:  Option<serde_json::Value>,
  pub new_value:  Option<serde_json::Value>,
  pub changed_by: Uuid,
  pub reason:     Option<String>,
  pub created_at: DateTime<Utc>,
}

/// Input to [`crate::store::TimetableStore::append_change`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewChangeLog {
  pub version_id: Uuid,
  pub entry_id:   Option<Uuid>,
  pub action:     ChangeAction,
  pub old_value:  Option<serde_json::Value>,
  pub new_value:  Option<serde_json::Value>,
  pub changed_by: Uuid,
  pub reason:     Option<String>,
}
