//! Deterministic snapshots of a timetable's entries.
//!
//! Entries are ordered by slot and then by id before serialising, so the
//! checksum does not depend on the order rows came back from the store. It is
//! taken over the serialised `entries` value, so a stored snapshot can be
//! re-verified. The same checksum doubles as the ETag of the entry listing.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::{Result, timetable::TimetableEntry};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
  pub entries:  serde_json::Value,
  pub checksum: String,
}

impl Snapshot {
  pub fn capture(entries: &[TimetableEntry]) -> Result<Self> {
    let mut ordered: Vec<&TimetableEntry> = entries.iter().collect();
    ordered.sort_by_key(|e| (e.slot(), e.entry_id));

    let entries = serde_json::to_value(&ordered)?;
    let checksum = hex::encode(Sha256::digest(serde_json::to_vec(&entries)?));

    Ok(Self { entries, checksum })
  }

  /// The checksum as a quoted HTTP entity tag.
  pub fn etag(&self) -> String { format!("\"{}\"", self.checksum) }
}

#[cfg(test)]
mod tests {
  use chrono::{TimeZone, Utc};
  use uuid::Uuid;

  use super::*;
  use crate::slot::{Day, Period};

  fn entry(day: Day, n: u32) -> TimetableEntry {
    let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    TimetableEntry {
      entry_id:     Uuid::new_v4(),
      timetable_id: Uuid::nil(),
      day,
      period:       Period::new(n).unwrap(),
      room:         None,
      class_id:     Some(Uuid::new_v4()),
      teacher_id:   Some(Uuid::new_v4()),
      subject_id:   None,
      is_locked:    false,
      created_at:   ts,
      updated_at:   ts,
    }
  }

  #[test]
  fn row_order_does_not_matter() {
    let a = entry(Day::Monday, 2);
    let b = entry(Day::Monday, 1);
    let one = Snapshot::capture(&[a.clone(), b.clone()]).unwrap();
    let two = Snapshot::capture(&[b.clone(), a]).unwrap();
    assert_eq!(one, two);
    assert_eq!(one.entries[0]["entry_id"], b.entry_id.to_string());
  }

  #[test]
  fn locking_an_entry_changes_the_checksum() {
    let a = entry(Day::Friday, 4);
    let mut locked = a.clone();
    locked.is_locked = true;
    let before = Snapshot::capture(&[a]).unwrap();
    let after = Snapshot::capture(&[locked]).unwrap();
    assert_ne!(before.checksum, after.checksum);
    assert_eq!(before.checksum.len(), 64);
    assert!(before.etag().starts_with('"'));
  }
}
