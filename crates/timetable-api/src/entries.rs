//! Handlers for timetable entries.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`    | `/timetables/{id}/entries` | `ETag` is the snapshot checksum; honours `If-None-Match` |
//! | `POST`   | `/timetables/{id}/entries` | 201, or 409 with `conflicts` unless `force` |
//! | `GET`    | `/entries/{id}` | |
//! | `PUT`    | `/entries/{id}` | 409 on conflicts, 423 when locked |
//! | `DELETE` | `/entries/{id}` | 423 when locked; `?changed_by=&reason=` for the change log |
//! | `PUT`    | `/entries/{id}/lock` | body `{"locked": true}` |
//!
//! Successful writes answer with the entry plus a `degraded` list naming any
//! change-log write that did not happen.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::{HeaderMap, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde::Deserialize;
use timetable_core::{
  service::{self, ChangeMeta, EntryRequest, Outcome, Placement},
  snapshot::Snapshot,
  store::TimetableStore,
  timetable::TimetableEntry,
};
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

// ─── List ────────────────────────────────────────────────────────────────────

/// `GET /timetables/{id}/entries`
pub async fn list<S: TimetableStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  headers: HeaderMap,
) -> Result<Response, ApiError> {
  service::require_timetable(&*state.store, id).await?;
  let entries = state
    .store
    .list_entries(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  let etag = Snapshot::capture(&entries)?.etag();

  let fresh = headers
    .get(header::IF_NONE_MATCH)
    .and_then(|v| v.to_str().ok())
    .is_some_and(|v| etag_matches(v, &etag));
  if fresh {
    return Ok((StatusCode::NOT_MODIFIED, [(header::ETAG, etag)]).into_response());
  }

  Ok(([(header::ETAG, etag)], Json(entries)).into_response())
}

/// Whether an `If-None-Match` value names `etag`. Weak and bare tags compare
/// by their opaque part.
fn etag_matches(if_none_match: &str, etag: &str) -> bool {
  let opaque = |t: &str| t.trim().trim_start_matches("W/").trim_matches('"').to_owned();
  let wanted = opaque(etag);
  if_none_match
    .split(',')
    .any(|t| t.trim() == "*" || opaque(t) == wanted)
}

// ─── Writes ──────────────────────────────────────────────────────────────────

fn placed(status: StatusCode, outcome: Outcome<Placement>) -> Result<Response, ApiError> {
  match outcome.value {
    Placement::Placed(entry) => {
      let body = Outcome { value: entry, degraded: outcome.degraded };
      Ok((status, Json(body)).into_response())
    }
    Placement::Conflicts(conflicts) => Err(ApiError::Conflicts(conflicts)),
  }
}

/// `POST /timetables/{id}/entries`
pub async fn create<S: TimetableStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<EntryRequest>,
) -> Result<Response, ApiError> {
  let outcome = service::place_entry(&*state.store, id, body).await?;
  placed(StatusCode::CREATED, outcome)
}

/// `GET /entries/{id}`
pub async fn get_one<S: TimetableStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<TimetableEntry>, ApiError> {
  let entry = state
    .store
    .get_entry(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("timetable entry {id} not found")))?;
  Ok(Json(entry))
}

/// `PUT /entries/{id}`
pub async fn update<S: TimetableStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<EntryRequest>,
) -> Result<Response, ApiError> {
  let outcome = service::update_entry(&*state.store, id, body).await?;
  placed(StatusCode::OK, outcome)
}

/// `DELETE /entries/{id}`
pub async fn delete<S: TimetableStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Query(meta): Query<ChangeMeta>,
) -> Result<Json<Outcome<TimetableEntry>>, ApiError> {
  Ok(Json(service::delete_entry(&*state.store, id, meta).await?))
}

#[derive(Debug, Deserialize)]
pub struct LockBody {
  pub locked: bool,
  #[serde(flatten)]
  pub meta:   ChangeMeta,
}

/// `PUT /entries/{id}/lock`
pub async fn lock<S: TimetableStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<LockBody>,
) -> Result<Json<Outcome<TimetableEntry>>, ApiError> {
  Ok(Json(service::set_lock(&*state.store, id, body.locked, body.meta).await?))
}

#[cfg(test)]
mod tests {
  use super::etag_matches;

  #[test]
  fn if_none_match_accepts_quoted_bare_weak_and_wildcard_tags() {
    let etag = "\"abc\"";
    assert!(etag_matches("\"abc\"", etag));
    assert!(etag_matches("abc", etag));
    assert!(etag_matches("W/\"abc\"", etag));
    assert!(etag_matches("\"zzz\", \"abc\"", etag));
    assert!(etag_matches("*", etag));
    assert!(!etag_matches("\"abd\"", etag));
  }
}
