//! Handlers for timetable versions and their change logs.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/timetables/{id}/versions` | oldest first |
//! | `POST` | `/timetables/{id}/versions` | 201; snapshots the current entries |
//! | `GET`  | `/versions/{id}/changes` | oldest first |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use timetable_core::{
  service,
  store::TimetableStore,
  version::{ChangeLog, NewVersion, TimetableVersion},
};
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

/// `GET /timetables/{id}/versions`
pub async fn list<S: TimetableStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<TimetableVersion>>, ApiError> {
  Ok(Json(service::list_versions(&*state.store, id).await?))
}

/// `POST /timetables/{id}/versions` with body `{"description": ..., "created_by": ...}`
pub async fn create<S: TimetableStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<NewVersion>,
) -> Result<impl IntoResponse, ApiError> {
  let version = service::create_version(&*state.store, id, body).await?;
  Ok((StatusCode::CREATED, Json(version)))
}

/// `GET /versions/{id}/changes`
pub async fn changes<S: TimetableStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<ChangeLog>>, ApiError> {
  Ok(Json(service::list_changes(&*state.store, id).await?))
}
