//! Handlers for `/timetables` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`    | `/timetables` | |
//! | `POST`   | `/timetables` | 201; 404 if `config_id` is unknown |
//! | `GET`    | `/timetables/{id}` | 404 if not found |
//! | `PUT`    | `/timetables/{id}` | full replacement |
//! | `DELETE` | `/timetables/{id}` | cascades to entries and versions |
//! | `GET`    | `/timetables/{id}/conflicts` | |
//! | `GET`    | `/timetables/{id}/grid` | grid of the resolved config |
//! | `POST`   | `/timetables/{id}/generate` | 201 with the generation report |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use timetable_core::{
  conflict::Conflict,
  grid::WeekGrid,
  service::{self, GenerateRequest, GenerationReport, Outcome},
  store::TimetableStore,
  timetable::{NewTimetable, Timetable},
};
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

// ─── CRUD ────────────────────────────────────────────────────────────────────

/// `GET /timetables`
pub async fn list<S: TimetableStore>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Vec<Timetable>>, ApiError> {
  let timetables = state
    .store
    .list_timetables()
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(timetables))
}

/// `POST /timetables`
pub async fn create<S: TimetableStore>(
  State(state): State<ApiState<S>>,
  Json(body): Json<NewTimetable>,
) -> Result<impl IntoResponse, ApiError> {
  let timetable = service::create_timetable(&*state.store, body).await?;
  Ok((StatusCode::CREATED, Json(timetable)))
}

/// `GET /timetables/{id}`
pub async fn get_one<S: TimetableStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Timetable>, ApiError> {
  Ok(Json(service::require_timetable(&*state.store, id).await?))
}

/// `PUT /timetables/{id}`
pub async fn update<S: TimetableStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<NewTimetable>,
) -> Result<Json<Timetable>, ApiError> {
  Ok(Json(service::update_timetable(&*state.store, id, body).await?))
}

/// `DELETE /timetables/{id}`
pub async fn delete<S: TimetableStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  let deleted = state
    .store
    .delete_timetable(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  if deleted {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::NotFound(format!("timetable {id} not found")))
  }
}

// ─── Derived views ───────────────────────────────────────────────────────────

/// `GET /timetables/{id}/conflicts`
pub async fn conflicts<S: TimetableStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Conflict>>, ApiError> {
  Ok(Json(service::conflicts(&*state.store, id).await?))
}

/// `GET /timetables/{id}/grid`
pub async fn grid<S: TimetableStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<WeekGrid>, ApiError> {
  Ok(Json(service::timetable_grid(&*state.store, id).await?))
}

// ─── Generation ──────────────────────────────────────────────────────────────

/// `POST /timetables/{id}/generate`
///
/// Regenerates every unlocked entry. A version that could not be recorded is
/// listed under `degraded`; the status stays 201.
pub async fn generate<S: TimetableStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<GenerateRequest>,
) -> Result<(StatusCode, Json<Outcome<GenerationReport>>), ApiError> {
  let outcome = service::generate(&*state.store, id, body, state.placement).await?;
  Ok((StatusCode::CREATED, Json(outcome)))
}
