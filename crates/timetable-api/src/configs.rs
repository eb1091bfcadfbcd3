//! Handlers for `/configs` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`    | `/configs` | |
//! | `POST`   | `/configs` | 201; the new config becomes the active one |
//! | `GET`    | `/configs/active` | 404 if none is active |
//! | `GET`    | `/configs/{id}` | |
//! | `PUT`    | `/configs/{id}` | keeps id and active flag |
//! | `DELETE` | `/configs/{id}` | linked timetables lose their config |
//! | `GET`    | `/configs/{id}/grid` | preview of the day grid |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use timetable_core::{
  config::{NewConfig, TimetableConfig},
  grid::WeekGrid,
  service,
  store::TimetableStore,
};
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

/// `GET /configs`
pub async fn list<S: TimetableStore>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Vec<TimetableConfig>>, ApiError> {
  let configs = state
    .store
    .list_configs()
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(configs))
}

/// `POST /configs`
pub async fn create<S: TimetableStore>(
  State(state): State<ApiState<S>>,
  Json(body): Json<NewConfig>,
) -> Result<impl IntoResponse, ApiError> {
  let config = service::save_config(&*state.store, body).await?;
  Ok((StatusCode::CREATED, Json(config)))
}

/// `GET /configs/active`
pub async fn active<S: TimetableStore>(
  State(state): State<ApiState<S>>,
) -> Result<Json<TimetableConfig>, ApiError> {
  let config = state
    .store
    .active_config()
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound("no active timetable config".into()))?;
  Ok(Json(config))
}

/// `GET /configs/{id}`
pub async fn get_one<S: TimetableStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<TimetableConfig>, ApiError> {
  let config = state
    .store
    .get_config(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("timetable config {id} not found")))?;
  Ok(Json(config))
}

/// `PUT /configs/{id}`
pub async fn update<S: TimetableStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<NewConfig>,
) -> Result<Json<TimetableConfig>, ApiError> {
  Ok(Json(service::update_config(&*state.store, id, body).await?))
}

/// `DELETE /configs/{id}`
pub async fn delete<S: TimetableStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  let deleted = state
    .store
    .delete_config(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  if deleted {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::NotFound(format!("timetable config {id} not found")))
  }
}

/// `GET /configs/{id}/grid`
pub async fn grid<S: TimetableStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<WeekGrid>, ApiError> {
  let config = service::resolve_config(&*state.store, Some(id), None).await?;
  Ok(Json(WeekGrid::build(&config.school_day)))
}
