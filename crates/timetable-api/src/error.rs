//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use timetable_core::{Error as CoreError, conflict::Conflict};

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  /// The write would double-book a slot; nothing was stored.
  #[error("{} conflicting booking(s)", .0.len())]
  Conflicts(Vec<Conflict>),

  #[error("locked: {0}")]
  Locked(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<CoreError> for ApiError {
  fn from(e: CoreError) -> Self {
    match e {
      CoreError::InvalidConfig(_)
      | CoreError::InvalidDateRange { .. }
      | CoreError::SlotOutsideGrid(_) => Self::BadRequest(e.to_string()),
      CoreError::TimetableNotFound(_)
      | CoreError::ConfigNotFound(_)
      | CoreError::EntryNotFound(_)
      | CoreError::VersionNotFound(_)
      | CoreError::NoActiveConfig => Self::NotFound(e.to_string()),
      CoreError::EntryLocked(_) => Self::Locked(e.to_string()),
      CoreError::Serialization(_) | CoreError::Store(_) => Self::Store(Box::new(e)),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Conflicts(conflicts) => {
        let body = json!({ "error": self.to_string(), "conflicts": conflicts });
        return (StatusCode::CONFLICT, Json(body)).into_response();
      }
      ApiError::Locked(m) => (StatusCode::LOCKED, m.clone()),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store error");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
