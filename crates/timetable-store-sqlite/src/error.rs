//! Error type for `timetable-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] timetable_core::Error),

  #[error("database error: {0}")]
  Database(#[source] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A column held a value the domain types cannot represent.
  #[error("invalid {column} value: {value:?}")]
  Decode { column: &'static str, value: String },
}

impl Error {
  /// Carry this error out of a `tokio_rusqlite` closure. The `From` impl
  /// below unwraps it again on the other side.
  pub(crate) fn into_call(self) -> tokio_rusqlite::Error {
    tokio_rusqlite::Error::Other(Box::new(self))
  }
}

impl From<tokio_rusqlite::Error> for Error {
  fn from(e: tokio_rusqlite::Error) -> Self {
    match e {
      tokio_rusqlite::Error::Other(inner) => match inner.downcast::<Error>() {
        Ok(own) => *own,
        Err(other) => Self::Database(tokio_rusqlite::Error::Other(other)),
      },
      e => Self::Database(e),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
