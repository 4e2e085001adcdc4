//! Error type for `setlist-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] setlist_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown {field} value: {value:?}")]
  UnknownValue { field: &'static str, value: String },

  #[error("group not found: {0}")]
  GroupNotFound(uuid::Uuid),

  #[error("track not found: {0}")]
  TrackNotFound(uuid::Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
