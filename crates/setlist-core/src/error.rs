//! Error types for `setlist-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("score must be between 1 and 5, got {0}")]
  ScoreOutOfRange(i64),

  #[error("permalink is required")]
  MissingPermalink,

  #[error("not a SoundCloud permalink: {0:?}")]
  InvalidPermalink(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
