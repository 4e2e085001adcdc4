//! Error type for `setlist-view`.

use thiserror::Error;
use uuid::Uuid;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  /// The acting user may not touch one or more of the targeted records.
  #[error("{0}")]
  Forbidden(String),

  /// Blocked client-side before any network call.
  #[error("{0}")]
  Validation(String),

  #[error("sign in to do that")]
  NotSignedIn,

  #[error("no active group; the demo table is read-only")]
  NoActiveGroup,

  #[error("track not found: {0}")]
  TrackNotFound(Uuid),

  #[error("group not found: {0}")]
  GroupNotFound(Uuid),

  #[error(transparent)]
  Core(#[from] setlist_core::Error),

  #[error("store error: {0}")]
  Store(#[source] BoxError),

  #[error("metadata service error: {0}")]
  Metadata(#[source] BoxError),
}

impl Error {
  pub(crate) fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }

  /// Whether this is a user-correctable problem rather than a failure.
  pub fn is_hint(&self) -> bool {
    matches!(
      self,
      Self::Validation(_) | Self::NotSignedIn | Self::NoActiveGroup | Self::Core(_)
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
