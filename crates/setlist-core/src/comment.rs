//! Comments: append-only free-text annotations on a track.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::user::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
  pub comment_id:  Uuid,
  pub track_id:    Uuid,
  pub author_id:   UserId,
  pub author_name: String,
  pub text:        String,
  pub created_at:  DateTime<Utc>,
}

/// Input to [`crate::store::TrackStore::add_comment`].
#[derive(Debug, Clone)]
pub struct NewComment {
  pub track_id:    Uuid,
  pub author_id:   UserId,
  pub author_name: String,
  pub text:        String,
}

impl NewComment {
  /// Materialise the stored record.
  pub fn into_comment(self, comment_id: Uuid, created_at: DateTime<Utc>) -> Comment {
    Comment {
      comment_id,
      track_id: self.track_id,
      author_id: self.author_id,
      author_name: self.author_name,
      text: self.text,
      created_at,
    }
  }
}
