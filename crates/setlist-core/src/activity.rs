//! Activity log: a group-scoped, append-only record of who did what.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::{rating::Score, user::UserId};

/// Number of entries returned when no explicit limit is requested.
pub const DEFAULT_ACTIVITY_LIMIT: usize = 20;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActivityKind {
  TrackAdded,
  TrackDeleted,
  TrackRated,
  CommentAdded,
  UserJoinedGroup,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
  pub activity_id: Uuid,
  pub group_id:    Uuid,
  pub kind:        ActivityKind,
  pub user_id:     UserId,
  pub user_name:   String,
  pub track_id:    Option<Uuid>,
  pub track_title: Option<String>,
  pub score:       Option<Score>,
  pub comment:     Option<String>,
  pub recorded_at: DateTime<Utc>,
}

impl Activity {
  /// One-line human summary, e.g. `"alice rated Waltz (4★)"`.
  pub fn summary(&self) -> String {
    let title = self.track_title.as_deref().unwrap_or("a track");
    match self.kind {
      ActivityKind::TrackAdded => format!("{} added {title}", self.user_name),
      ActivityKind::TrackDeleted => format!("{} deleted {title}", self.user_name),
      ActivityKind::TrackRated => match self.score {
        Some(s) => format!("{} rated {title} ({s}★)", self.user_name),
        None => format!("{} rated {title}", self.user_name),
      },
      ActivityKind::CommentAdded => format!("{} commented on {title}", self.user_name),
      ActivityKind::UserJoinedGroup => format!("{} joined the group", self.user_name),
    }
  }
}

/// Input to [`crate::store::TrackStore::record_activity`].
#[derive(Debug, Clone)]
pub struct NewActivity {
  pub group_id:    Uuid,
  pub kind:        ActivityKind,
  pub user_id:     UserId,
  pub user_name:   String,
  pub track_id:    Option<Uuid>,
  pub track_title: Option<String>,
  pub score:       Option<Score>,
  pub comment:     Option<String>,
}

impl NewActivity {
  pub fn new(
    group_id: Uuid,
    kind: ActivityKind,
    user_id: UserId,
    user_name: impl Into<String>,
  ) -> Self {
    Self {
      group_id,
      kind,
      user_id,
      user_name: user_name.into(),
      track_id: None,
      track_title: None,
      score: None,
      comment: None,
    }
  }

  pub fn with_track(mut self, track_id: Uuid, title: Option<String>) -> Self {
    self.track_id = Some(track_id);
    self.track_title = title;
    self
  }

  pub fn with_score(mut self, score: Score) -> Self {
    self.score = Some(score);
    self
  }

  pub fn with_comment(mut self, text: impl Into<String>) -> Self {
    self.comment = Some(text.into());
    self
  }

  /// Materialise the stored record.
  pub fn into_activity(self, activity_id: Uuid, recorded_at: DateTime<Utc>) -> Activity {
    Activity {
      activity_id,
      group_id: self.group_id,
      kind: self.kind,
      user_id: self.user_id,
      user_name: self.user_name,
      track_id: self.track_id,
      track_title: self.track_title,
      score: self.score,
      comment: self.comment,
      recorded_at,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rated_summary_includes_score() {
    let a = NewActivity::new(Uuid::nil(), ActivityKind::TrackRated, UserId::new("u1"), "alice")
      .with_track(Uuid::nil(), Some("Waltz".into()))
      .with_score(Score::new(4).unwrap())
      .into_activity(Uuid::nil(), Utc::now());
    assert_eq!(a.summary(), "alice rated Waltz (4★)");
  }

  #[test]
  fn kind_round_trips_through_strings() {
    assert_eq!(ActivityKind::UserJoinedGroup.to_string(), "user_joined_group");
    assert_eq!(
      "comment_added".parse::<ActivityKind>().unwrap(),
      ActivityKind::CommentAdded
    );
  }
}
