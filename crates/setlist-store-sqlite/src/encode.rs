//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Track details are stored as
//! compact JSON. UUIDs are stored as hyphenated lowercase strings.

use std::collections::BTreeSet;

use chrono::{DateTime, SecondsFormat, Utc};
use setlist_core::{
  activity::{Activity, ActivityKind},
  comment::Comment,
  group::Group,
  rating::{Rating, Score},
  track::{Track, TrackDetails},
  user::{Role, User, UserId},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

/// Fixed-width so that string order in SQL matches chronological order.
pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Nanos, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Role / ActivityKind ─────────────────────────────────────────────────────

pub fn encode_role(r: Role) -> String { r.to_string() }

pub fn decode_role(s: &str) -> Result<Role> {
  s.parse().map_err(|_| Error::UnknownValue { field: "role", value: s.to_owned() })
}

pub fn encode_activity_kind(k: ActivityKind) -> String { k.to_string() }

pub fn decode_activity_kind(s: &str) -> Result<ActivityKind> {
  s.parse()
    .map_err(|_| Error::UnknownValue { field: "activity kind", value: s.to_owned() })
}

// ─── TrackDetails ────────────────────────────────────────────────────────────

pub fn encode_details(d: &TrackDetails) -> Result<String> { Ok(serde_json::to_string(d)?) }

pub fn decode_details(s: &str) -> Result<TrackDetails> { Ok(serde_json::from_str(s)?) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `users` row.
pub struct RawUser {
  pub user_id:      String,
  pub display_name: String,
  pub email:        String,
  pub role:         String,
}

impl RawUser {
  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:      UserId(self.user_id),
      display_name: self.display_name,
      email:        self.email,
      role:         decode_role(&self.role)?,
    })
  }
}

/// A `track_groups` row plus its member ids.
pub struct RawGroup {
  pub group_id:   String,
  pub name:       String,
  pub admin_id:   String,
  pub created_at: String,
  pub members:    Vec<String>,
}

impl RawGroup {
  pub fn into_group(self) -> Result<Group> {
    Ok(Group {
      group_id:   decode_uuid(&self.group_id)?,
      name:       self.name,
      admin_id:   UserId(self.admin_id),
      members:    self.members.into_iter().map(UserId).collect::<BTreeSet<_>>(),
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `tracks` row.
pub struct RawTrack {
  pub track_id:      String,
  pub group_id:      String,
  pub details_json:  String,
  pub added_by_id:   String,
  pub added_by_name: String,
  pub added_at:      String,
}

impl RawTrack {
  pub fn into_track(self) -> Result<Track> {
    Ok(Track {
      track_id:      decode_uuid(&self.track_id)?,
      group_id:      decode_uuid(&self.group_id)?,
      details:       decode_details(&self.details_json)?,
      added_by_id:   UserId(self.added_by_id),
      added_by_name: self.added_by_name,
      added_at:      decode_dt(&self.added_at)?,
    })
  }
}

pub const TRACK_COLUMNS: &str =
  "track_id, group_id, details_json, added_by_id, added_by_name, added_at";

pub fn raw_track(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawTrack> {
  Ok(RawTrack {
    track_id:      row.get(0)?,
    group_id:      row.get(1)?,
    details_json:  row.get(2)?,
    added_by_id:   row.get(3)?,
    added_by_name: row.get(4)?,
    added_at:      row.get(5)?,
  })
}

/// Raw values read directly from a `ratings` row.
pub struct RawRating {
  pub track_id: String,
  pub user_id:  String,
  pub score:    i64,
  pub rated_at: String,
}

impl RawRating {
  pub fn into_rating(self) -> Result<Rating> {
    Ok(Rating {
      track_id: decode_uuid(&self.track_id)?,
      user_id:  UserId(self.user_id),
      score:    Score::new(self.score)?,
      rated_at: decode_dt(&self.rated_at)?,
    })
  }
}

pub fn raw_rating(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRating> {
  Ok(RawRating {
    track_id: row.get(0)?,
    user_id:  row.get(1)?,
    score:    row.get(2)?,
    rated_at: row.get(3)?,
  })
}

/// Raw strings read directly from a `comments` row.
pub struct RawComment {
  pub comment_id:  String,
  pub track_id:    String,
  pub author_id:   String,
  pub author_name: String,
  pub text:        String,
  pub created_at:  String,
}

impl RawComment {
  pub fn into_comment(self) -> Result<Comment> {
    Ok(Comment {
      comment_id:  decode_uuid(&self.comment_id)?,
      track_id:    decode_uuid(&self.track_id)?,
      author_id:   UserId(self.author_id),
      author_name: self.author_name,
      text:        self.text,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from an `activities` row.
pub struct RawActivity {
  pub activity_id: String,
  pub group_id:    String,
  pub kind:        String,
  pub user_id:     String,
  pub user_name:   String,
  pub track_id:    Option<String>,
  pub track_title: Option<String>,
  pub score:       Option<i64>,
  pub comment:     Option<String>,
  pub recorded_at: String,
}

impl RawActivity {
  pub fn into_activity(self) -> Result<Activity> {
    Ok(Activity {
      activity_id: decode_uuid(&self.activity_id)?,
      group_id:    decode_uuid(&self.group_id)?,
      kind:        decode_activity_kind(&self.kind)?,
      user_id:     UserId(self.user_id),
      user_name:   self.user_name,
      track_id:    self.track_id.as_deref().map(decode_uuid).transpose()?,
      track_title: self.track_title,
      score:       self.score.map(Score::new).transpose()?,
      comment:     self.comment,
      recorded_at: decode_dt(&self.recorded_at)?,
    })
  }
}
