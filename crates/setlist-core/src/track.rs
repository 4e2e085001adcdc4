//! Track: one curated item in a group's shared table.
//!
//! A track's scalar metadata is fixed once it is created. The only derived
//! value, the aggregate rating, is never stored on the record; it is merged in
//! at read time as a [`RatedTrack`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::user::{User, UserId};

// ─── Details ─────────────────────────────────────────────────────────────────

/// The user-editable metadata of a track. Doubles as the add-track form state
/// before submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackDetails {
  pub title:        Option<String>,
  pub artist:       Option<String>,
  pub album:        Option<String>,
  pub genre:        Option<String>,
  pub release_date: Option<NaiveDate>,
  pub publish_date: Option<NaiveDate>,
  pub likes:        Option<u64>,
  pub playbacks:    Option<u64>,
  /// External SoundCloud URL.
  pub permalink:    Option<String>,
  pub artwork_url:  Option<String>,
  #[serde(default)]
  pub tags:         Vec<String>,
}

impl TrackDetails {
  /// Clear every field, as the form does after a successful submission.
  pub fn reset(&mut self) { *self = Self::default(); }
}

// ─── Track ───────────────────────────────────────────────────────────────────

/// A stored track. `track_id` is assigned by the store and never changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
  pub track_id:      Uuid,
  pub group_id:      Uuid,
  #[serde(flatten)]
  pub details:       TrackDetails,
  pub added_by_id:   UserId,
  pub added_by_name: String,
  pub added_at:      DateTime<Utc>,
}

impl Track {
  /// A label for notices and activity entries.
  pub fn display_title(&self) -> &str {
    self.details.title.as_deref().unwrap_or("a track")
  }
}

// ─── NewTrack ────────────────────────────────────────────────────────────────

/// Input to [`crate::store::TrackStore::add_track`].
/// `track_id` and `added_at` are always set by the store.
#[derive(Debug, Clone)]
pub struct NewTrack {
  pub group_id:      Uuid,
  pub details:       TrackDetails,
  pub added_by_id:   UserId,
  pub added_by_name: String,
}

impl NewTrack {
  /// Convenience constructor with empty details.
  pub fn new(
    group_id: Uuid,
    added_by_id: UserId,
    added_by_name: impl Into<String>,
  ) -> Self {
    Self {
      group_id,
      details: TrackDetails::default(),
      added_by_id,
      added_by_name: added_by_name.into(),
    }
  }

  /// Attribute a submitted form to `user` within `group_id`.
  pub fn from_details(group_id: Uuid, details: TrackDetails, user: &User) -> Self {
    Self {
      group_id,
      details,
      added_by_id: user.user_id.clone(),
      added_by_name: user.display_name.clone(),
    }
  }

  pub fn with_details(mut self, details: TrackDetails) -> Self {
    self.details = details;
    self
  }

  /// Materialise the stored record.
  pub fn into_track(self, track_id: Uuid, added_at: DateTime<Utc>) -> Track {
    Track {
      track_id,
      group_id: self.group_id,
      details: self.details,
      added_by_id: self.added_by_id,
      added_by_name: self.added_by_name,
      added_at,
    }
  }
}

// ─── Read model ──────────────────────────────────────────────────────────────

/// A track with its aggregate rating merged in. Never stored, always derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatedTrack {
  #[serde(flatten)]
  pub track:  Track,
  /// Mean of all ratings; `None` until at least one rating exists.
  pub rating: Option<f64>,
}

impl RatedTrack {
  pub fn track_id(&self) -> Uuid { self.track.track_id }
}
