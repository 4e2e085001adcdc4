//! Metadata autofill: the record returned by the metadata-fetch service and
//! the explicit partial update it becomes.
//!
//! Each field of a [`MetadataPatch`] says exactly what to do with the form
//! field it targets, so a falsy-but-valid value (a zero like count, an empty
//! tag list) is never confused with "the service said nothing".

use std::future::Future;

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, track::TrackDetails};

/// Only permalinks under this prefix are sent to the metadata service.
pub const SOUNDCLOUD_PREFIX: &str = "https://soundcloud.com/";

// ─── Field update ────────────────────────────────────────────────────────────

/// What to do with one field of the target.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldUpdate<T> {
  /// Leave the existing value in place.
  #[default]
  Keep,
  /// Reset the field to absent.
  Clear,
  /// Overwrite with this value.
  Set(T),
}

impl<T> FieldUpdate<T> {
  /// Apply to an optional slot.
  pub fn apply_to(self, slot: &mut Option<T>) {
    match self {
      Self::Keep => {}
      Self::Clear => *slot = None,
      Self::Set(v) => *slot = Some(v),
    }
  }

  /// `Set` when `value` is present, `Keep` otherwise.
  pub fn set_or_keep(value: Option<T>) -> Self {
    value.map_or(Self::Keep, Self::Set)
  }

  /// `Set` when `value` is present, `Clear` otherwise.
  pub fn set_or_clear(value: Option<T>) -> Self {
    value.map_or(Self::Clear, Self::Set)
  }
}

// ─── Patch ───────────────────────────────────────────────────────────────────

/// A partial update over [`TrackDetails`]. The permalink is never patched;
/// it is the key the metadata was fetched with.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataPatch {
  pub title:        FieldUpdate<String>,
  pub artist:       FieldUpdate<String>,
  pub album:        FieldUpdate<String>,
  pub genre:        FieldUpdate<String>,
  pub release_date: FieldUpdate<NaiveDate>,
  pub publish_date: FieldUpdate<NaiveDate>,
  pub likes:        FieldUpdate<u64>,
  pub playbacks:    FieldUpdate<u64>,
  pub artwork_url:  FieldUpdate<String>,
  pub tags:         FieldUpdate<Vec<String>>,
}

impl TrackDetails {
  pub fn apply(&mut self, patch: MetadataPatch) {
    patch.title.apply_to(&mut self.title);
    patch.artist.apply_to(&mut self.artist);
    patch.album.apply_to(&mut self.album);
    patch.genre.apply_to(&mut self.genre);
    patch.release_date.apply_to(&mut self.release_date);
    patch.publish_date.apply_to(&mut self.publish_date);
    patch.likes.apply_to(&mut self.likes);
    patch.playbacks.apply_to(&mut self.playbacks);
    patch.artwork_url.apply_to(&mut self.artwork_url);
    match patch.tags {
      FieldUpdate::Keep => {}
      FieldUpdate::Clear => self.tags.clear(),
      FieldUpdate::Set(tags) => self.tags = tags,
    }
  }
}

// ─── Wire record ─────────────────────────────────────────────────────────────

/// Best-effort metadata as returned by the fetch service. Every field is
/// optional. Both the legacy scraper field names (`likes`, `publish_date`)
/// and the SoundCloud proxy names (`likes_count`, `created_at`) are accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
  pub title:          Option<String>,
  pub artist:         Option<String>,
  pub artist_name:    Option<String>,
  pub album:          Option<String>,
  pub genre:          Option<String>,
  pub artwork_url:    Option<String>,
  pub release_date:   Option<String>,
  pub publish_date:   Option<String>,
  pub created_at:     Option<String>,
  pub likes:          Option<u64>,
  pub likes_count:    Option<u64>,
  pub playbacks:      Option<u64>,
  pub playback_count: Option<u64>,
  pub tags:           Option<Vec<String>>,
}

impl MetadataRecord {
  pub fn from_slice(bytes: &[u8]) -> Result<Self> { Ok(serde_json::from_slice(bytes)?) }
}

fn non_empty(s: Option<String>) -> Option<String> {
  s.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

/// Accepts RFC 3339 timestamps and plain `yyyy-mm-dd` dates.
fn parse_date(s: &str) -> Option<NaiveDate> {
  let s = s.trim();
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Some(dt.date_naive());
  }
  NaiveDate::parse_from_str(s.get(..10).unwrap_or(s), "%Y-%m-%d").ok()
}

impl From<MetadataRecord> for MetadataPatch {
  /// Missing text and counts keep what the user typed; missing dates are
  /// blanked.
  fn from(r: MetadataRecord) -> Self {
    let publish = r.publish_date.or(r.created_at);
    Self {
      title:        FieldUpdate::set_or_keep(non_empty(r.title)),
      artist:       FieldUpdate::set_or_keep(
        non_empty(r.artist).or_else(|| non_empty(r.artist_name)),
      ),
      album:        FieldUpdate::set_or_keep(non_empty(r.album)),
      genre:        FieldUpdate::set_or_keep(non_empty(r.genre)),
      release_date: FieldUpdate::set_or_clear(r.release_date.as_deref().and_then(parse_date)),
      publish_date: FieldUpdate::set_or_clear(publish.as_deref().and_then(parse_date)),
      likes:        FieldUpdate::set_or_keep(r.likes.or(r.likes_count)),
      playbacks:    FieldUpdate::set_or_keep(r.playbacks.or(r.playback_count)),
      artwork_url:  FieldUpdate::set_or_keep(non_empty(r.artwork_url)),
      tags:         FieldUpdate::set_or_keep(r.tags),
    }
  }
}

/// Reject a permalink before any network call is made.
pub fn validate_permalink(permalink: Option<&str>) -> Result<&str> {
  let p = permalink.map(str::trim).filter(|p| !p.is_empty());
  match p {
    None => Err(Error::MissingPermalink),
    Some(p) if !p.starts_with(SOUNDCLOUD_PREFIX) => {
      Err(Error::InvalidPermalink(p.to_owned()))
    }
    Some(p) => Ok(p),
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the metadata-fetch collaborator.
pub trait MetadataSource: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Fetch best-effort metadata for a validated permalink.
  fn fetch<'a>(
    &'a self,
    permalink: &'a str,
  ) -> impl Future<Output = Result<MetadataRecord, Self::Error>> + Send + 'a;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn keep_leaves_existing_values() {
    let mut d = TrackDetails {
      title: Some("Typed".into()),
      likes: Some(7),
      ..Default::default()
    };
    d.apply(MetadataPatch::default());
    assert_eq!(d.title.as_deref(), Some("Typed"));
    assert_eq!(d.likes, Some(7));
  }

  #[test]
  fn zero_and_empty_list_are_real_values() {
    let mut d = TrackDetails {
      likes: Some(7),
      tags: vec!["old".into()],
      ..Default::default()
    };
    d.apply(MetadataPatch {
      likes: FieldUpdate::Set(0),
      tags: FieldUpdate::Set(vec![]),
      ..Default::default()
    });
    assert_eq!(d.likes, Some(0));
    assert!(d.tags.is_empty());
  }

  #[test]
  fn record_maps_missing_dates_to_clear() {
    let r: MetadataRecord =
      serde_json::from_str(r#"{"title":"Waltz","genre":""}"#).unwrap();
    let patch = MetadataPatch::from(r);
    assert_eq!(patch.title, FieldUpdate::Set("Waltz".into()));
    assert_eq!(patch.genre, FieldUpdate::Keep);
    assert_eq!(patch.release_date, FieldUpdate::Clear);
    assert_eq!(patch.tags, FieldUpdate::Keep);
  }

  #[test]
  fn record_accepts_proxy_field_names() {
    let r = MetadataRecord::from_slice(
      br#"{"artist_name":"DJ X","likes_count":12,"playback_count":300,
          "created_at":"2023-05-01T10:00:00Z"}"#,
    )
    .unwrap();
    let mut d = TrackDetails::default();
    d.apply(r.into());
    assert_eq!(d.artist.as_deref(), Some("DJ X"));
    assert_eq!(d.likes, Some(12));
    assert_eq!(d.playbacks, Some(300));
    assert_eq!(d.publish_date, NaiveDate::from_ymd_opt(2023, 5, 1));
  }

  #[test]
  fn permalink_validation() {
    assert!(matches!(validate_permalink(None), Err(Error::MissingPermalink)));
    assert!(matches!(validate_permalink(Some("  ")), Err(Error::MissingPermalink)));
    assert!(matches!(
      validate_permalink(Some("https://example.com/x")),
      Err(Error::InvalidPermalink(_))
    ));
    assert_eq!(
      validate_permalink(Some("https://soundcloud.com/a/b")).unwrap(),
      "https://soundcloud.com/a/b"
    );
  }
}
