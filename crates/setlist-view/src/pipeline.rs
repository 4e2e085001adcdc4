//! The derived-view pipeline: merge → filter → sort → paginate.
//!
//! Every stage is a pure function of its inputs, so the page shown for a given
//! set of tracks, aggregates and view state is always the same.

use std::{cmp::Ordering, collections::{BTreeSet, HashMap}};

use serde::Serialize;
use setlist_core::track::{RatedTrack, Track};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Aggregate ratings by track id. A missing entry and `None` both mean the
/// track has no ratings yet.
pub type AggregateMap = HashMap<Uuid, Option<f64>>;

pub const PAGE_SIZE_OPTIONS: [usize; 3] = [5, 10, 25];
pub const DEFAULT_PAGE_SIZE: usize = PAGE_SIZE_OPTIONS[0];

// ─── View state ──────────────────────────────────────────────────────────────

/// Filter criteria. An empty criterion matches everything; all present
/// criteria must hold.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterState {
  /// Exact genre match.
  pub genre:      Option<String>,
  /// Exact artist match.
  pub artist:     Option<String>,
  /// Case-insensitive substring of the title or of any tag.
  pub query:      Option<String>,
  /// Minimum aggregate rating, `0` for no minimum.
  pub min_rating: u8,
}

impl FilterState {
  pub fn is_empty(&self) -> bool { *self == Self::default() }

  pub fn matches(&self, row: &RatedTrack) -> bool {
    let details = &row.track.details;

    if let Some(genre) = non_empty(&self.genre)
      && details.genre.as_deref() != Some(genre)
    {
      return false;
    }
    if let Some(artist) = non_empty(&self.artist)
      && details.artist.as_deref() != Some(artist)
    {
      return false;
    }
    if let Some(query) = non_empty(&self.query) {
      let needle = query.to_lowercase();
      let in_title = details
        .title
        .as_deref()
        .is_some_and(|t| t.to_lowercase().contains(&needle));
      let in_tags = details
        .tags
        .iter()
        .any(|t| t.to_lowercase().contains(&needle));
      if !in_title && !in_tags {
        return false;
      }
    }
    if self.min_rating > 0 {
      return row.rating.is_some_and(|r| r >= f64::from(self.min_rating));
    }
    true
  }
}

fn non_empty(s: &Option<String>) -> Option<&str> {
  s.as_deref().filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SortKey {
  #[default]
  Title,
  Artist,
  PublishDate,
  Rating,
  Genre,
  Likes,
  Playbacks,
  Permalink,
  Tags,
  AddedBy,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SortDirection {
  #[default]
  Asc,
  Desc,
}

impl SortDirection {
  pub fn flipped(self) -> Self {
    match self {
      Self::Asc => Self::Desc,
      Self::Desc => Self::Asc,
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SortState {
  pub key:       SortKey,
  pub direction: SortDirection,
}

impl SortState {
  pub fn new(key: SortKey, direction: SortDirection) -> Self { Self { key, direction } }

  /// Requesting the active key flips its direction; any other key becomes
  /// active in ascending order.
  pub fn request(&mut self, key: SortKey) {
    if self.key == key {
      self.direction = self.direction.flipped();
    } else {
      *self = Self::new(key, SortDirection::Asc);
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageState {
  /// Zero-based.
  pub index: usize,
  pub size:  usize,
}

impl PageState {
  pub fn new(index: usize, size: usize) -> Self { Self { index, size: size.max(1) } }
}

impl Default for PageState {
  fn default() -> Self { Self::new(0, DEFAULT_PAGE_SIZE) }
}

/// One rendered page of the table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewPage {
  pub rows:       Vec<RatedTrack>,
  /// Rows surviving the filter, across all pages.
  pub total:      usize,
  pub page:       PageState,
  pub page_count: usize,
}

// ─── Stages ──────────────────────────────────────────────────────────────────

/// Attach each track's aggregate rating.
pub fn merge(tracks: &[Track], aggregates: &AggregateMap) -> Vec<RatedTrack> {
  tracks
    .iter()
    .map(|track| RatedTrack {
      rating: aggregates.get(&track.track_id).copied().flatten(),
      track:  track.clone(),
    })
    .collect()
}

pub fn filter(rows: Vec<RatedTrack>, criteria: &FilterState) -> Vec<RatedTrack> {
  if criteria.is_empty() {
    return rows;
  }
  rows.into_iter().filter(|r| criteria.matches(r)).collect()
}

/// Stable sort; ties keep their incoming order.
pub fn sort(rows: &mut [RatedTrack], state: SortState) {
  rows.sort_by(|a, b| {
    let ord = compare(a, b, state.key);
    match state.direction {
      SortDirection::Asc => ord,
      SortDirection::Desc => ord.reverse(),
    }
  });
}

/// Ascending comparison on one key. Absent values sort before present ones.
pub fn compare(a: &RatedTrack, b: &RatedTrack, key: SortKey) -> Ordering {
  let (x, y) = (&a.track.details, &b.track.details);
  match key {
    SortKey::Title => x.title.cmp(&y.title),
    SortKey::Artist => x.artist.cmp(&y.artist),
    SortKey::PublishDate => x.publish_date.cmp(&y.publish_date),
    SortKey::Rating => match (a.rating, b.rating) {
      (Some(p), Some(q)) => p.total_cmp(&q),
      (p, q) => p.is_some().cmp(&q.is_some()),
    },
    SortKey::Genre => x.genre.cmp(&y.genre),
    SortKey::Likes => x.likes.cmp(&y.likes),
    SortKey::Playbacks => x.playbacks.cmp(&y.playbacks),
    SortKey::Permalink => x.permalink.cmp(&y.permalink),
    SortKey::Tags => x.tags.cmp(&y.tags),
    SortKey::AddedBy => a.track.added_by_name.cmp(&b.track.added_by_name),
  }
}

/// The window `[index * size, (index + 1) * size)`, empty past the end.
pub fn paginate(rows: &[RatedTrack], page: PageState) -> &[RatedTrack] {
  let start = page.index.saturating_mul(page.size);
  if start >= rows.len() {
    return &[];
  }
  let end = start.saturating_add(page.size).min(rows.len());
  &rows[start..end]
}

pub fn page_count(total: usize, size: usize) -> usize { total.div_ceil(size.max(1)) }

/// Run the full pipeline.
pub fn derive(
  tracks: &[Track],
  aggregates: &AggregateMap,
  criteria: &FilterState,
  order: SortState,
  page: PageState,
) -> ViewPage {
  let mut rows = filter(merge(tracks, aggregates), criteria);
  sort(&mut rows, order);
  ViewPage {
    rows: paginate(&rows, page).to_vec(),
    total: rows.len(),
    page,
    page_count: page_count(rows.len(), page.size),
  }
}

// ─── Facets ──────────────────────────────────────────────────────────────────

/// The distinct values offered by the genre and artist filter pickers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Facets {
  pub genres:  BTreeSet<String>,
  pub artists: BTreeSet<String>,
}

pub fn facets(tracks: &[Track]) -> Facets {
  let mut out = Facets::default();
  for track in tracks {
    if let Some(g) = non_empty(&track.details.genre) {
      out.genres.insert(g.to_owned());
    }
    if let Some(a) = non_empty(&track.details.artist) {
      out.artists.insert(a.to_owned());
    }
  }
  out
}

#[cfg(test)]
mod tests {
  use chrono::{NaiveDate, Utc};
  use setlist_core::{track::TrackDetails, user::UserId};

  use super::*;

  fn track(title: &str, tags: &[&str]) -> Track {
    Track {
      track_id:      Uuid::new_v4(),
      group_id:      Uuid::nil(),
      details:       TrackDetails {
        title: Some(title.into()),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        ..Default::default()
      },
      added_by_id:   UserId::new("u1"),
      added_by_name: "Ann".into(),
      added_at:      Utc::now(),
    }
  }

  fn rated(t: Track, rating: Option<f64>) -> RatedTrack { RatedTrack { track: t, rating } }

  fn titles(rows: &[RatedTrack]) -> Vec<&str> {
    rows.iter().map(|r| r.track.display_title()).collect()
  }

  #[test]
  fn query_and_min_rating_combine() {
    let sonata = track("Piano Sonata", &[]);
    let waltz = track("Waltz", &["piano-only"]);
    let aggregates = AggregateMap::from([
      (sonata.track_id, Some(3.5)),
      (waltz.track_id, Some(4.2)),
    ]);
    let criteria = FilterState {
      query: Some("piano".into()),
      min_rating: 4,
      ..Default::default()
    };

    let page = derive(
      &[sonata, waltz],
      &aggregates,
      &criteria,
      SortState::default(),
      PageState::default(),
    );
    assert_eq!(titles(&page.rows), ["Waltz"]);
    assert_eq!(page.total, 1);
  }

  #[test]
  fn min_rating_excludes_unrated() {
    let row = rated(track("Quiet", &[]), None);
    let criteria = FilterState { min_rating: 1, ..Default::default() };
    assert!(!criteria.matches(&row));
  }

  #[test]
  fn query_is_case_insensitive() {
    let row = rated(track("Nocturne", &["Chopin"]), None);
    let criteria = FilterState { query: Some("chop".into()), ..Default::default() };
    assert!(criteria.matches(&row));
  }

  #[test]
  fn filters_are_a_conjunction() {
    let mut a = track("One", &["x"]);
    a.details.genre = Some("Jazz".into());
    a.details.artist = Some("Mo".into());
    let mut b = track("Two", &["x"]);
    b.details.genre = Some("Jazz".into());
    b.details.artist = Some("Lu".into());
    let mut c = track("Three", &[]);
    c.details.genre = Some("Rock".into());
    c.details.artist = Some("Mo".into());
    let rows: Vec<_> = [a, b, c].into_iter().map(|t| rated(t, Some(3.0))).collect();

    let genre = FilterState { genre: Some("Jazz".into()), ..Default::default() };
    let artist = FilterState { artist: Some("Mo".into()), ..Default::default() };
    let both = FilterState {
      genre: Some("Jazz".into()),
      artist: Some("Mo".into()),
      ..Default::default()
    };

    let combined = filter(rows.clone(), &both);
    for row in &combined {
      assert!(filter(rows.clone(), &genre).contains(row));
      assert!(filter(rows.clone(), &artist).contains(row));
    }
    assert_eq!(titles(&combined), ["One"]);
  }

  #[test]
  fn empty_filter_keeps_everything() {
    let rows = vec![rated(track("A", &[]), None), rated(track("B", &[]), Some(1.0))];
    assert_eq!(filter(rows.clone(), &FilterState::default()), rows);
  }

  #[test]
  fn absent_values_sort_first_ascending() {
    let mut rows = vec![
      rated(track("Rated", &[]), Some(2.0)),
      rated(track("Unrated", &[]), None),
      rated(track("Top", &[]), Some(5.0)),
    ];
    sort(&mut rows, SortState::new(SortKey::Rating, SortDirection::Asc));
    assert_eq!(titles(&rows), ["Unrated", "Rated", "Top"]);

    sort(&mut rows, SortState::new(SortKey::Rating, SortDirection::Desc));
    assert_eq!(titles(&rows), ["Top", "Rated", "Unrated"]);
  }

  #[test]
  fn sorting_is_idempotent() {
    let mut rows: Vec<_> = ["b", "c", "a", "b"]
      .iter()
      .map(|t| {
        let mut tr = track(t, &[]);
        tr.details.publish_date = NaiveDate::from_ymd_opt(2020, 1, 1);
        rated(tr, None)
      })
      .collect();
    let order = SortState::new(SortKey::Title, SortDirection::Desc);
    sort(&mut rows, order);
    let once = rows.clone();
    sort(&mut rows, order);
    assert_eq!(rows, once);
  }

  #[test]
  fn requesting_sort_toggles_direction() {
    let mut state = SortState::default();
    assert_eq!(state, SortState::new(SortKey::Title, SortDirection::Asc));
    state.request(SortKey::Title);
    assert_eq!(state.direction, SortDirection::Desc);
    state.request(SortKey::Likes);
    assert_eq!(state, SortState::new(SortKey::Likes, SortDirection::Asc));
  }

  #[test]
  fn pagination_windows_and_overflow() {
    let rows: Vec<_> = (0..12).map(|i| rated(track(&format!("t{i:02}"), &[]), None)).collect();
    assert_eq!(paginate(&rows, PageState::new(0, 5)).len(), 5);
    assert_eq!(paginate(&rows, PageState::new(2, 5)).len(), 2);
    assert!(paginate(&rows, PageState::new(3, 5)).is_empty());
    assert_eq!(page_count(12, 5), 3);
    assert_eq!(page_count(0, 5), 0);
  }

  #[test]
  fn sort_key_round_trips_through_strings() {
    assert_eq!("publish_date".parse::<SortKey>().unwrap(), SortKey::PublishDate);
    assert_eq!(SortKey::AddedBy.to_string(), "added_by");
  }

  #[test]
  fn facets_are_distinct() {
    let mut a = track("A", &[]);
    a.details.genre = Some("Jazz".into());
    let mut b = track("B", &[]);
    b.details.genre = Some("Jazz".into());
    b.details.artist = Some("Mo".into());
    let f = facets(&[a, b]);
    assert_eq!(f.genres.len(), 1);
    assert_eq!(f.artists.len(), 1);
  }
}
