//! Plain-text rendering of the table and its side panels.

use std::fmt::Write as _;

use setlist_core::{activity::Activity, group::Group, track::RatedTrack};
use setlist_view::{
  Notice, Severity,
  dispatch::CommentThread,
  display::{format_rating, stars},
  pipeline::{Facets, SortDirection, SortState, ViewPage},
  selection::{Mode, Selection},
};

const TITLE_W: usize = 28;
const ARTIST_W: usize = 18;
const GENRE_W: usize = 12;

/// Truncate to `width` characters, marking the cut.
fn fit(s: &str, width: usize) -> String {
  if s.chars().count() <= width {
    return s.to_owned();
  }
  let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
  out.push('…');
  out
}

fn rating_cell(row: &RatedTrack) -> String {
  match row.rating {
    Some(r) => format!("{} {}", stars(r), format_rating(Some(r))),
    None => format_rating(None),
  }
}

fn count_cell(n: Option<u64>) -> String { n.map(|n| n.to_string()).unwrap_or_default() }

pub fn page(view: &ViewPage, order: SortState, selection: Option<&Selection>) -> String {
  let mut out = String::new();
  let arrow = match order.direction {
    SortDirection::Asc => "↑",
    SortDirection::Desc => "↓",
  };
  let editing = selection.is_some_and(|s| s.mode() == Mode::Edit);

  let _ = writeln!(
    out,
    "{}{:<8}  {:<TITLE_W$}  {:<ARTIST_W$}  {:<GENRE_W$}  {:<16}  {:>7}  {:>8}  {}",
    if editing { "    " } else { "" },
    "id",
    "title",
    "artist",
    "genre",
    "rating",
    "likes",
    "plays",
    "added by",
  );
  for row in &view.rows {
    let t = &row.track;
    let d = &t.details;
    let mark = match selection {
      Some(s) if editing => {
        if s.is_selected(t.track_id) { "[x] " } else { "[ ] " }
      }
      _ => "",
    };
    let id = t.track_id.to_string();
    let _ = writeln!(
      out,
      "{mark}{:<8}  {:<TITLE_W$}  {:<ARTIST_W$}  {:<GENRE_W$}  {:<16}  {:>7}  {:>8}  {}",
      &id[..8],
      fit(t.display_title(), TITLE_W),
      fit(d.artist.as_deref().unwrap_or(""), ARTIST_W),
      fit(d.genre.as_deref().unwrap_or(""), GENRE_W),
      rating_cell(row),
      count_cell(d.likes),
      count_cell(d.playbacks),
      t.added_by_name,
    );
  }
  if view.rows.is_empty() {
    out.push_str("(no tracks)\n");
  }
  let _ = writeln!(
    out,
    "page {}/{}  ·  {} track(s)  ·  sorted by {} {arrow}",
    if view.page_count == 0 { 0 } else { view.page.index + 1 },
    view.page_count,
    view.total,
    order.key,
  );
  out
}

pub fn facets(f: &Facets) -> String {
  let join = |set: &std::collections::BTreeSet<String>| {
    set.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
  };
  format!("genres: {}\nartists: {}\n", join(&f.genres), join(&f.artists))
}

pub fn comments(thread: &CommentThread) -> String {
  if thread.is_empty() {
    return "(no comments)\n".to_owned();
  }
  let mut out = String::new();
  for entry in thread.entries() {
    let c = &entry.comment;
    let _ = writeln!(
      out,
      "{}  {}: {}",
      c.created_at.format("%Y-%m-%d %H:%M"),
      c.author_name,
      c.text
    );
  }
  out
}

pub fn activity(entries: &[Activity]) -> String {
  if entries.is_empty() {
    return "(no activity)\n".to_owned();
  }
  let mut out = String::new();
  for a in entries {
    let _ = writeln!(out, "{}  {}", a.recorded_at.format("%Y-%m-%d %H:%M"), a.summary());
  }
  out
}

pub fn groups(groups: &[Group], active: Option<uuid::Uuid>) -> String {
  if groups.is_empty() {
    return "(no groups)\n".to_owned();
  }
  let mut out = String::new();
  for g in groups {
    let marker = if Some(g.group_id) == active { "*" } else { " " };
    let _ = writeln!(out, "{marker} {}  {} ({} members)", g.group_id, g.name, g.members.len());
  }
  out
}

pub fn notice(n: &Notice) -> String {
  let tag = match n.severity {
    Severity::Error => "error",
    Severity::Hint => "hint",
  };
  format!("{tag}: {}: {}", n.title, n.message)
}
