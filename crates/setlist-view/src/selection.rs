//! Edit-mode selection over the visible rows.
//!
//! Selection only exists in edit mode, and only for tracks the acting user is
//! authorized to manage. Unauthorized requests are ignored rather than
//! reported, matching a checkbox that simply will not tick.

use std::collections::BTreeSet;

use serde::Serialize;
use setlist_core::{
  track::{RatedTrack, Track},
  user::User,
};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
  #[default]
  View,
  Edit,
}

#[derive(Debug, Clone, Default)]
pub struct Selection {
  mode:     Mode,
  selected: BTreeSet<Uuid>,
  /// The row whose detail panel is open, if any.
  expanded: Option<Uuid>,
}

impl Selection {
  pub fn mode(&self) -> Mode { self.mode }

  pub fn selected(&self) -> &BTreeSet<Uuid> { &self.selected }

  pub fn is_selected(&self, track_id: Uuid) -> bool { self.selected.contains(&track_id) }

  pub fn expanded(&self) -> Option<Uuid> { self.expanded }

  pub fn toggle_mode(&mut self) {
    match self.mode {
      Mode::View => self.enter_edit(),
      Mode::Edit => self.enter_view(),
    }
  }

  pub fn enter_edit(&mut self) {
    self.mode = Mode::Edit;
    self.expanded = None;
  }

  /// Leaving edit mode drops the selection.
  pub fn enter_view(&mut self) {
    self.mode = Mode::View;
    self.expanded = None;
    self.selected.clear();
  }

  pub fn toggle_expanded(&mut self, track_id: Uuid) {
    self.expanded = match self.expanded {
      Some(id) if id == track_id => None,
      _ => Some(track_id),
    };
  }

  /// Add `track` to the selection. Returns whether it is now selected.
  pub fn select(&mut self, actor: Option<&User>, track: &Track) -> bool {
    if self.mode != Mode::Edit || !authorized(actor, track) {
      return false;
    }
    self.selected.insert(track.track_id);
    true
  }

  /// Flip one row's checkbox. Returns whether it is now selected.
  pub fn toggle(&mut self, actor: Option<&User>, track: &Track) -> bool {
    if self.selected.remove(&track.track_id) {
      return false;
    }
    self.select(actor, track)
  }

  /// Replace the selection with every authorized row of the visible page.
  pub fn select_all(&mut self, actor: Option<&User>, visible: &[RatedTrack]) -> usize {
    if self.mode != Mode::Edit {
      return 0;
    }
    self.selected = visible
      .iter()
      .filter(|row| authorized(actor, &row.track))
      .map(RatedTrack::track_id)
      .collect();
    self.selected.len()
  }

  pub fn clear(&mut self) { self.selected.clear(); }

  /// Forget rows that no longer exist.
  pub fn retain_known(&mut self, known: &BTreeSet<Uuid>) {
    self.selected.retain(|id| known.contains(id));
    if self.expanded.is_some_and(|id| !known.contains(&id)) {
      self.expanded = None;
    }
  }

  /// The bulk-delete action is enabled only in edit mode with a non-empty
  /// selection.
  pub fn can_delete(&self) -> bool { self.mode == Mode::Edit && !self.selected.is_empty() }
}

fn authorized(actor: Option<&User>, track: &Track) -> bool {
  actor.is_some_and(|u| u.can_manage(track))
}
