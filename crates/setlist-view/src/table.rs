//! The track table: live state plus the derived view.

use std::{collections::BTreeSet, sync::Arc};

use setlist_core::{
  comment::Comment,
  metadata::MetadataSource,
  rating::Score,
  session::Session,
  store::TrackStore,
  track::{Track, TrackDetails},
  user::User,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
  Dispatcher, Error, Notice, Result,
  aggregate::{AggregateChange, AggregateSet},
  dispatch::{CommentThread, RateOutcome},
  feed::{Inbound, Inbox, Link, forward},
  pipeline::{self, AggregateMap, Facets, FilterState, PageState, SortKey, SortState, ViewPage},
  selection::Selection,
};

/// What one call to [`TrackTable::next_update`] changed.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
  /// A new track snapshot replaced the list.
  Tracks { count: usize },
  /// One track's aggregate rating was recomputed.
  Aggregate { track_id: Uuid, rating: Option<f64> },
  /// The track feed ended with an error. It is not retried.
  FeedFailed(String),
  AggregateFailed { track_id: Uuid, message: String },
  /// A delivery from a superseded subscription, ignored.
  Stale,
}

#[derive(Debug)]
struct Feed {
  epoch: u64,
  seq:   Option<u64>,
  _link: Link,
}

/// Outcome of a bulk delete request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
  Deleted(usize),
  Cancelled,
}

pub struct TrackTable<S> {
  dispatch:   Dispatcher<S>,
  inbox:      Inbox,
  inbound:    mpsc::UnboundedReceiver<Inbound>,
  feed:       Option<Feed>,
  next_epoch: u64,
  tracks:     Vec<Track>,
  aggregates: AggregateSet,
  filter:     FilterState,
  sort:       SortState,
  page:       PageState,
  selection:  Selection,
  loading:    bool,
  feed_error: Option<String>,
  notice:     Option<Notice>,
}

impl<S: TrackStore> TrackTable<S> {
  /// Open the table on the session's scope. Must be called inside a Tokio
  /// runtime.
  pub fn open(store: Arc<S>, session: Session) -> Self {
    let (inbox, inbound) = mpsc::unbounded_channel();
    let mut table = Self {
      dispatch: Dispatcher::new(store, session),
      inbox,
      inbound,
      feed: None,
      next_epoch: 0,
      tracks: Vec::new(),
      aggregates: AggregateSet::default(),
      filter: FilterState::default(),
      sort: SortState::default(),
      page: PageState::default(),
      selection: Selection::default(),
      loading: true,
      feed_error: None,
      notice: None,
    };
    table.subscribe();
    table
  }

  // ── Live state ────────────────────────────────────────────────────────

  /// Drop every live query and open a fresh track feed for the current
  /// scope. Deliveries still in flight from the old feed become stale.
  fn subscribe(&mut self) {
    self.feed = None;
    self.aggregates.clear();
    self.tracks.clear();
    self.selection.enter_view();
    self.page.index = 0;
    self.loading = true;
    self.feed_error = None;

    let scope = self.dispatch.session().scope();
    let epoch = self.next_epoch;
    self.next_epoch += 1;
    let sub = self.dispatch.store().subscribe_tracks(scope.group_id());
    let link = forward(sub, self.inbox.clone(), move |delivery| Inbound::Tracks {
      epoch,
      delivery,
    });
    self.feed = Some(Feed { epoch, seq: None, _link: link });
    debug!(group_id = %scope.group_id(), demo = scope.is_demo(), epoch, "track feed opened");
  }

  /// Wait for the next delivery from any live query and apply it.
  pub async fn next_update(&mut self) -> Option<Update> {
    let msg = self.inbound.recv().await?;
    Some(self.apply(msg))
  }

  pub fn apply(&mut self, msg: Inbound) -> Update {
    match msg {
      Inbound::Tracks { epoch, delivery } => {
        let Some(feed) = self.feed.as_mut().filter(|f| f.epoch == epoch) else {
          debug!(epoch, "stale track delivery dropped");
          return Update::Stale;
        };
        let snapshot = match delivery {
          Ok(s) => s,
          Err(e) => {
            warn!(error = %e, "track feed failed");
            self.loading = false;
            self.feed_error = Some(e.to_string());
            return Update::FeedFailed(e.to_string());
          }
        };
        if feed.seq.is_some_and(|s| snapshot.seq <= s) {
          return Update::Stale;
        }
        feed.seq = Some(snapshot.seq);

        self.tracks = snapshot.data;
        self.loading = false;
        let ids: Vec<Uuid> = self.tracks.iter().map(|t| t.track_id).collect();
        self
          .aggregates
          .sync(self.dispatch.store().as_ref(), &self.inbox, &ids);
        self.selection.retain_known(&ids.iter().copied().collect::<BTreeSet<_>>());
        Update::Tracks { count: self.tracks.len() }
      }
      Inbound::Ratings { track_id, epoch, delivery } => {
        match self.aggregates.apply(track_id, epoch, delivery) {
          AggregateChange::Updated(rating) => Update::Aggregate { track_id, rating },
          AggregateChange::Failed(message) => Update::AggregateFailed { track_id, message },
          AggregateChange::Stale => Update::Stale,
        }
      }
    }
  }

  /// True until the first snapshot of the current feed has arrived.
  pub fn is_loading(&self) -> bool { self.loading }

  /// The feed and every rating query have reported at least once.
  pub fn is_settled(&self) -> bool { !self.loading && self.aggregates.is_settled() }

  pub fn feed_error(&self) -> Option<&str> { self.feed_error.as_deref() }

  pub fn tracks(&self) -> &[Track] { &self.tracks }

  pub fn aggregates(&self) -> &AggregateSet { &self.aggregates }

  // ── Session ───────────────────────────────────────────────────────────

  pub fn session(&self) -> &Session { self.dispatch.session() }

  pub fn dispatcher(&self) -> &Dispatcher<S> { &self.dispatch }

  pub fn set_active_group(&mut self, group_id: Option<Uuid>) {
    if self.session().active_group() == group_id {
      return;
    }
    self.dispatch.session_mut().set_active_group(group_id);
    info!(?group_id, "active group changed");
    self.subscribe();
  }

  pub fn sign_in(&mut self, user: User, group_id: Option<Uuid>) {
    *self.dispatch.session_mut() = Session::signed_in(user).with_group(group_id);
    self.subscribe();
  }

  pub fn sign_out(&mut self) {
    self.dispatch.session_mut().sign_out();
    self.subscribe();
  }

  // ── View state ────────────────────────────────────────────────────────

  /// Ratings as displayed: the live aggregates, overlaid in the demo scope
  /// with this client's local ratings.
  pub fn effective_aggregates(&self) -> AggregateMap {
    let mut out = self.aggregates.values().clone();
    if self.session().scope().is_demo() {
      for (track_id, score) in self.dispatch.local_ratings().iter() {
        out.insert(track_id, Some(f64::from(score.get())));
      }
    }
    out
  }

  pub fn view(&self) -> ViewPage {
    pipeline::derive(
      &self.tracks,
      &self.effective_aggregates(),
      &self.filter,
      self.sort,
      self.page,
    )
  }

  pub fn facets(&self) -> Facets { pipeline::facets(&self.tracks) }

  pub fn filter(&self) -> &FilterState { &self.filter }

  pub fn set_filter(&mut self, filter: FilterState) {
    self.filter = filter;
    self.page.index = 0;
  }

  pub fn sort(&self) -> SortState { self.sort }

  pub fn set_sort(&mut self, sort: SortState) {
    self.sort = sort;
    self.page.index = 0;
  }

  pub fn request_sort(&mut self, key: SortKey) {
    self.sort.request(key);
    self.page.index = 0;
  }

  pub fn page(&self) -> PageState { self.page }

  pub fn set_page(&mut self, index: usize) { self.page.index = index; }

  pub fn set_page_size(&mut self, size: usize) { self.page = PageState::new(0, size); }

  // ── Selection ─────────────────────────────────────────────────────────

  pub fn selection(&self) -> &Selection { &self.selection }

  pub fn toggle_mode(&mut self) { self.selection.toggle_mode(); }

  pub fn toggle_expanded(&mut self, track_id: Uuid) { self.selection.toggle_expanded(track_id); }

  /// Flip one row's checkbox. Unknown or unauthorized rows are ignored.
  pub fn toggle_select(&mut self, track_id: Uuid) -> bool {
    let Some(track) = self.tracks.iter().find(|t| t.track_id == track_id) else {
      return false;
    };
    self.selection.toggle(self.dispatch.session().user(), track)
  }

  /// Select every authorized row of the visible page.
  pub fn select_all_visible(&mut self) -> usize {
    let page = self.view();
    self.selection.select_all(self.dispatch.session().user(), &page.rows)
  }

  /// Delete the selection after `confirm` approves the tracks about to go.
  /// On success the table returns to view mode.
  pub async fn delete_selected<F>(&mut self, confirm: F) -> Result<DeleteOutcome>
  where
    F: FnOnce(&[&Track]) -> bool,
  {
    if !self.selection.can_delete() {
      return self.surface(Err(Error::Validation("Select at least one track.".to_owned())));
    }
    let ids: Vec<Uuid> = self.selection.selected().iter().copied().collect();
    let doomed: Vec<&Track> = self
      .tracks
      .iter()
      .filter(|t| self.selection.is_selected(t.track_id))
      .collect();
    if !confirm(&doomed) {
      return Ok(DeleteOutcome::Cancelled);
    }

    let result = self.dispatch.delete_tracks(&ids).await;
    let removed = self.surface(result)?;
    self.selection.enter_view();
    Ok(DeleteOutcome::Deleted(removed))
  }

  // ── Mutations ─────────────────────────────────────────────────────────

  pub async fn create_track(&mut self, draft: &mut TrackDetails) -> Result<Track> {
    let result = self.dispatch.create_track(draft).await;
    self.surface(result)
  }

  pub async fn autofill<M: MetadataSource>(
    &mut self,
    source: &M,
    draft: &mut TrackDetails,
  ) -> Result<()> {
    let result = self.dispatch.autofill(source, draft).await;
    self.surface(result)
  }

  pub async fn rate(&mut self, track_id: Uuid, score: Score) -> Result<RateOutcome> {
    let result = self.dispatch.rate(track_id, score).await;
    self.surface(result)
  }

  pub async fn comment(&mut self, thread: &mut CommentThread, text: &str) -> Result<Comment> {
    let result = self.dispatch.comment(thread, text).await;
    self.surface(result)
  }

  // ── Notice ────────────────────────────────────────────────────────────

  pub fn notice(&self) -> Option<&Notice> { self.notice.as_ref() }

  fn surface<T>(&mut self, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
      if e.is_hint() {
        debug!(error = %e, "action blocked");
      } else {
        error!(error = %e, "action failed");
      }
      self.notice = Some(Notice::from(e));
    }
    result
  }
}
