//! Mutation entry points.
//!
//! Every write goes through the [`Dispatcher`], which checks the session and
//! authorization before touching the store. Authorization is always decided
//! against records re-read from the store, never against the caller's copy.

use std::{collections::HashMap, sync::Arc};

use chrono::Utc;
use setlist_core::{
  activity::{Activity, ActivityKind, NewActivity},
  comment::{Comment, NewComment},
  metadata::{MetadataPatch, MetadataSource, validate_permalink},
  rating::Score,
  session::{Scope, Session},
  store::TrackStore,
  track::{NewTrack, Track, TrackDetails},
  user::User,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{Error, Result};

const DELETE_FORBIDDEN: &str =
  "You can only delete tracks you added, unless you are an admin.";

// ─── Local ratings ───────────────────────────────────────────────────────────

/// Ratings given while no group is active. Kept on this client only.
#[derive(Debug, Clone, Default)]
pub struct LocalRatings(HashMap<Uuid, Score>);

impl LocalRatings {
  pub fn get(&self, track_id: Uuid) -> Option<Score> { self.0.get(&track_id).copied() }

  pub fn set(&mut self, track_id: Uuid, score: Score) { self.0.insert(track_id, score); }

  pub fn iter(&self) -> impl Iterator<Item = (Uuid, Score)> + '_ {
    self.0.iter().map(|(id, s)| (*id, *s))
  }
}

/// Where a rating ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateOutcome {
  Stored,
  Local,
}

// ─── Comment thread ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadEntry {
  pub comment: Comment,
  /// Shown optimistically; not yet confirmed by the store.
  pub pending: bool,
}

/// The comments of one track as shown in its detail panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentThread {
  pub track_id: Uuid,
  entries:      Vec<ThreadEntry>,
}

impl CommentThread {
  pub fn new(track_id: Uuid, comments: Vec<Comment>) -> Self {
    let entries = comments
      .into_iter()
      .map(|comment| ThreadEntry { comment, pending: false })
      .collect();
    Self { track_id, entries }
  }

  pub fn entries(&self) -> &[ThreadEntry] { &self.entries }

  pub fn len(&self) -> usize { self.entries.len() }

  pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

// ─── Dispatcher ──────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Dispatcher<S> {
  store:   Arc<S>,
  session: Session,
  local:   LocalRatings,
}

impl<S: TrackStore> Dispatcher<S> {
  pub fn new(store: Arc<S>, session: Session) -> Self {
    Self { store, session, local: LocalRatings::default() }
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  pub fn session(&self) -> &Session { &self.session }

  pub(crate) fn session_mut(&mut self) -> &mut Session { &mut self.session }

  pub fn local_ratings(&self) -> &LocalRatings { &self.local }

  pub(crate) fn actor(&self) -> Result<&User> { self.session.user().ok_or(Error::NotSignedIn) }

  /// The group writes go to. The demo scope is read-only.
  fn writable_group(&self) -> Result<(&User, Uuid)> {
    let actor = self.actor()?;
    match self.session.scope() {
      Scope::Group(id) => Ok((actor, id)),
      Scope::Demo => Err(Error::NoActiveGroup),
    }
  }

  // ── Tracks ────────────────────────────────────────────────────────────

  /// Submit the add-track form. The draft is cleared only on success.
  pub async fn create_track(&self, draft: &mut TrackDetails) -> Result<Track> {
    let (actor, group_id) = self.writable_group()?;
    let input = NewTrack::from_details(group_id, draft.clone(), actor);
    let track = self.store.add_track(input).await.map_err(Error::store)?;
    info!(track_id = %track.track_id, %group_id, "track added");
    draft.reset();

    self
      .log(
        NewActivity::new(
          group_id,
          ActivityKind::TrackAdded,
          actor.user_id.clone(),
          &actor.display_name,
        )
        .with_track(track.track_id, track.details.title.clone()),
      )
      .await;
    Ok(track)
  }

  /// Fill the draft from the metadata service. The permalink is validated
  /// before any request is made; the draft is untouched on failure.
  pub async fn autofill<M: MetadataSource>(
    &self,
    source: &M,
    draft: &mut TrackDetails,
  ) -> Result<()> {
    let permalink = validate_permalink(draft.permalink.as_deref())?.to_owned();
    let record = source
      .fetch(&permalink)
      .await
      .map_err(|e| Error::Metadata(Box::new(e)))?;
    debug!(%permalink, "metadata fetched");
    draft.permalink = Some(permalink);
    draft.apply(MetadataPatch::from(record));
    Ok(())
  }

  /// Delete `track_ids` in one write. Every target is re-read first; if any
  /// is missing or not manageable by the actor, nothing is deleted.
  pub async fn delete_tracks(&self, track_ids: &[Uuid]) -> Result<usize> {
    let actor = self.actor()?;
    if track_ids.is_empty() {
      return Ok(0);
    }

    let mut current = Vec::with_capacity(track_ids.len());
    for &track_id in track_ids {
      let track = self
        .store
        .get_track(track_id)
        .await
        .map_err(Error::store)?
        .ok_or(Error::TrackNotFound(track_id))?;
      current.push(track);
    }

    if let Some(denied) = current.iter().find(|t| !actor.can_manage(t)) {
      warn!(
        track_id = %denied.track_id,
        user_id = %actor.user_id,
        "bulk delete refused"
      );
      return Err(Error::Forbidden(DELETE_FORBIDDEN.to_owned()));
    }

    let removed = self.store.delete_tracks(track_ids).await.map_err(Error::store)?;
    info!(removed, "tracks deleted");

    for track in &current {
      self
        .log(
          NewActivity::new(
            track.group_id,
            ActivityKind::TrackDeleted,
            actor.user_id.clone(),
            &actor.display_name,
          )
          .with_track(track.track_id, track.details.title.clone()),
        )
        .await;
    }
    Ok(removed)
  }

  // ── Ratings ───────────────────────────────────────────────────────────

  /// Rate a track. Inside a group the rating is upserted for the signed-in
  /// user; in the demo scope it is kept locally.
  pub async fn rate(&mut self, track_id: Uuid, score: Score) -> Result<RateOutcome> {
    if self.session.scope().is_demo() {
      self.local.set(track_id, score);
      debug!(%track_id, %score, "rating kept locally");
      return Ok(RateOutcome::Local);
    }
    let actor = self.actor()?;

    self
      .store
      .put_rating(track_id, actor.user_id.clone(), score)
      .await
      .map_err(Error::store)?;
    info!(%track_id, %score, "rating stored");

    match self.store.get_track(track_id).await {
      Ok(Some(track)) => {
        self
          .log(
            NewActivity::new(
              track.group_id,
              ActivityKind::TrackRated,
              actor.user_id.clone(),
              &actor.display_name,
            )
            .with_track(track_id, track.details.title)
            .with_score(score),
          )
          .await;
      }
      Ok(None) => {}
      Err(e) => warn!(%track_id, error = %e, "could not load track for activity"),
    }
    Ok(RateOutcome::Stored)
  }

  /// The acting user's own rating of a track, if any.
  pub async fn my_rating(&self, track_id: Uuid) -> Result<Option<Score>> {
    match self.writable_group() {
      Ok((actor, _)) => Ok(
        self
          .store
          .get_rating(track_id, &actor.user_id)
          .await
          .map_err(Error::store)?
          .map(|r| r.score),
      ),
      Err(_) => Ok(self.local.get(track_id)),
    }
  }

  // ── Comments ──────────────────────────────────────────────────────────

  pub async fn load_comments(&self, track_id: Uuid) -> Result<CommentThread> {
    let comments = self.store.list_comments(track_id).await.map_err(Error::store)?;
    Ok(CommentThread::new(track_id, comments))
  }

  /// Append a comment. It shows in `thread` immediately and is rolled back
  /// if the store rejects it.
  pub async fn comment(&self, thread: &mut CommentThread, text: &str) -> Result<Comment> {
    let (actor, _) = self.writable_group()?;
    let text = text.trim();
    if text.is_empty() {
      return Err(Error::Validation("Comment cannot be empty.".to_owned()));
    }

    let input = NewComment {
      track_id:    thread.track_id,
      author_id:   actor.user_id.clone(),
      author_name: actor.display_name.clone(),
      text:        text.to_owned(),
    };
    let provisional = input.clone().into_comment(Uuid::new_v4(), Utc::now());
    let provisional_id = provisional.comment_id;
    thread.entries.push(ThreadEntry { comment: provisional, pending: true });

    let stored = match self.store.add_comment(input).await {
      Ok(c) => c,
      Err(e) => {
        thread.entries.retain(|entry| entry.comment.comment_id != provisional_id);
        warn!(track_id = %thread.track_id, error = %e, "comment rolled back");
        return Err(Error::store(e));
      }
    };
    if let Some(entry) = thread
      .entries
      .iter_mut()
      .find(|entry| entry.comment.comment_id == provisional_id)
    {
      *entry = ThreadEntry { comment: stored.clone(), pending: false };
    }

    match self.store.get_track(thread.track_id).await {
      Ok(Some(track)) => {
        self
          .log(
            NewActivity::new(
              track.group_id,
              ActivityKind::CommentAdded,
              actor.user_id.clone(),
              &actor.display_name,
            )
            .with_track(track.track_id, track.details.title)
            .with_comment(text),
          )
          .await;
      }
      Ok(None) => {}
      Err(e) => warn!(error = %e, "could not load track for activity"),
    }
    Ok(stored)
  }

  // ── Activity ──────────────────────────────────────────────────────────

  /// Most recent activity in the active group, newest first.
  pub async fn recent_activity(&self, limit: usize) -> Result<Vec<Activity>> {
    let (_, group_id) = self.writable_group()?;
    self
      .store
      .list_activities(group_id, limit)
      .await
      .map_err(Error::store)
  }

  /// Activity is a side record; failing to write it never fails the action.
  pub(crate) async fn log(&self, activity: NewActivity) {
    let kind = activity.kind;
    if let Err(e) = self.store.record_activity(activity).await {
      warn!(%kind, error = %e, "failed to record activity");
    }
  }
}
