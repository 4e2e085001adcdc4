//! The `TrackStore` trait, the storage collaborator behind the engine.
//!
//! The trait is implemented by storage backends (e.g. `setlist-store-sqlite`).
//! The view layer (`setlist-view`) depends on this abstraction, not on any
//! concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  activity::{Activity, NewActivity},
  comment::{Comment, NewComment},
  group::Group,
  rating::{Rating, Score},
  subscription::Subscription,
  track::{NewTrack, Track},
  user::{User, UserId},
};

/// A live query over the tracks of one group.
pub type TrackSubscription<E> = Subscription<Vec<Track>, E>;

/// A live query over the rating sub-collection of one track.
pub type RatingSubscription<E> = Subscription<Vec<Rating>, E>;

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a realtime document store holding users, groups, tracks
/// and their sub-collections.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes.
pub trait TrackStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Retrieve a user by id. Returns `None` if not found.
  fn get_user<'a>(
    &'a self,
    user_id: &'a UserId,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  /// Insert or fully replace a user record.
  fn put_user(
    &self,
    user: User,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  // ── Groups ────────────────────────────────────────────────────────────

  /// Create a group administered by `admin`, who becomes its sole member.
  fn create_group(
    &self,
    name: String,
    admin: UserId,
  ) -> impl Future<Output = Result<Group, Self::Error>> + Send + '_;

  /// Retrieve a group by id. Returns `None` if not found.
  fn get_group(
    &self,
    group_id: Uuid,
  ) -> impl Future<Output = Result<Option<Group>, Self::Error>> + Send + '_;

  /// Add `user_id` to the group's members. Idempotent. Returns an error if
  /// the group does not exist.
  fn join_group(
    &self,
    group_id: Uuid,
    user_id: UserId,
  ) -> impl Future<Output = Result<Group, Self::Error>> + Send + '_;

  /// All groups `user_id` belongs to, oldest first.
  fn groups_for_user<'a>(
    &'a self,
    user_id: &'a UserId,
  ) -> impl Future<Output = Result<Vec<Group>, Self::Error>> + Send + 'a;

  // ── Tracks ────────────────────────────────────────────────────────────

  /// Persist a new track. `track_id` and `added_at` are set by the store.
  fn add_track(
    &self,
    input: NewTrack,
  ) -> impl Future<Output = Result<Track, Self::Error>> + Send + '_;

  /// Retrieve a track by id as currently stored. Returns `None` if not found.
  fn get_track(
    &self,
    track_id: Uuid,
  ) -> impl Future<Output = Result<Option<Track>, Self::Error>> + Send + '_;

  /// All tracks belonging to `group_id`.
  fn list_tracks(
    &self,
    group_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Track>, Self::Error>> + Send + '_;

  /// Delete every track in `track_ids` in one atomic write, together with
  /// their ratings and comments. Returns the number of tracks removed.
  fn delete_tracks<'a>(
    &'a self,
    track_ids: &'a [Uuid],
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;

  // ── Ratings ───────────────────────────────────────────────────────────

  /// Insert or overwrite the rating for `(track_id, user_id)`.
  fn put_rating(
    &self,
    track_id: Uuid,
    user_id: UserId,
    score: Score,
  ) -> impl Future<Output = Result<Rating, Self::Error>> + Send + '_;

  fn get_rating<'a>(
    &'a self,
    track_id: Uuid,
    user_id: &'a UserId,
  ) -> impl Future<Output = Result<Option<Rating>, Self::Error>> + Send + 'a;

  fn list_ratings(
    &self,
    track_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Rating>, Self::Error>> + Send + '_;

  // ── Comments ──────────────────────────────────────────────────────────

  /// Append a comment. `comment_id` and `created_at` are set by the store.
  fn add_comment(
    &self,
    input: NewComment,
  ) -> impl Future<Output = Result<Comment, Self::Error>> + Send + '_;

  /// Comments on `track_id`, oldest first.
  fn list_comments(
    &self,
    track_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Comment>, Self::Error>> + Send + '_;

  // ── Activity ──────────────────────────────────────────────────────────

  fn record_activity(
    &self,
    input: NewActivity,
  ) -> impl Future<Output = Result<Activity, Self::Error>> + Send + '_;

  /// The `limit` most recent entries for `group_id`, newest first.
  fn list_activities(
    &self,
    group_id: Uuid,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Activity>, Self::Error>> + Send + '_;

  // ── Live queries ──────────────────────────────────────────────────────

  /// Push the full track list of `group_id` now and after every change to it.
  fn subscribe_tracks(&self, group_id: Uuid) -> TrackSubscription<Self::Error>;

  /// Push the full rating list of `track_id` now and after every change to it.
  fn subscribe_ratings(&self, track_id: Uuid) -> RatingSubscription<Self::Error>;
}
