//! End-to-end tests of the table engine against an in-memory store.

use std::{
  future::Future,
  sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
  },
  time::Duration,
};

use chrono::NaiveDate;
use setlist_core::{
  activity::{ActivityKind, DEFAULT_ACTIVITY_LIMIT},
  metadata::{MetadataRecord, MetadataSource},
  rating::Score,
  session::{DEMO_GROUP_ID, Session},
  store::TrackStore,
  subscription::Snapshot,
  track::{NewTrack, Track, TrackDetails},
  user::{Principal, Role, User, UserId},
};
use setlist_store_sqlite::SqliteStore;
use uuid::Uuid;

use crate::{
  Dispatcher, Error, Severity, TrackTable, Update,
  account::sign_in,
  dispatch::{CommentThread, RateOutcome},
  display::format_rating,
  feed::Inbound,
  pipeline::FilterState,
  selection::Mode,
  table::DeleteOutcome,
};

async fn store() -> Arc<SqliteStore> {
  Arc::new(SqliteStore::open_in_memory().await.expect("in-memory store"))
}

fn user(id: &str, role: Role) -> User {
  User {
    user_id: UserId::new(id),
    display_name: id.to_uppercase(),
    email: format!("{id}@example.com"),
    role,
  }
}

fn score(n: i64) -> Score { Score::new(n).unwrap() }

async fn add(store: &SqliteStore, group_id: Uuid, owner: &User, title: &str) -> Track {
  let details = TrackDetails { title: Some(title.into()), ..Default::default() };
  store
    .add_track(NewTrack::from_details(group_id, details, owner))
    .await
    .unwrap()
}

/// A group administered by `admin` that `others` have joined.
async fn group_with(store: &SqliteStore, admin: &User, others: &[&User]) -> Uuid {
  let group = store
    .create_group("Band".into(), admin.user_id.clone())
    .await
    .unwrap();
  for u in others {
    store.join_group(group.group_id, u.user_id.clone()).await.unwrap();
  }
  group.group_id
}

/// Pump live updates until `done` holds.
async fn settle<S, F>(table: &mut TrackTable<S>, done: F)
where
  S: TrackStore,
  F: Fn(&TrackTable<S>) -> bool,
{
  tokio::time::timeout(Duration::from_secs(5), async {
    while !done(table) {
      table.next_update().await.expect("inbox open");
    }
  })
  .await
  .expect("table settled in time");
}

// ─── Aggregates ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn aggregate_follows_rating_upserts() {
  let store = store().await;
  let (u1, u2) = (user("u1", Role::User), user("u2", Role::User));
  let group = group_with(&store, &u1, &[&u2]).await;
  let track = add(&store, group, &u1, "Song").await;

  let mut table = TrackTable::open(store.clone(), Session::signed_in(u1.clone()).with_group(Some(group)));
  assert!(table.is_loading());
  settle(&mut table, |t| t.tracks().len() == 1).await;
  assert!(!table.is_loading());
  assert_eq!(format_rating(table.view().rows[0].rating), "No ratings");

  store.put_rating(track.track_id, u1.user_id.clone(), score(5)).await.unwrap();
  store.put_rating(track.track_id, u2.user_id.clone(), score(3)).await.unwrap();
  settle(&mut table, |t| t.aggregates().get(track.track_id) == Some(4.0)).await;
  assert_eq!(format_rating(table.view().rows[0].rating), "4.0");

  store.put_rating(track.track_id, u1.user_id.clone(), score(1)).await.unwrap();
  settle(&mut table, |t| t.aggregates().get(track.track_id) == Some(2.0)).await;
  assert_eq!(store.list_ratings(track.track_id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn removed_tracks_lose_their_rating_query() {
  let store = store().await;
  let u1 = user("u1", Role::User);
  let group = group_with(&store, &u1, &[]).await;
  let a = add(&store, group, &u1, "A").await;
  add(&store, group, &u1, "B").await;

  let mut table = TrackTable::open(store.clone(), Session::signed_in(u1).with_group(Some(group)));
  settle(&mut table, |t| t.aggregates().watching() == 2).await;

  store.delete_tracks(&[a.track_id]).await.unwrap();
  settle(&mut table, |t| t.tracks().len() == 1).await;
  assert_eq!(table.aggregates().watching(), 1);
  assert!(!table.aggregates().is_watching(a.track_id));
}

#[tokio::test]
async fn rating_deliveries_out_of_order_or_failed() {
  let store = store().await;
  let u1 = user("u1", Role::User);
  let group = group_with(&store, &u1, &[]).await;
  let track = add(&store, group, &u1, "Song").await;
  let id = track.track_id;

  let mut table = TrackTable::open(store.clone(), Session::signed_in(u1).with_group(Some(group)));
  settle(&mut table, |t| t.aggregates().is_watching(id) && t.is_settled()).await;
  let epoch = table.aggregates().epoch_of(id).expect("watched");

  // seq 0 was the first snapshot; replaying it is a rewind
  let rewound = table.apply(Inbound::Ratings {
    track_id: id,
    epoch,
    delivery: Ok(Snapshot { seq: 0, data: Vec::new() }),
  });
  assert_eq!(rewound, Update::Stale);

  let foreign = table.apply(Inbound::Ratings {
    track_id: id,
    epoch:    epoch + 99,
    delivery: Ok(Snapshot { seq: 50, data: Vec::new() }),
  });
  assert_eq!(foreign, Update::Stale);
  assert_eq!(table.aggregates().get(id), None);

  let failed = table.apply(Inbound::Ratings {
    track_id: id,
    epoch,
    delivery: Err(Box::new(std::io::Error::other("boom"))),
  });
  assert_eq!(failed, Update::AggregateFailed { track_id: id, message: "boom".into() });
  assert!(table.aggregates().is_settled());
}

// ─── Scope switching ─────────────────────────────────────────────────────────

#[tokio::test]
async fn feed_error_ends_loading_and_is_reported() {
  let store = store().await;
  let mut table = TrackTable::open(store.clone(), Session::anonymous());
  assert!(table.is_loading());

  let update = table.apply(Inbound::Tracks {
    epoch:    0,
    delivery: Err(Box::new(std::io::Error::other("down"))),
  });
  assert_eq!(update, Update::FeedFailed("down".into()));
  assert_eq!(table.feed_error(), Some("down"));
  assert!(!table.is_loading());
}

#[tokio::test]
async fn switching_groups_discards_the_old_feed() {
  let store = store().await;
  let u1 = user("u1", Role::User);
  let group_a = group_with(&store, &u1, &[]).await;
  let group_b = group_with(&store, &u1, &[]).await;
  let a1 = add(&store, group_a, &u1, "A1").await;
  add(&store, group_b, &u1, "B1").await;

  let mut table = TrackTable::open(store.clone(), Session::signed_in(u1).with_group(Some(group_a)));
  settle(&mut table, |t| t.tracks().len() == 1).await;

  table.set_active_group(Some(group_b));
  assert!(table.is_loading());
  assert!(table.tracks().is_empty());

  let late = table.apply(Inbound::Tracks {
    epoch:    0,
    delivery: Ok(Snapshot { seq: 7, data: vec![a1] }),
  });
  assert_eq!(late, Update::Stale);
  assert!(table.tracks().is_empty());

  settle(&mut table, |t| !t.is_loading()).await;
  let titles: Vec<_> = table.tracks().iter().map(|t| t.display_title()).collect();
  assert_eq!(titles, ["B1"]);
}

#[tokio::test]
async fn signed_out_table_shows_demo_tracks() {
  let store = store().await;
  let curator = user("curator", Role::Admin);
  let u1 = user("u1", Role::User);
  add(&store, DEMO_GROUP_ID, &curator, "Demo").await;
  let group = group_with(&store, &u1, &[]).await;
  add(&store, group, &u1, "Private").await;

  let mut table = TrackTable::open(store.clone(), Session::anonymous());
  settle(&mut table, |t| !t.is_loading()).await;
  assert_eq!(table.tracks()[0].display_title(), "Demo");

  // signed in but no group chosen: still the demo scope
  table.sign_in(u1, None);
  settle(&mut table, |t| !t.is_loading()).await;
  assert_eq!(table.tracks()[0].display_title(), "Demo");
}

// ─── Ratings ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn demo_ratings_stay_local() {
  let store = store().await;
  let curator = user("curator", Role::Admin);
  let demo = add(&store, DEMO_GROUP_ID, &curator, "Demo").await;

  let mut table = TrackTable::open(store.clone(), Session::anonymous());
  settle(&mut table, |t| !t.is_loading()).await;

  let outcome = table.rate(demo.track_id, score(4)).await.unwrap();
  assert_eq!(outcome, RateOutcome::Local);
  assert_eq!(table.view().rows[0].rating, Some(4.0));
  assert!(store.list_ratings(demo.track_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn stored_rating_is_logged() {
  let store = store().await;
  let u1 = user("u1", Role::User);
  let group = group_with(&store, &u1, &[]).await;
  let track = add(&store, group, &u1, "Song").await;
  let mut dispatch = Dispatcher::new(store.clone(), Session::signed_in(u1).with_group(Some(group)));

  assert_eq!(dispatch.rate(track.track_id, score(3)).await.unwrap(), RateOutcome::Stored);
  assert_eq!(dispatch.my_rating(track.track_id).await.unwrap(), Some(score(3)));

  let log = dispatch.recent_activity(DEFAULT_ACTIVITY_LIMIT).await.unwrap();
  assert_eq!(log[0].kind, ActivityKind::TrackRated);
  assert_eq!(log[0].score, Some(score(3)));
}

// ─── Delete ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn bulk_delete_is_all_or_nothing() {
  let store = store().await;
  let (u1, u2) = (user("u1", Role::User), user("u2", Role::User));
  let group = group_with(&store, &u1, &[&u2]).await;
  let x = add(&store, group, &u1, "X").await;
  let y = add(&store, group, &u2, "Y").await;
  let dispatch = Dispatcher::new(store.clone(), Session::signed_in(u1).with_group(Some(group)));

  let err = dispatch.delete_tracks(&[x.track_id, y.track_id]).await.unwrap_err();
  assert!(matches!(err, Error::Forbidden(_)));
  assert!(store.get_track(x.track_id).await.unwrap().is_some());
  assert!(store.get_track(y.track_id).await.unwrap().is_some());

  assert_eq!(dispatch.delete_tracks(&[x.track_id]).await.unwrap(), 1);
  assert!(store.get_track(x.track_id).await.unwrap().is_none());
}

#[tokio::test]
async fn delete_of_missing_track_changes_nothing() {
  let store = store().await;
  let u1 = user("u1", Role::User);
  let group = group_with(&store, &u1, &[]).await;
  let x = add(&store, group, &u1, "X").await;
  let dispatch = Dispatcher::new(store.clone(), Session::signed_in(u1).with_group(Some(group)));

  let ghost = Uuid::new_v4();
  let err = dispatch.delete_tracks(&[x.track_id, ghost]).await.unwrap_err();
  assert!(matches!(err, Error::TrackNotFound(id) if id == ghost));
  assert!(store.get_track(x.track_id).await.unwrap().is_some());
}

#[tokio::test]
async fn admin_deletes_any_track() {
  let store = store().await;
  let (admin, u2) = (user("root", Role::Admin), user("u2", Role::User));
  let group = group_with(&store, &admin, &[&u2]).await;
  let y = add(&store, group, &u2, "Y").await;
  let dispatch = Dispatcher::new(store.clone(), Session::signed_in(admin).with_group(Some(group)));

  assert_eq!(dispatch.delete_tracks(&[y.track_id]).await.unwrap(), 1);
}

#[tokio::test]
async fn delete_selected_returns_to_view_mode() {
  let store = store().await;
  let (u1, u2) = (user("u1", Role::User), user("u2", Role::User));
  let group = group_with(&store, &u1, &[&u2]).await;
  add(&store, group, &u1, "Mine").await;
  add(&store, group, &u2, "Theirs").await;

  let mut table = TrackTable::open(store.clone(), Session::signed_in(u1).with_group(Some(group)));
  settle(&mut table, |t| t.tracks().len() == 2).await;

  table.toggle_mode();
  assert_eq!(table.select_all_visible(), 1);

  let cancelled = table.delete_selected(|_| false).await.unwrap();
  assert_eq!(cancelled, DeleteOutcome::Cancelled);
  assert_eq!(table.selection().selected().len(), 1);

  let outcome = table.delete_selected(|doomed| doomed.len() == 1).await.unwrap();
  assert_eq!(outcome, DeleteOutcome::Deleted(1));
  assert_eq!(table.selection().mode(), Mode::View);
  assert!(table.selection().selected().is_empty());

  settle(&mut table, |t| t.tracks().len() == 1).await;
  assert_eq!(table.tracks()[0].display_title(), "Theirs");
}

// ─── Tracks and autofill ─────────────────────────────────────────────────────

#[tokio::test]
async fn create_track_clears_the_draft() {
  let store = store().await;
  let u1 = user("u1", Role::User);
  let group = group_with(&store, &u1, &[]).await;
  let dispatch = Dispatcher::new(store.clone(), Session::signed_in(u1.clone()).with_group(Some(group)));

  let mut draft = TrackDetails { title: Some("New".into()), ..Default::default() };
  let track = dispatch.create_track(&mut draft).await.unwrap();
  assert_eq!(track.added_by_id, u1.user_id);
  assert_eq!(track.added_by_name, "U1");
  assert_eq!(draft, TrackDetails::default());

  let log = dispatch.recent_activity(DEFAULT_ACTIVITY_LIMIT).await.unwrap();
  assert_eq!(log[0].kind, ActivityKind::TrackAdded);
}

#[tokio::test]
async fn demo_scope_is_read_only() {
  let store = store().await;
  let mut table = TrackTable::open(store.clone(), Session::signed_in(user("u1", Role::User)));

  let mut draft = TrackDetails { title: Some("Nope".into()), ..Default::default() };
  let err = table.create_track(&mut draft).await.unwrap_err();
  assert!(matches!(err, Error::NoActiveGroup));
  assert_eq!(draft.title.as_deref(), Some("Nope"));
  assert_eq!(table.notice().map(|n| n.severity), Some(Severity::Hint));
}

struct Canned {
  record: MetadataRecord,
  calls:  AtomicUsize,
}

impl MetadataSource for Canned {
  type Error = std::io::Error;

  fn fetch<'a>(
    &'a self,
    _permalink: &'a str,
  ) -> impl Future<Output = Result<MetadataRecord, Self::Error>> + Send + 'a {
    self.calls.fetch_add(1, Ordering::SeqCst);
    let record = self.record.clone();
    async move { Ok(record) }
  }
}

#[tokio::test]
async fn autofill_respects_typed_values() {
  let store = store().await;
  let dispatch = Dispatcher::new(store, Session::anonymous());
  let source = Canned {
    record: MetadataRecord {
      artist_name: Some("Mo".into()),
      likes_count: Some(0),
      tags: Some(vec![]),
      ..Default::default()
    },
    calls:  AtomicUsize::new(0),
  };

  let mut draft = TrackDetails {
    title: Some("Typed".into()),
    permalink: Some("https://soundcloud.com/mo/song".into()),
    publish_date: NaiveDate::from_ymd_opt(2020, 5, 1),
    tags: vec!["old".into()],
    ..Default::default()
  };
  dispatch.autofill(&source, &mut draft).await.unwrap();

  assert_eq!(draft.title.as_deref(), Some("Typed"));
  assert_eq!(draft.artist.as_deref(), Some("Mo"));
  assert_eq!(draft.likes, Some(0));
  assert!(draft.tags.is_empty());
  assert_eq!(draft.publish_date, None);
}

#[tokio::test]
async fn autofill_checks_permalink_before_fetching() {
  let store = store().await;
  let dispatch = Dispatcher::new(store, Session::anonymous());
  let source = Canned { record: MetadataRecord::default(), calls: AtomicUsize::new(0) };

  let mut draft = TrackDetails::default();
  let err = dispatch.autofill(&source, &mut draft).await.unwrap_err();
  assert!(matches!(err, Error::Core(setlist_core::Error::MissingPermalink)));

  draft.permalink = Some("https://example.com/song".into());
  let err = dispatch.autofill(&source, &mut draft).await.unwrap_err();
  assert!(matches!(err, Error::Core(setlist_core::Error::InvalidPermalink(_))));
  assert_eq!(source.calls.load(Ordering::SeqCst), 0);
}

// ─── Comments ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn comment_is_confirmed_in_place() {
  let store = store().await;
  let u1 = user("u1", Role::User);
  let group = group_with(&store, &u1, &[]).await;
  let track = add(&store, group, &u1, "Song").await;
  let dispatch = Dispatcher::new(store.clone(), Session::signed_in(u1).with_group(Some(group)));

  let mut thread = dispatch.load_comments(track.track_id).await.unwrap();
  let stored = dispatch.comment(&mut thread, "  nice  ").await.unwrap();
  assert_eq!(stored.text, "nice");
  assert_eq!(thread.len(), 1);
  assert!(!thread.entries()[0].pending);
  assert_eq!(thread.entries()[0].comment, stored);

  let log = dispatch.recent_activity(DEFAULT_ACTIVITY_LIMIT).await.unwrap();
  assert_eq!(log[0].kind, ActivityKind::CommentAdded);
}

#[tokio::test]
async fn failed_comment_is_rolled_back() {
  let store = store().await;
  let u1 = user("u1", Role::User);
  let group = group_with(&store, &u1, &[]).await;
  let dispatch = Dispatcher::new(store.clone(), Session::signed_in(u1).with_group(Some(group)));

  let mut thread = CommentThread::new(Uuid::new_v4(), Vec::new());
  let err = dispatch.comment(&mut thread, "hello").await.unwrap_err();
  assert!(matches!(err, Error::Store(_)));
  assert!(thread.is_empty());
}

#[tokio::test]
async fn blank_comment_is_rejected() {
  let store = store().await;
  let u1 = user("u1", Role::User);
  let group = group_with(&store, &u1, &[]).await;
  let track = add(&store, group, &u1, "Song").await;
  let dispatch = Dispatcher::new(store.clone(), Session::signed_in(u1).with_group(Some(group)));

  let mut thread = dispatch.load_comments(track.track_id).await.unwrap();
  let err = dispatch.comment(&mut thread, "   ").await.unwrap_err();
  assert!(matches!(err, Error::Validation(_)));
  assert!(thread.is_empty());
}

// ─── Accounts and groups ─────────────────────────────────────────────────────

#[tokio::test]
async fn sign_in_keeps_an_existing_role() {
  let store = store().await;
  let principal = Principal {
    user_id:      UserId::new("u1"),
    display_name: Some("Ann".into()),
    email:        None,
  };

  let first = sign_in(store.as_ref(), &principal).await.unwrap();
  assert_eq!(first.role, Role::User);

  store.put_user(User { role: Role::Admin, ..first }).await.unwrap();
  let again = sign_in(store.as_ref(), &principal).await.unwrap();
  assert_eq!(again.role, Role::Admin);
  assert_eq!(again.display_name, "Ann");
}

#[tokio::test]
async fn joining_is_idempotent_and_logged_once() {
  let store = store().await;
  let (u1, u2) = (user("u1", Role::User), user("u2", Role::User));
  let owner = Dispatcher::new(store.clone(), Session::signed_in(u1));
  let group = owner.create_group("Band").await.unwrap();

  let joiner = Dispatcher::new(store.clone(), Session::signed_in(u2.clone()).with_group(Some(group.group_id)));
  joiner.join_group(group.group_id).await.unwrap();
  let again = joiner.join_group(group.group_id).await.unwrap();
  assert_eq!(again.members.len(), 2);
  assert!(again.is_member(&u2.user_id));

  let log = joiner.recent_activity(DEFAULT_ACTIVITY_LIMIT).await.unwrap();
  let joins = log.iter().filter(|a| a.kind == ActivityKind::UserJoinedGroup).count();
  assert_eq!(joins, 1);
  assert_eq!(joiner.my_groups().await.unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_group_and_blank_name_are_rejected() {
  let store = store().await;
  let dispatch = Dispatcher::new(store, Session::signed_in(user("u1", Role::User)));

  let ghost = Uuid::new_v4();
  assert!(matches!(
    dispatch.join_group(ghost).await.unwrap_err(),
    Error::GroupNotFound(id) if id == ghost
  ));
  assert!(matches!(dispatch.create_group("  ").await.unwrap_err(), Error::Validation(_)));
}

// ─── View state ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn view_changes_reset_the_page() {
  let store = store().await;
  let u1 = user("u1", Role::User);
  let group = group_with(&store, &u1, &[]).await;
  for i in 0..12 {
    add(&store, group, &u1, &format!("t{i:02}")).await;
  }
  let mut table = TrackTable::open(store.clone(), Session::signed_in(u1).with_group(Some(group)));
  settle(&mut table, |t| t.tracks().len() == 12).await;

  table.set_page(2);
  assert_eq!(table.view().rows.len(), 2);
  assert_eq!(table.view().page_count, 3);

  table.set_filter(FilterState { query: Some("t0".into()), ..Default::default() });
  assert_eq!(table.page().index, 0);
  assert_eq!(table.view().total, 10);

  table.set_page(1);
  table.set_page_size(10);
  assert_eq!(table.page().index, 0);
  assert_eq!(table.view().rows.len(), 10);
}
