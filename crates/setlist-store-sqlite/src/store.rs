//! [`SqliteStore`]: the SQLite implementation of [`TrackStore`].

use std::{collections::BTreeSet, path::Path};

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use setlist_core::{
  activity::{Activity, NewActivity},
  comment::{Comment, NewComment},
  group::Group,
  rating::{Rating, Score},
  store::{RatingSubscription, TrackStore, TrackSubscription},
  track::{NewTrack, Track},
  user::{User, UserId},
};

use crate::{
  encode::{
    RawActivity, RawComment, RawGroup, RawRating, RawUser, TRACK_COLUMNS, decode_uuid,
    encode_activity_kind, encode_details, encode_dt, encode_role, encode_uuid, raw_rating, raw_track,
  },
  live::{self, Change, ChangeBus},
  schema::SCHEMA,
  Error, Result,
};

// ─── Row helpers ─────────────────────────────────────────────────────────────

/// Read one group row and its members on the database thread.
fn query_group(
  conn: &rusqlite::Connection,
  group_id: &str,
) -> rusqlite::Result<Option<RawGroup>> {
  let row = conn
    .query_row(
      "SELECT group_id, name, admin_id, created_at FROM track_groups WHERE group_id = ?1",
      rusqlite::params![group_id],
      |row| {
        Ok(RawGroup {
          group_id:   row.get(0)?,
          name:       row.get(1)?,
          admin_id:   row.get(2)?,
          created_at: row.get(3)?,
          members:    Vec::new(),
        })
      },
    )
    .optional()?;

  let Some(mut raw) = row else {
    return Ok(None);
  };

  let mut stmt = conn.prepare(
    "SELECT user_id FROM group_members WHERE group_id = ?1 ORDER BY joined_at, rowid",
  )?;
  raw.members = stmt
    .query_map(rusqlite::params![group_id], |r| r.get(0))?
    .collect::<rusqlite::Result<Vec<String>>>()?;
  Ok(Some(raw))
}

fn track_exists(conn: &rusqlite::Connection, track_id: &str) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM tracks WHERE track_id = ?1",
        rusqlite::params![track_id],
        |_| Ok(true),
      )
      .optional()?
      .unwrap_or(false),
  )
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Setlist track store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection and change bus are
/// reference-counted, and all clones share both.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
  bus:  ChangeBus,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, bus: ChangeBus::new() };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, bus: ChangeBus::new() };
    store.init_schema().await?;
    Ok(store)
  }

  /// Live queries whose tasks are still running.
  #[cfg(test)]
  pub(crate) fn live_queries(&self) -> usize { self.bus.listeners() }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── TrackStore impl ─────────────────────────────────────────────────────────

impl TrackStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn get_user(&self, user_id: &UserId) -> Result<Option<User>> {
    let id = user_id.as_str().to_owned();

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT user_id, display_name, email, role FROM users WHERE user_id = ?1",
              rusqlite::params![id],
              |row| {
                Ok(RawUser {
                  user_id:      row.get(0)?,
                  display_name: row.get(1)?,
                  email:        row.get(2)?,
                  role:         row.get(3)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn put_user(&self, user: User) -> Result<User> {
    let id       = user.user_id.as_str().to_owned();
    let name     = user.display_name.clone();
    let email    = user.email.clone();
    let role_str = encode_role(user.role);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (user_id, display_name, email, role) VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT(user_id) DO UPDATE SET
             display_name = excluded.display_name,
             email        = excluded.email,
             role         = excluded.role",
          rusqlite::params![id, name, email, role_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(user)
  }

  // ── Groups ────────────────────────────────────────────────────────────────

  async fn create_group(&self, name: String, admin: UserId) -> Result<Group> {
    let group = Group {
      group_id:   Uuid::new_v4(),
      name,
      members:    BTreeSet::from([admin.clone()]),
      admin_id:   admin,
      created_at: Utc::now(),
    };

    let id_str    = encode_uuid(group.group_id);
    let name      = group.name.clone();
    let admin_str = group.admin_id.as_str().to_owned();
    let at_str    = encode_dt(group.created_at);

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO track_groups (group_id, name, admin_id, created_at) VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, name, admin_str, at_str],
        )?;
        tx.execute(
          "INSERT INTO group_members (group_id, user_id, joined_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![id_str, admin_str, at_str],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await?;

    tracing::debug!(group_id = %group.group_id, "group created");
    Ok(group)
  }

  async fn get_group(&self, group_id: Uuid) -> Result<Option<Group>> {
    let id_str = encode_uuid(group_id);
    let raw = self
      .conn
      .call(move |conn| Ok(query_group(conn, &id_str)?))
      .await?;
    raw.map(RawGroup::into_group).transpose()
  }

  async fn join_group(&self, group_id: Uuid, user_id: UserId) -> Result<Group> {
    let id_str   = encode_uuid(group_id);
    let user_str = user_id.as_str().to_owned();
    let at_str   = encode_dt(Utc::now());

    let raw = self
      .conn
      .call(move |conn| {
        if query_group(conn, &id_str)?.is_none() {
          return Ok(None);
        }
        conn.execute(
          "INSERT OR IGNORE INTO group_members (group_id, user_id, joined_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![id_str, user_str, at_str],
        )?;
        Ok(query_group(conn, &id_str)?)
      })
      .await?;

    raw
      .ok_or(Error::GroupNotFound(group_id))
      .and_then(RawGroup::into_group)
  }

  async fn groups_for_user(&self, user_id: &UserId) -> Result<Vec<Group>> {
    let user_str = user_id.as_str().to_owned();

    let raws: Vec<RawGroup> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT g.group_id
           FROM track_groups g
           JOIN group_members m ON m.group_id = g.group_id
           WHERE m.user_id = ?1
           ORDER BY g.created_at, g.rowid",
        )?;
        let ids = stmt
          .query_map(rusqlite::params![user_str], |r| r.get::<_, String>(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut groups = Vec::with_capacity(ids.len());
        for id in ids {
          if let Some(raw) = query_group(conn, &id)? {
            groups.push(raw);
          }
        }
        Ok(groups)
      })
      .await?;

    raws.into_iter().map(RawGroup::into_group).collect()
  }

  // ── Tracks ────────────────────────────────────────────────────────────────

  async fn add_track(&self, input: NewTrack) -> Result<Track> {
    let track = input.into_track(Uuid::new_v4(), Utc::now());

    let id_str       = encode_uuid(track.track_id);
    let group_str    = encode_uuid(track.group_id);
    let details_str  = encode_details(&track.details)?;
    let added_by_id  = track.added_by_id.as_str().to_owned();
    let added_by     = track.added_by_name.clone();
    let at_str       = encode_dt(track.added_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO tracks (track_id, group_id, details_json, added_by_id, added_by_name, added_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id_str, group_str, details_str, added_by_id, added_by, at_str],
        )?;
        Ok(())
      })
      .await?;

    self.bus.publish(Change::Tracks(track.group_id));
    Ok(track)
  }

  async fn get_track(&self, track_id: Uuid) -> Result<Option<Track>> {
    let id_str = encode_uuid(track_id);

    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {TRACK_COLUMNS} FROM tracks WHERE track_id = ?1"),
              rusqlite::params![id_str],
              raw_track,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(|r| r.into_track()).transpose()
  }

  async fn list_tracks(&self, group_id: Uuid) -> Result<Vec<Track>> {
    let group_str = encode_uuid(group_id);

    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {TRACK_COLUMNS} FROM tracks WHERE group_id = ?1 ORDER BY added_at, rowid"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![group_str], raw_track)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(|r| r.into_track()).collect()
  }

  async fn delete_tracks(&self, track_ids: &[Uuid]) -> Result<usize> {
    let ids: Vec<String> = track_ids.iter().copied().map(encode_uuid).collect();

    // (track_id, group_id) of every row actually removed.
    let removed: Vec<(String, String)> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut removed = Vec::with_capacity(ids.len());
        for id in ids {
          let group: Option<String> = tx
            .query_row(
              "SELECT group_id FROM tracks WHERE track_id = ?1",
              rusqlite::params![id],
              |r| r.get(0),
            )
            .optional()?;
          if let Some(group) = group {
            tx.execute("DELETE FROM tracks WHERE track_id = ?1", rusqlite::params![id])?;
            removed.push((id, group));
          }
        }
        tx.commit()?;
        Ok(removed)
      })
      .await?;

    let mut groups = BTreeSet::new();
    for (track, group) in &removed {
      self.bus.publish(Change::Ratings(decode_uuid(track)?));
      groups.insert(decode_uuid(group)?);
    }
    for group in groups {
      self.bus.publish(Change::Tracks(group));
    }

    Ok(removed.len())
  }

  // ── Ratings ───────────────────────────────────────────────────────────────

  async fn put_rating(&self, track_id: Uuid, user_id: UserId, score: Score) -> Result<Rating> {
    let rating = Rating { track_id, user_id, score, rated_at: Utc::now() };

    let track_str = encode_uuid(track_id);
    let user_str  = rating.user_id.as_str().to_owned();
    let score_val = i64::from(score.get());
    let at_str    = encode_dt(rating.rated_at);

    let found = self
      .conn
      .call(move |conn| {
        if !track_exists(conn, &track_str)? {
          return Ok(false);
        }
        conn.execute(
          "INSERT INTO ratings (track_id, user_id, score, rated_at) VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT(track_id, user_id) DO UPDATE SET
             score    = excluded.score,
             rated_at = excluded.rated_at",
          rusqlite::params![track_str, user_str, score_val, at_str],
        )?;
        Ok(true)
      })
      .await?;

    if !found {
      return Err(Error::TrackNotFound(track_id));
    }

    self.bus.publish(Change::Ratings(track_id));
    Ok(rating)
  }

  async fn get_rating(&self, track_id: Uuid, user_id: &UserId) -> Result<Option<Rating>> {
    let track_str = encode_uuid(track_id);
    let user_str  = user_id.as_str().to_owned();

    let raw: Option<RawRating> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT track_id, user_id, score, rated_at FROM ratings
               WHERE track_id = ?1 AND user_id = ?2",
              rusqlite::params![track_str, user_str],
              raw_rating,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRating::into_rating).transpose()
  }

  async fn list_ratings(&self, track_id: Uuid) -> Result<Vec<Rating>> {
    let track_str = encode_uuid(track_id);

    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT track_id, user_id, score, rated_at FROM ratings
           WHERE track_id = ?1 ORDER BY rated_at, user_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![track_str], raw_rating)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRating::into_rating).collect()
  }

  // ── Comments ──────────────────────────────────────────────────────────────

  async fn add_comment(&self, input: NewComment) -> Result<Comment> {
    let comment = input.into_comment(Uuid::new_v4(), Utc::now());

    let id_str     = encode_uuid(comment.comment_id);
    let track_str  = encode_uuid(comment.track_id);
    let author_str = comment.author_id.as_str().to_owned();
    let author     = comment.author_name.clone();
    let text       = comment.text.clone();
    let at_str     = encode_dt(comment.created_at);

    let found = self
      .conn
      .call(move |conn| {
        if !track_exists(conn, &track_str)? {
          return Ok(false);
        }
        conn.execute(
          "INSERT INTO comments (comment_id, track_id, author_id, author_name, text, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id_str, track_str, author_str, author, text, at_str],
        )?;
        Ok(true)
      })
      .await?;

    if !found {
      return Err(Error::TrackNotFound(comment.track_id));
    }
    Ok(comment)
  }

  async fn list_comments(&self, track_id: Uuid) -> Result<Vec<Comment>> {
    let track_str = encode_uuid(track_id);

    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT comment_id, track_id, author_id, author_name, text, created_at
           FROM comments WHERE track_id = ?1 ORDER BY created_at, rowid",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![track_str], |row| {
            Ok(RawComment {
              comment_id:  row.get(0)?,
              track_id:    row.get(1)?,
              author_id:   row.get(2)?,
              author_name: row.get(3)?,
              text:        row.get(4)?,
              created_at:  row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawComment::into_comment).collect()
  }

  // ── Activity ──────────────────────────────────────────────────────────────

  async fn record_activity(&self, input: NewActivity) -> Result<Activity> {
    let activity = input.into_activity(Uuid::new_v4(), Utc::now());

    let id_str    = encode_uuid(activity.activity_id);
    let group_str = encode_uuid(activity.group_id);
    let kind_str  = encode_activity_kind(activity.kind);
    let user_str  = activity.user_id.as_str().to_owned();
    let user_name = activity.user_name.clone();
    let track_str = activity.track_id.map(encode_uuid);
    let title     = activity.track_title.clone();
    let score     = activity.score.map(|s| i64::from(s.get()));
    let comment   = activity.comment.clone();
    let at_str    = encode_dt(activity.recorded_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO activities (
             activity_id, group_id, kind, user_id, user_name,
             track_id, track_title, score, comment, recorded_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
          rusqlite::params![
            id_str, group_str, kind_str, user_str, user_name,
            track_str, title, score, comment, at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(activity)
  }

  async fn list_activities(&self, group_id: Uuid, limit: usize) -> Result<Vec<Activity>> {
    let group_str = encode_uuid(group_id);
    let limit_val = i64::try_from(limit).unwrap_or(i64::MAX);

    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT activity_id, group_id, kind, user_id, user_name,
                  track_id, track_title, score, comment, recorded_at
           FROM activities WHERE group_id = ?1
           ORDER BY recorded_at DESC, rowid DESC
           LIMIT ?2",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![group_str, limit_val], |row| {
            Ok(RawActivity {
              activity_id: row.get(0)?,
              group_id:    row.get(1)?,
              kind:        row.get(2)?,
              user_id:     row.get(3)?,
              user_name:   row.get(4)?,
              track_id:    row.get(5)?,
              track_title: row.get(6)?,
              score:       row.get(7)?,
              comment:     row.get(8)?,
              recorded_at: row.get(9)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawActivity::into_activity).collect()
  }

  // ── Live queries ──────────────────────────────────────────────────────────

  fn subscribe_tracks(&self, group_id: Uuid) -> TrackSubscription<Error> {
    let store = self.clone();
    live::spawn_live(&self.bus, Change::Tracks(group_id), move || {
      let store = store.clone();
      async move { store.list_tracks(group_id).await }
    })
  }

  fn subscribe_ratings(&self, track_id: Uuid) -> RatingSubscription<Error> {
    let store = self.clone();
    live::spawn_live(&self.bus, Change::Ratings(track_id), move || {
      let store = store.clone();
      async move { store.list_ratings(track_id).await }
    })
  }
}
