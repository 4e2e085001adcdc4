//! SQL schema for the Setlist SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id       TEXT PRIMARY KEY,
    display_name  TEXT NOT NULL,
    email         TEXT NOT NULL,
    role          TEXT NOT NULL DEFAULT 'user'   -- 'admin' | 'user'
);

CREATE TABLE IF NOT EXISTS track_groups (
    group_id    TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    admin_id    TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS group_members (
    group_id   TEXT NOT NULL REFERENCES track_groups(group_id) ON DELETE CASCADE,
    user_id    TEXT NOT NULL,
    joined_at  TEXT NOT NULL,
    PRIMARY KEY (group_id, user_id)
);

-- group_id is not a foreign key: the demo scope has no group row.
CREATE TABLE IF NOT EXISTS tracks (
    track_id       TEXT PRIMARY KEY,
    group_id       TEXT NOT NULL,
    details_json   TEXT NOT NULL,   -- JSON-encoded TrackDetails
    added_by_id    TEXT NOT NULL,
    added_by_name  TEXT NOT NULL,
    added_at       TEXT NOT NULL    -- ISO 8601 UTC; server-assigned
);

-- One row per (track, user); resubmission overwrites.
CREATE TABLE IF NOT EXISTS ratings (
    track_id  TEXT NOT NULL REFERENCES tracks(track_id) ON DELETE CASCADE,
    user_id   TEXT NOT NULL,
    score     INTEGER NOT NULL CHECK (score BETWEEN 1 AND 5),
    rated_at  TEXT NOT NULL,
    PRIMARY KEY (track_id, user_id)
);

-- Append-only.
CREATE TABLE IF NOT EXISTS comments (
    comment_id   TEXT PRIMARY KEY,
    track_id     TEXT NOT NULL REFERENCES tracks(track_id) ON DELETE CASCADE,
    author_id    TEXT NOT NULL,
    author_name  TEXT NOT NULL,
    text         TEXT NOT NULL,
    created_at   TEXT NOT NULL
);

-- Append-only; survives deletion of the track it mentions.
CREATE TABLE IF NOT EXISTS activities (
    activity_id  TEXT PRIMARY KEY,
    group_id     TEXT NOT NULL,
    kind         TEXT NOT NULL,
    user_id      TEXT NOT NULL,
    user_name    TEXT NOT NULL,
    track_id     TEXT,
    track_title  TEXT,
    score        INTEGER,
    comment      TEXT,
    recorded_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS tracks_group_idx      ON tracks(group_id);
CREATE INDEX IF NOT EXISTS comments_track_idx    ON comments(track_id);
CREATE INDEX IF NOT EXISTS activities_group_idx  ON activities(group_id, recorded_at);
CREATE INDEX IF NOT EXISTS members_user_idx      ON group_members(user_id);

PRAGMA user_version = 1;
";
