//! SQL schema for the mapper-influences SQLite store.
//!
//! Executed once at connection startup. `PRAGMA user_version` records the
//! schema revision so later migrations can be gated on it.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id         INTEGER PRIMARY KEY,   -- osu! user id
    username        TEXT NOT NULL,
    avatar_url      TEXT NOT NULL,
    country         TEXT NOT NULL,
    have_ranked_map INTEGER NOT NULL DEFAULT 0,
    bio             TEXT,
    beatmaps        TEXT NOT NULL DEFAULT '[]',   -- JSON array of BeatmapRef
    created_at      TEXT NOT NULL,
    modified_at     TEXT NOT NULL
);

-- At most one influence per ordered (influenced_by, influenced_to) pair.
CREATE TABLE IF NOT EXISTS influences (
    influenced_by  INTEGER NOT NULL,
    influenced_to  INTEGER NOT NULL,
    influence_type INTEGER NOT NULL DEFAULT 1,
    description    TEXT,
    beatmaps       TEXT NOT NULL DEFAULT '[]',
    created_at     TEXT NOT NULL,
    modified_at    TEXT NOT NULL,
    PRIMARY KEY (influenced_by, influenced_to)
);

-- Accepted activity events, append-only. Row order is acceptance order.
CREATE TABLE IF NOT EXISTS activities (
    activity_id INTEGER PRIMARY KEY AUTOINCREMENT,
    actor_id    INTEGER NOT NULL,
    kind        TEXT NOT NULL,   -- ActivityKind wire name, e.g. 'EDIT_BIO'
    recorded_at TEXT NOT NULL,
    event_json  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS influences_to_idx ON influences(influenced_to);
CREATE INDEX IF NOT EXISTS activities_actor_idx ON activities(actor_id);

PRAGMA user_version = 1;
";
