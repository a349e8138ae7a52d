//! [`SqliteStore`] — the SQLite implementation of the storage traits.

use std::path::Path;

use chrono::Utc;
use influences_core::{
  activity::{ActivityEvent, Actor},
  influence::{Influence, NewInfluence},
  store::{ActivityStore, InfluenceStore, UserStore},
  user::{BeatmapRef, User},
};
use rusqlite::OptionalExtension as _;
use tracing::{debug, info};

use crate::{
  Error, Result,
  encode::{RawInfluence, RawUser, encode_beatmaps, encode_dt},
  schema::SCHEMA,
};

const USER_COLUMNS: &str = "
  u.user_id, u.username, u.avatar_url, u.country, u.have_ranked_map, u.bio, u.beatmaps,
  (SELECT COUNT(*) FROM influences i WHERE i.influenced_to = u.user_id)";

const INFLUENCE_COLUMNS: &str = "
  influenced_by, influenced_to, influence_type, description, beatmaps, created_at, modified_at";

fn raw_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawUser> {
  Ok(RawUser {
    user_id:         row.get(0)?,
    username:        row.get(1)?,
    avatar_url:      row.get(2)?,
    country:         row.get(3)?,
    have_ranked_map: row.get(4)?,
    bio:             row.get(5)?,
    beatmaps:        row.get(6)?,
    mention_count:   row.get(7)?,
  })
}

fn raw_influence(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawInfluence> {
  Ok(RawInfluence {
    influenced_by:  row.get(0)?,
    influenced_to:  row.get(1)?,
    influence_type: row.get(2)?,
    description:    row.get(3)?,
    beatmaps:       row.get(4)?,
    created_at:     row.get(5)?,
    modified_at:    row.get(6)?,
  })
}

/// JSON failures inside a connection closure surface as the connection's
/// catch-all error.
fn json_err(e: serde_json::Error) -> tokio_rusqlite::Error { tokio_rusqlite::Error::Other(Box::new(e)) }

// ─── Store ───────────────────────────────────────────────────────────────────

/// The mapper-influences store backed by a single SQLite file.
///
/// Clones share the same reference-counted connection.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref().to_owned();
    let conn = tokio_rusqlite::Connection::open(&path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    info!(path = %path.display(), "opened sqlite store");
    Ok(store)
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

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

  /// Rewrite the beatmap list of user `id` with `edit` inside one
  /// transaction. `edit` returns whether it changed anything.
  ///
  /// Returns `None` if the user does not exist, otherwise what `edit`
  /// returned.
  async fn edit_beatmaps<F>(&self, id: u64, edit: F) -> Result<Option<bool>>
  where
    F: FnOnce(&mut Vec<BeatmapRef>) -> bool + Send + 'static,
  {
    let now = encode_dt(Utc::now());

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let raw: Option<String> = tx
          .query_row(
            "SELECT beatmaps FROM users WHERE user_id = ?1",
            rusqlite::params![id],
            |r| r.get(0),
          )
          .optional()?;
        let Some(raw) = raw else {
          return Ok(None);
        };

        let mut beatmaps: Vec<BeatmapRef> = serde_json::from_str(&raw).map_err(json_err)?;
        let changed = edit(&mut beatmaps);
        if changed {
          let encoded = serde_json::to_string(&beatmaps).map_err(json_err)?;
          tx.execute(
            "UPDATE users SET beatmaps = ?1, modified_at = ?2 WHERE user_id = ?3",
            rusqlite::params![encoded, now, id],
          )?;
        }
        tx.commit()?;
        Ok(Some(changed))
      })
      .await?;
    Ok(outcome)
  }

  async fn query_influences(&self, sql: &'static str, user_id: u64) -> Result<Vec<Influence>> {
    let raws: Vec<RawInfluence> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
          .query_map(rusqlite::params![user_id], raw_influence)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawInfluence::into_influence).collect()
  }
}

// ─── ActivityStore impl ──────────────────────────────────────────────────────

impl ActivityStore for SqliteStore {
  type Error = Error;

  async fn save_event<'a>(&'a self, event: &'a ActivityEvent) -> Result<()> {
    let actor_id    = event.actor().id;
    let kind        = event.kind().as_str();
    let recorded_at = encode_dt(event.datetime());
    let event_json  = event.to_json()?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO activities (actor_id, kind, recorded_at, event_json)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![actor_id, kind, recorded_at, event_json],
        )?;
        Ok(())
      })
      .await?;
    debug!(actor = actor_id, kind, "persisted activity");
    Ok(())
  }

  async fn load_recent_events(&self, limit: usize) -> Result<Vec<ActivityEvent>> {
    let rows: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT event_json FROM (
             SELECT activity_id, event_json FROM activities
             ORDER BY activity_id DESC LIMIT ?1
           ) ORDER BY activity_id ASC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![limit], |r| r.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .iter()
      .map(|json| serde_json::from_str(json).map_err(Error::from))
      .collect()
  }
}

// ─── UserStore impl ──────────────────────────────────────────────────────────

impl UserStore for SqliteStore {
  type Error = Error;

  async fn upsert_user(&self, actor: Actor) -> Result<()> {
    let now = encode_dt(Utc::now());
    let beatmaps = encode_beatmaps(&[])?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (user_id, username, avatar_url, country, beatmaps, created_at, modified_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
           ON CONFLICT (user_id) DO UPDATE SET
             username    = excluded.username,
             avatar_url  = excluded.avatar_url,
             country     = excluded.country,
             modified_at = excluded.modified_at",
          rusqlite::params![actor.id, actor.username, actor.avatar_url, actor.country, beatmaps, now],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_user(&self, id: u64) -> Result<Option<User>> {
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {USER_COLUMNS} FROM users u WHERE u.user_id = ?1"),
              rusqlite::params![id],
              raw_user,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn update_bio(&self, id: u64, bio: String) -> Result<()> {
    let now = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE users SET bio = ?1, modified_at = ?2 WHERE user_id = ?3",
          rusqlite::params![bio, now, id],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::UserNotFound(id));
    }
    Ok(())
  }

  async fn set_ranked_map(&self, id: u64, have_ranked_map: bool) -> Result<()> {
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE users SET have_ranked_map = ?1 WHERE user_id = ?2",
          rusqlite::params![have_ranked_map, id],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::UserNotFound(id));
    }
    Ok(())
  }

  async fn add_beatmap(&self, id: u64, beatmap: BeatmapRef) -> Result<()> {
    let outcome = self
      .edit_beatmaps(id, move |beatmaps| {
        if beatmaps.contains(&beatmap) {
          return false;
        }
        beatmaps.push(beatmap);
        true
      })
      .await?;
    outcome.map(|_| ()).ok_or(Error::UserNotFound(id))
  }

  async fn remove_beatmap(&self, id: u64, beatmap: BeatmapRef) -> Result<bool> {
    let outcome = self
      .edit_beatmaps(id, move |beatmaps| {
        let before = beatmaps.len();
        beatmaps.retain(|b| *b != beatmap);
        beatmaps.len() != before
      })
      .await?;
    outcome.ok_or(Error::UserNotFound(id))
  }
}

// ─── InfluenceStore impl ─────────────────────────────────────────────────────

impl InfluenceStore for SqliteStore {
  type Error = Error;

  async fn add_influence(&self, input: NewInfluence) -> Result<Influence> {
    let now      = encode_dt(Utc::now());
    let beatmaps = encode_beatmaps(&input.beatmaps)?;

    let raw: RawInfluence = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO influences (
             influenced_by, influenced_to, influence_type, description, beatmaps,
             created_at, modified_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
           ON CONFLICT (influenced_by, influenced_to) DO UPDATE SET
             influence_type = excluded.influence_type,
             description    = excluded.description,
             beatmaps       = excluded.beatmaps,
             modified_at    = excluded.modified_at",
          rusqlite::params![
            input.influenced_by,
            input.influenced_to,
            input.influence_type,
            input.description,
            beatmaps,
            now,
          ],
        )?;
        let raw = tx.query_row(
          &format!(
            "SELECT {INFLUENCE_COLUMNS} FROM influences
             WHERE influenced_by = ?1 AND influenced_to = ?2"
          ),
          rusqlite::params![input.influenced_by, input.influenced_to],
          raw_influence,
        )?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.into_influence()
  }

  async fn remove_influence(&self, influenced_by: u64, influenced_to: u64) -> Result<bool> {
    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM influences WHERE influenced_by = ?1 AND influenced_to = ?2",
          rusqlite::params![influenced_by, influenced_to],
        )?)
      })
      .await?;
    Ok(removed > 0)
  }

  async fn list_influences(&self, influenced_by: u64) -> Result<Vec<Influence>> {
    self
      .query_influences(
        "SELECT influenced_by, influenced_to, influence_type, description, beatmaps,
                created_at, modified_at
         FROM influences WHERE influenced_by = ?1
         ORDER BY created_at, influenced_to",
        influenced_by,
      )
      .await
  }

  async fn list_mentions(&self, influenced_to: u64) -> Result<Vec<Influence>> {
    self
      .query_influences(
        "SELECT influenced_by, influenced_to, influence_type, description, beatmaps,
                created_at, modified_at
         FROM influences WHERE influenced_to = ?1
         ORDER BY created_at, influenced_by",
        influenced_to,
      )
      .await
  }
}
