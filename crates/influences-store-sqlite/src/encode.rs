//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings. Beatmap lists are compact JSON arrays.

use chrono::{DateTime, Utc};
use influences_core::{influence::Influence, user::BeatmapRef, user::User};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Beatmaps ────────────────────────────────────────────────────────────────

pub fn encode_beatmaps(beatmaps: &[BeatmapRef]) -> Result<String> {
  Ok(serde_json::to_string(beatmaps)?)
}

pub fn decode_beatmaps(s: &str) -> Result<Vec<BeatmapRef>> { Ok(serde_json::from_str(s)?) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `users` row plus its mention count.
pub struct RawUser {
  pub user_id:         u64,
  pub username:        String,
  pub avatar_url:      String,
  pub country:         String,
  pub have_ranked_map: bool,
  pub bio:             Option<String>,
  pub beatmaps:        String,
  pub mention_count:   u64,
}

impl RawUser {
  pub fn into_user(self) -> Result<User> {
    Ok(User {
      id:              self.user_id,
      username:        self.username,
      avatar_url:      self.avatar_url,
      country:         self.country,
      have_ranked_map: self.have_ranked_map,
      bio:             self.bio,
      beatmaps:        decode_beatmaps(&self.beatmaps)?,
      mention_count:   Some(self.mention_count),
    })
  }
}

/// Raw values read directly from an `influences` row.
pub struct RawInfluence {
  pub influenced_by:  u64,
  pub influenced_to:  u64,
  pub influence_type: u8,
  pub description:    Option<String>,
  pub beatmaps:       String,
  pub created_at:     String,
  pub modified_at:    String,
}

impl RawInfluence {
  pub fn into_influence(self) -> Result<Influence> {
    Ok(Influence {
      influenced_by:  self.influenced_by,
      influenced_to:  self.influenced_to,
      influence_type: self.influence_type,
      description:    self.description,
      beatmaps:       decode_beatmaps(&self.beatmaps)?,
      created_at:     decode_dt(&self.created_at)?,
      modified_at:    decode_dt(&self.modified_at)?,
    })
  }
}
