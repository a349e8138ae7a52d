//! Typed shapes of the osu! API responses this service reads.
//!
//! Only the fields the service uses are declared; everything else the API
//! returns is ignored on deserialisation.

use std::{fmt, str::FromStr};

use influences_core::activity::Actor;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::cache::Identified;

// ─── Users ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OsuUser {
  pub id:                      u64,
  pub username:                String,
  pub avatar_url:              String,
  pub country_code:            String,
  #[serde(default)]
  pub ranked_beatmapset_count: u64,
}

impl OsuUser {
  pub fn has_ranked_map(&self) -> bool { self.ranked_beatmapset_count > 0 }
}

impl From<OsuUser> for Actor {
  fn from(user: OsuUser) -> Self {
    Actor {
      id:         user.id,
      username:   user.username,
      avatar_url: user.avatar_url,
      country:    user.country_code,
    }
  }
}

impl Identified for OsuUser {
  fn id(&self) -> u64 { self.id }
}

// ─── Beatmaps ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OsuCovers {
  pub cover:    Option<String>,
  #[serde(rename = "cover@2x")]
  pub cover_2x: Option<String>,
  pub card:     Option<String>,
  pub list:     Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OsuBeatmapset {
  pub id:      u64,
  pub title:   String,
  pub artist:  String,
  pub creator: String,
  pub user_id: u64,
  #[serde(default)]
  pub status:  Option<String>,
  #[serde(default)]
  pub covers:  Option<OsuCovers>,
}

impl Identified for OsuBeatmapset {
  fn id(&self) -> u64 { self.id }
}

/// A single difficulty. The bulk endpoint embeds its parent set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OsuBeatmap {
  pub id:                u64,
  pub beatmapset_id:     u64,
  pub version:           String,
  #[serde(default)]
  pub difficulty_rating: f64,
  #[serde(default)]
  pub mode:              Option<String>,
  #[serde(default)]
  pub beatmapset:        Option<OsuBeatmapset>,
}

impl Identified for OsuBeatmap {
  fn id(&self) -> u64 { self.id }
}

/// The beatmapset lists on a user's profile that hold plain beatmapsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserBeatmapsetKind {
  Favourite,
  Graveyard,
  Guest,
  Loved,
  Nominated,
  Pending,
  Ranked,
}

impl UserBeatmapsetKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Favourite => "favourite",
      Self::Graveyard => "graveyard",
      Self::Guest => "guest",
      Self::Loved => "loved",
      Self::Nominated => "nominated",
      Self::Pending => "pending",
      Self::Ranked => "ranked",
    }
  }
}

impl fmt::Display for UserBeatmapsetKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Error)]
#[error("unknown beatmapset list {0:?}")]
pub struct UnknownBeatmapsetKind(pub String);

impl FromStr for UserBeatmapsetKind {
  type Err = UnknownBeatmapsetKind;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Ok(match s {
      "favourite" => Self::Favourite,
      "graveyard" => Self::Graveyard,
      "guest" => Self::Guest,
      "loved" => Self::Loved,
      "nominated" => Self::Nominated,
      "pending" => Self::Pending,
      "ranked" => Self::Ranked,
      other => return Err(UnknownBeatmapsetKind(other.to_owned())),
    })
  }
}

// ─── Search ──────────────────────────────────────────────────────────────────

/// `GET /search?mode=user`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSearch {
  pub user: UserSearchPage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSearchPage {
  pub data:  Vec<OsuUser>,
  #[serde(default)]
  pub total: u64,
}

/// `GET /beatmapsets/search`. `cursor_string` pages through further results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatmapsetSearch {
  pub beatmapsets:   Vec<OsuBeatmapset>,
  #[serde(default)]
  pub cursor_string: Option<String>,
  #[serde(default)]
  pub total:         Option<u64>,
}

// ─── Bulk envelopes ──────────────────────────────────────────────────────────

/// A resource that the API can return many of at once, wrapped in a
/// resource-specific envelope object.
pub trait BulkResource: Identified + Sized {
  type Envelope: DeserializeOwned + Send;

  fn items(envelope: Self::Envelope) -> Vec<Self>;
}

#[derive(Deserialize)]
pub struct UsersEnvelope {
  users: Vec<OsuUser>,
}

#[derive(Deserialize)]
pub struct BeatmapsEnvelope {
  beatmaps: Vec<OsuBeatmap>,
}

#[derive(Deserialize)]
pub struct BeatmapsetsEnvelope {
  beatmapsets: Vec<OsuBeatmapset>,
}

impl BulkResource for OsuUser {
  type Envelope = UsersEnvelope;

  fn items(envelope: UsersEnvelope) -> Vec<Self> { envelope.users }
}

impl BulkResource for OsuBeatmap {
  type Envelope = BeatmapsEnvelope;

  fn items(envelope: BeatmapsEnvelope) -> Vec<Self> { envelope.beatmaps }
}

impl BulkResource for OsuBeatmapset {
  type Envelope = BeatmapsetsEnvelope;

  fn items(envelope: BeatmapsetsEnvelope) -> Vec<Self> { envelope.beatmapsets }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn user_ignores_unknown_fields_and_converts_to_actor() {
    let user: OsuUser = serde_json::from_str(
      r#"{"id":2,"username":"peppy","avatar_url":"https://a.ppy.sh/2",
          "country_code":"AU","is_bot":false,"ranked_beatmapset_count":3}"#,
    )
    .unwrap();
    assert!(user.has_ranked_map());

    let actor = Actor::from(user);
    assert_eq!(actor.id, 2);
    assert_eq!(actor.country, "AU");
  }

  #[test]
  fn beatmaps_envelope_unwraps_items() {
    let envelope: BeatmapsEnvelope = serde_json::from_str(
      r#"{"beatmaps":[{"id":10,"beatmapset_id":1,"version":"Insane",
          "beatmapset":{"id":1,"title":"t","artist":"a","creator":"c","user_id":2,
          "covers":{"cover":"x","cover@2x":"y"}}}]}"#,
    )
    .unwrap();
    let items = OsuBeatmap::items(envelope);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id(), 10);
    let covers = items[0].beatmapset.as_ref().unwrap().covers.as_ref().unwrap();
    assert_eq!(covers.cover_2x.as_deref(), Some("y"));
  }

  #[test]
  fn beatmapset_list_kinds_parse_from_path_segments() {
    assert_eq!("guest".parse::<UserBeatmapsetKind>().unwrap(), UserBeatmapsetKind::Guest);
    assert_eq!(UserBeatmapsetKind::Favourite.to_string(), "favourite");
    // Most-played entries are play counts, not beatmapsets.
    assert!("most_played".parse::<UserBeatmapsetKind>().is_err());
  }

  #[test]
  fn user_search_reads_the_user_page() {
    let search: UserSearch = serde_json::from_str(
      r#"{"user":{"data":[{"id":2,"username":"peppy","avatar_url":"a","country_code":"AU"}],
          "total":1},"wiki_page":{"data":[],"total":0}}"#,
    )
    .unwrap();
    assert_eq!(search.user.total, 1);
    assert_eq!(search.user.data[0].username, "peppy");
  }
}
