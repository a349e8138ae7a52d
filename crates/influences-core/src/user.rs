//! Registered mappers and the beatmaps they showcase on their profile.

use serde::{Deserialize, Serialize};

/// A reference to either a single difficulty or a whole beatmapset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BeatmapRef {
  pub id:            u64,
  pub is_beatmapset: bool,
}

/// A registered user as stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub id:              u64,
  pub username:        String,
  pub avatar_url:      String,
  pub country:         String,
  #[serde(default)]
  pub have_ranked_map: bool,
  pub bio:             Option<String>,
  #[serde(default)]
  pub beatmaps:        Vec<BeatmapRef>,
  /// How many other users list this one as an influence.
  pub mention_count:   Option<u64>,
}
