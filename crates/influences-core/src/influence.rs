//! Influence relationships between mappers.
//!
//! An influence is directed: `influenced_by` is the user who declares it and
//! `influenced_to` is the mapper they credit. At most one influence exists per
//! ordered pair; declaring it again replaces the previous one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::user::BeatmapRef;

/// A persisted influence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Influence {
  pub influenced_by:  u64,
  pub influenced_to:  u64,
  #[serde(rename = "type")]
  pub influence_type: u8,
  pub description:    Option<String>,
  pub beatmaps:       Vec<BeatmapRef>,
  pub created_at:     DateTime<Utc>,
  pub modified_at:    DateTime<Utc>,
}

/// Input to [`InfluenceStore::add_influence`](crate::store::InfluenceStore::add_influence).
/// Timestamps are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewInfluence {
  pub influenced_by:  u64,
  pub influenced_to:  u64,
  pub influence_type: u8,
  pub description:    Option<String>,
  pub beatmaps:       Vec<BeatmapRef>,
}

impl NewInfluence {
  pub fn new(influenced_by: u64, influenced_to: u64) -> Self {
    Self {
      influenced_by,
      influenced_to,
      influence_type: 1,
      description: None,
      beatmaps: Vec::new(),
    }
  }
}
