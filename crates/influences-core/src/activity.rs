//! Activity events: the entries of the live activity feed.
//!
//! An event records that an actor did something worth showing to other
//! mappers: edited their bio, added or removed a beatmap, or declared or
//! withdrew an influence. Events are immutable once created.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, user::BeatmapRef};

// ─── Actor ───────────────────────────────────────────────────────────────────

/// The public identity of a user as shown in the activity feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
  pub id:         u64,
  pub username:   String,
  pub avatar_url: String,
  pub country:    String,
}

impl Actor {
  /// A placeholder for a user we only know by id.
  pub fn unknown(id: u64) -> Self {
    Self {
      id,
      username: String::new(),
      avatar_url: String::new(),
      country: String::new(),
    }
  }
}

// ─── Kind and group ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityKind {
  EditBio,
  AddBeatmap,
  RemoveBeatmap,
  AddInfluence,
  RemoveInfluence,
}

impl ActivityKind {
  pub fn group(self) -> ActivityGroup {
    match self {
      Self::EditBio => ActivityGroup::Bio,
      Self::AddBeatmap | Self::RemoveBeatmap => ActivityGroup::Beatmap,
      Self::AddInfluence => ActivityGroup::InfluenceAdd,
      Self::RemoveInfluence => ActivityGroup::InfluenceRemove,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::EditBio => "EDIT_BIO",
      Self::AddBeatmap => "ADD_BEATMAP",
      Self::RemoveBeatmap => "REMOVE_BEATMAP",
      Self::AddInfluence => "ADD_INFLUENCE",
      Self::RemoveInfluence => "REMOVE_INFLUENCE",
    }
  }
}

impl fmt::Display for ActivityKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Coarse classification used only when comparing events for duplicates.
/// Never serialised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityGroup {
  Bio,
  Beatmap,
  InfluenceAdd,
  InfluenceRemove,
}

// ─── Details ─────────────────────────────────────────────────────────────────

/// What happened. One variant per [`ActivityKind`]; the kind is derived from
/// the variant so the two can never disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityDetails {
  EditBio {
    description: String,
  },
  AddBeatmap {
    beatmap: BeatmapRef,
  },
  RemoveBeatmap {
    beatmap: BeatmapRef,
  },
  AddInfluence {
    influenced_to: Actor,
    description:   Option<String>,
  },
  RemoveInfluence {
    influenced_to: Actor,
  },
}

impl ActivityDetails {
  pub fn kind(&self) -> ActivityKind {
    match self {
      Self::EditBio { .. } => ActivityKind::EditBio,
      Self::AddBeatmap { .. } => ActivityKind::AddBeatmap,
      Self::RemoveBeatmap { .. } => ActivityKind::RemoveBeatmap,
      Self::AddInfluence { .. } => ActivityKind::AddInfluence,
      Self::RemoveInfluence { .. } => ActivityKind::RemoveInfluence,
    }
  }

  pub fn group(&self) -> ActivityGroup { self.kind().group() }

  pub fn beatmap(&self) -> Option<&BeatmapRef> {
    match self {
      Self::AddBeatmap { beatmap } | Self::RemoveBeatmap { beatmap } => Some(beatmap),
      _ => None,
    }
  }

  pub fn influenced_to(&self) -> Option<&Actor> {
    match self {
      Self::AddInfluence { influenced_to, .. }
      | Self::RemoveInfluence { influenced_to } => Some(influenced_to),
      _ => None,
    }
  }

  pub fn description(&self) -> Option<&str> {
    match self {
      Self::EditBio { description } => Some(description),
      Self::AddInfluence { description, .. } => description.as_deref(),
      _ => None,
    }
  }
}

// ─── Event ───────────────────────────────────────────────────────────────────

/// A single entry in the activity feed.
///
/// Serialises to the flat wire shape consumed by the frontend:
///
/// ```json
/// {
///   "type": "ADD_BEATMAP",
///   "user": { "id": 1, "username": "...", "avatar_url": "...", "country": "TR" },
///   "datetime": "2024-05-01T12:00:00Z",
///   "details": { "influenced_to": null, "beatmap": { "id": 7, "is_beatmapset": false }, "description": null }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "RawActivity", try_from = "RawActivity")]
pub struct ActivityEvent {
  actor:    Actor,
  datetime: DateTime<Utc>,
  details:  ActivityDetails,
}

impl ActivityEvent {
  /// Create an event stamped with the current time.
  pub fn new(actor: Actor, details: ActivityDetails) -> Self {
    Self::at(actor, details, Utc::now())
  }

  pub fn at(actor: Actor, details: ActivityDetails, datetime: DateTime<Utc>) -> Self {
    Self { actor, datetime, details }
  }

  pub fn kind(&self) -> ActivityKind { self.details.kind() }

  pub fn group(&self) -> ActivityGroup { self.details.group() }

  pub fn actor(&self) -> &Actor { &self.actor }

  pub fn datetime(&self) -> DateTime<Utc> { self.datetime }

  pub fn details(&self) -> &ActivityDetails { &self.details }

  /// Render the wire form as a JSON string.
  pub fn to_json(&self) -> crate::Result<String> { Ok(serde_json::to_string(self)?) }
}

// ─── Wire form ───────────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
struct RawActivity {
  #[serde(rename = "type")]
  kind:     ActivityKind,
  user:     Actor,
  datetime: DateTime<Utc>,
  #[serde(default)]
  details:  RawDetails,
}

#[derive(Default, Serialize, Deserialize)]
struct RawDetails {
  influenced_to: Option<Actor>,
  beatmap:       Option<BeatmapRef>,
  description:   Option<String>,
}

impl From<ActivityEvent> for RawActivity {
  fn from(event: ActivityEvent) -> Self {
    let kind = event.kind();
    let details = match event.details {
      ActivityDetails::EditBio { description } => RawDetails {
        description: Some(description),
        ..Default::default()
      },
      ActivityDetails::AddBeatmap { beatmap } | ActivityDetails::RemoveBeatmap { beatmap } => {
        RawDetails { beatmap: Some(beatmap), ..Default::default() }
      }
      ActivityDetails::AddInfluence { influenced_to, description } => RawDetails {
        influenced_to: Some(influenced_to),
        description,
        ..Default::default()
      },
      ActivityDetails::RemoveInfluence { influenced_to } => RawDetails {
        influenced_to: Some(influenced_to),
        ..Default::default()
      },
    };
    Self { kind, user: event.actor, datetime: event.datetime, details }
  }
}

impl TryFrom<RawActivity> for ActivityEvent {
  type Error = Error;

  fn try_from(raw: RawActivity) -> Result<Self, Self::Error> {
    let kind = raw.kind;
    let missing = |field| Error::MissingDetail { kind, field };
    let d = raw.details;

    let details = match kind {
      ActivityKind::EditBio => ActivityDetails::EditBio {
        description: d.description.ok_or_else(|| missing("description"))?,
      },
      ActivityKind::AddBeatmap => ActivityDetails::AddBeatmap {
        beatmap: d.beatmap.ok_or_else(|| missing("beatmap"))?,
      },
      ActivityKind::RemoveBeatmap => ActivityDetails::RemoveBeatmap {
        beatmap: d.beatmap.ok_or_else(|| missing("beatmap"))?,
      },
      ActivityKind::AddInfluence => ActivityDetails::AddInfluence {
        influenced_to: d.influenced_to.ok_or_else(|| missing("influenced_to"))?,
        description:   d.description,
      },
      ActivityKind::RemoveInfluence => ActivityDetails::RemoveInfluence {
        influenced_to: d.influenced_to.ok_or_else(|| missing("influenced_to"))?,
      },
    };

    Ok(Self { actor: raw.user, datetime: raw.datetime, details })
  }
}
