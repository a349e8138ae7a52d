//! Storage traits implemented by persistence backends
//! (e.g. `influences-store-sqlite`).
//!
//! Higher layers (`influences-hub`, `influences-server`) depend on these
//! abstractions, not on any concrete backend.
//!
//! All methods return `Send` futures so the traits can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`).

use std::future::Future;

use crate::{
  activity::{ActivityEvent, Actor},
  influence::{Influence, NewInfluence},
  user::{BeatmapRef, User},
};

// ─── Activities ──────────────────────────────────────────────────────────────

/// Durable log of accepted activity events.
pub trait ActivityStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Append an event to the log.
  fn save_event<'a>(
    &'a self,
    event: &'a ActivityEvent,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// The `limit` most recent events, ordered oldest first.
  fn load_recent_events(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<ActivityEvent>, Self::Error>> + Send + '_;
}

// ─── Users ───────────────────────────────────────────────────────────────────

pub trait UserStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Create the user or refresh their public identity, keeping bio and
  /// beatmaps intact.
  fn upsert_user(
    &self,
    actor: Actor,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Retrieve a user by id. Returns `None` if not registered.
  fn get_user(
    &self,
    id: u64,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn update_bio(
    &self,
    id: u64,
    bio: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Append a beatmap to the user's profile. Adding a beatmap that is
  /// already listed is a no-op.
  fn add_beatmap(
    &self,
    id: u64,
    beatmap: BeatmapRef,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Record whether the user has at least one ranked beatmapset.
  fn set_ranked_map(
    &self,
    id: u64,
    have_ranked_map: bool,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Remove a beatmap from the user's profile. Returns `false` if it was not
  /// listed.
  fn remove_beatmap(
    &self,
    id: u64,
    beatmap: BeatmapRef,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}

// ─── Influences ──────────────────────────────────────────────────────────────

pub trait InfluenceStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Insert or replace the influence for the `(influenced_by, influenced_to)`
  /// pair. `created_at` survives a replacement; `modified_at` does not.
  fn add_influence(
    &self,
    input: NewInfluence,
  ) -> impl Future<Output = Result<Influence, Self::Error>> + Send + '_;

  /// Returns `false` if no such influence existed.
  fn remove_influence(
    &self,
    influenced_by: u64,
    influenced_to: u64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Influences declared by `influenced_by`.
  fn list_influences(
    &self,
    influenced_by: u64,
  ) -> impl Future<Output = Result<Vec<Influence>, Self::Error>> + Send + '_;

  /// Influences that credit `influenced_to`.
  fn list_mentions(
    &self,
    influenced_to: u64,
  ) -> impl Future<Output = Result<Vec<Influence>, Self::Error>> + Send + '_;
}
