//! Route handlers, one module per resource.

pub mod activity;
pub mod influences;
pub mod osu;
pub mod users;

use influences_core::{
  activity::{ActivityDetails, Actor},
  store::{ActivityStore, UserStore},
};
use tracing::warn;

use crate::{AppState, Backend, error::ApiError};

/// Offer an activity to the hub and persist it if accepted.
///
/// Called after the mutation it describes has succeeded. A suppressed
/// duplicate or a failed save never fails the request.
pub(crate) async fn record<S: Backend>(state: &AppState<S>, actor: Actor, details: ActivityDetails) {
  let Some(event) = state.hub.propose(actor, details) else {
    return;
  };
  if let Err(e) = state.store.save_event(&event).await {
    warn!(kind = %event.kind(), actor = event.actor().id, "failed to persist activity: {e}");
  }
}

/// Make sure the caller has a stored profile, refreshing its public identity.
pub(crate) async fn register<S: Backend>(state: &AppState<S>, actor: &Actor) -> Result<(), ApiError> {
  state.store.upsert_user(actor.clone()).await.map_err(ApiError::store)
}
