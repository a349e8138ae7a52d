//! Handlers for `/influence` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/influence` | Body: `{"influenced_to":2,"type":1,"description":"...","beatmaps":[]}` |
//! | `DELETE` | `/influence/{user_id}` | Withdraw the caller's influence toward `user_id` |
//! | `GET`    | `/influence/{user_id}` | Influences declared by `user_id` |
//! | `GET`    | `/influence/{user_id}/mentions` | Influences toward `user_id` |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use influences_core::{
  activity::{ActivityDetails, Actor},
  influence::{Influence, NewInfluence},
  store::{InfluenceStore, UserStore},
  user::BeatmapRef,
};
use serde::Deserialize;

use crate::{
  AppState, Backend,
  auth::CurrentUser,
  error::ApiError,
  handlers::{record, register},
};

/// The feed shows the target's stored identity when we have one.
async fn resolve_target<S: Backend>(state: &AppState<S>, id: u64) -> Result<Actor, ApiError> {
  let user = state.store.get_user(id).await.map_err(ApiError::store)?;
  Ok(user.map_or_else(
    || Actor::unknown(id),
    |u| Actor {
      id:         u.id,
      username:   u.username,
      avatar_url: u.avatar_url,
      country:    u.country,
    },
  ))
}

// ─── Create ──────────────────────────────────────────────────────────────────

fn default_type() -> u8 { 1 }

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub influenced_to:  u64,
  #[serde(rename = "type", default = "default_type")]
  pub influence_type: u8,
  pub description:    Option<String>,
  #[serde(default)]
  pub beatmaps:       Vec<BeatmapRef>,
}

/// `POST /influence`
pub async fn create<S: Backend>(
  State(state): State<AppState<S>>,
  caller: CurrentUser,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError> {
  let actor = caller.actor;
  if body.influenced_to == actor.id {
    return Err(ApiError::BadRequest("cannot add yourself as an influence".into()));
  }
  register(&state, &actor).await?;

  let influence = state
    .store
    .add_influence(NewInfluence {
      influenced_by:  actor.id,
      influenced_to:  body.influenced_to,
      influence_type: body.influence_type,
      description:    body.description.clone(),
      beatmaps:       body.beatmaps,
    })
    .await
    .map_err(ApiError::store)?;

  let target = resolve_target(&state, body.influenced_to).await?;
  record(
    &state,
    actor,
    ActivityDetails::AddInfluence { influenced_to: target, description: body.description },
  )
  .await;
  Ok((StatusCode::CREATED, Json(influence)))
}

// ─── Remove ──────────────────────────────────────────────────────────────────

/// `DELETE /influence/{user_id}`
pub async fn remove<S: Backend>(
  State(state): State<AppState<S>>,
  caller: CurrentUser,
  Path(influenced_to): Path<u64>,
) -> Result<StatusCode, ApiError> {
  let actor = caller.actor;
  let removed = state
    .store
    .remove_influence(actor.id, influenced_to)
    .await
    .map_err(ApiError::store)?;
  if !removed {
    return Err(ApiError::NotFound(format!("no influence toward user {influenced_to}")));
  }

  let target = resolve_target(&state, influenced_to).await?;
  record(&state, actor, ActivityDetails::RemoveInfluence { influenced_to: target }).await;
  Ok(StatusCode::NO_CONTENT)
}

// ─── List ────────────────────────────────────────────────────────────────────

/// `GET /influence/{user_id}`
pub async fn list<S: Backend>(
  State(state): State<AppState<S>>,
  Path(user_id): Path<u64>,
) -> Result<Json<Vec<Influence>>, ApiError> {
  let influences = state
    .store
    .list_influences(user_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(influences))
}

/// `GET /influence/{user_id}/mentions`
pub async fn mentions<S: Backend>(
  State(state): State<AppState<S>>,
  Path(user_id): Path<u64>,
) -> Result<Json<Vec<Influence>>, ApiError> {
  let influences = state
    .store
    .list_mentions(user_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(influences))
}
