//! Handlers for `/users` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/users/me` | Caller's profile; 404 if never registered |
//! | `GET`    | `/users/{id}` | Signed-in callers only; 404 if not found |
//! | `POST`   | `/users/bio` | Body: `{"bio":"..."}` |
//! | `POST`   | `/users/add_beatmap` | Body: `{"id":1,"is_beatmapset":false}` |
//! | `DELETE` | `/users/remove_beatmap/{set\|diff}/{id}` | No-op if not listed |

use axum::{
  Json,
  extract::{Path, State},
};
use influences_core::{
  activity::ActivityDetails,
  store::UserStore,
  user::{BeatmapRef, User},
};
use serde::Deserialize;
use tracing::warn;

use crate::{
  AppState, Backend,
  auth::CurrentUser,
  error::ApiError,
  handlers::{record, register},
};

async fn load<S: Backend>(state: &AppState<S>, id: u64) -> Result<User, ApiError> {
  state
    .store
    .get_user(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("user {id} not found")))
}

// ─── Read ────────────────────────────────────────────────────────────────────

/// `GET /users/me`
///
/// Also refreshes the ranked-mapper flag from the osu! API. A failed refresh
/// is logged and the stored profile is returned as is.
pub async fn me<S: Backend>(
  State(state): State<AppState<S>>,
  caller: CurrentUser,
) -> Result<Json<User>, ApiError> {
  let id = caller.actor.id;
  let mut user = load(&state, id).await?;

  match state.osu.users(&[id], &caller.osu_auth()).await {
    Ok(found) => {
      if let Some(osu_user) = found.get(&id) {
        user.have_ranked_map = osu_user.has_ranked_map();
        state
          .store
          .set_ranked_map(id, user.have_ranked_map)
          .await
          .map_err(ApiError::store)?;
      }
    }
    Err(e) => warn!(user = id, "could not refresh ranked status: {e}"),
  }

  Ok(Json(user))
}

/// `GET /users/{id}`
pub async fn get_one<S: Backend>(
  State(state): State<AppState<S>>,
  _caller: CurrentUser,
  Path(id): Path<u64>,
) -> Result<Json<User>, ApiError> {
  Ok(Json(load(&state, id).await?))
}

// ─── Bio ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct BioBody {
  pub bio: String,
}

/// `POST /users/bio` — body: `{"bio":"..."}`
pub async fn update_bio<S: Backend>(
  State(state): State<AppState<S>>,
  caller: CurrentUser,
  Json(body): Json<BioBody>,
) -> Result<Json<User>, ApiError> {
  let actor = caller.actor;
  register(&state, &actor).await?;
  state
    .store
    .update_bio(actor.id, body.bio.clone())
    .await
    .map_err(ApiError::store)?;

  let id = actor.id;
  record(&state, actor, ActivityDetails::EditBio { description: body.bio }).await;
  Ok(Json(load(&state, id).await?))
}

// ─── Beatmaps ────────────────────────────────────────────────────────────────

/// `POST /users/add_beatmap` — body: `{"id":1,"is_beatmapset":false}`
pub async fn add_beatmap<S: Backend>(
  State(state): State<AppState<S>>,
  caller: CurrentUser,
  Json(beatmap): Json<BeatmapRef>,
) -> Result<Json<User>, ApiError> {
  let actor = caller.actor;
  register(&state, &actor).await?;
  state
    .store
    .add_beatmap(actor.id, beatmap)
    .await
    .map_err(ApiError::store)?;

  let id = actor.id;
  record(&state, actor, ActivityDetails::AddBeatmap { beatmap }).await;
  Ok(Json(load(&state, id).await?))
}

/// `DELETE /users/remove_beatmap/{set|diff}/{id}`
pub async fn remove_beatmap<S: Backend>(
  State(state): State<AppState<S>>,
  caller: CurrentUser,
  Path((kind, beatmap_id)): Path<(String, u64)>,
) -> Result<Json<User>, ApiError> {
  let is_beatmapset = match kind.as_str() {
    "set" => true,
    "diff" => false,
    other => {
      return Err(ApiError::BadRequest(format!(
        "invalid beatmap type {other:?}, expected 'set' or 'diff'"
      )));
    }
  };
  let beatmap = BeatmapRef { id: beatmap_id, is_beatmapset };

  let actor = caller.actor;
  register(&state, &actor).await?;
  let removed = state
    .store
    .remove_beatmap(actor.id, beatmap)
    .await
    .map_err(ApiError::store)?;
  let id = actor.id;
  // Nothing changed, so there is nothing to report.
  if removed {
    record(&state, actor, ActivityDetails::RemoveBeatmap { beatmap }).await;
  }
  Ok(Json(load(&state, id).await?))
}
