//! Pass-through lookups against the osu! API, made with the caller's access
//! token.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/osu_api/user/{id}` | Single user |
//! | `GET`  | `/osu_api/users?ids=1,2,3` | Cached bulk lookup, request order |
//! | `GET`  | `/osu_api/beatmap/{id}` | Cached; optional `?type=beatmap\|beatmapset` (default `beatmapset`) |
//! | `GET`  | `/osu_api/user_beatmaps/{id}/{type}` | A profile list, e.g. `ranked` or `guest` |
//! | `GET`  | `/osu_api/search/{query}` | User search |
//! | `GET`  | `/osu_api/search_map?...` | Beatmapset search, query string forwarded as is |

use std::collections::HashSet;

use axum::{
  Json,
  extract::{Path, Query, RawQuery, State},
};
use influences_osu::{BeatmapsetSearch, OsuBeatmapset, OsuUser, UserBeatmapsetKind, UserSearch};
use serde::Deserialize;

use crate::{AppState, Backend, auth::CurrentUser, error::ApiError};

/// `GET /osu_api/user/{id}`
pub async fn user<S: Backend>(
  State(state): State<AppState<S>>,
  caller: CurrentUser,
  Path(id): Path<u64>,
) -> Result<Json<OsuUser>, ApiError> {
  Ok(Json(state.osu.user(id, &caller.osu_auth()).await?))
}

#[derive(Debug, Deserialize)]
pub struct UsersParams {
  pub ids: String,
}

fn parse_ids(raw: &str) -> Result<Vec<u64>, ApiError> {
  let mut seen = HashSet::new();
  let mut ids = Vec::new();
  for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
    let id = part
      .parse::<u64>()
      .map_err(|_| ApiError::BadRequest(format!("invalid user id {part:?}")))?;
    if seen.insert(id) {
      ids.push(id);
    }
  }
  Ok(ids)
}

/// `GET /osu_api/users?ids=1,2,3`
///
/// Ids the API does not know are left out of the response.
pub async fn users<S: Backend>(
  State(state): State<AppState<S>>,
  caller: CurrentUser,
  Query(params): Query<UsersParams>,
) -> Result<Json<Vec<OsuUser>>, ApiError> {
  let ids = parse_ids(&params.ids)?;
  let mut found = state.osu.users(&ids, &caller.osu_auth()).await?;
  Ok(Json(ids.iter().filter_map(|id| found.remove(id)).collect()))
}

#[derive(Debug, Deserialize)]
pub struct BeatmapParams {
  #[serde(rename = "type")]
  pub kind: Option<String>,
}

fn not_on_osu() -> ApiError {
  ApiError::NotFound("Searched item could not be found on osu! API".into())
}

/// `GET /osu_api/beatmap/{id}[?type=beatmap|beatmapset]`
///
/// Always answers with the beatmapset. With `type=beatmap`, `id` names a
/// difficulty and its parent set is returned. Both lookups go through the
/// batch caches.
pub async fn beatmap<S: Backend>(
  State(state): State<AppState<S>>,
  caller: CurrentUser,
  Path(id): Path<u64>,
  Query(params): Query<BeatmapParams>,
) -> Result<Json<OsuBeatmapset>, ApiError> {
  let auth = caller.osu_auth();
  let set_id = match params.kind.as_deref() {
    None | Some("beatmapset") => id,
    Some("beatmap") => {
      let mut found = state.osu.beatmaps(&[id], &auth).await?;
      found.remove(&id).ok_or_else(not_on_osu)?.beatmapset_id
    }
    Some(_) => {
      return Err(ApiError::BadRequest(
        "Invalid type, type can be 'beatmap' or 'beatmapset'".into(),
      ));
    }
  };

  let mut found = state.osu.beatmapsets(&[set_id], &auth).await?;
  Ok(Json(found.remove(&set_id).ok_or_else(not_on_osu)?))
}

/// `GET /osu_api/user_beatmaps/{id}/{type}`
pub async fn user_beatmaps<S: Backend>(
  State(state): State<AppState<S>>,
  caller: CurrentUser,
  Path((user_id, kind)): Path<(u64, String)>,
) -> Result<Json<Vec<OsuBeatmapset>>, ApiError> {
  let kind = kind
    .parse::<UserBeatmapsetKind>()
    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
  Ok(Json(state.osu.user_beatmapsets(user_id, kind, &caller.osu_auth()).await?))
}

/// `GET /osu_api/search/{query}`
pub async fn search<S: Backend>(
  State(state): State<AppState<S>>,
  caller: CurrentUser,
  Path(query): Path<String>,
) -> Result<Json<UserSearch>, ApiError> {
  Ok(Json(state.osu.search_users(&query, &caller.osu_auth()).await?))
}

/// `GET /osu_api/search_map?...`
pub async fn search_map<S: Backend>(
  State(state): State<AppState<S>>,
  caller: CurrentUser,
  RawQuery(query): RawQuery,
) -> Result<Json<BeatmapsetSearch>, ApiError> {
  let query = query.unwrap_or_default();
  Ok(Json(state.osu.search_beatmapsets(&query, &caller.osu_auth()).await?))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn ids_are_parsed_in_order_without_duplicates() {
    assert_eq!(parse_ids("3, 1,3,,2").unwrap(), vec![3, 1, 2]);
    assert!(matches!(parse_ids("1,abc"), Err(ApiError::BadRequest(_))));
  }
}
