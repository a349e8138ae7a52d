//! [`OsuApi`] — one shared requester plus one batch cache per resource type.

use std::{collections::HashMap, sync::Arc};

use reqwest::{Method, Url};
use serde::de::DeserializeOwned;

use crate::{
  AuthContext, BatchCache, BeatmapsetSearch, CacheConfig, Error, OsuBeatmap, OsuBeatmapset,
  OsuBulkEndpoint, OsuUser, Requester, Result, UserBeatmapsetKind, UserSearch,
};

pub struct OsuApi {
  requester:   Arc<Requester>,
  base_url:    String,
  users:       BatchCache<OsuBulkEndpoint<OsuUser>>,
  beatmaps:    BatchCache<OsuBulkEndpoint<OsuBeatmap>>,
  beatmapsets: BatchCache<OsuBulkEndpoint<OsuBeatmapset>>,
}

impl OsuApi {
  /// `base_url` is the API root, e.g. `https://osu.ppy.sh/api/v2`.
  pub fn new(requester: Arc<Requester>, base_url: impl Into<String>, cache: CacheConfig) -> Self {
    let base_url = base_url.into().trim_end_matches('/').to_owned();
    let endpoint = |path: &str| format!("{base_url}/{path}");

    Self {
      users: BatchCache::with_config(
        OsuBulkEndpoint::new(requester.clone(), endpoint("users")),
        cache.clone(),
      ),
      beatmaps: BatchCache::with_config(
        OsuBulkEndpoint::new(requester.clone(), endpoint("beatmaps")),
        cache.clone(),
      ),
      beatmapsets: BatchCache::with_config(
        OsuBulkEndpoint::new(requester.clone(), endpoint("beatmapsets")),
        cache,
      ),
      requester,
      base_url,
    }
  }

  // ── Cached bulk lookups ─────────────────────────────────────────────────

  pub async fn users(&self, ids: &[u64], auth: &AuthContext) -> Result<HashMap<u64, OsuUser>> {
    self.users.get_many(ids, auth).await
  }

  pub async fn beatmaps(
    &self,
    ids: &[u64],
    auth: &AuthContext,
  ) -> Result<HashMap<u64, OsuBeatmap>> {
    self.beatmaps.get_many(ids, auth).await
  }

  pub async fn beatmapsets(
    &self,
    ids: &[u64],
    auth: &AuthContext,
  ) -> Result<HashMap<u64, OsuBeatmapset>> {
    self.beatmapsets.get_many(ids, auth).await
  }

  // ── Uncached lookups ────────────────────────────────────────────────────

  /// A single user, straight from `/users/{id}`.
  pub async fn user(&self, id: u64, auth: &AuthContext) -> Result<OsuUser> {
    self.get(&format!("{}/users/{id}", self.base_url), auth).await
  }

  /// One of the beatmapset lists on a user's profile.
  pub async fn user_beatmapsets(
    &self,
    user_id: u64,
    kind: UserBeatmapsetKind,
    auth: &AuthContext,
  ) -> Result<Vec<OsuBeatmapset>> {
    let url = format!("{}/users/{user_id}/beatmapsets/{kind}", self.base_url);
    self.get(&url, auth).await
  }

  pub async fn search_users(&self, query: &str, auth: &AuthContext) -> Result<UserSearch> {
    let url = Url::parse_with_params(
      &format!("{}/search", self.base_url),
      &[("mode", "user"), ("query", query)],
    )
    .map_err(|e| Error::InvalidUrl(e.to_string()))?;
    self.get(url.as_str(), auth).await
  }

  /// `query` is an already encoded query string, forwarded as is.
  pub async fn search_beatmapsets(
    &self,
    query: &str,
    auth: &AuthContext,
  ) -> Result<BeatmapsetSearch> {
    let mut url = format!("{}/beatmapsets/search", self.base_url);
    if !query.is_empty() {
      url.push('?');
      url.push_str(query);
    }
    self.get(&url, auth).await
  }

  async fn get<T: DeserializeOwned>(&self, url: &str, auth: &AuthContext) -> Result<T> {
    self.requester.request(Method::GET, url, auth.headers()?).await
  }
}
