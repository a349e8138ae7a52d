//! HTTP and WebSocket surface of the mapper-influences backend.
//!
//! Exposes an axum [`Router`] over any store implementing the traits in
//! [`influences_core::store`], the shared [`ActivityHub`], and the osu! API
//! client. Process-wide services are constructed once at startup and reach
//! handlers through [`AppState`].

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::{
  Router,
  routing::{delete, get, post},
};
use influences_core::store::{ActivityStore, InfluenceStore, UserStore};
use influences_hub::ActivityHub;
use influences_osu::OsuApi;
use tower_http::trace::TraceLayer;

pub use config::{OsuConfig, ServerConfig};
pub use error::ApiError;

use handlers::{activity, influences, osu, users};

/// Everything the server needs from persistence.
pub trait Backend: ActivityStore + UserStore + InfluenceStore + 'static {}

impl<T> Backend for T where T: ActivityStore + UserStore + InfluenceStore + 'static {}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub store:  Arc<S>,
  pub hub:    Arc<ActivityHub>,
  pub osu:    Arc<OsuApi>,
  pub config: Arc<ServerConfig>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:  self.store.clone(),
      hub:    self.hub.clone(),
      osu:    self.osu.clone(),
      config: self.config.clone(),
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the full application router for `state`.
pub fn router<S: Backend>(state: AppState<S>) -> Router {
  Router::new()
    // Users
    .route("/users/me", get(users::me::<S>))
    .route("/users/bio", post(users::update_bio::<S>))
    .route("/users/add_beatmap", post(users::add_beatmap::<S>))
    .route("/users/remove_beatmap/{kind}/{id}", delete(users::remove_beatmap::<S>))
    .route("/users/{id}", get(users::get_one::<S>))
    // Influences
    .route("/influence", post(influences::create::<S>))
    .route(
      "/influence/{user_id}",
      get(influences::list::<S>).delete(influences::remove::<S>),
    )
    .route("/influence/{user_id}/mentions", get(influences::mentions::<S>))
    // Activity feed
    .route("/activity", get(activity::history::<S>))
    .route("/ws", get(activity::ws::<S>))
    // osu! API passthrough
    .route("/osu_api/user/{id}", get(osu::user::<S>))
    .route("/osu_api/users", get(osu::users::<S>))
    .route("/osu_api/beatmap/{id}", get(osu::beatmap::<S>))
    .route("/osu_api/user_beatmaps/{id}/{kind}", get(osu::user_beatmaps::<S>))
    .route("/osu_api/search/{query}", get(osu::search::<S>))
    .route("/osu_api/search_map", get(osu::search_map::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
