//! Client side of the osu! API v2.
//!
//! - [`Requester`]: the single outbound gateway. Caps concurrent connections,
//!   maps HTTP failures onto [`Error`], parses typed bodies, and can replay
//!   recorded responses from a fixture directory.
//! - [`BatchCache`]: per-resource-type cache that coalesces lookups by id into
//!   chunked bulk requests.
//! - [`OsuApi`]: the bundle the server holds: one shared requester plus one
//!   cache per resource type.

mod api;
mod cache;
mod error;
mod models;
mod requester;

pub use api::OsuApi;
pub use cache::{
  AuthContext, BatchCache, BulkSource, CHUNK_SIZE, CacheConfig, DEFAULT_TTL, Identified,
  OsuBulkEndpoint,
};
pub use error::{Error, Result};
pub use models::{
  BeatmapsetSearch, BulkResource, OsuBeatmap, OsuBeatmapset, OsuCovers, OsuUser,
  UnknownBeatmapsetKind, UserBeatmapsetKind, UserSearch, UserSearchPage,
};
pub use requester::{ClientCredentials, Requester, RequesterConfig, fixture_path};
