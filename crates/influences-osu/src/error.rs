//! Error type for `influences-osu`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The upstream answered 404.
  #[error("not found on osu! API: {url}")]
  NotFound { url: String },

  /// Any other non-200 answer. The body is kept for diagnostics.
  #[error("osu! API returned {status}: {body}")]
  Upstream { status: u16, body: String },

  /// A 200 answer whose body does not match the expected shape.
  #[error("unexpected response shape: {0}")]
  Parse(#[from] serde_json::Error),

  /// Connection, TLS, or timeout failure. Never retried here; callers decide.
  #[error("network error: {0}")]
  Transient(#[from] reqwest::Error),

  #[error("fixture i/o error: {0}")]
  Fixture(#[from] std::io::Error),

  #[error("could not obtain client credentials: {0}")]
  Credentials(String),

  #[error("invalid request url: {0}")]
  InvalidUrl(String),

  #[error("requester is closed")]
  Closed,
}

impl Error {
  pub fn is_transient(&self) -> bool { matches!(self, Self::Transient(_)) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
