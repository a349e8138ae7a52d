//! Error type for `influences-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] influences_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A profile update targeted a user that was never registered.
  #[error("user not found: {0}")]
  UserNotFound(u64),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
