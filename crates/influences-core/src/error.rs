//! Error types for `influences-core`.

use thiserror::Error;

use crate::activity::ActivityKind;

#[derive(Debug, Error)]
pub enum Error {
  #[error("{kind} activity is missing its `{field}` detail")]
  MissingDetail {
    kind:  ActivityKind,
    field: &'static str,
  },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
