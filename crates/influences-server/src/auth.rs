//! `user_token` cookie extractor.
//!
//! The cookie holds an HS256 JWT whose claims carry the caller's public osu!
//! identity and their osu! access token. Issuing the cookie (the OAuth login
//! flow) happens elsewhere; this module only verifies it.

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header::COOKIE, request::Parts},
};
use influences_core::activity::Actor;
use influences_osu::AuthContext;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{AppState, Backend, error::ApiError};

pub const COOKIE_NAME: &str = "user_token";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
  pub id:           u64,
  pub username:     String,
  pub avatar_url:   String,
  pub country:      String,
  pub access_token: String,
  /// Expiry as a unix timestamp.
  pub exp:          usize,
}

/// Sign `claims` into a cookie value.
pub fn issue_token(claims: &Claims, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
  encode(&Header::new(Algorithm::HS256), claims, &EncodingKey::from_secret(secret.as_bytes()))
}

/// Verify a cookie value and return its claims.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, ApiError> {
  decode::<Claims>(
    token,
    &DecodingKey::from_secret(secret.as_bytes()),
    &Validation::new(Algorithm::HS256),
  )
  .map(|data| data.claims)
  .map_err(|e| ApiError::Unauthorized(format!("invalid user token: {e}")))
}

fn cookie<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
  headers
    .get_all(COOKIE)
    .iter()
    .filter_map(|v| v.to_str().ok())
    .flat_map(|v| v.split(';'))
    .filter_map(|pair| pair.trim().split_once('='))
    .find_map(|(k, v)| (k == name).then_some(v))
}

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct CurrentUser {
  pub actor:        Actor,
  pub access_token: String,
}

impl CurrentUser {
  /// Credentials for osu! API calls made on the caller's behalf.
  pub fn osu_auth(&self) -> AuthContext { AuthContext::bearer(self.access_token.clone()) }
}

impl From<Claims> for CurrentUser {
  fn from(claims: Claims) -> Self {
    Self {
      actor:        Actor {
        id:         claims.id,
        username:   claims.username,
        avatar_url: claims.avatar_url,
        country:    claims.country,
      },
      access_token: claims.access_token,
    }
  }
}

impl<S: Backend> FromRequestParts<AppState<S>> for CurrentUser {
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let token = cookie(&parts.headers, COOKIE_NAME)
      .ok_or_else(|| ApiError::Unauthorized("missing user token".into()))?;
    let claims = verify_token(token, &state.config.jwt_secret)?;
    Ok(claims.into())
  }
}
