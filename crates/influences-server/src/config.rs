//! Runtime configuration, layered from an optional TOML file and
//! `INFLUENCES_`-prefixed environment variables.
//!
//! Nested keys use a double underscore in the environment, e.g.
//! `INFLUENCES_OSU__CLIENT_SECRET` sets `osu.client_secret`.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use influences_osu::{CacheConfig, ClientCredentials, RequesterConfig};
use serde::Deserialize;

/// Server settings, deserialised from `config.toml` and the environment.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:              String,
  #[serde(default = "default_port")]
  pub port:              u16,
  #[serde(default = "default_store_path")]
  pub store_path:        PathBuf,
  /// HMAC secret for the `user_token` cookie.
  pub jwt_secret:        String,
  #[serde(default = "default_activity_capacity")]
  pub activity_capacity: usize,
  #[serde(default)]
  pub osu:               OsuConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OsuConfig {
  pub api_base_url:    String,
  pub token_url:       String,
  pub client_id:       String,
  pub client_secret:   String,
  pub max_connections: usize,
  pub timeout_secs:    u64,
  pub cache_ttl_secs:  u64,
  /// Replay and record upstream responses here instead of always calling out.
  pub fixture_dir:     Option<PathBuf>,
}

impl Default for OsuConfig {
  fn default() -> Self {
    Self {
      api_base_url:    "https://osu.ppy.sh/api/v2".into(),
      token_url:       "https://osu.ppy.sh/oauth/token".into(),
      client_id:       String::new(),
      client_secret:   String::new(),
      max_connections: 10,
      timeout_secs:    30,
      cache_ttl_secs:  6 * 60 * 60,
      fixture_dir:     None,
    }
  }
}

impl OsuConfig {
  pub fn requester_config(&self) -> RequesterConfig {
    // Client credentials are only needed to record fixtures.
    let credentials = (self.fixture_dir.is_some() && !self.client_id.is_empty()).then(|| {
      ClientCredentials {
        token_url:     self.token_url.clone(),
        client_id:     self.client_id.clone(),
        client_secret: self.client_secret.clone(),
      }
    });

    RequesterConfig {
      max_connections: self.max_connections,
      timeout: Duration::from_secs(self.timeout_secs),
      fixture_dir: self.fixture_dir.clone(),
      credentials,
    }
  }

  pub fn cache_config(&self) -> CacheConfig {
    CacheConfig { ttl: Duration::from_secs(self.cache_ttl_secs), ..Default::default() }
  }
}

fn default_host() -> String { "127.0.0.1".into() }

fn default_port() -> u16 { 8000 }

fn default_store_path() -> PathBuf { PathBuf::from("influences.db") }

fn default_activity_capacity() -> usize { influences_hub::DEFAULT_CAPACITY }

/// Read `path` (if it exists) and overlay the environment.
pub fn load(path: &Path) -> Result<ServerConfig, config::ConfigError> {
  config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(
      config::Environment::with_prefix("INFLUENCES")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true),
    )
    .build()?
    .try_deserialize()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn file_values_override_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
      &path,
      r#"
        jwt_secret = "s3cret"
        port = 9000

        [osu]
        client_id = "123"
        cache_ttl_secs = 60
        fixture_dir = "fixtures"
      "#,
    )
    .unwrap();

    let config = load(&path).unwrap();
    assert_eq!(config.port, 9000);
    assert_eq!(config.host, "127.0.0.1");
    assert_eq!(config.activity_capacity, 20);
    assert_eq!(config.osu.max_connections, 10);
    assert_eq!(config.osu.cache_config().ttl, Duration::from_secs(60));

    let requester = config.osu.requester_config();
    assert_eq!(requester.fixture_dir, Some(PathBuf::from("fixtures")));
    assert_eq!(requester.credentials.unwrap().client_id, "123");
  }

  #[test]
  fn missing_secret_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "port = 9000\n").unwrap();
    assert!(load(&path).is_err());
  }

  #[test]
  fn credentials_are_not_sent_outside_fixture_mode() {
    let osu = OsuConfig { client_id: "123".into(), ..Default::default() };
    assert!(osu.requester_config().credentials.is_none());
  }
}
