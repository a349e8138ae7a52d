//! [`Requester`] — the one outbound HTTP gateway to the osu! API.

use std::{
  path::{Path, PathBuf},
  sync::atomic::{AtomicU64, Ordering},
  time::Duration,
};

use reqwest::{
  Client, Method, StatusCode,
  header::{AUTHORIZATION, HeaderMap, HeaderValue},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use sha2::{Digest, Sha256};
use tokio::sync::{OnceCell, Semaphore};
use tracing::{debug, error, info};

use crate::{Error, Result};

const USER_AGENT: &str = concat!("mapper-influences/", env!("CARGO_PKG_VERSION"));

// ─── Configuration ───────────────────────────────────────────────────────────

/// OAuth client-credentials used to authenticate fixture recordings.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
  pub token_url:     String,
  pub client_id:     String,
  pub client_secret: String,
}

#[derive(Debug, Clone)]
pub struct RequesterConfig {
  /// Ceiling on simultaneous outbound requests.
  pub max_connections: usize,
  pub timeout:         Duration,
  /// When set, responses are replayed from (and recorded into) this
  /// directory instead of always hitting the network.
  pub fixture_dir:     Option<PathBuf>,
  pub credentials:     Option<ClientCredentials>,
}

impl Default for RequesterConfig {
  fn default() -> Self {
    Self {
      max_connections: 10,
      timeout:         Duration::from_secs(30),
      fixture_dir:     None,
      credentials:     None,
    }
  }
}

// ─── Requester ───────────────────────────────────────────────────────────────

/// Shared gateway. Construct once at startup and hand out behind an `Arc`.
pub struct Requester {
  client:      Client,
  permits:     Semaphore,
  fixture_dir: Option<PathBuf>,
  credentials: Option<ClientCredentials>,
  token:       OnceCell<String>,
  scratch:     AtomicU64,
}

#[derive(Serialize)]
struct TokenRequest<'a> {
  client_id:     &'a str,
  client_secret: &'a str,
  grant_type:    &'static str,
  scope:         &'static str,
}

#[derive(Deserialize)]
struct TokenResponse {
  access_token: String,
}

impl Requester {
  pub fn new(config: RequesterConfig) -> Result<Self> {
    let max_connections = config.max_connections.max(1);
    let client = Client::builder()
      .user_agent(USER_AGENT)
      .timeout(config.timeout)
      .pool_max_idle_per_host(max_connections)
      .build()?;

    Ok(Self {
      client,
      permits: Semaphore::new(max_connections),
      fixture_dir: config.fixture_dir,
      credentials: config.credentials,
      token: OnceCell::new(),
      scratch: AtomicU64::new(0),
    })
  }

  /// Issue `method url` and parse a 200 body into `T`.
  ///
  /// In fixture mode a recorded response is returned without touching the
  /// network; a missing recording is fetched once with the client-credentials
  /// token, written to disk, and parsed.
  pub async fn request<T: DeserializeOwned>(
    &self,
    method: Method,
    url: &str,
    headers: HeaderMap,
  ) -> Result<T> {
    if self.is_closed() {
      return Err(Error::Closed);
    }

    let Some(dir) = &self.fixture_dir else {
      let body = self.send(method, url, headers).await?;
      return parse(&body);
    };

    let path = fixture_path(dir, &method, url);
    match tokio::fs::read_to_string(&path).await {
      Ok(body) => {
        debug!(%url, path = %path.display(), "replaying fixture");
        return parse(&body);
      }
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
      Err(e) => return Err(e.into()),
    }

    let mut headers = headers;
    if let Some(token) = self.access_token().await? {
      let value = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|e| Error::Credentials(e.to_string()))?;
      headers.insert(AUTHORIZATION, value);
    }

    let body = self.send(method, url, headers).await?;
    self.record(dir, &path, &body).await?;
    info!(%url, path = %path.display(), "recorded fixture");
    parse(&body)
  }

  /// Write a recording so that concurrent readers see either nothing or the
  /// whole body: the bytes go to a sibling scratch file that is then renamed
  /// into place.
  async fn record(&self, dir: &Path, path: &Path, body: &str) -> Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    let n = self.scratch.fetch_add(1, Ordering::Relaxed);
    let scratch = path.with_extension(format!("{}-{n}.tmp", std::process::id()));
    tokio::fs::write(&scratch, body).await?;
    if let Err(e) = tokio::fs::rename(&scratch, path).await {
      let _ = tokio::fs::remove_file(&scratch).await;
      return Err(e.into());
    }
    Ok(())
  }

  /// Stop accepting requests. In-flight requests finish; later ones fail
  /// with [`Error::Closed`]. The connection pool is released with the last
  /// handle.
  pub fn close(&self) {
    self.permits.close();
    info!("osu! requester closed");
  }

  pub fn is_closed(&self) -> bool { self.permits.is_closed() }

  async fn send(&self, method: Method, url: &str, headers: HeaderMap) -> Result<String> {
    let _permit = self.permits.acquire().await.map_err(|_| Error::Closed)?;

    debug!(%method, %url, "osu! API request");
    let response = self.client.request(method, url).headers(headers).send().await?;
    let status = response.status();
    let body = response.text().await?;

    if status == StatusCode::NOT_FOUND {
      return Err(Error::NotFound { url: url.to_owned() });
    }
    if status != StatusCode::OK {
      error!(%status, %url, %body, "osu! API request failed");
      return Err(Error::Upstream { status: status.as_u16(), body });
    }
    Ok(body)
  }

  /// The client-credentials token, fetched on first use and then reused for
  /// the lifetime of the requester. `None` when no credentials are configured.
  async fn access_token(&self) -> Result<Option<&str>> {
    let Some(creds) = &self.credentials else {
      return Ok(None);
    };
    let token = self.token.get_or_try_init(|| self.fetch_token(creds)).await?;
    Ok(Some(token.as_str()))
  }

  async fn fetch_token(&self, creds: &ClientCredentials) -> Result<String> {
    let _permit = self.permits.acquire().await.map_err(|_| Error::Closed)?;

    let response = self
      .client
      .post(&creds.token_url)
      .json(&TokenRequest {
        client_id:     &creds.client_id,
        client_secret: &creds.client_secret,
        grant_type:    "client_credentials",
        scope:         "identify public",
      })
      .send()
      .await?;

    if !response.status().is_success() {
      return Err(Error::Credentials(format!(
        "token endpoint returned {}",
        response.status()
      )));
    }
    let token: TokenResponse = response
      .json()
      .await
      .map_err(|e| Error::Credentials(e.to_string()))?;
    info!("obtained client-credentials token");
    Ok(token.access_token)
  }
}

fn parse<T: DeserializeOwned>(body: &str) -> Result<T> { Ok(serde_json::from_str(body)?) }

/// Where the recording for `method url` lives inside `dir`.
///
/// The name is `<METHOD>-<sha256 hex of "METHOD URL">.json`, so it is stable
/// across runs and safe for any URL.
pub fn fixture_path(dir: &Path, method: &Method, url: &str) -> PathBuf {
  let mut hasher = Sha256::new();
  hasher.update(method.as_str().as_bytes());
  hasher.update(b" ");
  hasher.update(url.as_bytes());
  dir.join(format!("{}-{}.json", method.as_str(), hex::encode(hasher.finalize())))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fixture_path_is_stable_and_distinguishes_method() {
    let dir = Path::new("fixtures");
    let a = fixture_path(dir, &Method::GET, "https://osu.ppy.sh/api/v2/users/2");
    let b = fixture_path(dir, &Method::GET, "https://osu.ppy.sh/api/v2/users/2");
    let c = fixture_path(dir, &Method::POST, "https://osu.ppy.sh/api/v2/users/2");

    assert_eq!(a, b);
    assert_ne!(a, c);
    let name = a.file_name().unwrap().to_str().unwrap();
    assert!(name.starts_with("GET-") && name.ends_with(".json"), "{name}");
  }
}
