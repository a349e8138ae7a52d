//! [`BatchCache`] — per-resource cache that coalesces lookups by id into
//! chunked bulk requests.
//!
//! Every entry of one cache shares the same TTL, so entries expire in the
//! order they were inserted. The expiry sweep relies on that: it walks the
//! insertion log from the oldest end and stops at the first live record.
//! Giving entries individual lifetimes would break the sweep; it would then
//! need a full scan or a heap keyed by deadline.
//!
//! Re-inserting an id (it expired, or upstream returned it again) drops the
//! old entry and appends a fresh one at the tail with a new deadline. The old
//! log record stays behind as a tombstone and is skipped when it reaches the
//! front.

use std::{
  collections::{HashMap, HashSet, VecDeque},
  future::Future,
  marker::PhantomData,
  sync::{Arc, Mutex, MutexGuard, PoisonError},
  time::Duration,
};

use reqwest::{
  Method,
  header::{AUTHORIZATION, HeaderMap, HeaderValue},
};
use tokio::time::Instant;
use tracing::debug;

use crate::{Error, Requester, Result, models::BulkResource};

/// Upper bound on ids per bulk request.
pub const CHUNK_SIZE: usize = 50;

pub const DEFAULT_TTL: Duration = Duration::from_secs(6 * 60 * 60);

/// Anything the cache can key by a numeric id.
pub trait Identified {
  fn id(&self) -> u64;
}

// ─── Auth ────────────────────────────────────────────────────────────────────

/// Credentials of the caller a lookup is made on behalf of.
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
  token: Option<String>,
}

impl AuthContext {
  pub fn bearer(token: impl Into<String>) -> Self { Self { token: Some(token.into()) } }

  pub fn anonymous() -> Self { Self::default() }

  /// Request headers carrying the caller's token, if any.
  pub fn headers(&self) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    if let Some(token) = &self.token {
      let value = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|e| Error::Credentials(e.to_string()))?;
      headers.insert(AUTHORIZATION, value);
    }
    Ok(headers)
  }
}

// ─── Source ──────────────────────────────────────────────────────────────────

/// Where cache misses are resolved. Implementations return whichever of the
/// requested ids exist; missing ids are simply left out.
pub trait BulkSource: Send + Sync {
  type Item: Identified + Clone + Send + Sync + 'static;

  fn fetch_chunk<'a>(
    &'a self,
    ids: &'a [u64],
    auth: &'a AuthContext,
  ) -> impl Future<Output = Result<Vec<Self::Item>>> + Send + 'a;
}

/// A bulk endpoint of the osu! API, e.g. `/users` or `/beatmaps`, queried as
/// `GET <base_url>?ids[]=1&ids[]=2`.
pub struct OsuBulkEndpoint<T> {
  requester: Arc<Requester>,
  base_url:  String,
  _item:     PhantomData<fn() -> T>,
}

impl<T> OsuBulkEndpoint<T> {
  pub fn new(requester: Arc<Requester>, base_url: impl Into<String>) -> Self {
    Self { requester, base_url: base_url.into(), _item: PhantomData }
  }

  pub fn url_for(&self, ids: &[u64]) -> String {
    let separator = if self.base_url.contains('?') { '&' } else { '?' };
    let query = ids.iter().map(|id| format!("ids[]={id}")).collect::<Vec<_>>().join("&");
    format!("{}{separator}{query}", self.base_url)
  }
}

impl<T> BulkSource for OsuBulkEndpoint<T>
where
  T: BulkResource + Clone + Send + Sync + 'static,
{
  type Item = T;

  async fn fetch_chunk<'a>(&'a self, ids: &'a [u64], auth: &'a AuthContext) -> Result<Vec<T>> {
    let url = self.url_for(ids);
    let envelope: T::Envelope = self.requester.request(Method::GET, &url, auth.headers()?).await?;
    Ok(T::items(envelope))
  }
}

// ─── Cache ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CacheConfig {
  pub ttl:         Duration,
  pub chunk_size:  usize,
  /// Optional bound on stored entries; the oldest-inserted go first.
  pub max_entries: Option<usize>,
}

impl Default for CacheConfig {
  fn default() -> Self { Self { ttl: DEFAULT_TTL, chunk_size: CHUNK_SIZE, max_entries: None } }
}

struct Entry<T> {
  item: T,
  seq:  u64,
}

struct Record {
  id:         u64,
  seq:        u64,
  expires_at: Instant,
}

struct CacheState<T> {
  entries:  HashMap<u64, Entry<T>>,
  /// Insertion log, oldest first. Deadlines are non-decreasing.
  log:      VecDeque<Record>,
  next_seq: u64,
}

impl<T> CacheState<T> {
  fn sweep(&mut self, now: Instant) {
    while let Some(front) = self.log.front() {
      if front.expires_at > now {
        break;
      }
      if let Some(record) = self.log.pop_front() {
        self.evict(&record);
      }
    }
  }

  fn insert(&mut self, id: u64, item: T, expires_at: Instant) {
    let seq = self.next_seq;
    self.next_seq += 1;
    self.entries.insert(id, Entry { item, seq });
    self.log.push_back(Record { id, seq, expires_at });
  }

  fn shrink_to(&mut self, max_entries: usize) {
    while self.entries.len() > max_entries {
      let Some(record) = self.log.pop_front() else { break };
      self.evict(&record);
    }
  }

  /// Remove the entry `record` points at, unless it has since been replaced.
  fn evict(&mut self, record: &Record) {
    if self.entries.get(&record.id).is_some_and(|e| e.seq == record.seq) {
      self.entries.remove(&record.id);
    }
  }
}

/// Cache for one resource type. Construct one per type; ids of different
/// types overlap.
pub struct BatchCache<S: BulkSource> {
  source: S,
  config: CacheConfig,
  state:  Mutex<CacheState<S::Item>>,
}

impl<S: BulkSource> BatchCache<S> {
  pub fn new(source: S) -> Self { Self::with_config(source, CacheConfig::default()) }

  pub fn with_config(source: S, config: CacheConfig) -> Self {
    Self {
      source,
      config,
      state: Mutex::new(CacheState {
        entries:  HashMap::new(),
        log:      VecDeque::new(),
        next_seq: 0,
      }),
    }
  }

  pub fn source(&self) -> &S { &self.source }

  /// Number of stored entries, expired ones included until the next lookup
  /// sweeps them.
  pub fn len(&self) -> usize { self.lock().entries.len() }

  pub fn is_empty(&self) -> bool { self.len() == 0 }

  fn lock(&self) -> MutexGuard<'_, CacheState<S::Item>> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Resolve `ids`, serving live entries from memory and fetching the rest in
  /// chunks of at most `chunk_size`.
  ///
  /// Ids upstream does not know are absent from the result. A failing chunk
  /// aborts the call; chunks fetched before it stay cached.
  pub async fn get_many(&self, ids: &[u64], auth: &AuthContext) -> Result<HashMap<u64, S::Item>> {
    let mut found = HashMap::with_capacity(ids.len());
    let mut missing = Vec::new();

    {
      let mut state = self.lock();
      state.sweep(Instant::now());

      let mut seen = HashSet::with_capacity(ids.len());
      for &id in ids {
        if !seen.insert(id) {
          continue;
        }
        match state.entries.get(&id) {
          Some(entry) => {
            found.insert(id, entry.item.clone());
          }
          None => missing.push(id),
        }
      }
    }

    if missing.is_empty() {
      return Ok(found);
    }

    let chunk_size = self.config.chunk_size.max(1);
    debug!(
      hits = found.len(),
      misses = missing.len(),
      chunks = missing.len().div_ceil(chunk_size),
      "batch cache lookup"
    );

    for chunk in missing.chunks(chunk_size) {
      let items = self.source.fetch_chunk(chunk, auth).await?;

      let mut state = self.lock();
      let expires_at = Instant::now() + self.config.ttl;
      for item in items {
        let id = item.id();
        if chunk.contains(&id) {
          found.insert(id, item.clone());
        }
        state.insert(id, item, expires_at);
      }
      if let Some(max) = self.config.max_entries {
        state.shrink_to(max);
      }
    }

    Ok(found)
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};

  use super::*;

  #[derive(Debug, Clone, PartialEq)]
  struct Item(u64);

  impl Identified for Item {
    fn id(&self) -> u64 { self.0 }
  }

  /// Knows every id below `limit`, records each chunk it is asked for, and
  /// fails any chunk containing `poison`.
  #[derive(Default)]
  struct CountingSource {
    limit:  u64,
    poison: Option<u64>,
    calls:  AtomicUsize,
    chunks: Mutex<Vec<Vec<u64>>>,
  }

  impl CountingSource {
    fn knowing(limit: u64) -> Self { Self { limit, ..Default::default() } }

    fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
  }

  impl BulkSource for CountingSource {
    type Item = Item;

    async fn fetch_chunk<'a>(&'a self, ids: &'a [u64], _auth: &'a AuthContext) -> Result<Vec<Item>> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      self.chunks.lock().unwrap().push(ids.to_vec());
      if self.poison.is_some_and(|p| ids.contains(&p)) {
        return Err(Error::Upstream { status: 500, body: "boom".into() });
      }
      Ok(ids.iter().filter(|&&id| id < self.limit).map(|&id| Item(id)).collect())
    }
  }

  fn auth() -> AuthContext { AuthContext::bearer("token") }

  #[tokio::test]
  async fn misses_within_one_chunk_cost_one_call_and_hits_cost_none() {
    let cache = BatchCache::new(CountingSource::knowing(1000));

    let first = cache.get_many(&[1, 2, 3], &auth()).await.unwrap();
    assert_eq!(cache.source().calls(), 1);
    assert_eq!(first.len(), 3);
    assert_eq!(first[&2], Item(2));

    let second = cache.get_many(&[1, 2, 3], &auth()).await.unwrap();
    assert_eq!(cache.source().calls(), 1);
    assert_eq!(second, first);
  }

  #[tokio::test]
  async fn hits_and_misses_merge_into_one_mapping() {
    let cache = BatchCache::new(CountingSource::knowing(1000));
    cache.get_many(&[1, 2], &auth()).await.unwrap();

    let all = cache.get_many(&[1, 2, 3, 4], &auth()).await.unwrap();
    assert_eq!(all.len(), 4);
    assert_eq!(*cache.source().chunks.lock().unwrap().last().unwrap(), vec![3, 4]);
  }

  #[tokio::test]
  async fn misses_are_split_into_chunks_of_fifty() {
    let cache = BatchCache::new(CountingSource::knowing(1000));
    let ids: Vec<u64> = (0..120).collect();

    let found = cache.get_many(&ids, &auth()).await.unwrap();
    assert_eq!(found.len(), 120);

    let sizes: Vec<usize> = cache.source().chunks.lock().unwrap().iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![50, 50, 20]);
  }

  #[tokio::test]
  async fn unknown_ids_are_absent_not_errors() {
    let cache = BatchCache::new(CountingSource::knowing(10));
    let found = cache.get_many(&[5, 50], &auth()).await.unwrap();
    assert!(found.contains_key(&5));
    assert!(!found.contains_key(&50));
  }

  #[tokio::test]
  async fn duplicate_ids_are_fetched_once() {
    let cache = BatchCache::new(CountingSource::knowing(1000));
    let found = cache.get_many(&[7, 7, 8, 7], &auth()).await.unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(cache.source().chunks.lock().unwrap()[0], vec![7, 8]);
  }

  #[tokio::test(start_paused = true)]
  async fn entries_expire_after_the_ttl() {
    let config = CacheConfig { ttl: Duration::from_secs(60), ..Default::default() };
    let cache = BatchCache::with_config(CountingSource::knowing(1000), config);

    cache.get_many(&[1], &auth()).await.unwrap();
    tokio::time::advance(Duration::from_secs(30)).await;
    cache.get_many(&[2], &auth()).await.unwrap();
    assert_eq!(cache.source().calls(), 2);

    // 1 is past its deadline, 2 is not.
    tokio::time::advance(Duration::from_secs(31)).await;
    cache.get_many(&[1, 2], &auth()).await.unwrap();
    assert_eq!(cache.source().calls(), 3);
    assert_eq!(*cache.source().chunks.lock().unwrap().last().unwrap(), vec![1]);

    // The refreshed 1 lives a full TTL from its re-insertion.
    tokio::time::advance(Duration::from_secs(45)).await;
    cache.get_many(&[1], &auth()).await.unwrap();
    assert_eq!(cache.source().calls(), 3);
  }

  #[tokio::test]
  async fn failing_chunk_propagates_and_keeps_earlier_chunks() {
    let source = CountingSource { limit: 1000, poison: Some(110), ..Default::default() };
    let cache = BatchCache::new(source);
    let ids: Vec<u64> = (0..120).collect();

    let err = cache.get_many(&ids, &auth()).await.unwrap_err();
    assert!(matches!(err, Error::Upstream { status: 500, .. }));
    assert_eq!(cache.len(), 100);

    cache.get_many(&ids[..100], &auth()).await.unwrap();
    assert_eq!(cache.source().calls(), 3);
  }

  #[tokio::test]
  async fn max_entries_evicts_oldest_first() {
    let config = CacheConfig { max_entries: Some(3), ..Default::default() };
    let cache = BatchCache::with_config(CountingSource::knowing(1000), config);

    cache.get_many(&[1, 2, 3], &auth()).await.unwrap();
    cache.get_many(&[4], &auth()).await.unwrap();
    assert_eq!(cache.len(), 3);

    cache.get_many(&[2, 3, 4], &auth()).await.unwrap();
    assert_eq!(cache.source().calls(), 2);
    cache.get_many(&[1], &auth()).await.unwrap();
    assert_eq!(cache.source().calls(), 3);
  }

  #[test]
  fn bulk_url_repeats_the_ids_parameter() {
    let requester = Arc::new(Requester::new(Default::default()).unwrap());
    let endpoint =
      OsuBulkEndpoint::<crate::OsuUser>::new(requester, "https://osu.ppy.sh/api/v2/users");
    assert_eq!(endpoint.url_for(&[1, 2]), "https://osu.ppy.sh/api/v2/users?ids[]=1&ids[]=2");
  }

  #[test]
  fn auth_context_sets_bearer_header() {
    let headers = AuthContext::bearer("abc").headers().unwrap();
    assert_eq!(headers[AUTHORIZATION], "Bearer abc");
    assert!(AuthContext::anonymous().headers().unwrap().is_empty());
  }
}
