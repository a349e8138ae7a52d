//! [`ActivityHub`] — bounded activity history plus subscriber fan-out.
//!
//! Concurrency: all state lives behind one mutex. Proposal (dedup check,
//! append, evict, broadcast) and registration (history snapshot, initial send,
//! insert) each run as a single critical section, so a viewer never misses or
//! double-receives an event that is accepted while it registers. Sends only
//! `try_send` onto bounded per-viewer channels; the lock is never held
//! across I/O.

use std::{
  collections::VecDeque,
  sync::{Mutex, MutexGuard, PoisonError},
};

use influences_core::{
  activity::{ActivityDetails, ActivityEvent, Actor},
  store::ActivityStore,
};
use tracing::{debug, error, warn};

use crate::{
  dedup::is_duplicate,
  subscriber::{Subscriber, SubscriberId, SubscriberSender},
};

/// Number of events kept in the live history.
pub const DEFAULT_CAPACITY: usize = 20;

#[derive(Debug, Default)]
struct HubState {
  history:     VecDeque<ActivityEvent>,
  subscribers: Vec<Subscriber>,
}

/// Shared activity feed. Construct once at startup and hand out behind an
/// `Arc`.
#[derive(Debug)]
pub struct ActivityHub {
  capacity: usize,
  state:    Mutex<HubState>,
}

impl Default for ActivityHub {
  fn default() -> Self { Self::new(DEFAULT_CAPACITY) }
}

impl ActivityHub {
  pub fn new(capacity: usize) -> Self {
    Self {
      capacity,
      state: Mutex::new(HubState {
        history:     VecDeque::with_capacity(capacity + 1),
        subscribers: Vec::new(),
      }),
    }
  }

  /// Build a hub whose history starts as `events` (oldest first). Only the
  /// newest `capacity` events are kept. No dedup is applied to the seed.
  pub fn with_history(capacity: usize, events: impl IntoIterator<Item = ActivityEvent>) -> Self {
    let hub = Self::new(capacity);
    {
      let mut state = hub.lock();
      for event in events {
        state.history.push_back(event);
        if state.history.len() > capacity {
          state.history.pop_front();
        }
      }
    }
    hub
  }

  /// Build a hub seeded with the most recent persisted events so the feed
  /// survives restarts.
  pub async fn seeded<S: ActivityStore>(capacity: usize, store: &S) -> Result<Self, S::Error> {
    let events = store.load_recent_events(capacity).await?;
    debug!(count = events.len(), "seeded activity history");
    Ok(Self::with_history(capacity, events))
  }

  fn lock(&self) -> MutexGuard<'_, HubState> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  // ── Proposals ───────────────────────────────────────────────────────────

  /// Offer a new activity to the feed.
  ///
  /// Returns `None` if an equivalent event from the same actor is still in
  /// the history (the existing one is kept). Otherwise the event is appended,
  /// the oldest entry is evicted past capacity, the event is pushed to every
  /// live viewer, and an independent copy is returned for the caller to
  /// persist.
  pub fn propose(&self, actor: Actor, details: ActivityDetails) -> Option<ActivityEvent> {
    let mut state = self.lock();

    if state.history.iter().any(|existing| is_duplicate(existing, actor.id, &details)) {
      debug!(actor = actor.id, kind = %details.kind(), "suppressed duplicate activity");
      return None;
    }

    let event = ActivityEvent::new(actor, details);
    state.history.push_back(event.clone());
    if state.history.len() > self.capacity {
      state.history.pop_front();
    }

    match event.to_json() {
      Ok(frame) => Self::broadcast(&mut state, frame),
      Err(e) => error!("failed to render activity for broadcast: {e}"),
    }

    Some(event)
  }

  /// Push `frame` to every viewer, dropping the ones whose connection is gone.
  fn broadcast(state: &mut HubState, frame: String) {
    state.subscribers.retain(|subscriber| {
      let alive = subscriber.send(frame.clone());
      if !alive {
        warn!(subscriber = %subscriber.id, "dropping disconnected or lagging viewer");
      }
      alive
    });
  }

  // ── Viewers ─────────────────────────────────────────────────────────────

  /// Register a viewer. The whole current history is sent first, oldest to
  /// newest, as one JSON array. Returns `None` (and registers nothing) if
  /// that initial send fails.
  pub fn register(&self, sender: SubscriberSender) -> Option<SubscriberId> {
    let mut state = self.lock();
    let subscriber = Subscriber::new(sender);

    let frame = match serde_json::to_string(&state.history) {
      Ok(frame) => frame,
      Err(e) => {
        error!("failed to render activity history: {e}");
        return None;
      }
    };

    if !subscriber.send(frame) {
      return None;
    }

    let id = subscriber.id;
    state.subscribers.push(subscriber);
    debug!(subscriber = %id, viewers = state.subscribers.len(), "viewer registered");
    Some(id)
  }

  /// Returns `false` if the viewer was not registered (e.g. already dropped
  /// after a failed send).
  pub fn unregister(&self, id: SubscriberId) -> bool {
    let mut state = self.lock();
    let before = state.subscribers.len();
    state.subscribers.retain(|s| s.id != id);
    before != state.subscribers.len()
  }

  pub fn subscriber_count(&self) -> usize { self.lock().subscribers.len() }

  // ── History ─────────────────────────────────────────────────────────────

  /// Snapshot of the history, oldest first.
  pub fn history(&self) -> Vec<ActivityEvent> { self.lock().history.iter().cloned().collect() }

  /// Empty the in-memory history. Durable storage is untouched.
  pub fn clear(&self) { self.lock().history.clear(); }
}
