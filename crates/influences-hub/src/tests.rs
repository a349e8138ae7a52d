//! Behavioural tests for the activity hub: dedup, FIFO window, fan-out.

use std::convert::Infallible;

use chrono::{TimeZone, Utc};
use influences_core::{
  activity::{ActivityDetails, ActivityEvent, ActivityKind, Actor},
  store::ActivityStore,
  user::BeatmapRef,
};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::{ActivityHub, DEFAULT_CAPACITY, is_duplicate};

fn actor(id: u64) -> Actor {
  Actor {
    id,
    username:   format!("mapper{id}"),
    avatar_url: format!("https://a.ppy.sh/{id}"),
    country:    "TR".into(),
  }
}

fn bio(text: &str) -> ActivityDetails {
  ActivityDetails::EditBio { description: text.into() }
}

fn add_beatmap(id: u64) -> ActivityDetails {
  ActivityDetails::AddBeatmap { beatmap: BeatmapRef { id, is_beatmapset: false } }
}

fn remove_beatmap(id: u64) -> ActivityDetails {
  ActivityDetails::RemoveBeatmap { beatmap: BeatmapRef { id, is_beatmapset: false } }
}

fn add_influence(to: u64) -> ActivityDetails {
  ActivityDetails::AddInfluence { influenced_to: actor(to), description: Some("hi".into()) }
}

fn remove_influence(to: u64) -> ActivityDetails {
  ActivityDetails::RemoveInfluence { influenced_to: actor(to) }
}

fn parse(frame: &str) -> Value { serde_json::from_str(frame).unwrap() }

// ─── Dedup ───────────────────────────────────────────────────────────────────

#[test]
fn repeated_bio_edits_keep_only_the_first() {
  let hub = ActivityHub::default();
  assert!(hub.propose(actor(1), bio("test")).is_some());
  for i in 0..19 {
    assert!(hub.propose(actor(1), bio(&format!("edit {i}"))).is_none());
  }

  let history = hub.history();
  assert_eq!(history.len(), 1);
  assert_eq!(history[0].details().description(), Some("test"));
}

#[test]
fn bio_edits_from_different_actors_are_independent() {
  let hub = ActivityHub::default();
  assert!(hub.propose(actor(1), bio("a")).is_some());
  assert!(hub.propose(actor(2), bio("a")).is_some());
  assert_eq!(hub.history().len(), 2);
}

#[test]
fn beatmap_changes_are_suppressed_only_for_the_same_beatmap() {
  let hub = ActivityHub::default();
  assert!(hub.propose(actor(1), add_beatmap(100)).is_some());
  assert!(hub.propose(actor(1), add_beatmap(200)).is_some());
  assert!(hub.propose(actor(1), add_beatmap(100)).is_none());
  // Removal shares the beatmap group with addition.
  assert!(hub.propose(actor(1), remove_beatmap(100)).is_none());
  assert!(hub.propose(actor(1), remove_beatmap(300)).is_some());
  assert_eq!(hub.history().len(), 3);
}

#[test]
fn influence_add_and_remove_are_separate_groups() {
  let hub = ActivityHub::default();
  assert!(hub.propose(actor(1), add_influence(50)).is_some());
  assert!(hub.propose(actor(1), remove_influence(50)).is_some());
  assert!(hub.propose(actor(1), remove_influence(50)).is_none());
  assert!(hub.propose(actor(1), add_influence(50)).is_none());
  assert!(hub.propose(actor(1), add_influence(51)).is_some());

  let removals = hub
    .history()
    .iter()
    .filter(|e| e.kind() == ActivityKind::RemoveInfluence)
    .count();
  assert_eq!(removals, 1);
}

#[test]
fn duplicate_check_ignores_other_groups() {
  let existing = ActivityEvent::new(actor(1), bio("x"));
  assert!(is_duplicate(&existing, 1, &bio("y")));
  assert!(!is_duplicate(&existing, 2, &bio("y")));
  assert!(!is_duplicate(&existing, 1, &add_beatmap(1)));
}

#[test]
fn suppression_lifts_once_the_first_event_is_evicted() {
  let hub = ActivityHub::new(2);
  assert!(hub.propose(actor(1), bio("first")).is_some());
  assert!(hub.propose(actor(2), bio("x")).is_some());
  assert!(hub.propose(actor(3), bio("x")).is_some());
  // actor 1's bio edit fell out of the window.
  assert!(hub.propose(actor(1), bio("second")).is_some());
}

// ─── History window ──────────────────────────────────────────────────────────

#[test]
fn history_is_the_fifo_window_of_accepted_events() {
  let hub = ActivityHub::default();
  for id in 0..DEFAULT_CAPACITY as u64 {
    hub.propose(actor(id), bio("x"));
  }
  let ids: Vec<u64> = hub.history().iter().map(|e| e.actor().id).collect();
  assert_eq!(ids, (0..DEFAULT_CAPACITY as u64).collect::<Vec<_>>());

  // The 21st accepted event evicts exactly the oldest.
  hub.propose(actor(99), bio("x"));
  let ids: Vec<u64> = hub.history().iter().map(|e| e.actor().id).collect();
  let mut expected: Vec<u64> = (1..DEFAULT_CAPACITY as u64).collect();
  expected.push(99);
  assert_eq!(ids, expected);
}

#[test]
fn suppressed_proposals_do_not_evict() {
  let hub = ActivityHub::new(3);
  hub.propose(actor(1), bio("x"));
  hub.propose(actor(2), bio("x"));
  hub.propose(actor(3), bio("x"));
  hub.propose(actor(1), bio("again"));
  let ids: Vec<u64> = hub.history().iter().map(|e| e.actor().id).collect();
  assert_eq!(ids, vec![1, 2, 3]);
}

#[test]
fn clear_empties_history_and_allows_repeats() {
  let hub = ActivityHub::default();
  hub.propose(actor(1), bio("x"));
  hub.clear();
  assert!(hub.history().is_empty());
  assert!(hub.propose(actor(1), bio("x")).is_some());
}

// ─── Viewers ─────────────────────────────────────────────────────────────────

#[test]
fn new_viewer_receives_full_history_as_one_batch() {
  let hub = ActivityHub::default();
  hub.propose(actor(1), bio("test"));
  hub.propose(actor(1), add_influence(418699));
  hub.propose(actor(1), add_beatmap(131891));

  let (tx, mut rx) = mpsc::channel(16);
  assert!(hub.register(tx).is_some());

  let batch = parse(&rx.try_recv().unwrap());
  let batch = batch.as_array().unwrap();
  assert_eq!(batch.len(), 3);
  assert_eq!(batch[0]["type"], "EDIT_BIO");
  assert_eq!(batch[1]["type"], "ADD_INFLUENCE");
  assert_eq!(batch[1]["details"]["influenced_to"]["id"], 418699);
  assert_eq!(batch[2]["type"], "ADD_BEATMAP");
  assert!(rx.try_recv().is_err());
}

#[test]
fn empty_history_is_sent_as_empty_array() {
  let hub = ActivityHub::default();
  let (tx, mut rx) = mpsc::channel(16);
  hub.register(tx);
  assert_eq!(rx.try_recv().unwrap(), "[]");
}

#[test]
fn accepted_events_are_pushed_to_every_viewer() {
  let hub = ActivityHub::default();
  let (tx_a, mut rx_a) = mpsc::channel(16);
  let (tx_b, mut rx_b) = mpsc::channel(16);
  hub.register(tx_a);
  hub.register(tx_b);
  rx_a.try_recv().unwrap();
  rx_b.try_recv().unwrap();

  hub.propose(actor(1), add_beatmap(2117273));
  hub.propose(actor(1), add_beatmap(2117273));

  for rx in [&mut rx_a, &mut rx_b] {
    let pushed = parse(&rx.try_recv().unwrap());
    assert_eq!(pushed["type"], "ADD_BEATMAP");
    assert_eq!(pushed["details"]["beatmap"]["id"], 2117273);
    // The suppressed duplicate is not broadcast.
    assert!(rx.try_recv().is_err());
  }
}

#[test]
fn dead_viewer_is_dropped_without_affecting_others() {
  let hub = ActivityHub::default();
  let (tx_dead, rx_dead) = mpsc::channel(16);
  let (tx_live, mut rx_live) = mpsc::channel(16);
  hub.register(tx_dead);
  hub.register(tx_live);
  rx_live.try_recv().unwrap();
  assert_eq!(hub.subscriber_count(), 2);

  drop(rx_dead);
  hub.propose(actor(1), bio("x"));

  assert_eq!(hub.subscriber_count(), 1);
  assert_eq!(parse(&rx_live.try_recv().unwrap())["type"], "EDIT_BIO");
}

#[test]
fn lagging_viewer_is_dropped_once_its_buffer_fills() {
  let hub = ActivityHub::default();
  let (tx_slow, mut rx_slow) = mpsc::channel(2);
  let (tx_live, mut rx_live) = mpsc::channel(16);
  hub.register(tx_slow);
  hub.register(tx_live);
  rx_live.try_recv().unwrap();

  // History batch plus one broadcast fill the slow viewer's buffer.
  hub.propose(actor(1), add_beatmap(1));
  assert_eq!(hub.subscriber_count(), 2);
  hub.propose(actor(1), add_beatmap(2));
  assert_eq!(hub.subscriber_count(), 1);

  for id in [1, 2] {
    assert_eq!(parse(&rx_live.try_recv().unwrap())["details"]["beatmap"]["id"], id);
  }
  // The slow viewer keeps what was queued before it was dropped.
  assert_eq!(rx_slow.try_recv().unwrap(), "[]");
  assert_eq!(parse(&rx_slow.try_recv().unwrap())["details"]["beatmap"]["id"], 1);
  assert!(rx_slow.try_recv().is_err());
}

#[test]
fn viewer_that_cannot_receive_history_is_not_registered() {
  let hub = ActivityHub::default();
  let (tx, rx) = mpsc::channel(16);
  drop(rx);
  assert!(hub.register(tx).is_none());
  assert_eq!(hub.subscriber_count(), 0);
}

#[test]
fn unregister_removes_viewer() {
  let hub = ActivityHub::default();
  let (tx, mut rx) = mpsc::channel(16);
  let id = hub.register(tx).unwrap();
  rx.try_recv().unwrap();

  assert!(hub.unregister(id));
  assert!(!hub.unregister(id));
  hub.propose(actor(1), bio("x"));
  assert!(rx.try_recv().is_err());
}

// ─── Seeding ─────────────────────────────────────────────────────────────────

struct FixedStore(Vec<ActivityEvent>);

impl ActivityStore for FixedStore {
  type Error = Infallible;

  async fn save_event<'a>(&'a self, _event: &'a ActivityEvent) -> Result<(), Infallible> { Ok(()) }

  async fn load_recent_events(&self, limit: usize) -> Result<Vec<ActivityEvent>, Infallible> {
    let skip = self.0.len().saturating_sub(limit);
    Ok(self.0[skip..].to_vec())
  }
}

#[tokio::test]
async fn seeded_hub_starts_with_persisted_events() {
  let events: Vec<ActivityEvent> = (0..25)
    .map(|i| {
      ActivityEvent::at(actor(i), bio("x"), Utc.timestamp_opt(1_700_000_000 + i as i64, 0).unwrap())
    })
    .collect();

  let hub = ActivityHub::seeded(DEFAULT_CAPACITY, &FixedStore(events)).await.unwrap();
  let history = hub.history();
  assert_eq!(history.len(), DEFAULT_CAPACITY);
  assert_eq!(history.first().unwrap().actor().id, 5);
  assert_eq!(history.last().unwrap().actor().id, 24);

  // Seeded events participate in dedup.
  assert!(hub.propose(actor(24), bio("again")).is_none());
}

#[test]
fn returned_copy_matches_history_entry() {
  let hub = ActivityHub::default();
  let accepted = hub.propose(actor(7), add_beatmap(1)).unwrap();
  assert_eq!(hub.history()[0], accepted);
}
