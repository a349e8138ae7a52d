//! Spam suppression for the activity feed.
//!
//! A candidate is a duplicate of an existing event when both come from the
//! same actor, fall into the same [`ActivityGroup`], and pass the group's
//! equality test:
//!
//! | Group | Duplicate when |
//! |-------|----------------|
//! | `Bio` | always |
//! | `Beatmap` | same beatmap id |
//! | `InfluenceAdd` / `InfluenceRemove` | same target user id |

use influences_core::activity::{ActivityDetails, ActivityEvent, ActivityGroup};

/// Whether `candidate`, proposed by `actor_id`, repeats `existing`.
pub fn is_duplicate(existing: &ActivityEvent, actor_id: u64, candidate: &ActivityDetails) -> bool {
  if existing.actor().id != actor_id || existing.group() != candidate.group() {
    return false;
  }

  let previous = existing.details();
  match candidate.group() {
    ActivityGroup::Bio => true,
    ActivityGroup::Beatmap => {
      previous.beatmap().map(|b| b.id) == candidate.beatmap().map(|b| b.id)
    }
    ActivityGroup::InfluenceAdd | ActivityGroup::InfluenceRemove => {
      previous.influenced_to().map(|u| u.id) == candidate.influenced_to().map(|u| u.id)
    }
  }
}
