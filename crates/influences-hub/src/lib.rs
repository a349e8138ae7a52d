//! The activity hub: a bounded, deduplicated history of recent activity
//! events with live fan-out to connected viewers.
//!
//! The hub is transport-agnostic. A viewer is represented by the sending half
//! of a bounded channel of JSON text frames; the transport layer (the
//! `/ws` endpoint in `influences-server`) drains the receiving half into its
//! socket.
//!
//! The hub does not persist anything. [`ActivityHub::propose`] hands an
//! accepted event back to the caller, which is responsible for saving it.

mod dedup;
mod hub;
mod subscriber;

pub use dedup::is_duplicate;
pub use hub::{ActivityHub, DEFAULT_CAPACITY};
pub use subscriber::{Subscriber, SubscriberId, SubscriberSender};

#[cfg(test)]
mod tests;
