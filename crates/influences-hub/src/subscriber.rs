//! Live viewers of the activity feed.

use tokio::sync::mpsc::Sender;
use uuid::Uuid;

pub type SubscriberId = Uuid;

/// Bounded channel into which the hub pushes JSON text frames for one viewer.
pub type SubscriberSender = Sender<String>;

/// A registered viewer. The hub only holds the sending half; the connection
/// owns the receiver and its lifetime.
#[derive(Debug)]
pub struct Subscriber {
  pub id: SubscriberId,
  sender: SubscriberSender,
}

impl Subscriber {
  pub fn new(sender: SubscriberSender) -> Self {
    Self { id: Uuid::new_v4(), sender }
  }

  /// Queue a frame for the viewer without waiting. Returns `false` once the
  /// receiving side has gone away or its buffer is full; a viewer that falls
  /// that far behind is dropped.
  pub fn send(&self, frame: String) -> bool { self.sender.try_send(frame).is_ok() }
}
