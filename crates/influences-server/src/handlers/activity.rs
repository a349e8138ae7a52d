//! The activity feed: a JSON snapshot at `/activity` and a live WebSocket at
//! `/ws`.
//!
//! A WebSocket viewer first receives the whole current history as one JSON
//! array, then one JSON object per accepted event. Anything the client sends
//! is ignored; the connection is only read to notice when it goes away.

use std::sync::Arc;

use axum::{
  Json,
  extract::{
    State,
    ws::{Message, WebSocket, WebSocketUpgrade},
  },
  response::Response,
};
use futures_util::{SinkExt as _, StreamExt as _};
use influences_core::activity::ActivityEvent;
use influences_hub::ActivityHub;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::{AppState, Backend};

/// Frames buffered per viewer. A viewer whose socket falls this far behind
/// is dropped by the hub and its connection closes.
const VIEWER_BUFFER: usize = 64;

/// `GET /activity`
pub async fn history<S: Backend>(State(state): State<AppState<S>>) -> Json<Vec<ActivityEvent>> {
  Json(state.hub.history())
}

/// `GET /ws`
pub async fn ws<S: Backend>(State(state): State<AppState<S>>, upgrade: WebSocketUpgrade) -> Response {
  let hub = state.hub.clone();
  upgrade.on_upgrade(move |socket| feed(socket, hub))
}

async fn feed(socket: WebSocket, hub: Arc<ActivityHub>) {
  let (mut sink, mut stream) = socket.split();
  let (tx, mut rx) = mpsc::channel::<String>(VIEWER_BUFFER);

  let Some(id) = hub.register(tx) else {
    return;
  };
  info!(viewer = %id, "activity viewer connected");

  let mut writer = tokio::spawn(async move {
    while let Some(frame) = rx.recv().await {
      if sink.send(Message::Text(frame.into())).await.is_err() {
        break;
      }
    }
  });

  loop {
    tokio::select! {
      incoming = stream.next() => match incoming {
        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
        Some(Ok(_)) => {}
      },
      _ = &mut writer => break,
    }
  }

  hub.unregister(id);
  writer.abort();
  debug!(viewer = %id, "activity viewer disconnected");
}
