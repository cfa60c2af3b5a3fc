//! Realtime change subscriptions over WebSocket.
//!
//! One WebSocket connection per client, shared by all subscriptions. A
//! background reader task routes tagged server events to per-subscription
//! channels; a writer task owns the outgoing half and doubles as the
//! keepalive loop.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use log::{debug, warn};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::model::{ChangeEvent, ClientMessage, ServerMessage};

const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

struct Routes {
  events: HashMap<String, mpsc::UnboundedSender<ChangeEvent>>,
  pending: HashMap<String, oneshot::Sender<Result<()>>>,
}

pub(crate) struct RealtimeConnection {
  out_tx: mpsc::UnboundedSender<ClientMessage>,
  routes: Arc<Mutex<Routes>>,
}

impl RealtimeConnection {
  /// Open the socket and spawn the reader and writer tasks.
  pub(crate) async fn connect(url: &str, token: Option<String>) -> Result<Arc<Self>> {
    let url = match token {
      Some(t) => format!("{}?token={}", url, urlencoding::encode(&t)),
      None => url.to_string(),
    };

    let (ws, _) = connect_async(url.as_str()).await?;
    let (mut sink, mut stream) = ws.split();

    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ClientMessage>();
    let routes = Arc::new(Mutex::new(Routes {
      events: HashMap::new(),
      pending: HashMap::new(),
    }));

    tokio::spawn(async move {
      let mut keepalive = tokio::time::interval(KEEPALIVE_INTERVAL);
      keepalive.tick().await;
      loop {
        let msg = tokio::select! {
          msg = out_rx.recv() => match msg {
            Some(msg) => msg,
            None => break,
          },
          _ = keepalive.tick() => ClientMessage::Ping {
            id: Uuid::new_v4().to_string(),
          },
        };
        let text = match serde_json::to_string(&msg) {
          Ok(text) => text,
          Err(_) => continue,
        };
        if sink.send(Message::Text(text)).await.is_err() {
          break;
        }
      }
    });

    let reader_routes = Arc::clone(&routes);
    let reader_out = out_tx.clone();
    tokio::spawn(async move {
      while let Some(frame) = stream.next().await {
        let text = match frame {
          Ok(Message::Text(text)) => text,
          Ok(Message::Close(_)) | Err(_) => break,
          Ok(_) => continue,
        };
        let msg: ServerMessage = match serde_json::from_str(&text) {
          Ok(msg) => msg,
          Err(e) => {
            warn!("ignoring malformed realtime frame: {}", e);
            continue;
          }
        };

        let Ok(mut routes) = reader_routes.lock() else { break };
        match msg {
          ServerMessage::Subscribed { id } => {
            if let Some(ack) = routes.pending.remove(&id) {
              let _ = ack.send(Ok(()));
            }
          }
          ServerMessage::Unsubscribed { id } => {
            routes.events.remove(&id);
          }
          ServerMessage::Event { id, event } => {
            let receiver_gone = match routes.events.get(&id) {
              Some(tx) => tx.send(event).is_err(),
              None => false,
            };
            if receiver_gone {
              routes.events.remove(&id);
              let _ = reader_out.send(ClientMessage::Unsubscribe { id });
            }
          }
          ServerMessage::Error { id, error } => {
            if let Some(ack) = routes.pending.remove(&id) {
              let _ = ack.send(Err(Error::Realtime(error)));
            } else {
              warn!("realtime error on {}: {}", id, error);
            }
            routes.events.remove(&id);
          }
          ServerMessage::Pong { .. } => {}
        }
      }

      // Socket is gone; dropping the senders ends every subscription.
      if let Ok(mut routes) = reader_routes.lock() {
        routes.events.clear();
        routes.pending.clear();
      }
    });

    Ok(Arc::new(Self { out_tx, routes }))
  }

  /// Register a route, send the subscribe message and wait for the ack.
  pub(crate) async fn subscribe(
    &self,
    collection: &str,
    query: Option<String>,
  ) -> Result<Subscription> {
    let id = Uuid::new_v4().to_string();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (ack_tx, ack_rx) = oneshot::channel();

    {
      let mut routes = self.routes.lock().map_err(|_| Error::ChannelClosed)?;
      routes.events.insert(id.clone(), event_tx);
      routes.pending.insert(id.clone(), ack_tx);
    }

    let msg = ClientMessage::Subscribe {
      id: id.clone(),
      collection: collection.to_string(),
      query,
    };
    if self.out_tx.send(msg).is_err() {
      self.forget(&id);
      return Err(Error::ChannelClosed);
    }

    match ack_rx.await {
      Ok(Ok(())) => {}
      Ok(Err(e)) => {
        self.forget(&id);
        return Err(e);
      }
      Err(_) => {
        self.forget(&id);
        return Err(Error::ChannelClosed);
      }
    }

    debug!("subscribed {} on {}", id, collection);
    Ok(Subscription {
      id,
      events: event_rx,
      out_tx: self.out_tx.clone(),
    })
  }

  fn forget(&self, id: &str) {
    if let Ok(mut routes) = self.routes.lock() {
      routes.events.remove(id);
      routes.pending.remove(id);
    }
  }
}

/// An active change subscription.
///
/// Yields [`ChangeEvent`]s until the subscription is dropped or the
/// connection closes.
pub struct Subscription {
  id: String,
  events: mpsc::UnboundedReceiver<ChangeEvent>,
  out_tx: mpsc::UnboundedSender<ClientMessage>,
}

impl Subscription {
  /// The server-side subscription id.
  pub fn id(&self) -> &str {
    &self.id
  }

  /// Wait for the next change event. Returns `None` once the subscription
  /// has ended.
  pub async fn next(&mut self) -> Option<ChangeEvent> {
    self.events.recv().await
  }

  /// Stop receiving events. Equivalent to dropping the subscription.
  pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
  fn drop(&mut self) {
    let _ = self.out_tx.send(ClientMessage::Unsubscribe { id: self.id.clone() });
  }
}
