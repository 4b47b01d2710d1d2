//! # Realtime Client
//!
//! WebSocket connection to the gateway's `/ws` route. On open it subscribes
//! to `pool_updates` and forwards every snapshot to the caller's channel.
//! Dropped connections are retried with exponential backoff (1 s doubling up
//! to 30 s, reset after a successful connect) until the event receiver is
//! dropped.

use crate::error::Result;
use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use shared::{ClientMessage, PoolSnapshot, ServerMessage, SubscriptionStatus, POOL_UPDATES_CHANNEL};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

const INITIAL_RECONNECT_DELAY: Duration = Duration::from_secs(1);
const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(30);

/// Lifecycle of the socket, as seen by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closing,
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RealtimeEvent {
    StateChanged(ConnectionState),
    Snapshot(PoolSnapshot),
    ServerError(String),
}

/// `http://host:port` → `ws://host:port/ws`
pub fn ws_url(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        base.to_string()
    };
    format!("{}/ws", base)
}

fn next_delay(current: Duration) -> Duration {
    (current * 2).min(MAX_RECONNECT_DELAY)
}

/// Map one inbound text frame to an event. Control frames yield `None`.
fn parse_frame(text: &str) -> Option<RealtimeEvent> {
    match serde_json::from_str::<ServerMessage>(text) {
        Ok(ServerMessage::PoolUpdate { data }) => Some(RealtimeEvent::Snapshot(data)),
        Ok(ServerMessage::Error { message }) => Some(RealtimeEvent::ServerError(message)),
        Ok(ServerMessage::Connection { client_id }) => {
            debug!(client_id = %client_id, "Realtime connection acknowledged");
            None
        }
        Ok(ServerMessage::Subscription { status, channel }) => {
            info!(channel = %channel, subscribed = (status == SubscriptionStatus::Subscribed), "Subscription updated");
            None
        }
        Err(e) => {
            warn!(error = %e, "Ignoring unrecognized realtime frame");
            None
        }
    }
}

pub struct RealtimeClient {
    url: String,
    state: RwLock<ConnectionState>,
    messages_received: AtomicU64,
}

impl RealtimeClient {
    pub fn new(base_url: &str) -> Arc<Self> {
        Arc::new(Self {
            url: ws_url(base_url),
            state: RwLock::new(ConnectionState::Closed),
            messages_received: AtomicU64::new(0),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    pub fn messages_received(&self) -> u64 {
        self.messages_received.load(Ordering::Relaxed)
    }

    /// Returns `false` once nobody is listening.
    async fn set_state(&self, state: ConnectionState, events: &mpsc::Sender<RealtimeEvent>) -> bool {
        *self.state.write() = state;
        events.send(RealtimeEvent::StateChanged(state)).await.is_ok()
    }

    /// Connect, stream, reconnect. Runs until `events` is closed.
    pub fn spawn(self: &Arc<Self>, events: mpsc::Sender<RealtimeEvent>) -> tokio::task::JoinHandle<()> {
        let client = Arc::clone(self);
        tokio::spawn(async move { client.run(events).await })
    }

    async fn run(&self, events: mpsc::Sender<RealtimeEvent>) {
        let mut delay = INITIAL_RECONNECT_DELAY;
        let mut attempt = 0u64;

        loop {
            attempt += 1;
            if !self.set_state(ConnectionState::Connecting, &events).await {
                return;
            }
            info!(url = %self.url, attempt, "Connecting to realtime stream");

            match self.session(&events).await {
                Ok(true) => {
                    delay = INITIAL_RECONNECT_DELAY;
                    attempt = 0;
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(url = %self.url, attempt, error = %e, "Realtime connection failed");
                }
            }

            if !self.set_state(ConnectionState::Closed, &events).await {
                return;
            }
            debug!(delay_ms = delay.as_millis(), "Reconnecting after delay");
            tokio::time::sleep(delay).await;
            delay = next_delay(delay);
        }
    }

    /// One connection lifetime. `Ok(true)` if the socket reached `Open`.
    async fn session(&self, events: &mpsc::Sender<RealtimeEvent>) -> Result<bool> {
        let (stream, response) = connect_async(self.url.as_str()).await?;
        info!(url = %self.url, status = ?response.status(), "Realtime connection established");

        let (mut write, mut read) = stream.split();
        let subscribe = ClientMessage::Subscribe {
            channel: POOL_UPDATES_CHANNEL.to_string(),
        };
        let frame = serde_json::to_string(&subscribe).map_err(|e| crate::error::ClientError::Decode(e.to_string()))?;
        write.send(Message::Text(frame)).await?;

        if !self.set_state(ConnectionState::Open, events).await {
            return Ok(true);
        }

        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    self.messages_received.fetch_add(1, Ordering::Relaxed);
                    if let Some(event) = parse_frame(&text) {
                        if events.send(event).await.is_err() {
                            break;
                        }
                    }
                }
                Ok(Message::Close(frame)) => {
                    info!(frame = ?frame, "Realtime stream closed by server");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    error!(error = %e, "Realtime stream error");
                    break;
                }
            }
        }

        *self.state.write() = ConnectionState::Closing;
        let _ = write.close().await;
        Ok(true)
    }
}
