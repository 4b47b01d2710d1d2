//! # Realtime Fan-out Hub
//!
//! Connection table for `/ws`. Each connection has a bounded outbound queue
//! drained by its socket task; the hub only ever enqueues, so no socket I/O
//! happens while the table lock is held.
//!
//! ## Delivery policy
//! - connections are visited in registration order
//! - a full queue drops that one frame for that one connection (logged)
//! - a closed queue means the socket task is gone; the entry is removed
//!
//! ## Per-connection ordering
//! A `subscribe` records the channel, then enqueues the ack, then (for the
//! pool channel) the latest snapshot, all under one lock. A broadcast cannot
//! interleave between the ack and the replay.

use parking_lot::Mutex;
use shared::{ClientMessage, PoolSnapshot, ServerMessage, SubscriptionStatus, POOL_UPDATES_CHANNEL};
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Default outbound frames buffered per connection.
pub const DEFAULT_QUEUE_CAPACITY: usize = 32;

/// Lifecycle of one realtime connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closing,
    Closed,
}

struct Connection {
    id: String,
    state: ConnectionState,
    errored: bool,
    channels: HashSet<String>,
    tx: mpsc::Sender<ServerMessage>,
}

#[derive(Default)]
struct Table {
    next_seq: u64,
    /// Registration sequence -> connection
    connections: BTreeMap<u64, Connection>,
    by_id: HashMap<String, u64>,
}

impl Table {
    fn get_mut(&mut self, id: &str) -> Option<&mut Connection> {
        let seq = *self.by_id.get(id)?;
        self.connections.get_mut(&seq)
    }

    fn remove(&mut self, id: &str) -> Option<Connection> {
        let seq = self.by_id.remove(id)?;
        self.connections.remove(&seq)
    }
}

/// Outcome of queueing one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Enqueue {
    Queued,
    Dropped,
    Gone,
}

fn enqueue(conn: &Connection, msg: ServerMessage) -> Enqueue {
    match conn.tx.try_send(msg) {
        Ok(()) => Enqueue::Queued,
        Err(TrySendError::Full(_)) => {
            warn!(client_id = %conn.id, "[WS] QUEUE_FULL client_id={} - dropping frame", conn.id);
            Enqueue::Dropped
        }
        Err(TrySendError::Closed(_)) => Enqueue::Gone,
    }
}

/// Handed to the socket task on connect.
pub struct Registration {
    pub id: String,
    pub outbound: mpsc::Receiver<ServerMessage>,
}

pub struct FanoutHub {
    table: Mutex<Table>,
    queue_capacity: usize,
}

impl Default for FanoutHub {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

impl FanoutHub {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            table: Mutex::new(Table::default()),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Register a new connection and queue its `connection` ack.
    pub fn register(&self) -> Registration {
        let id = Uuid::new_v4().to_string();
        let (tx, outbound) = mpsc::channel(self.queue_capacity);

        let mut table = self.table.lock();
        let seq = table.next_seq;
        table.next_seq += 1;

        let mut conn = Connection {
            id: id.clone(),
            state: ConnectionState::Connecting,
            errored: false,
            channels: HashSet::new(),
            tx,
        };
        enqueue(&conn, ServerMessage::Connection { client_id: id.clone() });
        conn.state = ConnectionState::Open;

        table.connections.insert(seq, conn);
        table.by_id.insert(id.clone(), seq);
        info!(client_id = %id, connections = table.connections.len(), "[WS] REGISTERED client_id={}", id);

        Registration { id, outbound }
    }

    /// Remove a connection. Returns whether it was present.
    pub fn unregister(&self, id: &str) -> bool {
        let mut table = self.table.lock();
        let Some(conn) = table.get_mut(id) else {
            return false;
        };
        conn.state = ConnectionState::Closing;

        let removed = table.remove(id);
        if let Some(mut conn) = removed {
            conn.state = ConnectionState::Closed;
            info!(
                client_id = %id,
                errored = conn.errored,
                channels = conn.channels.len(),
                remaining = table.connections.len(),
                "[WS] UNREGISTERED client_id={}",
                id
            );
        }
        true
    }

    /// Flag a connection whose socket reported an error.
    pub fn mark_error(&self, id: &str) {
        if let Some(conn) = self.table.lock().get_mut(id) {
            conn.errored = true;
        }
    }

    /// Handle one inbound text frame.
    ///
    /// `latest` is replayed to the connection when it subscribes to the pool
    /// channel. Malformed input gets an `error` frame for this connection only.
    pub fn handle_client_text(&self, id: &str, text: &str, latest: Option<PoolSnapshot>) {
        let mut table = self.table.lock();
        let Some(conn) = table.get_mut(id) else {
            debug!(client_id = %id, "[WS] Message for unknown connection ignored");
            return;
        };

        let message = match serde_json::from_str::<ClientMessage>(text) {
            Ok(message) => message,
            Err(e) => {
                warn!(client_id = %id, error = %e, "[WS] INVALID_MESSAGE client_id={}", id);
                enqueue(
                    conn,
                    ServerMessage::Error {
                        message: format!("Invalid message: {}", e),
                    },
                );
                return;
            }
        };

        let gone = match message {
            ClientMessage::Subscribe { channel } => {
                conn.channels.insert(channel.clone());
                info!(client_id = %id, channel = %channel, "[WS] SUBSCRIBED client_id={} channel={}", id, channel);

                let replay = (channel == POOL_UPDATES_CHANNEL).then_some(latest).flatten();
                let ack = enqueue(
                    conn,
                    ServerMessage::Subscription {
                        status: SubscriptionStatus::Subscribed,
                        channel,
                    },
                );
                match replay {
                    Some(snapshot) if ack != Enqueue::Gone => {
                        enqueue(conn, ServerMessage::PoolUpdate { data: snapshot }) == Enqueue::Gone
                    }
                    _ => ack == Enqueue::Gone,
                }
            }
            ClientMessage::Unsubscribe { channel } => {
                conn.channels.remove(&channel);
                info!(client_id = %id, channel = %channel, "[WS] UNSUBSCRIBED client_id={} channel={}", id, channel);
                enqueue(
                    conn,
                    ServerMessage::Subscription {
                        status: SubscriptionStatus::Unsubscribed,
                        channel,
                    },
                ) == Enqueue::Gone
            }
        };

        if gone {
            table.remove(id);
        }
    }

    /// Queue an error frame for one connection.
    pub fn send_error(&self, id: &str, message: impl Into<String>) {
        let mut table = self.table.lock();
        let gone = match table.get_mut(id) {
            Some(conn) => {
                enqueue(conn, ServerMessage::Error { message: message.into() }) == Enqueue::Gone
            }
            None => false,
        };
        if gone {
            table.remove(id);
        }
    }

    /// Fan a snapshot out to every open connection subscribed to the pool
    /// channel. Returns how many connections it was queued for.
    pub fn broadcast_pool_update(&self, snapshot: &PoolSnapshot) -> usize {
        let mut table = self.table.lock();
        let mut delivered = 0;
        let mut gone = Vec::new();

        for conn in table.connections.values() {
            if conn.state != ConnectionState::Open || !conn.channels.contains(POOL_UPDATES_CHANNEL) {
                continue;
            }
            match enqueue(conn, ServerMessage::PoolUpdate { data: snapshot.clone() }) {
                Enqueue::Queued => delivered += 1,
                Enqueue::Dropped => {}
                Enqueue::Gone => gone.push(conn.id.clone()),
            }
        }

        for id in gone {
            debug!(client_id = %id, "[WS] Removing connection with closed queue");
            table.remove(&id);
        }

        debug!(delivered, "[WS] BROADCAST pool_update delivered={}", delivered);
        delivered
    }

    pub fn connection_count(&self) -> usize {
        self.table.lock().connections.len()
    }

    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.table
            .lock()
            .connections
            .values()
            .filter(|conn| conn.channels.contains(channel))
            .count()
    }

    pub fn state(&self, id: &str) -> Option<ConnectionState> {
        self.table.lock().get_mut(id).map(|conn| conn.state)
    }

    pub fn is_errored(&self, id: &str) -> bool {
        self.table.lock().get_mut(id).is_some_and(|conn| conn.errored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(sol: f64) -> PoolSnapshot {
        PoolSnapshot {
            native_reserve: sol,
            token_a_reserve: 1.0,
            token_b_reserve: 2.0,
            derived_total_value: sol * 150.0,
            timestamp_ms: 1,
        }
    }

    fn drain(rx: &mut mpsc::Receiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    fn subscribe(channel: &str) -> String {
        format!(r#"{{"type":"subscribe","channel":"{}"}}"#, channel)
    }

    #[test]
    fn test_register_sends_connection_ack() {
        let hub = FanoutHub::default();
        let mut reg = hub.register();

        assert_eq!(
            drain(&mut reg.outbound),
            vec![ServerMessage::Connection { client_id: reg.id.clone() }]
        );
        assert_eq!(hub.state(&reg.id), Some(ConnectionState::Open));
        assert_eq!(hub.connection_count(), 1);
    }

    #[test]
    fn test_subscribe_replays_latest_snapshot() {
        let hub = FanoutHub::default();
        let mut reg = hub.register();
        drain(&mut reg.outbound);

        hub.handle_client_text(&reg.id, &subscribe(POOL_UPDATES_CHANNEL), Some(snapshot(3.0)));

        assert_eq!(
            drain(&mut reg.outbound),
            vec![
                ServerMessage::Subscription {
                    status: SubscriptionStatus::Subscribed,
                    channel: POOL_UPDATES_CHANNEL.to_string(),
                },
                ServerMessage::PoolUpdate { data: snapshot(3.0) },
            ]
        );
    }

    #[test]
    fn test_subscribe_other_channel_has_no_replay() {
        let hub = FanoutHub::default();
        let mut reg = hub.register();
        drain(&mut reg.outbound);

        hub.handle_client_text(&reg.id, &subscribe("news"), Some(snapshot(3.0)));

        let frames = drain(&mut reg.outbound);
        assert_eq!(frames.len(), 1);
        assert!(matches!(frames[0], ServerMessage::Subscription { .. }));
    }

    #[test]
    fn test_broadcast_reaches_only_subscribers() {
        let hub = FanoutHub::default();
        let mut subscribed = hub.register();
        let mut idle = hub.register();
        hub.handle_client_text(&subscribed.id, &subscribe(POOL_UPDATES_CHANNEL), None);
        drain(&mut subscribed.outbound);
        drain(&mut idle.outbound);

        assert_eq!(hub.broadcast_pool_update(&snapshot(4.0)), 1);

        assert_eq!(
            drain(&mut subscribed.outbound),
            vec![ServerMessage::PoolUpdate { data: snapshot(4.0) }]
        );
        assert!(drain(&mut idle.outbound).is_empty());
    }

    #[test]
    fn test_malformed_message_errors_only_sender() {
        let hub = FanoutHub::default();
        let mut bad = hub.register();
        let mut other = hub.register();
        drain(&mut bad.outbound);
        drain(&mut other.outbound);

        hub.handle_client_text(&bad.id, "{not json", None);

        let frames = drain(&mut bad.outbound);
        assert_eq!(frames.len(), 1);
        assert!(matches!(&frames[0], ServerMessage::Error { message } if message.starts_with("Invalid message")));
        assert!(drain(&mut other.outbound).is_empty());
        assert_eq!(hub.connection_count(), 2);
    }

    #[test]
    fn test_unsubscribe_stops_updates() {
        let hub = FanoutHub::default();
        let mut reg = hub.register();
        hub.handle_client_text(&reg.id, &subscribe(POOL_UPDATES_CHANNEL), None);
        hub.handle_client_text(
            &reg.id,
            r#"{"type":"unsubscribe","channel":"pool_updates"}"#,
            None,
        );
        drain(&mut reg.outbound);

        assert_eq!(hub.broadcast_pool_update(&snapshot(1.0)), 0);
        assert_eq!(hub.subscriber_count(POOL_UPDATES_CHANNEL), 0);
    }

    #[test]
    fn test_unregister_removes_entry() {
        let hub = FanoutHub::default();
        let reg = hub.register();

        assert!(hub.unregister(&reg.id));
        assert!(!hub.unregister(&reg.id));
        assert_eq!(hub.connection_count(), 0);
        assert_eq!(hub.state(&reg.id), None);
    }

    #[test]
    fn test_full_queue_drops_frame_but_keeps_connection() {
        let hub = FanoutHub::new(2);
        let mut reg = hub.register();
        hub.handle_client_text(&reg.id, &subscribe(POOL_UPDATES_CHANNEL), None);
        // Queue now holds the connection ack and the subscription ack

        assert_eq!(hub.broadcast_pool_update(&snapshot(1.0)), 0);
        assert_eq!(hub.connection_count(), 1);

        drain(&mut reg.outbound);
        assert_eq!(hub.broadcast_pool_update(&snapshot(2.0)), 1);
    }

    #[test]
    fn test_closed_queue_removes_connection() {
        let hub = FanoutHub::default();
        let reg = hub.register();
        hub.handle_client_text(&reg.id, &subscribe(POOL_UPDATES_CHANNEL), None);
        drop(reg.outbound);

        assert_eq!(hub.broadcast_pool_update(&snapshot(1.0)), 0);
        assert_eq!(hub.connection_count(), 0);
    }

    #[test]
    fn test_mark_error_sets_flag() {
        let hub = FanoutHub::default();
        let reg = hub.register();
        assert!(!hub.is_errored(&reg.id));
        hub.mark_error(&reg.id);
        assert!(hub.is_errored(&reg.id));
        assert_eq!(hub.state(&reg.id), Some(ConnectionState::Open));
    }
}
