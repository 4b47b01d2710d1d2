//! # Realtime
//!
//! `/ws` fan-out: the [`FanoutHub`] connection table and the forwarder that
//! feeds it from the pool poller's broadcast channel.

pub mod hub;

pub use hub::{ConnectionState, FanoutHub, Registration};

use shared::PoolSnapshot;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Forward every published snapshot to the hub until the channel closes.
pub fn spawn_forwarder(hub: Arc<FanoutHub>, mut rx: broadcast::Receiver<PoolSnapshot>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(snapshot) => {
                    hub.broadcast_pool_update(&snapshot);
                }
                Err(RecvError::Lagged(skipped)) => {
                    // Only the newest snapshot matters; keep going.
                    warn!(skipped, "[WS] Forwarder lagged behind the poller");
                }
                Err(RecvError::Closed) => {
                    info!("[WS] Snapshot channel closed, forwarder stopping");
                    break;
                }
            }
        }
    })
}
