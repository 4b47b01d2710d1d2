//! # Pool-State Poller
//!
//! Reads the pool reserves on a fixed interval and publishes a
//! [`PoolSnapshot`] on a broadcast channel whenever the reserves change.
//!
//! ## One poll
//! 1. native balance of the pool authority
//! 2. token balance of reserve A (ATA of authority for mint A)
//! 3. token balance of reserve B (ATA of authority for mint B)
//!
//! The three reads run concurrently through the connection manager's caches.
//! A token reserve that is missing or unreadable counts as `0`. If the native
//! read or the reference price fails, the poll fails: the previous snapshot
//! is kept and nothing is broadcast.
//!
//! ## Broadcast suppression
//! A snapshot is published only if its reserves differ from the last
//! published one ([`PoolSnapshot::same_state`]); the timestamp is ignored.

use crate::connection::ConnectionManager;
use crate::price::ReferencePrice;
use crate::spl_token::PoolAccounts;
use crate::types::{Commitment, RpcOutcome};
use parking_lot::Mutex;
use shared::{lamports_to_sol, PoolSnapshot};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

/// Buffered snapshots per subscriber before it starts lagging.
const BROADCAST_CAPACITY: usize = 64;

#[derive(Debug, Error)]
pub enum PollError {
    #[error("Native reserve unavailable: {0}")]
    NativeReserve(String),

    #[error("Reference price unavailable: {0}")]
    ReferencePrice(String),
}

/// What one tick of the polling loop did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Broadcast,
    Unchanged,
    Failed,
}

#[derive(Default)]
struct PollerState {
    /// Last successful poll
    latest: Option<PoolSnapshot>,
    /// Last snapshot sent on the channel
    last_broadcast: Option<PoolSnapshot>,
}

pub struct PoolStatePoller {
    manager: Arc<ConnectionManager>,
    accounts: PoolAccounts,
    price: Arc<dyn ReferencePrice>,
    commitment: Commitment,
    interval: Duration,
    state: Mutex<PollerState>,
    tx: broadcast::Sender<PoolSnapshot>,
}

impl PoolStatePoller {
    pub fn new(
        manager: Arc<ConnectionManager>,
        accounts: PoolAccounts,
        price: Arc<dyn ReferencePrice>,
        interval: Duration,
    ) -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            manager,
            accounts,
            price,
            commitment: Commitment::Confirmed,
            interval,
            state: Mutex::new(PollerState::default()),
            tx,
        }
    }

    pub fn accounts(&self) -> &PoolAccounts {
        &self.accounts
    }

    /// Receiver for published snapshots (used by the realtime hub).
    pub fn subscribe(&self) -> broadcast::Receiver<PoolSnapshot> {
        self.tx.subscribe()
    }

    /// Most recent successful snapshot, if any poll has succeeded.
    pub fn latest(&self) -> Option<PoolSnapshot> {
        self.state.lock().latest.clone()
    }

    /// Read the reserves once and record the result as the latest snapshot.
    ///
    /// Does not publish; see [`PoolStatePoller::tick`].
    #[instrument(skip(self))]
    pub async fn poll_once(&self) -> Result<PoolSnapshot, PollError> {
        let (native, token_a, token_b) = tokio::join!(
            self.manager.get_balance(&self.accounts.authority, self.commitment),
            self.manager
                .get_token_account_balance(&self.accounts.token_a_account, self.commitment),
            self.manager
                .get_token_account_balance(&self.accounts.token_b_account, self.commitment),
        );

        let lamports = match native {
            RpcOutcome::Found(lamports) => lamports,
            RpcOutcome::NotFound => 0,
            RpcOutcome::Unavailable(reason) => return Err(PollError::NativeReserve(reason)),
        };

        if !token_a.is_found() {
            debug!(account = %self.accounts.token_a_account, outcome = ?token_a, "Reserve A unreadable, using 0");
        }
        if !token_b.is_found() {
            debug!(account = %self.accounts.token_b_account, outcome = ?token_b, "Reserve B unreadable, using 0");
        }

        let price = self
            .price
            .usd_price()
            .await
            .map_err(|e| PollError::ReferencePrice(e.to_string()))?;

        let native_reserve = lamports_to_sol(lamports);
        let snapshot = PoolSnapshot {
            native_reserve,
            token_a_reserve: token_a.or_zero().ui_amount,
            token_b_reserve: token_b.or_zero().ui_amount,
            derived_total_value: native_reserve * price,
            timestamp_ms: lib_utils::now_millis(),
        };

        self.state.lock().latest = Some(snapshot.clone());
        Ok(snapshot)
    }

    /// Publish `snapshot` unless it matches the last published one.
    ///
    /// Returns whether it was sent. Having no subscribers is not an error.
    pub fn publish(&self, snapshot: PoolSnapshot) -> bool {
        {
            let mut state = self.state.lock();
            if state
                .last_broadcast
                .as_ref()
                .is_some_and(|last| last.same_state(&snapshot))
            {
                return false;
            }
            state.last_broadcast = Some(snapshot.clone());
        }

        let receivers = self.tx.send(snapshot).unwrap_or(0);
        debug!(receivers, "Published pool snapshot");
        true
    }

    /// One poll-and-publish cycle.
    pub async fn tick(&self) -> TickOutcome {
        match self.poll_once().await {
            Ok(snapshot) => {
                if self.publish(snapshot) {
                    TickOutcome::Broadcast
                } else {
                    TickOutcome::Unchanged
                }
            }
            Err(e) => {
                warn!(error = %e, "Pool poll failed, keeping previous snapshot");
                TickOutcome::Failed
            }
        }
    }

    /// Spawn the polling loop. Runs until the process exits.
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        info!(
            interval_ms = self.interval.as_millis() as u64,
            authority = %self.accounts.authority,
            price_source = self.price.source(),
            "Starting pool-state poller"
        );

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                self.tick().await;
            }
        })
    }
}
