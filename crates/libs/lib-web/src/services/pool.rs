//! # Pool Service
//!
//! Backs `GET /api/pool-data` and `GET /api/pool`.
//!
//! ## Pool data freshness
//!
//! ```text
//! cache hit (< POOL_DATA_TTL)        → fresh snapshot
//! miss → poll succeeds               → fresh snapshot, cached
//! miss → poll fails, history exists  → last good snapshot, stale: true
//! miss → poll fails, no history      → 500 { error }
//! ```

use lib_core::{AppError, Result};
use lib_solana::{Commitment, PoolStatePoller, SolanaState};
use lib_utils::TtlLruCache;
use shared::{PoolDataResponse, PoolInfoResponse, PoolSnapshot};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

const POOL_DATA_KEY: &str = "pool-data";

pub struct PoolDataService {
    poller: Arc<PoolStatePoller>,
    cache: TtlLruCache<&'static str, PoolSnapshot>,
}

impl PoolDataService {
    pub fn new(poller: Arc<PoolStatePoller>, ttl: Duration) -> Self {
        Self {
            poller,
            cache: TtlLruCache::new("pool-data", 1, ttl),
        }
    }

    #[instrument(skip(self))]
    pub async fn get_pool_data(&self) -> Result<PoolDataResponse> {
        if let Some(snapshot) = self.cache.get(&POOL_DATA_KEY) {
            debug!("Serving cached pool data");
            return Ok(PoolDataResponse::fresh(snapshot));
        }

        match self.poller.poll_once().await {
            Ok(snapshot) => {
                self.cache.set(POOL_DATA_KEY, snapshot.clone());
                Ok(PoolDataResponse::fresh(snapshot))
            }
            Err(e) => match self.poller.latest() {
                Some(snapshot) => {
                    warn!(error = %e, "Pool read failed, serving stale snapshot");
                    Ok(PoolDataResponse::stale(snapshot))
                }
                None => {
                    // Transport errors carry the endpoint URL; keep them in the log
                    error!(error = %e, "Pool read failed with no snapshot to fall back on");
                    Err(AppError::Unavailable("Failed to fetch pool data".to_string()))
                }
            },
        }
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

/// Static pool addresses plus the authority account's current state.
#[instrument(skip(solana))]
pub async fn get_pool_info(solana: &SolanaState) -> Result<PoolInfoResponse> {
    let accounts = &solana.accounts;
    let authority = solana
        .manager
        .get_account_info(&accounts.authority, Commitment::Confirmed)
        .await?;

    Ok(PoolInfoResponse {
        program_id: accounts.program_id.to_string(),
        program_state: accounts.program_state.to_string(),
        authority: accounts.authority.to_string(),
        token_a_mint: accounts.token_a_mint.to_string(),
        token_b_mint: accounts.token_b_mint.to_string(),
        token_a_account: accounts.token_a_account.to_string(),
        token_b_account: accounts.token_b_account.to_string(),
        authority_lamports: authority.as_ref().map(|a| a.lamports).unwrap_or(0),
        authority_exists: authority.is_some(),
    })
}
