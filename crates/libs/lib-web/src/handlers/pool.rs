//! # Pool Handlers
//!
//! ## Endpoints
//!
//! - `GET /api/pool-data` - current reserves (`{ sol, yot, yos, totalValue, timestamp, stale? }`)
//! - `GET /api/pool` - pool addresses and authority account state
//!
//! ```bash
//! curl "http://localhost:3001/api/pool-data"
//! ```

use crate::services::pool::{self, PoolDataService};
use axum::{extract::State, Json};
use lib_core::Result;
use lib_solana::SolanaState;
use shared::{PoolDataResponse, PoolInfoResponse};
use std::sync::Arc;
use tracing::instrument;

/// **Route**: `GET /api/pool-data`
///
/// Served from a short-TTL cache. When the upstream read fails the last good
/// snapshot is returned with `"stale": true`; with no history at all the
/// response is 500 `{ "error": ... }`.
#[instrument(skip(service))]
pub async fn get_pool_data(State(service): State<Arc<PoolDataService>>) -> Result<Json<PoolDataResponse>> {
    service.get_pool_data().await.map(Json)
}

/// **Route**: `GET /api/pool`
#[instrument(skip(solana))]
pub async fn get_pool_info(State(solana): State<Arc<SolanaState>>) -> Result<Json<PoolInfoResponse>> {
    pool::get_pool_info(&solana).await.map(Json)
}
