//! # Wallet Handlers
//!
//! ## Endpoints
//!
//! - `GET /api/balances/{address}` - native and pool-token balances of a wallet
//!
//! ```bash
//! curl "http://localhost:3001/api/balances/8W6QginkhTTxoP2deQjq7rZ9YMwN5FH9JYuLfSKuJKAL"
//! ```
//!
//! Response:
//! ```json
//! { "sol": 1.5, "solUsd": 225.0, "yot": 1000.0, "yos": 0.0, "timestamp": 1718000000000 }
//! ```
//!
//! A malformed address is 400. RPC trouble never fails the request; the
//! affected balances read as zero.

use crate::services::wallet::WalletService;
use axum::{
    extract::{Path, State},
    Json,
};
use lib_core::Result;
use lib_solana::SolanaState;
use shared::BalancesResponse;
use std::sync::Arc;
use tracing::{info, instrument};

/// **Route**: `GET /api/balances/{address}`
#[instrument(skip(solana))]
pub async fn get_balances(
    State(solana): State<Arc<SolanaState>>,
    Path(address): Path<String>,
) -> Result<Json<BalancesResponse>> {
    info!("Balance request: {}", address);

    let service = WalletService::new(solana);
    service.get_balances(&address).await.map(Json)
}
