//! # Transaction Handlers
//!
//! ## Endpoints
//!
//! - `GET /api/transactions/{address}?limit=N` - recent signatures, newest first
//!
//! `limit` defaults to 10 and is clamped to `1..=100`. A `limit` that is not
//! a number is a 400 with the usual `{error, code}` body.
//!
//! ```bash
//! curl "http://localhost:3001/api/transactions/8W6QginkhTTxoP2deQjq7rZ9YMwN5FH9JYuLfSKuJKAL?limit=25"
//! ```

use crate::services::transaction::TransactionService;
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Json,
};
use lib_core::{AppError, Result};
use lib_solana::SolanaState;
use serde::Deserialize;
use shared::TransactionsResponse;
use std::sync::Arc;
use tracing::instrument;

#[derive(Debug, Deserialize)]
pub struct TransactionQuery {
    pub limit: Option<usize>,
}

#[instrument(skip(solana))]
pub async fn get_transactions(
    State(solana): State<Arc<SolanaState>>,
    Path(address): Path<String>,
    query: std::result::Result<Query<TransactionQuery>, QueryRejection>,
) -> Result<Json<TransactionsResponse>> {
    let Query(params) =
        query.map_err(|e| AppError::InvalidInput(format!("Invalid query: {}", e.body_text())))?;
    let service = TransactionService::new(solana);
    service.get_transactions(&address, params.limit).await.map(Json)
}
