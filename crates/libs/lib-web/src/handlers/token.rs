//! # Token Handlers
//!
//! - `GET /api/token/{address}` - decimals and supply of a mint (404 if it does not exist)

use crate::services::token;
use axum::{
    extract::{Path, State},
    Json,
};
use lib_core::Result;
use lib_solana::SolanaState;
use shared::TokenInfoResponse;
use std::sync::Arc;
use tracing::instrument;

#[instrument(skip(solana))]
pub async fn get_token_info(
    State(solana): State<Arc<SolanaState>>,
    Path(address): Path<String>,
) -> Result<Json<TokenInfoResponse>> {
    token::get_token_info(&solana, &address).await.map(Json)
}
