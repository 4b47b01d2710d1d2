//! Mint supply lookups for `GET /api/token/{address}`.

use lib_core::{AppError, Result};
use lib_solana::spl_token::parse_pubkey;
use lib_solana::{Commitment, SolanaState};
use shared::TokenInfoResponse;
use tracing::instrument;

#[instrument(skip(solana))]
pub async fn get_token_info(solana: &SolanaState, address: &str) -> Result<TokenInfoResponse> {
    let mint = parse_pubkey(address, "mint")?;

    let supply = solana
        .manager
        .get_token_supply(&mint, Commitment::Confirmed)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Token mint not found: {}", address)))?;

    Ok(TokenInfoResponse {
        address: mint.to_string(),
        decimals: supply.decimals,
        supply: supply.amount.to_string(),
        ui_supply: supply.ui_amount,
    })
}
