//! # Wallet Service
//!
//! Native and pool-token balances for an arbitrary wallet.
//!
//! Balance reads never fail: a missing token account or an unreachable RPC
//! shows as zero. Only a malformed address is an error.
//!
//! ```text
//! get_balances → ConnectionManager::get_balance                (native)
//!              → ConnectionManager::get_token_account_balance  (ATA, mint A)
//!              → ConnectionManager::get_token_account_balance  (ATA, mint B)
//!              → ReferencePrice::usd_price                     (solUsd)
//! ```

use lib_core::Result;
use lib_solana::spl_token::{associated_token_address, parse_pubkey};
use lib_solana::{Commitment, SolanaState};
use shared::{lamports_to_sol, BalancesResponse};
use std::sync::Arc;
use tracing::{instrument, warn};

pub struct WalletService {
    solana: Arc<SolanaState>,
}

impl WalletService {
    pub fn new(solana: Arc<SolanaState>) -> Self {
        Self { solana }
    }

    #[instrument(skip(self))]
    pub async fn get_balances(&self, address: &str) -> Result<BalancesResponse> {
        let owner = parse_pubkey(address, "wallet")?;
        let accounts = &self.solana.accounts;
        let manager = &self.solana.manager;

        let token_a_account = associated_token_address(&owner, &accounts.token_a_mint);
        let token_b_account = associated_token_address(&owner, &accounts.token_b_mint);

        let (native, token_a, token_b) = tokio::join!(
            manager.get_balance(&owner, Commitment::Confirmed),
            manager.get_token_account_balance(&token_a_account, Commitment::Confirmed),
            manager.get_token_account_balance(&token_b_account, Commitment::Confirmed),
        );

        let sol = lamports_to_sol(native.or_zero());
        let price = match self.solana.price.usd_price().await {
            Ok(price) => price,
            Err(e) => {
                warn!(error = %e, "Reference price unavailable, reporting solUsd as 0");
                0.0
            }
        };

        Ok(BalancesResponse {
            sol,
            sol_usd: sol * price,
            yot: token_a.or_zero().ui_amount,
            yos: token_b.or_zero().ui_amount,
            timestamp: lib_utils::now_millis(),
        })
    }
}
