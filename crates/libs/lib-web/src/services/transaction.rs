//! # Transaction Service
//!
//! Recent signature history for an address.
//!
//! ## Architecture
//!
//! ```text
//! TransactionService → ConnectionManager → RpcTransport::get_signatures_for_address
//! ```
//!
//! History is not cached: callers ask for it to see the newest entries.

use lib_core::Result;
use lib_solana::spl_token::parse_pubkey;
use lib_solana::SolanaState;
use shared::{TransactionSummary, TransactionsResponse};
use std::sync::Arc;
use tracing::{debug, instrument};

pub const DEFAULT_LIMIT: usize = 10;
pub const MAX_LIMIT: usize = 100;

/// Clamp a requested page size to `1..=MAX_LIMIT`, defaulting when absent.
pub fn clamp_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

pub struct TransactionService {
    solana: Arc<SolanaState>,
}

impl TransactionService {
    pub fn new(solana: Arc<SolanaState>) -> Self {
        Self { solana }
    }

    #[instrument(skip(self))]
    pub async fn get_transactions(&self, address: &str, limit: Option<usize>) -> Result<TransactionsResponse> {
        let pubkey = parse_pubkey(address, "wallet")?;
        let limit = clamp_limit(limit);

        let signatures = self
            .solana
            .manager
            .get_signatures_for_address(&pubkey, limit)
            .await?;
        debug!(count = signatures.len(), limit, "Fetched signature history");

        Ok(TransactionsResponse {
            address: pubkey.to_string(),
            transactions: signatures
                .into_iter()
                .map(|sig| TransactionSummary {
                    signature: sig.signature,
                    slot: sig.slot,
                    block_time: sig.block_time,
                    success: sig.success,
                    memo: sig.memo,
                })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(None), 10);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(25)), 25);
        assert_eq!(clamp_limit(Some(1_000)), 100);
    }
}
