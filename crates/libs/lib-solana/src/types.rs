//! # Solana Integration Type Definitions
//!
//! Plain data types shared by the transport, the connection manager and the
//! poller. They carry only what the gateway displays, so they stay cheap to
//! clone into caches.
//!
//! ## Type Categories
//!
//! ### Read results
//! - [`RpcOutcome`]: tagged result for reads that must never break display
//! - [`AccountSummary`]: the parts of an on-chain account the gateway reads
//! - [`TokenAmount`]: raw + UI token amount with decimals
//! - [`SignatureInfo`]: one entry of an address's signature history
//!
//! ### Request parameters
//! - [`Commitment`]: commitment level, part of every cache key

use serde::{Deserialize, Serialize};
use std::fmt;

/// Commitment level for RPC reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    #[default]
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Commitment::Processed => "processed",
            Commitment::Confirmed => "confirmed",
            Commitment::Finalized => "finalized",
        }
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a read whose failure must not break pure display.
///
/// `NotFound` means the RPC answered and the account does not exist;
/// `Unavailable` means the RPC could not be reached or errored. Both show as
/// zero through [`RpcOutcome::or_zero`], but callers that care can tell them
/// apart.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcOutcome<T> {
    Found(T),
    NotFound,
    Unavailable(String),
}

impl<T> RpcOutcome<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, RpcOutcome::Found(_))
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, RpcOutcome::Unavailable(_))
    }

    pub fn found(self) -> Option<T> {
        match self {
            RpcOutcome::Found(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> RpcOutcome<U> {
        match self {
            RpcOutcome::Found(value) => RpcOutcome::Found(f(value)),
            RpcOutcome::NotFound => RpcOutcome::NotFound,
            RpcOutcome::Unavailable(reason) => RpcOutcome::Unavailable(reason),
        }
    }
}

impl<T: Default> RpcOutcome<T> {
    /// Display value: the found value, otherwise `T::default()` (zero).
    pub fn or_zero(self) -> T {
        self.found().unwrap_or_default()
    }
}

/// On-chain account as seen by the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountSummary {
    pub lamports: u64,
    pub owner: String,
    pub executable: bool,
    pub data: Vec<u8>,
}

/// Token amount as returned by balance and supply queries.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TokenAmount {
    /// Raw base units
    pub amount: u64,
    pub decimals: u8,
    /// `amount / 10^decimals`
    pub ui_amount: f64,
}

impl TokenAmount {
    pub fn new(amount: u64, decimals: u8) -> Self {
        Self {
            amount,
            decimals,
            ui_amount: shared::raw_to_ui(amount, decimals),
        }
    }
}

/// One confirmed signature for an address, newest first in listings.
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureInfo {
    pub signature: String,
    pub slot: u64,
    pub block_time: Option<i64>,
    pub success: bool,
    pub memo: Option<String>,
}
