//! # Pool DTOs
//!
//! [`PoolSnapshot`] is produced by the server-side poller, pushed over `/ws`
//! and returned (with an optional `stale` flag) by `GET /api/pool-data`.
//!
//! ## JSON Format
//!
//! ```json
//! { "sol": 12.5, "yot": 1000000.0, "yos": 2500.0, "totalValue": 3750.0, "timestamp": 1718000000000 }
//! ```

use serde::{Deserialize, Serialize};

/// Immutable point-in-time read of the pool reserves.
///
/// The reserve fields carry the keys the web client has always used
/// (`sol`, `yot`, `yos`). `timestamp` is Unix milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    /// Native coin held by the pool authority, in SOL
    #[serde(rename = "sol")]
    pub native_reserve: f64,

    /// Token A (YOT) reserve, UI units
    #[serde(rename = "yot")]
    pub token_a_reserve: f64,

    /// Token B (YOS) reserve, UI units
    #[serde(rename = "yos")]
    pub token_b_reserve: f64,

    /// Native reserve valued at the reference price
    #[serde(rename = "totalValue")]
    pub derived_total_value: f64,

    /// When the snapshot was produced (Unix ms)
    #[serde(rename = "timestamp")]
    pub timestamp_ms: u64,
}

impl PoolSnapshot {
    /// Structural equality on everything except the production time.
    ///
    /// Two polls that read identical reserves produce snapshots that differ
    /// only in `timestamp_ms`; those must not trigger a broadcast.
    pub fn same_state(&self, other: &PoolSnapshot) -> bool {
        self.native_reserve == other.native_reserve
            && self.token_a_reserve == other.token_a_reserve
            && self.token_b_reserve == other.token_b_reserve
            && self.derived_total_value == other.derived_total_value
    }
}

/// `GET /api/pool-data` response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolDataResponse {
    #[serde(flatten)]
    pub snapshot: PoolSnapshot,

    /// Present (and `true`) only when the upstream read failed and a
    /// previously cached snapshot is being served.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stale: Option<bool>,
}

impl PoolDataResponse {
    pub fn fresh(snapshot: PoolSnapshot) -> Self {
        Self { snapshot, stale: None }
    }

    pub fn stale(snapshot: PoolSnapshot) -> Self {
        Self { snapshot, stale: Some(true) }
    }

    pub fn is_stale(&self) -> bool {
        self.stale.unwrap_or(false)
    }
}

/// `GET /api/balances/{address}` response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalancesResponse {
    pub sol: f64,
    pub sol_usd: f64,
    pub yot: f64,
    pub yos: f64,
    pub timestamp: u64,
}

/// `GET /api/token/{address}` response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfoResponse {
    pub address: String,
    pub decimals: u8,
    /// Raw supply as a decimal string (u64 does not survive JS numbers)
    pub supply: String,
    pub ui_supply: f64,
}

/// `GET /api/pool` response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolInfoResponse {
    pub program_id: String,
    pub program_state: String,
    pub authority: String,
    pub token_a_mint: String,
    pub token_b_mint: String,
    pub token_a_account: String,
    pub token_b_account: String,
    pub authority_lamports: u64,
    pub authority_exists: bool,
}

/// One entry of `GET /api/transactions/{address}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSummary {
    pub signature: String,
    pub slot: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_time: Option<i64>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

/// `GET /api/transactions/{address}` response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionsResponse {
    pub address: String,
    pub transactions: Vec<TransactionSummary>,
}

/// Structured error body returned by every failing route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}
