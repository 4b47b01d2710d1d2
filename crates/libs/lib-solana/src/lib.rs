//! # Solana Library
//!
//! RPC connection management, caching and pool-state polling for the gateway.
//!
//! - [`client`]: RPC transport seam and the `solana_client` implementation
//! - [`connection`]: endpoint pool, failover, health checks, cached reads
//! - [`price`]: reference price feed
//! - [`pool_poller`]: periodic reserve reads and snapshot broadcast
//! - [`spl_token`]: PDA / ATA resolution
//! - [`state`]: wires the above from `Config`

pub mod client;
pub mod connection;
pub mod pool_poller;
pub mod price;
pub mod spl_token;
pub mod state;
pub mod types;

pub use client::{RpcConnector, RpcError, RpcTransport, SolanaConnector};
pub use connection::{ConnectionManager, ConnectionSettings, HealthStatus};
pub use pool_poller::{PoolStatePoller, TickOutcome};
pub use price::{FixedReferencePrice, HttpReferencePrice, ReferencePrice};
pub use spl_token::PoolAccounts;
pub use state::SolanaState;
pub use types::{Commitment, RpcOutcome};
