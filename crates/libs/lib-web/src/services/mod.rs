//! # Services Layer
//!
//! Business logic between the HTTP handlers and the Solana layer:
//!
//! ```text
//! Handlers (HTTP) → Services → ConnectionManager / PoolStatePoller → Solana RPC
//! ```
//!
//! - [`pool`] - pool snapshot with TTL cache and stale fallback, pool addresses
//! - [`wallet`] - wallet balances (never fail on RPC trouble)
//! - [`token`] - mint supply
//! - [`transaction`] - signature history
//!
//! All services return `lib_core::Result<T>`; `AppError` renders the
//! response status and body.

pub mod pool;
pub mod token;
pub mod transaction;
pub mod wallet;

pub use pool::PoolDataService;
pub use transaction::TransactionService;
pub use wallet::WalletService;
