//! # Web Library
//!
//! HTTP and WebSocket surface of the pool gateway.
//!
//! - [`handlers`]: axum route handlers
//! - [`services`]: request logic on top of [`lib_solana::SolanaState`]
//! - [`realtime`]: `/ws` connection table and snapshot fan-out
//! - [`middleware`]: request stamping and logging
//! - [`server`]: state wiring, router and startup
//!
//! ## API
//!
//! ```bash
//! curl http://localhost:3001/api/pool-data
//! curl http://localhost:3001/api/balances/8W6QginkhTTxoP2deQjq7rZ9YMwN5FH9JYuLfSKuJKAL
//! curl "http://localhost:3001/api/transactions/8W6QginkhTTxoP2deQjq7rZ9YMwN5FH9JYuLfSKuJKAL?limit=5"
//! curl http://localhost:3001/health
//! ```

pub mod handlers;
pub mod middleware;
pub mod realtime;
pub mod server;
pub mod services;

#[cfg(test)]
pub(crate) mod test_support;

pub use server::{create_router, init_tracing, start_server, AppState, ServerConfig};
