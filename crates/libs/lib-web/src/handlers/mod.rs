//! # HTTP Request Handlers
//!
//! Axum handlers organized by feature. Handlers stay thin: extract, delegate
//! to [`crate::services`], wrap the result in `Json`.
//!
//! ## Handler Modules
//!
//! - **[`pool`]**: pool reserves and addresses
//!   - `GET /api/pool-data` - current snapshot (cached, stale fallback)
//!   - `GET /api/pool` - program/authority/vault addresses
//!
//! - **[`wallet`]**: `GET /api/balances/{address}` - native and pool-token balances
//!
//! - **[`token`]**: `GET /api/token/{address}` - mint decimals and supply
//!
//! - **[`transaction`]**: `GET /api/transactions/{address}?limit=N` - recent signatures
//!
//! - **[`health`]**: `GET /health` - RPC and realtime status
//!
//! - **[`websocket`]**: `GET /ws` - realtime pool updates
//!
//! ## Error Handling
//!
//! Handlers return [`lib_core::Result<Json<T>>`]. [`lib_core::AppError`]
//! renders as `{ "error": "..." }` with the matching status code:
//! invalid input is 400, unknown mint is 404, everything upstream is 500.

pub mod health;
pub mod pool;
pub mod token;
pub mod transaction;
pub mod wallet;
pub mod websocket;
