//! # Shared Wire Contract
//!
//! Types exchanged between the pool gateway (`lib-web`) and its clients
//! (`pool-client`). Everything here serializes with `serde` to the JSON shape
//! the browser client already consumes, so field names are camelCase on the
//! wire even though they are snake_case in Rust.
//!
//! - **[`dto::pool`]**: [`PoolSnapshot`] and the HTTP pool/balance responses
//! - **[`dto::realtime`]**: WebSocket envelopes and channel names
//! - **[`units`]**: lamport / token-unit conversions used on both sides

pub mod dto;
pub mod units;

pub use dto::*;
pub use units::*;
