//! # Data Transfer Objects
//!
//! ## Module Organization
//!
//! - [`pool`] - pool snapshots and the REST responses built from them
//! - [`realtime`] - `/ws` message envelopes
//!
//! ## Serialization Format
//!
//! - **Field naming**: camelCase on the wire (`#[serde(rename_all = "camelCase")]`)
//! - **Optional fields**: omitted when `None`
//! - **Envelopes**: internally tagged with a `type` field

pub mod pool;
pub mod realtime;

pub use pool::*;
pub use realtime::*;
