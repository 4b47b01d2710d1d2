//! # Pool Client
//!
//! Client-side companion to the gateway.
//!
//! - [`api`]: REST client
//! - [`fallback`]: rate-limited HTTP polling for when the socket is down
//! - [`realtime`]: `/ws` client with reconnect backoff
//!
//! ```rust,no_run
//! use pool_client::{ApiClient, PollingFallback, RealtimeClient};
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let api = Arc::new(ApiClient::new("http://127.0.0.1:3001"));
//! let fallback = PollingFallback::new(api);
//! let realtime = RealtimeClient::new("http://127.0.0.1:3001");
//!
//! if !realtime.is_open() {
//!     if let Some(snapshot) = fallback.fetch(false).await {
//!         println!("{} SOL in pool", snapshot.native_reserve);
//!     }
//! }
//! # }
//! ```

pub mod api;
pub mod error;
pub mod fallback;
pub mod realtime;

pub use api::ApiClient;
pub use error::ClientError;
pub use fallback::{PollingFallback, SnapshotFetcher};
pub use realtime::{ConnectionState, RealtimeClient, RealtimeEvent};
