//! # Middleware
//!
//! - **[`mw_req_stamp`]**: request ID stamping (`X-Request-ID`)
//! - **[`mw_logging`]**: structured request/response logging

// region: --- Modules
pub mod mw_logging;
pub mod mw_req_stamp;
// endregion: --- Modules

// region: --- Re-exports
pub use mw_logging::log_requests;
pub use mw_req_stamp::{stamp_req, RequestStamp};
// endregion: --- Re-exports
