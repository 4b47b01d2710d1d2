//! # Core Library
//!
//! Configuration and the application-wide error type.

pub mod config;
pub mod error;

// Re-export commonly used types
pub use config::{Config, Network, DEFAULT_POOL_PROGRAM_ID};
pub use error::{AppError, Result};
