//! # Centralized Error Handling
//!
//! [`AppError`] is the error every HTTP-facing service returns. It maps onto
//! a status code and renders as `{ "error": ..., "code": ... }`.
//!
//! 1. **Client Errors** (4xx)
//!    - [`InvalidInput`](AppError::InvalidInput) → 400 Bad Request
//!    - [`NotFound`](AppError::NotFound) → 404 Not Found
//!
//! 2. **Server Errors** (5xx)
//!    - [`Rpc`](AppError::Rpc) → 502 Bad Gateway (upstream RPC failed)
//!    - [`Unavailable`](AppError::Unavailable) → 500 (no data to serve, not even stale)
//!    - [`Config`](AppError::Config) / [`Internal`](AppError::Internal) /
//!      [`Decoding`](AppError::Decoding) → 500
//!
//! Freshness failures (poll, health check, cache) never become an `AppError`;
//! they are absorbed where they happen and only surface as staleness.

use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;
use thiserror::Error;

/// Convenience type alias for `Result<T, AppError>`.
pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration error during startup or environment loading.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Solana RPC failure (network, rate limit, node issues).
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Requested data has never been read successfully.
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// Malformed caller input (bad address, bad query parameter).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Decoding error: {0}")]
    Decoding(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Rpc(_) => StatusCode::BAD_GATEWAY,
            AppError::Unavailable(_)
            | AppError::Config(_)
            | AppError::Decoding(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the caller.
    ///
    /// Client errors echo their detail; server errors are summarized so
    /// endpoint URLs (which may carry API keys) never leak.
    pub fn user_message(&self) -> String {
        match self {
            AppError::InvalidInput(msg) | AppError::NotFound(msg) | AppError::Unavailable(msg) => {
                msg.clone()
            }
            AppError::Rpc(_) => "Service temporarily unavailable".to_string(),
            AppError::Config(_) | AppError::Decoding(_) | AppError::Internal(_) => {
                "An internal error occurred".to_string()
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "Config",
            AppError::Rpc(_) => "Rpc",
            AppError::Unavailable(_) => "Unavailable",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::NotFound(_) => "NotFound",
            AppError::Decoding(_) => "Decoding",
            AppError::Internal(_) => "Internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_client_error() {
            tracing::debug!("Client error: {}", self);
        } else {
            tracing::error!("Server error: {}", self);
        }

        let body = Json(json!({
            "error": self.user_message(),
            "code": self.code(),
        }));

        (status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Decoding(format!("JSON error: {}", err))
    }
}
