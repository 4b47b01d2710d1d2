//! # Client Errors
//!
//! [`ClientError`] covers everything that can go wrong talking to the
//! gateway. None of it is fatal: the fallback keeps its cache and the
//! realtime client reconnects.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection refused, timeout, DNS
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response; `message` is the server's `error` field when present
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Decode(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        ClientError::WebSocket(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
