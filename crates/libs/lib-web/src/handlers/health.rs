//! # Health Handler
//!
//! `GET /health` reports the RPC connection and realtime state without
//! making any RPC call.

use crate::server::AppState;
use axum::{extract::State, Json};
use lib_solana::client::redact;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// `ok` with a live RPC handle, `degraded` otherwise
    pub status: &'static str,
    /// Active endpoint, or the next one to be tried (query string stripped)
    pub endpoint: String,
    pub connected: bool,
    pub realtime_clients: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_snapshot_at: Option<u64>,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let manager = &state.solana.manager;
    let connected = manager.is_connected();
    let endpoint = manager
        .active_endpoint()
        .unwrap_or_else(|| manager.current_endpoint());

    Json(HealthResponse {
        status: if connected { "ok" } else { "degraded" },
        endpoint: redact(&endpoint).to_string(),
        connected,
        realtime_clients: state.hub.connection_count(),
        last_snapshot_at: state.solana.poller.latest().map(|s| s.timestamp_ms),
    })
}
