//! # WebSocket Handler
//!
//! `GET /ws` upgrades to the realtime channel. After the upgrade the server
//! sends `{"type":"connection","clientId":"…"}`; a client then subscribes to
//! `pool_updates` and receives the latest snapshot followed by every change.
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:3001/ws');
//! ws.onopen = () => ws.send(JSON.stringify({ type: 'subscribe', channel: 'pool_updates' }));
//! ws.onmessage = (event) => {
//!   const msg = JSON.parse(event.data);
//!   if (msg.type === 'pool_update') console.log(msg.data.sol, msg.data.totalValue);
//! };
//! ```

use crate::realtime::{FanoutHub, Registration};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use lib_solana::SolanaState;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// **Route**: `GET /ws`
pub async fn pool_websocket(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(hub): State<Arc<FanoutHub>>,
    State(solana): State<Arc<SolanaState>>,
) -> Response {
    let client_ip = headers
        .get("x-forwarded-for")
        .or_else(|| headers.get("x-real-ip"))
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    let user_agent = headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    info!(
        client_ip = ?client_ip,
        user_agent = ?user_agent,
        connections = hub.connection_count(),
        "[WS] CONNECT_ATTEMPT ip={:?} path=/ws",
        client_ip
    );

    ws.on_upgrade(move |socket| async move {
        let registration = hub.register();
        handle_socket(socket, hub, solana, registration, client_ip).await;
    })
    .into_response()
}

async fn handle_socket(
    socket: WebSocket,
    hub: Arc<FanoutHub>,
    solana: Arc<SolanaState>,
    registration: Registration,
    client_ip: Option<String>,
) {
    let Registration { id: client_id, mut outbound } = registration;
    let (mut sender, mut receiver) = socket.split();
    let connection_start = Instant::now();
    let messages_sent = Arc::new(AtomicU64::new(0));
    let messages_received = Arc::new(AtomicU64::new(0));

    info!(
        client_id = %client_id,
        client_ip = ?client_ip,
        "[WS] CONNECTED client_id={} ip={:?}",
        client_id,
        client_ip
    );

    // Outbound: drain this connection's queue onto the socket
    let client_id_send = client_id.clone();
    let messages_sent_send = Arc::clone(&messages_sent);
    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            let json = match serde_json::to_string(&frame) {
                Ok(json) => json,
                Err(e) => {
                    error!(client_id = %client_id_send, error = %e, "[WS] SERIALIZE_ERROR client_id={}", client_id_send);
                    continue;
                }
            };

            if let Err(e) = sender.send(Message::Text(json.into())).await {
                warn!(
                    client_id = %client_id_send,
                    error = %e,
                    "[WS] SEND_ERROR client_id={} error={}",
                    client_id_send,
                    e
                );
                return true;
            }
            let count = messages_sent_send.fetch_add(1, Ordering::Relaxed) + 1;
            debug!(client_id = %client_id_send, total_sent = count, "[WS] MESSAGE_SENT client_id={}", client_id_send);
        }
        false
    });

    // Inbound: subscription control frames
    let client_id_recv = client_id.clone();
    let hub_recv = Arc::clone(&hub);
    let messages_received_recv = Arc::clone(&messages_received);
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    messages_received_recv.fetch_add(1, Ordering::Relaxed);
                    debug!(client_id = %client_id_recv, message = %text, "[WS] MESSAGE_RECEIVED client_id={}", client_id_recv);
                    hub_recv.handle_client_text(&client_id_recv, text.as_str(), solana.poller.latest());
                }
                Ok(Message::Binary(data)) => {
                    messages_received_recv.fetch_add(1, Ordering::Relaxed);
                    debug!(client_id = %client_id_recv, size = data.len(), "[WS] BINARY_RECEIVED client_id={}", client_id_recv);
                    hub_recv.send_error(&client_id_recv, "Binary frames are not supported");
                }
                Ok(Message::Close(frame)) => {
                    let reason = frame
                        .map(|f| u16::from(f.code).to_string())
                        .unwrap_or_else(|| "none".to_string());
                    info!(client_id = %client_id_recv, reason = %reason, "[WS] CLOSE_RECEIVED client_id={}", client_id_recv);
                    return false;
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
                Err(e) => {
                    error!(
                        client_id = %client_id_recv,
                        error = %e,
                        "[WS] RECV_ERROR client_id={} error={}",
                        client_id_recv,
                        e
                    );
                    return true;
                }
            }
        }
        false
    });

    let errored = tokio::select! {
        result = &mut send_task => {
            recv_task.abort();
            result.unwrap_or(true)
        }
        result = &mut recv_task => {
            send_task.abort();
            result.unwrap_or(true)
        }
    };
    if errored {
        hub.mark_error(&client_id);
    }
    hub.unregister(&client_id);

    let duration = connection_start.elapsed();
    info!(
        client_id = %client_id,
        client_ip = ?client_ip,
        errored,
        duration_ms = duration.as_millis(),
        messages_sent = messages_sent.load(Ordering::Relaxed),
        messages_received = messages_received.load(Ordering::Relaxed),
        "[WS] DISCONNECTED client_id={} duration={:.2}s",
        client_id,
        duration.as_secs_f64()
    );
}
