//! # Realtime Envelopes
//!
//! Messages exchanged on `GET /ws`. Every frame is a JSON object with a
//! `type` discriminator:
//!
//! ```text
//! server → client   {"type":"connection","clientId":"…"}
//!                   {"type":"subscription","status":"subscribed","channel":"pool_updates"}
//!                   {"type":"pool_update","data":{…PoolSnapshot…}}
//!                   {"type":"error","message":"…"}
//! client → server   {"type":"subscribe","channel":"pool_updates"}
//!                   {"type":"unsubscribe","channel":"pool_updates"}
//! ```

use crate::dto::pool::PoolSnapshot;
use serde::{Deserialize, Serialize};

/// Channel carrying [`ServerMessage::PoolUpdate`] frames.
pub const POOL_UPDATES_CHANNEL: &str = "pool_updates";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Subscribed,
    Unsubscribed,
}

/// Server → client frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Connection {
        #[serde(rename = "clientId")]
        client_id: String,
    },
    Subscription {
        status: SubscriptionStatus,
        channel: String,
    },
    PoolUpdate {
        data: PoolSnapshot,
    },
    Error {
        message: String,
    },
}

/// Client → server frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Subscribe { channel: String },
    Unsubscribe { channel: String },
}
