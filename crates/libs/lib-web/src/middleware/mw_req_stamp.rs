//! # Request Stamping Middleware
//!
//! Gives every request an ID, stored in request extensions and echoed in the
//! `X-Request-ID` response header. An ID supplied by a fronting proxy is kept
//! so logs correlate across hops.
//!
//! ```rust,ignore
//! use axum::extract::Extension;
//! use lib_web::middleware::RequestStamp;
//!
//! async fn handler(Extension(stamp): Extension<RequestStamp>) -> String {
//!     format!("Request ID: {}", stamp.id)
//! }
//! ```

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::time::SystemTime;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Longest inbound ID accepted as-is.
const MAX_INBOUND_ID_LEN: usize = 128;

#[derive(Clone, Debug)]
pub struct RequestStamp {
    pub id: String,
    pub timestamp: SystemTime,
}

impl RequestStamp {
    fn from_request(req: &Request) -> Self {
        let inbound = req
            .headers()
            .get(&REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty() && id.len() <= MAX_INBOUND_ID_LEN)
            .map(str::to_string);

        Self {
            id: inbound.unwrap_or_else(|| Uuid::new_v4().to_string()),
            timestamp: SystemTime::now(),
        }
    }
}

pub async fn stamp_req(mut req: Request, next: Next) -> Response {
    let stamp = RequestStamp::from_request(&req);
    req.extensions_mut().insert(stamp.clone());

    let mut res = next.run(req).await;

    if let Ok(header_value) = HeaderValue::from_str(&stamp.id) {
        res.headers_mut().insert(REQUEST_ID_HEADER, header_value);
    }

    res
}
