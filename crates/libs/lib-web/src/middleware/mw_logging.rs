//! # Request/Response Logging Middleware
//!
//! One structured line per request and one per response, tagged with the
//! request ID from [`RequestStamp`](super::RequestStamp). Sensitive headers
//! are masked and secret-looking query parameters are redacted before
//! anything is logged.

use super::mw_req_stamp::RequestStamp;
use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Sensitive headers that should not be logged
const SENSITIVE_HEADERS: &[&str] = &["authorization", "cookie", "x-api-key", "x-auth-token"];

/// Query parameters whose values are masked
const SENSITIVE_PARAMS: &[&str] = &["api-key", "api_key", "apikey", "token", "key"];

/// Mask the values of sensitive query parameters.
pub fn redact_query(query: &str) -> String {
    query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((name, _)) if SENSITIVE_PARAMS.contains(&name.to_lowercase().as_str()) => {
                format!("{}=***", name)
            }
            _ => pair.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&")
}

pub async fn log_requests(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(redact_query);
    let is_websocket = path == "/ws";

    let request_id = req
        .extensions()
        .get::<RequestStamp>()
        .map(|s| s.id.clone())
        .unwrap_or_else(|| "unknown".to_string());

    let headers: Vec<(String, String)> = req
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            let name_lower = name.as_str().to_lowercase();
            if SENSITIVE_HEADERS.iter().any(|h| name_lower.contains(h)) {
                Some((name.to_string(), "***REDACTED***".to_string()))
            } else {
                value.to_str().ok().map(|v| (name.to_string(), v.to_string()))
            }
        })
        .collect();

    info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        query = ?query,
        is_websocket,
        "[REQUEST] {} {}{}",
        method,
        path,
        query.as_ref().map(|q| format!("?{}", q)).unwrap_or_default()
    );
    debug!(request_id = %request_id, headers = ?headers, "[REQUEST HEADERS]");

    let response = next.run(req).await;

    let duration = start.elapsed();
    let status = response.status();
    let status_code = status.as_u16();

    if status.is_server_error() {
        error!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status = status_code,
            duration_ms = duration.as_millis(),
            is_websocket,
            "[RESPONSE] {} {} -> {} ({}ms) [SERVER ERROR]",
            method,
            path,
            status_code,
            duration.as_millis()
        );
    } else if status.is_client_error() {
        warn!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status = status_code,
            duration_ms = duration.as_millis(),
            "[RESPONSE] {} {} -> {} ({}ms) [CLIENT ERROR]",
            method,
            path,
            status_code,
            duration.as_millis()
        );
    } else {
        info!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status = status_code,
            duration_ms = duration.as_millis(),
            "[RESPONSE] {} {} -> {} ({}ms)",
            method,
            path,
            status_code,
            duration.as_millis()
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_query_masks_keys() {
        assert_eq!(redact_query("limit=5&api-key=abc"), "limit=5&api-key=***");
        assert_eq!(redact_query("Token=x"), "Token=***");
    }

    #[test]
    fn test_redact_query_leaves_plain_params() {
        assert_eq!(redact_query("limit=5&flag"), "limit=5&flag");
    }
}
