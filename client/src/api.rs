//! # API Client
//!
//! REST client for the gateway's `/api/*` routes.

use crate::error::{ClientError, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use shared::{
    BalancesResponse, ErrorResponse, PoolDataResponse, PoolInfoResponse, TokenInfoResponse,
    TransactionsResponse,
};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3001";

/// HTTP client for the gateway.
///
/// Requests time out after 10 seconds so a stalled server never blocks the
/// caller's refresh loop.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "GET");

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if status.is_success() {
            response.json::<T>().await.map_err(|e| ClientError::Decode(e.to_string()))
        } else {
            let message = response
                .json::<ErrorResponse>()
                .await
                .map(|body| body.error)
                .unwrap_or_else(|_| status.to_string());
            Err(ClientError::Http {
                status: status.as_u16(),
                message,
            })
        }
    }

    pub async fn get_pool_data(&self) -> Result<PoolDataResponse> {
        self.get_json("/api/pool-data").await
    }

    pub async fn get_pool_info(&self) -> Result<PoolInfoResponse> {
        self.get_json("/api/pool").await
    }

    pub async fn get_balances(&self, address: &str) -> Result<BalancesResponse> {
        self.get_json(&format!("/api/balances/{}", address)).await
    }

    pub async fn get_token_info(&self, mint: &str) -> Result<TokenInfoResponse> {
        self.get_json(&format!("/api/token/{}", mint)).await
    }

    pub async fn get_transactions(&self, address: &str, limit: usize) -> Result<TransactionsResponse> {
        self.get_json(&format!("/api/transactions/{}?limit={}", address, limit))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = ApiClient::new("http://localhost:3001/");
        assert_eq!(client.base_url(), "http://localhost:3001");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        // Port 9 (discard) is not served locally
        let client = ApiClient::new("http://127.0.0.1:9");
        let err = client.get_pool_data().await.unwrap_err();
        assert!(matches!(err, ClientError::Network(_)));
    }
}
