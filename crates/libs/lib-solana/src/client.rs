//! # Solana RPC Transport
//!
//! The seam between the connection manager and the network.
//!
//! - [`RpcTransport`]: one live handle bound to one endpoint. The read calls
//!   the gateway makes go through it.
//! - [`RpcConnector`]: builds and verifies a new handle for an endpoint URL.
//!
//! [`SolanaConnector`] / [`SolanaTransport`] are the production
//! implementations over the nonblocking `solana_client` RPC client; tests
//! plug in in-memory implementations.
//!
//! ## Example
//!
//! ```rust,no_run
//! use lib_solana::client::{RpcConnector, SolanaConnector};
//! use lib_solana::types::Commitment;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), lib_solana::client::RpcError> {
//! let connector = SolanaConnector::new(Duration::from_secs(30), Commitment::Confirmed);
//! let handle = connector.connect("https://api.devnet.solana.com").await?;
//! println!("node version {}", handle.get_version().await?);
//! # Ok(())
//! # }
//! ```

use crate::types::{AccountSummary, Commitment, SignatureInfo, TokenAmount};
use async_trait::async_trait;
use solana_client::client_error::ClientError;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_client::GetConfirmedSignaturesForAddress2Config;
use solana_commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Transport-level RPC failure.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RpcError {
    /// Network failure, timeout, or node-side error.
    #[error("RPC transport error: {0}")]
    Transport(String),

    /// No connection has been established yet (creation pending or failing).
    #[error("No RPC connection is ready")]
    NotConnected,

    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

impl From<ClientError> for RpcError {
    fn from(err: ClientError) -> Self {
        RpcError::Transport(err.to_string())
    }
}

impl From<RpcError> for lib_core::AppError {
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::InvalidAddress(msg) => lib_core::AppError::InvalidInput(msg),
            other => lib_core::AppError::Rpc(other.to_string()),
        }
    }
}

impl From<Commitment> for CommitmentConfig {
    fn from(commitment: Commitment) -> Self {
        match commitment {
            Commitment::Processed => CommitmentConfig::processed(),
            Commitment::Confirmed => CommitmentConfig::confirmed(),
            Commitment::Finalized => CommitmentConfig::finalized(),
        }
    }
}

/// A live RPC handle bound to one endpoint.
///
/// "Account does not exist" is `Ok(None)`, never an error.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// Endpoint URL this handle talks to.
    fn endpoint(&self) -> &str;

    /// Lightweight liveness call.
    async fn get_version(&self) -> Result<String, RpcError>;

    async fn get_account(
        &self,
        pubkey: &Pubkey,
        commitment: Commitment,
    ) -> Result<Option<AccountSummary>, RpcError>;

    /// Native balance in lamports; a missing account has zero lamports.
    async fn get_balance(&self, pubkey: &Pubkey, commitment: Commitment) -> Result<u64, RpcError>;

    async fn get_token_account_balance(
        &self,
        token_account: &Pubkey,
        commitment: Commitment,
    ) -> Result<Option<TokenAmount>, RpcError>;

    async fn get_token_supply(
        &self,
        mint: &Pubkey,
        commitment: Commitment,
    ) -> Result<Option<TokenAmount>, RpcError>;

    async fn get_program_accounts(
        &self,
        program_id: &Pubkey,
    ) -> Result<Vec<(Pubkey, AccountSummary)>, RpcError>;

    /// Most recent signatures for an address, newest first, at most `limit`.
    async fn get_signatures_for_address(
        &self,
        address: &Pubkey,
        limit: usize,
    ) -> Result<Vec<SignatureInfo>, RpcError>;
}

/// Creates handles for endpoint URLs.
#[async_trait]
pub trait RpcConnector: Send + Sync {
    /// Build a handle and verify the endpoint answers.
    async fn connect(&self, endpoint: &str) -> Result<Arc<dyn RpcTransport>, RpcError>;
}

/// Production connector over `solana_client`.
#[derive(Debug, Clone)]
pub struct SolanaConnector {
    timeout: Duration,
    commitment: Commitment,
}

impl SolanaConnector {
    pub fn new(timeout: Duration, commitment: Commitment) -> Self {
        Self { timeout, commitment }
    }
}

#[async_trait]
impl RpcConnector for SolanaConnector {
    async fn connect(&self, endpoint: &str) -> Result<Arc<dyn RpcTransport>, RpcError> {
        let transport = SolanaTransport::new(endpoint, self.timeout, self.commitment);

        // Check liveness before handing the handle out; a dead endpoint fails here.
        let version = transport.get_version().await?;
        info!(endpoint = %redact(endpoint), version = %version, "RPC connection established");

        Ok(Arc::new(transport))
    }
}

/// `RpcTransport` over the nonblocking Solana RPC client.
pub struct SolanaTransport {
    endpoint: String,
    client: RpcClient,
}

impl SolanaTransport {
    pub fn new(endpoint: &str, timeout: Duration, commitment: Commitment) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            client: RpcClient::new_with_timeout_and_commitment(
                endpoint.to_string(),
                timeout,
                commitment.into(),
            ),
        }
    }
}

#[async_trait]
impl RpcTransport for SolanaTransport {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn get_version(&self) -> Result<String, RpcError> {
        let version = self.client.get_version().await?;
        Ok(version.solana_core)
    }

    async fn get_account(
        &self,
        pubkey: &Pubkey,
        commitment: Commitment,
    ) -> Result<Option<AccountSummary>, RpcError> {
        let response = self
            .client
            .get_account_with_commitment(pubkey, commitment.into())
            .await?;

        Ok(response.value.map(|account| AccountSummary {
            lamports: account.lamports,
            owner: account.owner.to_string(),
            executable: account.executable,
            data: account.data,
        }))
    }

    async fn get_balance(&self, pubkey: &Pubkey, commitment: Commitment) -> Result<u64, RpcError> {
        let response = self
            .client
            .get_balance_with_commitment(pubkey, commitment.into())
            .await?;
        Ok(response.value)
    }

    async fn get_token_account_balance(
        &self,
        token_account: &Pubkey,
        commitment: Commitment,
    ) -> Result<Option<TokenAmount>, RpcError> {
        match self
            .client
            .get_token_account_balance_with_commitment(token_account, commitment.into())
            .await
        {
            Ok(response) => {
                parse_amount(&response.value.amount, response.value.decimals).map(Some)
            }
            Err(e) if is_missing_account(&e) => {
                debug!(account = %token_account, "Token account does not exist");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_token_supply(
        &self,
        mint: &Pubkey,
        commitment: Commitment,
    ) -> Result<Option<TokenAmount>, RpcError> {
        match self
            .client
            .get_token_supply_with_commitment(mint, commitment.into())
            .await
        {
            Ok(response) => {
                parse_amount(&response.value.amount, response.value.decimals).map(Some)
            }
            Err(e) if is_missing_account(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_program_accounts(
        &self,
        program_id: &Pubkey,
    ) -> Result<Vec<(Pubkey, AccountSummary)>, RpcError> {
        let accounts = self.client.get_program_accounts(program_id).await?;

        Ok(accounts
            .into_iter()
            .map(|(pubkey, account)| {
                (
                    pubkey,
                    AccountSummary {
                        lamports: account.lamports,
                        owner: account.owner.to_string(),
                        executable: account.executable,
                        data: account.data,
                    },
                )
            })
            .collect())
    }

    async fn get_signatures_for_address(
        &self,
        address: &Pubkey,
        limit: usize,
    ) -> Result<Vec<SignatureInfo>, RpcError> {
        let config = GetConfirmedSignaturesForAddress2Config {
            before: None,
            until: None,
            limit: Some(limit),
            commitment: Some(self.client.commitment()),
        };
        let signatures = self
            .client
            .get_signatures_for_address_with_config(address, config)
            .await?;

        Ok(signatures
            .into_iter()
            .take(limit)
            .map(|sig| SignatureInfo {
                signature: sig.signature,
                slot: sig.slot,
                block_time: sig.block_time,
                success: sig.err.is_none(),
                memo: sig.memo,
            })
            .collect())
    }
}

fn parse_amount(raw: &str, decimals: u8) -> Result<TokenAmount, RpcError> {
    raw.parse::<u64>()
        .map(|amount| TokenAmount::new(amount, decimals))
        .map_err(|e| RpcError::Transport(format!("Malformed token amount '{}': {}", raw, e)))
}

/// The node reports missing or non-token accounts as "Invalid param" errors.
fn is_missing_account(err: &ClientError) -> bool {
    let msg = err.to_string();
    msg.contains("could not find account") || msg.contains("not a Token")
}

/// Strip query strings so API keys never reach the logs.
pub fn redact(endpoint: &str) -> &str {
    endpoint.split('?').next().unwrap_or(endpoint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Answer one JSON-RPC POST with `result` and hand back the request body.
    async fn one_shot_rpc(result: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            let body = loop {
                let n = socket.read(&mut buf).await.unwrap();
                raw.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&raw).to_string();
                if let Some(split) = text.find("\r\n\r\n") {
                    let length = text[..split]
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if raw.len() >= split + 4 + length {
                        break text[split + 4..split + 4 + length].to_string();
                    }
                }
                assert!(n > 0, "client closed before sending the body");
            };

            let payload = format!(r#"{{"jsonrpc":"2.0","result":{},"id":1}}"#, result);
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                payload.len(),
                payload
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            body
        });

        (url, server)
    }

    #[tokio::test]
    async fn test_signature_limit_sent_to_node() {
        let (url, server) = one_shot_rpc("[]").await;
        let transport = SolanaTransport::new(&url, Duration::from_secs(5), Commitment::Confirmed);

        let signatures = transport
            .get_signatures_for_address(&Pubkey::new_unique(), 7)
            .await
            .unwrap();
        assert!(signatures.is_empty());

        let request: serde_json::Value = serde_json::from_str(&server.await.unwrap()).unwrap();
        assert_eq!(request["method"], "getSignaturesForAddress");
        assert_eq!(request["params"][1]["limit"], 7);
    }

    #[test]
    fn test_redact_strips_api_key() {
        assert_eq!(
            redact("https://mainnet.helius-rpc.com/?api-key=secret"),
            "https://mainnet.helius-rpc.com/"
        );
        assert_eq!(redact("https://api.devnet.solana.com"), "https://api.devnet.solana.com");
    }

    #[test]
    fn test_parse_amount() {
        let amount = parse_amount("2500000", 6).unwrap();
        assert_eq!(amount.amount, 2_500_000);
        assert_eq!(amount.ui_amount, 2.5);
        assert!(parse_amount("not-a-number", 6).is_err());
    }

    #[test]
    fn test_rpc_error_to_app_error() {
        let app: lib_core::AppError = RpcError::InvalidAddress("bad".into()).into();
        assert_eq!(app.status_code().as_u16(), 400);

        let app: lib_core::AppError = RpcError::NotConnected.into();
        assert_eq!(app.status_code().as_u16(), 502);
    }
}
