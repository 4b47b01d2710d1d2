//! In-memory RPC backend and app wiring for router tests.

use crate::server::{create_router, AppState};
use async_trait::async_trait;
use axum::Router;
use lib_core::{Config, Network, DEFAULT_POOL_PROGRAM_ID};
use lib_solana::client::{RpcConnector, RpcError, RpcTransport};
use lib_solana::types::{AccountSummary, SignatureInfo, TokenAmount};
use lib_solana::{Commitment, ConnectionSettings, FixedReferencePrice, SolanaState};
use parking_lot::Mutex;
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const TOKEN_A_MINT: &str = "2EmUMo6kgmospSja3FUpYT3Yrps2YjHJtU9oZohr5GPF";
pub const TOKEN_B_MINT: &str = "GcsjAVWYaTce9cpFLm2eGhRjZauvtSP3z3iMrZsrMW8n";
pub const REFERENCE_PRICE: f64 = 150.0;

#[derive(Default)]
pub struct MockChain {
    pub balances: Mutex<HashMap<Pubkey, u64>>,
    pub token_balances: Mutex<HashMap<Pubkey, TokenAmount>>,
    pub accounts: Mutex<HashMap<Pubkey, AccountSummary>>,
    pub fail_all: AtomicBool,
}

impl MockChain {
    /// Fails the way reqwest does, with the full request URL in the message.
    fn check(&self, endpoint: &str) -> Result<(), RpcError> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(RpcError::Transport(format!(
                "error sending request for url ({})",
                endpoint
            )));
        }
        Ok(())
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_all.store(failing, Ordering::SeqCst);
    }
}

struct MockTransport {
    endpoint: String,
    chain: Arc<MockChain>,
}

#[async_trait]
impl RpcTransport for MockTransport {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn get_version(&self) -> Result<String, RpcError> {
        self.chain.check(&self.endpoint)?;
        Ok("3.0.0".to_string())
    }

    async fn get_account(&self, pubkey: &Pubkey, _: Commitment) -> Result<Option<AccountSummary>, RpcError> {
        self.chain.check(&self.endpoint)?;
        Ok(self.chain.accounts.lock().get(pubkey).cloned())
    }

    async fn get_balance(&self, pubkey: &Pubkey, _: Commitment) -> Result<u64, RpcError> {
        self.chain.check(&self.endpoint)?;
        Ok(self.chain.balances.lock().get(pubkey).copied().unwrap_or(0))
    }

    async fn get_token_account_balance(
        &self,
        token_account: &Pubkey,
        _: Commitment,
    ) -> Result<Option<TokenAmount>, RpcError> {
        self.chain.check(&self.endpoint)?;
        Ok(self.chain.token_balances.lock().get(token_account).copied())
    }

    async fn get_token_supply(&self, mint: &Pubkey, _: Commitment) -> Result<Option<TokenAmount>, RpcError> {
        self.chain.check(&self.endpoint)?;
        Ok(self.chain.token_balances.lock().get(mint).copied())
    }

    async fn get_program_accounts(&self, _: &Pubkey) -> Result<Vec<(Pubkey, AccountSummary)>, RpcError> {
        self.chain.check(&self.endpoint)?;
        Ok(Vec::new())
    }

    async fn get_signatures_for_address(&self, _: &Pubkey, limit: usize) -> Result<Vec<SignatureInfo>, RpcError> {
        self.chain.check(&self.endpoint)?;
        Ok((0..limit.min(150))
            .map(|i| SignatureInfo {
                signature: format!("sig{}", i),
                slot: 1_000 - i as u64,
                block_time: Some(1_700_000_000),
                success: true,
                memo: None,
            })
            .collect())
    }
}

struct MockConnector {
    chain: Arc<MockChain>,
}

#[async_trait]
impl RpcConnector for MockConnector {
    async fn connect(&self, endpoint: &str) -> Result<Arc<dyn RpcTransport>, RpcError> {
        Ok(Arc::new(MockTransport {
            endpoint: endpoint.to_string(),
            chain: Arc::clone(&self.chain),
        }))
    }
}

pub fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".to_string(),
        allowed_origins: vec!["http://localhost:3000".to_string()],
        network: Network::Devnet,
        rpc_endpoints: vec![
            "https://rpc-0.test/?api-key=secret".to_string(),
            "https://rpc-1.test".to_string(),
        ],
        pool_program_id: DEFAULT_POOL_PROGRAM_ID.to_string(),
        pool_authority: None,
        token_a_mint: TOKEN_A_MINT.to_string(),
        token_b_mint: TOKEN_B_MINT.to_string(),
        reference_price_usd: REFERENCE_PRICE,
        reference_price_url: None,
        reference_price_refresh: Duration::from_secs(60),
        poll_interval: Duration::from_secs(5),
        pool_data_ttl: Duration::from_secs(30),
        health_check_interval: Duration::from_secs(60),
        connection_cooldown: Duration::from_secs(5),
        health_failure_threshold: 3,
        rpc_timeout: Duration::from_secs(30),
        cache_cleanup_interval: Duration::from_secs(60),
    }
}

pub struct TestApp {
    pub chain: Arc<MockChain>,
    pub state: AppState,
    pub router: Router,
}

pub fn test_app() -> TestApp {
    let config = test_config();
    let chain = Arc::new(MockChain::default());
    let connector = Arc::new(MockConnector { chain: Arc::clone(&chain) });

    let solana = SolanaState::with_parts(
        &config,
        connector,
        ConnectionSettings::default(),
        Arc::new(FixedReferencePrice::new(REFERENCE_PRICE)),
    )
    .unwrap();

    let state = AppState::new(config.clone(), Arc::new(solana));
    let router = create_router(state.clone(), &config.allowed_origins);
    TestApp { chain, state, router }
}
