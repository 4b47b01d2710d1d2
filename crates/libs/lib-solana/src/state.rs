//! # Solana Integration State
//!
//! [`SolanaState`] wires the connection manager, the reference price feed and
//! the pool-state poller from one [`Config`]. `start_server` builds it once
//! and shares it through axum state.

use crate::client::{RpcConnector, SolanaConnector};
use crate::connection::{ConnectionManager, ConnectionSettings};
use crate::pool_poller::PoolStatePoller;
use crate::price::{FixedReferencePrice, HttpReferencePrice, ReferencePrice};
use crate::spl_token::PoolAccounts;
use lib_core::{AppError, Config};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Aggregate of the Solana-facing services.
#[derive(Clone)]
pub struct SolanaState {
    pub manager: Arc<ConnectionManager>,
    pub poller: Arc<PoolStatePoller>,
    pub price: Arc<dyn ReferencePrice>,
    pub accounts: PoolAccounts,
}

impl SolanaState {
    /// Build the production services from configuration.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let settings = ConnectionSettings::from_config(config);
        let connector = Arc::new(SolanaConnector::new(config.rpc_timeout, settings.commitment));

        let price: Arc<dyn ReferencePrice> = match &config.reference_price_url {
            Some(url) => Arc::new(
                HttpReferencePrice::new(url.clone(), config.reference_price_refresh)
                    .map_err(|e| AppError::Config(e.to_string()))?,
            ),
            None => Arc::new(FixedReferencePrice::new(config.reference_price_usd)),
        };

        Self::with_parts(config, connector, settings, price)
    }

    /// Build with an explicit connector and price source.
    pub fn with_parts(
        config: &Config,
        connector: Arc<dyn RpcConnector>,
        settings: ConnectionSettings,
        price: Arc<dyn ReferencePrice>,
    ) -> Result<Self, AppError> {
        let accounts = PoolAccounts::from_config(config)?;
        let manager = ConnectionManager::new(config.rpc_endpoints.clone(), connector, settings)?;

        let poller = Arc::new(PoolStatePoller::new(
            Arc::clone(&manager),
            accounts.clone(),
            Arc::clone(&price),
            config.poll_interval,
        ));

        info!(
            endpoints = config.rpc_endpoints.len(),
            program_id = %accounts.program_id,
            authority = %accounts.authority,
            price_source = price.source(),
            "Solana services initialized"
        );

        Ok(Self {
            manager,
            poller,
            price,
            accounts,
        })
    }

    /// Start the health checker, cache sweeper and poller.
    pub fn start_background_tasks(&self, config: &Config) -> Vec<JoinHandle<()>> {
        vec![
            self.manager.start_health_checks(),
            self.manager.start_cache_cleanup(config.cache_cleanup_interval),
            Arc::clone(&self.poller).start(),
        ]
    }
}
