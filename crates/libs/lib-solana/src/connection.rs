//! # RPC Connection Manager
//!
//! Owns the endpoint pool and at most one live RPC handle, and fronts every
//! read the gateway makes with a TTL-LRU cache.
//!
//! ## Lifecycle
//!
//! - [`ConnectionManager::get_connection`] returns the current handle, or
//!   creates one. Creation is rate-limited by a cool-down; inside it the
//!   existing (possibly stale, possibly absent) handle is returned.
//! - A failed creation records the failure, rotates the cursor and schedules
//!   a fire-and-forget retry on the next endpoint. The caller gets `None`.
//! - [`ConnectionManager::health_check`] pings the active handle. Failures
//!   accumulate per endpoint; at the threshold the manager rotates and
//!   reconnects.
//!
//! ## Reads
//!
//! Cache keys are built from the arguments plus the commitment, and only
//! successful non-empty results are cached. `get_account_info` propagates
//! errors; balance reads return [`RpcOutcome`] and never fail.
//!
//! The manager is built once at startup and shared as
//! `Arc<ConnectionManager>`; there is no global instance.

use crate::client::{redact, RpcConnector, RpcError, RpcTransport};
use crate::types::{AccountSummary, Commitment, RpcOutcome, SignatureInfo, TokenAmount};
use lib_core::Config;
use lib_utils::TtlLruCache;
use parking_lot::Mutex;
use solana_sdk::pubkey::Pubkey;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

/// Ordered endpoint URLs with a rotation cursor and per-endpoint error counts.
#[derive(Debug, Clone)]
pub struct EndpointPool {
    endpoints: Vec<String>,
    cursor: usize,
    error_counts: Vec<u32>,
}

impl EndpointPool {
    pub fn new(endpoints: Vec<String>) -> Result<Self, RpcError> {
        if endpoints.is_empty() {
            return Err(RpcError::Transport("endpoint pool is empty".to_string()));
        }
        let error_counts = vec![0; endpoints.len()];
        Ok(Self {
            endpoints,
            cursor: 0,
            error_counts,
        })
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current(&self) -> &str {
        &self.endpoints[self.cursor]
    }

    pub fn endpoint(&self, index: usize) -> &str {
        &self.endpoints[index % self.endpoints.len()]
    }

    /// Advance the cursor; the only cursor mutator.
    pub fn rotate(&mut self) -> usize {
        self.cursor = (self.cursor + 1) % self.endpoints.len();
        self.cursor
    }

    pub fn record_failure(&mut self, index: usize) -> u32 {
        let count = &mut self.error_counts[index % self.endpoints.len()];
        *count = count.saturating_add(1);
        *count
    }

    pub fn reset_failures(&mut self, index: usize) {
        let len = self.endpoints.len();
        self.error_counts[index % len] = 0;
    }

    pub fn failures(&self, index: usize) -> u32 {
        self.error_counts[index % self.endpoints.len()]
    }
}

/// Capacity and TTL of one logical cache.
#[derive(Debug, Clone, Copy)]
pub struct CacheSpec {
    pub max_size: usize,
    pub ttl: Duration,
}

impl CacheSpec {
    pub const fn new(max_size: usize, ttl: Duration) -> Self {
        Self { max_size, ttl }
    }
}

/// Manager tuning. Defaults match the production gateway.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub cooldown: Duration,
    pub retry_delay: Duration,
    pub health_check_interval: Duration,
    pub failure_threshold: u32,
    pub commitment: Commitment,
    pub account_info_cache: CacheSpec,
    pub balance_cache: CacheSpec,
    pub program_accounts_cache: CacheSpec,
    pub token_supply_cache: CacheSpec,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_secs(5),
            retry_delay: Duration::from_secs(1),
            health_check_interval: Duration::from_secs(60),
            failure_threshold: 3,
            commitment: Commitment::Confirmed,
            account_info_cache: CacheSpec::new(500, Duration::from_secs(30)),
            balance_cache: CacheSpec::new(1_000, Duration::from_secs(10)),
            program_accounts_cache: CacheSpec::new(50, Duration::from_secs(60)),
            token_supply_cache: CacheSpec::new(100, Duration::from_secs(300)),
        }
    }
}

impl ConnectionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            cooldown: config.connection_cooldown,
            health_check_interval: config.health_check_interval,
            failure_threshold: config.health_failure_threshold.max(1),
            ..Self::default()
        }
    }
}

/// Result of one health-check pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    /// Liveness call failed; `failures` is the endpoint's running count.
    Degraded { failures: u32 },
    /// Threshold reached; the manager moved to the next endpoint.
    Rotated { to: usize },
    /// No handle to check.
    NotConnected,
}

struct Slot {
    handle: Option<Arc<dyn RpcTransport>>,
    /// Pool index the handle was created for
    endpoint_index: usize,
    last_attempt: Option<Instant>,
    connecting: bool,
    retry_scheduled: bool,
}

pub struct ConnectionManager {
    me: Weak<ConnectionManager>,
    connector: Arc<dyn RpcConnector>,
    settings: ConnectionSettings,
    pool: Mutex<EndpointPool>,
    slot: Mutex<Slot>,
    account_info_cache: TtlLruCache<String, AccountSummary>,
    balance_cache: TtlLruCache<String, u64>,
    token_balance_cache: TtlLruCache<String, TokenAmount>,
    token_supply_cache: TtlLruCache<String, TokenAmount>,
    program_accounts_cache: TtlLruCache<String, Arc<Vec<(Pubkey, AccountSummary)>>>,
}

impl ConnectionManager {
    pub fn new(
        endpoints: Vec<String>,
        connector: Arc<dyn RpcConnector>,
        settings: ConnectionSettings,
    ) -> Result<Arc<Self>, RpcError> {
        let pool = EndpointPool::new(endpoints)?;

        Ok(Arc::new_cyclic(|me| Self {
            me: me.clone(),
            connector,
            pool: Mutex::new(pool),
            slot: Mutex::new(Slot {
                handle: None,
                endpoint_index: 0,
                last_attempt: None,
                connecting: false,
                retry_scheduled: false,
            }),
            account_info_cache: TtlLruCache::new(
                "account-info",
                settings.account_info_cache.max_size,
                settings.account_info_cache.ttl,
            ),
            balance_cache: TtlLruCache::new(
                "balances",
                settings.balance_cache.max_size,
                settings.balance_cache.ttl,
            ),
            token_balance_cache: TtlLruCache::new(
                "token-balances",
                settings.balance_cache.max_size,
                settings.balance_cache.ttl,
            ),
            token_supply_cache: TtlLruCache::new(
                "token-supply",
                settings.token_supply_cache.max_size,
                settings.token_supply_cache.ttl,
            ),
            program_accounts_cache: TtlLruCache::new(
                "program-accounts",
                settings.program_accounts_cache.max_size,
                settings.program_accounts_cache.ttl,
            ),
            settings,
        }))
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    /// URL at the pool cursor.
    pub fn current_endpoint(&self) -> String {
        self.pool.lock().current().to_string()
    }

    pub fn cursor(&self) -> usize {
        self.pool.lock().cursor()
    }

    pub fn endpoint_failures(&self, index: usize) -> u32 {
        self.pool.lock().failures(index)
    }

    pub fn is_connected(&self) -> bool {
        self.slot.lock().handle.is_some()
    }

    /// Endpoint of the live handle, if any.
    pub fn active_endpoint(&self) -> Option<String> {
        self.slot
            .lock()
            .handle
            .as_ref()
            .map(|handle| handle.endpoint().to_string())
    }

    /// Current handle, creating one when absent or when `force_new` is set.
    ///
    /// Returns `None` when no handle exists and creation is cooling down,
    /// already in flight, or just failed.
    pub async fn get_connection(&self, force_new: bool) -> Option<Arc<dyn RpcTransport>> {
        {
            let mut slot = self.slot.lock();

            if !force_new {
                if let Some(handle) = &slot.handle {
                    return Some(Arc::clone(handle));
                }
            }

            let cooling_down = slot
                .last_attempt
                .is_some_and(|at| at.elapsed() < self.settings.cooldown);
            if cooling_down || slot.connecting {
                debug!(cooling_down, in_flight = slot.connecting, "Connection creation skipped");
                return slot.handle.clone();
            }

            slot.connecting = true;
            slot.last_attempt = Some(Instant::now());
        }

        self.establish_detached(self.retry_budget()).await
    }

    fn retry_budget(&self) -> usize {
        self.pool.lock().len()
    }

    /// Run `establish` on its own task. A caller dropped mid-connect leaves
    /// the attempt running, so `connecting` is always cleared.
    async fn establish_detached(&self, retries_left: usize) -> Option<Arc<dyn RpcTransport>> {
        let Some(manager) = self.me.upgrade() else {
            self.slot.lock().connecting = false;
            return None;
        };

        match tokio::spawn(async move { manager.establish(retries_left).await }).await {
            Ok(handle) => handle,
            Err(e) => {
                error!(error = %e, "RPC connection task aborted");
                let mut slot = self.slot.lock();
                slot.connecting = false;
                slot.handle.clone()
            }
        }
    }

    /// Create a handle on the cursor endpoint. Caller has set `connecting`.
    async fn establish(&self, retries_left: usize) -> Option<Arc<dyn RpcTransport>> {
        let (index, endpoint) = {
            let pool = self.pool.lock();
            (pool.cursor(), pool.current().to_string())
        };

        info!(endpoint = %redact(&endpoint), index, "Creating RPC connection");

        match self.connector.connect(&endpoint).await {
            Ok(handle) => {
                self.pool.lock().reset_failures(index);
                let mut slot = self.slot.lock();
                slot.handle = Some(Arc::clone(&handle));
                slot.endpoint_index = index;
                slot.connecting = false;
                Some(handle)
            }
            Err(e) => {
                let next = {
                    let mut pool = self.pool.lock();
                    let failures = pool.record_failure(index);
                    let next = pool.rotate();
                    warn!(
                        endpoint = %redact(&endpoint),
                        failures,
                        next = %redact(pool.current()),
                        error = %e,
                        "RPC connection failed, rotating endpoint"
                    );
                    next
                };

                let handle = {
                    let mut slot = self.slot.lock();
                    slot.connecting = false;
                    slot.handle.clone()
                };

                if retries_left > 0 {
                    self.schedule_retry(retries_left - 1);
                } else {
                    error!(next, "All RPC endpoints failed, waiting for next request or health check");
                }

                // Stale handle if one survives, otherwise "not ready yet"
                handle
            }
        }
    }

    fn schedule_retry(&self, retries_left: usize) {
        {
            let mut slot = self.slot.lock();
            if slot.retry_scheduled {
                return;
            }
            slot.retry_scheduled = true;
        }

        let weak = self.me.clone();
        let delay = self.settings.retry_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(manager) = weak.upgrade() else {
                return;
            };

            {
                let mut slot = manager.slot.lock();
                slot.retry_scheduled = false;
                if slot.connecting {
                    return;
                }
                slot.connecting = true;
                slot.last_attempt = Some(Instant::now());
            }
            manager.establish(retries_left).await;
        });
    }

    /// One liveness pass over the active handle.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> HealthStatus {
        let (handle, index) = {
            let slot = self.slot.lock();
            (slot.handle.clone(), slot.endpoint_index)
        };

        let Some(handle) = handle else {
            debug!("Health check found no connection, attempting to create one");
            self.get_connection(false).await;
            return HealthStatus::NotConnected;
        };

        match handle.get_version().await {
            Ok(version) => {
                self.pool.lock().reset_failures(index);
                debug!(endpoint = %redact(handle.endpoint()), version = %version, "RPC health check passed");
                HealthStatus::Healthy
            }
            Err(e) => {
                let (failures, rotated_to) = {
                    let mut pool = self.pool.lock();
                    let failures = pool.record_failure(index);
                    if failures >= self.settings.failure_threshold {
                        if pool.cursor() == index {
                            pool.rotate();
                        }
                        pool.reset_failures(index);
                        (failures, Some(pool.cursor()))
                    } else {
                        (failures, None)
                    }
                };

                warn!(
                    endpoint = %redact(handle.endpoint()),
                    failures,
                    threshold = self.settings.failure_threshold,
                    error = %e,
                    "RPC health check failed"
                );

                match rotated_to {
                    Some(to) => {
                        let start = {
                            let mut slot = self.slot.lock();
                            if slot.connecting {
                                false
                            } else {
                                slot.connecting = true;
                                slot.last_attempt = Some(Instant::now());
                                true
                            }
                        };
                        if start {
                            self.establish_detached(self.retry_budget()).await;
                        }
                        HealthStatus::Rotated { to }
                    }
                    None => HealthStatus::Degraded { failures },
                }
            }
        }
    }

    /// Run `health_check` on the configured interval until the manager is dropped.
    pub fn start_health_checks(&self) -> JoinHandle<()> {
        let weak = self.me.clone();
        let every = self.settings.health_check_interval;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval.tick().await;

            loop {
                interval.tick().await;
                let Some(manager) = weak.upgrade() else {
                    break;
                };
                manager.health_check().await;
            }
        })
    }

    /// Sweep every cache on a fixed interval.
    pub fn start_cache_cleanup(&self, every: Duration) -> JoinHandle<()> {
        let weak = self.me.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval.tick().await;

            loop {
                interval.tick().await;
                let Some(manager) = weak.upgrade() else {
                    break;
                };
                let removed = manager.cleanup_caches();
                if removed > 0 {
                    debug!(removed, "Swept expired RPC cache entries");
                }
            }
        })
    }

    pub fn cleanup_caches(&self) -> usize {
        self.account_info_cache.cleanup()
            + self.balance_cache.cleanup()
            + self.token_balance_cache.cleanup()
            + self.token_supply_cache.cleanup()
            + self.program_accounts_cache.cleanup()
    }

    pub fn clear_all_caches(&self) {
        self.account_info_cache.clear();
        self.balance_cache.clear();
        self.token_balance_cache.clear();
        self.token_supply_cache.clear();
        self.program_accounts_cache.clear();
        info!("Cleared all RPC caches");
    }

    async fn require_connection(&self) -> Result<Arc<dyn RpcTransport>, RpcError> {
        self.get_connection(false).await.ok_or(RpcError::NotConnected)
    }

    /// Account lookup. `Ok(None)` means the account does not exist.
    pub async fn get_account_info(
        &self,
        pubkey: &Pubkey,
        commitment: Commitment,
    ) -> Result<Option<AccountSummary>, RpcError> {
        let key = format!("{}:{}", pubkey, commitment);
        if let Some(account) = self.account_info_cache.get(&key) {
            return Ok(Some(account));
        }

        let handle = self.require_connection().await?;
        match handle.get_account(pubkey, commitment).await {
            Ok(Some(account)) => {
                self.account_info_cache.set(key, account.clone());
                Ok(Some(account))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                warn!(account = %pubkey, error = %e, "getAccountInfo failed");
                Err(e)
            }
        }
    }

    /// Native balance in lamports; never fails.
    pub async fn get_balance(&self, pubkey: &Pubkey, commitment: Commitment) -> RpcOutcome<u64> {
        let key = format!("{}:{}", pubkey, commitment);
        if let Some(lamports) = self.balance_cache.get(&key) {
            return RpcOutcome::Found(lamports);
        }

        let handle = match self.require_connection().await {
            Ok(handle) => handle,
            Err(e) => return RpcOutcome::Unavailable(e.to_string()),
        };

        match handle.get_balance(pubkey, commitment).await {
            Ok(lamports) => {
                self.balance_cache.set(key, lamports);
                RpcOutcome::Found(lamports)
            }
            Err(e) => {
                warn!(account = %pubkey, error = %e, "getBalance failed, reporting zero");
                RpcOutcome::Unavailable(e.to_string())
            }
        }
    }

    /// SPL token account balance; never fails.
    pub async fn get_token_account_balance(
        &self,
        token_account: &Pubkey,
        commitment: Commitment,
    ) -> RpcOutcome<TokenAmount> {
        let key = format!("{}:{}", token_account, commitment);
        if let Some(amount) = self.token_balance_cache.get(&key) {
            return RpcOutcome::Found(amount);
        }

        let handle = match self.require_connection().await {
            Ok(handle) => handle,
            Err(e) => return RpcOutcome::Unavailable(e.to_string()),
        };

        match handle.get_token_account_balance(token_account, commitment).await {
            Ok(Some(amount)) => {
                self.token_balance_cache.set(key, amount);
                RpcOutcome::Found(amount)
            }
            Ok(None) => RpcOutcome::NotFound,
            Err(e) => {
                warn!(account = %token_account, error = %e, "getTokenAccountBalance failed, reporting zero");
                RpcOutcome::Unavailable(e.to_string())
            }
        }
    }

    /// Mint supply; `Ok(None)` when the mint does not exist.
    pub async fn get_token_supply(
        &self,
        mint: &Pubkey,
        commitment: Commitment,
    ) -> Result<Option<TokenAmount>, RpcError> {
        let key = format!("{}:{}", mint, commitment);
        if let Some(amount) = self.token_supply_cache.get(&key) {
            return Ok(Some(amount));
        }

        let handle = self.require_connection().await?;
        let supply = handle.get_token_supply(mint, commitment).await?;
        if let Some(amount) = supply {
            self.token_supply_cache.set(key, amount);
        }
        Ok(supply)
    }

    pub async fn get_program_accounts(
        &self,
        program_id: &Pubkey,
    ) -> Result<Arc<Vec<(Pubkey, AccountSummary)>>, RpcError> {
        let key = format!("{}:{}", program_id, self.settings.commitment);
        if let Some(accounts) = self.program_accounts_cache.get(&key) {
            return Ok(accounts);
        }

        let handle = self.require_connection().await?;
        let accounts = Arc::new(handle.get_program_accounts(program_id).await?);
        if !accounts.is_empty() {
            self.program_accounts_cache.set(key, Arc::clone(&accounts));
        }
        Ok(accounts)
    }

    /// Signature history; not cached since callers want the latest entries.
    pub async fn get_signatures_for_address(
        &self,
        address: &Pubkey,
        limit: usize,
    ) -> Result<Vec<SignatureInfo>, RpcError> {
        let handle = self.require_connection().await?;
        handle.get_signatures_for_address(address, limit).await
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// In-memory chain state served by [`MockTransport`].
    #[derive(Default)]
    pub struct MockChain {
        pub balances: Mutex<HashMap<Pubkey, u64>>,
        pub token_balances: Mutex<HashMap<Pubkey, TokenAmount>>,
        pub accounts: Mutex<HashMap<Pubkey, AccountSummary>>,
        pub failing_token_accounts: Mutex<HashSet<Pubkey>>,
        pub fail_all: AtomicBool,
        pub calls: AtomicUsize,
    }

    impl MockChain {
        fn check(&self) -> Result<(), RpcError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_all.load(Ordering::SeqCst) {
                return Err(RpcError::Transport("connection refused".to_string()));
            }
            Ok(())
        }
    }

    pub struct MockTransport {
        pub endpoint: String,
        pub chain: Arc<MockChain>,
    }

    #[async_trait]
    impl RpcTransport for MockTransport {
        fn endpoint(&self) -> &str {
            &self.endpoint
        }

        async fn get_version(&self) -> Result<String, RpcError> {
            self.chain.check()?;
            Ok("3.0.0".to_string())
        }

        async fn get_account(
            &self,
            pubkey: &Pubkey,
            _commitment: Commitment,
        ) -> Result<Option<AccountSummary>, RpcError> {
            self.chain.check()?;
            Ok(self.chain.accounts.lock().get(pubkey).cloned())
        }

        async fn get_balance(&self, pubkey: &Pubkey, _commitment: Commitment) -> Result<u64, RpcError> {
            self.chain.check()?;
            Ok(self.chain.balances.lock().get(pubkey).copied().unwrap_or(0))
        }

        async fn get_token_account_balance(
            &self,
            token_account: &Pubkey,
            _commitment: Commitment,
        ) -> Result<Option<TokenAmount>, RpcError> {
            self.chain.check()?;
            if self.chain.failing_token_accounts.lock().contains(token_account) {
                return Err(RpcError::Transport("429 Too Many Requests".to_string()));
            }
            Ok(self.chain.token_balances.lock().get(token_account).copied())
        }

        async fn get_token_supply(
            &self,
            mint: &Pubkey,
            _commitment: Commitment,
        ) -> Result<Option<TokenAmount>, RpcError> {
            self.chain.check()?;
            Ok(self.chain.token_balances.lock().get(mint).copied())
        }

        async fn get_program_accounts(
            &self,
            _program_id: &Pubkey,
        ) -> Result<Vec<(Pubkey, AccountSummary)>, RpcError> {
            self.chain.check()?;
            Ok(self
                .chain
                .accounts
                .lock()
                .iter()
                .map(|(k, v)| (*k, v.clone()))
                .collect())
        }

        async fn get_signatures_for_address(
            &self,
            _address: &Pubkey,
            limit: usize,
        ) -> Result<Vec<SignatureInfo>, RpcError> {
            self.chain.check()?;
            Ok((0..limit.min(3))
                .map(|i| SignatureInfo {
                    signature: format!("sig{}", i),
                    slot: 100 - i as u64,
                    block_time: Some(1_700_000_000),
                    success: i != 1,
                    memo: None,
                })
                .collect())
        }
    }

    /// Connector that refuses any endpoint listed in `down`, optionally
    /// taking `connect_delay` to answer.
    pub struct MockConnector {
        pub chain: Arc<MockChain>,
        pub down: Mutex<HashSet<String>>,
        pub attempts: Mutex<Vec<String>>,
        pub connect_delay: Mutex<Option<Duration>>,
    }

    impl MockConnector {
        pub fn new(chain: Arc<MockChain>) -> Arc<Self> {
            Arc::new(Self {
                chain,
                down: Mutex::new(HashSet::new()),
                attempts: Mutex::new(Vec::new()),
                connect_delay: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl RpcConnector for MockConnector {
        async fn connect(&self, endpoint: &str) -> Result<Arc<dyn RpcTransport>, RpcError> {
            self.attempts.lock().push(endpoint.to_string());
            let delay = *self.connect_delay.lock();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if self.down.lock().contains(endpoint) {
                return Err(RpcError::Transport(format!("{} unreachable", endpoint)));
            }
            Ok(Arc::new(MockTransport {
                endpoint: endpoint.to_string(),
                chain: Arc::clone(&self.chain),
            }))
        }
    }

    pub fn endpoints() -> Vec<String> {
        vec![
            "https://rpc-0.test".to_string(),
            "https://rpc-1.test".to_string(),
            "https://rpc-2.test".to_string(),
        ]
    }

    pub fn manager(connector: Arc<MockConnector>) -> Arc<ConnectionManager> {
        ConnectionManager::new(endpoints(), connector, ConnectionSettings::default())
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use std::sync::atomic::Ordering;

    #[test]
    fn test_endpoint_pool_rotation_wraps() {
        let mut pool = EndpointPool::new(endpoints()).unwrap();
        assert_eq!(pool.cursor(), 0);
        assert_eq!(pool.rotate(), 1);
        assert_eq!(pool.rotate(), 2);
        assert_eq!(pool.rotate(), 0);
        assert_eq!(pool.current(), "https://rpc-0.test");
    }

    #[test]
    fn test_empty_pool_rejected() {
        assert!(EndpointPool::new(vec![]).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rotation_on_creation_failure() {
        let chain = Arc::new(MockChain::default());
        let connector = MockConnector::new(Arc::clone(&chain));
        connector.down.lock().insert("https://rpc-0.test".to_string());
        let manager = manager(Arc::clone(&connector));

        assert!(manager.get_connection(false).await.is_none());
        assert_eq!(manager.cursor(), 1);
        assert_eq!(manager.endpoint_failures(0), 1);

        // The scheduled retry connects to the next endpoint
        tokio::time::sleep(Duration::from_millis(1_100)).await;

        let handle = manager.get_connection(false).await.expect("connected after retry");
        assert_eq!(handle.endpoint(), "https://rpc-1.test");
        assert_eq!(
            *connector.attempts.lock(),
            vec!["https://rpc-0.test".to_string(), "https://rpc-1.test".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_limits_creation() {
        let chain = Arc::new(MockChain::default());
        let connector = MockConnector::new(Arc::clone(&chain));
        let manager = manager(Arc::clone(&connector));

        assert!(manager.get_connection(false).await.is_some());

        // Forced inside the cool-down returns the existing handle
        let handle = manager.get_connection(true).await.expect("existing handle");
        assert_eq!(handle.endpoint(), "https://rpc-0.test");
        assert_eq!(connector.attempts.lock().len(), 1);

        tokio::time::advance(Duration::from_secs(6)).await;
        manager.get_connection(true).await.expect("new handle");
        assert_eq!(connector.attempts.lock().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_connect_still_completes() {
        let chain = Arc::new(MockChain::default());
        let connector = MockConnector::new(Arc::clone(&chain));
        *connector.connect_delay.lock() = Some(Duration::from_secs(20));
        let manager = manager(Arc::clone(&connector));

        // Caller gives up long before the connector answers
        let abandoned = tokio::time::timeout(Duration::from_secs(1), manager.get_connection(false)).await;
        assert!(abandoned.is_err());
        assert!(!manager.is_connected());

        tokio::time::sleep(Duration::from_secs(30)).await;

        assert!(manager.is_connected());
        let handle = manager.get_connection(false).await.expect("handle from abandoned attempt");
        assert_eq!(handle.endpoint(), "https://rpc-0.test");
        assert_eq!(manager.health_check().await, HealthStatus::Healthy);
        assert_eq!(connector.attempts.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_failed_connect_does_not_block_retries() {
        let chain = Arc::new(MockChain::default());
        let connector = MockConnector::new(Arc::clone(&chain));
        *connector.connect_delay.lock() = Some(Duration::from_secs(20));
        connector.down.lock().insert("https://rpc-0.test".to_string());
        let manager = manager(Arc::clone(&connector));

        let abandoned = tokio::time::timeout(Duration::from_secs(1), manager.get_connection(false)).await;
        assert!(abandoned.is_err());

        // Failed attempt rotates and its retry reaches rpc-1
        tokio::time::sleep(Duration::from_secs(60)).await;

        let handle = manager.get_connection(false).await.expect("connected after retry");
        assert_eq!(handle.endpoint(), "https://rpc-1.test");
        assert_eq!(manager.endpoint_failures(0), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_health_threshold_rotates() {
        let chain = Arc::new(MockChain::default());
        let connector = MockConnector::new(Arc::clone(&chain));
        let manager = manager(Arc::clone(&connector));
        manager.get_connection(false).await.expect("connected");

        assert_eq!(manager.health_check().await, HealthStatus::Healthy);

        chain.fail_all.store(true, Ordering::SeqCst);
        assert_eq!(manager.health_check().await, HealthStatus::Degraded { failures: 1 });
        assert_eq!(manager.health_check().await, HealthStatus::Degraded { failures: 2 });

        // Third failure hits the threshold and reconnects on the next endpoint
        let outcome = manager.health_check().await;
        assert_eq!(outcome, HealthStatus::Rotated { to: 1 });
        assert_eq!(manager.cursor(), 1);
        assert_eq!(manager.endpoint_failures(0), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_health_success_resets_counter() {
        let chain = Arc::new(MockChain::default());
        let connector = MockConnector::new(Arc::clone(&chain));
        let manager = manager(connector);
        manager.get_connection(false).await.expect("connected");

        chain.fail_all.store(true, Ordering::SeqCst);
        manager.health_check().await;
        assert_eq!(manager.endpoint_failures(0), 1);

        chain.fail_all.store(false, Ordering::SeqCst);
        assert_eq!(manager.health_check().await, HealthStatus::Healthy);
        assert_eq!(manager.endpoint_failures(0), 0);
    }

    #[tokio::test]
    async fn test_account_info_cached_and_errors_propagate() {
        let chain = Arc::new(MockChain::default());
        let key = Pubkey::new_unique();
        chain.accounts.lock().insert(
            key,
            AccountSummary {
                lamports: 10,
                owner: Pubkey::default().to_string(),
                executable: false,
                data: vec![1, 2, 3],
            },
        );
        let manager = manager(MockConnector::new(Arc::clone(&chain)));

        let first = manager.get_account_info(&key, Commitment::Confirmed).await.unwrap();
        assert_eq!(first.map(|a| a.lamports), Some(10));
        let calls = chain.calls.load(Ordering::SeqCst);

        // Served from cache
        manager.get_account_info(&key, Commitment::Confirmed).await.unwrap();
        assert_eq!(chain.calls.load(Ordering::SeqCst), calls);

        // Different commitment is a different key, and failures propagate
        chain.fail_all.store(true, Ordering::SeqCst);
        assert!(manager.get_account_info(&key, Commitment::Finalized).await.is_err());
    }

    #[tokio::test]
    async fn test_program_accounts_cached_and_errors_propagate() {
        let chain = Arc::new(MockChain::default());
        let account = Pubkey::new_unique();
        chain.accounts.lock().insert(
            account,
            AccountSummary {
                lamports: 42,
                owner: Pubkey::default().to_string(),
                executable: false,
                data: vec![],
            },
        );
        let manager = manager(MockConnector::new(Arc::clone(&chain)));
        let program = Pubkey::new_unique();

        let first = manager.get_program_accounts(&program).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].0, account);
        let calls = chain.calls.load(Ordering::SeqCst);

        let second = manager.get_program_accounts(&program).await.unwrap();
        assert_eq!(chain.calls.load(Ordering::SeqCst), calls);
        assert!(Arc::ptr_eq(&first, &second));

        chain.fail_all.store(true, Ordering::SeqCst);
        let err = manager
            .get_program_accounts(&Pubkey::new_unique())
            .await
            .unwrap_err();
        assert!(matches!(err, RpcError::Transport(_)));
    }

    #[tokio::test]
    async fn test_empty_program_accounts_not_cached() {
        let chain = Arc::new(MockChain::default());
        let manager = manager(MockConnector::new(Arc::clone(&chain)));
        let program = Pubkey::new_unique();

        assert!(manager.get_program_accounts(&program).await.unwrap().is_empty());
        let calls = chain.calls.load(Ordering::SeqCst);
        manager.get_program_accounts(&program).await.unwrap();
        assert!(chain.calls.load(Ordering::SeqCst) > calls);
    }

    #[tokio::test]
    async fn test_missing_account_is_not_cached() {
        let chain = Arc::new(MockChain::default());
        let manager = manager(MockConnector::new(Arc::clone(&chain)));
        let key = Pubkey::new_unique();

        assert_eq!(manager.get_account_info(&key, Commitment::Confirmed).await.unwrap(), None);
        let calls = chain.calls.load(Ordering::SeqCst);
        manager.get_account_info(&key, Commitment::Confirmed).await.unwrap();
        assert!(chain.calls.load(Ordering::SeqCst) > calls);
    }

    #[tokio::test]
    async fn test_balance_reads_degrade_to_zero() {
        let chain = Arc::new(MockChain::default());
        let manager = manager(MockConnector::new(Arc::clone(&chain)));
        manager.get_connection(false).await.expect("connected");

        chain.fail_all.store(true, Ordering::SeqCst);
        let account = Pubkey::new_unique();

        let native = manager.get_balance(&account, Commitment::Confirmed).await;
        assert!(native.is_unavailable());
        assert_eq!(native.or_zero(), 0);

        let token = manager
            .get_token_account_balance(&account, Commitment::Confirmed)
            .await;
        assert!(token.is_unavailable());
        assert_eq!(token.or_zero().ui_amount, 0.0);
    }

    #[tokio::test]
    async fn test_missing_token_account_is_not_found() {
        let chain = Arc::new(MockChain::default());
        let manager = manager(MockConnector::new(Arc::clone(&chain)));

        let outcome = manager
            .get_token_account_balance(&Pubkey::new_unique(), Commitment::Confirmed)
            .await;
        assert_eq!(outcome, RpcOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_clear_all_caches() {
        let chain = Arc::new(MockChain::default());
        let account = Pubkey::new_unique();
        chain.balances.lock().insert(account, 5);
        let manager = manager(MockConnector::new(Arc::clone(&chain)));

        assert_eq!(manager.get_balance(&account, Commitment::Confirmed).await, RpcOutcome::Found(5));
        chain.balances.lock().insert(account, 7);
        assert_eq!(manager.get_balance(&account, Commitment::Confirmed).await, RpcOutcome::Found(5));

        manager.clear_all_caches();
        assert_eq!(manager.get_balance(&account, Commitment::Confirmed).await, RpcOutcome::Found(7));
    }
}
