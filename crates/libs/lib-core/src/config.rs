//! # Application Configuration
//!
//! Configuration is loaded from environment variables (after `dotenvy` has
//! read `.env`) and validated on startup so a misconfigured gateway fails fast.
//!
//! There is no global instance: `start_server` builds one `Config` and hands
//! clones to the services that need it.
//!
//! ```rust,no_run
//! use lib_core::Config;
//!
//! let config = Config::from_env().expect("configuration");
//! config.validate().expect("valid configuration");
//! println!("{} RPC endpoints", config.rpc_endpoints.len());
//! ```

use lib_utils::{get_env, get_env_list, get_env_or, get_env_parse_or};
use std::time::Duration;

/// Program id of the YOT/YOS swap program.
pub const DEFAULT_POOL_PROGRAM_ID: &str = "3cXKNjtRv8b1HVYU6vRDvmoSMHfXrWATCLFY2Y5wTsps";

/// Solana cluster the gateway talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    /// Solana mainnet-beta (production network)
    Mainnet,
    /// Solana devnet (test network)
    Devnet,
}

impl Network {
    /// Case-insensitive parse; anything other than `mainnet` selects devnet.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "mainnet" | "mainnet-beta" => Network::Mainnet,
            _ => Network::Devnet,
        }
    }

    /// Default endpoint rotation for this network.
    ///
    /// With a Helius key on mainnet the premium endpoint goes first and the
    /// public endpoint stays in the pool as failover.
    pub fn default_endpoints(&self, helius_api_key: Option<&str>) -> Vec<String> {
        match self {
            Network::Mainnet => {
                let mut endpoints = Vec::new();
                if let Some(key) = helius_api_key {
                    endpoints.push(format!("https://mainnet.helius-rpc.com/?api-key={}", key));
                }
                endpoints.push("https://api.mainnet-beta.solana.com".to_string());
                endpoints.push("https://solana-rpc.publicnode.com".to_string());
                endpoints
            }
            Network::Devnet => vec![
                "https://api.devnet.solana.com".to_string(),
                "https://rpc.ankr.com/solana_devnet".to_string(),
                "https://devnet.helius-rpc.com".to_string(),
            ],
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Clone, Debug)]
pub struct Config {
    /// Listen address for the HTTP/WebSocket server
    pub bind_address: String,

    /// Allowed CORS origins
    pub allowed_origins: Vec<String>,

    pub network: Network,

    /// Ordered RPC endpoint pool; index 0 is tried first
    pub rpc_endpoints: Vec<String>,

    /// Swap program owning the pool
    pub pool_program_id: String,

    /// Explicit pool authority; derived from the program id when `None`
    pub pool_authority: Option<String>,

    /// YOT mint (reserve A)
    pub token_a_mint: String,

    /// YOS mint (reserve B)
    pub token_b_mint: String,

    /// Fixed USD reference price for the native coin
    pub reference_price_usd: f64,

    /// Optional HTTP source for the reference price
    pub reference_price_url: Option<String>,

    pub reference_price_refresh: Duration,
    pub poll_interval: Duration,
    pub pool_data_ttl: Duration,
    pub health_check_interval: Duration,
    pub connection_cooldown: Duration,
    pub health_failure_threshold: u32,
    pub rpc_timeout: Duration,
    pub cache_cleanup_interval: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, String> {
        let network = Network::from_name(&get_env_or("SOLANA_NETWORK", "devnet"));
        let helius_key = get_env("HELIUS_API_KEY").ok();

        let rpc_endpoints = get_env_list("SOLANA_RPC_ENDPOINTS")
            .unwrap_or_else(|| network.default_endpoints(helius_key.as_deref()));

        let allowed_origins = get_env_list("ALLOWED_ORIGINS").unwrap_or_else(|| {
            vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
                "http://localhost:5173".to_string(),
                "http://127.0.0.1:5173".to_string(),
            ]
        });

        let token_a_mint = get_env("TOKEN_A_MINT").map_err(|e| e.to_string())?;
        let token_b_mint = get_env("TOKEN_B_MINT").map_err(|e| e.to_string())?;

        Ok(Self {
            bind_address: get_env_or("BIND_ADDRESS", "127.0.0.1:3001"),
            allowed_origins,
            network,
            rpc_endpoints,
            pool_program_id: get_env_or("POOL_PROGRAM_ID", DEFAULT_POOL_PROGRAM_ID),
            pool_authority: get_env("POOL_AUTHORITY").ok(),
            token_a_mint,
            token_b_mint,
            reference_price_usd: parse("REFERENCE_PRICE_USD", 150.0)?,
            reference_price_url: get_env("REFERENCE_PRICE_URL").ok(),
            reference_price_refresh: secs("REFERENCE_PRICE_REFRESH_SECS", 60)?,
            poll_interval: Duration::from_millis(parse("POLL_INTERVAL_MS", 5_000)?),
            pool_data_ttl: secs("POOL_DATA_TTL_SECS", 30)?,
            health_check_interval: secs("HEALTH_CHECK_INTERVAL_SECS", 60)?,
            connection_cooldown: secs("CONNECTION_COOLDOWN_SECS", 5)?,
            health_failure_threshold: parse("HEALTH_FAILURE_THRESHOLD", 3)?,
            rpc_timeout: secs("RPC_TIMEOUT_SECS", 30)?,
            cache_cleanup_interval: secs("CACHE_CLEANUP_INTERVAL_SECS", 60)?,
        })
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.rpc_endpoints.is_empty() {
            return Err("At least one RPC endpoint must be configured".to_string());
        }

        if let Some(bad) = self
            .rpc_endpoints
            .iter()
            .find(|url| !(url.starts_with("http://") || url.starts_with("https://")))
        {
            return Err(format!("RPC endpoint must be an http(s) URL: {}", bad));
        }

        if !(self.reference_price_usd.is_finite() && self.reference_price_usd > 0.0) {
            return Err("REFERENCE_PRICE_USD must be a positive number".to_string());
        }

        if self.health_failure_threshold == 0 {
            return Err("HEALTH_FAILURE_THRESHOLD must be at least 1".to_string());
        }

        let intervals = [
            ("POLL_INTERVAL_MS", self.poll_interval),
            ("POOL_DATA_TTL_SECS", self.pool_data_ttl),
            ("HEALTH_CHECK_INTERVAL_SECS", self.health_check_interval),
            ("RPC_TIMEOUT_SECS", self.rpc_timeout),
            ("CACHE_CLEANUP_INTERVAL_SECS", self.cache_cleanup_interval),
            ("REFERENCE_PRICE_REFRESH_SECS", self.reference_price_refresh),
        ];
        if let Some((name, _)) = intervals.iter().find(|(_, d)| d.is_zero()) {
            return Err(format!("{} must be greater than zero", name));
        }

        if self.token_a_mint == self.token_b_mint {
            return Err("TOKEN_A_MINT and TOKEN_B_MINT must differ".to_string());
        }

        Ok(())
    }
}

fn parse<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, String> {
    get_env_parse_or(name, default).map_err(|e| e.to_string())
}

fn secs(name: &'static str, default: u64) -> Result<Duration, String> {
    parse(name, default).map(Duration::from_secs)
}
