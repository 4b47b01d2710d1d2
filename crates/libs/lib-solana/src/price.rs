//! # Reference Price Feed
//!
//! USD price of the native coin, used to derive the pool's total value and
//! the `solUsd` field of balance responses.
//!
//! Two sources implement [`ReferencePrice`]:
//! - [`FixedReferencePrice`]: a configured constant
//! - [`HttpReferencePrice`]: fetched from a JSON endpoint, cached for the
//!   refresh interval, falling back to the last good value when a refresh fails
//!
//! Accepted response shapes for the HTTP source:
//! - a bare number: `151.2`
//! - `{"price": 151.2}` or `{"usd": 151.2}` (numbers or numeric strings)
//! - Jupiter style `{"data": {"<mint>": {"price": 151.2}}}`
//! - CoinGecko style `{"solana": {"usd": 151.2}}`

use async_trait::async_trait;
use lib_utils::TtlLruCache;
use parking_lot::Mutex;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

#[async_trait]
pub trait ReferencePrice: Send + Sync {
    /// Current USD price of one native coin.
    async fn usd_price(&self) -> anyhow::Result<f64>;

    /// Short label for logs and health output.
    fn source(&self) -> &str;
}

/// Constant reference price.
#[derive(Debug, Clone, Copy)]
pub struct FixedReferencePrice {
    price: f64,
}

impl FixedReferencePrice {
    pub fn new(price: f64) -> Self {
        Self { price }
    }
}

#[async_trait]
impl ReferencePrice for FixedReferencePrice {
    async fn usd_price(&self) -> anyhow::Result<f64> {
        Ok(self.price)
    }

    fn source(&self) -> &str {
        "fixed"
    }
}

const PRICE_KEY: &str = "reference";

/// Reference price fetched over HTTP.
pub struct HttpReferencePrice {
    http: Client,
    url: String,
    cache: TtlLruCache<&'static str, f64>,
    last_good: Mutex<Option<f64>>,
}

impl HttpReferencePrice {
    pub fn new(url: impl Into<String>, refresh: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            http,
            url: url.into(),
            cache: TtlLruCache::new("reference-price", 1, refresh),
            last_good: Mutex::new(None),
        })
    }

    async fn fetch(&self) -> anyhow::Result<f64> {
        let body: Value = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Reference price request failed: {}", e))?
            .error_for_status()
            .map_err(|e| anyhow::anyhow!("Reference price request failed: {}", e))?
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("Reference price parse failed: {}", e))?;

        extract_price(&body)
            .filter(|price| price.is_finite() && *price > 0.0)
            .ok_or_else(|| anyhow::anyhow!("Reference price response has no usable price"))
    }
}

#[async_trait]
impl ReferencePrice for HttpReferencePrice {
    async fn usd_price(&self) -> anyhow::Result<f64> {
        if let Some(price) = self.cache.get(&PRICE_KEY) {
            return Ok(price);
        }

        match self.fetch().await {
            Ok(price) => {
                debug!(price, "Fetched reference price");
                self.cache.set(PRICE_KEY, price);
                *self.last_good.lock() = Some(price);
                Ok(price)
            }
            Err(e) => match *self.last_good.lock() {
                Some(price) => {
                    warn!(error = %e, price, "Reference price refresh failed, using last good value");
                    Ok(price)
                }
                None => Err(e),
            },
        }
    }

    fn source(&self) -> &str {
        "http"
    }
}

/// Pull a price out of the accepted response shapes.
fn extract_price(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Object(map) => {
            for key in ["price", "usd"] {
                if let Some(price) = map.get(key).and_then(extract_price) {
                    return Some(price);
                }
            }
            // Nested wrappers: {"data": {...}}, {"<id>": {...}}
            map.values().filter(|v| v.is_object()).find_map(extract_price)
        }
        _ => None,
    }
}
