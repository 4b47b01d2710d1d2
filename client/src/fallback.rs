//! # HTTP Polling Fallback
//!
//! Pool data over plain HTTP for when the realtime socket is not open.
//!
//! ```text
//! fetch(force = false)
//!   cached snapshot younger than 30 s      → return it, no request
//!   last request less than 10 s ago        → skip, return last snapshot
//!   otherwise                              → request
//! fetch(force = true)                      → request
//!
//! request succeeds → normalize, cache, return
//! request fails    → keep cache, log, return last snapshot
//! ```
//!
//! Concurrent requests are collapsed: a caller that waited on an in-flight
//! request gets that request's result instead of issuing its own.

use crate::api::ApiClient;
use crate::error::Result;
use async_trait::async_trait;
use lib_utils::TtlLruCache;
use parking_lot::Mutex;
use shared::{PoolDataResponse, PoolSnapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub const CACHE_FRESHNESS: Duration = Duration::from_secs(30);
pub const MIN_REQUEST_INTERVAL: Duration = Duration::from_secs(10);

const SNAPSHOT_KEY: &str = "pool-data";

/// Source of pool data for the fallback.
#[async_trait]
pub trait SnapshotFetcher: Send + Sync {
    async fn fetch_pool_data(&self) -> Result<PoolDataResponse>;
}

#[async_trait]
impl SnapshotFetcher for ApiClient {
    async fn fetch_pool_data(&self) -> Result<PoolDataResponse> {
        self.get_pool_data().await
    }
}

#[derive(Default)]
struct FallbackState {
    last: Option<PoolSnapshot>,
    last_request: Option<Instant>,
    /// Bumped each time a request completes
    generation: u64,
}

pub struct PollingFallback {
    fetcher: Arc<dyn SnapshotFetcher>,
    fresh: TtlLruCache<&'static str, PoolSnapshot>,
    state: Mutex<FallbackState>,
    in_flight: tokio::sync::Mutex<()>,
    min_interval: Duration,
}

impl PollingFallback {
    pub fn new(fetcher: Arc<dyn SnapshotFetcher>) -> Self {
        Self::with_timing(fetcher, CACHE_FRESHNESS, MIN_REQUEST_INTERVAL)
    }

    pub fn with_timing(fetcher: Arc<dyn SnapshotFetcher>, freshness: Duration, min_interval: Duration) -> Self {
        Self {
            fetcher,
            fresh: TtlLruCache::new("fallback-pool-data", 1, freshness),
            state: Mutex::new(FallbackState::default()),
            in_flight: tokio::sync::Mutex::new(()),
            min_interval,
        }
    }

    /// Last snapshot received, however old.
    pub fn latest(&self) -> Option<PoolSnapshot> {
        self.state.lock().last.clone()
    }

    /// Seed the cache from another source (e.g. a realtime update).
    pub fn record(&self, snapshot: PoolSnapshot) {
        self.fresh.set(SNAPSHOT_KEY, snapshot.clone());
        self.state.lock().last = Some(snapshot);
    }

    pub async fn fetch(&self, force: bool) -> Option<PoolSnapshot> {
        let seen_generation = {
            let state = self.state.lock();

            if !force {
                if let Some(snapshot) = self.fresh.get(&SNAPSHOT_KEY) {
                    return Some(snapshot);
                }
                if let Some(at) = state.last_request {
                    if at.elapsed() < self.min_interval {
                        debug!(since_ms = at.elapsed().as_millis(), "Pool data request rate limited");
                        return state.last.clone();
                    }
                }
            }
            state.generation
        };

        let _guard = self.in_flight.lock().await;
        if self.state.lock().generation != seen_generation {
            // Another caller's request finished while this one waited
            return self.latest();
        }

        self.state.lock().last_request = Some(Instant::now());
        let result = self.fetcher.fetch_pool_data().await;

        let mut state = self.state.lock();
        state.generation += 1;
        match result {
            Ok(response) => {
                if response.is_stale() {
                    info!("Server returned a stale pool snapshot");
                }
                let snapshot = normalize(response.snapshot);
                self.fresh.set(SNAPSHOT_KEY, snapshot.clone());
                state.last = Some(snapshot.clone());
                Some(snapshot)
            }
            Err(e) => {
                warn!(error = %e, "Pool data request failed, keeping cached snapshot");
                state.last.clone()
            }
        }
    }
}

/// Replace non-finite or negative figures with zero.
fn normalize(mut snapshot: PoolSnapshot) -> PoolSnapshot {
    for value in [
        &mut snapshot.native_reserve,
        &mut snapshot.token_a_reserve,
        &mut snapshot.token_b_reserve,
        &mut snapshot.derived_total_value,
    ] {
        if !value.is_finite() || *value < 0.0 {
            *value = 0.0;
        }
    }
    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct MockFetcher {
        calls: AtomicUsize,
        failing: AtomicBool,
        delay: Option<Duration>,
    }

    impl MockFetcher {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SnapshotFetcher for MockFetcher {
        async fn fetch_pool_data(&self) -> Result<PoolDataResponse> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) as f64;
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.failing.load(Ordering::SeqCst) {
                return Err(ClientError::Network("connection refused".to_string()));
            }
            Ok(PoolDataResponse::fresh(PoolSnapshot {
                native_reserve: 1.0 + n,
                token_a_reserve: 100.0,
                token_b_reserve: 10.0,
                derived_total_value: 150.0 * (1.0 + n),
                timestamp_ms: 1,
            }))
        }
    }

    fn fallback(fetcher: &Arc<MockFetcher>) -> PollingFallback {
        PollingFallback::new(Arc::clone(fetcher) as Arc<dyn SnapshotFetcher>)
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_cache_avoids_request() {
        let fetcher = Arc::new(MockFetcher::default());
        let fallback = fallback(&fetcher);

        let first = fallback.fetch(false).await.unwrap();
        tokio::time::advance(Duration::from_secs(20)).await;
        let second = fallback.fetch(false).await.unwrap();

        assert_eq!(fetcher.calls(), 1);
        assert_eq!(first, second);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_skips_request() {
        let fetcher = Arc::new(MockFetcher::default());
        fetcher.failing.store(true, Ordering::SeqCst);
        let fallback = fallback(&fetcher);

        assert!(fallback.fetch(false).await.is_none());
        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(fallback.fetch(false).await.is_none());
        assert_eq!(fetcher.calls(), 1);

        fetcher.failing.store(false, Ordering::SeqCst);
        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(fallback.fetch(false).await.is_some());
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_cache_refetches() {
        let fetcher = Arc::new(MockFetcher::default());
        let fallback = fallback(&fetcher);

        fallback.fetch(false).await;
        tokio::time::advance(Duration::from_secs(31)).await;
        let refreshed = fallback.fetch(false).await.unwrap();

        assert_eq!(fetcher.calls(), 2);
        assert_eq!(refreshed.native_reserve, 2.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_keeps_previous_snapshot() {
        let fetcher = Arc::new(MockFetcher::default());
        let fallback = fallback(&fetcher);

        let good = fallback.fetch(false).await.unwrap();
        fetcher.failing.store(true, Ordering::SeqCst);
        tokio::time::advance(Duration::from_secs(31)).await;

        assert_eq!(fallback.fetch(false).await, Some(good.clone()));
        assert_eq!(fallback.latest(), Some(good));
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_forced_refresh_bypasses_cache_and_rate_limit() {
        let fetcher = Arc::new(MockFetcher::default());
        let fallback = fallback(&fetcher);

        fallback.fetch(false).await;
        let forced = fallback.fetch(true).await.unwrap();

        assert_eq!(fetcher.calls(), 2);
        assert_eq!(forced.native_reserve, 2.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_forced_refreshes_share_one_request() {
        let fetcher = Arc::new(MockFetcher {
            delay: Some(Duration::from_millis(100)),
            ..Default::default()
        });
        let fallback = fallback(&fetcher);

        let (a, b) = tokio::join!(fallback.fetch(true), fallback.fetch(true));

        assert_eq!(fetcher.calls(), 1);
        assert_eq!(a, b);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recorded_snapshot_counts_as_fresh() {
        let fetcher = Arc::new(MockFetcher::default());
        let fallback = fallback(&fetcher);
        let pushed = PoolSnapshot {
            native_reserve: 9.0,
            token_a_reserve: 9.0,
            token_b_reserve: 9.0,
            derived_total_value: 9.0,
            timestamp_ms: 9,
        };

        fallback.record(pushed.clone());
        assert_eq!(fallback.fetch(false).await, Some(pushed));
        assert_eq!(fetcher.calls(), 0);
    }

    #[test]
    fn test_normalize_zeroes_bad_values() {
        let snapshot = normalize(PoolSnapshot {
            native_reserve: f64::NAN,
            token_a_reserve: -1.0,
            token_b_reserve: 3.0,
            derived_total_value: f64::INFINITY,
            timestamp_ms: 0,
        });
        assert_eq!(snapshot.native_reserve, 0.0);
        assert_eq!(snapshot.token_a_reserve, 0.0);
        assert_eq!(snapshot.token_b_reserve, 3.0);
        assert_eq!(snapshot.derived_total_value, 0.0);
    }
}
