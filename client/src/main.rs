//! # pool-watch
//!
//! Prints pool reserves as they change. Uses the realtime socket while it is
//! open and the HTTP polling fallback otherwise.
//!
//! ```bash
//! API_BASE_URL=http://127.0.0.1:3001 pool-watch
//! ```

use pool_client::api::DEFAULT_BASE_URL;
use pool_client::{ApiClient, ConnectionState, PollingFallback, RealtimeClient, RealtimeEvent};
use shared::PoolSnapshot;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

const FALLBACK_TICK: Duration = Duration::from_secs(5);

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("LOG_LEVEL")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

fn print_snapshot(source: &str, snapshot: &PoolSnapshot) {
    info!(
        source,
        sol = snapshot.native_reserve,
        yot = snapshot.token_a_reserve,
        yos = snapshot.token_b_reserve,
        total_value = snapshot.derived_total_value,
        timestamp = snapshot.timestamp_ms,
        "Pool update"
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let base_url = lib_utils::get_env_or("API_BASE_URL", DEFAULT_BASE_URL);
    info!(base_url = %base_url, "pool-watch starting");

    let api = Arc::new(ApiClient::new(base_url.clone()));
    let fallback = PollingFallback::new(api);
    let realtime = RealtimeClient::new(&base_url);

    let (tx, mut events) = mpsc::channel(64);
    let realtime_task = realtime.spawn(tx);

    // Initial state regardless of the socket
    if let Some(snapshot) = fallback.fetch(true).await {
        print_snapshot("http", &snapshot);
    }

    let mut ticker = tokio::time::interval(FALLBACK_TICK);
    let mut last_printed: Option<PoolSnapshot> = None;

    loop {
        tokio::select! {
            Some(event) = events.recv() => match event {
                RealtimeEvent::Snapshot(snapshot) => {
                    fallback.record(snapshot.clone());
                    print_snapshot("ws", &snapshot);
                    last_printed = Some(snapshot);
                }
                RealtimeEvent::StateChanged(state) => {
                    info!(state = ?state, "Realtime state");
                    if state == ConnectionState::Closed {
                        if let Some(snapshot) = fallback.fetch(false).await {
                            print_snapshot("http", &snapshot);
                        }
                    }
                }
                RealtimeEvent::ServerError(message) => warn!(message = %message, "Server reported an error"),
            },
            _ = ticker.tick() => {
                if realtime.is_open() {
                    continue;
                }
                if let Some(snapshot) = fallback.fetch(false).await {
                    let changed = last_printed.as_ref().map_or(true, |prev| !prev.same_state(&snapshot));
                    if changed {
                        print_snapshot("http", &snapshot);
                        last_printed = Some(snapshot);
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }

    realtime_task.abort();
    Ok(())
}
