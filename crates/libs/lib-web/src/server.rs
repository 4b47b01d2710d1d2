//! # Server Setup
//!
//! Server initialization, route registration, and HTTP server startup.
//!
//! [`start_server`] loads [`Config`], builds the Solana services, starts the
//! background tasks (health checks, cache sweep, pool poller, realtime
//! forwarder) and serves the router from [`create_router`].

// region: --- Imports
use crate::handlers;
use crate::middleware::{log_requests, stamp_req, RequestStamp};
use crate::realtime::{self, FanoutHub};
use crate::services::PoolDataService;
use axum::{routing::get, Router};
use lib_core::Config;
use lib_solana::client::redact;
use lib_solana::SolanaState;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
// endregion: --- Imports

// region: --- AppState
/// Application state shared across all routes
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub solana: Arc<SolanaState>,
    pub pool_data: Arc<PoolDataService>,
    pub hub: Arc<FanoutHub>,
}

impl AppState {
    pub fn new(config: Config, solana: Arc<SolanaState>) -> Self {
        let pool_data = Arc::new(PoolDataService::new(
            Arc::clone(&solana.poller),
            config.pool_data_ttl,
        ));
        Self {
            config,
            solana,
            pool_data,
            hub: Arc::new(FanoutHub::default()),
        }
    }
}

impl axum::extract::FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl axum::extract::FromRef<AppState> for Arc<SolanaState> {
    fn from_ref(state: &AppState) -> Self {
        state.solana.clone()
    }
}

impl axum::extract::FromRef<AppState> for Arc<PoolDataService> {
    fn from_ref(state: &AppState) -> Self {
        state.pool_data.clone()
    }
}

impl axum::extract::FromRef<AppState> for Arc<FanoutHub> {
    fn from_ref(state: &AppState) -> Self {
        state.hub.clone()
    }
}
// endregion: --- AppState

// region: --- Server Configuration
/// Overrides applied on top of the environment configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:3001"); `BIND_ADDRESS` when `None`
    pub bind_address: Option<String>,
    /// Allowed CORS origins; `ALLOWED_ORIGINS` when `None`
    pub allowed_origins: Option<Vec<String>>,
}
// endregion: --- Server Configuration

// region: --- Server Setup
/// Initialize tracing with the level from `LOG_LEVEL` (default `info`).
///
/// A second call is a no-op, so tests and embedders can install their own
/// subscriber first.
pub fn init_tracing() {
    let log_level = std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase();

    let filter = match log_level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => tracing_subscriber::EnvFilter::new(&log_level),
        _ => tracing_subscriber::EnvFilter::new("info"),
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .try_init();
}

/// Initialize and start the HTTP server
///
/// # Errors
///
/// Returns an error if:
/// - Configuration loading or validation fails
/// - Pool addresses are malformed
/// - Server binding fails
pub async fn start_server(overrides: ServerConfig) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    info!(" POOL GATEWAY STARTING");

    info!("Loading configuration...");
    let mut app_config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;
    if let Some(bind) = overrides.bind_address {
        app_config.bind_address = bind;
    }
    if let Some(origins) = overrides.allowed_origins {
        app_config.allowed_origins = origins;
    }
    app_config.validate().map_err(|e| anyhow::anyhow!(e))?;

    info!(
        network = ?app_config.network,
        endpoints = app_config.rpc_endpoints.len(),
        primary = %redact(&app_config.rpc_endpoints[0]),
        "Configuration loaded"
    );

    info!(" Connecting to Solana...");
    let solana = Arc::new(SolanaState::new(&app_config)?);
    let _tasks = solana.start_background_tasks(&app_config);
    info!(
        poll_interval_ms = app_config.poll_interval.as_millis(),
        "Background tasks started (health checks, cache cleanup, pool poller)"
    );

    let state = AppState::new(app_config.clone(), Arc::clone(&solana));
    realtime::spawn_forwarder(Arc::clone(&state.hub), solana.poller.subscribe());
    info!(" Realtime forwarder started");

    let app = create_router(state, &app_config.allowed_origins);

    let listener = tokio::net::TcpListener::bind(&app_config.bind_address).await?;
    info!(" SERVER READY: http://{}", app_config.bind_address);
    log_server_info();

    axum::serve(listener, app).await?;
    Ok(())
}

/// Create the application router with all routes and middleware.
pub fn create_router(state: AppState, allowed_origins: &[String]) -> Router {
    use axum::http::{HeaderValue, Method};

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    info!("[ROUTE SETUP] Registering HTTP routes...");
    Router::new()
        .route("/api/pool-data", get(handlers::pool::get_pool_data))
        .route("/api/pool", get(handlers::pool::get_pool_info))
        .route("/api/balances/{address}", get(handlers::wallet::get_balances))
        .route("/api/token/{address}", get(handlers::token::get_token_info))
        .route("/api/transactions/{address}", get(handlers::transaction::get_transactions))
        .route("/ws", get(handlers::websocket::pool_websocket))
        .route("/health", get(handlers::health::health))
        .fallback(|| async {
            info!("[404 HANDLER] Unmatched route - returning 404");
            (
                axum::http::StatusCode::NOT_FOUND,
                axum::Json(serde_json::json!({ "error": "Route not found" })),
            )
        })
        .with_state(state)
        .layer(axum::middleware::from_fn(log_requests))
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    let request_id = request
                        .extensions()
                        .get::<RequestStamp>()
                        .map(|s| s.id.clone())
                        .unwrap_or_else(|| "unknown".to_string());
                    tracing::info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                })
                .on_failure(
                    |error: tower_http::classify::ServerErrorsFailureClass,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        tracing::error!(
                            error = ?error,
                            latency_ms = latency.as_millis(),
                            "[HTTP FAILURE] Error: {:?}, Latency: {}ms",
                            error,
                            latency.as_millis()
                        );
                    },
                ),
        )
        // Outermost so the stamp exists for the span and the request log
        .layer(axum::middleware::from_fn(stamp_req))
        .layer(cors)
}

/// Log server information
fn log_server_info() {
    info!(" POOL:");
    info!("   • GET  /api/pool-data");
    info!("   • GET  /api/pool");
    info!(" WALLET:");
    info!("   • GET  /api/balances/{{address}}");
    info!("   • GET  /api/transactions/{{address}}?limit=10");
    info!(" TOKENS:");
    info!("   • GET  /api/token/{{address}}");
    info!(" REALTIME:");
    info!("   • GET  /ws  (subscribe to \"pool_updates\")");
    info!(" HEALTH:");
    info!("   • GET  /health");
}
// endregion: --- Server Setup
