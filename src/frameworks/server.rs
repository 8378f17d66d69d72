// Framework bootstrap for the snake server runtime.

use crate::frameworks::config;
use crate::interface_adapters::net::{create_game_handler, ws_handler};
use crate::interface_adapters::state::AppState;
use crate::use_cases::{SessionRegistry, SessionSettings};

use axum::{
    Router,
    routing::{get, post},
};
use std::io::Result;
use std::net::SocketAddr;
use std::sync::Arc;

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

async fn root_handler() -> &'static str {
    "snake server running"
}

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let address = listener.local_addr()?;
    let state = build_state();

    let app = Router::new()
        .route("/", get(root_handler))
        .route("/ws", get(ws_handler))
        .route("/games", post(create_game_handler))
        .with_state(state);

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([127, 0, 0, 1], config::http_port()));

    // Bind TCP listener with error handling
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

fn build_state() -> Arc<AppState> {
    // Session registry owns the set of active session tasks.
    let session_registry = Arc::new(SessionRegistry::new(SessionSettings {
        input_channel_capacity: config::INPUT_CHANNEL_CAPACITY,
        snapshot_broadcast_capacity: config::SNAPSHOT_BROADCAST_CAPACITY,
        tick_rate: config::tick_rate(),
        grid_size: config::grid_size(),
    }));

    Arc::new(AppState { session_registry })
}
