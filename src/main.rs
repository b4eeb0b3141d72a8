//! secret-poll server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints.

use anyhow::Context;
use axum::http::{HeaderValue, StatusCode};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use secret_poll::api;
use secret_poll::app_state::AppState;
use secret_poll::config::{CorsOrigins, LogFormat, ServerConfig};
use secret_poll::persistence::{PostgresJournal, RoomJournal};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env().context("invalid LISTEN_ADDR")?;
    init_tracing(config.log_format);
    tracing::info!(addr = %config.listen_addr, "starting secret-poll");

    let journal = if config.journal_enabled {
        let store = PostgresJournal::connect(&config)
            .await
            .context("failed to open room journal")?;
        let (journal, _writer) = RoomJournal::spawn(store, config.journal_queue_capacity);
        tracing::info!("room journal enabled");
        journal
    } else {
        RoomJournal::disabled()
    };

    let state = AppState::new(config.engine, journal);

    let app = api::build_app(state)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout(),
        ))
        .layer(cors_layer(&config.cors_origins))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

fn cors_layer(origins: &CorsOrigins) -> CorsLayer {
    match origins {
        CorsOrigins::Any => CorsLayer::permissive(),
        CorsOrigins::List(list) => {
            let allowed: Vec<HeaderValue> = list
                .iter()
                .filter_map(|origin| {
                    HeaderValue::from_str(origin)
                        .inspect_err(|_| tracing::warn!(%origin, "ignoring invalid CORS origin"))
                        .ok()
                })
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(allowed))
                .allow_methods(Any)
                .allow_headers(Any)
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
