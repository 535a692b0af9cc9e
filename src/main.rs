//! vidcache - HTTP response cache in front of the video directory API
//!
//! Server binary: loads configuration, opens the store and serves the
//! cached proxy until SIGINT/SIGTERM.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vidcache::{create_router, spawn_cleanup_task, spawn_warmup, AppState, Config, KvStore};

/// Main entry point for the vidcache gateway.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the store (connects in the background)
/// 4. Start the cleanup and warm-up tasks
/// 5. Serve until a shutdown signal, then close the store
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vidcache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting vidcache gateway");

    let config = Config::from_env();
    info!(
        "Configuration loaded: prefix={}, default_ttl={}s, port={}, upstream={}, rate_limit={}/{}s",
        config.key_prefix,
        config.default_ttl,
        config.server_port,
        config.upstream_url,
        config.rate_limit_max,
        config.rate_limit_window
    );

    let state = AppState::from_config(&config).context("failed to build application state")?;
    let store = state.store().clone();

    let cleanup_handle = spawn_cleanup_task(store.clone(), config.cleanup_interval);

    let app = create_router(state);
    if !config.warmup_paths.is_empty() {
        spawn_warmup(store.clone(), app.clone(), config.warmup_paths.clone());
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(cleanup_handle, store))
    .await
    .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown, aborts the cleanup task and detaches the store.
async fn shutdown_signal(cleanup_handle: tokio::task::JoinHandle<()>, store: KvStore) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    cleanup_handle.abort();
    store.close();
    warn!("Cleanup task aborted, store closed");
}
