//! Session Cache - A file-backed TTL cache for session records
//!
//! Serves the cache over HTTP and flushes it on shutdown.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use session_cache::{api::create_router, spawn_cleanup_task, AppState, Config};

/// Main entry point for the session cache server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the cache, restoring the snapshot if one exists
/// 4. Start the background expiry sweep
/// 5. Serve HTTP until SIGINT/SIGTERM
/// 6. Stop the sweep and close the cache (final flush)
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "session_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting session cache");

    let config = Config::from_env();
    info!(
        "Configuration loaded: path={:?}, default_ttl={}s, port={}, cleanup_interval={}s, write_timeout={}ms",
        config.cache_path,
        config.default_ttl,
        config.server_port,
        config.cleanup_interval,
        config.write_timeout_ms
    );

    let state = AppState::from_config(&config)
        .with_context(|| format!("failed to open cache at {:?}", config.cache_path))?;
    let cache = state.cache.clone();

    let cleanup_handle = if config.cleanup_interval > 0 {
        Some(spawn_cleanup_task(cache.clone(), config.cleanup_interval))
    } else {
        info!("Expiry sweep disabled");
        None
    };

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(handle) = cleanup_handle {
        handle.abort();
        warn!("Expiry sweep aborted");
    }

    cache.close().await.context("final snapshot flush failed")?;
    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
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
}
