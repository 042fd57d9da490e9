//! memd server binary.
//!
//! Bootstraps the cache and the TCP listener, then serves until SIGINT or
//! SIGTERM. Exits non-zero on configuration or bind failure.

use std::process::ExitCode;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use memd::cache::{BatchLruCache, Cache};
use memd::config::Config;
use memd::server;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "memd=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    info!(
        port = config.port,
        capacity = config.cache_capacity,
        "starting cache server"
    );

    let cache = Arc::new(BatchLruCache::new(config.cache_capacity));

    let listener = match TcpListener::bind(("0.0.0.0", config.port)).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(port = config.port, error = %e, "failed to bind");
            return ExitCode::FAILURE;
        }
    };

    let exit = tokio::select! {
        result = server::serve(listener, Arc::clone(&cache) as Arc<dyn Cache>) => {
            match result {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    error!(error = %e, "accept loop failed");
                    ExitCode::FAILURE
                }
            }
        }
        _ = shutdown_signal() => {
            info!("shutdown signal received");
            ExitCode::SUCCESS
        }
    };

    cache.close().await;
    info!("server stopped");
    exit
}

/// Completes when SIGINT or SIGTERM arrives.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
