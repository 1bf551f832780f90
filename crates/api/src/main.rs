//! `pricebridge-api` -- HTTP front for the house price prediction worker.
//!
//! Every `POST /predict` spawns one short-lived worker process, hands it the
//! feature JSON as its only argument and returns the JSON it prints.
//! Configuration is read from the environment (and `.env`) once at startup;
//! see [`ServerConfig::from_env`] for the variables.

use std::net::{IpAddr, SocketAddr};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pricebridge_api::config::ServerConfig;
use pricebridge_api::router::build_app_router;
use pricebridge_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "pricebridge_api=debug,pricebridge_core=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        std::process::exit(1);
    });
    tracing::info!(
        host = %config.host,
        port = config.port,
        executable = %config.worker.executable.display(),
        script = %config.worker.script.display(),
        worker_timeout_ms = config.worker.timeout.as_millis() as u64,
        "Loaded server configuration",
    );

    if !config.worker.script.exists() {
        tracing::warn!(
            script = %config.worker.script.display(),
            "Worker script not found; predictions will fail until it exists",
        );
    }

    let host: IpAddr = config.host.parse().unwrap_or_else(|e| {
        tracing::error!(host = %config.host, error = %e, "Invalid HOST address");
        std::process::exit(1);
    });
    let addr = SocketAddr::new(host, config.port);

    // --- Router ---
    let app = build_app_router(AppState::new(config));

    // --- Start server ---
    tracing::info!(%addr, "Starting server");
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "Failed to bind to address");
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix). In-flight requests
/// finish; their workers are reaped as the handlers complete.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
