mod auth;
mod bootstrap;
mod catalogs;
mod clients;
mod emission;
mod error;
mod extract;
mod health;
mod quote_service;
mod quotes;
mod routes;

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use facturador_core::config::{AppConfig, LoadOptions};
use tokio::sync::Notify;
use tracing_subscriber::EnvFilter;

fn init_logging(config: &AppConfig) {
    use facturador_core::config::LogFormat::*;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Logging needs the config, so load it first and reuse it for bootstrap.
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    let address = app.config.listen_address();
    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);

    let router = routes::router(app.state.clone())
        .merge(health::router(app.db_pool.clone(), app.emission_configured));
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        "facturador-server listening"
    );

    let shutdown = Arc::new(Notify::new());
    let trigger = shutdown.clone();
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        wait_for_shutdown().await;
        trigger.notify_one();
    });

    tokio::select! {
        result = server.into_future() => result?,
        _ = async {
            shutdown.notified().await;
            tokio::time::sleep(grace).await;
        } => {
            tracing::warn!(
                event_name = "system.server.shutdown_timeout",
                correlation_id = "shutdown",
                grace_secs = grace.as_secs(),
                "in-flight requests did not finish before the shutdown deadline"
            );
        }
    }

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "facturador-server stopping"
    );
    app.db_pool.close().await;

    Ok(())
}

async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(
                event_name = "system.server.signal_error",
                correlation_id = "shutdown",
                error = %error,
                "failed to listen for ctrl-c"
            );
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
