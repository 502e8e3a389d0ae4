//! stock-rewards server entry point.
//!
//! Connects to PostgreSQL, starts the background price refresh job and
//! serves the REST API until Ctrl-C / SIGTERM.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use stock_rewards::api;
use stock_rewards::app_state::AppState;
use stock_rewards::config::{LogFormat, ServiceConfig};
use stock_rewards::oracle::{PriceOracle, RandomWalkOracle};
use stock_rewards::persistence::{PostgresStore, RewardStore};
use stock_rewards::service::{PriceCache, PriceRefresher};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = ServiceConfig::from_env().map_err(|e| anyhow::anyhow!("configuration: {e}"))?;

    // Initialize tracing
    init_tracing(config.log_format);
    tracing::info!(addr = %config.listen_addr, "starting stock-rewards");

    // Build persistence layer
    let store = PostgresStore::connect(&config.database)
        .await
        .context("connecting to database")?;
    if config.database.run_migrations {
        if let Err(e) = store.run_migrations().await {
            tracing::warn!(error = %e, "migrations failed, continuing with existing schema");
        }
    }
    let store: Arc<dyn RewardStore> = Arc::new(store);

    // Build service layer
    let stale_after = chrono::Duration::from_std(config.price_stale_after)
        .context("PRICE_STALE_AFTER_SECS out of range")?;
    let oracle: Arc<dyn PriceOracle> = Arc::new(RandomWalkOracle::new());
    let price_cache = Arc::new(
        PriceCache::new(Arc::clone(&store), oracle)
            .with_stale_after(stale_after)
            .with_history_fallback(config.history_fallback),
    );
    let app_state = AppState::new(store, Arc::clone(&price_cache));

    // Background price refresh
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let refresher = PriceRefresher::new(
        price_cache,
        config.price_refresh_interval,
        config.record_price_history,
    );
    let refresh_job = tokio::spawn(refresher.run(shutdown_rx));

    // Build router
    let app = api::build_app(app_state, &config.cors_allowed_origins);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server")?;

    let _ = shutdown_tx.send(true);
    if let Err(e) = refresh_job.await {
        tracing::error!(error = %e, "price refresh job panicked");
    }
    tracing::info!("server stopped");

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
    }
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
