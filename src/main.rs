//! Quant Oracle — Binary Entrypoint
//! Boots the Axum HTTP server and the live-feed broadcast scheduler, wiring
//! routes, shared state, and graceful shutdown.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use quant_oracle::api::{create_router, AppState};
use quant_oracle::config::Config;
use quant_oracle::feed::FeedBroadcaster;
use quant_oracle::metrics::Metrics;
use quant_oracle::registry::SubscriberRegistry;
use quant_oracle::store::PostStore;

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("quant_oracle=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

async fn shutdown_signal() {
    // ctrl-c only; service managers send SIGINT on stop.
    let _ = tokio::signal::ctrl_c().await;
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let cfg = Config::from_env()?;
    let metrics = Metrics::init(cfg.feed_interval.as_secs());

    let store = Arc::new(PostStore::open(&cfg.db_path)?);
    let registry = Arc::new(SubscriberRegistry::new());

    // Single owned scheduler instance; torn down via the watch signal.
    let broadcaster = Arc::new(FeedBroadcaster::new(
        store.clone(),
        registry.clone(),
        cfg.feed_interval,
    ));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let feed_task = broadcaster.spawn(shutdown_rx);

    let state = AppState {
        store,
        registry,
    };
    let router = create_router(state).merge(metrics.router());

    let listener = tokio::net::TcpListener::bind(cfg.bind_addr).await?;
    info!(addr = %cfg.bind_addr, db = %cfg.db_path.display(), "quant-oracle listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    feed_task.await?;
    info!("quant-oracle stopped");
    Ok(())
}
