//! clfsd — clfs object server daemon.
//!
//! Usage: clfsd [port]

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};

use clfs_core::config::ClfsConfig;
use clfs_services::{bind_listener, Acceptor, ConnectionHandler, ObjectLocks, ObjectStore};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = ClfsConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let mut config = ClfsConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        ClfsConfig::default()
    });

    if let Some(port) = std::env::args().nth(1) {
        config.network.port = port
            .parse()
            .with_context(|| format!("invalid port argument: {port}"))?;
    }
    tracing::info!(
        bind_addr = %config.network.bind_addr,
        port = config.network.port,
        "clfsd starting"
    );

    let store = ObjectStore::new(&config.store.root).context("failed to open object store")?;
    tracing::info!(root = %store.root().display(), "object store ready");

    let handler = ConnectionHandler::new(
        store,
        ObjectLocks::new(),
        Duration::from_secs(config.limits.io_timeout_secs),
    );

    let addr: SocketAddr = format!("{}:{}", config.network.bind_addr, config.network.port)
        .parse()
        .context("invalid bind address")?;
    let listener =
        bind_listener(addr, config.network.backlog).context("failed to bind listening socket")?;

    // ── Shutdown channel ─────────────────────────────────────────────────────
    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);

    {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutdown signal received");
            let _ = shutdown.send(());
        });
    }

    Acceptor::new(listener, handler, shutdown_tx.subscribe())
        .run()
        .await
}
