// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{error::Error, net::SocketAddr, sync::Arc, time::Duration};

use axum_server::{tls_rustls::RustlsConfig, Handle};
use ewallet_server::{
    api::router,
    cache::{CacheStore, LruCacheStore},
    config::AppConfig,
    logging::init_tracing,
    state::AppState,
    storage::LedgerDatabase,
};

/// How often expired denylist entries are swept.
const DENYLIST_PURGE_INTERVAL: Duration = Duration::from_secs(300);

/// Grace period for in-flight requests at shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Install the ring crypto provider for rustls (must be done before any TLS operations)
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| "Failed to install rustls crypto provider")?;

    let config = AppConfig::from_env()?;
    init_tracing(config.log_format);

    let ledger = Arc::new(LedgerDatabase::open(&config.ledger_path())?);

    let directory_store = Arc::new(LruCacheStore::new(config.directory_cache_capacity));
    let denylist_store = Arc::new(LruCacheStore::unbounded());
    spawn_denylist_purge(Arc::clone(&denylist_store));

    let state = AppState::with_stores(
        ledger,
        directory_store as Arc<dyn CacheStore>,
        denylist_store as Arc<dyn CacheStore>,
        &config,
    );
    let app = router(state);

    let addr: SocketAddr = config.bind_address().parse()?;

    let handle = Handle::new();
    let shutdown_handle = handle.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        tracing::info!("Shutdown signal received, draining connections");
        shutdown_handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
    });

    match &config.tls {
        Some(tls) => {
            let tls_config = RustlsConfig::from_pem_file(&tls.cert, &tls.key).await?;
            tracing::info!(%addr, "E-wallet server listening on https");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            tracing::info!(%addr, "E-wallet server listening on http");
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
    }

    tracing::info!("Server stopped");
    Ok(())
}

fn spawn_denylist_purge(store: Arc<LruCacheStore>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(DENYLIST_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            match store.purge_expired() {
                Ok(0) => {}
                Ok(removed) => tracing::debug!(removed, "Purged expired denylist entries"),
                Err(e) => tracing::warn!(error = %e, "Denylist purge failed"),
            }
        }
    });
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
