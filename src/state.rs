// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;
use std::time::Duration;

use crate::auth::TokenKeys;
use crate::cache::{CacheStore, LruCacheStore};
use crate::config::AppConfig;
use crate::directory::Directory;
use crate::engine::{TopUpEngine, TransferEngine};
use crate::sessions::SessionRevocation;
use crate::storage::LedgerDatabase;

/// Shared handles injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<LedgerDatabase>,
    pub transfers: TransferEngine,
    pub topups: TopUpEngine,
    pub directory: Directory,
    pub sessions: SessionRevocation,
    pub tokens: Arc<TokenKeys>,
    /// Deadline budget of one transfer unit
    pub transfer_timeout: Duration,
}

impl AppState {
    /// State backed by fresh in-process caches.
    pub fn new(ledger: Arc<LedgerDatabase>, config: &AppConfig) -> Self {
        Self::with_stores(
            ledger,
            Arc::new(LruCacheStore::new(config.directory_cache_capacity)),
            Arc::new(LruCacheStore::unbounded()),
            config,
        )
    }

    /// State backed by the given directory cache and denylist stores.
    pub fn with_stores(
        ledger: Arc<LedgerDatabase>,
        directory_store: Arc<dyn CacheStore>,
        denylist_store: Arc<dyn CacheStore>,
        config: &AppConfig,
    ) -> Self {
        Self {
            transfers: TransferEngine::new(Arc::clone(&ledger)),
            topups: TopUpEngine::new(Arc::clone(&ledger)),
            directory: Directory::new(
                Arc::clone(&ledger),
                directory_store,
                config.directory_cache_ttl,
                config.profile_cache_ttl,
            ),
            sessions: SessionRevocation::new(denylist_store),
            tokens: Arc::new(TokenKeys::new(config.jwt_secret.as_bytes(), config.token_ttl)),
            transfer_timeout: config.transfer_timeout,
            ledger,
        }
    }
}

/// State on a temporary ledger, for handler and extractor tests.
#[cfg(test)]
pub(crate) fn test_state() -> (AppState, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::new(dir.path(), "test-secret-test-secret-test-secret");
    let ledger = Arc::new(LedgerDatabase::open(&config.ledger_path()).unwrap());
    (AppState::new(ledger, &config), dir)
}
