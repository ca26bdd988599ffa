// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Key/value cache store with per-entry expiry.
//!
//! [`CacheStore`] is the seam between the cache users (directory, profile
//! snapshots, token denylist) and the backing store. The in-process
//! implementation is an LRU map guarded by a mutex.

use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use lru::LruCache;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache lock poisoned")]
    Poisoned,

    #[error("cache payload error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Byte-oriented cache with TTL. Implementations must be shareable across tasks.
pub trait CacheStore: Send + Sync {
    /// Get a live value. Expired entries read as absent.
    fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Store a value that expires after `ttl`.
    fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()>;

    /// Remove a value. Removing an absent key is not an error.
    fn delete(&self, key: &str) -> CacheResult<()>;

    /// Whether a live value exists under `key`.
    fn exists(&self, key: &str) -> CacheResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}

struct CacheEntry {
    value: Vec<u8>,
    expires_at: Instant,
}

/// In-process LRU cache store.
pub struct LruCacheStore {
    cache: Mutex<LruCache<String, CacheEntry>>,
}

impl LruCacheStore {
    /// Bounded store: least recently used entries are evicted past `capacity`.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Store that never evicts by capacity, only by expiry.
    ///
    /// Used for the token denylist, where dropping a live entry would
    /// re-admit a revoked token.
    pub fn unbounded() -> Self {
        Self {
            cache: Mutex::new(LruCache::unbounded()),
        }
    }

    fn lock(&self) -> CacheResult<MutexGuard<'_, LruCache<String, CacheEntry>>> {
        self.cache.lock().map_err(|_| CacheError::Poisoned)
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> CacheResult<usize> {
        let mut cache = self.lock()?;
        let now = Instant::now();
        let expired: Vec<String> = cache
            .iter()
            .filter(|(_, entry)| entry.expires_at <= now)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            cache.pop(key);
        }
        Ok(expired.len())
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.lock().map(|cache| cache.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for LruCacheStore {
    fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut cache = self.lock()?;
        if let Some(entry) = cache.get(key) {
            if entry.expires_at > Instant::now() {
                return Ok(Some(entry.value.clone()));
            }
            cache.pop(key);
        }
        Ok(None)
    }

    fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()> {
        let mut cache = self.lock()?;
        cache.put(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    fn delete(&self, key: &str) -> CacheResult<()> {
        self.lock()?.pop(key);
        Ok(())
    }
}
