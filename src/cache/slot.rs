// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Typed cache key families.

use std::fmt::Display;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};

use super::store::{CacheResult, CacheStore};

/// Namespace prefix of every cache key written by this service.
pub const KEY_NAMESPACE: &str = "ewallet";

/// One family of cache keys (`ewallet:<family>:<id>`) holding values of type `T`.
///
/// Payloads are JSON. A payload that no longer decodes is reported as an
/// error so the caller can fall back to the store.
pub struct CacheSlot<T> {
    store: Arc<dyn CacheStore>,
    family: &'static str,
    ttl: Duration,
    _payload: PhantomData<fn() -> T>,
}

impl<T> Clone for CacheSlot<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            family: self.family,
            ttl: self.ttl,
            _payload: PhantomData,
        }
    }
}

impl<T: Serialize + DeserializeOwned> CacheSlot<T> {
    pub fn new(store: Arc<dyn CacheStore>, family: &'static str, ttl: Duration) -> Self {
        Self {
            store,
            family,
            ttl,
            _payload: PhantomData,
        }
    }

    /// Full cache key for an id within this family.
    pub fn key(&self, id: impl Display) -> String {
        format!("{KEY_NAMESPACE}:{}:{id}", self.family)
    }

    pub fn get(&self, id: impl Display) -> CacheResult<Option<T>> {
        match self.store.get(&self.key(id))? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn put(&self, id: impl Display, value: &T) -> CacheResult<()> {
        let bytes = serde_json::to_vec(value)?;
        self.store.set(&self.key(id), bytes, self.ttl)
    }

    pub fn invalidate(&self, id: impl Display) -> CacheResult<()> {
        self.store.delete(&self.key(id))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
