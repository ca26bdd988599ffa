// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Cache layer: byte store with expiry plus typed key families on top.

pub mod slot;
pub mod store;

pub use slot::{CacheSlot, KEY_NAMESPACE};
pub use store::{CacheError, CacheResult, CacheStore, LruCacheStore};
