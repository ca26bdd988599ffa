// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer token denylist.
//!
//! A revoked token is stored as `ewallet:revoked:<sha256 hex>` until it
//! would have expired anyway, plus a small leeway for clock skew between
//! the issuer and this process. The raw token is never used as a key.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::cache::{CacheError, CacheStore, KEY_NAMESPACE};

/// Extra lifetime given to denylist entries past the token's own expiry.
pub const REVOCATION_LEEWAY: Duration = Duration::from_secs(60);

const REVOKED_SENTINEL: &[u8] = b"1";

/// Session revocation manager.
#[derive(Clone)]
pub struct SessionRevocation {
    store: Arc<dyn CacheStore>,
}

impl SessionRevocation {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    fn key(token: &str) -> String {
        let digest = Sha256::digest(token.as_bytes());
        format!("{KEY_NAMESPACE}:revoked:{}", hex::encode(digest))
    }

    /// Deny `token` until `expires_at` (plus leeway).
    ///
    /// Write failures are returned: a logout must not report success while
    /// the token is still accepted.
    pub fn revoke(&self, token: &str, expires_at: DateTime<Utc>) -> Result<(), CacheError> {
        let remaining = (expires_at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        self.store
            .set(&Self::key(token), REVOKED_SENTINEL.to_vec(), remaining + REVOCATION_LEEWAY)?;
        tracing::debug!(ttl_secs = (remaining + REVOCATION_LEEWAY).as_secs(), "Token revoked");
        Ok(())
    }

    /// Whether `token` has been revoked.
    ///
    /// Fails closed: if the denylist cannot be read the token counts as revoked.
    pub fn is_revoked(&self, token: &str) -> bool {
        match self.store.exists(&Self::key(token)) {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(error = %e, "Denylist unavailable, rejecting token");
                true
            }
        }
    }

    /// Readiness probe: can the denylist be read at all.
    pub fn ping(&self) -> Result<(), CacheError> {
        self.store.exists(&format!("{KEY_NAMESPACE}:health"))?;
        Ok(())
    }
}
