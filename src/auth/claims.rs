// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and authenticated user representation.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::AuthError;

/// Claims carried by bearer tokens issued at login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id as a decimal string)
    pub sub: String,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expiration (Unix seconds)
    pub exp: i64,
    /// Unique token id, so two logins in the same second yield distinct tokens
    pub jti: String,
}

/// Authenticated user information extracted from a verified token.
///
/// This is the primary type used throughout the application to represent
/// the authenticated user making a request.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// Ledger user id (`sub` claim)
    pub user_id: u64,

    /// The raw bearer token, kept so logout can revoke it
    pub token: String,

    /// Token expiration
    pub expires_at: DateTime<Utc>,
}

impl AuthenticatedUser {
    /// Build from verified claims.
    pub fn from_claims(claims: &Claims, token: &str) -> Result<Self, AuthError> {
        let user_id = claims.sub.parse().map_err(|_| AuthError::MalformedToken)?;
        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .ok_or(AuthError::MalformedToken)?;
        Ok(Self {
            user_id,
            token: token.to_string(),
            expires_at,
        })
    }
}
