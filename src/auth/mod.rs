// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Bearer token authentication for the e-wallet API.
//!
//! ## Auth Flow
//!
//! 1. Client logs in with email and password (`POST /v1/auth/login`)
//! 2. Server issues an HS256 JWT (`sub` = user id, unique `jti`)
//! 3. Client sends `Authorization: Bearer <token>`
//! 4. Server:
//!    - Verifies signature and expiry
//!    - Rejects tokens on the logout denylist
//!    - Extracts `sub` → `user_id`
//!
//! ## Security
//!
//! - All non-health endpoints except register/login require authentication
//! - Passwords and PINs are stored as argon2 hashes only
//! - Clock skew tolerance is 60 seconds

pub mod claims;
pub mod error;
pub mod extractor;
pub mod hashing;
pub mod tokens;

pub use claims::{AuthenticatedUser, Claims};
pub use error::AuthError;
pub use extractor::Auth;
pub use tokens::{IssuedToken, TokenKeys};
