// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # E-Wallet Server
//!
//! Digital wallet backend: accounts, balances and peer-to-peer transfers.
//!
//! ## Modules
//!
//! - [`engine`]: atomic transfer and top-up engines (the only balance writers)
//! - [`storage`]: redb ledger and typed repositories
//! - [`cache`]: expiring key/value store and typed cache slots
//! - [`directory`]: cache-aside user directory and profile snapshots
//! - [`sessions`]: bearer token denylist
//! - [`auth`]: token issuance/verification, hashing, the `Auth` extractor
//! - [`api`]: axum router and handlers

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod directory;
pub mod engine;
pub mod error;
pub mod logging;
pub mod models;
pub mod sessions;
pub mod state;
pub mod storage;
