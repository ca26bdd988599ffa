// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Ledger Storage Module
//!
//! Persistent storage on an embedded redb database holding users, profiles,
//! wallets, transfer records and top-ups.
//!
//! ## Storage Layout
//!
//! ```text
//! $DATA_DIR/
//!   ledger.redb     # All tables, single file, ACID
//! ```
//!
//! ## Important Notes
//!
//! - The database is opened once at startup and shared through `AppState`
//! - Only one write transaction runs at a time; readers use snapshots
//! - All redb calls block; handlers run writes and password/PIN hashing
//!   on the blocking pool

pub mod ledger;
pub mod repository;

pub use ledger::{LedgerDatabase, LedgerError, LedgerResult};
pub use repository::{
    HistoryEntry, PaymentMethod, ProfileRecord, ProfileUpdate, TopUpRecord, TopUpRepository,
    TopUpStatus, TransferRecord, TransferRepository, TransferSide, TransferStatus, UserRecord,
    UserRepository, WalletRecord, WalletRepository,
};
