// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to the ledger tables.
//!
//! Each repository borrows the [`LedgerDatabase`](super::LedgerDatabase) and
//! exposes the queries for one entity type. Multi-row mutations that must
//! share a transaction with other tables live in the engines and use the
//! `pub(crate)` helpers re-exported here.

pub mod topups;
pub mod transfers;
pub mod users;
pub mod wallets;

pub(crate) use topups::{insert_topup, payment_method_exists};
pub(crate) use transfers::{find_by_idempotency_key, insert_transfer};
pub(crate) use wallets::{load_wallet, wallet_id_for_user};

pub use topups::{PaymentMethod, TopUpRecord, TopUpRepository, TopUpStatus};
pub use transfers::{HistoryEntry, TransferRecord, TransferRepository, TransferSide, TransferStatus};
pub use users::{ProfileRecord, ProfileUpdate, UserRecord, UserRepository};
pub use wallets::{WalletRecord, WalletRepository};
