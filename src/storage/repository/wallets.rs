// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet repository.
//!
//! Wallets are created with their owning user (see
//! [`UserRepository::create_account`](super::UserRepository::create_account))
//! and are never deleted. Balances only change inside the transfer and
//! top-up engines; this repository is read-only.

use chrono::{DateTime, Utc};
use redb::{ReadableTable, Table};
use serde::{Deserialize, Serialize};

use super::super::ledger::{
    read_row, LedgerDatabase, LedgerError, LedgerResult, WALLETS, WALLET_OWNERS,
};

/// Stored wallet row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletRecord {
    pub wallet_id: u64,
    /// Owning user (unique)
    pub user_id: u64,
    /// Balance in the smallest currency unit
    pub balance: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WalletRecord {
    /// Subtract `amount`, or `None` if the balance would go negative.
    pub fn debited(&self, amount: u64, now: DateTime<Utc>) -> Option<Self> {
        let balance = self.balance.checked_sub(amount)?;
        Some(Self {
            balance,
            updated_at: now,
            ..self.clone()
        })
    }

    /// Add `amount`, or `None` on overflow.
    pub fn credited(&self, amount: u64, now: DateTime<Utc>) -> Option<Self> {
        let balance = self.balance.checked_add(amount)?;
        Some(Self {
            balance,
            updated_at: now,
            ..self.clone()
        })
    }
}

/// Resolve a user's wallet id inside an open transaction.
pub(crate) fn wallet_id_for_user<Tb>(owners: &Tb, user_id: u64) -> LedgerResult<Option<u64>>
where
    Tb: ReadableTable<u64, u64>,
{
    Ok(owners.get(user_id)?.map(|v| v.value()))
}

/// Read a wallet row inside an open write transaction.
pub(crate) fn load_wallet(
    wallets: &Table<'_, u64, &'static [u8]>,
    wallet_id: u64,
) -> LedgerResult<Option<WalletRecord>> {
    read_row(wallets, wallet_id)
}

/// Read-only wallet queries.
pub struct WalletRepository<'a> {
    db: &'a LedgerDatabase,
}

impl<'a> WalletRepository<'a> {
    pub fn new(db: &'a LedgerDatabase) -> Self {
        Self { db }
    }

    /// Get a wallet by id.
    pub fn get(&self, wallet_id: u64) -> LedgerResult<WalletRecord> {
        let read_txn = self.db.begin_read()?;
        let wallets = read_txn.open_table(WALLETS)?;
        read_row(&wallets, wallet_id)?
            .ok_or_else(|| LedgerError::NotFound(format!("Wallet {wallet_id}")))
    }

    /// Get the wallet owned by a user.
    pub fn get_by_user(&self, user_id: u64) -> LedgerResult<WalletRecord> {
        let read_txn = self.db.begin_read()?;
        let owners = read_txn.open_table(WALLET_OWNERS)?;
        let wallet_id = wallet_id_for_user(&owners, user_id)?
            .ok_or_else(|| LedgerError::NotFound(format!("Wallet of user {user_id}")))?;
        let wallets = read_txn.open_table(WALLETS)?;
        read_row(&wallets, wallet_id)?
            .ok_or_else(|| LedgerError::NotFound(format!("Wallet {wallet_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::UserRepository;

    fn temp_db() -> (LedgerDatabase, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = LedgerDatabase::open(&dir.path().join("ledger.redb")).unwrap();
        (db, dir)
    }

    #[test]
    fn wallet_is_found_by_owner_and_id() {
        let (db, _dir) = temp_db();
        let (user, wallet) = UserRepository::new(&db)
            .create_account("a@example.com", "hash")
            .unwrap();

        let repo = WalletRepository::new(&db);
        assert_eq!(repo.get_by_user(user.user_id).unwrap(), wallet);
        assert_eq!(repo.get(wallet.wallet_id).unwrap(), wallet);
        assert!(matches!(repo.get(999), Err(LedgerError::NotFound(_))));
        assert!(matches!(repo.get_by_user(999), Err(LedgerError::NotFound(_))));
    }

    #[test]
    fn debit_and_credit_are_checked() {
        let now = Utc::now();
        let wallet = WalletRecord {
            wallet_id: 1,
            user_id: 1,
            balance: 100,
            created_at: now,
            updated_at: now,
        };

        assert_eq!(wallet.debited(100, now).unwrap().balance, 0);
        assert!(wallet.debited(101, now).is_none());
        assert_eq!(wallet.credited(50, now).unwrap().balance, 150);
        assert!(wallet.credited(u64::MAX, now).is_none());
    }
}
