// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Top-up engine: credits a wallet from an external payment method.
//!
//! The top-up record and the wallet credit share one write transaction.

use std::sync::Arc;

use chrono::Utc;

use crate::storage::ledger::{
    next_id, open_table, update_row, LedgerError, SEQUENCES, SEQ_TOPUPS, WALLETS, WALLET_OWNERS,
};
use crate::storage::repository::{
    insert_topup, load_wallet, payment_method_exists, wallet_id_for_user,
};
use crate::storage::{
    LedgerDatabase, PaymentMethod, TopUpRecord, TopUpRepository, TopUpStatus, WalletRepository,
};

#[derive(Debug, thiserror::Error)]
pub enum TopUpError {
    #[error("amount must be greater than zero")]
    InvalidAmount,

    #[error("unknown payment method")]
    UnknownPaymentMethod,

    #[error("amount exceeds the maximum wallet balance")]
    BalanceOverflow,

    #[error("wallet not found")]
    WalletNotFound,

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Input of a single top-up.
#[derive(Debug, Clone)]
pub struct TopUpCommand {
    pub user_id: u64,
    pub amount: u64,
    pub tax: u64,
    pub payment_method_id: u64,
}

#[derive(Clone)]
pub struct TopUpEngine {
    ledger: Arc<LedgerDatabase>,
}

impl TopUpEngine {
    pub fn new(ledger: Arc<LedgerDatabase>) -> Self {
        Self { ledger }
    }

    /// Record a successful top-up and credit the user's wallet by `amount`.
    pub fn top_up(&self, command: TopUpCommand) -> Result<TopUpRecord, TopUpError> {
        if command.amount == 0 {
            return Err(TopUpError::InvalidAmount);
        }

        let now = Utc::now();
        let write_txn = self.ledger.begin_write()?;
        let record = {
            if !payment_method_exists(&write_txn, command.payment_method_id)? {
                return Err(TopUpError::UnknownPaymentMethod);
            }

            let owners = open_table(&write_txn, WALLET_OWNERS)?;
            let wallet_id =
                wallet_id_for_user(&owners, command.user_id)?.ok_or(TopUpError::WalletNotFound)?;
            drop(owners);

            let mut wallets = open_table(&write_txn, WALLETS)?;
            let wallet = load_wallet(&wallets, wallet_id)?.ok_or_else(|| {
                LedgerError::Invariant(format!("owner index points at missing wallet {wallet_id}"))
            })?;
            let wallet = wallet
                .credited(command.amount, now)
                .ok_or(TopUpError::BalanceOverflow)?;
            update_row(&mut wallets, wallet_id, &wallet)?;
            drop(wallets);

            let topup_id = next_id(&mut open_table(&write_txn, SEQUENCES)?, SEQ_TOPUPS)?;
            let record = TopUpRecord {
                topup_id,
                wallet_id,
                amount: command.amount,
                tax: command.tax,
                payment_method_id: command.payment_method_id,
                status: TopUpStatus::Success,
                created_at: now,
                updated_at: now,
            };
            insert_topup(&write_txn, &record)?;
            record
        };
        write_txn.commit().map_err(LedgerError::from)?;

        tracing::info!(
            topup_id = record.topup_id,
            wallet_id = record.wallet_id,
            amount = record.amount,
            "Top-up committed"
        );
        Ok(record)
    }

    /// A user's top-ups, newest first.
    pub fn list(&self, user_id: u64) -> Result<Vec<TopUpRecord>, TopUpError> {
        let wallet = match WalletRepository::new(&self.ledger).get_by_user(user_id) {
            Ok(wallet) => wallet,
            Err(LedgerError::NotFound(_)) => return Err(TopUpError::WalletNotFound),
            Err(e) => return Err(e.into()),
        };
        Ok(TopUpRepository::new(&self.ledger).list_by_wallet(wallet.wallet_id)?)
    }

    /// Payment methods a top-up may reference.
    pub fn payment_methods(&self) -> Result<Vec<PaymentMethod>, TopUpError> {
        Ok(TopUpRepository::new(&self.ledger).payment_methods()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::UserRepository;

    fn setup() -> (Arc<LedgerDatabase>, TopUpEngine, u64, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Arc::new(LedgerDatabase::open(&dir.path().join("ledger.redb")).unwrap());
        let (user, _) = UserRepository::new(&ledger)
            .create_account("a@example.com", "hash")
            .unwrap();
        let engine = TopUpEngine::new(Arc::clone(&ledger));
        (ledger, engine, user.user_id, dir)
    }

    fn command(user_id: u64, amount: u64) -> TopUpCommand {
        TopUpCommand {
            user_id,
            amount,
            tax: 2_500,
            payment_method_id: 1,
        }
    }

    #[test]
    fn top_up_credits_wallet_and_records_success() {
        let (ledger, engine, user_id, _dir) = setup();

        let record = engine.top_up(command(user_id, 100_000)).unwrap();
        assert_eq!(record.status, TopUpStatus::Success);
        assert_eq!(record.payment_method_id, 1);
        assert_eq!(record.tax, 2_500);

        let wallet = WalletRepository::new(&ledger).get_by_user(user_id).unwrap();
        assert_eq!(wallet.balance, 100_000);
    }

    #[test]
    fn list_is_newest_first() {
        let (_ledger, engine, user_id, _dir) = setup();
        engine.top_up(command(user_id, 1)).unwrap();
        engine.top_up(command(user_id, 2)).unwrap();

        let amounts: Vec<u64> = engine.list(user_id).unwrap().iter().map(|t| t.amount).collect();
        assert_eq!(amounts, vec![2, 1]);
    }

    #[test]
    fn invalid_input_is_rejected() {
        let (_ledger, engine, user_id, _dir) = setup();
        assert!(matches!(engine.top_up(command(user_id, 0)), Err(TopUpError::InvalidAmount)));

        let mut unknown = command(user_id, 10);
        unknown.payment_method_id = 999;
        assert!(matches!(engine.top_up(unknown), Err(TopUpError::UnknownPaymentMethod)));
        assert!(engine.list(user_id).unwrap().is_empty());
        assert!(!engine.payment_methods().unwrap().is_empty());

        assert!(matches!(engine.top_up(command(999, 10)), Err(TopUpError::WalletNotFound)));
    }

    #[test]
    fn overflow_rolls_back() {
        let (ledger, engine, user_id, _dir) = setup();
        engine.top_up(command(user_id, u64::MAX)).unwrap();

        assert!(matches!(engine.top_up(command(user_id, 1)), Err(TopUpError::BalanceOverflow)));
        assert_eq!(engine.list(user_id).unwrap().len(), 1);
        let wallet = WalletRepository::new(&ledger).get_by_user(user_id).unwrap();
        assert_eq!(wallet.balance, u64::MAX);
    }
}
