// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Top-up record and payment method repository.

use chrono::{DateTime, Utc};
use redb::{ReadableTable, WriteTransaction};
use serde::{Deserialize, Serialize};

use super::super::ledger::{
    history_bounds, insert_row, make_history_key, read_row, record_id_from_history_key,
    LedgerDatabase, LedgerError, LedgerResult, PAYMENT_METHODS, TOPUPS, WALLET_TOPUPS,
};

/// Top-up status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopUpStatus {
    Pending,
    Success,
    Failed,
}

/// A payment method a wallet can be topped up from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub payment_method_id: u64,
    pub name: String,
}

/// Stored top-up row. Each one is paired with exactly one wallet credit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopUpRecord {
    pub topup_id: u64,
    pub wallet_id: u64,
    /// Credited amount
    pub amount: u64,
    /// Fee charged on top of `amount` by the payment method
    pub tax: u64,
    pub payment_method_id: u64,
    pub status: TopUpStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert a top-up row and its wallet index entry inside the caller's transaction.
pub(crate) fn insert_topup(txn: &WriteTransaction, record: &TopUpRecord) -> LedgerResult<()> {
    insert_row(&mut txn.open_table(TOPUPS)?, record.topup_id, record)?;
    let key = make_history_key(
        record.wallet_id,
        record.created_at.timestamp_micros(),
        record.topup_id,
    );
    txn.open_table(WALLET_TOPUPS)?.insert(key.as_slice(), 1u8)?;
    Ok(())
}

/// Whether a payment method id is known, checked inside the caller's transaction.
pub(crate) fn payment_method_exists(txn: &WriteTransaction, payment_method_id: u64) -> LedgerResult<bool> {
    let methods = txn.open_table(PAYMENT_METHODS)?;
    let found = methods.get(payment_method_id)?.is_some();
    Ok(found)
}

/// Top-up queries.
pub struct TopUpRepository<'a> {
    db: &'a LedgerDatabase,
}

impl<'a> TopUpRepository<'a> {
    pub fn new(db: &'a LedgerDatabase) -> Self {
        Self { db }
    }

    /// List a wallet's top-ups, newest first.
    pub fn list_by_wallet(&self, wallet_id: u64) -> LedgerResult<Vec<TopUpRecord>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(WALLET_TOPUPS)?;
        let topups = read_txn.open_table(TOPUPS)?;

        let (start, end) = history_bounds(wallet_id);
        let mut records = Vec::new();
        for entry in index.range(start.as_slice()..end.as_slice())? {
            let (key, _) = entry?;
            let Some(topup_id) = record_id_from_history_key(key.value()) else {
                continue;
            };
            let record: TopUpRecord = read_row(&topups, topup_id)?.ok_or_else(|| {
                LedgerError::Invariant(format!("index points at missing top-up {topup_id}"))
            })?;
            records.push(record);
        }
        Ok(records)
    }

    /// All payment methods, ordered by id.
    pub fn payment_methods(&self) -> LedgerResult<Vec<PaymentMethod>> {
        let read_txn = self.db.begin_read()?;
        let methods = read_txn.open_table(PAYMENT_METHODS)?;

        let mut result = Vec::new();
        for entry in methods.iter()? {
            let (id, name) = entry?;
            result.push(PaymentMethod {
                payment_method_id: id.value(),
                name: name.value().to_string(),
            });
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ledger::DEFAULT_PAYMENT_METHODS;

    #[test]
    fn payment_methods_are_listed_in_id_order() {
        let dir = tempfile::tempdir().unwrap();
        let db = LedgerDatabase::open(&dir.path().join("ledger.redb")).unwrap();

        let methods = TopUpRepository::new(&db).payment_methods().unwrap();
        assert_eq!(methods.len(), DEFAULT_PAYMENT_METHODS.len());
        assert_eq!(methods[0].payment_method_id, 1);
        assert_eq!(methods[0].name, DEFAULT_PAYMENT_METHODS[0]);
        assert!(methods.windows(2).all(|w| w[0].payment_method_id < w[1].payment_method_id));

        let txn = db.begin_write().unwrap();
        assert!(payment_method_exists(&txn, 1).unwrap());
        assert!(!payment_method_exists(&txn, 999).unwrap());
        txn.abort().unwrap();
    }
}
