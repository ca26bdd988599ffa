// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transfer record repository.
//!
//! Transfer records are written only by the transfer engine. Afterwards the
//! amount and wallet references never change; the two soft-delete flags
//! are the only mutable fields.

use chrono::{DateTime, Utc};
use redb::{ReadableTable, WriteTransaction};
use serde::{Deserialize, Serialize};

use super::super::ledger::{
    history_bounds, insert_row, make_history_key, make_idempotency_key, read_row,
    record_id_from_history_key, update_row, LedgerDatabase, LedgerError, LedgerResult, PROFILES,
    SIDE_RECEIVER, SIDE_SENDER, TRANSFERS, TRANSFER_IDEMPOTENCY, WALLETS, WALLET_TRANSFERS,
};
use super::users::ProfileRecord;
use super::wallets::WalletRecord;

/// Transfer status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    Pending,
    Success,
    Failed,
}

/// Which side of a transfer a wallet occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferSide {
    Sent,
    Received,
}

impl TransferSide {
    fn from_marker(marker: u8) -> LedgerResult<Self> {
        match marker {
            SIDE_SENDER => Ok(Self::Sent),
            SIDE_RECEIVER => Ok(Self::Received),
            other => Err(LedgerError::Invariant(format!(
                "unknown history side marker {other}"
            ))),
        }
    }
}

/// Stored transfer row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub transfer_id: u64,
    pub sender_wallet_id: u64,
    pub receiver_wallet_id: u64,
    pub amount: u64,
    pub status: TransferStatus,
    #[serde(default)]
    pub note: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    #[serde(default)]
    pub deleted_by_sender: bool,
    #[serde(default)]
    pub deleted_by_receiver: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TransferRecord {
    /// Whether this record is hidden from the given side.
    pub fn is_deleted_for(&self, side: TransferSide) -> bool {
        match side {
            TransferSide::Sent => self.deleted_by_sender,
            TransferSide::Received => self.deleted_by_receiver,
        }
    }

    fn counterparty_wallet_id(&self, side: TransferSide) -> u64 {
        match side {
            TransferSide::Sent => self.receiver_wallet_id,
            TransferSide::Received => self.sender_wallet_id,
        }
    }
}

/// One row of a wallet's transfer history.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub transfer: TransferRecord,
    pub direction: TransferSide,
    /// Directory entry of the other party, if their profile still resolves
    pub counterparty: Option<ProfileRecord>,
}

/// Insert a transfer record with its history index entries and, when a key
/// is present, its idempotency entry. Runs inside the caller's transaction.
pub(crate) fn insert_transfer(txn: &WriteTransaction, record: &TransferRecord) -> LedgerResult<()> {
    let ts = record.created_at.timestamp_micros();

    insert_row(&mut txn.open_table(TRANSFERS)?, record.transfer_id, record)?;

    let mut index = txn.open_table(WALLET_TRANSFERS)?;
    let sender_key = make_history_key(record.sender_wallet_id, ts, record.transfer_id);
    let receiver_key = make_history_key(record.receiver_wallet_id, ts, record.transfer_id);
    index.insert(sender_key.as_slice(), SIDE_SENDER)?;
    index.insert(receiver_key.as_slice(), SIDE_RECEIVER)?;

    if let Some(client_key) = record.idempotency_key.as_deref() {
        let key = make_idempotency_key(record.sender_wallet_id, client_key);
        let mut keys = txn.open_table(TRANSFER_IDEMPOTENCY)?;
        let replaced = keys.insert(key.as_slice(), record.transfer_id)?.is_some();
        if replaced {
            return Err(LedgerError::Invariant(format!(
                "idempotency key reused by transfer {}",
                record.transfer_id
            )));
        }
    }
    Ok(())
}

/// Look up a previously recorded idempotency key for a sender wallet.
pub(crate) fn find_by_idempotency_key(
    txn: &WriteTransaction,
    sender_wallet_id: u64,
    client_key: &str,
) -> LedgerResult<Option<u64>> {
    let key = make_idempotency_key(sender_wallet_id, client_key);
    let table = txn.open_table(TRANSFER_IDEMPOTENCY)?;
    let found = table.get(key.as_slice())?.map(|v| v.value());
    Ok(found)
}

/// Transfer queries and soft deletion.
pub struct TransferRepository<'a> {
    db: &'a LedgerDatabase,
}

impl<'a> TransferRepository<'a> {
    pub fn new(db: &'a LedgerDatabase) -> Self {
        Self { db }
    }

    /// Get a transfer by id.
    pub fn get(&self, transfer_id: u64) -> LedgerResult<TransferRecord> {
        let read_txn = self.db.begin_read()?;
        let transfers = read_txn.open_table(TRANSFERS)?;
        read_row(&transfers, transfer_id)?
            .ok_or_else(|| LedgerError::NotFound(format!("Transfer {transfer_id}")))
    }

    /// Page through a wallet's history, newest first.
    ///
    /// Records the wallet's side has soft-deleted are skipped unless
    /// `include_deleted` is set. Returns `(page, total_visible)`.
    pub fn history(
        &self,
        wallet_id: u64,
        offset: usize,
        limit: usize,
        include_deleted: bool,
    ) -> LedgerResult<(Vec<HistoryEntry>, usize)> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(WALLET_TRANSFERS)?;
        let transfers = read_txn.open_table(TRANSFERS)?;
        let wallets = read_txn.open_table(WALLETS)?;
        let profiles = read_txn.open_table(PROFILES)?;

        let (start, end) = history_bounds(wallet_id);
        let mut page = Vec::with_capacity(limit);
        let mut total = 0usize;

        for entry in index.range(start.as_slice()..end.as_slice())? {
            let (key, marker) = entry?;
            let Some(transfer_id) = record_id_from_history_key(key.value()) else {
                continue;
            };
            let direction = TransferSide::from_marker(marker.value())?;
            let transfer: TransferRecord = read_row(&transfers, transfer_id)?.ok_or_else(|| {
                LedgerError::Invariant(format!("history points at missing transfer {transfer_id}"))
            })?;

            if !include_deleted && transfer.is_deleted_for(direction) {
                continue;
            }
            if total >= offset && page.len() < limit {
                let other_wallet: Option<WalletRecord> =
                    read_row(&wallets, transfer.counterparty_wallet_id(direction))?;
                let counterparty = match other_wallet {
                    Some(wallet) => read_row(&profiles, wallet.user_id)?,
                    None => None,
                };
                page.push(HistoryEntry {
                    transfer,
                    direction,
                    counterparty,
                });
            }
            total += 1;
        }

        Ok((page, total))
    }

    /// Hide a transfer from the requesting wallet's side.
    ///
    /// Only the flag of the side the wallet occupies is set; amount, status
    /// and balances are untouched. Repeating the call is harmless.
    ///
    /// # Errors
    /// - `LedgerError::NotFound` if the transfer does not exist or the wallet
    ///   is on neither side
    pub fn soft_delete(&self, transfer_id: u64, wallet_id: u64) -> LedgerResult<TransferSide> {
        let write_txn = self.db.begin_write()?;
        let side = {
            let mut transfers = write_txn.open_table(TRANSFERS)?;
            let mut record: TransferRecord = read_row(&transfers, transfer_id)?
                .ok_or_else(|| LedgerError::NotFound(format!("Transfer {transfer_id}")))?;

            let side = if record.sender_wallet_id == wallet_id {
                record.deleted_by_sender = true;
                TransferSide::Sent
            } else if record.receiver_wallet_id == wallet_id {
                record.deleted_by_receiver = true;
                TransferSide::Received
            } else {
                return Err(LedgerError::NotFound(format!("Transfer {transfer_id}")));
            };

            record.updated_at = Utc::now();
            update_row(&mut transfers, transfer_id, &record)?;
            side
        };
        write_txn.commit()?;
        Ok(side)
    }
}
