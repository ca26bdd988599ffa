// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Peer-to-peer transfer engine.
//!
//! A transfer is one redb write transaction:
//!
//! 1. take the single-writer lock and resolve the sender's wallet
//! 2. reject self-transfers and replayed idempotency keys
//! 3. read both wallet rows in ascending wallet-id order
//! 4. check the balance, debit, credit
//! 5. insert the `success` record with its index entries
//! 6. commit, unless the deadline has passed
//!
//! Any failure aborts the transaction, so either every row changes or none
//! does. No cache is touched.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use redb::WriteTransaction;
use serde::Serialize;

use crate::storage::ledger::{
    next_id, open_table, update_row, LedgerError, SEQUENCES, SEQ_TRANSFERS, WALLETS, WALLET_OWNERS,
};
use crate::storage::repository::{
    find_by_idempotency_key, insert_transfer, load_wallet, wallet_id_for_user,
};
use crate::storage::{LedgerDatabase, TransferRecord, TransferStatus, WalletRecord};

/// Longest accepted client idempotency key, in characters.
pub const MAX_IDEMPOTENCY_KEY_CHARS: usize = 128;

/// Errors returned by the transfer engine.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("amount must be greater than zero")]
    InvalidAmount,

    #[error("invalid PIN")]
    InvalidPin,

    #[error("idempotency key must be 1-{MAX_IDEMPOTENCY_KEY_CHARS} characters")]
    InvalidIdempotencyKey,

    #[error("cannot transfer to your own wallet")]
    SelfTransfer,

    #[error("insufficient balance")]
    InsufficientBalance,

    #[error("wallet not found")]
    WalletNotFound,

    #[error("duplicate request, already processed as transfer {transfer_id}")]
    DuplicateRequest { transfer_id: u64 },

    #[error("transfer timed out")]
    Timeout,

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("transfer worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl TransferError {
    /// Whether this is an expected business outcome rather than a fault.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, Self::Timeout | Self::Ledger(_) | Self::Worker(_))
    }
}

/// Input of a single transfer.
#[derive(Debug, Clone)]
pub struct TransferCommand {
    pub sender_user_id: u64,
    pub receiver_wallet_id: u64,
    pub amount: u64,
    pub note: String,
    /// Set by the caller after checking the PIN against the stored hash
    pub pin_verified: bool,
    pub idempotency_key: Option<String>,
    /// The unit rolls back if this passes before commit
    pub deadline: Instant,
}

/// Result of a committed transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferReceipt {
    pub transfer_id: u64,
    pub sender_wallet_id: u64,
    pub receiver_wallet_id: u64,
    pub amount: u64,
    /// Sender balance after the debit
    pub balance: u64,
    pub created_at: DateTime<Utc>,
}

/// Applies transfers against the ledger.
#[derive(Clone)]
pub struct TransferEngine {
    ledger: Arc<LedgerDatabase>,
}

impl TransferEngine {
    pub fn new(ledger: Arc<LedgerDatabase>) -> Self {
        Self { ledger }
    }

    /// Run a transfer on the blocking pool.
    pub async fn submit(&self, command: TransferCommand) -> Result<TransferReceipt, TransferError> {
        let engine = self.clone();
        tokio::task::spawn_blocking(move || engine.transfer(command)).await?
    }

    /// Run a transfer on the current thread. Blocks on the ledger write lock.
    pub fn transfer(&self, command: TransferCommand) -> Result<TransferReceipt, TransferError> {
        validate(&command)?;

        let write_txn = self.ledger.begin_write()?;
        let outcome = if Instant::now() >= command.deadline {
            Err(TransferError::Timeout)
        } else {
            apply(&write_txn, &command)
        };

        let receipt = match outcome {
            Ok(receipt) if Instant::now() < command.deadline => receipt,
            Ok(_) => return Err(abort(write_txn, TransferError::Timeout)),
            Err(err) => return Err(abort(write_txn, err)),
        };

        write_txn.commit().map_err(LedgerError::from)?;

        tracing::info!(
            transfer_id = receipt.transfer_id,
            sender_wallet_id = receipt.sender_wallet_id,
            receiver_wallet_id = receipt.receiver_wallet_id,
            amount = receipt.amount,
            "Transfer committed"
        );
        Ok(receipt)
    }
}

fn validate(command: &TransferCommand) -> Result<(), TransferError> {
    if command.amount == 0 {
        return Err(TransferError::InvalidAmount);
    }
    if !command.pin_verified {
        return Err(TransferError::InvalidPin);
    }
    if let Some(key) = command.idempotency_key.as_deref() {
        let chars = key.chars().count();
        if chars == 0 || chars > MAX_IDEMPOTENCY_KEY_CHARS {
            return Err(TransferError::InvalidIdempotencyKey);
        }
    }
    Ok(())
}

/// Roll back and hand the error through.
///
/// Faults are logged once, by whoever turns them into a response.
fn abort(write_txn: WriteTransaction, err: TransferError) -> TransferError {
    if let Err(abort_err) = write_txn.abort() {
        tracing::error!(error = %abort_err, "Failed to abort transfer transaction");
    }
    match &err {
        TransferError::Timeout => tracing::warn!("Transfer deadline passed, rolled back"),
        e if e.is_rejection() => tracing::debug!(reason = %e, "Transfer rejected"),
        _ => {}
    }
    err
}

fn apply(write_txn: &WriteTransaction, command: &TransferCommand) -> Result<TransferReceipt, TransferError> {
    let now = Utc::now();

    let sender_wallet_id = {
        let owners = open_table(write_txn, WALLET_OWNERS)?;
        wallet_id_for_user(&owners, command.sender_user_id)?.ok_or(TransferError::WalletNotFound)?
    };
    let receiver_wallet_id = command.receiver_wallet_id;

    if sender_wallet_id == receiver_wallet_id {
        return Err(TransferError::SelfTransfer);
    }

    if let Some(key) = command.idempotency_key.as_deref() {
        if let Some(transfer_id) = find_by_idempotency_key(write_txn, sender_wallet_id, key)? {
            return Err(TransferError::DuplicateRequest { transfer_id });
        }
    }

    let (sender, receiver) = {
        let mut wallets = open_table(write_txn, WALLETS)?;

        let (low, high) = if sender_wallet_id < receiver_wallet_id {
            (sender_wallet_id, receiver_wallet_id)
        } else {
            (receiver_wallet_id, sender_wallet_id)
        };
        let low_row = load_wallet(&wallets, low)?;
        let high_row = load_wallet(&wallets, high)?;
        let (sender_row, receiver_row) = if low == sender_wallet_id {
            (low_row, high_row)
        } else {
            (high_row, low_row)
        };

        let sender: WalletRecord = sender_row.ok_or_else(|| {
            LedgerError::Invariant(format!(
                "owner index points at missing wallet {sender_wallet_id}"
            ))
        })?;
        let receiver: WalletRecord = receiver_row.ok_or(TransferError::WalletNotFound)?;

        if sender.balance < command.amount {
            return Err(TransferError::InsufficientBalance);
        }

        let sender = sender
            .debited(command.amount, now)
            .ok_or(TransferError::InsufficientBalance)?;
        let receiver = receiver.credited(command.amount, now).ok_or_else(|| {
            LedgerError::Invariant(format!("balance overflow on wallet {receiver_wallet_id}"))
        })?;

        update_row(&mut wallets, sender.wallet_id, &sender)?;
        update_row(&mut wallets, receiver.wallet_id, &receiver)?;
        (sender, receiver)
    };

    let transfer_id = next_id(&mut open_table(write_txn, SEQUENCES)?, SEQ_TRANSFERS)?;
    let record = TransferRecord {
        transfer_id,
        sender_wallet_id: sender.wallet_id,
        receiver_wallet_id: receiver.wallet_id,
        amount: command.amount,
        status: TransferStatus::Success,
        note: command.note.clone(),
        idempotency_key: command.idempotency_key.clone(),
        deleted_by_sender: false,
        deleted_by_receiver: false,
        created_at: now,
        updated_at: now,
    };
    insert_transfer(write_txn, &record)?;

    Ok(TransferReceipt {
        transfer_id,
        sender_wallet_id: sender.wallet_id,
        receiver_wallet_id: receiver.wallet_id,
        amount: command.amount,
        balance: sender.balance,
        created_at: now,
    })
}
