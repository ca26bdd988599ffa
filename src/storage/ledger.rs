// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded account ledger backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `users`: user_id → serialized UserRecord
//! - `user_emails`: normalized email → user_id (uniqueness index)
//! - `profiles`: user_id → serialized ProfileRecord
//! - `wallets`: wallet_id → serialized WalletRecord
//! - `wallet_owners`: user_id → wallet_id (one wallet per user)
//! - `transfers`: transfer_id → serialized TransferRecord
//! - `wallet_transfers`: composite key (wallet_id|!timestamp|transfer_id) → side
//! - `transfer_idempotency`: composite key (wallet_id|key) → transfer_id
//! - `topups`: topup_id → serialized TopUpRecord
//! - `wallet_topups`: composite key (wallet_id|!timestamp|topup_id) → marker
//! - `payment_methods`: payment_method_id → display name
//! - `sequences`: sequence name → last issued id
//!
//! redb admits a single write transaction at a time, so every mutation below
//! runs with exclusive access to all rows it touches until commit or abort.

use std::path::Path;

use redb::{
    Database, Key, ReadTransaction, ReadableDatabase, ReadableTable, ReadableTableMetadata, Table,
    TableDefinition, Value, WriteTransaction,
};
use serde::{de::DeserializeOwned, Serialize};

// =============================================================================
// Table Definitions
// =============================================================================

pub(crate) const USERS: TableDefinition<u64, &[u8]> = TableDefinition::new("users");

pub(crate) const USER_EMAILS: TableDefinition<&str, u64> = TableDefinition::new("user_emails");

pub(crate) const PROFILES: TableDefinition<u64, &[u8]> = TableDefinition::new("profiles");

pub(crate) const WALLETS: TableDefinition<u64, &[u8]> = TableDefinition::new("wallets");

pub(crate) const WALLET_OWNERS: TableDefinition<u64, u64> = TableDefinition::new("wallet_owners");

pub(crate) const TRANSFERS: TableDefinition<u64, &[u8]> = TableDefinition::new("transfers");

/// Index: composite key → side marker (see [`SIDE_SENDER`] / [`SIDE_RECEIVER`]).
/// Key format: `wallet_id_be|!timestamp_be|transfer_id_be` for newest-first scans.
pub(crate) const WALLET_TRANSFERS: TableDefinition<&[u8], u8> =
    TableDefinition::new("wallet_transfers");

pub(crate) const TRANSFER_IDEMPOTENCY: TableDefinition<&[u8], u64> =
    TableDefinition::new("transfer_idempotency");

pub(crate) const TOPUPS: TableDefinition<u64, &[u8]> = TableDefinition::new("topups");

pub(crate) const WALLET_TOPUPS: TableDefinition<&[u8], u8> = TableDefinition::new("wallet_topups");

pub(crate) const PAYMENT_METHODS: TableDefinition<u64, &str> =
    TableDefinition::new("payment_methods");

pub(crate) const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

/// Payment methods written into a fresh ledger, ids assigned in order from 1.
pub const DEFAULT_PAYMENT_METHODS: &[&str] =
    &["Bank Transfer", "Virtual Account", "Debit Card", "Credit Card", "Retail Outlet"];

pub(crate) const SIDE_SENDER: u8 = 0;
pub(crate) const SIDE_RECEIVER: u8 = 1;

pub(crate) const SEQ_USERS: &str = "users";
pub(crate) const SEQ_WALLETS: &str = "wallets";
pub(crate) const SEQ_TRANSFERS: &str = "transfers";
pub(crate) const SEQ_TOPUPS: &str = "topups";

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// A write touched no row where exactly one was expected, or a stored
    /// value would leave its valid range. Never a business outcome.
    #[error("ledger invariant violated: {0}")]
    Invariant(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

// =============================================================================
// Index Key Helpers
// =============================================================================

/// Build a composite key for the per-wallet history indexes.
///
/// Format: `wallet_id_be | inverted_timestamp_micros_be | record_id_be`
///
/// The inverted timestamp gives newest-first ordering on a forward scan; the
/// record id breaks ties between records created in the same microsecond.
pub(crate) fn make_history_key(wallet_id: u64, timestamp_micros: i64, record_id: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(24);
    key.extend_from_slice(&wallet_id.to_be_bytes());
    key.extend_from_slice(&(!(timestamp_micros as u64)).to_be_bytes());
    key.extend_from_slice(&(!record_id).to_be_bytes());
    key
}

/// Inclusive lower and exclusive upper bound covering every history key of a wallet.
pub(crate) fn history_bounds(wallet_id: u64) -> (Vec<u8>, Vec<u8>) {
    let start = wallet_id.to_be_bytes().to_vec();
    let mut end = start.clone();
    end.extend_from_slice(&[0xFF; 17]);
    (start, end)
}

/// Extract the record id from a history key.
pub(crate) fn record_id_from_history_key(key: &[u8]) -> Option<u64> {
    let bytes: [u8; 8] = key.get(16..24)?.try_into().ok()?;
    Some(!u64::from_be_bytes(bytes))
}

/// Build the idempotency key scoped to the sending wallet.
pub(crate) fn make_idempotency_key(wallet_id: u64, client_key: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(8 + client_key.len());
    key.extend_from_slice(&wallet_id.to_be_bytes());
    key.extend_from_slice(client_key.as_bytes());
    key
}

// =============================================================================
// Row Helpers
// =============================================================================

/// Read and deserialize a JSON row.
pub(crate) fn read_row<T, Tb>(table: &Tb, id: u64) -> LedgerResult<Option<T>>
where
    T: DeserializeOwned,
    Tb: ReadableTable<u64, &'static [u8]>,
{
    match table.get(id)? {
        Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
        None => Ok(None),
    }
}

/// Insert a JSON row that must not exist yet.
pub(crate) fn insert_row<T: Serialize>(
    table: &mut Table<'_, u64, &'static [u8]>,
    id: u64,
    row: &T,
) -> LedgerResult<()> {
    let json = serde_json::to_vec(row)?;
    let previous = table.insert(id, json.as_slice())?;
    if previous.is_some() {
        return Err(LedgerError::Invariant(format!("row {id} already present")));
    }
    Ok(())
}

/// Overwrite a JSON row that must already exist.
///
/// An absent row means the write affected zero rows, which is reported as
/// an invariant violation instead of silently creating it.
pub(crate) fn update_row<T: Serialize>(
    table: &mut Table<'_, u64, &'static [u8]>,
    id: u64,
    row: &T,
) -> LedgerResult<()> {
    let json = serde_json::to_vec(row)?;
    let previous = table.insert(id, json.as_slice())?;
    if previous.is_none() {
        return Err(LedgerError::Invariant(format!(
            "update of row {id} affected no rows"
        )));
    }
    Ok(())
}

/// Open a table inside a write transaction, with the error lifted into [`LedgerError`].
pub(crate) fn open_table<'txn, K: Key + 'static, V: Value + 'static>(
    txn: &'txn WriteTransaction,
    definition: TableDefinition<'_, K, V>,
) -> LedgerResult<Table<'txn, K, V>> {
    Ok(txn.open_table(definition)?)
}

/// Issue the next id of a named sequence. Ids start at 1.
pub(crate) fn next_id(sequences: &mut Table<'_, &'static str, u64>, name: &str) -> LedgerResult<u64> {
    let current = sequences.get(name)?.map(|v| v.value()).unwrap_or(0);
    let next = current + 1;
    sequences.insert(name, next)?;
    Ok(next)
}

// =============================================================================
// LedgerDatabase
// =============================================================================

/// Embedded ACID ledger database.
pub struct LedgerDatabase {
    db: Database,
}

impl LedgerDatabase {
    /// Open (or create) the ledger at the given path.
    pub fn open(path: &Path) -> LedgerResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(USER_EMAILS)?;
            let _ = write_txn.open_table(PROFILES)?;
            let _ = write_txn.open_table(WALLETS)?;
            let _ = write_txn.open_table(WALLET_OWNERS)?;
            let _ = write_txn.open_table(TRANSFERS)?;
            let _ = write_txn.open_table(WALLET_TRANSFERS)?;
            let _ = write_txn.open_table(TRANSFER_IDEMPOTENCY)?;
            let _ = write_txn.open_table(TOPUPS)?;
            let _ = write_txn.open_table(WALLET_TOPUPS)?;
            let _ = write_txn.open_table(SEQUENCES)?;

            let mut methods = write_txn.open_table(PAYMENT_METHODS)?;
            if methods.is_empty()? {
                for (id, name) in (1u64..).zip(DEFAULT_PAYMENT_METHODS) {
                    methods.insert(id, *name)?;
                }
            }
        }
        write_txn.commit()?;

        tracing::info!(path = %path.display(), "Ledger database opened");
        Ok(Self { db })
    }

    /// Begin an exclusive write transaction.
    ///
    /// Blocks until any in-flight write transaction has committed or aborted.
    /// Dropping the returned transaction without committing rolls it back.
    pub(crate) fn begin_write(&self) -> LedgerResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    /// Begin a snapshot read transaction.
    pub(crate) fn begin_read(&self) -> LedgerResult<ReadTransaction> {
        Ok(self.db.begin_read()?)
    }

    /// Cheap liveness probe used by the readiness endpoint.
    pub fn ping(&self) -> LedgerResult<()> {
        let read_txn = self.begin_read()?;
        let _ = read_txn.open_table(SEQUENCES)?;
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_db() -> (LedgerDatabase, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = LedgerDatabase::open(&dir.path().join("ledger.redb")).unwrap();
        (db, dir)
    }

    #[test]
    fn open_creates_tables_and_pings() {
        let (db, _dir) = temp_db();
        db.ping().unwrap();
    }

    #[test]
    fn open_reports_unusable_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();

        let result = LedgerDatabase::open(&blocker.join("ledger.redb"));
        assert!(matches!(result, Err(LedgerError::Io(_))));
    }

    #[test]
    fn payment_methods_are_seeded_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.redb");
        {
            let db = LedgerDatabase::open(&path).unwrap();
            let txn = db.begin_write().unwrap();
            txn.open_table(PAYMENT_METHODS).unwrap().remove(1).unwrap();
            txn.commit().unwrap();
        }

        let db = LedgerDatabase::open(&path).unwrap();
        let read_txn = db.begin_read().unwrap();
        let methods = read_txn.open_table(PAYMENT_METHODS).unwrap();
        assert_eq!(methods.len().unwrap(), DEFAULT_PAYMENT_METHODS.len() as u64 - 1);
        assert!(methods.get(1).unwrap().is_none());
    }

    #[test]
    fn sequences_start_at_one_and_increment() {
        let (db, _dir) = temp_db();
        let txn = db.begin_write().unwrap();
        {
            let mut seq = txn.open_table(SEQUENCES).unwrap();
            assert_eq!(next_id(&mut seq, SEQ_USERS).unwrap(), 1);
            assert_eq!(next_id(&mut seq, SEQ_USERS).unwrap(), 2);
            assert_eq!(next_id(&mut seq, SEQ_WALLETS).unwrap(), 1);
        }
        txn.commit().unwrap();
    }

    #[test]
    fn aborted_transaction_leaves_no_trace() {
        let (db, _dir) = temp_db();
        let txn = db.begin_write().unwrap();
        {
            let mut seq = txn.open_table(SEQUENCES).unwrap();
            next_id(&mut seq, SEQ_TRANSFERS).unwrap();
        }
        txn.abort().unwrap();

        let txn = db.begin_write().unwrap();
        {
            let mut seq = txn.open_table(SEQUENCES).unwrap();
            assert_eq!(next_id(&mut seq, SEQ_TRANSFERS).unwrap(), 1);
        }
        txn.commit().unwrap();
    }

    #[test]
    fn update_row_rejects_missing_row() {
        let (db, _dir) = temp_db();
        let txn = db.begin_write().unwrap();
        {
            let mut wallets = txn.open_table(WALLETS).unwrap();
            let result = update_row(&mut wallets, 42, &"anything");
            assert!(matches!(result, Err(LedgerError::Invariant(_))));
        }
        txn.abort().unwrap();
    }

    #[test]
    fn history_key_orders_newest_first() {
        let key_old = make_history_key(7, 1_000, 1);
        let key_new = make_history_key(7, 2_000, 2);
        assert!(key_new < key_old, "Newer timestamps should sort first");

        // Same timestamp: higher id sorts first
        let a = make_history_key(7, 1_000, 3);
        let b = make_history_key(7, 1_000, 4);
        assert!(b < a);
    }

    #[test]
    fn history_key_stays_within_wallet_bounds() {
        let (start, end) = history_bounds(7);
        let key = make_history_key(7, i64::MAX, u64::MAX);
        assert!(key.as_slice() >= start.as_slice() && key.as_slice() < end.as_slice());

        let other = make_history_key(8, 0, 1);
        assert!(other.as_slice() >= end.as_slice());
    }

    #[test]
    fn record_id_round_trips_through_history_key() {
        let key = make_history_key(1, 123_456, 99);
        assert_eq!(record_id_from_history_key(&key), Some(99));
        assert_eq!(record_id_from_history_key(&key[..10]), None);
    }
}
