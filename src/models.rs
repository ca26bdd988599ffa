// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! This module defines the request and response data structures used by
//! the REST API. Amounts are integers in the smallest currency unit.
//!
//! ## Model Categories
//!
//! - **Auth**: registration, login, PIN and password management
//! - **Transfers**: peer-to-peer transfers and history
//! - **Wallet**: balance and top-ups
//! - **Profile**: the caller's own profile

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::directory::DirectoryEntry;
use crate::storage::{HistoryEntry, TransferSide, TransferStatus};

// =============================================================================
// Auth Models
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: u64,
    pub wallet_id: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub user_id: u64,
    /// Whether a transfer PIN has been set
    pub pin_set: bool,
}

/// Set or change the transfer PIN. `old_pin` is required when one exists.
#[derive(Debug, Clone, Deserialize)]
pub struct SetPinRequest {
    #[serde(default)]
    pub old_pin: Option<String>,
    pub new_pin: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmPinRequest {
    pub pin: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// =============================================================================
// Directory Models
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectoryQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub limit: Option<usize>,
}

// =============================================================================
// Transfer Models
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct TransferRequest {
    pub receiver_wallet_id: u64,
    pub amount: u64,
    #[serde(default)]
    pub note: Option<String>,
    /// Transfer PIN, checked against the stored hash before the transfer runs
    pub pin: String,
    /// Optional client key; a repeat with the same key is rejected
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub include_deleted: Option<bool>,
}

/// One transfer as seen by the calling user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionItem {
    pub transfer_id: u64,
    pub direction: TransferSide,
    pub amount: u64,
    pub status: TransferStatus,
    pub note: String,
    /// The other party's directory entry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counterparty: Option<DirectoryEntry>,
    pub counterparty_wallet_id: u64,
    /// Hidden from this user's side
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
}

impl From<HistoryEntry> for TransactionItem {
    fn from(entry: HistoryEntry) -> Self {
        let deleted = entry.transfer.is_deleted_for(entry.direction);
        let counterparty_wallet_id = match entry.direction {
            TransferSide::Sent => entry.transfer.receiver_wallet_id,
            TransferSide::Received => entry.transfer.sender_wallet_id,
        };
        Self {
            transfer_id: entry.transfer.transfer_id,
            direction: entry.direction,
            amount: entry.transfer.amount,
            status: entry.transfer.status,
            note: entry.transfer.note,
            counterparty: entry.counterparty.map(DirectoryEntry::from),
            counterparty_wallet_id,
            deleted,
            created_at: entry.transfer.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub transactions: Vec<TransactionItem>,
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub total_pages: usize,
}

// =============================================================================
// Wallet Models
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub wallet_id: u64,
    pub balance: u64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopUpRequest {
    pub amount: u64,
    #[serde(default)]
    pub tax: u64,
    pub payment_method_id: u64,
}

// =============================================================================
// Profile Models
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub fullname: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}
