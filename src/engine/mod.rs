// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Balance-mutating engines. Nothing else writes wallet balances.

pub mod topup;
pub mod transfer;

pub use topup::{TopUpCommand, TopUpEngine, TopUpError};
pub use transfer::{TransferCommand, TransferEngine, TransferError, TransferReceipt};
