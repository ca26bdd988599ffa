// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Peer-to-peer transfer endpoint.

use std::sync::Arc;
use std::time::Instant;

use axum::{extract::State, http::StatusCode, Json};

use super::{auth::verify_pin, run_blocking};
use crate::{
    auth::Auth,
    engine::{TransferCommand, TransferReceipt},
    error::ApiError,
    models::TransferRequest,
    state::AppState,
};

/// Longest accepted transfer note, in characters.
pub const MAX_NOTE_CHARS: usize = 255;

/// Move funds from the caller's wallet to another wallet.
///
/// The PIN is checked against the stored hash first; the engine then runs
/// the debit, credit and record insert as one unit. Both run on the
/// blocking pool.
pub async fn create_transfer(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<TransferRequest>,
) -> Result<(StatusCode, Json<TransferReceipt>), ApiError> {
    let note = request.note.as_deref().unwrap_or_default().trim().to_string();
    if note.chars().count() > MAX_NOTE_CHARS {
        return Err(ApiError::bad_request(format!(
            "Note must be at most {MAX_NOTE_CHARS} characters"
        )));
    }

    let ledger = Arc::clone(&state.ledger);
    let user_id = user.user_id;
    let pin = request.pin;
    let pin_verified = run_blocking(move || verify_pin(&ledger, user_id, &pin)).await?;

    let command = TransferCommand {
        sender_user_id: user.user_id,
        receiver_wallet_id: request.receiver_wallet_id,
        amount: request.amount,
        note,
        pin_verified,
        idempotency_key: request.idempotency_key,
        deadline: Instant::now() + state.transfer_timeout,
    };
    let receipt = state.transfers.submit(command).await?;

    Ok((StatusCode::CREATED, Json(receipt)))
}
