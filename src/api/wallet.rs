// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Balance, top-up and payment method endpoints.

use axum::{extract::State, http::StatusCode, Json};

use super::run_blocking;
use crate::{
    auth::Auth,
    engine::TopUpCommand,
    error::ApiError,
    models::{BalanceResponse, TopUpRequest},
    state::AppState,
    storage::{PaymentMethod, TopUpRecord, WalletRepository},
};

/// Current balance of the caller's wallet.
pub async fn get_balance(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let wallet = WalletRepository::new(&state.ledger).get_by_user(user.user_id)?;
    Ok(Json(BalanceResponse {
        wallet_id: wallet.wallet_id,
        balance: wallet.balance,
        updated_at: wallet.updated_at,
    }))
}

/// Credit the caller's wallet from a payment method.
pub async fn top_up(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<TopUpRequest>,
) -> Result<(StatusCode, Json<TopUpRecord>), ApiError> {
    let command = TopUpCommand {
        user_id: user.user_id,
        amount: request.amount,
        tax: request.tax,
        payment_method_id: request.payment_method_id,
    };
    let topups = state.topups.clone();
    let record =
        run_blocking(move || -> Result<TopUpRecord, ApiError> { Ok(topups.top_up(command)?) })
            .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// The caller's top-ups, newest first.
pub async fn list_topups(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<Vec<TopUpRecord>>, ApiError> {
    Ok(Json(state.topups.list(user.user_id)?))
}

/// Payment methods a top-up may reference, ordered by id.
pub async fn list_payment_methods(
    Auth(_user): Auth,
    State(state): State<AppState>,
) -> Result<Json<Vec<PaymentMethod>>, ApiError> {
    Ok(Json(state.topups.payment_methods()?))
}
