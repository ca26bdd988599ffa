// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transfer history endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::run_blocking;
use crate::{
    auth::Auth,
    directory::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE},
    error::ApiError,
    models::{HistoryQuery, HistoryResponse, MessageResponse, TransactionItem},
    state::AppState,
    storage::{LedgerError, TransferRepository, WalletRepository},
};

fn page_params(page: Option<usize>, limit: Option<usize>) -> Result<(usize, usize), ApiError> {
    let page = page.unwrap_or(1);
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE);
    if page == 0 {
        return Err(ApiError::bad_request("page must be 1 or greater"));
    }
    if limit == 0 || limit > MAX_PAGE_SIZE {
        return Err(ApiError::bad_request(format!(
            "limit must be between 1 and {MAX_PAGE_SIZE}"
        )));
    }
    Ok((page, limit))
}

/// The caller's transfers, newest first, each with direction and counterparty.
pub async fn list_transactions(
    Auth(user): Auth,
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let (page, limit) = page_params(query.page, query.limit)?;
    let wallet = WalletRepository::new(&state.ledger).get_by_user(user.user_id)?;

    let (entries, total) = TransferRepository::new(&state.ledger).history(
        wallet.wallet_id,
        (page - 1).saturating_mul(limit),
        limit,
        query.include_deleted.unwrap_or(false),
    )?;

    Ok(Json(HistoryResponse {
        transactions: entries.into_iter().map(TransactionItem::from).collect(),
        page,
        limit,
        total,
        total_pages: total.div_ceil(limit),
    }))
}

/// Hide a transfer from the caller's history. The other party still sees it.
pub async fn delete_transaction(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(transfer_id): Path<u64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let ledger = Arc::clone(&state.ledger);
    let user_id = user.user_id;
    let outcome = run_blocking(move || -> Result<_, ApiError> {
        let wallet = WalletRepository::new(&ledger).get_by_user(user_id)?;
        Ok(TransferRepository::new(&ledger).soft_delete(transfer_id, wallet.wallet_id))
    })
    .await?;

    match outcome {
        Ok(side) => {
            tracing::info!(user_id = user.user_id, transfer_id, ?side, "Transfer hidden");
            Ok(Json(MessageResponse::new("Transaction deleted")))
        }
        Err(LedgerError::NotFound(_)) => Err(ApiError::not_found("Transaction not found")),
        Err(e) => Err(e.into()),
    }
}
