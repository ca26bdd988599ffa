// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User directory endpoint.

use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    auth::Auth,
    directory::{DirectoryPage, DEFAULT_PAGE_SIZE},
    error::ApiError,
    models::DirectoryQuery,
    state::AppState,
};

/// Search users by name or phone.
///
/// `GET /v1/users?search=&page=1&limit=10` is the cached first page.
pub async fn find_users(
    Auth(_user): Auth,
    State(state): State<AppState>,
    Query(query): Query<DirectoryQuery>,
) -> Result<Json<DirectoryPage>, ApiError> {
    let page = state.directory.find_users(
        query.search.as_deref().unwrap_or_default(),
        query.page.unwrap_or(1),
        query.limit.unwrap_or(DEFAULT_PAGE_SIZE),
    )?;
    Ok(Json(page))
}
