// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    body::Body,
    http::{HeaderName, Request},
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::state::AppState;

pub mod auth;
pub mod health;
pub mod profile;
pub mod transactions;
pub mod transfer;
pub mod users;
pub mod wallet;

const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Run ledger writes and password/PIN hashing on the blocking pool.
pub(crate) async fn run_blocking<T, E, F>(work: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: From<tokio::task::JoinError> + Send + 'static,
{
    tokio::task::spawn_blocking(work).await?
}

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/pin", put(auth::set_pin))
        .route("/auth/password", put(auth::change_password))
        .route("/auth/confirm-pin", post(auth::confirm_pin))
        .route("/users", get(users::find_users))
        .route("/transfer", post(transfer::create_transfer))
        .route("/balance", get(wallet::get_balance))
        .route("/topup", post(wallet::top_up))
        .route("/topups", get(wallet::list_topups))
        .route("/payment-methods", get(wallet::list_payment_methods))
        .route("/transactions", get(transactions::list_transactions))
        .route(
            "/transactions/{transfer_id}",
            delete(transactions::delete_transaction),
        )
        .route(
            "/profile",
            get(profile::get_profile).patch(profile::update_profile),
        )
        .route("/profile/avatar", delete(profile::delete_avatar));

    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
        let request_id = request
            .headers()
            .get(&REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");
        tracing::info_span!(
            "http",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
        )
    });

    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .nest("/v1", v1_routes)
        .with_state(state)
        .layer(PropagateRequestIdLayer::new(REQUEST_ID_HEADER))
        .layer(trace)
        .layer(SetRequestIdLayer::new(REQUEST_ID_HEADER, MakeRequestUuid))
        .layer(CorsLayer::permissive())
}
