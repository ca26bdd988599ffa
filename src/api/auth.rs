// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account endpoints: registration, login, logout, PIN and password.
//!
//! Argon2 hashing and ledger writes run on the blocking pool.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};

use super::run_blocking;
use crate::{
    auth::{
        hashing::{
            hash_secret, is_valid_password, is_valid_pin, normalize_email, verify_secret,
            MAX_PASSWORD_CHARS, MIN_PASSWORD_CHARS, PIN_LENGTH,
        },
        Auth, AuthError,
    },
    error::ApiError,
    models::{
        ChangePasswordRequest, ConfirmPinRequest, LoginRequest, LoginResponse, MessageResponse,
        RegisterRequest, RegisterResponse, SetPinRequest,
    },
    state::AppState,
    storage::{LedgerDatabase, UserRecord, UserRepository, WalletRecord},
};

fn password_rule() -> String {
    format!("Password must be {MIN_PASSWORD_CHARS}-{MAX_PASSWORD_CHARS} characters")
}

/// Check `pin` against the user's stored PIN hash. Blocking.
///
/// # Errors
/// - 400 if the user has not set a PIN yet
pub(crate) fn verify_pin(ledger: &LedgerDatabase, user_id: u64, pin: &str) -> Result<bool, ApiError> {
    let account = UserRepository::new(ledger).get(user_id)?;
    match account.pin_hash.as_deref() {
        Some(hash) => Ok(verify_secret(pin, hash)?),
        None => Err(ApiError::bad_request("Set a PIN first")),
    }
}

/// Create an account with an empty profile and a zero-balance wallet.
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let email =
        normalize_email(&request.email).ok_or_else(|| ApiError::bad_request("Invalid email"))?;
    if !is_valid_password(&request.password) {
        return Err(ApiError::bad_request(password_rule()));
    }

    let directory = state.directory.clone();
    let (user, wallet) = run_blocking(move || -> Result<(UserRecord, WalletRecord), ApiError> {
        let password_hash = hash_secret(&request.password)?;
        Ok(directory.register_user(&email, &password_hash)?)
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id: user.user_id,
            wallet_id: wallet.wallet_id,
        }),
    ))
}

/// Exchange email and password for a bearer token.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AuthError> {
    let email = normalize_email(&request.email).ok_or(AuthError::InvalidCredentials)?;

    let ledger = Arc::clone(&state.ledger);
    let user = run_blocking(move || -> Result<UserRecord, AuthError> {
        let user = UserRepository::new(&ledger)
            .find_by_email(&email)
            .map_err(|e| AuthError::InternalError(e.to_string()))?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_secret(&request.password, &user.password_hash)? {
            tracing::debug!(user_id = user.user_id, "Login rejected");
            return Err(AuthError::InvalidCredentials);
        }
        Ok(user)
    })
    .await?;

    let issued = state.tokens.issue(user.user_id)?;
    tracing::info!(user_id = user.user_id, "User logged in");

    Ok(Json(LoginResponse {
        token: issued.token,
        token_type: "Bearer".to_string(),
        expires_at: issued.expires_at,
        user_id: user.user_id,
        pin_set: user.pin_hash.is_some(),
    }))
}

/// Revoke the presented token until it expires.
pub async fn logout(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.sessions.revoke(&user.token, user.expires_at)?;
    tracing::info!(user_id = user.user_id, "User logged out");
    Ok(Json(MessageResponse::new("Logged out")))
}

/// Set the transfer PIN, or change it when one exists.
pub async fn set_pin(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<SetPinRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if !is_valid_pin(&request.new_pin) {
        return Err(ApiError::bad_request(format!("PIN must be {PIN_LENGTH} digits")));
    }

    let ledger = Arc::clone(&state.ledger);
    let user_id = user.user_id;
    run_blocking(move || -> Result<(), ApiError> {
        let repo = UserRepository::new(&ledger);
        let account = repo.get(user_id)?;

        if let Some(current_hash) = account.pin_hash.as_deref() {
            let old_pin = request
                .old_pin
                .as_deref()
                .ok_or_else(|| ApiError::bad_request("Current PIN is required"))?;
            if !verify_secret(old_pin, current_hash)? {
                return Err(ApiError::bad_request("Current PIN is incorrect"));
            }
        }

        let pin_hash = hash_secret(&request.new_pin)?;
        Ok(repo.set_pin_hash(user_id, &pin_hash)?)
    })
    .await?;
    tracing::info!(user_id, "PIN updated");

    Ok(Json(MessageResponse::new("PIN updated")))
}

/// Check a PIN without doing anything else, e.g. before confirming a payment.
pub async fn confirm_pin(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<ConfirmPinRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let ledger = Arc::clone(&state.ledger);
    let user_id = user.user_id;
    let verified = run_blocking(move || verify_pin(&ledger, user_id, &request.pin)).await?;

    if !verified {
        tracing::debug!(user_id, "PIN confirmation rejected");
        return Err(ApiError::unauthorized("Invalid PIN"));
    }
    Ok(Json(MessageResponse::new("PIN verified")))
}

/// Change the account password.
pub async fn change_password(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let ledger = Arc::clone(&state.ledger);
    let user_id = user.user_id;
    run_blocking(move || -> Result<(), ApiError> {
        let repo = UserRepository::new(&ledger);
        let account = repo.get(user_id)?;

        if !verify_secret(&request.old_password, &account.password_hash)? {
            return Err(ApiError::bad_request("Current password is incorrect"));
        }
        if !is_valid_password(&request.new_password) {
            return Err(ApiError::bad_request(password_rule()));
        }

        let password_hash = hash_secret(&request.new_password)?;
        Ok(repo.set_password_hash(user_id, &password_hash)?)
    })
    .await?;
    tracing::info!(user_id, "Password changed");

    Ok(Json(MessageResponse::new("Password updated")))
}
