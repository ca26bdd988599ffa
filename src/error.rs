// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::AuthError;
use crate::cache::CacheError;
use crate::directory::DirectoryError;
use crate::engine::{TopUpError, TransferError};
use crate::storage::LedgerError;

const INTERNAL_MESSAGE: &str = "Internal server error";

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    /// Log the cause and return an opaque 500.
    pub fn internal(cause: impl std::fmt::Display) -> Self {
        tracing::error!(error = %cause, "Internal error");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NotFound(what) => Self::not_found(format!("{what} not found")),
            LedgerError::AlreadyExists(what) => Self::conflict(format!("{what} already exists")),
            other => Self::internal(other),
        }
    }
}

impl From<TransferError> for ApiError {
    fn from(err: TransferError) -> Self {
        match err {
            TransferError::InvalidAmount
            | TransferError::InvalidPin
            | TransferError::InvalidIdempotencyKey
            | TransferError::SelfTransfer
            | TransferError::InsufficientBalance => Self::bad_request(err.to_string()),
            TransferError::WalletNotFound => Self::not_found(err.to_string()),
            TransferError::DuplicateRequest { .. } => Self::conflict(err.to_string()),
            TransferError::Timeout => Self::new(StatusCode::GATEWAY_TIMEOUT, err.to_string()),
            TransferError::Ledger(_) | TransferError::Worker(_) => Self::internal(err),
        }
    }
}

impl From<TopUpError> for ApiError {
    fn from(err: TopUpError) -> Self {
        match err {
            TopUpError::InvalidAmount
            | TopUpError::UnknownPaymentMethod
            | TopUpError::BalanceOverflow => Self::bad_request(err.to_string()),
            TopUpError::WalletNotFound => Self::not_found(err.to_string()),
            TopUpError::Ledger(_) => Self::internal(err),
        }
    }
}

impl From<DirectoryError> for ApiError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::InvalidPage | DirectoryError::InvalidPageSize => {
                Self::bad_request(err.to_string())
            }
            DirectoryError::UserNotFound => Self::not_found(err.to_string()),
            DirectoryError::EmailTaken => Self::conflict(err.to_string()),
            DirectoryError::Ledger(_) => Self::internal(err),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InternalError(_) => Self::internal(err),
            other => Self::unauthorized(other.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::internal(format!("blocking task failed: {err}"))
    }
}

impl From<CacheError> for ApiError {
    fn from(err: CacheError) -> Self {
        tracing::error!(error = %err, "Cache write failed");
        Self::service_unavailable("Session store unavailable, try again")
    }
}
