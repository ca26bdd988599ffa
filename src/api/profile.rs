// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The caller's own profile.

use axum::{extract::State, Json};

use super::run_blocking;
use crate::{
    auth::{hashing::normalize_email, Auth},
    directory::ProfileSnapshot,
    error::ApiError,
    models::UpdateProfileRequest,
    state::AppState,
    storage::ProfileUpdate,
};

const MAX_FULLNAME_CHARS: usize = 100;
const MAX_AVATAR_CHARS: usize = 512;
const PHONE_DIGITS: std::ops::RangeInclusive<usize> = 6..=20;

pub async fn get_profile(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<ProfileSnapshot>, ApiError> {
    Ok(Json(state.directory.get_profile(user.user_id)?))
}

/// Update any of name, phone, avatar and email.
pub async fn update_profile(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileSnapshot>, ApiError> {
    let update = validate(request)?;
    if update.is_empty() {
        return Err(ApiError::bad_request("Nothing to update"));
    }

    let directory = state.directory.clone();
    let snapshot = run_blocking(move || -> Result<ProfileSnapshot, ApiError> {
        Ok(directory.update_profile(user.user_id, &update)?)
    })
    .await?;
    Ok(Json(snapshot))
}

/// Remove the caller's avatar.
pub async fn delete_avatar(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<ProfileSnapshot>, ApiError> {
    let directory = state.directory.clone();
    let snapshot = run_blocking(move || -> Result<ProfileSnapshot, ApiError> {
        Ok(directory.delete_avatar(user.user_id)?)
    })
    .await?;
    Ok(Json(snapshot))
}

fn validate(request: UpdateProfileRequest) -> Result<ProfileUpdate, ApiError> {
    let fullname = match request.fullname {
        Some(name) => {
            let name = name.trim().to_string();
            if name.is_empty() || name.chars().count() > MAX_FULLNAME_CHARS {
                return Err(ApiError::bad_request(format!(
                    "Full name must be 1-{MAX_FULLNAME_CHARS} characters"
                )));
            }
            Some(name)
        }
        None => None,
    };

    let phone = match request.phone {
        Some(phone) => {
            let phone = phone.trim().to_string();
            let digits = phone.chars().filter(char::is_ascii_digit).count();
            let allowed = phone
                .chars()
                .enumerate()
                .all(|(i, c)| c.is_ascii_digit() || c == '-' || c == ' ' || (i == 0 && c == '+'));
            if !allowed || !PHONE_DIGITS.contains(&digits) {
                return Err(ApiError::bad_request("Invalid phone number"));
            }
            Some(phone)
        }
        None => None,
    };

    let avatar = match request.avatar {
        Some(avatar) => {
            let avatar = avatar.trim().to_string();
            if avatar.is_empty() || avatar.chars().count() > MAX_AVATAR_CHARS {
                return Err(ApiError::bad_request("Invalid avatar reference"));
            }
            Some(avatar)
        }
        None => None,
    };

    let email = match request.email {
        Some(raw) => {
            Some(normalize_email(&raw).ok_or_else(|| ApiError::bad_request("Invalid email"))?)
        }
        None => None,
    };

    Ok(ProfileUpdate {
        fullname,
        phone,
        avatar,
        email,
    })
}
