// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User account and profile repository.
//!
//! A user account is created together with an empty profile and a
//! zero-balance wallet in one write transaction, so no user ever exists
//! without a wallet.

use chrono::{DateTime, Utc};
use redb::ReadableTable;
use serde::{Deserialize, Serialize};

use super::super::ledger::{
    insert_row, next_id, read_row, update_row, LedgerDatabase, LedgerError, LedgerResult,
    PROFILES, SEQUENCES, SEQ_USERS, SEQ_WALLETS, USERS, USER_EMAILS, WALLETS, WALLET_OWNERS,
};
use super::wallets::WalletRecord;

/// Stored user account (credentials live here, never in the profile).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: u64,
    /// Normalized (NFKC, lowercase) email address
    pub email: String,
    /// Argon2 PHC string
    pub password_hash: String,
    /// Argon2 PHC string of the transfer PIN, once set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Directory-visible profile fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub user_id: u64,
    pub fullname: Option<String>,
    pub phone: Option<String>,
    /// Avatar reference (URL or object key)
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProfileRecord {
    /// Case-insensitive substring match against name and phone.
    ///
    /// `needle` must already be lowercase. Absent fields never match, so a
    /// profile with neither name nor phone is invisible to every search.
    pub fn matches(&self, needle: &str) -> bool {
        let hit = |field: &Option<String>| {
            field
                .as_deref()
                .is_some_and(|value| value.to_lowercase().contains(needle))
        };
        hit(&self.fullname) || hit(&self.phone)
    }
}

/// Partial profile update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub fullname: Option<String>,
    pub phone: Option<String>,
    pub avatar: Option<String>,
    /// New normalized email (stored on the account, not the profile)
    pub email: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.fullname.is_none() && self.phone.is_none() && self.avatar.is_none() && self.email.is_none()
    }
}

/// Repository for user accounts and profiles.
pub struct UserRepository<'a> {
    db: &'a LedgerDatabase,
}

impl<'a> UserRepository<'a> {
    pub fn new(db: &'a LedgerDatabase) -> Self {
        Self { db }
    }

    /// Create a user, its empty profile and its wallet atomically.
    ///
    /// # Errors
    /// - `LedgerError::AlreadyExists` if the email is taken
    pub fn create_account(
        &self,
        email: &str,
        password_hash: &str,
    ) -> LedgerResult<(UserRecord, WalletRecord)> {
        let now = Utc::now();
        let write_txn = self.db.begin_write()?;
        let created = {
            let mut emails = write_txn.open_table(USER_EMAILS)?;
            if emails.get(email)?.is_some() {
                return Err(LedgerError::AlreadyExists(format!("User {email}")));
            }

            let mut sequences = write_txn.open_table(SEQUENCES)?;
            let user_id = next_id(&mut sequences, SEQ_USERS)?;
            let wallet_id = next_id(&mut sequences, SEQ_WALLETS)?;

            let user = UserRecord {
                user_id,
                email: email.to_string(),
                password_hash: password_hash.to_string(),
                pin_hash: None,
                created_at: now,
                updated_at: now,
            };
            let profile = ProfileRecord {
                user_id,
                fullname: None,
                phone: None,
                avatar: None,
                created_at: now,
                updated_at: now,
            };
            let wallet = WalletRecord {
                wallet_id,
                user_id,
                balance: 0,
                created_at: now,
                updated_at: now,
            };

            insert_row(&mut write_txn.open_table(USERS)?, user_id, &user)?;
            insert_row(&mut write_txn.open_table(PROFILES)?, user_id, &profile)?;
            insert_row(&mut write_txn.open_table(WALLETS)?, wallet_id, &wallet)?;
            write_txn.open_table(WALLET_OWNERS)?.insert(user_id, wallet_id)?;
            emails.insert(email, user_id)?;

            (user, wallet)
        };
        write_txn.commit()?;
        Ok(created)
    }

    /// Look up a user by normalized email.
    pub fn find_by_email(&self, email: &str) -> LedgerResult<Option<UserRecord>> {
        let read_txn = self.db.begin_read()?;
        let emails = read_txn.open_table(USER_EMAILS)?;
        let Some(user_id) = emails.get(email)?.map(|v| v.value()) else {
            return Ok(None);
        };
        let users = read_txn.open_table(USERS)?;
        read_row(&users, user_id)
    }

    /// Get a user by id.
    pub fn get(&self, user_id: u64) -> LedgerResult<UserRecord> {
        let read_txn = self.db.begin_read()?;
        let users = read_txn.open_table(USERS)?;
        read_row(&users, user_id)?.ok_or_else(|| LedgerError::NotFound(format!("User {user_id}")))
    }

    /// Replace the password hash.
    pub fn set_password_hash(&self, user_id: u64, password_hash: &str) -> LedgerResult<()> {
        self.modify_user(user_id, |user| user.password_hash = password_hash.to_string())
    }

    /// Replace (or set for the first time) the PIN hash.
    pub fn set_pin_hash(&self, user_id: u64, pin_hash: &str) -> LedgerResult<()> {
        self.modify_user(user_id, |user| user.pin_hash = Some(pin_hash.to_string()))
    }

    fn modify_user(&self, user_id: u64, apply: impl FnOnce(&mut UserRecord)) -> LedgerResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut users = write_txn.open_table(USERS)?;
            let mut user: UserRecord = read_row(&users, user_id)?
                .ok_or_else(|| LedgerError::NotFound(format!("User {user_id}")))?;
            apply(&mut user);
            user.updated_at = Utc::now();
            update_row(&mut users, user_id, &user)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Get a user's profile.
    pub fn get_profile(&self, user_id: u64) -> LedgerResult<ProfileRecord> {
        let read_txn = self.db.begin_read()?;
        let profiles = read_txn.open_table(PROFILES)?;
        read_row(&profiles, user_id)?
            .ok_or_else(|| LedgerError::NotFound(format!("Profile {user_id}")))
    }

    /// Apply a partial profile update (and optional email change) atomically.
    ///
    /// # Errors
    /// - `LedgerError::NotFound` if the user does not exist
    /// - `LedgerError::AlreadyExists` if the new email belongs to another user
    pub fn update_profile(&self, user_id: u64, update: &ProfileUpdate) -> LedgerResult<ProfileRecord> {
        let now = Utc::now();
        let write_txn = self.db.begin_write()?;
        let profile = {
            if let Some(new_email) = update.email.as_deref() {
                let mut users = write_txn.open_table(USERS)?;
                let mut emails = write_txn.open_table(USER_EMAILS)?;
                let mut user: UserRecord = read_row(&users, user_id)?
                    .ok_or_else(|| LedgerError::NotFound(format!("User {user_id}")))?;

                if user.email != new_email {
                    let owner = emails.get(new_email)?.map(|v| v.value());
                    if owner.is_some_and(|owner| owner != user_id) {
                        return Err(LedgerError::AlreadyExists(format!("User {new_email}")));
                    }
                    emails.remove(user.email.as_str())?;
                    emails.insert(new_email, user_id)?;
                    user.email = new_email.to_string();
                    user.updated_at = now;
                    update_row(&mut users, user_id, &user)?;
                }
            }

            let mut profiles = write_txn.open_table(PROFILES)?;
            let mut profile: ProfileRecord = read_row(&profiles, user_id)?
                .ok_or_else(|| LedgerError::NotFound(format!("Profile {user_id}")))?;
            if let Some(fullname) = &update.fullname {
                profile.fullname = Some(fullname.clone());
            }
            if let Some(phone) = &update.phone {
                profile.phone = Some(phone.clone());
            }
            if let Some(avatar) = &update.avatar {
                profile.avatar = Some(avatar.clone());
            }
            profile.updated_at = now;
            update_row(&mut profiles, user_id, &profile)?;
            profile
        };
        write_txn.commit()?;
        Ok(profile)
    }

    /// Remove the avatar reference from a profile. Clearing an absent avatar
    /// is not an error.
    pub fn clear_avatar(&self, user_id: u64) -> LedgerResult<ProfileRecord> {
        let write_txn = self.db.begin_write()?;
        let profile = {
            let mut profiles = write_txn.open_table(PROFILES)?;
            let mut profile: ProfileRecord = read_row(&profiles, user_id)?
                .ok_or_else(|| LedgerError::NotFound(format!("Profile {user_id}")))?;
            profile.avatar = None;
            profile.updated_at = Utc::now();
            update_row(&mut profiles, user_id, &profile)?;
            profile
        };
        write_txn.commit()?;
        Ok(profile)
    }

    /// Search profiles by name or phone.
    ///
    /// Results are ordered by ascending user id so pagination is stable.
    /// Returns `(page, total_matches)`.
    pub fn search_profiles(
        &self,
        query: &str,
        offset: usize,
        limit: usize,
    ) -> LedgerResult<(Vec<ProfileRecord>, usize)> {
        let needle = query.to_lowercase();
        let read_txn = self.db.begin_read()?;
        let profiles = read_txn.open_table(PROFILES)?;

        let mut page = Vec::with_capacity(limit);
        let mut total = 0usize;
        for entry in profiles.iter()? {
            let (_, value) = entry?;
            let profile: ProfileRecord = serde_json::from_slice(value.value())?;
            if !profile.matches(&needle) {
                continue;
            }
            if total >= offset && page.len() < limit {
                page.push(profile);
            }
            total += 1;
        }

        Ok((page, total))
    }
}
