// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User directory with cache-aside reads.
//!
//! Only the canonical request (blank query, first page, default page size)
//! is cached, under `ewallet:directory:first-page`. Profile snapshots are
//! cached per user under `ewallet:user-profile:<id>`.
//!
//! Every write that changes directory-visible data goes through this
//! manager, which drops the affected entries before returning. Cache
//! failures are logged and never fail a read or a write.
//!
//! Invalidations bump a generation counter. A reader only caches the first
//! page if no invalidation ran between its store query and its cache write,
//! so a page read before an update is never written back after it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::{CacheSlot, CacheStore};
use crate::storage::{
    LedgerDatabase, LedgerError, ProfileRecord, ProfileUpdate, UserRecord, UserRepository,
    WalletRecord,
};

/// Page size of the canonical (cached) directory request.
pub const DEFAULT_PAGE_SIZE: usize = 10;
/// Largest accepted page size.
pub const MAX_PAGE_SIZE: usize = 100;

const DIRECTORY_FAMILY: &str = "directory";
const FIRST_PAGE: &str = "first-page";
const PROFILE_FAMILY: &str = "user-profile";

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("page must be 1 or greater")]
    InvalidPage,

    #[error("limit must be between 1 and {MAX_PAGE_SIZE}")]
    InvalidPageSize,

    #[error("user not found")]
    UserNotFound,

    #[error("email already registered")]
    EmailTaken,

    #[error("ledger error: {0}")]
    Ledger(LedgerError),
}

impl From<LedgerError> for DirectoryError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NotFound(_) => Self::UserNotFound,
            LedgerError::AlreadyExists(_) => Self::EmailTaken,
            other => Self::Ledger(other),
        }
    }
}

/// User-visible profile fields as listed in the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub user_id: u64,
    pub fullname: Option<String>,
    pub phone: Option<String>,
    pub avatar: Option<String>,
}

impl From<ProfileRecord> for DirectoryEntry {
    fn from(profile: ProfileRecord) -> Self {
        Self {
            user_id: profile.user_id,
            fullname: profile.fullname,
            phone: profile.phone,
            avatar: profile.avatar,
        }
    }
}

/// One page of directory results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryPage {
    pub users: Vec<DirectoryEntry>,
    pub page: usize,
    pub limit: usize,
    pub total_users: usize,
    pub total_pages: usize,
}

/// Cached view of a user's own profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    pub user_id: u64,
    pub email: String,
    pub fullname: Option<String>,
    pub phone: Option<String>,
    pub avatar: Option<String>,
}

impl ProfileSnapshot {
    fn new(user: &UserRecord, profile: ProfileRecord) -> Self {
        Self {
            user_id: user.user_id,
            email: user.email.clone(),
            fullname: profile.fullname,
            phone: profile.phone,
            avatar: profile.avatar,
        }
    }
}

/// Directory cache manager.
#[derive(Clone)]
pub struct Directory {
    ledger: Arc<LedgerDatabase>,
    pages: CacheSlot<DirectoryPage>,
    profiles: CacheSlot<ProfileSnapshot>,
    /// Bumped by every first-page invalidation
    generation: Arc<AtomicU64>,
}

impl Directory {
    pub fn new(
        ledger: Arc<LedgerDatabase>,
        store: Arc<dyn CacheStore>,
        directory_ttl: Duration,
        profile_ttl: Duration,
    ) -> Self {
        Self {
            ledger,
            pages: CacheSlot::new(Arc::clone(&store), DIRECTORY_FAMILY, directory_ttl),
            profiles: CacheSlot::new(store, PROFILE_FAMILY, profile_ttl),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Search users by name or phone, ordered by ascending user id.
    pub fn find_users(
        &self,
        query: &str,
        page: usize,
        page_size: usize,
    ) -> Result<DirectoryPage, DirectoryError> {
        if page == 0 {
            return Err(DirectoryError::InvalidPage);
        }
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(DirectoryError::InvalidPageSize);
        }

        let query = query.trim();
        let canonical = query.is_empty() && page == 1 && page_size == DEFAULT_PAGE_SIZE;

        let generation = canonical.then(|| self.generation.load(Ordering::SeqCst));
        if canonical {
            match self.pages.get(FIRST_PAGE) {
                Ok(Some(cached)) => {
                    tracing::debug!("Directory first page served from cache");
                    return Ok(cached);
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "Directory cache read failed"),
            }
        }

        let offset = (page - 1).saturating_mul(page_size);
        let (profiles, total) =
            UserRepository::new(&self.ledger).search_profiles(query, offset, page_size)?;
        let result = DirectoryPage {
            users: profiles.into_iter().map(DirectoryEntry::from).collect(),
            page,
            limit: page_size,
            total_users: total,
            total_pages: total.div_ceil(page_size),
        };

        if let Some(seen) = generation {
            self.store_first_page(seen, &result);
        }
        Ok(result)
    }

    /// Create an account and drop the cached first page.
    pub fn register_user(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<(UserRecord, WalletRecord), DirectoryError> {
        let created = UserRepository::new(&self.ledger).create_account(email, password_hash)?;
        self.invalidate_first_page();
        tracing::info!(user_id = created.0.user_id, wallet_id = created.1.wallet_id, "User registered");
        Ok(created)
    }

    /// Get a user's own profile, served from the snapshot cache when warm.
    pub fn get_profile(&self, user_id: u64) -> Result<ProfileSnapshot, DirectoryError> {
        match self.profiles.get(user_id) {
            Ok(Some(snapshot)) => return Ok(snapshot),
            Ok(None) => {}
            Err(e) => tracing::warn!(user_id, error = %e, "Profile cache read failed"),
        }

        let repo = UserRepository::new(&self.ledger);
        let user = repo.get(user_id)?;
        let snapshot = ProfileSnapshot::new(&user, repo.get_profile(user_id)?);

        if let Err(e) = self.profiles.put(user_id, &snapshot) {
            tracing::warn!(user_id, error = %e, "Profile cache write failed");
        }
        Ok(snapshot)
    }

    /// Apply a profile update and drop both affected cache entries.
    pub fn update_profile(
        &self,
        user_id: u64,
        update: &ProfileUpdate,
    ) -> Result<ProfileSnapshot, DirectoryError> {
        let repo = UserRepository::new(&self.ledger);
        let profile = repo.update_profile(user_id, update)?;
        self.invalidate_first_page();
        self.invalidate_profile(user_id);

        let user = repo.get(user_id)?;
        tracing::info!(user_id, "Profile updated");
        Ok(ProfileSnapshot::new(&user, profile))
    }

    /// Remove the avatar and drop both affected cache entries.
    pub fn delete_avatar(&self, user_id: u64) -> Result<ProfileSnapshot, DirectoryError> {
        let repo = UserRepository::new(&self.ledger);
        let profile = repo.clear_avatar(user_id)?;
        self.invalidate_first_page();
        self.invalidate_profile(user_id);

        let user = repo.get(user_id)?;
        tracing::info!(user_id, "Avatar removed");
        Ok(ProfileSnapshot::new(&user, profile))
    }

    /// Cache a freshly queried first page, unless an invalidation has run
    /// since `seen` was read. The second check catches an invalidation that
    /// lands between the first check and the write.
    fn store_first_page(&self, seen: u64, page: &DirectoryPage) {
        if self.generation.load(Ordering::SeqCst) != seen {
            tracing::debug!("Directory changed during query, first page not cached");
            return;
        }
        if let Err(e) = self.pages.put(FIRST_PAGE, page) {
            tracing::warn!(error = %e, "Directory cache write failed");
            return;
        }
        if self.generation.load(Ordering::SeqCst) != seen {
            self.drop_first_page();
        }
    }

    fn invalidate_first_page(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.drop_first_page();
    }

    fn drop_first_page(&self) {
        if let Err(e) = self.pages.invalidate(FIRST_PAGE) {
            tracing::warn!(error = %e, "Directory cache invalidation failed");
        }
    }

    fn invalidate_profile(&self, user_id: u64) {
        if let Err(e) = self.profiles.invalidate(user_id) {
            tracing::warn!(user_id, error = %e, "Profile cache invalidation failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::store::testing::FailingStore;
    use crate::cache::LruCacheStore;

    const TTL: Duration = Duration::from_secs(600);

    fn setup(store: Arc<dyn CacheStore>) -> (Directory, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Arc::new(LedgerDatabase::open(&dir.path().join("ledger.redb")).unwrap());
        (Directory::new(ledger, store, TTL, TTL), dir)
    }

    fn add_user(directory: &Directory, email: &str, name: &str) -> u64 {
        let (user, _) = directory.register_user(email, "hash").unwrap();
        directory
            .update_profile(
                user.user_id,
                &ProfileUpdate {
                    fullname: Some(name.to_string()),
                    phone: Some("0812".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        user.user_id
    }

    #[test]
    fn canonical_page_is_cached_and_invalidated_by_profile_update() {
        let store = Arc::new(LruCacheStore::new(16));
        let (directory, _dir) = setup(store.clone());
        let alice = add_user(&directory, "a@example.com", "Alice");

        let first = directory.find_users("", 1, DEFAULT_PAGE_SIZE).unwrap();
        assert_eq!(first.total_users, 1);
        assert!(store.exists("ewallet:directory:first-page").unwrap());

        directory
            .update_profile(
                alice,
                &ProfileUpdate {
                    fullname: Some("Alicia".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(!store.exists("ewallet:directory:first-page").unwrap());

        let after = directory.find_users("", 1, DEFAULT_PAGE_SIZE).unwrap();
        assert_eq!(after.users[0].fullname.as_deref(), Some("Alicia"));
    }

    #[test]
    fn registration_invalidates_first_page() {
        let store = Arc::new(LruCacheStore::new(16));
        let (directory, _dir) = setup(store);
        add_user(&directory, "a@example.com", "Alice");
        assert_eq!(directory.find_users("", 1, DEFAULT_PAGE_SIZE).unwrap().total_users, 1);

        add_user(&directory, "b@example.com", "Bob");
        let page = directory.find_users("", 1, DEFAULT_PAGE_SIZE).unwrap();
        assert_eq!(page.total_users, 2);
        assert_eq!(page.total_pages, 1);
    }

    /// Store that runs a hook once, right before the first cache write.
    struct HookedStore {
        inner: LruCacheStore,
        hook: std::sync::Mutex<Option<Box<dyn FnOnce() + Send>>>,
    }

    impl CacheStore for HookedStore {
        fn get(&self, key: &str) -> crate::cache::CacheResult<Option<Vec<u8>>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> crate::cache::CacheResult<()> {
            let hook = self.hook.lock().unwrap().take();
            if let Some(hook) = hook {
                hook();
            }
            self.inner.set(key, value, ttl)
        }

        fn delete(&self, key: &str) -> crate::cache::CacheResult<()> {
            self.inner.delete(key)
        }
    }

    #[test]
    fn update_during_first_page_query_is_not_overwritten() {
        let store = Arc::new(HookedStore {
            inner: LruCacheStore::new(16),
            hook: std::sync::Mutex::new(None),
        });
        let (directory, _dir) = setup(store.clone());
        let alice = add_user(&directory, "a@example.com", "Alice");

        // The update commits and invalidates after the reader queried the
        // store but before it writes the (now stale) page.
        let writer = directory.clone();
        *store.hook.lock().unwrap() = Some(Box::new(move || {
            writer
                .update_profile(
                    alice,
                    &ProfileUpdate {
                        fullname: Some("Alicia".to_string()),
                        ..Default::default()
                    },
                )
                .unwrap();
        }));

        let raced = directory.find_users("", 1, DEFAULT_PAGE_SIZE).unwrap();
        assert_eq!(raced.users[0].fullname.as_deref(), Some("Alice"));

        let next = directory.find_users("", 1, DEFAULT_PAGE_SIZE).unwrap();
        assert_eq!(next.users[0].fullname.as_deref(), Some("Alicia"));
    }

    #[test]
    fn first_page_is_not_cached_when_invalidated_mid_query() {
        let store = Arc::new(LruCacheStore::new(16));
        let (directory, _dir) = setup(store.clone());
        add_user(&directory, "a@example.com", "Alice");

        let page = directory.find_users("", 1, DEFAULT_PAGE_SIZE).unwrap();
        store.delete("ewallet:directory:first-page").unwrap();

        let seen = directory.generation.load(Ordering::SeqCst);
        directory.invalidate_first_page();
        directory.store_first_page(seen, &page);
        assert!(!store.exists("ewallet:directory:first-page").unwrap());

        directory.store_first_page(directory.generation.load(Ordering::SeqCst), &page);
        assert!(store.exists("ewallet:directory:first-page").unwrap());
    }

    #[test]
    fn non_canonical_requests_bypass_the_cache() {
        let store = Arc::new(LruCacheStore::new(16));
        let (directory, _dir) = setup(store.clone());
        for i in 0..12 {
            add_user(&directory, &format!("u{i}@example.com"), &format!("User {i}"));
        }

        let second = directory.find_users("", 2, DEFAULT_PAGE_SIZE).unwrap();
        assert_eq!(second.users.len(), 2);
        assert_eq!(second.total_pages, 2);

        let searched = directory.find_users("user 1", 1, DEFAULT_PAGE_SIZE).unwrap();
        assert_eq!(searched.total_users, 3); // User 1, User 10, User 11

        assert!(store.is_empty());
    }

    #[test]
    fn stale_cache_is_bounded_by_invalidation_not_ttl() {
        let store = Arc::new(LruCacheStore::new(16));
        let (directory, _dir) = setup(store.clone());
        add_user(&directory, "a@example.com", "Alice");

        // Seed a stale page directly; registration must still drop it.
        let stale = DirectoryPage {
            users: vec![],
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
            total_users: 0,
            total_pages: 0,
        };
        directory.pages.put(FIRST_PAGE, &stale).unwrap();
        assert_eq!(directory.find_users("", 1, DEFAULT_PAGE_SIZE).unwrap(), stale);

        add_user(&directory, "b@example.com", "Bob");
        assert_eq!(directory.find_users("", 1, DEFAULT_PAGE_SIZE).unwrap().total_users, 2);
    }

    #[test]
    fn non_canonical_requests_ignore_a_stale_first_page() {
        let store = Arc::new(LruCacheStore::new(16));
        let (directory, _dir) = setup(store.clone());
        for i in 0..12 {
            add_user(&directory, &format!("u{i}@example.com"), &format!("User {i}"));
        }

        let stale = DirectoryPage {
            users: vec![],
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
            total_users: 0,
            total_pages: 0,
        };
        directory.pages.put(FIRST_PAGE, &stale).unwrap();
        assert_eq!(directory.find_users("", 1, DEFAULT_PAGE_SIZE).unwrap(), stale);

        let second = directory.find_users("", 2, DEFAULT_PAGE_SIZE).unwrap();
        assert_eq!(second.total_users, 12);
        assert_eq!(second.users.len(), 2);

        let searched = directory.find_users("x", 1, DEFAULT_PAGE_SIZE).unwrap();
        assert_eq!(searched.total_users, 0);
        let searched = directory.find_users("user 0", 1, DEFAULT_PAGE_SIZE).unwrap();
        assert_eq!(searched.total_users, 1);

        let wide = directory.find_users("", 1, 20).unwrap();
        assert_eq!(wide.total_users, 12);
        assert_eq!(wide.users.len(), 12);
        assert_eq!(wide.total_pages, 1);

        // The stale entry is untouched by the live queries
        assert_eq!(directory.find_users("", 1, DEFAULT_PAGE_SIZE).unwrap(), stale);
    }

    #[test]
    fn deleting_the_avatar_drops_both_cache_entries() {
        let store = Arc::new(LruCacheStore::new(16));
        let (directory, _dir) = setup(store.clone());
        let alice = add_user(&directory, "a@example.com", "Alice");
        directory
            .update_profile(
                alice,
                &ProfileUpdate {
                    avatar: Some("avatars/a.png".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        directory.find_users("", 1, DEFAULT_PAGE_SIZE).unwrap();
        directory.get_profile(alice).unwrap();
        let profile_key = format!("ewallet:user-profile:{alice}");
        assert!(store.exists("ewallet:directory:first-page").unwrap());
        assert!(store.exists(&profile_key).unwrap());

        let snapshot = directory.delete_avatar(alice).unwrap();
        assert_eq!(snapshot.avatar, None);
        assert!(!store.exists("ewallet:directory:first-page").unwrap());
        assert!(!store.exists(&profile_key).unwrap());

        let page = directory.find_users("", 1, DEFAULT_PAGE_SIZE).unwrap();
        assert_eq!(page.users[0].avatar, None);
        assert!(matches!(directory.delete_avatar(999), Err(DirectoryError::UserNotFound)));
    }

    #[test]
    fn cache_failures_never_fail_reads_or_writes() {
        let (directory, _dir) = setup(Arc::new(FailingStore));
        let alice = add_user(&directory, "a@example.com", "Alice");

        let page = directory.find_users("", 1, DEFAULT_PAGE_SIZE).unwrap();
        assert_eq!(page.total_users, 1);

        let profile = directory.get_profile(alice).unwrap();
        assert_eq!(profile.fullname.as_deref(), Some("Alice"));
    }

    #[test]
    fn profile_snapshot_is_refreshed_after_update() {
        let store = Arc::new(LruCacheStore::new(16));
        let (directory, _dir) = setup(store.clone());
        let alice = add_user(&directory, "a@example.com", "Alice");

        directory.get_profile(alice).unwrap();
        let key = format!("ewallet:user-profile:{alice}");
        assert!(store.exists(&key).unwrap());

        directory
            .update_profile(
                alice,
                &ProfileUpdate {
                    email: Some("alice@example.com".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(!store.exists(&key).unwrap());
        assert_eq!(directory.get_profile(alice).unwrap().email, "alice@example.com");
    }

    #[test]
    fn page_bounds_are_validated() {
        let (directory, _dir) = setup(Arc::new(LruCacheStore::new(4)));
        assert!(matches!(directory.find_users("", 0, 10), Err(DirectoryError::InvalidPage)));
        assert!(matches!(directory.find_users("", 1, 0), Err(DirectoryError::InvalidPageSize)));
        assert!(matches!(
            directory.find_users("", 1, MAX_PAGE_SIZE + 1),
            Err(DirectoryError::InvalidPageSize)
        ));
        assert!(matches!(directory.get_profile(42), Err(DirectoryError::UserNotFound)));
    }

    #[test]
    fn duplicate_registration_is_email_taken() {
        let (directory, _dir) = setup(Arc::new(LruCacheStore::new(4)));
        directory.register_user("a@example.com", "hash").unwrap();
        assert!(matches!(
            directory.register_user("a@example.com", "hash"),
            Err(DirectoryError::EmailTaken)
        ));
    }
}
