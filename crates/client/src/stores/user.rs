//! Current-user store.
//!
//! The last logged-in username is remembered in durable storage; on startup
//! the store resolves it through the FileManager. No remembered name means no
//! auto-login.

use std::future::Future;
use std::sync::Arc;

use compass_domain::User;
use serde_json::Value;
use tokio::sync::Mutex;

use super::notifications::Notifier;
use super::resource::{FetchOutcome, Resource, ResourceState};
use crate::infrastructure::ports::{
    storage_keys, ClockPort, FileManager, FileManagerError, StorageProvider,
};

const STORE: &str = "user";

pub struct UserStore {
    current: Resource<Option<User>>,
    file_manager: Arc<dyn FileManager>,
    storage: Arc<dyn StorageProvider>,
    clock: Arc<dyn ClockPort>,
    notifier: Notifier,
    /// Held from reading the current user until its write is persisted.
    writes: Mutex<()>,
}

impl UserStore {
    pub fn new(
        file_manager: Arc<dyn FileManager>,
        storage: Arc<dyn StorageProvider>,
        clock: Arc<dyn ClockPort>,
        notifier: Notifier,
    ) -> Self {
        let remembered = storage.load(storage_keys::LAST_LOGGED_IN_USERNAME).is_some();
        Self {
            current: Resource::new(STORE, None, remembered, notifier.clone()),
            file_manager,
            storage,
            clock,
            notifier,
            writes: Mutex::new(()),
        }
    }

    pub fn current_user(&self) -> Option<User> {
        self.current.data()
    }

    pub fn state(&self) -> ResourceState<Option<User>> {
        self.current.snapshot()
    }

    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<ResourceState<Option<User>>> {
        self.current.subscribe()
    }

    pub fn remembered_username(&self) -> Option<String> {
        self.storage.load(storage_keys::LAST_LOGGED_IN_USERNAME)
    }

    /// Resolve the remembered user once. Repeated calls are no-ops while a
    /// lookup is running or after it has landed.
    pub async fn hydrate(&self) -> FetchOutcome {
        let Some(username) = self.remembered_username() else {
            return FetchOutcome::Skipped;
        };
        self.current.ensure_loaded(self.lookup(username)).await
    }

    /// Re-read the remembered user, replacing whatever is loaded.
    pub async fn refresh(&self) -> FetchOutcome {
        let Some(username) = self.remembered_username() else {
            return FetchOutcome::Skipped;
        };
        self.current.fetch(self.lookup(username)).await
    }

    /// Log in as `user`, or log out with `None`.
    ///
    /// Logging in persists the user when the FileManager supports writes.
    /// The user becomes current even if the write fails; the failure is
    /// published as a notification.
    pub async fn set_current_user(&self, user: Option<User>) {
        let _writes = self.writes.lock().await;
        match user {
            None => {
                self.storage.remove(storage_keys::LAST_LOGGED_IN_USERNAME);
                self.current.replace(None);
                tracing::info!("Logged out");
            }
            Some(user) => {
                self.storage
                    .save(storage_keys::LAST_LOGGED_IN_USERNAME, &user.username);
                self.current.replace(Some(user.clone()));
                tracing::info!(username = %user.username, "Current user set");
                self.persist(&user).await;
            }
        }
    }

    /// Set one preference on the current user and persist it.
    pub async fn update_preferences(&self, key: &str, value: Value) {
        let _writes = self.writes.lock().await;
        let Some(mut user) = self.current_user() else {
            tracing::warn!(key, "No current user to update preferences for");
            return;
        };
        user.set_preference(key, value, self.clock.now());
        self.current.replace(Some(user.clone()));
        self.persist(&user).await;
    }

    /// Mark the current user as having finished onboarding.
    pub async fn mark_onboarded(&self) {
        let _writes = self.writes.lock().await;
        let Some(mut user) = self.current_user() else {
            return;
        };
        if user.onboarded {
            return;
        }
        user.mark_onboarded(self.clock.now());
        self.current.replace(Some(user.clone()));
        self.persist(&user).await;
    }

    fn lookup(
        &self,
        username: String,
    ) -> impl Future<Output = Result<Option<User>, FileManagerError>> + Send + 'static {
        let file_manager = Arc::clone(&self.file_manager);
        async move {
            let user = file_manager.get_user(&username).await?;
            if user.is_none() {
                tracing::debug!(username = %username, "Remembered user not found");
            }
            Ok(user)
        }
    }

    async fn persist(&self, user: &User) {
        match self.file_manager.save_user(user).await {
            Ok(()) => {}
            Err(e) if e.is_unsupported() => {
                tracing::debug!(username = %user.username, "File manager cannot save users");
            }
            Err(e) => {
                tracing::error!(username = %user.username, error = %e, "Failed to save user");
                self.notifier.error(STORE, e.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::{FixedClock, SystemClock};
    use crate::infrastructure::file_manager::{InMemoryFileManager, SEED_USERNAME};
    use crate::infrastructure::ports::{MockClockPort, MockFileManager};
    use crate::infrastructure::storage::MemoryStorageProvider;
    use crate::stores::resource::LoadStatus;
    use chrono::{TimeZone, Utc};

    fn store_with(
        file_manager: Arc<dyn FileManager>,
        storage: &MemoryStorageProvider,
    ) -> UserStore {
        UserStore::new(
            file_manager,
            Arc::new(storage.clone()),
            Arc::new(SystemClock),
            Notifier::new(),
        )
    }

    #[tokio::test]
    async fn logging_out_removes_the_remembered_username() {
        let storage = MemoryStorageProvider::new();
        let fm: Arc<dyn FileManager> = Arc::new(InMemoryFileManager::new(Arc::new(SystemClock)));
        let store = store_with(fm.clone(), &storage);
        let user = fm.get_user(SEED_USERNAME).await.unwrap();
        store.set_current_user(user).await;

        store.set_current_user(None).await;

        assert_eq!(storage.load(storage_keys::LAST_LOGGED_IN_USERNAME), None);
        assert_eq!(store.current_user(), None);
    }

    #[tokio::test]
    async fn fresh_store_rehydrates_the_remembered_user() {
        let storage = MemoryStorageProvider::new();
        let fm: Arc<dyn FileManager> = Arc::new(InMemoryFileManager::new(Arc::new(SystemClock)));
        let user = fm.get_user(SEED_USERNAME).await.unwrap().expect("seeded");

        store_with(fm.clone(), &storage)
            .set_current_user(Some(user.clone()))
            .await;
        assert_eq!(
            storage.load(storage_keys::LAST_LOGGED_IN_USERNAME).as_deref(),
            Some(SEED_USERNAME)
        );

        let fresh = store_with(fm, &storage);
        assert_eq!(fresh.state().status(), LoadStatus::Loading);
        assert!(fresh.hydrate().await.is_applied());
        assert_eq!(fresh.current_user(), Some(user));
        assert!(!fresh.state().loading);
    }

    #[tokio::test]
    async fn no_remembered_username_means_no_lookup() {
        let mut fm = MockFileManager::new();
        fm.expect_get_user().never();
        let store = store_with(Arc::new(fm), &MemoryStorageProvider::new());

        assert_eq!(store.state().status(), LoadStatus::Idle);
        assert_eq!(store.hydrate().await, FetchOutcome::Skipped);
        assert_eq!(store.current_user(), None);
    }

    #[tokio::test]
    async fn hydrate_runs_the_lookup_once() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let user = User::new("megan", now).unwrap();
        let returned = user.clone();

        let mut fm = MockFileManager::new();
        fm.expect_get_user()
            .withf(|username| username == "megan")
            .times(1)
            .returning(move |_| Ok(Some(returned.clone())));

        let storage = MemoryStorageProvider::new();
        storage.save(storage_keys::LAST_LOGGED_IN_USERNAME, "megan");
        let store = store_with(Arc::new(fm), &storage);

        assert!(store.hydrate().await.is_applied());
        assert_eq!(store.hydrate().await, FetchOutcome::Skipped);
        assert_eq!(store.current_user(), Some(user));
    }

    #[tokio::test]
    async fn lookup_failure_is_recorded_not_raised() {
        let mut fm = MockFileManager::new();
        fm.expect_get_user()
            .returning(|_| Err(FileManagerError::corrupted("get_user", "not a database")));

        let storage = MemoryStorageProvider::new();
        storage.save(storage_keys::LAST_LOGGED_IN_USERNAME, "megan");
        let notifier = Notifier::new();
        let mut notifications = notifier.subscribe();
        let store = UserStore::new(
            Arc::new(fm),
            Arc::new(storage),
            Arc::new(SystemClock),
            notifier,
        );

        assert!(matches!(store.hydrate().await, FetchOutcome::Failed(_)));
        let state = store.state();
        assert!(!state.loading);
        assert!(matches!(state.error, Some(FileManagerError::Corrupted { .. })));
        assert_eq!(notifications.recv().await.unwrap().source, STORE);
    }

    #[tokio::test]
    async fn preference_updates_are_stamped_and_saved() {
        let created = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap();

        let mut clock = MockClockPort::new();
        clock.expect_now().return_const(later);

        let mut fm = MockFileManager::new();
        fm.expect_save_user().times(2).returning(|_| Ok(()));

        let store = UserStore::new(
            Arc::new(fm),
            Arc::new(MemoryStorageProvider::new()),
            Arc::new(clock),
            Notifier::new(),
        );
        store
            .set_current_user(Some(User::new("megan", created).unwrap()))
            .await;
        store.update_preferences("theme", Value::from("dark")).await;

        let user = store.current_user().expect("current user");
        assert_eq!(user.preference("theme"), Some(&Value::from("dark")));
        assert_eq!(user.details.updated_at(), later);
    }

    #[tokio::test]
    async fn unsupported_saves_still_log_in() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let storage = MemoryStorageProvider::new();
        let store = UserStore::new(
            Arc::new(crate::infrastructure::file_manager::LocalFileManager),
            Arc::new(storage.clone()),
            Arc::new(FixedClock(now)),
            Notifier::new(),
        );

        store
            .set_current_user(Some(User::new("megan", now).unwrap()))
            .await;

        assert_eq!(store.current_user().map(|u| u.username), Some("megan".into()));
        assert_eq!(
            storage.load(storage_keys::LAST_LOGGED_IN_USERNAME).as_deref(),
            Some("megan")
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_preference_updates_are_all_kept() {
        let fm: Arc<dyn FileManager> = Arc::new(InMemoryFileManager::new(Arc::new(SystemClock)));
        let store = Arc::new(store_with(fm.clone(), &MemoryStorageProvider::new()));
        let user = fm.get_user(SEED_USERNAME).await.unwrap();
        store.set_current_user(user).await;

        let updates: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store.update_preferences(&format!("pref{i}"), Value::from(i)).await;
                })
            })
            .collect();
        let onboarding = tokio::spawn({
            let store = store.clone();
            async move { store.mark_onboarded().await }
        });
        for update in updates {
            update.await.unwrap();
        }
        onboarding.await.unwrap();

        let current = store.current_user().expect("current user");
        let saved = fm.get_user(SEED_USERNAME).await.unwrap().expect("saved");
        for user in [&current, &saved] {
            assert!(user.onboarded);
            for i in 0..16 {
                assert_eq!(user.preference(&format!("pref{i}")), Some(&Value::from(i)));
            }
        }
    }
}
