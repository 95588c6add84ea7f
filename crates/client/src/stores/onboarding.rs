//! Onboarding flags.
//!
//! Two separate records:
//! - [`OnboardingSeenStore`]: whether the intro was already shown to a user
//!   (synchronous, one durable set for all users)
//! - [`OnboardingTracker`]: whether a user finished onboarding (one durable
//!   key per user, read asynchronously)

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use compass_domain::UserId;
use tokio::sync::watch;

use crate::infrastructure::locks::KeyedLocks;
use crate::infrastructure::ports::{load_json, save_json, storage_keys, StorageProvider};

pub struct OnboardingSeenStore {
    seen: RwLock<BTreeSet<UserId>>,
    storage: Arc<dyn StorageProvider>,
}

impl OnboardingSeenStore {
    pub fn new(storage: Arc<dyn StorageProvider>) -> Self {
        let seen = load_json(storage.as_ref(), storage_keys::ONBOARDING_SEEN).unwrap_or_default();
        Self {
            seen: RwLock::new(seen),
            storage,
        }
    }

    pub fn has_seen(&self, user_id: UserId) -> bool {
        self.seen
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&user_id)
    }

    pub fn mark_seen(&self, user_id: UserId) {
        self.update(|seen| seen.insert(user_id));
    }

    pub fn reset(&self, user_id: UserId) {
        self.update(|seen| seen.remove(&user_id));
    }

    fn update(&self, change: impl FnOnce(&mut BTreeSet<UserId>) -> bool) {
        let mut seen = self.seen.write().unwrap_or_else(PoisonError::into_inner);
        if change(&mut seen) {
            save_json(self.storage.as_ref(), storage_keys::ONBOARDING_SEEN, &*seen);
        }
    }
}

const COMPLETED: &str = "true";

/// Per-user onboarding completion.
///
/// Calls for the same user are serialized; calls for different users never
/// wait on each other. Storage I/O runs on the blocking pool.
pub struct OnboardingTracker {
    storage: Arc<dyn StorageProvider>,
    locks: KeyedLocks<UserId>,
}

impl OnboardingTracker {
    pub fn new(storage: Arc<dyn StorageProvider>) -> Self {
        Self {
            storage,
            locks: KeyedLocks::new(),
        }
    }

    pub async fn has_completed(&self, user_id: UserId) -> bool {
        let _guard = self.locks.lock(&user_id).await;
        self.with_storage(user_id, false, move |storage, key| {
            storage.load(&key).as_deref() == Some(COMPLETED)
        })
        .await
    }

    pub async fn set_completed(&self, user_id: UserId) {
        let _guard = self.locks.lock(&user_id).await;
        self.with_storage(user_id, (), |storage, key| storage.save(&key, COMPLETED))
            .await;
        tracing::debug!(user_id = %user_id, "Onboarding completed");
    }

    pub async fn clear(&self, user_id: UserId) {
        let _guard = self.locks.lock(&user_id).await;
        self.with_storage(user_id, (), |storage, key| storage.remove(&key))
            .await;
    }

    async fn with_storage<R, F>(&self, user_id: UserId, fallback: R, op: F) -> R
    where
        R: Send + 'static,
        F: FnOnce(&dyn StorageProvider, String) -> R + Send + 'static,
    {
        let storage = Arc::clone(&self.storage);
        let key = storage_keys::onboarding_completed(user_id);
        match tokio::task::spawn_blocking(move || op(storage.as_ref(), key)).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(user_id = %user_id, error = %e, "Onboarding storage task failed");
                fallback
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OnboardingView {
    pub user_id: Option<UserId>,
    /// `None` while the lookup for `user_id` is pending.
    pub completed: Option<bool>,
}

/// Completion flag for whichever user is currently being viewed.
///
/// Switching subjects starts a new lookup; a lookup that resolves after the
/// subject changed is ignored.
pub struct OnboardingStatus {
    tracker: Arc<OnboardingTracker>,
    view: watch::Sender<OnboardingView>,
    generation: AtomicU64,
}

impl OnboardingStatus {
    pub fn new(tracker: Arc<OnboardingTracker>) -> Self {
        let (view, _) = watch::channel(OnboardingView::default());
        Self {
            tracker,
            view,
            generation: AtomicU64::new(0),
        }
    }

    pub fn view(&self) -> OnboardingView {
        *self.view.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<OnboardingView> {
        self.view.subscribe()
    }

    /// Point the view at `user_id` and resolve its flag. Returns whether
    /// this lookup's result was applied.
    pub async fn watch_user(&self, user_id: Option<UserId>) -> bool {
        let mut generation = 0;
        self.view.send_modify(|view| {
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *view = OnboardingView {
                user_id,
                completed: None,
            };
        });
        let Some(id) = user_id else {
            return true;
        };

        let completed = self.tracker.has_completed(id).await;
        self.apply(generation, id, completed)
    }

    /// Mark the viewed user complete and reflect it immediately.
    pub async fn complete_current(&self) {
        let Some(id) = self.view().user_id else {
            return;
        };
        self.tracker.set_completed(id).await;
        self.view.send_if_modified(|view| {
            if view.user_id != Some(id) {
                return false;
            }
            // Lookups still running for this user may have read the old flag.
            self.generation.fetch_add(1, Ordering::SeqCst);
            view.completed = Some(true);
            true
        });
    }

    fn apply(&self, generation: u64, user_id: UserId, completed: bool) -> bool {
        self.view.send_if_modified(|view| {
            if self.generation.load(Ordering::SeqCst) != generation || view.user_id != Some(user_id)
            {
                tracing::debug!(user_id = %user_id, "Discarding onboarding lookup for previous user");
                return false;
            }
            view.completed = Some(completed);
            true
        })
    }
}
