//! Per-key async locks.
//!
//! Writers to the same logical record (one user, one asset path) queue behind
//! each other while writers to different records proceed independently.

use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

pub struct KeyedLocks<K> {
    locks: DashMap<K, Arc<Mutex<()>>>,
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    /// Wait for exclusive access to `key`. Released when the guard drops.
    pub async fn lock(&self, key: &K) -> KeyedLockGuard<'_, K> {
        // Clone the Arc out so the map shard is not held across the await.
        let mutex = self.locks.entry(key.clone()).or_default().clone();
        let guard = mutex.lock_owned().await;
        KeyedLockGuard {
            locks: &self.locks,
            key: key.clone(),
            guard: Some(guard),
        }
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Exclusive access to one key. The entry is dropped from the registry once
/// no other task holds or waits on it.
pub struct KeyedLockGuard<'a, K>
where
    K: Eq + Hash,
{
    locks: &'a DashMap<K, Arc<Mutex<()>>>,
    key: K,
    guard: Option<OwnedMutexGuard<()>>,
}

impl<K> Drop for KeyedLockGuard<'_, K>
where
    K: Eq + Hash,
{
    fn drop(&mut self) {
        self.guard.take();
        // Waiters hold a clone of the Arc, so a count of one means only the map does.
        self.locks
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

impl<K> Default for KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_key_is_exclusive() {
        let locks = KeyedLocks::new();
        let guard = locks.lock(&"megan").await;

        let blocked = tokio::time::timeout(Duration::from_millis(20), locks.lock(&"megan")).await;
        assert!(blocked.is_err());

        drop(guard);
        let reacquired = tokio::time::timeout(Duration::from_millis(20), locks.lock(&"megan")).await;
        assert!(reacquired.is_ok());
    }

    #[tokio::test]
    async fn different_keys_do_not_block() {
        let locks = KeyedLocks::new();
        let _megan = locks.lock(&"megan").await;

        let other = tokio::time::timeout(Duration::from_millis(20), locks.lock(&"ash")).await;
        assert!(other.is_ok());
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn released_keys_leave_the_registry() {
        let locks = KeyedLocks::new();
        drop(locks.lock(&"megan").await);
        assert!(locks.is_empty());

        let first = locks.lock(&"ash").await;
        let waiter = locks.lock(&"ash");
        tokio::pin!(waiter);
        assert!(tokio::time::timeout(Duration::from_millis(20), &mut waiter)
            .await
            .is_err());
        drop(first);
        assert_eq!(locks.len(), 1);

        drop(waiter.await);
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn many_keys_do_not_accumulate() {
        let locks = Arc::new(KeyedLocks::new());
        let tasks: Vec<_> = (0..64)
            .map(|i| {
                let locks = locks.clone();
                tokio::spawn(async move {
                    let _guard = locks.lock(&(i % 8)).await;
                    tokio::task::yield_now().await;
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }
        assert!(locks.is_empty());
    }
}
