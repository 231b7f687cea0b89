//! QoS Volume Registry
//!
//! Maps `qos_volume_id` to the stored [`QosVolume`]. The registry is the only
//! source of truth for whether a QoS volume exists. It is not persisted.
//!
//! Read-modify-write sequences on one id must run under [`VolumeRegistry::lock`].
//! Locks are per id, so operations on different ids proceed in parallel.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::resources::QosVolume;

/// Registry of active QoS volumes.
#[derive(Debug, Default)]
pub struct VolumeRegistry {
    volumes: DashMap<String, QosVolume>,
    locks: DashMap<String, KeyLock>,
}

#[derive(Debug, Default)]
struct KeyLock {
    mutex: Arc<Mutex<()>>,
    // callers holding or waiting for `mutex`
    users: usize,
}

// Registration of one caller on a key lock. Dropping it unregisters the
// caller whether or not the lock was ever acquired.
#[derive(Debug)]
struct KeyLease<'a> {
    registry: &'a VolumeRegistry,
    key: String,
}

impl Drop for KeyLease<'_> {
    fn drop(&mut self) {
        self.registry.release(&self.key);
    }
}

/// Exclusive hold on one registry key; released on drop.
#[derive(Debug)]
pub struct KeyGuard<'a> {
    // field order matters: the mutex is unlocked before the lease is dropped
    _guard: OwnedMutexGuard<()>,
    lease: KeyLease<'a>,
}

impl KeyGuard<'_> {
    /// The key this guard holds.
    pub fn key(&self) -> &str {
        &self.lease.key
    }
}

impl VolumeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`.
    ///
    /// Cancel safe: dropping the returned future before it completes leaves
    /// no lock entry behind.
    pub async fn lock(&self, key: &str) -> KeyGuard<'_> {
        let mutex = {
            let mut entry = self.locks.entry(key.to_string()).or_default();
            entry.users += 1;
            entry.mutex.clone()
        };
        let lease = KeyLease {
            registry: self,
            key: key.to_string(),
        };
        let guard = mutex.lock_owned().await;
        KeyGuard {
            _guard: guard,
            lease,
        }
    }

    // Drop the lock entry once nobody holds or waits for it. Registration and
    // release both run under the entry's shard lock.
    fn release(&self, key: &str) {
        self.locks.remove_if_mut(key, |_, lock| {
            lock.users -= 1;
            lock.users == 0
        });
    }

    /// Get a copy of the stored volume.
    pub fn get(&self, key: &str) -> Option<QosVolume> {
        self.volumes.get(key).map(|v| v.clone())
    }

    /// Check whether `key` is registered.
    pub fn contains(&self, key: &str) -> bool {
        self.volumes.contains_key(key)
    }

    /// Store `volume` under its id, returning any previous entry.
    pub fn insert(&self, volume: QosVolume) -> Option<QosVolume> {
        self.volumes.insert(volume.qos_volume_id.clone(), volume)
    }

    /// Remove `key`, returning the stored volume.
    pub fn remove(&self, key: &str) -> Option<QosVolume> {
        self.volumes.remove(key).map(|(_, v)| v)
    }

    /// All stored volumes, sorted by id.
    pub fn list(&self) -> Vec<QosVolume> {
        let mut volumes: Vec<QosVolume> = self.volumes.iter().map(|e| e.value().clone()).collect();
        volumes.sort_by(|a, b| a.qos_volume_id.cmp(&b.qos_volume_id));
        volumes
    }

    /// Number of stored volumes.
    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }

    /// Number of keys currently locked or waited on.
    pub fn locked_keys(&self) -> usize {
        self.locks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::QosLimit;
    use std::time::Duration;

    fn volume(id: &str) -> QosVolume {
        QosVolume::new(
            id,
            format!("bdev-{}", id),
            QosLimit {
                rw_iops_kiops: 1,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_insert_get_remove() {
        let registry = VolumeRegistry::new();
        assert!(registry.is_empty());

        assert!(registry.insert(volume("b")).is_none());
        assert!(registry.insert(volume("a")).is_none());
        assert!(registry.contains("a"));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("a").unwrap().volume_id, "bdev-a");

        let ids: Vec<String> = registry.list().into_iter().map(|v| v.qos_volume_id).collect();
        assert_eq!(ids, vec!["a", "b"]);

        assert_eq!(registry.remove("a").unwrap().qos_volume_id, "a");
        assert!(registry.remove("a").is_none());
        assert!(registry.get("a").is_none());
    }

    #[test]
    fn test_get_returns_copy() {
        let registry = VolumeRegistry::new();
        registry.insert(volume("a"));

        let mut copy = registry.get("a").unwrap();
        copy.volume_id = "changed".into();
        assert_eq!(registry.get("a").unwrap().volume_id, "bdev-a");
    }

    #[tokio::test]
    async fn test_lock_released_on_drop() {
        let registry = VolumeRegistry::new();
        {
            let guard = registry.lock("a").await;
            assert_eq!(guard.key(), "a");
            assert_eq!(registry.locked_keys(), 1);
        }
        assert_eq!(registry.locked_keys(), 0);
    }

    #[tokio::test]
    async fn test_same_key_serialized() {
        let registry = Arc::new(VolumeRegistry::new());
        let guard = registry.lock("a").await;

        let waiter = tokio::spawn({
            let registry = registry.clone();
            async move {
                let _guard = registry.lock("a").await;
            }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(registry.locked_keys(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_waiter_leaves_no_lock_entry() {
        let registry = VolumeRegistry::new();
        let holder = registry.lock("a").await;

        let waited = tokio::time::timeout(Duration::from_millis(10), registry.lock("a")).await;
        assert!(waited.is_err());
        assert_eq!(registry.locked_keys(), 1);

        drop(holder);
        assert_eq!(registry.locked_keys(), 0);
    }

    #[tokio::test]
    async fn test_waiter_dropped_after_holder_released() {
        let registry = VolumeRegistry::new();
        let holder = registry.lock("a").await;

        let mut waiter = Box::pin(registry.lock("a"));
        assert!(futures::poll!(waiter.as_mut()).is_pending());

        drop(holder);
        assert_eq!(registry.locked_keys(), 1);
        drop(waiter);
        assert_eq!(registry.locked_keys(), 0);

        // the key can still be locked afterwards
        let again = tokio::time::timeout(Duration::from_secs(1), registry.lock("a")).await;
        assert!(again.is_ok());
    }

    #[tokio::test]
    async fn test_distinct_keys_independent() {
        let registry = VolumeRegistry::new();
        let _a = registry.lock("a").await;
        let b = tokio::time::timeout(Duration::from_millis(100), registry.lock("b")).await;
        assert!(b.is_ok());
    }
}
