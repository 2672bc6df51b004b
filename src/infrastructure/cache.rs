use lru::LruCache;
use std::collections::HashMap;
use std::hash::Hash;
use std::num::NonZeroUsize;
use tokio::sync::Mutex;

use crate::core::Id;
use crate::models::UserRef;

pub struct Cache<K, V> {
    inner: LruCache<K, V>,
}

impl<K: Hash + Eq, V> Cache<K, V> {
    /// A zero capacity is bumped to one.
    pub fn new(capacity: usize) -> Self {
        Cache {
            inner: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
        }
    }

    pub fn get(&mut self, key: &K) -> Option<&V> {
        self.inner.get(key)
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.inner.put(key, value);
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.inner.pop(key)
    }
}

/// Read-through cache of the display names attached to photos and comments.
/// Entries are dropped whenever the user's profile changes.
pub struct UserRefCache {
    inner: Mutex<Cache<Id, UserRef>>,
}

impl UserRefCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Cache::new(capacity)),
        }
    }

    /// Returns the cached refs and the ids that missed.
    pub async fn get_many(&self, ids: &[Id]) -> (HashMap<Id, UserRef>, Vec<Id>) {
        let mut cache = self.inner.lock().await;
        let mut hits = HashMap::with_capacity(ids.len());
        let mut misses = Vec::new();
        for id in ids {
            if hits.contains_key(id) || misses.contains(id) {
                continue;
            }
            match cache.get(id) {
                Some(user) => {
                    hits.insert(*id, user.clone());
                }
                None => misses.push(*id),
            }
        }
        (hits, misses)
    }

    pub async fn insert_many(&self, users: impl IntoIterator<Item = UserRef>) {
        let mut cache = self.inner.lock().await;
        for user in users {
            cache.insert(user.id, user);
        }
    }

    pub async fn invalidate(&self, id: Id) {
        self.inner.lock().await.remove(&id);
    }
}
