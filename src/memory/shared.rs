use super::config::{ConfigError, PutOptions};
use super::entry::{Entry, StoreKey};
use super::stats::StoreStats;
use super::store::{PutOutcome, Store};
use parking_lot::Mutex;
use std::sync::Arc;

/// Thread-safe handle serializing every operation on one [`Store`].
///
/// Clones share the same store. Each call holds the lock for the whole
/// operation, so a call still sees a single consistent instant.
pub struct SharedStore<K, V> {
    inner: Arc<Mutex<Store<K, V>>>,
}

impl<K, V> Clone for SharedStore<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K: StoreKey, V: Clone> SharedStore<K, V> {
    pub fn new(store: Store<K, V>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    /// Runs `f` with shared access to the store.
    pub fn with<R>(&self, f: impl FnOnce(&Store<K, V>) -> R) -> R {
        f(&*self.inner.lock())
    }

    /// Runs `f` with exclusive access to the store.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut Store<K, V>) -> R) -> R {
        f(&mut *self.inner.lock())
    }

    pub fn put(&self, key: K, value: V) -> PutOutcome<K, V> {
        self.inner.lock().put(key, value)
    }

    pub fn put_with(
        &self,
        key: Option<K>,
        value: V,
        options: PutOptions,
    ) -> Result<PutOutcome<K, V>, ConfigError> {
        self.inner.lock().put_with(key, value, options)
    }

    /// Reinforcing read returning a copy of the entry.
    pub fn get(&self, key: &K) -> Option<Entry<K, V>> {
        self.inner.lock().get(key).cloned()
    }

    pub fn peek(&self, key: &K) -> Option<Entry<K, V>> {
        self.inner.lock().peek(key).cloned()
    }

    pub fn delete(&self, key: &K) -> Option<Entry<K, V>> {
        self.inner.lock().delete(key)
    }

    pub fn score(&self, key: &K) -> Option<f64> {
        self.inner.lock().score(key)
    }

    pub fn evict(&self) -> Vec<Entry<K, V>> {
        self.inner.lock().evict()
    }

    pub fn stats(&self) -> StoreStats {
        self.inner.lock().stats()
    }

    pub fn size(&self) -> usize {
        self.inner.lock().size()
    }

    /// Copy of the current store state.
    pub fn snapshot(&self) -> Store<K, V> {
        self.inner.lock().clone()
    }
}
