use super::clock::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::hash::Hash;

/// Key types a store can hold.
///
/// `from_counter` builds the key used when a caller omits one;
/// `counter_value` lets an explicit key advance the counter so generated keys
/// never collide with it.
///
/// Integer keys narrower than `u64` saturate at their maximum once the
/// counter outgrows them, so generation past that point replaces the entry
/// at the maximum key.
pub trait StoreKey: Clone + Eq + Hash + Ord + Debug {
    fn from_counter(counter: u64) -> Self;
    fn counter_value(&self) -> Option<u64>;
}

impl StoreKey for u64 {
    fn from_counter(counter: u64) -> Self {
        counter
    }

    fn counter_value(&self) -> Option<u64> {
        Some(*self)
    }
}

impl StoreKey for u32 {
    fn from_counter(counter: u64) -> Self {
        u32::try_from(counter).unwrap_or(u32::MAX)
    }

    fn counter_value(&self) -> Option<u64> {
        Some(u64::from(*self))
    }
}

impl StoreKey for usize {
    fn from_counter(counter: u64) -> Self {
        usize::try_from(counter).unwrap_or(usize::MAX)
    }

    fn counter_value(&self) -> Option<u64> {
        u64::try_from(*self).ok()
    }
}

impl StoreKey for i64 {
    fn from_counter(counter: u64) -> Self {
        i64::try_from(counter).unwrap_or(i64::MAX)
    }

    fn counter_value(&self) -> Option<u64> {
        u64::try_from(*self).ok()
    }
}

/// Generated string keys are the decimal counter. An explicit string only
/// counts when it is written exactly as the counter would write it, so `"7"`
/// advances past 7 but `"07"` and `"+7"` do not.
impl StoreKey for String {
    fn from_counter(counter: u64) -> Self {
        counter.to_string()
    }

    fn counter_value(&self) -> Option<u64> {
        let value: u64 = self.parse().ok()?;
        (value.to_string() == *self).then_some(value)
    }
}

/// A single stored value plus the metadata its decay score depends on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry<K, V> {
    key: K,
    value: V,
    inserted_at: Timestamp,
    last_accessed_at: Timestamp,
    access_count: u64,
    pinned: bool,
    importance: f64,
    metadata: BTreeMap<String, String>,
    summary: Option<V>,
}

impl<K, V> Entry<K, V> {
    /// Creates an unpinned entry with importance 1.0, stamped at `now`.
    pub fn new(key: K, value: V, now: Timestamp) -> Self {
        Self {
            key,
            value,
            inserted_at: now,
            last_accessed_at: now,
            access_count: 0,
            pinned: false,
            importance: 1.0,
            metadata: BTreeMap::new(),
            summary: None,
        }
    }

    // Getters
    pub fn key(&self) -> &K { &self.key }
    pub fn value(&self) -> &V { &self.value }
    pub fn inserted_at(&self) -> Timestamp { self.inserted_at }
    pub fn last_accessed_at(&self) -> Timestamp { self.last_accessed_at }
    pub fn access_count(&self) -> u64 { self.access_count }
    pub fn is_pinned(&self) -> bool { self.pinned }
    pub fn importance(&self) -> f64 { self.importance }
    pub fn metadata(&self) -> &BTreeMap<String, String> { &self.metadata }
    pub fn summary(&self) -> Option<&V> { self.summary.as_ref() }

    pub fn into_value(self) -> V {
        self.value
    }

    /// Records a reinforcing access at `now`.
    pub(crate) fn rehearse(&mut self, now: Timestamp) {
        self.last_accessed_at = now;
        self.access_count = self.access_count.saturating_add(1);
    }

    pub(crate) fn replace_value(&mut self, value: V, now: Timestamp) {
        self.value = value;
        self.rehearse(now);
    }

    pub(crate) fn set_pinned(&mut self, pinned: bool) {
        self.pinned = pinned;
    }

    /// Callers validate `importance` beforehand.
    pub(crate) fn set_importance(&mut self, importance: f64) {
        self.importance = importance;
    }

    pub(crate) fn set_metadata(&mut self, metadata: BTreeMap<String, String>) {
        self.metadata = metadata;
    }

    pub(crate) fn set_summary(&mut self, summary: V) {
        self.summary = Some(summary);
    }

    #[cfg(test)]
    pub(crate) fn with_access(mut self, access_count: u64, last_accessed_at: Timestamp) -> Self {
        self.access_count = access_count;
        self.last_accessed_at = last_accessed_at;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_creation() {
        let entry = Entry::new("k".to_string(), 7, Timestamp::from_secs(10));
        assert_eq!(entry.key(), "k");
        assert_eq!(*entry.value(), 7);
        assert_eq!(entry.inserted_at(), Timestamp::from_secs(10));
        assert_eq!(entry.last_accessed_at(), entry.inserted_at());
        assert_eq!(entry.access_count(), 0);
        assert_eq!(entry.importance(), 1.0);
        assert!(!entry.is_pinned());
        assert!(entry.summary().is_none());
    }

    #[test]
    fn test_rehearsal_updates_access() {
        let mut entry = Entry::new(1u64, "v", Timestamp::from_secs(0));
        entry.rehearse(Timestamp::from_secs(5));
        entry.rehearse(Timestamp::from_secs(9));
        assert_eq!(entry.access_count(), 2);
        assert_eq!(entry.last_accessed_at(), Timestamp::from_secs(9));
        assert_eq!(entry.inserted_at(), Timestamp::from_secs(0));
    }

    #[test]
    fn test_counter_keys() {
        assert_eq!(u64::from_counter(3), 3);
        assert_eq!(5u32.counter_value(), Some(5));
        assert_eq!((-1i64).counter_value(), None);
        assert_eq!(String::from_counter(12), "12");
        assert_eq!("12".to_string().counter_value(), Some(12));
        assert_eq!("012".to_string().counter_value(), None);
        assert_eq!("+12".to_string().counter_value(), None);
        assert_eq!("note".to_string().counter_value(), None);
    }

    #[test]
    fn test_narrow_counter_keys_saturate() {
        assert_eq!(u32::from_counter(u64::from(u32::MAX) + 5), u32::MAX);
        assert_eq!(i64::from_counter(u64::MAX), i64::MAX);
        assert_eq!(u32::from_counter(42), 42);
    }
}
