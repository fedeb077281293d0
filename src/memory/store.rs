use super::clock::{Clock, SystemClock, Timestamp};
use super::config::{check_importance, ConfigError, PutOptions, StoreOptions};
use super::decay::{self, CustomDecayFn, DecayBreakdown, DecayFn, DecayOptions};
use super::entry::{Entry, StoreKey};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Hook producing a compressed form of an entry before it decays away.
pub type SummarizeFn<K, V> = Arc<dyn Fn(&Entry<K, V>) -> V + Send + Sync>;

/// First key handed out when callers let the store pick one.
pub const INITIAL_NEXT_KEY: u64 = 1;

/// What a `put` did.
#[derive(Debug, Clone, PartialEq)]
pub enum PutOutcome<K, V> {
    Inserted(K),
    /// The key already existed; nothing was evicted.
    Replaced(K),
    /// The store was full and `victim` made room.
    EvictedAndInserted { key: K, victim: Entry<K, V> },
    /// The store was full of pinned entries; nothing changed.
    Dropped,
}

impl<K, V> PutOutcome<K, V> {
    pub fn key(&self) -> Option<&K> {
        match self {
            Self::Inserted(key) | Self::Replaced(key) => Some(key),
            Self::EvictedAndInserted { key, .. } => Some(key),
            Self::Dropped => None,
        }
    }

    pub fn is_dropped(&self) -> bool {
        matches!(self, Self::Dropped)
    }
}

/// Validated configuration plus the callables attached to a store.
pub(crate) struct StoreConfig<K, V> {
    pub(crate) max_entries: usize,
    pub(crate) decay_fn: DecayFn<K, V>,
    pub(crate) decay_options: DecayOptions,
    pub(crate) eviction_threshold: f64,
    pub(crate) summarize_threshold: f64,
    pub(crate) summarize_fn: Option<SummarizeFn<K, V>>,
    pub(crate) clock: Arc<dyn Clock>,
}

impl<K, V> Clone for StoreConfig<K, V> {
    fn clone(&self) -> Self {
        Self {
            max_entries: self.max_entries,
            decay_fn: self.decay_fn.clone(),
            decay_options: self.decay_options,
            eviction_threshold: self.eviction_threshold,
            summarize_threshold: self.summarize_threshold,
            summarize_fn: self.summarize_fn.clone(),
            clock: Arc::clone(&self.clock),
        }
    }
}

/// Builds a [`Store`], attaching callables to validated [`StoreOptions`].
pub struct StoreBuilder<K, V> {
    options: StoreOptions,
    custom_decay: Option<CustomDecayFn<K, V>>,
    summarize_fn: Option<SummarizeFn<K, V>>,
    clock: Option<Arc<dyn Clock>>,
}

impl<K: StoreKey, V: Clone> StoreBuilder<K, V> {
    pub fn new(options: StoreOptions) -> Self {
        Self {
            options,
            custom_decay: None,
            summarize_fn: None,
            clock: None,
        }
    }

    pub fn max_entries(mut self, max_entries: usize) -> Self {
        self.options.max_entries = max_entries;
        self
    }

    pub fn decay(mut self, algorithm: decay::DecayAlgorithm) -> Self {
        self.options.decay_fn = algorithm;
        self.custom_decay = None;
        self
    }

    /// Scores with `f` instead of a built-in algorithm.
    pub fn custom_decay<F>(mut self, f: F) -> Self
    where
        F: Fn(&Entry<K, V>, Timestamp, &DecayOptions) -> f64 + Send + Sync + 'static,
    {
        self.custom_decay = Some(Arc::new(f));
        self
    }

    pub fn half_life_ms(mut self, half_life: u64) -> Self {
        self.options.half_life = half_life;
        self
    }

    pub fn eviction_threshold(mut self, threshold: f64) -> Self {
        self.options.eviction_threshold = threshold;
        self
    }

    pub fn summarize_threshold(mut self, threshold: f64) -> Self {
        self.options.summarize_threshold = threshold;
        self
    }

    pub fn summarize_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&Entry<K, V>) -> V + Send + Sync + 'static,
    {
        self.summarize_fn = Some(Arc::new(f));
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    pub(crate) fn shared_clock(mut self, clock: Option<Arc<dyn Clock>>) -> Self {
        self.clock = clock;
        self
    }

    pub(crate) fn shared_custom_decay(mut self, f: Option<CustomDecayFn<K, V>>) -> Self {
        self.custom_decay = f;
        self
    }

    pub(crate) fn shared_summarize_fn(mut self, f: Option<SummarizeFn<K, V>>) -> Self {
        self.summarize_fn = f;
        self
    }

    pub fn build(self) -> Result<Store<K, V>, ConfigError> {
        self.options.validate()?;
        let decay_fn = match self.custom_decay {
            Some(f) => DecayFn::Custom(f),
            None => DecayFn::Builtin(self.options.decay_fn),
        };
        let clock: Arc<dyn Clock> = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        Ok(Store {
            entries: HashMap::new(),
            next_key: INITIAL_NEXT_KEY,
            config: StoreConfig {
                max_entries: self.options.max_entries,
                decay_fn,
                decay_options: DecayOptions {
                    half_life: self.options.half_life,
                },
                eviction_threshold: self.options.eviction_threshold,
                summarize_threshold: self.options.summarize_threshold,
                summarize_fn: self.summarize_fn,
                clock,
            },
        })
    }
}

/// Capacity-bounded collection of decaying entries.
///
/// A store is single-threaded and owns its entries outright; wrap it in a
/// [`SharedStore`](super::shared::SharedStore) to share it between threads.
pub struct Store<K, V> {
    pub(crate) entries: HashMap<K, Entry<K, V>>,
    pub(crate) next_key: u64,
    pub(crate) config: StoreConfig<K, V>,
}

impl<K: Clone, V: Clone> Clone for Store<K, V> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            next_key: self.next_key,
            config: self.config.clone(),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Store<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("entries", &self.entries)
            .field("next_key", &self.next_key)
            .field("max_entries", &self.config.max_entries)
            .field("decay_fn", &self.config.decay_fn)
            .field("half_life", &self.config.decay_options.half_life)
            .field("eviction_threshold", &self.config.eviction_threshold)
            .field("summarize_threshold", &self.config.summarize_threshold)
            .field("summarize_fn", &self.config.summarize_fn.is_some())
            .finish()
    }
}

impl<K: StoreKey, V: Clone> Store<K, V> {
    /// Creates a store using the system clock and no summarizer.
    pub fn new(options: StoreOptions) -> Result<Self, ConfigError> {
        StoreBuilder::new(options).build()
    }

    pub fn builder() -> StoreBuilder<K, V> {
        StoreBuilder::new(StoreOptions::default())
    }

    // ---- configuration ----------------------------------------------------

    pub fn capacity(&self) -> usize {
        self.config.max_entries
    }

    pub fn decay_fn(&self) -> &DecayFn<K, V> {
        &self.config.decay_fn
    }

    pub fn decay_options(&self) -> DecayOptions {
        self.config.decay_options
    }

    pub fn eviction_threshold(&self) -> f64 {
        self.config.eviction_threshold
    }

    pub fn summarize_threshold(&self) -> f64 {
        self.config.summarize_threshold
    }

    pub fn next_key(&self) -> u64 {
        self.next_key
    }

    /// Data-only view of the configuration.
    ///
    /// `StoreOptions` can only name a built-in algorithm, so a store scoring
    /// with a custom function reports the default one here; check
    /// `decay_fn().builtin()` to tell the two apart.
    pub fn options(&self) -> StoreOptions {
        StoreOptions {
            max_entries: self.config.max_entries,
            decay_fn: self.config.decay_fn.builtin().unwrap_or_default(),
            half_life: self.config.decay_options.half_life,
            eviction_threshold: self.config.eviction_threshold,
            summarize_threshold: self.config.summarize_threshold,
        }
    }

    pub(crate) fn now(&self) -> Timestamp {
        self.config.clock.now()
    }

    pub(crate) fn score_at(&self, entry: &Entry<K, V>, now: Timestamp) -> f64 {
        decay::compute(entry, now, &self.config.decay_fn, &self.config.decay_options)
    }

    // ---- write path -------------------------------------------------------

    /// Inserts or replaces `key` with default options.
    pub fn put(&mut self, key: K, value: V) -> PutOutcome<K, V> {
        self.insert(Some(key), value, PutOptions::default())
    }

    /// Inserts `value` under the next generated key.
    pub fn put_auto(&mut self, value: V) -> PutOutcome<K, V> {
        self.insert(None, value, PutOptions::default())
    }

    /// Inserts or replaces an entry.
    ///
    /// Replacing an existing key never evicts. A new key at capacity evicts
    /// the lowest-scoring unpinned entry, or is dropped if every entry is
    /// pinned. Options are validated before anything changes.
    pub fn put_with(
        &mut self,
        key: Option<K>,
        value: V,
        options: PutOptions,
    ) -> Result<PutOutcome<K, V>, ConfigError> {
        options.validate()?;
        Ok(self.insert(key, value, options))
    }

    fn insert(&mut self, key: Option<K>, value: V, options: PutOptions) -> PutOutcome<K, V> {
        let now = self.now();
        let generated = key.is_none();
        let key = key.unwrap_or_else(|| K::from_counter(self.next_key));

        let outcome = if self.entries.contains_key(&key) {
            PutOutcome::Replaced(key.clone())
        } else if self.entries.len() < self.config.max_entries {
            PutOutcome::Inserted(key.clone())
        } else {
            match self.evict_one(now) {
                Some(victim) => PutOutcome::EvictedAndInserted {
                    key: key.clone(),
                    victim,
                },
                None => {
                    debug!(
                        key = ?key,
                        size = self.entries.len(),
                        "store full of pinned entries, dropping put"
                    );
                    return PutOutcome::Dropped;
                }
            }
        };

        let mut entry = Entry::new(key.clone(), value, now);
        entry.set_importance(options.importance);
        entry.set_pinned(options.pinned);
        entry.set_metadata(options.metadata);
        self.entries.insert(key.clone(), entry);

        if generated || key.counter_value() == Some(self.next_key) {
            self.next_key = self.next_key.saturating_add(1);
        }
        trace!(key = ?key, size = self.entries.len(), "put");
        outcome
    }

    /// Reinforcing read: bumps the access count and recency of `key`.
    pub fn get(&mut self, key: &K) -> Option<&Entry<K, V>> {
        if !self.entries.contains_key(key) {
            return None;
        }
        let now = self.now();
        let entry = self.entries.get_mut(key)?;
        entry.rehearse(now);
        Some(&*entry)
    }

    /// Passive read; never changes the entry.
    pub fn peek(&self, key: &K) -> Option<&Entry<K, V>> {
        self.entries.get(key)
    }

    pub fn delete(&mut self, key: &K) -> Option<Entry<K, V>> {
        self.entries.remove(key)
    }

    /// Replaces the value of an existing entry and counts it as an access.
    ///
    /// Pin state, importance, metadata and any summary are kept.
    pub fn update(&mut self, key: &K, value: V) -> bool {
        if !self.entries.contains_key(key) {
            return false;
        }
        let now = self.now();
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.replace_value(value, now);
                true
            }
            None => false,
        }
    }

    /// Refreshes access metadata like [`get`](Self::get), optionally
    /// replacing the importance.
    pub fn touch(&mut self, key: &K, importance: Option<f64>) -> Result<bool, ConfigError> {
        if let Some(importance) = importance {
            check_importance(importance)?;
        }
        if !self.entries.contains_key(key) {
            return Ok(false);
        }
        let now = self.now();
        let Some(entry) = self.entries.get_mut(key) else {
            return Ok(false);
        };
        entry.rehearse(now);
        if let Some(importance) = importance {
            entry.set_importance(importance);
        }
        Ok(true)
    }

    pub fn pin(&mut self, key: &K) -> bool {
        self.set_pinned(key, true)
    }

    pub fn unpin(&mut self, key: &K) -> bool {
        self.set_pinned(key, false)
    }

    fn set_pinned(&mut self, key: &K, pinned: bool) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.set_pinned(pinned);
                true
            }
            None => false,
        }
    }

    /// Removes every entry and resets key generation; configuration is kept.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.next_key = INITIAL_NEXT_KEY;
    }

    // ---- queries ----------------------------------------------------------

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Keys in ascending order.
    pub fn keys(&self) -> Vec<&K> {
        let mut keys: Vec<&K> = self.entries.keys().collect();
        keys.sort();
        keys
    }

    /// All entries in arbitrary order.
    pub fn entries(&self) -> impl Iterator<Item = &Entry<K, V>> {
        self.entries.values()
    }

    pub fn score(&self, key: &K) -> Option<f64> {
        let now = self.now();
        self.entries.get(key).map(|entry| self.score_at(entry, now))
    }

    pub fn explain(&self, key: &K) -> Option<DecayBreakdown> {
        let now = self.now();
        self.entries.get(key).map(|entry| {
            decay::compute_breakdown(entry, now, &self.config.decay_fn, &self.config.decay_options)
        })
    }

    /// Every entry with its score, highest first; ties by ascending key.
    pub fn scored(&self) -> Vec<(&Entry<K, V>, f64)> {
        let now = self.now();
        self.sorted_scores(now, |_| true)
    }

    pub fn score_map(&self) -> HashMap<K, f64> {
        let now = self.now();
        self.entries
            .iter()
            .map(|(key, entry)| (key.clone(), self.score_at(entry, now)))
            .collect()
    }

    /// Entries scoring at least `threshold`, highest first.
    pub fn above(&self, threshold: f64) -> Vec<(&Entry<K, V>, f64)> {
        let now = self.now();
        self.sorted_scores(now, |score| score >= threshold)
    }

    pub fn active(&self) -> Vec<(&Entry<K, V>, f64)> {
        self.above(self.config.eviction_threshold)
    }

    pub fn top(&self, n: usize) -> Vec<(&Entry<K, V>, f64)> {
        if n == 0 {
            return Vec::new();
        }
        let mut scored = self.scored();
        scored.truncate(n);
        scored
    }

    pub fn active_count(&self) -> usize {
        let now = self.now();
        self.entries
            .values()
            .filter(|entry| self.score_at(entry, now) >= self.config.eviction_threshold)
            .count()
    }

    pub fn pinned_count(&self) -> usize {
        self.entries.values().filter(|entry| entry.is_pinned()).count()
    }

    pub fn filter<P>(&self, predicate: P) -> Vec<&Entry<K, V>>
    where
        P: Fn(&Entry<K, V>) -> bool,
    {
        self.entries.values().filter(|entry| predicate(entry)).collect()
    }

    fn sorted_scores<P>(&self, now: Timestamp, keep: P) -> Vec<(&Entry<K, V>, f64)>
    where
        P: Fn(f64) -> bool,
    {
        let mut scored: Vec<(&Entry<K, V>, f64)> = self
            .entries
            .values()
            .map(|entry| (entry, self.score_at(entry, now)))
            .filter(|&(_, score)| keep(score))
            .collect();
        scored.sort_by(|(a, a_score), (b, b_score)| {
            by_score_desc(*a_score, *b_score).then_with(|| a.key().cmp(b.key()))
        });
        scored
    }
}

fn by_score_desc(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}
