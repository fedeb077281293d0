//! Eviction and summarization passes.
//!
//! An entry moves `active -> summarized -> evicted` as its score crosses the
//! summarize and eviction thresholds. Pinned entries never move.

use super::clock::Timestamp;
use super::entry::{Entry, StoreKey};
use super::store::Store;
use tracing::{debug, trace};

impl<K: StoreKey, V: Clone> Store<K, V> {
    /// Removes the lowest-scoring unpinned entry, ties going to the smallest
    /// key. Returns `None` when every entry is pinned.
    ///
    /// The victim is discarded straight away, so it is not summarized.
    pub(crate) fn evict_one(&mut self, now: Timestamp) -> Option<Entry<K, V>> {
        let victim = self
            .entries
            .values()
            .filter(|entry| !entry.is_pinned())
            .map(|entry| (entry.key(), self.score_at(entry, now)))
            .min_by(|(a_key, a_score), (b_key, b_score)| {
                a_score.total_cmp(b_score).then_with(|| a_key.cmp(b_key))
            })
            .map(|(key, score)| (key.clone(), score));

        let (key, score) = victim?;
        debug!(key = ?key, score, "evicting lowest-scoring entry to make room");
        self.entries.remove(&key)
    }

    /// Sweeps the store once: summarizes unpinned entries below the summarize
    /// threshold that have no summary yet, then removes those below the
    /// eviction threshold.
    ///
    /// Returns the removed entries, carrying any summary they were given on
    /// the way out, ordered by key.
    pub fn evict(&mut self) -> Vec<Entry<K, V>> {
        let now = self.now();
        let eviction_threshold = self.config.eviction_threshold;

        let mut doomed: Vec<K> = Vec::new();
        let summarized = self.summarize_at(now, |key, score| {
            if score < eviction_threshold {
                doomed.push(key.clone());
            }
        });

        doomed.sort();
        let evicted: Vec<Entry<K, V>> =
            doomed.iter().filter_map(|key| self.entries.remove(key)).collect();
        debug!(
            evicted = evicted.len(),
            summarized,
            remaining = self.entries.len(),
            "eviction sweep"
        );
        evicted
    }

    /// Summarizes, in place, every unpinned entry scoring below the summarize
    /// threshold that has no summary yet. Nothing is removed.
    ///
    /// Returns how many entries were summarized; a store without a
    /// summarizer does nothing.
    pub fn summarize(&mut self) -> usize {
        if self.config.summarize_fn.is_none() {
            return 0;
        }
        let now = self.now();
        self.summarize_at(now, |_, _| {})
    }

    /// Visits every unpinned entry with its score at `now`, summarizing as
    /// needed before handing it to `visit`.
    fn summarize_at<F>(&mut self, now: Timestamp, mut visit: F) -> usize
    where
        F: FnMut(&K, f64),
    {
        let summarize_threshold = self.config.summarize_threshold;
        let decay_fn = &self.config.decay_fn;
        let decay_options = &self.config.decay_options;
        let summarize_fn = self.config.summarize_fn.as_ref();

        let mut summarized = 0;
        for (key, entry) in self.entries.iter_mut() {
            if entry.is_pinned() {
                continue;
            }
            let score = super::decay::compute(entry, now, decay_fn, decay_options);
            if score < summarize_threshold && entry.summary().is_none() {
                if let Some(summarize) = summarize_fn {
                    let summary = summarize(&*entry);
                    entry.set_summary(summary);
                    summarized += 1;
                    trace!(key = ?key, score, "summarized entry");
                }
            }
            visit(key, score);
        }
        summarized
    }
}
