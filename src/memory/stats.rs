use super::clock::Timestamp;
use super::entry::StoreKey;
use super::store::Store;
use serde::{Deserialize, Serialize};

/// Aggregate view of a store at a single instant.
///
/// Aggregates are `None` for an empty store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreStats {
    pub size: usize,
    pub active_count: usize,
    pub pinned_count: usize,
    pub oldest_inserted_at: Option<Timestamp>,
    pub newest_inserted_at: Option<Timestamp>,
    pub mean_score: Option<f64>,
    pub median_score: Option<f64>,
}

impl<K: StoreKey, V: Clone> Store<K, V> {
    pub fn stats(&self) -> StoreStats {
        let now = self.now();
        let eviction_threshold = self.eviction_threshold();

        let mut scores: Vec<f64> = self.entries().map(|entry| self.score_at(entry, now)).collect();
        scores.sort_by(f64::total_cmp);

        StoreStats {
            size: self.size(),
            active_count: scores.iter().filter(|&&score| score >= eviction_threshold).count(),
            pinned_count: self.pinned_count(),
            oldest_inserted_at: self.entries().map(|entry| entry.inserted_at()).min(),
            newest_inserted_at: self.entries().map(|entry| entry.inserted_at()).max(),
            mean_score: mean(&scores),
            median_score: median(&scores),
        }
    }
}

fn mean(scores: &[f64]) -> Option<f64> {
    if scores.is_empty() {
        return None;
    }
    Some(scores.iter().sum::<f64>() / scores.len() as f64)
}

/// Median of an ascending slice.
fn median(sorted: &[f64]) -> Option<f64> {
    let n = sorted.len();
    match n {
        0 => None,
        _ if n % 2 == 1 => Some(sorted[n / 2]),
        _ => Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::clock::ManualClock;
    use crate::memory::config::PutOptions;

    #[test]
    fn test_median() {
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[0.4]), Some(0.4));
        assert_eq!(median(&[0.2, 0.4, 0.9]), Some(0.4));
        assert_eq!(median(&[0.2, 0.4, 0.6, 0.9]), Some(0.5));
    }

    #[test]
    fn test_empty_store_stats() {
        let store: Store<u64, ()> = Store::builder().clock(ManualClock::default()).build().unwrap();
        let stats = store.stats();
        assert_eq!(stats.size, 0);
        assert_eq!(stats.active_count, 0);
        assert_eq!(stats.pinned_count, 0);
        assert!(stats.oldest_inserted_at.is_none());
        assert!(stats.newest_inserted_at.is_none());
        assert!(stats.mean_score.is_none());
        assert!(stats.median_score.is_none());
    }

    #[test]
    fn test_stats_aggregates() {
        let clock = ManualClock::new(Timestamp::from_secs(0));
        let mut store: Store<u64, &str> = Store::builder()
            .half_life_ms(3_600_000)
            .clock(clock.clone())
            .build()
            .unwrap();

        store.put(1, "a");
        clock.set_secs(3600);
        store.put(2, "b");
        store.put_with(Some(3), "c", PutOptions::pinned()).unwrap();
        clock.set_secs(7200);

        clock.reset_reads();
        let stats = store.stats();
        assert_eq!(clock.reads(), 1);

        // scores: 0.25, 0.5, 1.0
        assert_eq!(stats.size, 3);
        assert_eq!(stats.active_count, 3);
        assert_eq!(stats.pinned_count, 1);
        assert_eq!(stats.oldest_inserted_at, Some(Timestamp::from_secs(0)));
        assert_eq!(stats.newest_inserted_at, Some(Timestamp::from_secs(3600)));
        assert!((stats.mean_score.unwrap() - 1.75 / 3.0).abs() < 1e-9);
        assert!((stats.median_score.unwrap() - 0.5).abs() < 1e-9);
    }
}
