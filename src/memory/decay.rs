//! Relevance scoring.
//!
//! Every algorithm produces a raw score which is then multiplied by the
//! entry's importance and clamped to `[0.0, 1.0]`. Pinned entries bypass the
//! algorithms entirely and score exactly `1.0`.

use super::clock::Timestamp;
use super::entry::Entry;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Built-in decay algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecayAlgorithm {
    /// `e^(-λ·t)` over time since last access.
    #[default]
    Exponential,
    /// Exponential boosted by `log10(accessCount + 1) + 1`, capped at 1.0.
    AccessWeighted,
    /// Sigmoid over recency plus age-damped access frequency.
    Combined,
}

/// Parameters handed to every decay computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayOptions {
    /// Half-life in milliseconds.
    pub half_life: u64,
}

impl DecayOptions {
    pub fn half_life_secs(&self) -> f64 {
        self.half_life as f64 / 1000.0
    }

    /// Decay constant `λ = ln(2) / half_life_seconds`.
    pub fn lambda(&self) -> f64 {
        std::f64::consts::LN_2 / self.half_life_secs()
    }
}

/// Caller-supplied scoring function returning a raw, unclamped score.
pub type CustomDecayFn<K, V> =
    Arc<dyn Fn(&Entry<K, V>, Timestamp, &DecayOptions) -> f64 + Send + Sync>;

/// The scoring function a store is configured with.
pub enum DecayFn<K, V> {
    Builtin(DecayAlgorithm),
    Custom(CustomDecayFn<K, V>),
}

impl<K, V> DecayFn<K, V> {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&Entry<K, V>, Timestamp, &DecayOptions) -> f64 + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    /// The built-in identifier, or `None` for a custom function.
    pub fn builtin(&self) -> Option<DecayAlgorithm> {
        match self {
            Self::Builtin(algorithm) => Some(*algorithm),
            Self::Custom(_) => None,
        }
    }

    fn raw(&self, entry: &Entry<K, V>, now: Timestamp, options: &DecayOptions) -> f64 {
        match self {
            Self::Builtin(DecayAlgorithm::Exponential) => exponential(entry, now, options),
            Self::Builtin(DecayAlgorithm::AccessWeighted) => access_weighted(entry, now, options),
            Self::Builtin(DecayAlgorithm::Combined) => combined(entry, now, options),
            Self::Custom(f) => f(entry, now, options),
        }
    }
}

impl<K, V> Clone for DecayFn<K, V> {
    fn clone(&self) -> Self {
        match self {
            Self::Builtin(algorithm) => Self::Builtin(*algorithm),
            Self::Custom(f) => Self::Custom(Arc::clone(f)),
        }
    }
}

impl<K, V> fmt::Debug for DecayFn<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin(algorithm) => f.debug_tuple("Builtin").field(algorithm).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl<K, V> From<DecayAlgorithm> for DecayFn<K, V> {
    fn from(algorithm: DecayAlgorithm) -> Self {
        Self::Builtin(algorithm)
    }
}

/// Scores `entry` at `now`, in `[0.0, 1.0]`.
pub fn compute<K, V>(
    entry: &Entry<K, V>,
    now: Timestamp,
    decay_fn: &DecayFn<K, V>,
    options: &DecayOptions,
) -> f64 {
    if entry.is_pinned() {
        return 1.0;
    }
    finalize(decay_fn.raw(entry, now, options), entry.importance())
}

/// Per-factor view of a score, for debugging and observability.
#[derive(Debug, Clone, PartialEq)]
pub struct DecayBreakdown {
    /// `None` when a custom function produced the raw score.
    pub algorithm: Option<DecayAlgorithm>,
    pub pinned: bool,
    pub raw: f64,
    pub importance: f64,
    pub score: f64,
}

pub fn compute_breakdown<K, V>(
    entry: &Entry<K, V>,
    now: Timestamp,
    decay_fn: &DecayFn<K, V>,
    options: &DecayOptions,
) -> DecayBreakdown {
    let raw = decay_fn.raw(entry, now, options);
    let score = if entry.is_pinned() { 1.0 } else { finalize(raw, entry.importance()) };
    DecayBreakdown {
        algorithm: decay_fn.builtin(),
        pinned: entry.is_pinned(),
        raw,
        importance: entry.importance(),
        score,
    }
}

fn finalize(raw: f64, importance: f64) -> f64 {
    let weighted = raw * importance;
    // f64::clamp passes NaN through.
    if weighted.is_nan() {
        0.0
    } else {
        weighted.clamp(0.0, 1.0)
    }
}

fn recency<K, V>(entry: &Entry<K, V>, now: Timestamp, options: &DecayOptions) -> f64 {
    let secs = now.secs_since(entry.last_accessed_at());
    (-options.lambda() * secs).exp()
}

pub(crate) fn exponential<K, V>(
    entry: &Entry<K, V>,
    now: Timestamp,
    options: &DecayOptions,
) -> f64 {
    recency(entry, now, options)
}

pub(crate) fn access_weighted<K, V>(
    entry: &Entry<K, V>,
    now: Timestamp,
    options: &DecayOptions,
) -> f64 {
    let frequency = (entry.access_count() as f64 + 1.0).log10() + 1.0;
    (recency(entry, now, options) * frequency).min(1.0)
}

/// Offsets the activation so a fresh, never-read entry scores ~0.98.
const SIGMOID_GAIN: f64 = 8.0;
const SIGMOID_OFFSET: f64 = 4.0;

pub(crate) fn combined<K, V>(entry: &Entry<K, V>, now: Timestamp, options: &DecayOptions) -> f64 {
    let since_inserted = now.secs_since(entry.inserted_at());
    let age_factor = if since_inserted <= 0.0 {
        1.0
    } else {
        1.0 / (since_inserted + 1.0).sqrt()
    };
    let frequency = (entry.access_count() as f64 + 1.0).ln() * age_factor;
    let activation = recency(entry, now, options) + frequency;
    sigmoid(activation * SIGMOID_GAIN - SIGMOID_OFFSET)
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: DecayOptions = DecayOptions { half_life: 3_600_000 };

    fn entry_at(secs: i64) -> Entry<u64, &'static str> {
        Entry::new(1, "v", Timestamp::from_secs(secs))
    }

    fn score(entry: &Entry<u64, &'static str>, at_secs: i64, algorithm: DecayAlgorithm) -> f64 {
        compute(entry, Timestamp::from_secs(at_secs), &DecayFn::Builtin(algorithm), &HOUR)
    }

    #[test]
    fn test_exponential_half_life() {
        let entry = entry_at(0);
        assert!((score(&entry, 0, DecayAlgorithm::Exponential) - 1.0).abs() < 1e-12);
        assert!((score(&entry, 3600, DecayAlgorithm::Exponential) - 0.5).abs() < 1e-9);
        assert!((score(&entry, 7200, DecayAlgorithm::Exponential) - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_large_elapsed_time_approaches_zero() {
        let entry = entry_at(0);
        for algorithm in [DecayAlgorithm::Exponential, DecayAlgorithm::AccessWeighted] {
            let s = score(&entry, 10_000_000_000, algorithm);
            assert!(!s.is_nan());
            assert!(s < 1e-9, "{algorithm:?} scored {s}");
        }
        let s = score(&entry, 10_000_000_000, DecayAlgorithm::Combined);
        assert!(!s.is_nan());
        assert!(s < 0.02);
    }

    #[test]
    fn test_negative_elapsed_time_is_clamped() {
        let entry = entry_at(1000);
        for algorithm in [
            DecayAlgorithm::Exponential,
            DecayAlgorithm::AccessWeighted,
            DecayAlgorithm::Combined,
        ] {
            let backwards = score(&entry, 0, algorithm);
            let fresh = score(&entry, 1000, algorithm);
            assert!((backwards - fresh).abs() < 1e-12);
            assert!((0.0..=1.0).contains(&backwards));
        }
    }

    #[test]
    fn test_access_weighted_matches_exponential_without_access() {
        let entry = entry_at(0);
        let plain = score(&entry, 5400, DecayAlgorithm::Exponential);
        let weighted = score(&entry, 5400, DecayAlgorithm::AccessWeighted);
        assert!((plain - weighted).abs() < 1e-12);
    }

    #[test]
    fn test_access_weighted_rewards_access() {
        let cold = entry_at(0);
        let warm = entry_at(0).with_access(9, Timestamp::from_secs(0));
        let now = Timestamp::from_secs(7200);
        let cold_raw = access_weighted(&cold, now, &HOUR);
        let warm_raw = access_weighted(&warm, now, &HOUR);
        // log10(10) + 1 = 2
        assert!((warm_raw - 2.0 * cold_raw).abs() < 1e-12);
        assert_eq!(score(&warm, 0, DecayAlgorithm::AccessWeighted), 1.0);
    }

    #[test]
    fn test_combined_fresh_entry_scores_high() {
        let entry = entry_at(0);
        let s = score(&entry, 0, DecayAlgorithm::Combined);
        assert!(s > 0.95, "fresh combined score {s}");
    }

    #[test]
    fn test_combined_decreases_and_rewards_access() {
        let cold = entry_at(0);
        let warm = entry_at(0).with_access(5, Timestamp::from_secs(0));
        let mut prev = 1.0;
        for secs in [1, 60, 600, 3600, 7200, 36000] {
            let s = score(&cold, secs, DecayAlgorithm::Combined);
            assert!(s < prev, "not decreasing at {secs}s");
            assert!(score(&warm, secs, DecayAlgorithm::Combined) > s);
            prev = s;
        }
    }

    #[test]
    fn test_pinned_scores_one_regardless_of_importance() {
        let mut entry = entry_at(0);
        entry.set_pinned(true);
        entry.set_importance(0.1);
        for algorithm in [
            DecayAlgorithm::Exponential,
            DecayAlgorithm::AccessWeighted,
            DecayAlgorithm::Combined,
        ] {
            assert_eq!(score(&entry, 1_000_000, algorithm), 1.0);
        }
    }

    #[test]
    fn test_importance_multiplies_then_clamps() {
        let mut entry = entry_at(0);
        entry.set_importance(0.5);
        assert!((score(&entry, 3600, DecayAlgorithm::Exponential) - 0.25).abs() < 1e-9);
        entry.set_importance(4.0);
        assert_eq!(score(&entry, 3600, DecayAlgorithm::Exponential), 1.0);
    }

    #[test]
    fn test_custom_raw_score_is_weighted_and_clamped() {
        let mut entry = entry_at(0);
        entry.set_importance(2.0);
        let half: DecayFn<u64, &'static str> = DecayFn::custom(|_, _, _| 0.3);
        assert!((compute(&entry, Timestamp::from_secs(0), &half, &HOUR) - 0.6).abs() < 1e-12);

        let wild: DecayFn<u64, &'static str> = DecayFn::custom(|_, _, opts| opts.half_life as f64);
        assert_eq!(compute(&entry, Timestamp::from_secs(0), &wild, &HOUR), 1.0);

        let nan: DecayFn<u64, &'static str> = DecayFn::custom(|_, _, _| f64::NAN);
        assert_eq!(compute(&entry, Timestamp::from_secs(0), &nan, &HOUR), 0.0);
    }

    #[test]
    fn test_breakdown() {
        let mut entry = entry_at(0);
        entry.set_importance(0.5);
        let breakdown = compute_breakdown(
            &entry,
            Timestamp::from_secs(3600),
            &DecayFn::Builtin(DecayAlgorithm::Exponential),
            &HOUR,
        );
        assert_eq!(breakdown.algorithm, Some(DecayAlgorithm::Exponential));
        assert!((breakdown.raw - 0.5).abs() < 1e-9);
        assert!((breakdown.score - 0.25).abs() < 1e-9);
        assert!(!breakdown.pinned);
    }
}
