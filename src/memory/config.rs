use super::decay::DecayAlgorithm;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub const DEFAULT_MAX_ENTRIES: usize = 1000;
/// Five minutes.
pub const DEFAULT_HALF_LIFE_MS: u64 = 300_000;
pub const DEFAULT_EVICTION_THRESHOLD: f64 = 0.1;
pub const DEFAULT_SUMMARIZE_THRESHOLD: f64 = 0.3;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("max_entries must be greater than zero")]
    ZeroCapacity,
    #[error("half_life must be greater than zero milliseconds")]
    ZeroHalfLife,
    #[error("{name} must be within [0.0, 1.0], got {value}")]
    ThresholdOutOfRange { name: &'static str, value: f64 },
    #[error("summarize_threshold ({summarize}) must not be below eviction_threshold ({eviction})")]
    ThresholdOrder { summarize: f64, eviction: f64 },
    #[error("importance must be a finite number greater than zero, got {0}")]
    InvalidImportance(f64),
    #[error("no decay function: custom decay functions must be re-attached")]
    MissingDecayFn,
    #[error("invalid options: {0}")]
    Parse(String),
}

/// Data-only construction options.
///
/// Callables (custom decay, summarizer, clock) are attached through
/// [`StoreBuilder`](super::store::StoreBuilder).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreOptions {
    /// Capacity; inserting a new key beyond it evicts one entry.
    pub max_entries: usize,
    /// Built-in decay algorithm.
    pub decay_fn: DecayAlgorithm,
    /// Half-life in milliseconds.
    pub half_life: u64,
    /// Entries scoring below this are removed by a sweep.
    pub eviction_threshold: f64,
    /// Entries scoring below this are summarized by a sweep.
    pub summarize_threshold: f64,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            decay_fn: DecayAlgorithm::Exponential,
            half_life: DEFAULT_HALF_LIFE_MS,
            eviction_threshold: DEFAULT_EVICTION_THRESHOLD,
            summarize_threshold: DEFAULT_SUMMARIZE_THRESHOLD,
        }
    }
}

impl StoreOptions {
    /// Parses options from TOML, rejecting unknown keys, then validates them.
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        let options: Self = toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_entries == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.half_life == 0 {
            return Err(ConfigError::ZeroHalfLife);
        }
        check_unit("eviction_threshold", self.eviction_threshold)?;
        check_unit("summarize_threshold", self.summarize_threshold)?;
        if self.summarize_threshold < self.eviction_threshold {
            return Err(ConfigError::ThresholdOrder {
                summarize: self.summarize_threshold,
                eviction: self.eviction_threshold,
            });
        }
        Ok(())
    }
}

fn check_unit(name: &'static str, value: f64) -> Result<(), ConfigError> {
    // NaN fails the range check.
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::ThresholdOutOfRange { name, value })
    }
}

pub(crate) fn check_importance(importance: f64) -> Result<(), ConfigError> {
    if importance.is_finite() && importance > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidImportance(importance))
    }
}

/// Per-entry options accepted by `put`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PutOptions {
    pub importance: f64,
    pub pinned: bool,
    pub metadata: BTreeMap<String, String>,
}

impl Default for PutOptions {
    fn default() -> Self {
        Self {
            importance: 1.0,
            pinned: false,
            metadata: BTreeMap::new(),
        }
    }
}

impl PutOptions {
    pub fn pinned() -> Self {
        Self {
            pinned: true,
            ..Self::default()
        }
    }

    pub fn with_importance(mut self, importance: f64) -> Self {
        self.importance = importance;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Parses per-entry options from TOML, rejecting unknown keys.
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        let options: Self = toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_importance(self.importance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(StoreOptions::default().validate().is_ok());
        assert!(PutOptions::default().validate().is_ok());
    }

    #[test]
    fn test_from_toml_with_overrides() {
        let options = StoreOptions::from_toml(
            r#"
max_entries = 3
decay_fn = "access_weighted"
half_life = 3600000
"#,
        )
        .unwrap();
        assert_eq!(options.max_entries, 3);
        assert_eq!(options.decay_fn, DecayAlgorithm::AccessWeighted);
        assert_eq!(options.half_life, 3_600_000);
        assert_eq!(options.eviction_threshold, DEFAULT_EVICTION_THRESHOLD);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let err = StoreOptions::from_toml("max_entries = 3\nttl = 10\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));

        let err = PutOptions::from_toml("importance = 2.0\nweight = 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_unknown_decay_fn_is_rejected() {
        let err = StoreOptions::from_toml(r#"decay_fn = "linear""#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_invalid_values() {
        let mut options = StoreOptions { max_entries: 0, ..Default::default() };
        assert_eq!(options.validate(), Err(ConfigError::ZeroCapacity));

        options = StoreOptions { half_life: 0, ..Default::default() };
        assert_eq!(options.validate(), Err(ConfigError::ZeroHalfLife));

        options = StoreOptions { eviction_threshold: 1.5, ..Default::default() };
        assert!(matches!(
            options.validate(),
            Err(ConfigError::ThresholdOutOfRange { name: "eviction_threshold", .. })
        ));

        options = StoreOptions { summarize_threshold: f64::NAN, ..Default::default() };
        assert!(options.validate().is_err());

        options = StoreOptions {
            eviction_threshold: 0.5,
            summarize_threshold: 0.2,
            ..Default::default()
        };
        assert!(matches!(options.validate(), Err(ConfigError::ThresholdOrder { .. })));
    }

    #[test]
    fn test_put_options_importance() {
        assert!(PutOptions::default().with_importance(0.0).validate().is_err());
        assert!(PutOptions::default().with_importance(-1.0).validate().is_err());
        assert!(PutOptions::default().with_importance(f64::INFINITY).validate().is_err());
        assert!(PutOptions::default().with_importance(2.5).validate().is_ok());

        let options =
            PutOptions::from_toml("pinned = true\n[metadata]\nsource = \"chat\"\n").unwrap();
        assert!(options.pinned);
        assert_eq!(options.metadata.get("source").map(String::as_str), Some("chat"));
    }
}
