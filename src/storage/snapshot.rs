use super::compression::{CompressionAlgorithm, Compressor};
use super::StorageError;
use crate::memory::clock::{Clock, Timestamp};
use crate::memory::decay::{CustomDecayFn, DecayAlgorithm, DecayOptions};
use crate::memory::entry::{Entry, StoreKey};
use crate::memory::store::{Store, StoreBuilder, SummarizeFn};
use crate::memory::{ConfigError, StoreOptions};
use bincode::{deserialize, serialize};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

const MAGIC: &[u8; 4] = b"DCY8";
const VERSION: u8 = 1;
/// magic + version + compression tag + crc32
const HEADER_LEN: usize = 4 + 1 + 1 + 4;

/// Plain-data image of a store.
///
/// `decay_fn` is `None` when the store scored with a custom function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot<K, V> {
    pub entries: Vec<Entry<K, V>>,
    pub next_key: u64,
    pub max_entries: usize,
    pub decay_fn: Option<DecayAlgorithm>,
    pub half_life: u64,
    pub eviction_threshold: f64,
    pub summarize_threshold: f64,
}

/// Live callables re-attached to a restored store.
pub struct Hooks<K, V> {
    custom_decay: Option<CustomDecayFn<K, V>>,
    summarize_fn: Option<SummarizeFn<K, V>>,
    clock: Option<Arc<dyn Clock>>,
}

impl<K, V> Default for Hooks<K, V> {
    fn default() -> Self {
        Self {
            custom_decay: None,
            summarize_fn: None,
            clock: None,
        }
    }
}

impl<K, V> Hooks<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn custom_decay<F>(mut self, f: F) -> Self
    where
        F: Fn(&Entry<K, V>, Timestamp, &DecayOptions) -> f64 + Send + Sync + 'static,
    {
        self.custom_decay = Some(Arc::new(f));
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
}

impl<K: StoreKey, V: Clone> StoreSnapshot<K, V> {
    /// Captures `store`, entries ordered by key.
    pub fn capture(store: &Store<K, V>) -> Self {
        let mut entries: Vec<Entry<K, V>> = store.entries().cloned().collect();
        entries.sort_by(|a, b| a.key().cmp(b.key()));
        let options = store.options();
        Self {
            entries,
            next_key: store.next_key(),
            max_entries: options.max_entries,
            decay_fn: store.decay_fn().builtin(),
            half_life: options.half_life,
            eviction_threshold: options.eviction_threshold,
            summarize_threshold: options.summarize_threshold,
        }
    }

    /// Rebuilds a store, re-validating the options and attaching `hooks`.
    ///
    /// A custom decay hook replaces any built-in identifier; a snapshot of a
    /// custom-scored store cannot be restored without one.
    pub fn restore(self, hooks: Hooks<K, V>) -> Result<Store<K, V>, StorageError> {
        let algorithm = match (self.decay_fn, &hooks.custom_decay) {
            (Some(algorithm), _) => algorithm,
            (None, Some(_)) => DecayAlgorithm::default(),
            (None, None) => return Err(ConfigError::MissingDecayFn.into()),
        };
        let options = StoreOptions {
            max_entries: self.max_entries,
            decay_fn: algorithm,
            half_life: self.half_life,
            eviction_threshold: self.eviction_threshold,
            summarize_threshold: self.summarize_threshold,
        };
        if self.entries.len() > options.max_entries {
            return Err(StorageError::OverCapacity {
                entries: self.entries.len(),
                capacity: options.max_entries,
            });
        }

        let mut store = StoreBuilder::new(options)
            .shared_custom_decay(hooks.custom_decay)
            .shared_summarize_fn(hooks.summarize_fn)
            .shared_clock(hooks.clock)
            .build()?;
        for entry in self.entries {
            store.entries.insert(entry.key().clone(), entry);
        }
        store.next_key = self.next_key;
        Ok(store)
    }
}

/// Frames a snapshot as `magic | version | compression | crc32 | payload`.
pub fn encode<K, V>(
    snapshot: &StoreSnapshot<K, V>,
    algorithm: CompressionAlgorithm,
) -> Result<Vec<u8>, StorageError>
where
    K: Serialize,
    V: Serialize,
{
    let data = serialize(snapshot)?;
    let (payload, metrics) = Compressor::new(algorithm).compress(&data);
    let checksum = crc32fast::hash(&payload);

    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
    bytes.extend_from_slice(MAGIC);
    bytes.push(VERSION);
    bytes.push(algorithm.tag());
    bytes.extend_from_slice(&checksum.to_le_bytes());
    bytes.extend_from_slice(&payload);
    debug!(
        entries = snapshot.entries.len(),
        original = metrics.original_size,
        compressed = metrics.compressed_size,
        ratio = metrics.ratio(),
        elapsed_us = metrics.compression_time.as_micros() as u64,
        algorithm = ?metrics.algorithm,
        "encoded snapshot"
    );
    Ok(bytes)
}

pub fn decode<K, V>(bytes: &[u8]) -> Result<StoreSnapshot<K, V>, StorageError>
where
    K: DeserializeOwned,
    V: DeserializeOwned,
{
    if bytes.len() < HEADER_LEN {
        return Err(StorageError::Truncated(bytes.len()));
    }
    let (header, payload) = bytes.split_at(HEADER_LEN);
    if &header[0..4] != MAGIC {
        return Err(StorageError::BadMagic);
    }
    if header[4] != VERSION {
        return Err(StorageError::UnsupportedVersion(header[4]));
    }
    let algorithm = CompressionAlgorithm::from_tag(header[5])?;
    let expected = u32::from_le_bytes([header[6], header[7], header[8], header[9]]);
    let actual = crc32fast::hash(payload);
    if expected != actual {
        return Err(StorageError::ChecksumMismatch { expected, actual });
    }

    let data = Compressor::new(algorithm).decompress(payload)?;
    Ok(deserialize(&data)?)
}

impl<K: StoreKey, V: Clone> Store<K, V> {
    pub fn to_snapshot(&self) -> StoreSnapshot<K, V> {
        StoreSnapshot::capture(self)
    }
}
