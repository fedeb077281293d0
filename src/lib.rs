//! # decay8
//!
//! Bounded, relevance-aware in-memory store. Entries lose relevance over time
//! unless they are read, marked important or pinned; the least relevant
//! entries are evicted when the store is full, optionally after being
//! summarized.

pub mod memory;
pub mod storage;

pub use memory::{
    Clock, ConfigError, DecayAlgorithm, DecayBreakdown, DecayFn, DecayOptions, Entry,
    ManualClock, PutOptions, PutOutcome, SharedStore, Store, StoreBuilder, StoreKey,
    StoreOptions, StoreStats, SystemClock, Timestamp,
};
pub use storage::{Hooks, StorageError, StoreSnapshot};
