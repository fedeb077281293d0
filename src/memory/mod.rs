//! Core logic for scoring, storing and evicting decaying memory entries.

pub mod clock;
pub mod config;
pub mod decay;
pub mod entry;
pub mod eviction;
pub mod shared;
pub mod stats;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use config::{ConfigError, PutOptions, StoreOptions};
pub use decay::{DecayAlgorithm, DecayBreakdown, DecayFn, DecayOptions};
pub use entry::{Entry, StoreKey};
pub use shared::SharedStore;
pub use stats::StoreStats;
pub use store::{PutOutcome, Store, StoreBuilder};
