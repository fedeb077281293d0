//! Persistence codec for store snapshots.
//!
//! Only plain data is encoded: entries, the key counter and the data-only
//! options. Callables are re-attached on restore through [`Hooks`]. No I/O
//! happens here; callers decide where the bytes go.

pub mod compression;
pub mod snapshot;

pub use compression::{CompressionAlgorithm, CompressionMetrics, Compressor};
pub use snapshot::{decode, encode, Hooks, StoreSnapshot};

use crate::memory::ConfigError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
    #[error("Decompression error: {0}")]
    Decompression(String),
    #[error("Unknown compression tag {0}")]
    UnknownCompression(u8),
    #[error("Not a snapshot: bad magic bytes")]
    BadMagic,
    #[error("Unsupported snapshot version {0}")]
    UnsupportedVersion(u8),
    #[error("Snapshot truncated: {0} bytes")]
    Truncated(usize),
    #[error("Checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },
    #[error("Snapshot holds {entries} entries but capacity is {capacity}")]
    OverCapacity { entries: usize, capacity: usize },
    #[error("Invalid snapshot configuration: {0}")]
    Config(#[from] ConfigError),
}
