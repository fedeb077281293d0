use super::StorageError;
use lz4_flex::{compress_prepend_size, decompress_size_prepended};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompressionAlgorithm {
    None,
    LZ4,
}

impl CompressionAlgorithm {
    pub(crate) fn tag(self) -> u8 {
        match self {
            Self::None => 0,
            Self::LZ4 => 1,
        }
    }

    pub(crate) fn from_tag(tag: u8) -> Result<Self, StorageError> {
        match tag {
            0 => Ok(Self::None),
            1 => Ok(Self::LZ4),
            other => Err(StorageError::UnknownCompression(other)),
        }
    }
}

/// Sizes and timing of one `compress` call, logged when a snapshot is encoded.
#[derive(Debug, Clone, Copy)]
pub struct CompressionMetrics {
    pub original_size: usize,
    pub compressed_size: usize,
    pub compression_time: Duration,
    pub algorithm: CompressionAlgorithm,
}

impl CompressionMetrics {
    /// Compressed over original size; an empty input counts as 1.0.
    pub fn ratio(&self) -> f64 {
        if self.original_size == 0 {
            return 1.0;
        }
        self.compressed_size as f64 / self.original_size as f64
    }
}

pub struct Compressor {
    algorithm: CompressionAlgorithm,
}

impl Compressor {
    pub fn new(algorithm: CompressionAlgorithm) -> Self {
        Self { algorithm }
    }

    pub fn compress(&self, data: &[u8]) -> (Vec<u8>, CompressionMetrics) {
        let start = Instant::now();
        let compressed = match self.algorithm {
            CompressionAlgorithm::None => data.to_vec(),
            CompressionAlgorithm::LZ4 => compress_prepend_size(data),
        };

        let metrics = CompressionMetrics {
            original_size: data.len(),
            compressed_size: compressed.len(),
            compression_time: start.elapsed(),
            algorithm: self.algorithm,
        };
        (compressed, metrics)
    }

    pub fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, StorageError> {
        match self.algorithm {
            CompressionAlgorithm::None => Ok(data.to_vec()),
            CompressionAlgorithm::LZ4 => {
                decompress_size_prepended(data)
                    .map_err(|e| StorageError::Decompression(e.to_string()))
            }
        }
    }
}
