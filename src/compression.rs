// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Bucket compression.
//!
//! A bucket's entries are stored as a single text value:
//!
//! ```text
//! Vec<String> → JSON array → zlib (deflate) → base64
//! ```
//!
//! zlib framing is what a browser `CompressionStream("deflate")` emits, so
//! buckets written by either side decode on the other. The adler-32 trailer
//! plus the self-delimiting JSON array mean a damaged value fails to decode
//! rather than yielding a partial entry list.
//!
//! # Example
//!
//! ```
//! use envswap_sync::compression::{compress, decompress};
//!
//! let entries = vec!["0|2|00001000|0|||example.".to_string()];
//! let packed = compress(&entries).unwrap();
//! assert_eq!(decompress(&packed).unwrap(), entries);
//! ```

use base64::{engine::general_purpose::STANDARD, Engine};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Compression error types
#[derive(Debug, thiserror::Error)]
pub enum CompressionError {
    /// Failed to compress data
    #[error("compression failed: {0}")]
    CompressFailed(std::io::Error),

    /// Failed to decompress data
    #[error("decompression failed: {0}")]
    DecompressFailed(std::io::Error),

    /// Value is not valid base64
    #[error("base64 decode failed: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Decompressed payload is not a JSON array of strings
    #[error("JSON parse failed: {0}")]
    JsonParseFailed(#[from] serde_json::Error),
}

/// Compress a bucket's entries into a base64 text value.
pub fn compress(entries: &[String]) -> Result<String, CompressionError> {
    compress_with_stats(entries).map(|(value, _)| value)
}

/// Compress and return stats.
pub fn compress_with_stats(entries: &[String]) -> Result<(String, CompressionStats), CompressionError> {
    let json = serde_json::to_vec(entries)?;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&json)
        .map_err(CompressionError::CompressFailed)?;
    let compressed = encoder.finish().map_err(CompressionError::CompressFailed)?;

    let encoded = STANDARD.encode(&compressed);
    let stats = CompressionStats::new(json.len(), encoded.len());
    Ok((encoded, stats))
}

/// Decompress a base64 text value back into a bucket's entries.
pub fn decompress(value: &str) -> Result<Vec<String>, CompressionError> {
    let compressed = STANDARD.decode(value)?;

    let mut decoder = ZlibDecoder::new(compressed.as_slice());
    let mut json = Vec::new();
    decoder
        .read_to_end(&mut json)
        .map_err(CompressionError::DecompressFailed)?;

    Ok(serde_json::from_slice(&json)?)
}

/// Compression statistics for a single bucket.
#[derive(Debug, Clone, Copy)]
pub struct CompressionStats {
    /// Uncompressed JSON size in bytes
    pub original_bytes: usize,
    /// Stored (base64) size in bytes
    pub compressed_bytes: usize,
    /// Compression ratio (original / compressed)
    pub ratio: f64,
    /// Space saved as percentage (0.0 - 1.0), negative when encoding grew the value
    pub savings: f64,
}

impl CompressionStats {
    /// Calculate stats from original and compressed sizes.
    #[must_use]
    pub fn new(original_bytes: usize, compressed_bytes: usize) -> Self {
        let ratio = if compressed_bytes > 0 {
            original_bytes as f64 / compressed_bytes as f64
        } else {
            0.0
        };
        let savings = if original_bytes > 0 {
            1.0 - (compressed_bytes as f64 / original_bytes as f64)
        } else {
            0.0
        };
        Self {
            original_bytes,
            compressed_bytes,
            ratio,
            savings,
        }
    }
}
