// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Configuration for the sync store.
//!
//! # Example
//!
//! ```
//! use envswap_sync::SyncStoreConfig;
//!
//! // Defaults match the browser sync area
//! let config = SyncStoreConfig::default();
//! assert_eq!(config.max_buckets, 13);
//! assert_eq!(config.quota_bytes_per_item, 8_192);
//! assert_eq!(config.bucket_key(3), "bucket-3");
//!
//! // Smaller buckets, e.g. for tests
//! let config = SyncStoreConfig {
//!     quota_bytes_per_item: 1024,
//!     ..Default::default()
//! };
//! ```

use serde::Deserialize;

/// Maximum number of bucket keys the store reads and writes.
pub const MAX_BUCKETS: usize = 13;
/// Per-item byte ceiling of the browser sync area.
pub const QUOTA_BYTES_PER_ITEM: usize = 8_192;
/// Total byte ceiling of the browser sync area.
pub const QUOTA_BYTES: usize = 102_400;
/// Item count ceiling of the browser sync area.
pub const MAX_ITEMS: usize = 512;
/// Prefix for bucket keys (`bucket-0` .. `bucket-12`).
pub const BUCKET_KEY_PREFIX: &str = "bucket-";

/// Configuration for [`crate::SyncStore`].
///
/// All fields default to the limits of browser `storage.sync`.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncStoreConfig {
    /// Number of bucket slots (default: 13)
    #[serde(default = "default_max_buckets")]
    pub max_buckets: usize,

    /// Uncompressed byte ceiling per bucket (default: 8192)
    #[serde(default = "default_quota_bytes_per_item")]
    pub quota_bytes_per_item: usize,

    /// Bucket key prefix (default: "bucket-")
    #[serde(default = "default_bucket_key_prefix")]
    pub bucket_key_prefix: String,
}

fn default_max_buckets() -> usize { MAX_BUCKETS }
fn default_quota_bytes_per_item() -> usize { QUOTA_BYTES_PER_ITEM }
fn default_bucket_key_prefix() -> String { BUCKET_KEY_PREFIX.to_string() }

impl Default for SyncStoreConfig {
    fn default() -> Self {
        Self {
            max_buckets: default_max_buckets(),
            quota_bytes_per_item: default_quota_bytes_per_item(),
            bucket_key_prefix: default_bucket_key_prefix(),
        }
    }
}

impl SyncStoreConfig {
    /// Storage key for a bucket index.
    #[must_use]
    pub fn bucket_key(&self, index: usize) -> String {
        format!("{}{}", self.bucket_key_prefix, index)
    }

    /// Every bucket key, in index order.
    #[must_use]
    pub fn bucket_keys(&self) -> Vec<String> {
        (0..self.max_buckets).map(|i| self.bucket_key(i)).collect()
    }
}

/// Limits enforced by [`crate::storage::memory::InMemorySyncArea`].
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct InMemoryQuota {
    #[serde(default = "default_quota_bytes_per_item")]
    pub bytes_per_item: usize,
    #[serde(default = "default_total_bytes")]
    pub total_bytes: usize,
    #[serde(default = "default_max_items")]
    pub max_items: usize,
}

fn default_total_bytes() -> usize { QUOTA_BYTES }
fn default_max_items() -> usize { MAX_ITEMS }

impl Default for InMemoryQuota {
    fn default() -> Self {
        Self {
            bytes_per_item: default_quota_bytes_per_item(),
            total_bytes: default_total_bytes(),
            max_items: default_max_items(),
        }
    }
}
