// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Bucketed sync store.
//!
//! The [`SyncStore`] keeps every [`DomainConfig`] as an entry string, packs the
//! full entry set into at most `max_buckets` size-capped buckets, and writes
//! each bucket compressed under its own key (`bucket-0`, `bucket-1`, ...).
//!
//! Every mutation is a read-modify-write of the whole entry set:
//!
//! ```text
//! get(all bucket keys) → decompress → edit entries → distribute → compress
//!                      → set(used keys) + remove(unused keys)
//! ```
//!
//! # Consistency
//!
//! The backing area has no transactions. Two writers racing on the same
//! entry set lose one update (last `set` wins), and a failure between the
//! `set` and the `remove` can leave stale buckets behind. Nothing is rolled
//! back; the next read reflects whatever landed.
//!
//! # Example
//!
//! ```rust
//! use envswap_sync::{DomainConfig, Environment, Hostnames, SyncStore, SyncStoreConfig};
//! use envswap_sync::storage::memory::InMemorySyncArea;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let store = SyncStore::new(InMemorySyncArea::new(), SyncStoreConfig::default());
//! let config = DomainConfig::new(
//!     vec![
//!         Environment::positional_default(0, false),
//!         Environment::positional_default(1, true),
//!     ],
//!     Hostnames::Shared("example.".into()),
//! );
//!
//! store.write_config("example.", &config).await.unwrap();
//! assert_eq!(store.find_config("example.").await.unwrap(), Some(config));
//! # }
//! ```

use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::compression::{self, CompressionError};
use crate::config::SyncStoreConfig;
use crate::entry::{self, EntryError};
use crate::model::DomainConfig;
use crate::packer::{self, PackError};
use crate::storage::traits::{StorageError, SyncArea};

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("invalid entry: {0}")]
    Entry(#[from] EntryError),
    #[error("corrupt bucket '{key}': {source}")]
    CorruptBucket {
        key: String,
        #[source]
        source: CompressionError,
    },
    #[error("bucket compression failed: {0}")]
    Compression(#[from] CompressionError),
    #[error(transparent)]
    Pack(#[from] PackError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("entry set needs {required} buckets, only {max} are available")]
    CapacityExceeded { required: usize, max: usize },
}

/// One populated bucket slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub index: usize,
    pub entries: Vec<String>,
}

/// Snapshot of how much of the bucket space is in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreUsage {
    /// Bucket keys currently present
    pub buckets: usize,
    /// Entries across all buckets
    pub entries: usize,
    /// Bytes of stored (compressed, base64) values
    pub stored_bytes: usize,
    /// Bytes of the same buckets as uncompressed JSON
    pub uncompressed_bytes: usize,
    pub max_buckets: usize,
}

/// Store for domain configs over a quota-limited [`SyncArea`].
pub struct SyncStore<A> {
    area: A,
    config: SyncStoreConfig,
}

impl<A: SyncArea> SyncStore<A> {
    pub fn new(area: A, config: SyncStoreConfig) -> Self {
        Self { area, config }
    }

    /// The backing area.
    pub fn area(&self) -> &A {
        &self.area
    }

    pub fn config(&self) -> &SyncStoreConfig {
        &self.config
    }

    async fn fetch_raw(&self) -> Result<Vec<(usize, String)>, SyncError> {
        let keys = self.config.bucket_keys();
        let mut data = self.area.get(&keys).await?;
        Ok(keys
            .iter()
            .enumerate()
            .filter_map(|(i, key)| data.remove(key).map(|value| (i, value)))
            .collect())
    }

    /// Read and decompress every present bucket, in index order.
    #[instrument(skip(self))]
    pub async fn read_buckets(&self) -> Result<Vec<Bucket>, SyncError> {
        let mut buckets = Vec::new();
        for (index, value) in self.fetch_raw().await? {
            let entries = compression::decompress(&value).map_err(|source| {
                crate::metrics::record_decode_failure("bucket");
                warn!(index, error = %source, "bucket failed to decode");
                SyncError::CorruptBucket {
                    key: self.config.bucket_key(index),
                    source,
                }
            })?;
            buckets.push(Bucket { index, entries });
        }
        debug!(buckets = buckets.len(), "read buckets");
        Ok(buckets)
    }

    /// All entries, in bucket then intra-bucket order.
    pub async fn collect_all_entries(&self) -> Result<Vec<String>, SyncError> {
        let _timer = crate::metrics::LatencyTimer::new("collect");
        let entries: Vec<String> = self
            .read_buckets()
            .await?
            .into_iter()
            .flat_map(|b| b.entries)
            .collect();
        crate::metrics::set_entry_count(entries.len());
        Ok(entries)
    }

    /// The first config whose hostnames contain `hostname`.
    ///
    /// Linear in the number of stored entries. A malformed entry fails the
    /// lookup rather than being skipped.
    #[instrument(skip(self))]
    pub async fn find_config(&self, hostname: &str) -> Result<Option<DomainConfig>, SyncError> {
        let _timer = crate::metrics::LatencyTimer::new("find");
        for entry in self.collect_all_entries().await? {
            let config = decode(&entry)?;
            if config.hostnames.contains(hostname) {
                crate::metrics::record_operation("find", "success");
                return Ok(Some(config));
            }
        }
        crate::metrics::record_operation("find", "not_found");
        Ok(None)
    }

    /// Every stored config, in storage order.
    pub async fn list_configs(&self) -> Result<Vec<DomainConfig>, SyncError> {
        let configs = self
            .collect_all_entries()
            .await?
            .iter()
            .map(|entry| decode(entry))
            .collect::<Result<Vec<_>, _>>()?;
        crate::metrics::record_operation("list", "success");
        Ok(configs)
    }

    /// Insert or replace the config stored under `hostname`.
    ///
    /// The first existing entry that contains `hostname`, or shares any
    /// hostname with `config`, is replaced in place; further matches are
    /// dropped so no two entries share a hostname. With no match the entry is
    /// appended. The whole entry set is then repacked and rewritten.
    ///
    /// Fails with [`SyncError::CapacityExceeded`] without touching storage if
    /// the result needs more than `max_buckets` buckets.
    #[instrument(skip(self, config))]
    pub async fn write_config(&self, hostname: &str, config: &DomainConfig) -> Result<(), SyncError> {
        let _timer = crate::metrics::LatencyTimer::new("write");
        let new_entry = entry::serialize(config)?;
        let buckets = self.read_buckets().await?;
        let previous = buckets.len();

        let mut updated = Vec::new();
        let mut replaced = false;
        for existing in buckets.into_iter().flat_map(|b| b.entries) {
            let hostnames = decode(&existing)?.hostnames;
            if hostnames.contains(hostname) || hostnames.overlaps(&config.hostnames) {
                if !replaced {
                    updated.push(new_entry.clone());
                    replaced = true;
                } else {
                    debug!(entry = %existing, "dropping duplicate entry for hostname");
                }
            } else {
                updated.push(existing);
            }
        }
        if !replaced {
            updated.push(new_entry);
        }

        let result = self.write_buckets(&updated, previous).await;
        crate::metrics::record_operation("write", status(&result));
        result?;
        debug!(replaced, entries = updated.len(), "config written");
        Ok(())
    }

    /// Remove every config whose hostnames contain `hostname`.
    ///
    /// Returns `false` (and writes nothing) if no entry matched.
    #[instrument(skip(self))]
    pub async fn remove_config(&self, hostname: &str) -> Result<bool, SyncError> {
        let _timer = crate::metrics::LatencyTimer::new("remove");
        let buckets = self.read_buckets().await?;
        let previous = buckets.len();
        let all: Vec<String> = buckets.into_iter().flat_map(|b| b.entries).collect();

        let mut filtered = Vec::with_capacity(all.len());
        for existing in &all {
            if !decode(existing)?.hostnames.contains(hostname) {
                filtered.push(existing.clone());
            }
        }

        if filtered.len() == all.len() {
            crate::metrics::record_operation("remove", "noop");
            return Ok(false);
        }

        let result = if filtered.is_empty() {
            self.clear_buckets().await
        } else {
            self.write_buckets(&filtered, previous).await
        };
        crate::metrics::record_operation("remove", status(&result));
        result?;
        debug!(removed = all.len() - filtered.len(), "config removed");
        Ok(true)
    }

    /// Bucket space currently in use.
    pub async fn usage(&self) -> Result<StoreUsage, SyncError> {
        let mut usage = StoreUsage {
            buckets: 0,
            entries: 0,
            stored_bytes: 0,
            uncompressed_bytes: 0,
            max_buckets: self.config.max_buckets,
        };
        for (index, value) in self.fetch_raw().await? {
            let entries = compression::decompress(&value).map_err(|source| SyncError::CorruptBucket {
                key: self.config.bucket_key(index),
                source,
            })?;
            usage.buckets += 1;
            usage.entries += entries.len();
            usage.stored_bytes += value.len();
            usage.uncompressed_bytes += packer::encoded_size(&entries);
        }
        Ok(usage)
    }

    /// Repack `entries` and rewrite every bucket key.
    async fn write_buckets(&self, entries: &[String], previous: usize) -> Result<(), SyncError> {
        let max = self.config.max_buckets;
        let distributed = packer::distribute(entries, self.config.quota_bytes_per_item)?;
        if distributed.len() > max {
            crate::metrics::record_capacity_overflow(distributed.len());
            warn!(required = distributed.len(), max, "entry set exceeds bucket capacity");
            return Err(SyncError::CapacityExceeded {
                required: distributed.len(),
                max,
            });
        }

        let mut items = HashMap::with_capacity(distributed.len());
        for (i, bucket) in distributed.iter().enumerate() {
            let (value, stats) = compression::compress_with_stats(bucket)?;
            crate::metrics::record_bucket_bytes(stats.original_bytes, stats.compressed_bytes);
            items.insert(self.config.bucket_key(i), value);
        }

        let stale: Vec<String> = (distributed.len()..max)
            .map(|i| self.config.bucket_key(i))
            .collect();

        if distributed.len() < previous {
            info!(from = previous, to = distributed.len(), "bucket set shrank");
        }

        if stale.is_empty() {
            self.area.set(items).await?;
        } else {
            // both requests run to completion even if one fails
            let (set, removed) = tokio::join!(self.area.set(items), self.area.remove(&stale));
            set?;
            removed?;
        }
        crate::metrics::set_bucket_count(distributed.len());
        crate::metrics::set_entry_count(entries.len());
        Ok(())
    }

    async fn clear_buckets(&self) -> Result<(), SyncError> {
        self.area.remove(&self.config.bucket_keys()).await?;
        crate::metrics::set_bucket_count(0);
        crate::metrics::set_entry_count(0);
        info!("all buckets removed");
        Ok(())
    }
}

fn decode(entry: &str) -> Result<DomainConfig, SyncError> {
    entry::deserialize(entry).map_err(|e| {
        crate::metrics::record_decode_failure("entry");
        warn!(error = %e, "stored entry failed to decode");
        SyncError::Entry(e)
    })
}

fn status<T>(result: &Result<T, SyncError>) -> &'static str {
    if result.is_ok() { "success" } else { "error" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Environment, Hostnames};
    use crate::storage::memory::InMemorySyncArea;

    fn config_for(base: &str) -> DomainConfig {
        DomainConfig::new(
            vec![
                Environment::positional_default(0, false),
                Environment::positional_default(1, true),
            ],
            Hostnames::Shared(format!("{base}.")),
        )
    }

    /// Config whose entry is roughly `title_len` bytes long.
    fn padded_config(base: &str, title_len: usize) -> DomainConfig {
        let mut config = config_for(base);
        config.environments[0].title = format!("{base}-{}", "t".repeat(title_len));
        config
    }

    fn store() -> SyncStore<InMemorySyncArea> {
        SyncStore::new(InMemorySyncArea::new(), SyncStoreConfig::default())
    }

    fn small_store(quota: usize, max_buckets: usize) -> SyncStore<InMemorySyncArea> {
        SyncStore::new(
            InMemorySyncArea::new(),
            SyncStoreConfig {
                quota_bytes_per_item: quota,
                max_buckets,
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn test_empty_store() {
        let store = store();
        assert!(store.read_buckets().await.unwrap().is_empty());
        assert!(store.collect_all_entries().await.unwrap().is_empty());
        assert_eq!(store.find_config("example.").await.unwrap(), None);
        assert!(store.list_configs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_write_then_find() {
        let store = store();
        let config = config_for("example");
        store.write_config("example.", &config).await.unwrap();

        assert_eq!(store.find_config("example.").await.unwrap(), Some(config));
        assert_eq!(store.find_config("other.").await.unwrap(), None);
        assert_eq!(store.area().keys(), vec!["bucket-0".to_string()]);
    }

    #[tokio::test]
    async fn test_write_replaces_in_place() {
        let store = store();
        store.write_config("a.", &config_for("a")).await.unwrap();
        store.write_config("b.", &config_for("b")).await.unwrap();
        store.write_config("c.", &config_for("c")).await.unwrap();

        let mut updated = config_for("b");
        updated.environments[0].port = 3000;
        store.write_config("b.", &updated).await.unwrap();

        let configs = store.list_configs().await.unwrap();
        assert_eq!(configs.len(), 3);
        assert_eq!(configs[1], updated);
        assert_eq!(configs[0], config_for("a"));
        assert_eq!(configs[2], config_for("c"));
    }

    #[tokio::test]
    async fn test_write_divergent_replaces_overlapping_entry() {
        let store = store();
        store.write_config("app-dev.", &config_for("app-dev")).await.unwrap();

        let mut divergent = config_for("app");
        divergent.hostnames = Hostnames::Divergent {
            prod: "app.".into(),
            local: "app-dev.".into(),
        };
        store.write_config("app.", &divergent).await.unwrap();

        let entries = store.collect_all_entries().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(store.find_config("app-dev.").await.unwrap(), Some(divergent.clone()));
        assert_eq!(store.find_config("app.").await.unwrap(), Some(divergent));
    }

    #[tokio::test]
    async fn test_remove() {
        let store = store();
        store.write_config("first.", &config_for("first")).await.unwrap();
        store.write_config("second.", &config_for("second")).await.unwrap();

        assert!(store.remove_config("first.").await.unwrap());

        let entries = store.collect_all_entries().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entry::deserialize(&entries[0]).unwrap(), config_for("second"));
        assert_eq!(store.find_config("first.").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_remove_missing_is_noop() {
        let store = store();
        store.write_config("a.", &config_for("a")).await.unwrap();
        let before = store.area().raw("bucket-0");

        assert!(!store.remove_config("missing.").await.unwrap());
        assert_eq!(store.area().raw("bucket-0"), before);
    }

    #[tokio::test]
    async fn test_remove_last_clears_all_keys() {
        let store = store();
        store.write_config("only.", &config_for("only")).await.unwrap();
        assert!(store.remove_config("only.").await.unwrap());
        assert!(store.area().is_empty());
    }

    #[tokio::test]
    async fn test_bucket_set_grows_and_shrinks() {
        // Each entry costs ~234 bytes, so 4 fit in a 1 KiB bucket
        let store = small_store(1024, 13);
        for i in 0..12 {
            let base = format!("site{i:02}");
            store.write_config(&format!("{base}."), &padded_config(&base, 200)).await.unwrap();
        }
        let grown = store.area().keys().len();
        assert!(grown >= 3, "expected several buckets, got {grown}");

        for bucket in store.read_buckets().await.unwrap() {
            assert!(packer::encoded_size(&bucket.entries) <= 1024);
        }

        for i in 0..11 {
            store.remove_config(&format!("site{i:02}.")).await.unwrap();
        }
        assert_eq!(store.area().keys(), vec!["bucket-0".to_string()]);
        assert_eq!(store.collect_all_entries().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_capacity_overflow_leaves_storage_untouched() {
        let store = small_store(600, 2);
        let mut written = 0;
        let err = loop {
            let base = format!("site{written:02}");
            match store.write_config(&format!("{base}."), &padded_config(&base, 200)).await {
                Ok(()) => written += 1,
                Err(e) => break e,
            }
            assert!(written < 50, "capacity never exceeded");
        };

        assert!(matches!(err, SyncError::CapacityExceeded { required: 3, max: 2 }));
        assert_eq!(store.collect_all_entries().await.unwrap().len(), written);
        assert_eq!(store.area().len(), 2);
    }

    #[tokio::test]
    async fn test_oversized_entry_rejected() {
        let store = small_store(256, 13);
        let err = store
            .write_config("big.", &padded_config("big", 400))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Pack(PackError::EntryTooLarge { .. })));
        assert!(store.area().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_bucket_surfaces_error() {
        let store = store();
        store.write_config("a.", &config_for("a")).await.unwrap();
        store.area().insert_raw("bucket-1", "@@not base64@@");

        let err = store.find_config("a.").await.unwrap_err();
        assert!(matches!(err, SyncError::CorruptBucket { ref key, .. } if key == "bucket-1"));
    }

    #[tokio::test]
    async fn test_malformed_entry_surfaces_error() {
        let store = store();
        let value = compression::compress(&["9|2|00001000|0|||x.".to_string()]).unwrap();
        store.area().insert_raw("bucket-0", &value);

        let err = store.find_config("x.").await.unwrap_err();
        assert!(matches!(err, SyncError::Entry(EntryError::UnsupportedVersion(_))));
        assert!(store.write_config("y.", &config_for("y")).await.is_err());
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_before_read() {
        let store = store();
        let mut config = config_for("a");
        config.environments[0].title = "bad|title".into();
        let err = store.write_config("a.", &config).await.unwrap_err();
        assert!(matches!(err, SyncError::Entry(EntryError::ReservedCharacter { .. })));
    }

    #[tokio::test]
    async fn test_usage() {
        let store = small_store(1024, 13);
        let empty = store.usage().await.unwrap();
        assert_eq!(empty.buckets, 0);
        assert_eq!(empty.max_buckets, 13);

        for i in 0..6 {
            let base = format!("site{i}");
            store.write_config(&format!("{base}."), &padded_config(&base, 200)).await.unwrap();
        }
        let usage = store.usage().await.unwrap();
        assert_eq!(usage.entries, 6);
        assert_eq!(usage.buckets, store.area().len());
        assert!(usage.uncompressed_bytes <= usage.buckets * 1024);
        assert!(usage.stored_bytes > 0);
    }

    #[tokio::test]
    async fn test_custom_key_prefix() {
        let store = SyncStore::new(
            InMemorySyncArea::new(),
            SyncStoreConfig {
                bucket_key_prefix: "b".into(),
                ..Default::default()
            },
        );
        store.write_config("a.", &config_for("a")).await.unwrap();
        assert_eq!(store.area().keys(), vec!["b0".to_string()]);
    }
}
