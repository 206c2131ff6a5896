// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::debug;
use crate::config::InMemoryQuota;
use super::traits::{SyncArea, StorageError};

/// In-process [`SyncArea`] that enforces the same quotas as the real store.
///
/// A `set` that would break any quota is rejected whole and leaves the
/// area unchanged.
pub struct InMemorySyncArea {
    data: DashMap<String, String>,
    quota: InMemoryQuota,
    /// Serializes mutations so quota checks see a stable total
    write_lock: Mutex<()>,
}

/// Size of one stored item as the quota counts it: key plus JSON-encoded value.
#[must_use]
pub fn item_bytes(key: &str, value: &str) -> usize {
    key.len() + serde_json::to_string(value).map_or(value.len() + 2, |s| s.len())
}

impl InMemorySyncArea {
    #[must_use]
    pub fn new() -> Self {
        Self::with_quota(InMemoryQuota::default())
    }

    #[must_use]
    pub fn with_quota(quota: InMemoryQuota) -> Self {
        Self {
            data: DashMap::new(),
            quota,
            write_lock: Mutex::new(()),
        }
    }

    /// Get current item count
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Total bytes in use as the quota counts them
    #[must_use]
    pub fn bytes_in_use(&self) -> usize {
        self.data
            .iter()
            .map(|r| item_bytes(r.key(), r.value()))
            .sum()
    }

    /// Sorted list of stored keys
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.data.iter().map(|r| r.key().clone()).collect();
        keys.sort();
        keys
    }

    /// Raw value for a key, bypassing the async interface
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<String> {
        self.data.get(key).map(|r| r.value().clone())
    }

    /// Overwrite a value without quota checks (simulates a remote device's write)
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.data.insert(key.to_string(), value.to_string());
    }

    /// Clear all items
    pub fn clear(&self) {
        self.data.clear();
    }

    fn check_quota(&self, items: &HashMap<String, String>) -> Result<(), StorageError> {
        for (key, value) in items {
            let bytes = item_bytes(key, value);
            if bytes > self.quota.bytes_per_item {
                return Err(StorageError::QuotaExceeded {
                    key: key.clone(),
                    quota: "QUOTA_BYTES_PER_ITEM",
                    needed: bytes,
                    limit: self.quota.bytes_per_item,
                });
            }
        }

        let new_keys = items.keys().filter(|k| !self.data.contains_key(*k)).count();
        let item_count = self.data.len() + new_keys;
        if item_count > self.quota.max_items {
            return Err(StorageError::QuotaExceeded {
                key: String::new(),
                quota: "MAX_ITEMS",
                needed: item_count,
                limit: self.quota.max_items,
            });
        }

        let untouched: usize = self
            .data
            .iter()
            .filter(|r| !items.contains_key(r.key()))
            .map(|r| item_bytes(r.key(), r.value()))
            .sum();
        let total = untouched + items.iter().map(|(k, v)| item_bytes(k, v)).sum::<usize>();
        if total > self.quota.total_bytes {
            return Err(StorageError::QuotaExceeded {
                key: String::new(),
                quota: "QUOTA_BYTES",
                needed: total,
                limit: self.quota.total_bytes,
            });
        }
        Ok(())
    }
}

impl Default for InMemorySyncArea {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SyncArea for InMemorySyncArea {
    async fn get(&self, keys: &[String]) -> Result<HashMap<String, String>, StorageError> {
        Ok(keys
            .iter()
            .filter_map(|k| self.data.get(k).map(|v| (k.clone(), v.value().clone())))
            .collect())
    }

    async fn set(&self, items: HashMap<String, String>) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock();
        self.check_quota(&items)?;
        debug!(count = items.len(), "sync area set");
        for (key, value) in items {
            self.data.insert(key, value);
        }
        Ok(())
    }

    async fn remove(&self, keys: &[String]) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock();
        for key in keys {
            self.data.remove(key);
        }
        Ok(())
    }
}
