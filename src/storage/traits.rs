// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Quota exceeded for '{key}': {needed} bytes needed, {limit} allowed ({quota})")]
    QuotaExceeded {
        key: String,
        quota: &'static str,
        needed: usize,
        limit: usize,
    },
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// A replicated, quota-limited key-value area (the browser's `storage.sync`).
///
/// Values are opaque strings. There is no multi-key atomicity and no
/// versioning: every call stands alone and the last `set` for a key wins.
#[async_trait]
pub trait SyncArea: Send + Sync {
    /// Fetch the given keys. Missing keys are absent from the returned map.
    async fn get(&self, keys: &[String]) -> Result<HashMap<String, String>, StorageError>;

    /// Store every key/value pair.
    async fn set(&self, items: HashMap<String, String>) -> Result<(), StorageError>;

    /// Delete the given keys. Missing keys are ignored.
    async fn remove(&self, keys: &[String]) -> Result<(), StorageError>;
}

#[async_trait]
impl<T: SyncArea + ?Sized> SyncArea for std::sync::Arc<T> {
    async fn get(&self, keys: &[String]) -> Result<HashMap<String, String>, StorageError> {
        (**self).get(keys).await
    }

    async fn set(&self, items: HashMap<String, String>) -> Result<(), StorageError> {
        (**self).set(items).await
    }

    async fn remove(&self, keys: &[String]) -> Result<(), StorageError> {
        (**self).remove(keys).await
    }
}
