// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Size-bounded bucket packing.
//!
//! [`distribute`] walks entries in order and closes the current bucket as
//! soon as the next entry would push its uncompressed JSON encoding past the
//! quota. Entries are never reordered or split, and the result depends only
//! on the input order and quota.
//!
//! # Example
//!
//! ```
//! use envswap_sync::packer::{distribute, encoded_size};
//!
//! let entries: Vec<String> = (0..10).map(|i| format!("entry-{i}")).collect();
//! let buckets = distribute(&entries, 40).unwrap();
//!
//! assert!(buckets.iter().all(|b| encoded_size(b) <= 40));
//! assert_eq!(buckets.concat(), entries);
//! ```

use thiserror::Error;

/// Encoded size of an empty JSON array (`[]`).
pub const ARRAY_OVERHEAD: usize = 2;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PackError {
    #[error("entry {index} needs {size} bytes, more than the {quota} byte bucket quota allows")]
    EntryTooLarge { index: usize, size: usize, quota: usize },
}

/// JSON-encoded length of one entry plus its separator.
#[must_use]
pub fn entry_cost(entry: &str) -> usize {
    // serde_json only fails on non-string map keys, never for a &str
    serde_json::to_string(entry).map_or(entry.len() + 2, |s| s.len()) + 1
}

/// Exact uncompressed JSON size of a bucket.
#[must_use]
pub fn encoded_size(entries: &[String]) -> usize {
    serde_json::to_vec(entries).map_or(0, |v| v.len())
}

/// Bucket under construction.
#[derive(Debug, Default)]
struct OpenBucket {
    entries: Vec<String>,
    /// Running size estimate, starting at [`ARRAY_OVERHEAD`]
    size: usize,
}

impl OpenBucket {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            size: ARRAY_OVERHEAD,
        }
    }

    fn push(&mut self, entry: String, cost: usize) {
        self.entries.push(entry);
        self.size += cost;
    }
}

/// Pack entries into buckets whose encoded size stays within `quota`.
///
/// The running size is an upper bound: it counts a separator for every entry
/// while the encoding only has `n - 1` of them. An entry that cannot fit even
/// in an empty bucket is an error; it is never dropped. No entries yields no
/// buckets.
pub fn distribute(entries: &[String], quota: usize) -> Result<Vec<Vec<String>>, PackError> {
    let mut buckets = Vec::new();
    let mut current = OpenBucket::new();

    for (index, entry) in entries.iter().enumerate() {
        let cost = entry_cost(entry);
        if ARRAY_OVERHEAD + cost > quota {
            return Err(PackError::EntryTooLarge {
                index,
                size: ARRAY_OVERHEAD + cost,
                quota,
            });
        }

        if current.size + cost > quota {
            buckets.push(std::mem::replace(&mut current, OpenBucket::new()).entries);
        }
        current.push(entry.clone(), cost);
    }

    if !current.entries.is_empty() {
        buckets.push(current.entries);
    }
    Ok(buckets)
}
