// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! # envswap-sync
//!
//! Quota-constrained synchronized storage for per-domain environment configs.
//!
//! Each domain the user configures gets a [`DomainConfig`]: a handful of
//! environments (Local, Production, ...) with their TLD, protocol, port and
//! title. Configs are kept in a replicated key-value area that caps every
//! value at a few kilobytes and the number of keys at a few hundred, so the
//! store packs them tightly:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  SettingsCache (two tiers)                  │
//! │  • SessionCache hit → return                               │
//! │  • miss → SyncStore lookup → fill SessionCache             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         SyncStore                           │
//! │  • one entry string per config (entry codec)               │
//! │  • full entry set repacked on every write (packer)         │
//! │  • each bucket JSON → deflate → base64 (compression)       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │             SyncArea: bucket-0 … bucket-12                  │
//! │  • per-item byte quota, no transactions, last write wins   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use envswap_sync::{DomainSettings, Protocol, SessionCache, SettingsCache, SyncStore, SyncStoreConfig};
//! use envswap_sync::storage::memory::InMemorySyncArea;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), envswap_sync::SettingsError> {
//! let store = SyncStore::new(InMemorySyncArea::new(), SyncStoreConfig::default());
//! let settings = SettingsCache::new(Arc::new(SessionCache::new()), store);
//!
//! settings
//!     .save("example", DomainSettings::new(".com", ".test", Protocol::Https, Protocol::Http))
//!     .await?;
//!
//! let found = settings.get("example").await?.expect("saved above");
//! assert_eq!(found.local_tld, ".test");
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`model`]: environments, configs and the UI-facing settings
//! - [`entry`]: config ⇄ delimited entry string
//! - [`compression`]: bucket ⇄ compressed text value
//! - [`packer`]: size-bounded bucket packing
//! - [`storage`]: the [`SyncArea`] seam and an in-memory implementation
//! - [`store`]: the bucketed [`SyncStore`]
//! - [`cache`] / [`settings`]: the two-tier read/write path
//! - [`metrics`]: metrics facade instrumentation

pub mod config;
pub mod model;
pub mod entry;
pub mod compression;
pub mod packer;
pub mod storage;
pub mod store;
pub mod cache;
pub mod settings;
pub mod metrics;

pub use config::{SyncStoreConfig, InMemoryQuota, MAX_BUCKETS, QUOTA_BYTES_PER_ITEM};
pub use model::{DomainConfig, DomainSettings, Environment, Hostnames, Protocol};
pub use entry::EntryError;
pub use compression::{CompressionError, CompressionStats};
pub use packer::PackError;
pub use storage::traits::{SyncArea, StorageError};
pub use store::{SyncStore, SyncError, Bucket, StoreUsage};
pub use cache::SessionCache;
pub use settings::{SettingsCache, SettingsError};
pub use metrics::LatencyTimer;
