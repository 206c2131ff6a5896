// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Two-tier settings access: session cache in front of the sync store.
//!
//! ```text
//! get(key) ──► SessionCache ──hit──► settings
//!                  │miss
//!                  ▼
//!            SyncStore::find_config("key.") ──► from_config ──► fill cache
//!
//! save(key) ──► SyncStore::write_config ──► SessionCache (write)
//! remove(key) ─► SessionCache (evict key + aliases) + SyncStore::remove_config
//! ```
//!
//! The session cache only learns about changes made through this instance.
//! Edits synced in from another device are not seen until the cached entry is
//! overwritten locally or the process restarts.

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::cache::SessionCache;
use crate::model::{
    DomainConfig, DomainSettings, Environment, Hostnames, Protocol, LOCAL_INDEX, PRODUCTION_INDEX,
};
use crate::storage::traits::SyncArea;
use crate::store::{SyncError, SyncStore};

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error("'{key}' is neither the production nor the local hostname of these settings")]
    KeyNotInHostnames { key: String },
    #[error("settings for '{key}' set only one of the production and local hostnames")]
    IncompleteHostnames { key: String },
    #[error("config for '{hostname}' has {count} environment(s), settings need at least 2")]
    TooFewEnvironments { hostname: String, count: usize },
}

/// Canonical stored hostname for a domain base (`example` → `example.`).
#[must_use]
pub fn to_sync_hostname(domain_base: &str) -> String {
    format!("{domain_base}.")
}

/// Domain base for a stored hostname (`example.` → `example`).
#[must_use]
pub fn from_sync_hostname(hostname: &str) -> &str {
    hostname.strip_suffix('.').unwrap_or(hostname)
}

fn environment(index: usize, tld: &str, protocol: Protocol) -> Environment {
    let mut env = Environment::positional_default(index, protocol.is_tls());
    env.tld = tld.to_string();
    env
}

/// Map UI settings for `key` to a stored config.
///
/// Settings with distinct production and local hostnames produce a divergent
/// config, in which case `key` must be one of the two. Identical hostnames
/// must equal `key` and normalize to a shared config, so they read back as
/// `None`. Setting only one of the two is an error.
pub fn to_config(key: &str, settings: &DomainSettings) -> Result<DomainConfig, SettingsError> {
    let environments = vec![
        environment(LOCAL_INDEX, &settings.local_tld, settings.local_protocol),
        environment(PRODUCTION_INDEX, &settings.prod_tld, settings.prod_protocol),
    ];

    let hostnames = match (&settings.prod_hostname, &settings.local_hostname) {
        (None, None) => Hostnames::Shared(to_sync_hostname(key)),
        (Some(prod), Some(local)) if prod == local => {
            if key != prod {
                return Err(SettingsError::KeyNotInHostnames { key: key.to_string() });
            }
            Hostnames::Shared(to_sync_hostname(key))
        }
        (Some(prod), Some(local)) => {
            if key != prod && key != local {
                return Err(SettingsError::KeyNotInHostnames { key: key.to_string() });
            }
            Hostnames::Divergent {
                prod: to_sync_hostname(prod),
                local: to_sync_hostname(local),
            }
        }
        (Some(_), None) | (None, Some(_)) => {
            return Err(SettingsError::IncompleteHostnames { key: key.to_string() });
        }
    };

    Ok(DomainConfig::new(environments, hostnames))
}

/// Project a stored config onto UI settings.
///
/// Environments past the first two are not represented.
pub fn from_config(config: &DomainConfig) -> Result<DomainSettings, SettingsError> {
    let (Some(local), Some(prod)) = (
        config.environments.get(LOCAL_INDEX),
        config.environments.get(PRODUCTION_INDEX),
    ) else {
        return Err(SettingsError::TooFewEnvironments {
            hostname: config.hostnames.primary().to_string(),
            count: config.env_count(),
        });
    };

    let mut settings = DomainSettings::new(
        prod.tld.clone(),
        local.tld.clone(),
        Protocol::from_tls(prod.tls),
        Protocol::from_tls(local.tls),
    );
    if let Hostnames::Divergent { prod, local } = &config.hostnames {
        settings.prod_hostname = Some(from_sync_hostname(prod).to_string());
        settings.local_hostname = Some(from_sync_hostname(local).to_string());
    }
    Ok(settings)
}

/// Read-through, write-through settings access.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use envswap_sync::{DomainSettings, Protocol, SessionCache, SettingsCache, SyncStore, SyncStoreConfig};
/// use envswap_sync::storage::memory::InMemorySyncArea;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let session = Arc::new(SessionCache::new());
/// let store = SyncStore::new(InMemorySyncArea::new(), SyncStoreConfig::default());
/// let settings = SettingsCache::new(session, store);
///
/// let example = DomainSettings::new(".com", ".test", Protocol::Https, Protocol::Http);
/// settings.save("example", example.clone()).await.unwrap();
/// assert_eq!(settings.get("example").await.unwrap(), Some(example));
/// # }
/// ```
pub struct SettingsCache<A> {
    session: Arc<SessionCache>,
    store: SyncStore<A>,
}

impl<A: SyncArea> SettingsCache<A> {
    pub fn new(session: Arc<SessionCache>, store: SyncStore<A>) -> Self {
        Self { session, store }
    }

    pub fn session(&self) -> &SessionCache {
        &self.session
    }

    pub fn store(&self) -> &SyncStore<A> {
        &self.store
    }

    fn fill(&self, key: &str, settings: &DomainSettings) {
        self.session.insert(key, settings.clone());
        for alias in settings.aliases() {
            if alias != key {
                self.session.insert(alias, settings.clone());
            }
        }
    }

    /// Settings for a domain base, from the session cache if present.
    #[instrument(skip(self))]
    pub async fn get(&self, key: &str) -> Result<Option<DomainSettings>, SettingsError> {
        if let Some(settings) = self.session.get(key) {
            crate::metrics::record_lookup("session", true);
            debug!("session hit");
            return Ok(Some(settings));
        }
        crate::metrics::record_lookup("session", false);

        let Some(config) = self.store.find_config(&to_sync_hostname(key)).await? else {
            crate::metrics::record_lookup("sync", false);
            debug!("not stored");
            return Ok(None);
        };
        crate::metrics::record_lookup("sync", true);

        let settings = from_config(&config)?;
        self.fill(key, &settings);
        debug!("sync hit, cached");
        Ok(Some(settings))
    }

    /// Save settings for a domain base to both tiers.
    ///
    /// Settings the store refuses (reserved characters, too large, out of
    /// bucket space) leave both tiers untouched. If the backing area itself
    /// fails, the session keeps the new value and the error is returned.
    #[instrument(skip(self, settings))]
    pub async fn save(&self, key: &str, settings: DomainSettings) -> Result<(), SettingsError> {
        let config = to_config(key, &settings)?;
        let result = self.store.write_config(&to_sync_hostname(key), &config).await;
        match &result {
            Ok(()) | Err(SyncError::Storage(_)) => {
                self.session.remove_related(key);
                self.fill(key, &settings);
            }
            Err(e) => debug!(error = %e, "save rejected, session untouched"),
        }
        result?;
        Ok(())
    }

    /// Remove settings for a domain base (and its aliases) from both tiers.
    ///
    /// Returns whether the store held a matching config.
    #[instrument(skip(self))]
    pub async fn remove(&self, key: &str) -> Result<bool, SettingsError> {
        let evicted = self.session.remove_related(key);
        debug!(evicted, "session entries evicted");
        Ok(self.store.remove_config(&to_sync_hostname(key)).await?)
    }

    /// Every stored domain with its settings, keyed by primary domain base.
    ///
    /// Reads the store directly; the session cache is not consulted.
    pub async fn list_all(&self) -> Result<Vec<(String, DomainSettings)>, SettingsError> {
        self.store
            .list_configs()
            .await?
            .iter()
            .map(|config| {
                let base = from_sync_hostname(config.hostnames.primary()).to_string();
                from_config(config).map(|settings| (base, settings))
            })
            .collect()
    }
}
