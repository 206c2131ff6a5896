// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Session cache: the fast, process-scoped tier in front of the sync store.
//!
//! Created once per process and handed to [`crate::SettingsCache`]. Nothing
//! is replicated and nothing survives a restart.

use dashmap::DashMap;
use crate::model::DomainSettings;

/// Process-scoped map from domain base (or alias) to settings.
#[derive(Debug, Default)]
pub struct SessionCache {
    entries: DashMap<String, DomainSettings>,
}

impl SessionCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<DomainSettings> {
        self.entries.get(key).map(|r| r.value().clone())
    }

    pub fn insert(&self, key: impl Into<String>, settings: DomainSettings) {
        self.entries.insert(key.into(), settings);
    }

    pub fn remove(&self, key: &str) -> Option<DomainSettings> {
        self.entries.remove(key).map(|(_, v)| v)
    }

    /// Remove `key` and every entry whose settings list `key` as an alias,
    /// plus that entry's own aliases. Returns how many entries were dropped.
    pub fn remove_related(&self, key: &str) -> usize {
        let mut doomed: Vec<String> = vec![key.to_string()];
        for entry in self.entries.iter() {
            let aliases = entry.value().aliases();
            if entry.key() == key || aliases.contains(&key) {
                doomed.push(entry.key().clone());
                doomed.extend(aliases.into_iter().map(str::to_string));
            }
        }
        doomed.sort();
        doomed.dedup();
        doomed
            .iter()
            .filter(|k| self.entries.remove(k.as_str()).is_some())
            .count()
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Protocol;

    #[test]
    fn test_insert_get_remove() {
        let cache = SessionCache::new();
        let settings = DomainSettings::new(".com", ".test", Protocol::Https, Protocol::Http);

        cache.insert("example", settings.clone());
        assert_eq!(cache.get("example"), Some(settings.clone()));
        assert!(cache.contains("example"));
        assert_eq!(cache.len(), 1);

        assert_eq!(cache.remove("example"), Some(settings));
        assert!(cache.get("example").is_none());
        assert!(cache.remove("example").is_none());
    }

    #[test]
    fn test_remove_related() {
        let cache = SessionCache::new();
        let mut divergent = DomainSettings::new(".com", ".test", Protocol::Https, Protocol::Http);
        divergent.prod_hostname = Some("app".into());
        divergent.local_hostname = Some("app-dev".into());

        cache.insert("app", divergent.clone());
        cache.insert("app-dev", divergent);
        cache.insert(
            "other",
            DomainSettings::new(".com", ".test", Protocol::Https, Protocol::Http),
        );

        // Removing by one alias drops the whole group
        assert_eq!(cache.remove_related("app-dev"), 2);
        assert!(!cache.contains("app"));
        assert!(cache.contains("other"));
        assert_eq!(cache.remove_related("missing"), 0);
    }

    #[test]
    fn test_clear() {
        let cache = SessionCache::new();
        for i in 0..5 {
            cache.insert(
                format!("site-{i}"),
                DomainSettings::new(".com", ".test", Protocol::Https, Protocol::Http),
            );
        }
        assert_eq!(cache.len(), 5);
        cache.clear();
        assert!(cache.is_empty());
    }
}
