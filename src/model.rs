// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Domain configuration records.
//!
//! A [`DomainConfig`] holds the environments (Local, Production, ...) a user
//! saved for one domain, plus the hostname(s) the record is looked up by.
//! [`DomainSettings`] is the narrower projection the UI works with.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default TLDs by environment position. Positions past the end use `.com`.
pub const DEFAULT_TLDS: [&str; 3] = [".test", ".com", ".com"];

/// Default titles by environment position. Positions past the end use
/// `Environment {n}`.
pub const DEFAULT_TITLES: [&str; 2] = ["Local", "Production"];

/// Index of the local environment inside a two-environment config.
pub const LOCAL_INDEX: usize = 0;
/// Index of the production environment inside a two-environment config.
pub const PRODUCTION_INDEX: usize = 1;

/// Default TLD for the environment at `index`.
#[must_use]
pub fn default_tld(index: usize) -> &'static str {
    DEFAULT_TLDS.get(index).copied().unwrap_or(".com")
}

/// Default title for the environment at `index`.
#[must_use]
pub fn default_title(index: usize) -> String {
    DEFAULT_TITLES
        .get(index)
        .map(|t| (*t).to_string())
        .unwrap_or_else(|| format!("Environment {}", index + 1))
}

/// Default port for a protocol.
#[inline]
#[must_use]
pub fn default_port(tls: bool) -> u16 {
    if tls { 443 } else { 80 }
}

/// One deployment target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub tls: bool,
    /// TLD with its leading dot (e.g. `.test`)
    pub tld: String,
    pub port: u16,
    pub title: String,
}

impl Environment {
    /// The all-default environment for a position.
    #[must_use]
    pub fn positional_default(index: usize, tls: bool) -> Self {
        Self {
            tls,
            tld: default_tld(index).to_string(),
            port: default_port(tls),
            title: default_title(index),
        }
    }

    #[must_use]
    pub fn has_custom_tld(&self, index: usize) -> bool {
        self.tld != default_tld(index)
    }

    #[must_use]
    pub fn has_custom_port(&self) -> bool {
        self.port != default_port(self.tls)
    }

    #[must_use]
    pub fn has_custom_title(&self, index: usize) -> bool {
        self.title != default_title(index)
    }
}

/// The hostname(s) a config is stored and looked up under.
///
/// Hostnames are domain bases in canonical trailing-dot form (`example.`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Hostnames {
    /// All environments share one domain base.
    Shared(String),
    /// Production and local use different domain bases.
    Divergent { prod: String, local: String },
}

impl Hostnames {
    /// Hostnames in wire order: `[shared]` or `[prod, local]`.
    #[must_use]
    pub fn to_vec(&self) -> Vec<&str> {
        match self {
            Self::Shared(base) => vec![base.as_str()],
            Self::Divergent { prod, local } => vec![prod.as_str(), local.as_str()],
        }
    }

    #[must_use]
    pub fn contains(&self, hostname: &str) -> bool {
        self.to_vec().contains(&hostname)
    }

    /// True if any hostname appears in both sets.
    #[must_use]
    pub fn overlaps(&self, other: &Hostnames) -> bool {
        other.to_vec().iter().any(|h| self.contains(h))
    }

    #[must_use]
    pub fn is_divergent(&self) -> bool {
        matches!(self, Self::Divergent { .. })
    }

    /// The first hostname, which is the record's primary key.
    #[must_use]
    pub fn primary(&self) -> &str {
        match self {
            Self::Shared(base) => base,
            Self::Divergent { prod, .. } => prod,
        }
    }
}

/// One stored per-domain record.
///
/// # Example
///
/// ```
/// use envswap_sync::{DomainConfig, Environment, Hostnames};
///
/// let config = DomainConfig::new(
///     vec![
///         Environment::positional_default(0, false),
///         Environment::positional_default(1, true),
///     ],
///     Hostnames::Shared("example.".into()),
/// );
/// assert_eq!(config.env_count(), 2);
/// assert!(!config.hostname_divergence());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainConfig {
    pub environments: Vec<Environment>,
    pub hostnames: Hostnames,
}

impl DomainConfig {
    #[must_use]
    pub fn new(environments: Vec<Environment>, hostnames: Hostnames) -> Self {
        Self { environments, hostnames }
    }

    #[must_use]
    pub fn env_count(&self) -> usize {
        self.environments.len()
    }

    #[must_use]
    pub fn hostname_divergence(&self) -> bool {
        self.hostnames.is_divergent()
    }
}

/// Page protocol as the browser reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    #[serde(rename = "http:")]
    Http,
    #[serde(rename = "https:")]
    Https,
}

impl Protocol {
    #[must_use]
    pub fn from_tls(tls: bool) -> Self {
        if tls { Self::Https } else { Self::Http }
    }

    #[must_use]
    pub fn is_tls(self) -> bool {
        self == Self::Https
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http:",
            Self::Https => "https:",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// UI-facing projection of a [`DomainConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainSettings {
    pub prod_tld: String,
    pub local_tld: String,
    pub prod_protocol: Protocol,
    pub local_protocol: Protocol,
    /// Production domain base when it differs from local
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prod_hostname: Option<String>,
    /// Local domain base when it differs from production
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_hostname: Option<String>,
}

impl DomainSettings {
    /// Settings with no hostname divergence.
    #[must_use]
    pub fn new(
        prod_tld: impl Into<String>,
        local_tld: impl Into<String>,
        prod_protocol: Protocol,
        local_protocol: Protocol,
    ) -> Self {
        Self {
            prod_tld: prod_tld.into(),
            local_tld: local_tld.into(),
            prod_protocol,
            local_protocol,
            prod_hostname: None,
            local_hostname: None,
        }
    }

    /// Alias domain bases the settings are also reachable under.
    #[must_use]
    pub fn aliases(&self) -> Vec<&str> {
        self.prod_hostname
            .iter()
            .chain(self.local_hostname.iter())
            .map(String::as_str)
            .collect()
    }
}
