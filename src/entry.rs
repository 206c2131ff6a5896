// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Entry codec: one [`DomainConfig`] to and from a compact delimited string.
//!
//! # Wire format
//!
//! ```text
//! version|envCount|flags|divergence|values_0|...|values_{n-1}|hostnames
//! ```
//!
//! - `flags` is four `0`/`1` characters per environment: tls, custom tld,
//!   custom port, custom title.
//! - `values_i` holds only the custom fields of environment `i` (tld, port,
//!   title, in that order) joined by `^`. Fields not flagged custom are
//!   rebuilt from positional defaults.
//! - `hostnames` is every hostname joined by `^`.
//!
//! Neither delimiter is escaped, so [`serialize`] refuses field values
//! containing `|` or `^`.
//!
//! # Example
//!
//! ```
//! use envswap_sync::{DomainConfig, Environment, Hostnames};
//! use envswap_sync::entry::{serialize, deserialize};
//!
//! let config = DomainConfig::new(
//!     vec![
//!         Environment::positional_default(0, false),
//!         Environment::positional_default(1, true),
//!     ],
//!     Hostnames::Shared("example.".into()),
//! );
//! let entry = serialize(&config).unwrap();
//! assert_eq!(entry, "0|2|00001000|0|||example.");
//! assert_eq!(deserialize(&entry).unwrap(), config);
//! ```

use crate::model::{DomainConfig, Environment, Hostnames};
use thiserror::Error;

/// Format version tag written as the first field.
pub const FORMAT_VERSION: &str = "0";
/// Top-level field delimiter.
pub const DELIMITER: char = '|';
/// Delimiter inside value and hostname blocks.
pub const SUB_DELIMITER: char = '^';

/// Fields before the per-environment value blocks.
const HEADER_FIELDS: usize = 4;
const FLAGS_PER_ENV: usize = 4;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntryError {
    #[error("unsupported entry format version '{0}'")]
    UnsupportedVersion(String),
    #[error("invalid environment count '{0}'")]
    InvalidEnvCount(String),
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },
    #[error("invalid flag block '{0}'")]
    InvalidFlags(String),
    #[error("invalid divergence flag '{0}'")]
    InvalidDivergence(String),
    #[error("environment {index}: expected {expected} custom values, found {found}")]
    ValueCount { index: usize, expected: usize, found: usize },
    #[error("environment {index}: invalid port '{value}'")]
    InvalidPort { index: usize, value: String },
    #[error("expected {expected} hostnames, found {found}")]
    HostnameCount { expected: usize, found: usize },
    #[error("empty hostname")]
    EmptyHostname,
    #[error("config has no environments")]
    NoEnvironments,
    #[error("{field} '{value}' contains a reserved delimiter character")]
    ReservedCharacter { field: &'static str, value: String },
}

fn check_reserved(field: &'static str, value: &str) -> Result<(), EntryError> {
    if value.contains(DELIMITER) || value.contains(SUB_DELIMITER) {
        return Err(EntryError::ReservedCharacter {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

#[inline]
fn flag(set: bool) -> char {
    if set { '1' } else { '0' }
}

/// Serialize a config into its entry string.
///
/// Fails if the config has no environments, has an empty hostname, or if a
/// tld, title or hostname contains a delimiter.
pub fn serialize(config: &DomainConfig) -> Result<String, EntryError> {
    if config.environments.is_empty() {
        return Err(EntryError::NoEnvironments);
    }

    let hostnames = config.hostnames.to_vec();
    for hostname in &hostnames {
        if hostname.is_empty() {
            return Err(EntryError::EmptyHostname);
        }
        check_reserved("hostname", hostname)?;
    }

    let mut flags = String::with_capacity(config.env_count() * FLAGS_PER_ENV);
    let mut value_blocks = Vec::with_capacity(config.env_count());

    for (i, env) in config.environments.iter().enumerate() {
        let custom_tld = env.has_custom_tld(i);
        let custom_port = env.has_custom_port();
        let custom_title = env.has_custom_title(i);

        flags.push(flag(env.tls));
        flags.push(flag(custom_tld));
        flags.push(flag(custom_port));
        flags.push(flag(custom_title));

        let mut parts = Vec::new();
        if custom_tld {
            check_reserved("tld", &env.tld)?;
            parts.push(env.tld.clone());
        }
        if custom_port {
            parts.push(env.port.to_string());
        }
        if custom_title {
            check_reserved("title", &env.title)?;
            parts.push(env.title.clone());
        }
        value_blocks.push(parts.join(&SUB_DELIMITER.to_string()));
    }

    let mut fields = Vec::with_capacity(HEADER_FIELDS + value_blocks.len() + 1);
    fields.push(FORMAT_VERSION.to_string());
    fields.push(config.env_count().to_string());
    fields.push(flags);
    fields.push(flag(config.hostname_divergence()).to_string());
    fields.extend(value_blocks);
    fields.push(hostnames.join(&SUB_DELIMITER.to_string()));

    Ok(fields.join(&DELIMITER.to_string()))
}

fn parse_flag(c: u8) -> Option<bool> {
    match c {
        b'0' => Some(false),
        b'1' => Some(true),
        _ => None,
    }
}

/// Parse an entry string back into a config.
///
/// Structurally invalid entries are rejected whole; only fields a well-formed
/// entry leaves unflagged are filled from positional defaults.
pub fn deserialize(entry: &str) -> Result<DomainConfig, EntryError> {
    let sections: Vec<&str> = entry.split(DELIMITER).collect();

    // version and count come first so a foreign version is reported as such
    let version = sections[0];
    if version != FORMAT_VERSION {
        return Err(EntryError::UnsupportedVersion(version.to_string()));
    }
    let count_str = sections.get(1).copied().unwrap_or_default();
    let env_count: usize = count_str
        .parse()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| EntryError::InvalidEnvCount(count_str.to_string()))?;

    let expected = env_count
        .checked_add(HEADER_FIELDS + 1)
        .ok_or_else(|| EntryError::InvalidEnvCount(count_str.to_string()))?;
    if sections.len() != expected {
        return Err(EntryError::FieldCount {
            expected,
            found: sections.len(),
        });
    }

    let flags = sections[2].as_bytes();
    if flags.len() != env_count * FLAGS_PER_ENV {
        return Err(EntryError::InvalidFlags(sections[2].to_string()));
    }
    let flags = flags
        .iter()
        .map(|c| parse_flag(*c))
        .collect::<Option<Vec<bool>>>()
        .ok_or_else(|| EntryError::InvalidFlags(sections[2].to_string()))?;

    let divergent = sections[3]
        .as_bytes()
        .first()
        .filter(|_| sections[3].len() == 1)
        .and_then(|c| parse_flag(*c))
        .ok_or_else(|| EntryError::InvalidDivergence(sections[3].to_string()))?;

    let mut environments = Vec::with_capacity(env_count);
    for (i, group) in flags.chunks(FLAGS_PER_ENV).enumerate() {
        let (tls, custom_tld, custom_port, custom_title) = (group[0], group[1], group[2], group[3]);
        let block = sections[HEADER_FIELDS + i];

        let wanted = [custom_tld, custom_port, custom_title]
            .iter()
            .filter(|f| **f)
            .count();
        let values: Vec<&str> = if wanted == 0 {
            Vec::new()
        } else {
            block.split(SUB_DELIMITER).collect()
        };
        if values.len() != wanted || (wanted == 0 && !block.is_empty()) {
            return Err(EntryError::ValueCount {
                index: i,
                expected: wanted,
                found: if block.is_empty() { 0 } else { block.split(SUB_DELIMITER).count() },
            });
        }

        let mut values = values.into_iter();
        let mut env = Environment::positional_default(i, tls);
        if custom_tld {
            env.tld = values.next().unwrap_or_default().to_string();
        }
        if custom_port {
            let raw = values.next().unwrap_or_default();
            env.port = raw.parse().map_err(|_| EntryError::InvalidPort {
                index: i,
                value: raw.to_string(),
            })?;
        }
        if custom_title {
            env.title = values.next().unwrap_or_default().to_string();
        }
        environments.push(env);
    }

    let hostname_block = sections[HEADER_FIELDS + env_count];
    let mut hostnames: Vec<String> = hostname_block
        .split(SUB_DELIMITER)
        .map(str::to_string)
        .collect();
    if hostnames.iter().any(String::is_empty) {
        return Err(EntryError::EmptyHostname);
    }
    let wanted = if divergent { 2 } else { 1 };
    if hostnames.len() != wanted {
        return Err(EntryError::HostnameCount {
            expected: wanted,
            found: hostnames.len(),
        });
    }

    let hostnames = if divergent {
        let local = hostnames.pop().unwrap_or_default();
        let prod = hostnames.pop().unwrap_or_default();
        Hostnames::Divergent { prod, local }
    } else {
        Hostnames::Shared(hostnames.pop().unwrap_or_default())
    };

    Ok(DomainConfig::new(environments, hostnames))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_env_config() -> DomainConfig {
        DomainConfig::new(
            vec![
                Environment::positional_default(0, false),
                Environment::positional_default(1, true),
            ],
            Hostnames::Shared("example.".into()),
        )
    }

    #[test]
    fn test_default_config_wire_form() {
        let entry = serialize(&two_env_config()).unwrap();
        assert_eq!(entry, "0|2|00001000|0|||example.");
        assert_eq!(deserialize(&entry).unwrap(), two_env_config());
    }

    #[test]
    fn test_all_default_env_has_empty_block() {
        let config = DomainConfig::new(
            vec![Environment::positional_default(0, false)],
            Hostnames::Shared("a.".into()),
        );
        assert_eq!(serialize(&config).unwrap(), "0|1|0000|0||a.");
    }

    #[test]
    fn test_custom_fields_roundtrip() {
        let config = DomainConfig::new(
            vec![
                Environment {
                    tls: true,
                    tld: ".local".into(),
                    port: 5173,
                    title: "Dev".into(),
                },
                Environment {
                    tls: true,
                    tld: ".com".into(),
                    port: 443,
                    title: "Live".into(),
                },
                Environment {
                    tls: false,
                    tld: ".dev".into(),
                    port: 80,
                    title: "Environment 3".into(),
                },
            ],
            Hostnames::Divergent {
                prod: "shop.".into(),
                local: "local-shop.".into(),
            },
        );

        let entry = serialize(&config).unwrap();
        assert_eq!(
            entry,
            "0|3|111110010100|1|.local^5173^Dev|Live|.dev|shop.^local-shop."
        );
        assert_eq!(deserialize(&entry).unwrap(), config);
    }

    #[test]
    fn test_custom_port_only() {
        let mut config = two_env_config();
        config.environments[0].port = 3000;
        let entry = serialize(&config).unwrap();
        assert_eq!(entry, "0|2|00101000|0|3000||example.");
        assert_eq!(deserialize(&entry).unwrap().environments[0].port, 3000);
    }

    #[test]
    fn test_empty_custom_title_roundtrip() {
        let mut config = two_env_config();
        config.environments[1].title = String::new();
        let entry = serialize(&config).unwrap();
        assert_eq!(deserialize(&entry).unwrap(), config);
    }

    #[test]
    fn test_reserved_characters_rejected() {
        let mut config = two_env_config();
        config.environments[0].title = "A|B".into();
        assert!(matches!(
            serialize(&config),
            Err(EntryError::ReservedCharacter { field: "title", .. })
        ));

        let mut config = two_env_config();
        config.hostnames = Hostnames::Shared("ex^ample.".into());
        assert!(matches!(
            serialize(&config),
            Err(EntryError::ReservedCharacter { field: "hostname", .. })
        ));

        let mut config = two_env_config();
        config.environments[1].tld = ".c|m".into();
        assert!(matches!(
            serialize(&config),
            Err(EntryError::ReservedCharacter { field: "tld", .. })
        ));
    }

    #[test]
    fn test_serialize_rejects_empty_config() {
        let config = DomainConfig::new(vec![], Hostnames::Shared("x.".into()));
        assert_eq!(serialize(&config), Err(EntryError::NoEnvironments));

        let mut config = two_env_config();
        config.hostnames = Hostnames::Shared(String::new());
        assert_eq!(serialize(&config), Err(EntryError::EmptyHostname));
    }

    #[test]
    fn test_unknown_version_rejected() {
        assert_eq!(
            deserialize("1|2|00001000|0|||example."),
            Err(EntryError::UnsupportedVersion("1".into()))
        );
        assert!(matches!(deserialize(""), Err(EntryError::UnsupportedVersion(_))));
    }

    #[test]
    fn test_malformed_entries_rejected() {
        // non-numeric and zero counts
        assert!(matches!(deserialize("0|x|0000|0||a."), Err(EntryError::InvalidEnvCount(_))));
        assert!(matches!(deserialize("0|0||0|a."), Err(EntryError::InvalidEnvCount(_))));
        assert!(matches!(deserialize("0"), Err(EntryError::InvalidEnvCount(_))));

        // truncated
        assert!(matches!(
            deserialize("0|2|00001000|0||"),
            Err(EntryError::FieldCount { expected: 7, found: 6 })
        ));

        // flags
        assert!(matches!(deserialize("0|1|000|0||a."), Err(EntryError::InvalidFlags(_))));
        assert!(matches!(deserialize("0|1|00x0|0||a."), Err(EntryError::InvalidFlags(_))));

        // divergence
        assert!(matches!(deserialize("0|1|0000|2||a."), Err(EntryError::InvalidDivergence(_))));
        assert!(matches!(deserialize("0|1|0000|||a."), Err(EntryError::InvalidDivergence(_))));

        // value block disagreeing with flags
        assert!(matches!(
            deserialize("0|1|0110|0||a."),
            Err(EntryError::ValueCount { index: 0, expected: 2, found: 0 })
        ));
        assert!(matches!(
            deserialize("0|1|0000|0|.dev|a."),
            Err(EntryError::ValueCount { index: 0, expected: 0, found: 1 })
        ));
        assert!(matches!(
            deserialize("0|1|0110|0|.dev|a."),
            Err(EntryError::ValueCount { index: 0, expected: 2, found: 1 })
        ));

        // port
        assert!(matches!(
            deserialize("0|1|0010|0|http|a."),
            Err(EntryError::InvalidPort { index: 0, .. })
        ));
        assert!(matches!(
            deserialize("0|1|0010|0|70000|a."),
            Err(EntryError::InvalidPort { index: 0, .. })
        ));

        // hostnames
        assert!(matches!(
            deserialize("0|1|0000|0||a.^b."),
            Err(EntryError::HostnameCount { expected: 1, found: 2 })
        ));
        assert!(matches!(
            deserialize("0|1|0000|1||a."),
            Err(EntryError::HostnameCount { expected: 2, found: 1 })
        ));
        assert_eq!(deserialize("0|1|0000|0||"), Err(EntryError::EmptyHostname));
    }

    #[test]
    fn test_divergent_hostnames_parse_in_order() {
        let config = deserialize("0|2|00001000|1|||app.^app-dev.").unwrap();
        assert_eq!(
            config.hostnames,
            Hostnames::Divergent {
                prod: "app.".into(),
                local: "app-dev.".into()
            }
        );
    }
}
