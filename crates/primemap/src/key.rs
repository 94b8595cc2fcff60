//! Configuration keys.
//!
//! A [`ConfigurationKey`] is the first 12 lowercase hex digits of the xxh64
//! (seed 0) digest of a configuration's canonical form. The canonical form is
//! compact JSON with keys in sorted order, and filters normalized to the
//! effective visibility of every category, so an explicit `true` and an
//! absent entry produce the same key.
//!
//! ```text
//! {"circle_count":10,"filters":{"composite":true,...,"fermat":true},"mapping":"linear","segments_per_circle":24}
//! ```
//!
//! Collisions are tolerated: a colliding key can only make the index return
//! an entry whose stored configuration differs, which the atlas checks.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh64::xxh64;

use crate::classify::Category;
use crate::configuration::Configuration;

/// Hex digits kept from the digest.
pub const KEY_LEN: usize = 12;

/// Deterministic digest of a [`Configuration`].
///
/// # Examples
///
/// ```
/// use primemap::{Configuration, ConfigurationKey, MappingStrategy};
///
/// let a = Configuration::new(10, 24, MappingStrategy::Linear)?;
/// let b = Configuration::new(10, 24, MappingStrategy::Linear)?;
/// let c = Configuration::new(10, 25, MappingStrategy::Linear)?;
/// assert_eq!(ConfigurationKey::of(&a), ConfigurationKey::of(&b));
/// assert_ne!(ConfigurationKey::of(&a), ConfigurationKey::of(&c));
/// assert_eq!(ConfigurationKey::of(&a).as_str().len(), 12);
/// # Ok::<(), primemap::Error>(())
/// ```
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ConfigurationKey(String);

impl ConfigurationKey {
    /// Key of `config`.
    pub fn of(config: &Configuration) -> Self {
        let digest = xxh64(canonical_form(config).as_bytes(), 0);
        let mut hex = format!("{digest:016x}");
        hex.truncate(KEY_LEN);
        Self(hex)
    }

    /// The hex string.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Fields that identify a configuration, declared in sorted order.
#[derive(Serialize)]
struct CanonicalForm {
    circle_count: u32,
    filters: BTreeMap<&'static str, bool>,
    mapping: &'static str,
    segments_per_circle: u32,
}

/// Sorted compact JSON of the fields that identify a configuration.
pub fn canonical_form(config: &Configuration) -> String {
    let form = CanonicalForm {
        circle_count: config.circle_count(),
        filters: Category::ALL
            .iter()
            .map(|&c| (c.name(), config.filters().is_visible(c)))
            .collect(),
        mapping: config.mapping().name(),
        segments_per_circle: config.segments_per_circle(),
    };
    // Scalars and a string-keyed map only; serialization cannot fail.
    serde_json::to_string(&form).unwrap_or_default()
}

impl fmt::Display for ConfigurationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ConfigurationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConfigurationKey({})", self.0)
    }
}

/// Error for a string that is not 12 lowercase hex digits.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid configuration key `{0}`: expected 12 lowercase hex digits")]
pub struct InvalidKey(pub String);

impl FromStr for ConfigurationKey {
    type Err = InvalidKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid = s.len() == KEY_LEN
            && s
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(InvalidKey(s.to_string()))
        }
    }
}

impl TryFrom<String> for ConfigurationKey {
    type Error = InvalidKey;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ConfigurationKey> for String {
    fn from(key: ConfigurationKey) -> Self {
        key.0
    }
}
