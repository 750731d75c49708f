//! Connection name normalization
//!
//! Callers address connections by whatever name they like ("Shard One",
//! "shard-one", "shard_one"). Before a name is used as a cache key or embedded
//! in a diagnostic label it is normalized so that spellings which differ only
//! in case, surrounding whitespace or punctuation collapse to one key:
//!
//! 1. surrounding whitespace is trimmed
//! 2. every run of non-word characters and underscores becomes a single `_`
//! 3. leading and trailing `_` are stripped
//! 4. the result is lowercased
//!
//! ```
//! use shardconn::ConnectionName;
//!
//! let name = ConnectionName::parse(" Shard-One ").unwrap();
//! assert_eq!(name.as_str(), "shard_one");
//! assert_eq!(name.camelized(), "ShardOne");
//! ```

use crate::error::{Result, ShardConnError};
use regex::Regex;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

fn non_word_runs() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[\W_]+").expect("static pattern compiles"))
}

/// A normalized connection name
///
/// Equality and hashing only consider the normalized key; the spelling the
/// caller used is kept for diagnostics.
#[derive(Debug, Clone)]
pub struct ConnectionName {
    key: String,
    original: String,
}

impl ConnectionName {
    /// Normalize `raw` into a connection name
    ///
    /// Fails with [`ShardConnError::InvalidName`] when nothing usable remains.
    pub fn parse(raw: &str) -> Result<Self> {
        let replaced = non_word_runs().replace_all(raw.trim(), "_");
        let key = replaced.trim_matches('_').to_lowercase();

        if key.is_empty() {
            return Err(ShardConnError::InvalidName {
                raw: raw.to_string(),
            });
        }

        Ok(Self {
            key,
            original: raw.to_string(),
        })
    }

    /// The normalized cache key
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.key
    }

    /// The name exactly as the caller spelled it
    #[must_use]
    pub fn original(&self) -> &str {
        &self.original
    }

    /// CamelCase rendering of the key, e.g. `shard_one` -> `ShardOne`
    #[must_use]
    pub fn camelized(&self) -> String {
        self.key
            .split('_')
            .filter(|part| !part.is_empty())
            .map(|part| {
                let mut chars = part.chars();
                chars.next().map_or_else(String::new, |first| {
                    first.to_uppercase().chain(chars).collect()
                })
            })
            .collect()
    }
}

impl PartialEq for ConnectionName {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for ConnectionName {}

impl Hash for ConnectionName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Display for ConnectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

impl TryFrom<&str> for ConnectionName {
    type Error = ShardConnError;

    fn try_from(raw: &str) -> Result<Self> {
        Self::parse(raw)
    }
}
