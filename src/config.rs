//! Connection configuration
//!
//! Named connections are declared in a TOML file, one table per connection:
//!
//! ```toml
//! [connections.reports]
//! host = "r1"
//! user = "reporter"
//! password_env = "REPORTS_PASSWORD"
//! dbname = "reports"
//! ```
//!
//! The registry only ever reads configuration, through [`ConfigSource`].

use crate::name::ConnectionName;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error occurred while reading config file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error occurred
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A connection key normalizes to an empty name
    #[error("Invalid connection name in configuration: {raw:?}")]
    InvalidName {
        /// Key as written in the file
        raw: String,
    },

    /// Two connection keys normalize to the same name
    #[error("Connections '{first}' and '{second}' both normalize to '{normalized}'")]
    DuplicateName {
        /// First key as written in the file
        first: String,
        /// Second key as written in the file
        second: String,
        /// Shared normalized name
        normalized: String,
    },
}

fn default_port() -> u16 {
    5432
}

fn default_user() -> String {
    "postgres".to_string()
}

/// Parameters for opening one database connection
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Database host
    pub host: String,
    /// Database port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Database user
    #[serde(default = "default_user")]
    pub user: String,
    /// Environment variable containing the password
    #[serde(default)]
    pub password_env: Option<String>,
    /// Database name, driver default when absent
    #[serde(default)]
    pub dbname: Option<String>,
    /// Connect timeout handed to the driver as-is
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
    /// Additional driver-specific parameters
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl ConnectionConfig {
    /// Config for `host` with every other field at its default
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: default_port(),
            user: default_user(),
            password_env: None,
            dbname: None,
            connect_timeout_secs: None,
            options: BTreeMap::new(),
        }
    }

    /// Set the port
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the user
    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Set the database name
    #[must_use]
    pub fn with_dbname(mut self, dbname: impl Into<String>) -> Self {
        self.dbname = Some(dbname.into());
        self
    }

    /// Read the password from the environment variable `var`
    #[must_use]
    pub fn with_password_env(mut self, var: impl Into<String>) -> Self {
        self.password_env = Some(var.into());
        self
    }

    /// Add a driver-specific parameter
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }
}

/// Lookup of named connection configuration
///
/// Implementations must be read-only from the registry's point of view.
pub trait ConfigSource: Send + Sync {
    /// Configuration registered for `name`, if any
    fn lookup(&self, name: &ConnectionName) -> Option<ConnectionConfig>;
}

/// Main configuration structure for shardconn
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    /// Named connection configurations, keyed as written in the file
    #[serde(default)]
    pub connections: BTreeMap<String, ConnectionConfig>,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject keys that are unusable or collide after normalization
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen: HashMap<String, &str> = HashMap::new();
        for key in self.connections.keys() {
            let name = ConnectionName::parse(key)
                .map_err(|_| ConfigError::InvalidName { raw: key.clone() })?;
            if let Some(first) = seen.insert(name.as_str().to_string(), key) {
                return Err(ConfigError::DuplicateName {
                    first: first.to_string(),
                    second: key.clone(),
                    normalized: name.as_str().to_string(),
                });
            }
        }
        Ok(())
    }

    /// Normalized names of every configured connection, sorted
    #[must_use]
    pub fn connection_names(&self) -> Vec<ConnectionName> {
        let mut names: Vec<_> = self
            .connections
            .keys()
            .filter_map(|key| ConnectionName::parse(key).ok())
            .collect();
        names.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        names
    }
}

impl ConfigSource for Config {
    fn lookup(&self, name: &ConnectionName) -> Option<ConnectionConfig> {
        lookup_normalized(self.connections.iter(), name)
    }
}

impl ConfigSource for HashMap<String, ConnectionConfig> {
    fn lookup(&self, name: &ConnectionName) -> Option<ConnectionConfig> {
        lookup_normalized(self.iter(), name)
    }
}

fn lookup_normalized<'a>(
    entries: impl Iterator<Item = (&'a String, &'a ConnectionConfig)>,
    name: &ConnectionName,
) -> Option<ConnectionConfig> {
    entries
        .filter(|(key, _)| ConnectionName::parse(key).is_ok_and(|key| key == *name))
        .map(|(_, config)| config.clone())
        .next()
}
