//! # Database Drivers
//!
//! The registry never talks to a database itself. It hands a
//! [`ConnectionConfig`] to a [`Driver`] and stores whatever connection comes
//! back. [`PostgresDriver`] is the bundled implementation, built on
//! `tokio-postgres`.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use shardconn::{ConnectionConfig, Driver, PostgresDriver};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let driver = PostgresDriver::new()?;
//! let config = ConnectionConfig::new("localhost").with_dbname("reports");
//! let conn = driver.open(&config)?;
//! let rows = conn.block_on(conn.client().query("SELECT version()", &[]))?;
//! # Ok(())
//! # }
//! ```

use crate::config::ConnectionConfig;
use crate::error::DriverError;
use std::env;
use std::future::Future;
use std::time::Duration;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;
use tokio_postgres::{Client, NoTls};
use tracing::{debug, info, warn};

/// Opens database connections from configuration
///
/// `open` is synchronous and may block on network I/O. Timeouts are the
/// driver's business.
pub trait Driver: Send + Sync {
    /// Live connection type produced by this driver
    type Connection: Send + Sync + 'static;

    /// Open one connection
    fn open(&self, config: &ConnectionConfig) -> Result<Self::Connection, DriverError>;
}

/// `PostgreSQL` driver backed by `tokio-postgres`
///
/// Owns a small multi-threaded runtime that drives every connection it opens.
/// `open` blocks the calling thread, so it must not be called from inside
/// another tokio runtime.
pub struct PostgresDriver {
    runtime: Runtime,
}

impl PostgresDriver {
    /// Create a driver with its own runtime
    pub fn new() -> Result<Self, DriverError> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("shardconn-postgres")
            .enable_all()
            .build()?;
        Ok(Self { runtime })
    }

    /// Translate a [`ConnectionConfig`] into `tokio-postgres` parameters
    ///
    /// Free-form options go through the `tokio-postgres` key/value parser, so
    /// unknown keys are rejected here rather than at connect time. Keys must be
    /// plain identifiers and may not shadow a structured field.
    pub fn pg_config(config: &ConnectionConfig) -> Result<tokio_postgres::Config, DriverError> {
        let options = config
            .options
            .iter()
            .map(|(key, value)| {
                validate_option_key(key)?;
                Ok(format!("{key}='{}'", escape_value(value)))
            })
            .collect::<Result<Vec<_>, DriverError>>()?
            .join(" ");

        let mut pg_config: tokio_postgres::Config =
            options.parse().map_err(|e: tokio_postgres::Error| {
                DriverError::InvalidConfig {
                    message: e.to_string(),
                }
            })?;

        pg_config
            .host(&config.host)
            .port(config.port)
            .user(&config.user);

        if let Some(dbname) = &config.dbname {
            pg_config.dbname(dbname);
        }
        if let Some(secs) = config.connect_timeout_secs {
            pg_config.connect_timeout(Duration::from_secs(secs));
        }
        if let Some(password) = read_password(config) {
            pg_config.password(password);
        }

        Ok(pg_config)
    }
}

impl Driver for PostgresDriver {
    type Connection = PgConnection;

    fn open(&self, config: &ConnectionConfig) -> Result<PgConnection, DriverError> {
        debug!(
            "Opening connection: host={}:{}, user={}, database={:?}",
            config.host, config.port, config.user, config.dbname
        );

        let pg_config = Self::pg_config(config)?;
        let (client, connection) = self.runtime.block_on(pg_config.connect(NoTls))?;

        let host = config.host.clone();
        let task = self.runtime.spawn(async move {
            if let Err(e) = connection.await {
                warn!("Connection to {} closed with error: {}", host, e);
            }
        });

        info!("Connected to {}:{}", config.host, config.port);
        Ok(PgConnection {
            client,
            runtime: self.runtime.handle().clone(),
            task,
        })
    }
}

/// An open `PostgreSQL` connection
pub struct PgConnection {
    client: Client,
    runtime: Handle,
    task: JoinHandle<()>,
}

impl PgConnection {
    /// The `tokio-postgres` client
    #[must_use]
    pub const fn client(&self) -> &Client {
        &self.client
    }

    /// Run a client future to completion on the driver's runtime
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Whether the server side of the connection has gone away
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.client.is_closed() || self.task.is_finished()
    }
}

/// Read the password from the configured environment variable
fn read_password(config: &ConnectionConfig) -> Option<String> {
    config.password_env.as_ref().map(|password_env| {
        debug!(
            "Reading password from environment variable: {}",
            password_env
        );
        env::var(password_env).unwrap_or_else(|_| {
            warn!(
                "Environment variable {} not found, using empty password",
                password_env
            );
            String::new()
        })
    })
}

/// Keys set through dedicated [`ConnectionConfig`] fields
const RESERVED_OPTION_KEYS: &[&str] = &[
    "host",
    "hostaddr",
    "port",
    "user",
    "dbname",
    "password",
    "connect_timeout",
];

fn validate_option_key(key: &str) -> Result<(), DriverError> {
    if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphabetic() || c == '_') {
        return Err(DriverError::InvalidConfig {
            message: format!("invalid option name {key:?}"),
        });
    }
    if RESERVED_OPTION_KEYS.contains(&key) {
        return Err(DriverError::InvalidConfig {
            message: format!("option '{key}' must be set through its dedicated field"),
        });
    }
    Ok(())
}

fn escape_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pg_config_carries_connection_fields() {
        let config = ConnectionConfig::new("db1")
            .with_port(6432)
            .with_user("app")
            .with_dbname("orders");
        let pg = PostgresDriver::pg_config(&config).unwrap();

        assert_eq!(pg.get_ports(), &[6432]);
        assert_eq!(pg.get_user(), Some("app"));
        assert_eq!(pg.get_dbname(), Some("orders"));
    }

    #[test]
    fn test_known_options_are_accepted() {
        let config =
            ConnectionConfig::new("db1").with_option("application_name", "it's billing");
        let pg = PostgresDriver::pg_config(&config).unwrap();
        assert_eq!(pg.get_application_name(), Some("it's billing"));
    }

    #[test]
    fn test_unknown_options_are_rejected() {
        let config = ConnectionConfig::new("db1").with_option("no_such_setting", "1");
        assert!(matches!(
            PostgresDriver::pg_config(&config),
            Err(DriverError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_reserved_option_keys_are_rejected() {
        for key in ["port", "host", "user", "dbname", "password", "connect_timeout"] {
            let config = ConnectionConfig::new("db1").with_option(key, "1");
            assert!(
                matches!(
                    PostgresDriver::pg_config(&config),
                    Err(DriverError::InvalidConfig { .. })
                ),
                "{key} was accepted"
            );
        }
    }

    #[test]
    fn test_option_keys_cannot_carry_extra_parameters() {
        for key in ["application_name='x' dbname", "a=b", "name1", ""] {
            let config = ConnectionConfig::new("db1").with_option(key, "evil");
            assert!(
                matches!(
                    PostgresDriver::pg_config(&config),
                    Err(DriverError::InvalidConfig { .. })
                ),
                "{key:?} was accepted"
            );
        }
    }

    #[test]
    fn test_structured_port_is_the_only_port() {
        let config = ConnectionConfig::new("db1")
            .with_port(6432)
            .with_option("application_name", "billing");
        let pg = PostgresDriver::pg_config(&config).unwrap();
        assert_eq!(pg.get_ports(), &[6432]);
        assert_eq!(pg.get_hosts().len(), 1);
    }

    #[test]
    fn test_missing_password_variable_yields_empty_password() {
        let config = ConnectionConfig::new("db1")
            .with_password_env("SHARDCONN_TEST_PASSWORD_THAT_IS_NEVER_SET");
        assert_eq!(read_password(&config), Some(String::new()));
    }

    #[test]
    fn test_unreachable_host_fails_to_open() {
        let driver = PostgresDriver::new().unwrap();
        let mut config = ConnectionConfig::new("127.0.0.1").with_port(1);
        config.connect_timeout_secs = Some(1);
        assert!(driver.open(&config).is_err());
    }
}
