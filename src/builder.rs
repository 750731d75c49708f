//! Connection handle construction
//!
//! The builder resolves configuration and asks the driver for a connection.
//! It never caches and never retries: every call is one attempt, and driver
//! errors come back wrapped once in
//! [`ShardConnError::ConnectionEstablishFailed`].

use crate::config::{ConfigSource, ConnectionConfig};
use crate::connection::ConnectionHandle;
use crate::database::Driver;
use crate::error::{Result, ShardConnError};
use crate::name::ConnectionName;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Builds [`ConnectionHandle`]s from a driver and a configuration source
pub struct ConnectionBuilder<D> {
    driver: Arc<D>,
    source: Arc<dyn ConfigSource>,
    scope: Uuid,
}

impl<D> Clone for ConnectionBuilder<D> {
    fn clone(&self) -> Self {
        Self {
            driver: Arc::clone(&self.driver),
            source: Arc::clone(&self.source),
            scope: self.scope,
        }
    }
}

impl<D: Driver> ConnectionBuilder<D> {
    /// Create a builder over `driver`, resolving names through `source`
    pub fn new(driver: D, source: impl ConfigSource + 'static) -> Self {
        Self::from_shared(Arc::new(driver), Arc::new(source))
    }

    /// Create a builder from already shared collaborators
    pub fn from_shared(driver: Arc<D>, source: Arc<dyn ConfigSource>) -> Self {
        Self {
            driver,
            source,
            scope: Uuid::nil(),
        }
    }

    /// Same collaborators, labels tagged with `scope`
    #[must_use]
    pub fn with_scope(&self, scope: Uuid) -> Self {
        Self {
            scope,
            ..self.clone()
        }
    }

    /// The driver handles are opened with
    #[must_use]
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Build a handle for `name` from the configuration source
    ///
    /// With `should_exist` unset and nothing configured, the handle is
    /// deferred: no driver call is made.
    pub fn establish(
        &self,
        name: &ConnectionName,
        should_exist: bool,
    ) -> Result<ConnectionHandle<D::Connection>> {
        match self.source.lookup(name) {
            Some(config) => self.establish_from_config(name, config),
            None if should_exist => Err(ShardConnError::ConfigNotFound {
                name: name.as_str().to_string(),
            }),
            None => {
                debug!("No configuration for '{}', deferring connection", name);
                Ok(ConnectionHandle::deferred(name.clone(), self.label(name)))
            }
        }
    }

    /// Build a handle for `name` straight from `config`
    pub fn establish_from_config(
        &self,
        name: &ConnectionName,
        config: ConnectionConfig,
    ) -> Result<ConnectionHandle<D::Connection>> {
        let connection = self.driver.open(&config).map_err(|source| {
            ShardConnError::ConnectionEstablishFailed {
                name: name.as_str().to_string(),
                source,
            }
        })?;
        Ok(ConnectionHandle::established(
            name.clone(),
            self.label(name),
            config,
            connection,
        ))
    }

    fn label(&self, name: &ConnectionName) -> String {
        format!(
            "AutoConnection{}ForScope{}",
            name.camelized(),
            self.scope.simple()
        )
    }
}
