//! Connection handles

use crate::config::ConnectionConfig;
use crate::name::ConnectionName;
use std::fmt;

/// One established (or deliberately deferred) database connection
///
/// A handle is deferred when it was requested with `should_exist = false`
/// and no configuration exists for its name: it carries no driver connection
/// and the caller is expected to fall back to its default database.
///
/// The driver connection is closed when the last reference to the handle is
/// dropped.
pub struct ConnectionHandle<C> {
    name: ConnectionName,
    label: String,
    config: Option<ConnectionConfig>,
    connection: Option<C>,
}

impl<C> ConnectionHandle<C> {
    pub(crate) const fn established(
        name: ConnectionName,
        label: String,
        config: ConnectionConfig,
        connection: C,
    ) -> Self {
        Self {
            name,
            label,
            config: Some(config),
            connection: Some(connection),
        }
    }

    pub(crate) const fn deferred(name: ConnectionName, label: String) -> Self {
        Self {
            name,
            label,
            config: None,
            connection: None,
        }
    }

    /// Name this handle was created for
    #[must_use]
    pub const fn name(&self) -> &ConnectionName {
        &self.name
    }

    /// Diagnostic label, unique per name and registry scope
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Configuration the connection was opened with
    #[must_use]
    pub const fn config(&self) -> Option<&ConnectionConfig> {
        self.config.as_ref()
    }

    /// The underlying driver connection, `None` for a deferred handle
    #[must_use]
    pub const fn connection(&self) -> Option<&C> {
        self.connection.as_ref()
    }

    /// Whether this handle has no driver connection behind it
    #[must_use]
    pub const fn is_deferred(&self) -> bool {
        self.connection.is_none()
    }
}

impl<C> fmt::Debug for ConnectionHandle<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("name", &self.name.as_str())
            .field("label", &self.label)
            .field("host", &self.config.as_ref().map(|c| c.host.as_str()))
            .field("deferred", &self.is_deferred())
            .finish_non_exhaustive()
    }
}
