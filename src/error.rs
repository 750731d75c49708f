use thiserror::Error;

/// Failures reported by a [`Driver`](crate::database::Driver) while opening a connection
#[derive(Error, Debug)]
pub enum DriverError {
    /// The database rejected or never answered the connection attempt
    #[error("Connection failed: {0}")]
    Connect(#[from] tokio_postgres::Error),

    /// The configuration could not be turned into connection parameters
    #[error("Invalid connection configuration: {message}")]
    InvalidConfig {
        /// Error message details
        message: String,
    },

    /// The driver's async runtime could not be started
    #[error("Driver runtime error: {0}")]
    Runtime(#[from] std::io::Error),

    /// Any other driver-specific failure
    #[error("{message}")]
    Other {
        /// Error message details
        message: String,
    },
}

impl DriverError {
    /// Shorthand for [`DriverError::Other`]
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

/// Custom error types for `shardconn`
#[derive(Error, Debug)]
pub enum ShardConnError {
    /// Connection name normalizes to nothing usable
    #[error("Invalid connection name: {raw:?}")]
    InvalidName {
        /// The name as the caller passed it
        raw: String,
    },

    /// No configuration is registered for a connection that must exist
    #[error("No configuration found for connection '{name}'")]
    ConfigNotFound {
        /// Normalized connection name
        name: String,
    },

    /// The driver failed to open the connection
    #[error("Failed to establish connection '{name}': {source}")]
    ConnectionEstablishFailed {
        /// Normalized connection name
        name: String,
        /// Driver failure, unmodified
        #[source]
        source: DriverError,
    },
}

impl ShardConnError {
    /// Whether the caller can reasonably recover from this error
    ///
    /// A missing configuration can be supplied explicitly and a failed
    /// connection attempt can be repeated; an invalid name cannot be fixed
    /// without changing the call site.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::InvalidName { .. } => false,
            Self::ConfigNotFound { .. } | Self::ConnectionEstablishFailed { .. } => true,
        }
    }
}

/// Result type alias for `shardconn` operations
pub type Result<T> = std::result::Result<T, ShardConnError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_establish_failure_keeps_driver_error_as_source() {
        let error = ShardConnError::ConnectionEstablishFailed {
            name: "reports".to_string(),
            source: DriverError::other("connection refused"),
        };

        assert!(error.to_string().contains("reports"));
        assert_eq!(error.source().unwrap().to_string(), "connection refused");
    }

    #[test]
    fn test_recoverability() {
        let invalid = ShardConnError::InvalidName {
            raw: "  ".to_string(),
        };
        let missing = ShardConnError::ConfigNotFound {
            name: "missing".to_string(),
        };

        assert!(!invalid.is_recoverable());
        assert!(missing.is_recoverable());
    }
}
