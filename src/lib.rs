//! `shardconn` - Named, lazily established database connections
//!
//! Application code addresses shards and replicas by logical name. A
//! [`Registry`] opens each named connection on first use through a
//! [`ConnectionBuilder`] and hands back the same [`ConnectionHandle`] on every
//! later request for that name.

#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    missing_docs,
    rust_2018_idioms
)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

/// Connection handle construction
pub mod builder;
/// Command line interface definitions
pub mod cli;
/// Command implementations for the CLI
pub mod commands;
/// Configuration management for shardconn
pub mod config;
pub mod connection;
pub mod database;
/// Error types
pub mod error;
pub mod name;
pub mod registry;

pub use builder::ConnectionBuilder;
pub use config::{Config, ConfigSource, ConnectionConfig};
pub use connection::ConnectionHandle;
pub use database::{Driver, PgConnection, PostgresDriver};
pub use error::{DriverError, ShardConnError};
pub use name::ConnectionName;
pub use registry::{Registry, SharedHandle};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
