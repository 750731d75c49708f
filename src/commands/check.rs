use crate::builder::ConnectionBuilder;
use crate::config::Config;
use crate::database::{Driver, PostgresDriver};
use crate::registry::Registry;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info};

/// Result of checking one connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Connection opened
    Connected {
        /// Normalized name
        name: String,
        /// Diagnostic label of the handle
        label: String,
    },
    /// Nothing configured and the check was lenient
    Deferred {
        /// Normalized name
        name: String,
    },
    /// Connecting failed
    Failed {
        /// Name as requested
        name: String,
        /// Error message
        error: String,
    },
}

impl CheckOutcome {
    /// Whether this outcome counts as a failure
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Connect every name through `registry` and collect the outcomes
///
/// Names are checked in order; repeated or equivalent names reuse the cached
/// handle.
pub fn run_check<D: Driver>(
    registry: &Registry<D>,
    names: &[String],
    lenient: bool,
) -> Vec<CheckOutcome> {
    names
        .iter()
        .map(|requested| match registry.connect_opt(requested, !lenient) {
            Ok(handle) if handle.is_deferred() => CheckOutcome::Deferred {
                name: handle.name().to_string(),
            },
            Ok(handle) => CheckOutcome::Connected {
                name: handle.name().to_string(),
                label: handle.label().to_string(),
            },
            Err(e) => CheckOutcome::Failed {
                name: requested.clone(),
                error: e.to_string(),
            },
        })
        .collect()
}

/// Handle the check command, returning whether every connection succeeded
#[allow(clippy::disallowed_methods)]
pub fn handle_check(config_path: &Path, names: &[String], lenient: bool) -> Result<bool> {
    debug!("Loading configuration from {}", config_path.display());
    let config = Config::from_file(config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    let names: Vec<String> = if names.is_empty() {
        config.connections.keys().cloned().collect()
    } else {
        names.to_vec()
    };

    let driver = PostgresDriver::new().context("Failed to start database driver")?;
    let builder = ConnectionBuilder::new(driver, config);
    let registry = Registry::new(&builder);
    info!(
        "Checking {} connection(s) in scope {}",
        names.len(),
        registry.scope_id()
    );

    let outcomes = run_check(&registry, &names, lenient);
    for outcome in &outcomes {
        match outcome {
            CheckOutcome::Connected { name, label } => println!("✅ {name} ({label})"),
            CheckOutcome::Deferred { name } => println!("⏸️  {name} (not configured, deferred)"),
            CheckOutcome::Failed { name, error } => println!("❌ {name}: {error}"),
        }
    }

    registry.reset();
    Ok(!outcomes.iter().any(CheckOutcome::is_failure))
}
