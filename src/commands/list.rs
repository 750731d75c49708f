use crate::config::Config;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;

/// Render one line per configured connection, sorted by normalized name
#[must_use]
pub fn render_connections(config: &Config) -> Vec<String> {
    config
        .connection_names()
        .into_iter()
        .filter_map(|name| {
            let (key, conn) = config
                .connections
                .iter()
                .find(|(key, _)| key.as_str() == name.original())?;
            let database = conn.dbname.as_deref().unwrap_or("-");
            Some(format!(
                "{name} ({key}) -> {}:{}/{database}",
                conn.host, conn.port
            ))
        })
        .collect()
}

/// Handle the list command
#[allow(clippy::disallowed_methods)]
pub fn handle_list(config_path: &Path) -> Result<()> {
    debug!("Loading configuration from {}", config_path.display());
    let config = Config::from_file(config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    if config.connections.is_empty() {
        println!("No connections configured in {}", config_path.display());
        return Ok(());
    }

    println!("🔌 Connections ({})", config.connections.len());
    for line in render_connections(&config) {
        println!("   {line}");
    }
    Ok(())
}
