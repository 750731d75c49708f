use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Main CLI interface for `shardconn`
#[derive(Parser)]
#[command(name = "shardconn")]
#[command(version = crate::VERSION)]
#[command(about = "shardconn - Named database connections for shards and replicas")]
pub struct Cli {
    /// The command to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// List configured connections
    List {
        /// Configuration file path
        #[arg(long, value_name = "FILE", default_value = "shardconn.toml")]
        config: PathBuf,
    },
    /// Open connections through a fresh registry and report the outcome
    Check {
        /// Configuration file path
        #[arg(long, value_name = "FILE", default_value = "shardconn.toml")]
        config: PathBuf,
        /// Connection names to check, every configured connection if omitted
        #[arg(value_name = "NAME")]
        names: Vec<String>,
        /// Defer unconfigured names instead of failing them
        #[arg(long)]
        lenient: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    #[must_use]
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}
