use shardconn::cli::{Cli, Commands};
use shardconn::commands::{check, list};
use std::process;
use tracing_subscriber::EnvFilter;

// Allow println in main CLI binary
#[allow(clippy::disallowed_methods)]
fn main() {
    init_logging();

    let cli = Cli::parse();
    tracing::info!("shardconn CLI initialized");

    match cli.command {
        Some(Commands::List { config }) => {
            if let Err(e) = list::handle_list(&config) {
                eprintln!("Error: {e:#}");
                process::exit(1);
            }
        }
        Some(Commands::Check {
            config,
            names,
            lenient,
        }) => match check::handle_check(&config, &names, lenient) {
            Ok(true) => {}
            Ok(false) => process::exit(1),
            Err(e) => {
                eprintln!("Error: {e:#}");
                process::exit(1);
            }
        },
        None => {
            println!("shardconn - Use --help for available commands");
        }
    }
}

/// Initialize logging based on environment variables
fn init_logging() {
    // Default to INFO level, can be overridden by RUST_LOG environment variable
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("shardconn=info,warn"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .init();
}
