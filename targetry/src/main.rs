// targetry/src/main.rs

mod cli;
mod commands;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    // 1. Setup Logging (Tracing)
    // RUST_LOG=debug targetry connection ... to see dispatch details.
    // Logs go to stderr so stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Connection {
            target,
            format,
            show_secrets,
        } => commands::connection::execute(target, format, show_secrets)?,

        Commands::Metadata { target } => commands::metadata::execute(target)?,

        Commands::Strategy { target, kind } => commands::strategy::execute(target, kind)?,

        Commands::Backends { dbt_version } => commands::backends::execute(dbt_version)?,
    }

    Ok(())
}
