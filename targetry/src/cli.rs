// targetry/src/cli.rs
//
// Single source of truth for all CLI definitions (Clap structs).

use clap::{Args, Parser, Subcommand, ValueEnum};
use semver::Version;
use std::path::PathBuf;

use targetry_core::domain::IncrementalKind;

#[derive(Parser)]
#[command(name = "targetry")]
#[command(about = "Resolves warehouse profile targets into canonical connections", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Which profile target to resolve.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Directory containing profiles.yml
    #[arg(long, default_value = ".", env = "TARGETRY_PROFILES_DIR")]
    pub profiles_dir: PathBuf,

    /// Profile name (top-level key of profiles.yml)
    #[arg(long, short, env = "TARGETRY_PROFILE")]
    pub profile: String,

    /// Target name; defaults to the profile's `target`
    #[arg(long, short, env = "TARGETRY_TARGET")]
    pub target: Option<String>,

    /// dbt version the profile was written for
    #[arg(long, default_value = "1.8.0")]
    pub dbt_version: Version,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 🔌 Prints the canonical connection of a profile target
    Connection {
        #[command(flatten)]
        target: TargetArgs,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: OutputFormat,

        /// Print credentials instead of masking them
        #[arg(long, default_value = "false")]
        show_secrets: bool,
    },

    /// 🏷️  Prints the credential-free metadata of a profile target (JSON)
    Metadata {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// ♻️  Prints the default incremental strategy of a profile target
    Strategy {
        #[command(flatten)]
        target: TargetArgs,

        /// unique_key | time_range | unmanaged
        #[arg(long)]
        kind: IncrementalKind,
    },

    /// 📋 Lists the supported target types
    Backends {
        /// dbt version used to pick capability handles
        #[arg(long, default_value = "1.8.0")]
        dbt_version: Version,
    },
}
