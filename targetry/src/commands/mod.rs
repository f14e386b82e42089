// targetry/src/commands/mod.rs

pub mod backends;
pub mod connection;
pub mod metadata;
pub mod strategy;

use anyhow::Context;
use tracing::debug;

use crate::cli::TargetArgs;
use targetry_core::ResolveContext;
use targetry_core::application::{ResolvedTarget, TargetSelection, resolve_profile_target};
use targetry_core::ports::TracingWarnings;

/// Loads profiles.yml and resolves the selected target.
pub fn resolve(args: &TargetArgs) -> anyhow::Result<ResolvedTarget> {
    let selection = TargetSelection {
        profile: args.profile.clone(),
        target: args.target.clone(),
    };
    debug!(profiles_dir = ?args.profiles_dir, dbt_version = %args.dbt_version, "Resolving target");
    let warnings = TracingWarnings;
    let ctx = ResolveContext::new(&args.dbt_version, &warnings);

    resolve_profile_target(&args.profiles_dir, &selection, &ctx).with_context(|| {
        format!(
            "Failed to resolve profile '{}' from {}",
            args.profile,
            args.profiles_dir.display()
        )
    })
}
