// targetry-core/src/application/resolve.rs

use std::path::Path;
use tracing::{info, instrument};

use crate::domain::connection::ConnectionConfig;
use crate::domain::metadata::TargetMetadata;
use crate::domain::raw::RawTarget;
use crate::domain::registry::resolve_with;
use crate::domain::target::{ResolveContext, TargetConfig};
use crate::error::TargetryError;
use crate::infrastructure::config::profiles::load_profiles;

/// Which target of which profile to resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSelection {
    pub profile: String,
    /// `None` picks the profile's default target.
    pub target: Option<String>,
}

/// A validated target along with the raw mapping it came from.
#[derive(Debug, Clone)]
pub struct ResolvedTarget {
    pub profile: String,
    pub raw: RawTarget,
    pub config: TargetConfig,
}

impl ResolvedTarget {
    pub fn connection(&self) -> ConnectionConfig {
        self.config.to_connection()
    }

    pub fn metadata(&self) -> TargetMetadata {
        self.config.metadata()
    }
}

/// Loads `profiles.yml` from `profiles_dir` and resolves one of its targets.
#[instrument(skip(profiles_dir, ctx))]
pub fn resolve_profile_target(
    profiles_dir: &Path,
    selection: &TargetSelection,
    ctx: &ResolveContext<'_>,
) -> Result<ResolvedTarget, TargetryError> {
    let profiles = load_profiles(profiles_dir)?;
    let raw = profiles.target(&selection.profile, selection.target.as_deref())?;
    let config = resolve_with(&raw, ctx)?;

    let extra = config.common().extra_fields();
    if !extra.is_empty() {
        info!(fields = ?extra, "Ignoring fields unknown to the {} backend", config.backend());
    }
    info!(
        target = config.name(),
        target_type = config.target_type(),
        "Resolved profile target"
    );

    Ok(ResolvedTarget {
        profile: selection.profile.clone(),
        raw,
        config,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::error::ConfigError;
    use crate::infrastructure::error::InfrastructureError;
    use anyhow::Result;
    use std::fs;

    fn selection(profile: &str, target: Option<&str>) -> TargetSelection {
        TargetSelection {
            profile: profile.to_string(),
            target: target.map(str::to_string),
        }
    }

    #[test]
    fn test_resolve_profile_target() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(
            dir.path().join("profiles.yml"),
            "shop:\n  target: local\n  outputs:\n    local:\n      type: duckdb\n      path: shop.duckdb\n      extra_knob: 1\n",
        )?;

        let resolved = resolve_profile_target(dir.path(), &selection("shop", None), &ResolveContext::default())?;
        assert_eq!(resolved.config.name(), "local");
        assert_eq!(resolved.config.common().profile_name(), Some("shop"));
        assert_eq!(resolved.metadata().database, "shop");
        assert!(resolved.config.common().extra_fields().contains("extra_knob"));
        assert!(matches!(resolved.connection(), ConnectionConfig::DuckDb(_)));
        Ok(())
    }

    #[test]
    fn test_errors_keep_their_layer() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(
            dir.path().join("profiles.yml"),
            "shop:\n  target: local\n  outputs:\n    local:\n      type: oracle\n",
        )?;

        let err = resolve_profile_target(dir.path(), &selection("shop", None), &ResolveContext::default())
            .unwrap_err();
        assert!(matches!(err, TargetryError::Config(ConfigError::UnsupportedBackend(_))));

        let err = resolve_profile_target(dir.path(), &selection("other", None), &ResolveContext::default())
            .unwrap_err();
        assert!(matches!(
            err,
            TargetryError::Infrastructure(InfrastructureError::ProfileNotFound { .. })
        ));
        Ok(())
    }
}
