// targetry-core/src/infrastructure/config/profiles.rs

// profiles.yml loader:
//
//   jaffle_shop:            <- profile
//     target: dev           <- default target
//     outputs:
//       dev: { type: duckdb, path: jaffle.duckdb }
//
// The file is rendered with Jinja first so credentials can come from env_var().

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

use crate::domain::raw::RawTarget;
use crate::infrastructure::compiler::jinja::JinjaRenderer;
use crate::infrastructure::error::InfrastructureError;

pub const PROFILE_FILE_NAMES: [&str; 2] = ["profiles.yml", "profiles.yaml"];

/// Top-level key reserved for global settings, not a profile.
const GLOBAL_CONFIG_KEY: &str = "config";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProfileEntry {
    /// Target used when none is selected explicitly.
    pub target: Option<String>,
    #[serde(default)]
    pub outputs: BTreeMap<String, RawTarget>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfilesFile {
    pub path: PathBuf,
    pub profiles: BTreeMap<String, ProfileEntry>,
}

impl ProfilesFile {
    /// Parses already-rendered YAML.
    pub fn parse(content: &str, path: &Path) -> Result<Self, InfrastructureError> {
        let yaml_error = |source| InfrastructureError::YamlError {
            path: path.to_path_buf(),
            source,
        };

        let mut document: BTreeMap<String, serde_yaml::Value> =
            serde_yaml::from_str::<Option<_>>(content)
                .map_err(yaml_error)?
                .unwrap_or_default();
        document.remove(GLOBAL_CONFIG_KEY);

        let profiles = document
            .into_iter()
            .map(|(name, value)| {
                serde_yaml::from_value::<ProfileEntry>(value)
                    .map(|entry| (name, entry))
                    .map_err(yaml_error)
            })
            .collect::<Result<_, _>>()?;

        Ok(Self {
            path: path.to_path_buf(),
            profiles,
        })
    }

    pub fn profile_names(&self) -> Vec<String> {
        self.profiles.keys().cloned().collect()
    }

    /// Selects a raw target. Falls back to the profile's default target when
    /// `target` is `None`. `name` and `profile_name` are filled in unless the
    /// target already sets them.
    pub fn target(&self, profile: &str, target: Option<&str>) -> Result<RawTarget, InfrastructureError> {
        let entry = self
            .profiles
            .get(profile)
            .ok_or_else(|| InfrastructureError::ProfileNotFound {
                profile: profile.to_string(),
                available: self.profile_names(),
            })?;

        let target_name = match target {
            Some(name) => name,
            None => entry
                .target
                .as_deref()
                .ok_or_else(|| InfrastructureError::NoDefaultTarget(profile.to_string()))?,
        };

        let mut raw = entry
            .outputs
            .get(target_name)
            .cloned()
            .ok_or_else(|| InfrastructureError::TargetNotFound {
                profile: profile.to_string(),
                target: target_name.to_string(),
                available: entry.outputs.keys().cloned().collect(),
            })?;

        raw.insert_default("name", target_name);
        raw.insert_default("profile_name", profile);
        debug!(profile, target = target_name, "Selected profile target");
        Ok(raw)
    }
}

pub fn find_profiles_file(dir: &Path) -> Result<PathBuf, InfrastructureError> {
    PROFILE_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists())
        .ok_or_else(|| {
            InfrastructureError::ConfigNotFound(format!(
                "No profiles file found in {:?}. Checked: {:?}",
                dir, PROFILE_FILE_NAMES
            ))
        })
}

#[instrument(skip(dir))]
pub fn load_profiles(dir: &Path) -> Result<ProfilesFile, InfrastructureError> {
    load_profiles_with(dir, &JinjaRenderer::new())
}

/// Same as [`load_profiles`], with a caller-supplied renderer.
pub fn load_profiles_with(dir: &Path, renderer: &JinjaRenderer<'_>) -> Result<ProfilesFile, InfrastructureError> {
    let path = find_profiles_file(dir)?;
    info!(path = ?path, "Loading profiles");

    let template = fs::read_to_string(&path)?;
    let rendered = renderer.render(&template, &serde_json::Value::Null)?;
    ProfilesFile::parse(&rendered, &path)
}
