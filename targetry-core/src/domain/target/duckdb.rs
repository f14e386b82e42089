// targetry-core/src/domain/target/duckdb.rs

use semver::Version;
use serde::Deserialize;
use serde_yaml::Value;
use std::collections::BTreeSet;
use std::path::Path;

use super::fields::{self, CommonFields, Extra, de};
use super::{
    FromProfile, ResolveContext, Reversible, Source, TargetCommon, TargetDescriptor, expect_tag,
    incompatible, settings_value,
};
use crate::domain::backend::Backend;
use crate::domain::connection::{ConnectionConfig, DuckDbConnectionConfig};
use crate::domain::error::ConfigError;
use crate::domain::incremental::IncrementalKind;
use crate::domain::raw::{RawTarget, Settings};

pub const IN_MEMORY: &str = ":memory:";

const CLAMP_WARNING: &str = "DuckDB does not support concurrency - setting threads to 1.";

/// Catalog names are derived from the file path starting with this release.
const DERIVED_CATALOG_SINCE: Version = Version::new(1, 5, 0);

#[derive(Debug, Deserialize)]
struct DuckDbProfile {
    #[serde(default, deserialize_with = "de::text")]
    path: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    database: Option<String>,
    #[serde(default = "default_schema", deserialize_with = "de::string")]
    schema: String,
    #[serde(default)]
    extensions: Option<Vec<Value>>,
    #[serde(default)]
    settings: Option<Settings>,
    #[serde(default)]
    secrets: Option<Vec<Settings>>,
    #[serde(flatten)]
    common: CommonFields,
    #[serde(flatten)]
    extra: Extra,
}

fn default_schema() -> String {
    "main".to_string()
}

/// In-process file database.
#[derive(Debug, Clone, PartialEq)]
pub struct DuckDbTarget {
    common: TargetCommon,
    path: String,
    extensions: Option<Vec<Value>>,
    settings: Option<Settings>,
    secrets: Option<Vec<Settings>>,
}

impl DuckDbTarget {
    /// Database file, or `:memory:`.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_in_memory(&self) -> bool {
        self.path == IN_MEMORY
    }
}

fn derive_catalog(path: &str, dbt_version: &Version) -> String {
    if *dbt_version < DERIVED_CATALOG_SINCE {
        return "main".to_string();
    }
    if path == IN_MEMORY {
        return "memory".to_string();
    }
    Path::new(path)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .unwrap_or("memory")
        .to_string()
}

impl DuckDbTarget {
    fn build(profile: DuckDbProfile, ctx: &ResolveContext<'_>, source: Source) -> Result<Self, ConfigError> {
        // An empty path means in-memory in a profile; a connection keeps it verbatim.
        let path = match profile.path {
            Some(path) if !path.is_empty() || source == Source::Connection => path,
            _ => IN_MEMORY.to_string(),
        };
        let database = profile
            .database
            .filter(|database| !database.is_empty())
            .unwrap_or_else(|| derive_catalog(&path, ctx.dbt_version));

        let mut common = TargetCommon::new(profile.common, database, profile.schema, 1, source)?;
        common.seal(BTreeSet::new(), profile.extra);
        common.clamp_threads(ctx, CLAMP_WARNING);

        Ok(Self {
            common,
            path,
            extensions: profile.extensions,
            settings: profile.settings,
            secrets: profile.secrets,
        })
    }
}

impl FromProfile for DuckDbTarget {
    fn from_raw(raw: &RawTarget, ctx: &ResolveContext<'_>) -> Result<Self, ConfigError> {
        expect_tag(raw, &["duckdb"])?;
        Self::build(fields::parse(raw, &[])?, ctx, Source::Profile)
    }
}

impl TargetDescriptor for DuckDbTarget {
    fn backend(&self) -> Backend {
        Backend::DuckDb
    }

    fn common(&self) -> &TargetCommon {
        &self.common
    }

    fn default_incremental_strategy(&self, _kind: IncrementalKind) -> &'static str {
        "delete+insert"
    }

    fn to_connection(&self) -> ConnectionConfig {
        ConnectionConfig::DuckDb(DuckDbConnectionConfig {
            database: self.path.clone(),
            concurrent_tasks: 1,
            extensions: self.extensions.clone(),
            connector_config: self.settings.clone(),
            secrets: self.secrets.clone(),
        })
    }
}

impl Reversible for DuckDbTarget {
    fn from_connection(
        connection: &ConnectionConfig,
        overrides: &RawTarget,
        ctx: &ResolveContext<'_>,
    ) -> Result<Self, ConfigError> {
        let ConnectionConfig::DuckDb(config) = connection else {
            return Err(incompatible(Backend::DuckDb, connection));
        };

        let mut raw = RawTarget::new().with("type", "duckdb").with("path", config.database.clone());
        raw.insert_some("extensions", config.extensions.clone().map(Value::Sequence));
        raw.insert_some("settings", config.connector_config.as_ref().map(settings_value));
        raw.insert_some(
            "secrets",
            config
                .secrets
                .as_ref()
                .map(|secrets| Value::Sequence(secrets.iter().map(settings_value).collect())),
        );
        raw.merge(overrides);

        expect_tag(&raw, &["duckdb"])?;
        Self::build(fields::parse(&raw, &[])?, ctx, Source::Connection)
    }
}
