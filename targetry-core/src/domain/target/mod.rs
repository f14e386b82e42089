// targetry-core/src/domain/target/mod.rs

// One validated descriptor per warehouse. Each backend module deserializes its
// own profile struct (see `fields`), then in `from_raw`:
//   1. required fields
//   2. cross-field defaults
//   3. backend policy checks

pub mod athena;
pub mod bigquery;
pub mod clickhouse;
pub mod databricks;
pub mod duckdb;
pub(crate) mod fields;
pub mod postgres;
pub mod redshift;
pub mod snowflake;
pub mod sqlserver;
pub mod trino;

pub use athena::AthenaTarget;
pub use bigquery::BigQueryTarget;
pub use clickhouse::ClickhouseTarget;
pub use databricks::DatabricksTarget;
pub use duckdb::DuckDbTarget;
pub use postgres::PostgresTarget;
pub use redshift::RedshiftTarget;
pub use snowflake::SnowflakeTarget;
pub use sqlserver::SqlServerTarget;
pub use trino::TrinoTarget;

use semver::Version;
use serde_yaml::Value;
use std::collections::BTreeSet;
use std::fmt;

use crate::domain::backend::{Backend, Capabilities, QuotePolicy};
use crate::domain::connection::ConnectionConfig;
use crate::domain::error::ConfigError;
use crate::domain::incremental::IncrementalKind;
use crate::domain::metadata::TargetMetadata;
use crate::domain::raw::{RawTarget, Settings};
use crate::ports::warnings::{TRACING_WARNINGS, WarningSink};
use fields::{CommonFields, Extra};

/// dbt version assumed when the caller does not say otherwise.
pub static DEFAULT_DBT_VERSION: Version = Version::new(1, 8, 0);

/// Collaborators injected into resolution.
#[derive(Clone, Copy)]
pub struct ResolveContext<'a> {
    /// Version of the ecosystem that authored the profile. Some defaults
    /// changed across releases.
    pub dbt_version: &'a Version,
    pub warnings: &'a dyn WarningSink,
}

impl<'a> ResolveContext<'a> {
    pub fn new(dbt_version: &'a Version, warnings: &'a dyn WarningSink) -> Self {
        Self {
            dbt_version,
            warnings,
        }
    }
}

impl Default for ResolveContext<'static> {
    fn default() -> Self {
        Self {
            dbt_version: &DEFAULT_DBT_VERSION,
            warnings: &TRACING_WARNINGS,
        }
    }
}

impl fmt::Debug for ResolveContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolveContext")
            .field("dbt_version", &self.dbt_version.to_string())
            .finish_non_exhaustive()
    }
}

// =============================================================================
//  COMMON FIELDS
// =============================================================================

/// Attributes shared by every warehouse descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetCommon {
    name: String,
    database: String,
    schema: String,
    threads: u32,
    profile_name: Option<String>,
    inert: BTreeSet<String>,
    extra: BTreeSet<String>,
}

/// Where a descriptor's fields came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Source {
    /// A user-authored profile target.
    Profile,
    /// A canonical connection turned back into a target. Values the engine
    /// already holds pass through unchanged, so `concurrent_tasks: 0` maps
    /// back to `threads: 0`.
    Connection,
}

impl TargetCommon {
    /// Settles `name`, `threads` and `profile_name` once the backend has
    /// settled its database and schema.
    pub(crate) fn new(
        common: CommonFields,
        database: String,
        schema: String,
        default_threads: u32,
        source: Source,
    ) -> Result<Self, ConfigError> {
        let name = fields::required_text(common.name, &["name"])?;
        let threads = common.threads.unwrap_or(default_threads);
        if threads == 0 && source == Source::Profile {
            return Err(ConfigError::policy(
                "threads",
                "0",
                "at least one thread is required",
            ));
        }

        Ok(Self {
            name,
            database,
            schema,
            threads,
            profile_name: common.profile_name,
            inert: BTreeSet::new(),
            extra: BTreeSet::new(),
        })
    }

    /// Seals the descriptor: records inert and unknown keys.
    pub(crate) fn seal(&mut self, inert: BTreeSet<String>, extra: Extra) {
        if !inert.is_empty() {
            tracing::debug!(fields = ?inert, "Accepted fields not used by the engine");
        }
        self.inert = inert;
        self.extra = extra.into_keys().collect();
    }

    /// Forces single-threaded execution, reporting it once.
    pub(crate) fn clamp_threads(&mut self, ctx: &ResolveContext<'_>, message: &str) {
        if self.threads > 1 {
            ctx.warnings.warn(message);
            self.threads = 1;
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn threads(&self) -> u32 {
        self.threads
    }

    pub fn profile_name(&self) -> Option<&str> {
        self.profile_name.as_deref()
    }

    /// Keys the profile set that are accepted for compatibility but never
    /// reach the canonical connection.
    pub fn inert_fields(&self) -> &BTreeSet<String> {
        &self.inert
    }

    /// Keys the backend does not know about at all.
    pub fn extra_fields(&self) -> &BTreeSet<String> {
        &self.extra
    }
}

/// Checks the raw `type` against the tags a constructor accepts.
///
/// A missing tag means the caller picked the constructor explicitly.
pub(crate) fn expect_tag(
    raw: &RawTarget,
    accepted: &[&'static str],
) -> Result<&'static str, ConfigError> {
    let default = accepted.first().copied().unwrap_or_default();
    match raw.type_tag() {
        Err(ConfigError::MissingDiscriminant) => Ok(default),
        Err(other) => Err(other),
        Ok(tag) => accepted
            .iter()
            .find(|candidate| **candidate == tag)
            .copied()
            .ok_or_else(|| ConfigError::IncompatibleDescriptorType {
                expected: accepted.join(" | "),
                found: tag.to_string(),
            }),
    }
}

pub(crate) fn incompatible(expected: Backend, found: &ConnectionConfig) -> ConfigError {
    ConfigError::IncompatibleDescriptorType {
        expected: expected.as_str().to_string(),
        found: found.type_name().to_string(),
    }
}

pub(crate) fn settings_value(settings: &Settings) -> Value {
    Value::Mapping(
        settings
            .iter()
            .map(|(k, v)| (Value::String(k.clone()), v.clone()))
            .collect(),
    )
}

// =============================================================================
//  DESCRIPTOR CONTRACT
// =============================================================================

/// Behaviour every validated warehouse descriptor exposes.
pub trait TargetDescriptor: fmt::Debug + Send + Sync {
    fn backend(&self) -> Backend;

    fn common(&self) -> &TargetCommon;

    /// The discriminant the descriptor was resolved from.
    fn target_type(&self) -> &str {
        self.backend().as_str()
    }

    /// Materialization strategy used for an incremental kind when the model
    /// does not pick one. Backend policy, not derived.
    fn default_incremental_strategy(&self, kind: IncrementalKind) -> &'static str;

    /// Canonical connection. Fields the engine does not use are dropped.
    fn to_connection(&self) -> ConnectionConfig;

    fn to_connection_with(&self, overrides: &RawTarget) -> Result<ConnectionConfig, ConfigError> {
        self.to_connection().with_overrides(overrides)
    }

    fn dialect(&self) -> &'static str {
        self.backend().dialect()
    }

    fn quote_policy(&self) -> QuotePolicy {
        self.backend().quote_policy()
    }

    /// Credential-free projection for templates.
    fn metadata(&self) -> TargetMetadata {
        let common = self.common();
        TargetMetadata {
            target_type: self.target_type().to_string(),
            name: common.name().to_string(),
            database: common.database().to_string(),
            schema: common.schema().to_string(),
            target_name: common.name().to_string(),
        }
    }
}

/// Construction from a raw profile target.
pub trait FromProfile: TargetDescriptor + Sized {
    fn from_raw(raw: &RawTarget, ctx: &ResolveContext<'_>) -> Result<Self, ConfigError>;
}

/// Backends whose canonical connection can be turned back into a target.
pub trait Reversible: FromProfile {
    /// `overrides` carries profile keys the connection cannot supply
    /// (`name` at minimum) and wins over derived values.
    fn from_connection(
        connection: &ConnectionConfig,
        overrides: &RawTarget,
        ctx: &ResolveContext<'_>,
    ) -> Result<Self, ConfigError>;
}

// =============================================================================
//  TAGGED UNION
// =============================================================================

/// A validated profile target for any supported warehouse.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetConfig {
    DuckDb(DuckDbTarget),
    Snowflake(SnowflakeTarget),
    Postgres(PostgresTarget),
    Redshift(RedshiftTarget),
    Databricks(DatabricksTarget),
    BigQuery(BigQueryTarget),
    SqlServer(SqlServerTarget),
    Trino(TrinoTarget),
    Clickhouse(ClickhouseTarget),
    Athena(AthenaTarget),
}

impl TargetConfig {
    pub fn descriptor(&self) -> &dyn TargetDescriptor {
        match self {
            Self::DuckDb(t) => t,
            Self::Snowflake(t) => t,
            Self::Postgres(t) => t,
            Self::Redshift(t) => t,
            Self::Databricks(t) => t,
            Self::BigQuery(t) => t,
            Self::SqlServer(t) => t,
            Self::Trino(t) => t,
            Self::Clickhouse(t) => t,
            Self::Athena(t) => t,
        }
    }

    pub fn backend(&self) -> Backend {
        self.descriptor().backend()
    }

    pub fn target_type(&self) -> &str {
        self.descriptor().target_type()
    }

    pub fn common(&self) -> &TargetCommon {
        self.descriptor().common()
    }

    pub fn name(&self) -> &str {
        self.common().name()
    }

    pub fn database(&self) -> &str {
        self.common().database()
    }

    pub fn schema(&self) -> &str {
        self.common().schema()
    }

    pub fn threads(&self) -> u32 {
        self.common().threads()
    }

    pub fn dialect(&self) -> &'static str {
        self.descriptor().dialect()
    }

    pub fn quote_policy(&self) -> QuotePolicy {
        self.descriptor().quote_policy()
    }

    pub fn capabilities(&self, dbt_version: &Version) -> Capabilities {
        self.backend().capabilities(dbt_version)
    }

    pub fn default_incremental_strategy(&self, kind: IncrementalKind) -> &'static str {
        self.descriptor().default_incremental_strategy(kind)
    }

    pub fn to_connection(&self) -> ConnectionConfig {
        self.descriptor().to_connection()
    }

    pub fn to_connection_with(&self, overrides: &RawTarget) -> Result<ConnectionConfig, ConfigError> {
        self.descriptor().to_connection_with(overrides)
    }

    pub fn metadata(&self) -> TargetMetadata {
        self.descriptor().metadata()
    }

    /// Inverse translation for the backends that support it.
    pub fn from_connection(
        connection: &ConnectionConfig,
        overrides: &RawTarget,
        ctx: &ResolveContext<'_>,
    ) -> Result<Self, ConfigError> {
        match connection {
            ConnectionConfig::DuckDb(_) => {
                DuckDbTarget::from_connection(connection, overrides, ctx).map(Self::DuckDb)
            }
            ConnectionConfig::Postgres(_) => {
                PostgresTarget::from_connection(connection, overrides, ctx).map(Self::Postgres)
            }
            ConnectionConfig::BigQuery(_) => {
                BigQueryTarget::from_connection(connection, overrides, ctx).map(Self::BigQuery)
            }
            other => Err(ConfigError::IncompatibleDescriptorType {
                expected: "duckdb | postgres | bigquery".to_string(),
                found: other.type_name().to_string(),
            }),
        }
    }
}

macro_rules! into_target_config {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for TargetConfig {
                fn from(target: $ty) -> Self {
                    TargetConfig::$variant(target)
                }
            }
        )*
    };
}

into_target_config! {
    DuckDb => DuckDbTarget,
    Snowflake => SnowflakeTarget,
    Postgres => PostgresTarget,
    Redshift => RedshiftTarget,
    Databricks => DatabricksTarget,
    BigQuery => BigQueryTarget,
    SqlServer => SqlServerTarget,
    Trino => TrinoTarget,
    Clickhouse => ClickhouseTarget,
    Athena => AthenaTarget,
}


#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::test_support::raw;
    use super::*;

    #[test]
    fn test_expect_tag() {
        assert_eq!(expect_tag(&raw("host: x"), &["sqlserver", "tsql"]), Ok("sqlserver"));
        assert_eq!(expect_tag(&raw("type: tsql"), &["sqlserver", "tsql"]), Ok("tsql"));
        assert!(matches!(
            expect_tag(&raw("type: postgres"), &["duckdb"]),
            Err(ConfigError::IncompatibleDescriptorType { .. })
        ));
    }

    #[test]
    fn test_common_rejects_zero_threads_from_profiles_only() {
        let fields = || CommonFields {
            name: Some("dev".into()),
            profile_name: None,
            threads: Some(0),
        };
        let err = TargetCommon::new(fields(), "db".into(), "main".into(), 1, Source::Profile).unwrap_err();
        assert!(matches!(err, ConfigError::PolicyViolation { field, .. } if field == "threads"));

        let common = TargetCommon::new(fields(), "db".into(), "main".into(), 1, Source::Connection).unwrap();
        assert_eq!(common.threads(), 0);
    }

    #[test]
    fn test_common_requires_non_empty_name() {
        let fields = CommonFields {
            name: Some(String::new()),
            ..CommonFields::default()
        };
        let err = TargetCommon::new(fields, "db".into(), "main".into(), 1, Source::Profile).unwrap_err();
        assert_eq!(err, ConfigError::missing(&["name"]));
    }
}
