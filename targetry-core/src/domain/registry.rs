// targetry-core/src/domain/registry.rs

// Static dispatch table from the `type` discriminant to a descriptor
// constructor. Built at compile time, read-only afterwards.

use tracing::debug;

use crate::domain::backend::Backend;
use crate::domain::error::ConfigError;
use crate::domain::raw::RawTarget;
use crate::domain::target::{
    AthenaTarget, BigQueryTarget, ClickhouseTarget, DatabricksTarget, DuckDbTarget, FromProfile,
    PostgresTarget, RedshiftTarget, ResolveContext, SnowflakeTarget, SqlServerTarget, TargetConfig,
    TrinoTarget,
};

type Constructor = fn(&RawTarget, &ResolveContext<'_>) -> Result<TargetConfig, ConfigError>;

fn construct<T>(raw: &RawTarget, ctx: &ResolveContext<'_>) -> Result<TargetConfig, ConfigError>
where
    T: FromProfile + Into<TargetConfig>,
{
    T::from_raw(raw, ctx).map(Into::into)
}

const REGISTRY: &[(&str, Backend, Constructor)] = &[
    ("databricks", Backend::Databricks, construct::<DatabricksTarget>),
    ("duckdb", Backend::DuckDb, construct::<DuckDbTarget>),
    ("postgres", Backend::Postgres, construct::<PostgresTarget>),
    ("redshift", Backend::Redshift, construct::<RedshiftTarget>),
    ("snowflake", Backend::Snowflake, construct::<SnowflakeTarget>),
    ("bigquery", Backend::BigQuery, construct::<BigQueryTarget>),
    ("sqlserver", Backend::SqlServer, construct::<SqlServerTarget>),
    ("tsql", Backend::SqlServer, construct::<SqlServerTarget>),
    ("trino", Backend::Trino, construct::<TrinoTarget>),
    ("athena", Backend::Athena, construct::<AthenaTarget>),
    ("clickhouse", Backend::Clickhouse, construct::<ClickhouseTarget>),
];

/// Every accepted `type` value, in registration order.
pub fn supported_types() -> impl Iterator<Item = &'static str> {
    REGISTRY.iter().map(|(tag, _, _)| *tag)
}

pub fn backend_for(tag: &str) -> Option<Backend> {
    REGISTRY
        .iter()
        .find(|(candidate, _, _)| *candidate == tag)
        .map(|(_, backend, _)| *backend)
}

/// Resolves a raw profile target with the default context.
pub fn resolve(raw: &RawTarget) -> Result<TargetConfig, ConfigError> {
    resolve_with(raw, &ResolveContext::default())
}

/// Picks the descriptor for `raw["type"]` and builds it. Validation errors
/// from the descriptor are returned unchanged.
pub fn resolve_with(raw: &RawTarget, ctx: &ResolveContext<'_>) -> Result<TargetConfig, ConfigError> {
    let tag = raw.type_tag()?;
    let (_, backend, constructor) = REGISTRY
        .iter()
        .find(|(candidate, _, _)| *candidate == tag)
        .ok_or_else(|| ConfigError::UnsupportedBackend(tag.to_string()))?;

    debug!(tag, backend = %backend, "Resolving profile target");
    constructor(raw, ctx)
}
