// targetry-core/src/domain/backend.rs

use semver::Version;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The warehouses a profile target can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    DuckDb,
    Snowflake,
    Postgres,
    Redshift,
    Databricks,
    BigQuery,
    SqlServer,
    Trino,
    Clickhouse,
    Athena,
}

impl Backend {
    pub const ALL: [Backend; 10] = [
        Self::DuckDb,
        Self::Snowflake,
        Self::Postgres,
        Self::Redshift,
        Self::Databricks,
        Self::BigQuery,
        Self::SqlServer,
        Self::Trino,
        Self::Clickhouse,
        Self::Athena,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DuckDb => "duckdb",
            Self::Snowflake => "snowflake",
            Self::Postgres => "postgres",
            Self::Redshift => "redshift",
            Self::Databricks => "databricks",
            Self::BigQuery => "bigquery",
            Self::SqlServer => "sqlserver",
            Self::Trino => "trino",
            Self::Clickhouse => "clickhouse",
            Self::Athena => "athena",
        }
    }

    /// SQL dialect used when rendering for this backend.
    pub fn dialect(&self) -> &'static str {
        match self {
            Self::SqlServer => "tsql",
            other => other.as_str(),
        }
    }

    pub fn quote_policy(&self) -> QuotePolicy {
        match self {
            Self::Snowflake => QuotePolicy {
                database: false,
                schema: false,
                identifier: false,
            },
            _ => QuotePolicy::default(),
        }
    }

    /// Relation and column capability handles used by SQL rendering.
    ///
    /// Redshift shipped its own column type only before dbt 1.6.
    pub fn capabilities(&self, dbt_version: &Version) -> Capabilities {
        let (relation, column) = match self {
            Self::DuckDb => ("DuckDBRelation", GENERIC_COLUMN),
            Self::Snowflake => ("SnowflakeRelation", "SnowflakeColumn"),
            Self::Postgres => (GENERIC_RELATION, GENERIC_COLUMN),
            Self::Redshift if *dbt_version < Version::new(1, 6, 0) => {
                ("RedshiftRelation", "RedshiftColumn")
            }
            Self::Redshift => ("RedshiftRelation", GENERIC_COLUMN),
            Self::Databricks => ("DatabricksRelation", "DatabricksColumn"),
            Self::BigQuery => ("BigQueryRelation", "BigQueryColumn"),
            Self::SqlServer => (GENERIC_RELATION, "SQLServerColumn"),
            Self::Trino => ("TrinoRelation", "TrinoColumn"),
            Self::Clickhouse => ("ClickHouseRelation", "ClickHouseColumn"),
            Self::Athena => ("AthenaRelation", "AthenaColumn"),
        };
        Capabilities {
            relation: CapabilityHandle(relation),
            column: CapabilityHandle(column),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

const GENERIC_RELATION: &str = "BaseRelation";
const GENERIC_COLUMN: &str = "Column";

/// Which parts of a relation name get quoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotePolicy {
    pub database: bool,
    pub schema: bool,
    pub identifier: bool,
}

impl Default for QuotePolicy {
    fn default() -> Self {
        Self {
            database: true,
            schema: true,
            identifier: true,
        }
    }
}

/// Opaque name of a downstream capability type. The core only routes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CapabilityHandle(&'static str);

impl CapabilityHandle {
    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for CapabilityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub relation: CapabilityHandle,
    pub column: CapabilityHandle,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_defaults_to_tag() {
        assert_eq!(Backend::Postgres.dialect(), "postgres");
        assert_eq!(Backend::SqlServer.dialect(), "tsql");
    }

    #[test]
    fn test_quote_policy() {
        assert_eq!(Backend::Postgres.quote_policy(), QuotePolicy::default());
        assert!(!Backend::Snowflake.quote_policy().identifier);
    }

    #[test]
    fn test_redshift_column_depends_on_version() {
        let old = Backend::Redshift.capabilities(&Version::new(1, 5, 2));
        let new = Backend::Redshift.capabilities(&Version::new(1, 7, 0));
        assert_eq!(old.column.name(), "RedshiftColumn");
        assert_eq!(new.column.name(), "Column");
        assert_eq!(new.relation.name(), "RedshiftRelation");
    }

    #[test]
    fn test_every_backend_has_capabilities() {
        let version = Version::new(1, 8, 0);
        for backend in Backend::ALL {
            let caps = backend.capabilities(&version);
            assert!(!caps.relation.name().is_empty());
            assert!(!caps.column.name().is_empty());
        }
    }
}
