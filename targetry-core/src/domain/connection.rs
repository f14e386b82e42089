// targetry-core/src/domain/connection.rs

// Canonical connection descriptors: the engine-side view of "how to connect to
// backend X with concurrency Y". Field names follow the execution engine, not
// the profile format.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::backend::Backend;
use crate::domain::error::ConfigError;
use crate::domain::raw::{RawTarget, Settings, describe, expectation};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ConnectionConfig {
    #[serde(rename = "duckdb")]
    DuckDb(DuckDbConnectionConfig),
    #[serde(rename = "snowflake")]
    Snowflake(SnowflakeConnectionConfig),
    #[serde(rename = "postgres")]
    Postgres(PostgresConnectionConfig),
    #[serde(rename = "redshift")]
    Redshift(RedshiftConnectionConfig),
    #[serde(rename = "databricks")]
    Databricks(DatabricksConnectionConfig),
    #[serde(rename = "bigquery")]
    BigQuery(BigQueryConnectionConfig),
    #[serde(rename = "mssql")]
    Mssql(MssqlConnectionConfig),
    #[serde(rename = "trino")]
    Trino(TrinoConnectionConfig),
    #[serde(rename = "clickhouse")]
    Clickhouse(ClickhouseConnectionConfig),
    #[serde(rename = "athena")]
    Athena(AthenaConnectionConfig),
}

impl ConnectionConfig {
    pub fn backend(&self) -> Backend {
        match self {
            Self::DuckDb(_) => Backend::DuckDb,
            Self::Snowflake(_) => Backend::Snowflake,
            Self::Postgres(_) => Backend::Postgres,
            Self::Redshift(_) => Backend::Redshift,
            Self::Databricks(_) => Backend::Databricks,
            Self::BigQuery(_) => Backend::BigQuery,
            Self::Mssql(_) => Backend::SqlServer,
            Self::Trino(_) => Backend::Trino,
            Self::Clickhouse(_) => Backend::Clickhouse,
            Self::Athena(_) => Backend::Athena,
        }
    }

    /// Engine-side type name, as serialized in the `type` field.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Mssql(_) => "mssql",
            other => other.backend().as_str(),
        }
    }

    pub fn concurrent_tasks(&self) -> u32 {
        match self {
            Self::DuckDb(c) => c.concurrent_tasks,
            Self::Snowflake(c) => c.concurrent_tasks,
            Self::Postgres(c) => c.concurrent_tasks,
            Self::Redshift(c) => c.concurrent_tasks,
            Self::Databricks(c) => c.concurrent_tasks,
            Self::BigQuery(c) => c.concurrent_tasks,
            Self::Mssql(c) => c.concurrent_tasks,
            Self::Trino(c) => c.concurrent_tasks,
            Self::Clickhouse(c) => c.concurrent_tasks,
            Self::Athena(c) => c.concurrent_tasks,
        }
    }

    /// Returns a copy with `overrides` laid over the canonical fields.
    ///
    /// Keys are engine field names. Unknown keys and ill-typed values are
    /// rejected; `type` may only restate the current engine type.
    pub fn with_overrides(&self, overrides: &RawTarget) -> Result<Self, ConfigError> {
        if let Some(value) = overrides.get("type") {
            let tag = value.as_str().unwrap_or_default();
            if tag != self.type_name() {
                return Err(ConfigError::policy(
                    "type",
                    tag,
                    "the connection type cannot be overridden",
                ));
            }
        }
        let overrides: Vec<(&str, &Value)> = overrides.iter().filter(|(key, _)| *key != "type").collect();
        if overrides.is_empty() {
            return Ok(self.clone());
        }
        let overrides = overrides.as_slice();
        let backend = self.backend();
        Ok(match self {
            Self::DuckDb(c) => Self::DuckDb(merge_fields(c, overrides, backend)?),
            Self::Snowflake(c) => Self::Snowflake(merge_fields(c, overrides, backend)?),
            Self::Postgres(c) => Self::Postgres(merge_fields(c, overrides, backend)?),
            Self::Redshift(c) => Self::Redshift(merge_fields(c, overrides, backend)?),
            Self::Databricks(c) => Self::Databricks(merge_fields(c, overrides, backend)?),
            Self::BigQuery(c) => Self::BigQuery(merge_fields(c, overrides, backend)?),
            Self::Mssql(c) => Self::Mssql(merge_fields(c, overrides, backend)?),
            Self::Trino(c) => Self::Trino(merge_fields(c, overrides, backend)?),
            Self::Clickhouse(c) => Self::Clickhouse(merge_fields(c, overrides, backend)?),
            Self::Athena(c) => Self::Athena(merge_fields(c, overrides, backend)?),
        })
    }
}

fn merge_fields<T>(config: &T, overrides: &[(&str, &Value)], backend: Backend) -> Result<T, ConfigError>
where
    T: Serialize + DeserializeOwned,
{
    overlay(config, overrides).map_err(|err| {
        // blame the first override that fails on its own
        let culprit = overrides.iter().find_map(|entry| {
            overlay(config, std::slice::from_ref(entry))
                .err()
                .map(|single| (entry, single))
        });
        match culprit {
            Some(((key, value), single)) => ConfigError::InvalidFieldType {
                field: key.to_string(),
                expected: expectation(&single),
                found: describe(value),
            },
            None => ConfigError::InvalidFieldType {
                field: overrides.iter().map(|(key, _)| *key).collect::<Vec<_>>().join(", "),
                expected: format!("valid {} connection fields", backend),
                found: err.to_string(),
            },
        }
    })
}

fn overlay<T>(config: &T, overrides: &[(&str, &Value)]) -> Result<T, serde_yaml::Error>
where
    T: Serialize + DeserializeOwned,
{
    let mut value = serde_yaml::to_value(config)?;
    if let Value::Mapping(fields) = &mut value {
        for (key, override_value) in overrides {
            fields.insert(Value::String(key.to_string()), (*override_value).clone());
        }
    }
    serde_yaml::from_value(value)
}

// =============================================================================
//  PER-ENGINE DESCRIPTORS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DuckDbConnectionConfig {
    /// Database file path, or `:memory:`.
    pub database: String,
    pub concurrent_tasks: u32,
    pub extensions: Option<Vec<Value>>,
    pub connector_config: Option<Settings>,
    pub secrets: Option<Vec<Settings>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SnowflakeConnectionConfig {
    pub account: String,
    pub user: String,
    pub password: Option<String>,
    pub authenticator: Option<String>,
    pub warehouse: Option<String>,
    pub database: Option<String>,
    pub role: Option<String>,
    pub concurrent_tasks: u32,
    pub token: Option<String>,
    pub private_key: Option<String>,
    pub private_key_path: Option<String>,
    pub private_key_passphrase: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PostgresConnectionConfig {
    pub host: String,
    pub user: String,
    pub password: String,
    pub port: u16,
    pub database: String,
    pub keepalives_idle: Option<u32>,
    pub concurrent_tasks: u32,
    pub connect_timeout: u32,
    pub role: Option<String>,
    pub sslmode: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RedshiftConnectionConfig {
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub sslmode: Option<String>,
    pub timeout: Option<u32>,
    pub concurrent_tasks: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabricksConnectionConfig {
    pub server_hostname: String,
    pub http_path: String,
    pub access_token: Option<String>,
    pub concurrent_tasks: u32,
    pub catalog: Option<String>,
    pub auth_type: Option<String>,
    pub oauth_client_id: Option<String>,
    pub oauth_client_secret: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BigQueryMethod {
    #[default]
    #[serde(rename = "oauth")]
    OAuth,
    #[serde(rename = "oauth-secrets")]
    OAuthSecrets,
    #[serde(rename = "service-account")]
    ServiceAccount,
    #[serde(rename = "service-account-json")]
    ServiceAccountJson,
}

impl BigQueryMethod {
    pub const ALL: [BigQueryMethod; 4] = [
        Self::OAuth,
        Self::OAuthSecrets,
        Self::ServiceAccount,
        Self::ServiceAccountJson,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OAuth => "oauth",
            Self::OAuthSecrets => "oauth-secrets",
            Self::ServiceAccount => "service-account",
            Self::ServiceAccountJson => "service-account-json",
        }
    }
}

impl std::str::FromStr for BigQueryMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| format!("Unknown BigQuery method: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BigQueryPriority {
    #[default]
    Interactive,
    Batch,
}

impl BigQueryPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Interactive => "interactive",
            Self::Batch => "batch",
        }
    }
}

impl std::str::FromStr for BigQueryPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "interactive" => Ok(Self::Interactive),
            "batch" => Ok(Self::Batch),
            _ => Err(format!("Unknown BigQuery priority: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BigQueryConnectionConfig {
    pub method: BigQueryMethod,
    pub project: Option<String>,
    pub execution_project: Option<String>,
    pub quota_project: Option<String>,
    pub location: Option<String>,
    pub concurrent_tasks: u32,
    pub keyfile: Option<String>,
    pub keyfile_json: Option<Settings>,
    pub token: Option<String>,
    pub refresh_token: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub token_uri: Option<String>,
    pub scopes: Vec<String>,
    pub impersonated_service_account: Option<String>,
    pub job_creation_timeout_seconds: Option<u32>,
    pub job_execution_timeout_seconds: Option<u32>,
    pub job_retries: u32,
    pub job_retry_deadline_seconds: Option<u32>,
    pub priority: BigQueryPriority,
    pub maximum_bytes_billed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MssqlConnectionConfig {
    pub host: String,
    pub user: String,
    pub password: String,
    pub port: u16,
    pub database: String,
    pub timeout: Option<u32>,
    pub login_timeout: Option<u32>,
    pub concurrent_tasks: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrinoAuthenticationMethod {
    NoAuth,
    Ldap,
    Kerberos,
    Jwt,
    Certificate,
    #[serde(rename = "oauth")]
    OAuth,
}

impl TrinoAuthenticationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoAuth => "no-auth",
            Self::Ldap => "ldap",
            Self::Kerberos => "kerberos",
            Self::Jwt => "jwt",
            Self::Certificate => "certificate",
            Self::OAuth => "oauth",
        }
    }
}

impl fmt::Display for TrinoAuthenticationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrinoConnectionConfig {
    pub method: TrinoAuthenticationMethod,
    pub host: String,
    pub user: Option<String>,
    pub catalog: String,
    pub port: u16,
    pub http_scheme: Option<String>,
    pub roles: Option<BTreeMap<String, String>>,
    pub http_headers: Option<BTreeMap<String, String>>,
    pub session_properties: Option<BTreeMap<String, String>>,
    pub retries: u32,
    pub timezone: Option<String>,
    // ldap
    pub password: Option<String>,
    pub impersonation_user: Option<String>,
    // kerberos
    pub keytab: Option<String>,
    pub krb5_config: Option<String>,
    pub principal: Option<String>,
    pub service_name: String,
    pub hostname_override: Option<String>,
    pub mutual_authentication: bool,
    pub force_preemptive: bool,
    pub sanitize_mutual_error_response: bool,
    pub delegate: bool,
    // jwt
    pub jwt_token: Option<String>,
    // certificate
    pub client_certificate: Option<String>,
    pub client_private_key: Option<String>,
    pub cert: Option<String>,
    pub concurrent_tasks: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClickhouseConnectionConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    pub port: Option<u16>,
    pub cluster: Option<String>,
    pub connect_timeout: u32,
    pub send_receive_timeout: u32,
    pub verify: bool,
    pub compression_method: Option<String>,
    pub connection_settings: Option<Settings>,
    pub concurrent_tasks: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AthenaConnectionConfig {
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub region_name: Option<String>,
    pub work_group: Option<String>,
    pub s3_staging_dir: Option<String>,
    pub s3_warehouse_location: Option<String>,
    pub schema_name: String,
    pub catalog_name: String,
    pub concurrent_tasks: u32,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn postgres() -> ConnectionConfig {
        ConnectionConfig::Postgres(PostgresConnectionConfig {
            host: "localhost".into(),
            user: "app".into(),
            password: "secret".into(),
            port: 5432,
            database: "analytics".into(),
            keepalives_idle: None,
            concurrent_tasks: 4,
            connect_timeout: 10,
            role: None,
            sslmode: Some("require".into()),
        })
    }

    #[test]
    fn test_serialized_shape_is_tagged() -> Result<()> {
        let yaml = serde_yaml::to_string(&postgres())?;
        assert!(yaml.starts_with("type: postgres\n"));
        let back: ConnectionConfig = serde_yaml::from_str(&yaml)?;
        assert_eq!(back, postgres());
        Ok(())
    }

    #[test]
    fn test_overrides_replace_fields() -> Result<()> {
        let overrides = RawTarget::new()
            .with("concurrent_tasks", 16)
            .with("role", "admin");
        let ConnectionConfig::Postgres(pg) = postgres().with_overrides(&overrides)? else {
            anyhow::bail!("Expected a postgres connection");
        };
        assert_eq!(pg.concurrent_tasks, 16);
        assert_eq!(pg.role.as_deref(), Some("admin"));
        assert_eq!(pg.host, "localhost");
        Ok(())
    }

    #[test]
    fn test_overrides_reject_unknown_and_ill_typed_fields() {
        let unknown = RawTarget::new().with("role", "admin").with("warp_speed", 9);
        assert!(matches!(
            postgres().with_overrides(&unknown),
            Err(ConfigError::InvalidFieldType { ref field, .. }) if field == "warp_speed"
        ));

        let ill_typed = RawTarget::new()
            .with("concurrent_tasks", 8)
            .with("port", "not-a-port")
            .with("role", "admin");
        let err = postgres().with_overrides(&ill_typed).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidFieldType { ref field, ref found, .. }
                if field == "port" && found == "string \"not-a-port\""
        ));

        let retype = RawTarget::new().with("type", "snowflake");
        assert!(matches!(
            postgres().with_overrides(&retype),
            Err(ConfigError::PolicyViolation { ref field, .. }) if field == "type"
        ));
    }

    #[test]
    fn test_overrides_may_restate_the_type() -> Result<()> {
        let same = RawTarget::new().with("type", "postgres").with("concurrent_tasks", 2);
        assert_eq!(postgres().with_overrides(&same)?.concurrent_tasks(), 2);

        let only_type = RawTarget::new().with("type", "postgres");
        assert_eq!(postgres().with_overrides(&only_type)?, postgres());

        let mssql = ConnectionConfig::Mssql(MssqlConnectionConfig {
            host: "h".into(),
            user: "u".into(),
            password: "p".into(),
            port: 1433,
            database: "master".into(),
            timeout: None,
            login_timeout: None,
            concurrent_tasks: 4,
        });
        assert!(mssql.with_overrides(&RawTarget::new().with("type", "mssql")).is_ok());
        Ok(())
    }

    #[test]
    fn test_bigquery_enums_parse() {
        use std::str::FromStr;
        assert_eq!(
            BigQueryMethod::from_str("service-account-json"),
            Ok(BigQueryMethod::ServiceAccountJson)
        );
        assert!(BigQueryMethod::from_str("password").is_err());
        assert_eq!(BigQueryPriority::from_str("BATCH"), Ok(BigQueryPriority::Batch));
    }

    #[test]
    fn test_mssql_type_name() {
        let conn = ConnectionConfig::Mssql(MssqlConnectionConfig {
            host: "sql.local".into(),
            user: "sa".into(),
            password: "pw".into(),
            port: 1433,
            database: "master".into(),
            timeout: None,
            login_timeout: None,
            concurrent_tasks: 4,
        });
        assert_eq!(conn.type_name(), "mssql");
        assert_eq!(conn.backend(), Backend::SqlServer);
        assert_eq!(conn.concurrent_tasks(), 4);
    }
}
