// targetry-core/src/domain/target/sqlserver.rs

use serde::{Deserialize, Serialize};

use super::fields::{self, CommonFields, Extra, de};
use super::{FromProfile, ResolveContext, Source, TargetCommon, TargetDescriptor, expect_tag};
use crate::domain::backend::Backend;
use crate::domain::connection::{ConnectionConfig, MssqlConnectionConfig};
use crate::domain::error::ConfigError;
use crate::domain::incremental::IncrementalKind;
use crate::domain::raw::RawTarget;

/// Both spellings resolve to this descriptor.
pub const TAGS: [&str; 2] = ["sqlserver", "tsql"];

const SQL_AUTHENTICATION: &str = "sql";

const HOST: &[&str] = &["host", "server"];
const USER: &[&str] = &["user", "username", "UID"];
const PASSWORD: &[&str] = &["password", "PWD"];

#[derive(Debug, Deserialize)]
struct SqlServerProfile {
    #[serde(default, alias = "server", deserialize_with = "de::text")]
    host: Option<String>,
    #[serde(default, alias = "username", alias = "UID", deserialize_with = "de::text")]
    user: Option<String>,
    #[serde(default, alias = "PWD", deserialize_with = "de::text")]
    password: Option<String>,
    #[serde(default = "default_database", deserialize_with = "de::string")]
    database: String,
    #[serde(default = "default_schema", deserialize_with = "de::string")]
    schema: String,
    #[serde(default = "default_port", deserialize_with = "de::int")]
    port: u16,
    #[serde(default, deserialize_with = "de::int_opt")]
    login_timeout: Option<u32>,
    #[serde(default, deserialize_with = "de::int_opt")]
    query_timeout: Option<u32>,
    #[serde(default = "default_authentication", deserialize_with = "de::string")]
    authentication: String,
    #[serde(flatten)]
    inert: SqlServerInert,
    #[serde(flatten)]
    common: CommonFields,
    #[serde(flatten)]
    extra: Extra,
}

/// ODBC and Azure AD settings. The engine talks TDS directly and never reads them.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SqlServerInert {
    #[serde(default, deserialize_with = "de::text")]
    schema_authorization: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    driver: Option<String>,
    #[serde(default, deserialize_with = "de::flag_opt")]
    encrypt: Option<bool>,
    #[serde(default, deserialize_with = "de::flag_opt")]
    trust_cert: Option<bool>,
    #[serde(default, deserialize_with = "de::int_opt")]
    retries: Option<u64>,
    #[serde(default, deserialize_with = "de::flag_opt")]
    windows_login: Option<bool>,
    #[serde(default, deserialize_with = "de::text")]
    tenant_id: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    client_id: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    client_secret: Option<String>,
}

fn default_database() -> String {
    "master".to_string()
}

fn default_schema() -> String {
    "dbo".to_string()
}

fn default_port() -> u16 {
    1433
}

fn default_authentication() -> String {
    SQL_AUTHENTICATION.to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqlServerTarget {
    common: TargetCommon,
    tag: &'static str,
    host: String,
    user: String,
    password: String,
    port: u16,
    login_timeout: Option<u32>,
    query_timeout: Option<u32>,
}

impl SqlServerTarget {
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn user(&self) -> &str {
        &self.user
    }
}

impl FromProfile for SqlServerTarget {
    fn from_raw(raw: &RawTarget, _ctx: &ResolveContext<'_>) -> Result<Self, ConfigError> {
        let tag = expect_tag(raw, &TAGS)?;
        let profile: SqlServerProfile = fields::parse(raw, &[HOST, USER, PASSWORD])?;

        let host = fields::required_text(profile.host, HOST)?;
        let user = fields::required_text(profile.user, USER)?;
        let password = fields::required_text(profile.password, PASSWORD)?;

        let inert = fields::present_keys(&profile.inert);
        let mut common = TargetCommon::new(profile.common, profile.database, profile.schema, 4, Source::Profile)?;

        if profile.authentication != SQL_AUTHENTICATION {
            return Err(ConfigError::policy(
                "authentication",
                profile.authentication,
                "only SQL authentication is supported for SQL Server",
            ));
        }

        common.seal(inert, profile.extra);
        Ok(Self {
            common,
            tag,
            host,
            user,
            password,
            port: profile.port,
            login_timeout: profile.login_timeout,
            query_timeout: profile.query_timeout,
        })
    }
}

impl TargetDescriptor for SqlServerTarget {
    fn backend(&self) -> Backend {
        Backend::SqlServer
    }

    fn common(&self) -> &TargetCommon {
        &self.common
    }

    fn target_type(&self) -> &str {
        self.tag
    }

    // https://github.com/microsoft/dbt-fabric/blob/main/dbt/include/fabric/macros/materializations/models/incremental/incremental_strategies.sql
    fn default_incremental_strategy(&self, kind: IncrementalKind) -> &'static str {
        match kind {
            IncrementalKind::UniqueKey => "delete+insert",
            _ => "append",
        }
    }

    fn to_connection(&self) -> ConnectionConfig {
        ConnectionConfig::Mssql(MssqlConnectionConfig {
            host: self.host.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
            port: self.port,
            database: self.common.database().to_string(),
            timeout: self.query_timeout,
            login_timeout: self.login_timeout,
            concurrent_tasks: self.common.threads(),
        })
    }
}
