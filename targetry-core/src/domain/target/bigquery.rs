// targetry-core/src/domain/target/bigquery.rs

use serde::Deserialize;
use serde_yaml::Value;
use std::collections::BTreeSet;

use super::fields::{self, CommonFields, Extra, de};
use super::{
    FromProfile, ResolveContext, Reversible, Source, TargetCommon, TargetDescriptor, expect_tag,
    incompatible, settings_value,
};
use crate::domain::backend::Backend;
use crate::domain::connection::{
    BigQueryConnectionConfig, BigQueryMethod, BigQueryPriority, ConnectionConfig,
};
use crate::domain::error::ConfigError;
use crate::domain::incremental::IncrementalKind;
use crate::domain::raw::{RawTarget, Settings};

pub const DEFAULT_SCOPES: [&str; 3] = [
    "https://www.googleapis.com/auth/bigquery",
    "https://www.googleapis.com/auth/cloud-platform",
    "https://www.googleapis.com/auth/drive",
];

/// Schema placeholder when a target is rebuilt from a bare connection.
const UNKNOWN_SCHEMA: &str = "__unknown__";

const ALIASES: &[&[&str]] = &[&["schema", "dataset"], &["database", "project"]];

#[derive(Debug, Deserialize)]
struct BigQueryProfile {
    #[serde(default, alias = "dataset", deserialize_with = "de::text")]
    schema: Option<String>,
    #[serde(default, alias = "project", deserialize_with = "de::text")]
    database: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    method: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    priority: Option<String>,
    #[serde(default = "default_scopes", deserialize_with = "de::string_list")]
    scopes: Vec<String>,
    #[serde(default, deserialize_with = "de::text")]
    execution_project: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    quota_project: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    location: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    keyfile: Option<String>,
    #[serde(default)]
    keyfile_json: Option<Settings>,
    #[serde(default, deserialize_with = "de::text")]
    token: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    refresh_token: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    client_id: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    client_secret: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    token_uri: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    impersonated_service_account: Option<String>,
    #[serde(default, deserialize_with = "de::int_opt")]
    job_creation_timeout_seconds: Option<u32>,
    #[serde(default, deserialize_with = "de::int_opt")]
    job_execution_timeout_seconds: Option<u32>,
    #[serde(default, deserialize_with = "de::int_opt")]
    job_retries: Option<u32>,
    #[serde(default, deserialize_with = "de::int_opt")]
    job_retry_deadline_seconds: Option<u32>,
    #[serde(default, deserialize_with = "de::int_opt")]
    maximum_bytes_billed: Option<u64>,
    // legacy spellings
    #[serde(default, deserialize_with = "de::int_opt")]
    timeout_seconds: Option<u32>,
    #[serde(default, deserialize_with = "de::int_opt")]
    retries: Option<u32>,
    #[serde(flatten)]
    common: CommonFields,
    #[serde(flatten)]
    extra: Extra,
}

fn default_scopes() -> Vec<String> {
    DEFAULT_SCOPES.map(str::to_string).to_vec()
}

#[derive(Debug, Clone, PartialEq)]
pub struct BigQueryTarget {
    common: TargetCommon,
    method: BigQueryMethod,
    execution_project: Option<String>,
    quota_project: Option<String>,
    location: Option<String>,
    keyfile: Option<String>,
    keyfile_json: Option<Settings>,
    token: Option<String>,
    refresh_token: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    token_uri: Option<String>,
    scopes: Vec<String>,
    impersonated_service_account: Option<String>,
    job_creation_timeout_seconds: Option<u32>,
    job_execution_timeout_seconds: Option<u32>,
    job_retries: u32,
    job_retry_deadline_seconds: Option<u32>,
    priority: BigQueryPriority,
    maximum_bytes_billed: Option<u64>,
}

impl BigQueryTarget {
    pub fn method(&self) -> BigQueryMethod {
        self.method
    }

    pub fn project(&self) -> &str {
        self.common.database()
    }

    pub fn dataset(&self) -> &str {
        self.common.schema()
    }
}

fn parse_method(method: Option<String>) -> Result<BigQueryMethod, ConfigError> {
    match method {
        None => Ok(BigQueryMethod::default()),
        Some(method) => method.parse().map_err(|_| {
            let allowed = BigQueryMethod::ALL.map(|m| m.as_str()).join(", ");
            ConfigError::policy("method", method, format!("expected one of: {}", allowed))
        }),
    }
}

fn parse_priority(priority: Option<String>) -> Result<BigQueryPriority, ConfigError> {
    match priority {
        None => Ok(BigQueryPriority::default()),
        Some(priority) => priority
            .parse()
            .map_err(|_| ConfigError::policy("priority", priority, "expected interactive or batch")),
    }
}

impl BigQueryTarget {
    fn build(profile: BigQueryProfile, source: Source) -> Result<Self, ConfigError> {
        let schema = fields::required_text(profile.schema, &["schema", "dataset"])?;
        let database = fields::required_text(profile.database, &["database", "project"])?;

        // legacy spellings only apply when the current ones are absent
        let job_execution_timeout_seconds =
            profile.job_execution_timeout_seconds.or(profile.timeout_seconds);
        let job_retries = profile.job_retries.or(profile.retries).unwrap_or(1);

        let method = parse_method(profile.method)?;
        let priority = parse_priority(profile.priority)?;

        let mut common = TargetCommon::new(profile.common, database, schema, 1, source)?;
        common.seal(BTreeSet::new(), profile.extra);

        Ok(Self {
            common,
            method,
            execution_project: profile.execution_project,
            quota_project: profile.quota_project,
            location: profile.location,
            keyfile: profile.keyfile,
            keyfile_json: profile.keyfile_json,
            token: profile.token,
            refresh_token: profile.refresh_token,
            client_id: profile.client_id,
            client_secret: profile.client_secret,
            token_uri: profile.token_uri,
            scopes: profile.scopes,
            impersonated_service_account: profile.impersonated_service_account,
            job_creation_timeout_seconds: profile.job_creation_timeout_seconds,
            job_execution_timeout_seconds,
            job_retries,
            job_retry_deadline_seconds: profile.job_retry_deadline_seconds,
            priority,
            maximum_bytes_billed: profile.maximum_bytes_billed,
        })
    }
}

impl FromProfile for BigQueryTarget {
    fn from_raw(raw: &RawTarget, _ctx: &ResolveContext<'_>) -> Result<Self, ConfigError> {
        expect_tag(raw, &["bigquery"])?;
        Self::build(fields::parse(raw, ALIASES)?, Source::Profile)
    }
}

impl TargetDescriptor for BigQueryTarget {
    fn backend(&self) -> Backend {
        Backend::BigQuery
    }

    fn common(&self) -> &TargetCommon {
        &self.common
    }

    fn default_incremental_strategy(&self, _kind: IncrementalKind) -> &'static str {
        "merge"
    }

    fn to_connection(&self) -> ConnectionConfig {
        ConnectionConfig::BigQuery(BigQueryConnectionConfig {
            method: self.method,
            project: Some(self.common.database().to_string()),
            execution_project: self.execution_project.clone(),
            quota_project: self.quota_project.clone(),
            location: self.location.clone(),
            concurrent_tasks: self.common.threads(),
            keyfile: self.keyfile.clone(),
            keyfile_json: self.keyfile_json.clone(),
            token: self.token.clone(),
            refresh_token: self.refresh_token.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            token_uri: self.token_uri.clone(),
            scopes: self.scopes.clone(),
            impersonated_service_account: self.impersonated_service_account.clone(),
            job_creation_timeout_seconds: self.job_creation_timeout_seconds,
            job_execution_timeout_seconds: self.job_execution_timeout_seconds,
            job_retries: self.job_retries,
            job_retry_deadline_seconds: self.job_retry_deadline_seconds,
            priority: self.priority,
            maximum_bytes_billed: self.maximum_bytes_billed,
        })
    }
}

impl Reversible for BigQueryTarget {
    fn from_connection(
        connection: &ConnectionConfig,
        overrides: &RawTarget,
        _ctx: &ResolveContext<'_>,
    ) -> Result<Self, ConfigError> {
        let ConnectionConfig::BigQuery(config) = connection else {
            return Err(incompatible(Backend::BigQuery, connection));
        };

        let scopes = config.scopes.iter().cloned().map(Value::String).collect::<Vec<_>>();
        let mut raw = RawTarget::new()
            .with("type", "bigquery")
            .with("schema", UNKNOWN_SCHEMA)
            .with("method", config.method.as_str())
            .with("threads", config.concurrent_tasks)
            .with("scopes", Value::Sequence(scopes))
            .with("job_retries", config.job_retries)
            .with("priority", config.priority.as_str());
        raw.insert_some("project", config.project.clone());
        raw.insert_some("execution_project", config.execution_project.clone());
        raw.insert_some("quota_project", config.quota_project.clone());
        raw.insert_some("location", config.location.clone());
        raw.insert_some("keyfile", config.keyfile.clone());
        raw.insert_some("keyfile_json", config.keyfile_json.as_ref().map(settings_value));
        raw.insert_some("token", config.token.clone());
        raw.insert_some("refresh_token", config.refresh_token.clone());
        raw.insert_some("client_id", config.client_id.clone());
        raw.insert_some("client_secret", config.client_secret.clone());
        raw.insert_some("token_uri", config.token_uri.clone());
        raw.insert_some("impersonated_service_account", config.impersonated_service_account.clone());
        raw.insert_some("job_creation_timeout_seconds", config.job_creation_timeout_seconds);
        raw.insert_some("job_execution_timeout_seconds", config.job_execution_timeout_seconds);
        raw.insert_some("job_retry_deadline_seconds", config.job_retry_deadline_seconds);
        raw.insert_some("maximum_bytes_billed", config.maximum_bytes_billed);
        raw.merge(overrides);

        expect_tag(&raw, &["bigquery"])?;
        Self::build(fields::parse(&raw, ALIASES)?, Source::Connection)
    }
}
