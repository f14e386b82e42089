// targetry-core/src/domain/target/snowflake.rs

use serde::{Deserialize, Serialize};

use super::fields::{self, CommonFields, Extra, de};
use super::{FromProfile, ResolveContext, Source, TargetCommon, TargetDescriptor, expect_tag};
use crate::domain::backend::Backend;
use crate::domain::connection::{ConnectionConfig, SnowflakeConnectionConfig};
use crate::domain::error::ConfigError;
use crate::domain::incremental::IncrementalKind;
use crate::domain::raw::RawTarget;

/// Any one of these is enough to authenticate.
pub const AUTH_FIELDS: [&str; 4] = ["password", "authenticator", "private_key", "private_key_path"];

#[derive(Debug, Deserialize)]
struct SnowflakeProfile {
    #[serde(default, deserialize_with = "de::text")]
    account: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    user: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    database: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    schema: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    password: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    authenticator: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    private_key: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    private_key_path: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    private_key_passphrase: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    token: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    warehouse: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    role: Option<String>,
    #[serde(flatten)]
    inert: SnowflakeInert,
    #[serde(flatten)]
    common: CommonFields,
    #[serde(flatten)]
    extra: Extra,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SnowflakeInert {
    #[serde(default, deserialize_with = "de::flag_opt")]
    client_session_keep_alive: Option<bool>,
    #[serde(default, deserialize_with = "de::text")]
    query_tag: Option<String>,
    #[serde(default, deserialize_with = "de::int_opt")]
    connect_retries: Option<u64>,
    #[serde(default, deserialize_with = "de::int_opt")]
    connect_timeout: Option<u64>,
    #[serde(default, deserialize_with = "de::flag_opt")]
    retry_on_database_errors: Option<bool>,
    #[serde(default, deserialize_with = "de::flag_opt")]
    retry_all: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnowflakeTarget {
    common: TargetCommon,
    account: String,
    user: String,
    // user + password
    password: Option<String>,
    // SSO
    authenticator: Option<String>,
    // key pair
    private_key: Option<String>,
    private_key_path: Option<String>,
    private_key_passphrase: Option<String>,
    // OAuth access token
    token: Option<String>,
    warehouse: Option<String>,
    role: Option<String>,
}

impl SnowflakeTarget {
    pub fn account(&self) -> &str {
        &self.account
    }
}

impl FromProfile for SnowflakeTarget {
    fn from_raw(raw: &RawTarget, _ctx: &ResolveContext<'_>) -> Result<Self, ConfigError> {
        expect_tag(raw, &["snowflake"])?;
        let profile: SnowflakeProfile = fields::parse(raw, &[])?;

        let account = fields::required_text(profile.account, &["account"])?;
        let user = fields::required_text(profile.user, &["user"])?;
        let database = fields::required_text(profile.database, &["database"])?;
        let schema = fields::required_text(profile.schema, &["schema"])?;

        let inert = fields::present_keys(&profile.inert);
        let mut common = TargetCommon::new(profile.common, database, schema, 1, Source::Profile)?;

        let authenticated = [
            &profile.password,
            &profile.authenticator,
            &profile.private_key,
            &profile.private_key_path,
        ]
        .iter()
        .any(|field| field.as_deref().is_some_and(|v| !v.is_empty()));
        if !authenticated {
            return Err(ConfigError::no_auth("Snowflake", &AUTH_FIELDS));
        }

        common.seal(inert, profile.extra);
        Ok(Self {
            common,
            account,
            user,
            password: profile.password,
            authenticator: profile.authenticator,
            private_key: profile.private_key,
            private_key_path: profile.private_key_path,
            private_key_passphrase: profile.private_key_passphrase,
            token: profile.token,
            warehouse: profile.warehouse,
            role: profile.role,
        })
    }
}

impl TargetDescriptor for SnowflakeTarget {
    fn backend(&self) -> Backend {
        Backend::Snowflake
    }

    fn common(&self) -> &TargetCommon {
        &self.common
    }

    fn default_incremental_strategy(&self, _kind: IncrementalKind) -> &'static str {
        "merge"
    }

    fn to_connection(&self) -> ConnectionConfig {
        ConnectionConfig::Snowflake(SnowflakeConnectionConfig {
            account: self.account.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
            authenticator: self.authenticator.clone(),
            warehouse: self.warehouse.clone(),
            database: Some(self.common.database().to_string()),
            role: self.role.clone(),
            concurrent_tasks: self.common.threads(),
            token: self.token.clone(),
            private_key: self.private_key.clone(),
            private_key_path: self.private_key_path.clone(),
            private_key_passphrase: self.private_key_passphrase.clone(),
        })
    }
}
