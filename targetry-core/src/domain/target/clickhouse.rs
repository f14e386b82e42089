// targetry-core/src/domain/target/clickhouse.rs

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use super::fields::{self, CommonFields, Extra, de};
use super::{FromProfile, ResolveContext, Source, TargetCommon, TargetDescriptor, expect_tag};
use crate::domain::backend::Backend;
use crate::domain::connection::{ClickhouseConnectionConfig, ConnectionConfig};
use crate::domain::error::ConfigError;
use crate::domain::incremental::IncrementalKind;
use crate::domain::raw::{RawTarget, Settings};

// An empty value in any of these falls back to the default.
const ALIASES: &[&[&str]] = &[&["host"], &["user", "username"], &["schema"]];

#[derive(Debug, Deserialize)]
struct ClickhouseProfile {
    #[serde(default = "default_host", deserialize_with = "de::string")]
    host: String,
    #[serde(default = "default_user", alias = "username", deserialize_with = "de::string")]
    user: String,
    #[serde(default, deserialize_with = "de::string")]
    password: String,
    #[serde(default = "default_schema", deserialize_with = "de::string")]
    schema: String,
    #[serde(default, deserialize_with = "de::string")]
    database: String,
    #[serde(default, deserialize_with = "de::int_opt")]
    port: Option<u16>,
    #[serde(default, deserialize_with = "de::text")]
    cluster: Option<String>,
    #[serde(default = "default_connect_timeout", deserialize_with = "de::int")]
    connect_timeout: u32,
    #[serde(default = "default_send_receive_timeout", deserialize_with = "de::int")]
    send_receive_timeout: u32,
    #[serde(default = "default_verify", deserialize_with = "de::flag")]
    verify: bool,
    #[serde(default, deserialize_with = "de::string")]
    compression: String,
    #[serde(default)]
    custom_settings: Option<Settings>,
    #[serde(flatten)]
    inert: ClickhouseInert,
    #[serde(flatten)]
    common: CommonFields,
    #[serde(flatten)]
    extra: Extra,
}

/// dbt-clickhouse tuning knobs with no engine counterpart.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ClickhouseInert {
    #[serde(default, deserialize_with = "de::text")]
    driver: Option<String>,
    #[serde(default, deserialize_with = "de::flag_opt")]
    secure: Option<bool>,
    #[serde(default, deserialize_with = "de::int_opt")]
    retries: Option<u64>,
    #[serde(default, deserialize_with = "de::text")]
    database_engine: Option<String>,
    #[serde(default, deserialize_with = "de::flag_opt")]
    cluster_mode: Option<bool>,
    #[serde(default, deserialize_with = "de::int_opt")]
    sync_request_timeout: Option<u64>,
    #[serde(default, deserialize_with = "de::int_opt")]
    compress_block_size: Option<u64>,
    #[serde(default, deserialize_with = "de::flag_opt")]
    check_exchange: Option<bool>,
    #[serde(default, deserialize_with = "de::flag_opt")]
    use_lw_deletes: Option<bool>,
    #[serde(default, deserialize_with = "de::flag_opt")]
    allow_automatic_deduplication: Option<bool>,
    // bool, or [idle_time_sec, interval_sec, count]
    #[serde(default)]
    tcp_keepalive: Option<Value>,
    #[serde(default, deserialize_with = "de::text")]
    local_suffix: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    local_db_prefix: Option<String>,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_user() -> String {
    "default".to_string()
}

fn default_schema() -> String {
    "default".to_string()
}

fn default_connect_timeout() -> u32 {
    10
}

fn default_send_receive_timeout() -> u32 {
    300
}

fn default_verify() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClickhouseTarget {
    common: TargetCommon,
    host: String,
    user: String,
    password: String,
    port: Option<u16>,
    cluster: Option<String>,
    connect_timeout: u32,
    send_receive_timeout: u32,
    verify: bool,
    compression: String,
    custom_settings: Option<Settings>,
}

impl FromProfile for ClickhouseTarget {
    fn from_raw(raw: &RawTarget, _ctx: &ResolveContext<'_>) -> Result<Self, ConfigError> {
        expect_tag(raw, &["clickhouse"])?;
        let profile: ClickhouseProfile = fields::parse(raw, ALIASES)?;

        let inert = fields::present_keys(&profile.inert);
        let mut common = TargetCommon::new(profile.common, profile.database, profile.schema, 1, Source::Profile)?;
        common.seal(inert, profile.extra);

        Ok(Self {
            common,
            host: profile.host,
            user: profile.user,
            password: profile.password,
            port: profile.port,
            cluster: profile.cluster,
            connect_timeout: profile.connect_timeout,
            send_receive_timeout: profile.send_receive_timeout,
            verify: profile.verify,
            compression: profile.compression,
            custom_settings: profile.custom_settings,
        })
    }
}

impl TargetDescriptor for ClickhouseTarget {
    fn backend(&self) -> Backend {
        Backend::Clickhouse
    }

    fn common(&self) -> &TargetCommon {
        &self.common
    }

    // dbt-clickhouse's name for the temp-table swap, which is also the engine's
    // default, so no translation is needed.
    fn default_incremental_strategy(&self, _kind: IncrementalKind) -> &'static str {
        "legacy"
    }

    fn to_connection(&self) -> ConnectionConfig {
        ConnectionConfig::Clickhouse(ClickhouseConnectionConfig {
            host: self.host.clone(),
            username: self.user.clone(),
            password: self.password.clone(),
            port: self.port,
            cluster: self.cluster.clone(),
            connect_timeout: self.connect_timeout,
            send_receive_timeout: self.send_receive_timeout,
            verify: self.verify,
            compression_method: Some(self.compression.clone()).filter(|c| !c.is_empty()),
            connection_settings: self.custom_settings.clone(),
            concurrent_tasks: self.common.threads(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::super::test_support::build;
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_everything_defaults() -> anyhow::Result<()> {
        let target: ClickhouseTarget = build("type: clickhouse\nname: dev")?;
        assert_eq!(target.common().schema(), "default");
        assert_eq!(target.common().database(), "");
        assert_eq!(
            target.to_connection(),
            ConnectionConfig::Clickhouse(ClickhouseConnectionConfig {
                host: "localhost".into(),
                username: "default".into(),
                password: "".into(),
                port: None,
                cluster: None,
                connect_timeout: 10,
                send_receive_timeout: 300,
                verify: true,
                compression_method: None,
                connection_settings: None,
                concurrent_tasks: 1,
            })
        );
        Ok(())
    }

    #[test]
    fn test_username_alias_and_tuning() -> anyhow::Result<()> {
        let target: ClickhouseTarget = build(
            "type: clickhouse\nname: dev\nusername: analyst\nport: 8443\ncompression: lz4\ncustom_settings:\n  max_threads: 8\ntcp_keepalive: [10, 5, 3]\nuse_lw_deletes: true",
        )?;
        let ConnectionConfig::Clickhouse(config) = target.to_connection() else {
            panic!("expected a clickhouse connection");
        };
        assert_eq!(config.username, "analyst");
        assert_eq!(config.port, Some(8443));
        assert_eq!(config.compression_method.as_deref(), Some("lz4"));
        assert!(config.connection_settings.unwrap().contains_key("max_threads"));
        assert_eq!(target.common().inert_fields().len(), 2);
        Ok(())
    }

    #[test]
    fn test_empty_values_fall_back_to_defaults() -> anyhow::Result<()> {
        let target: ClickhouseTarget =
            build("type: clickhouse\nname: dev\nhost: ''\nuser: ''\nschema: ''\ncompression: ''\nthreads: 3")?;
        assert_eq!(target.common().schema(), "default");
        let ConnectionConfig::Clickhouse(config) = target.to_connection() else {
            panic!("expected a clickhouse connection");
        };
        assert_eq!(config.host, "localhost");
        assert_eq!(config.username, "default");
        assert_eq!(config.compression_method, None);
        assert_eq!(config.concurrent_tasks, 3);
        Ok(())
    }

    #[test]
    fn test_strategy_is_legacy() -> anyhow::Result<()> {
        let target: ClickhouseTarget = build("type: clickhouse\nname: dev")?;
        assert_eq!(target.default_incremental_strategy(IncrementalKind::UniqueKey), "legacy");
        Ok(())
    }
}
