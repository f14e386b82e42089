// targetry-core/src/domain/target/redshift.rs

use serde::{Deserialize, Serialize};

use super::fields::{self, CommonFields, Extra, de};
use super::{FromProfile, ResolveContext, Source, TargetCommon, TargetDescriptor, expect_tag};
use crate::domain::backend::Backend;
use crate::domain::connection::{ConnectionConfig, RedshiftConnectionConfig};
use crate::domain::error::ConfigError;
use crate::domain::incremental::IncrementalKind;
use crate::domain::raw::RawTarget;

#[derive(Debug, Deserialize)]
struct RedshiftProfile {
    #[serde(default, alias = "dbname", deserialize_with = "de::text")]
    database: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    schema: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    host: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    user: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    password: Option<String>,
    #[serde(default, deserialize_with = "de::int_opt")]
    port: Option<u16>,
    #[serde(default, deserialize_with = "de::int_opt")]
    connect_timeout: Option<u32>,
    #[serde(default, deserialize_with = "de::text")]
    sslmode: Option<String>,
    #[serde(flatten)]
    inert: RedshiftInert,
    #[serde(flatten)]
    common: CommonFields,
    #[serde(flatten)]
    extra: Extra,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RedshiftInert {
    #[serde(default, deserialize_with = "de::flag_opt")]
    ra3_node: Option<bool>,
    #[serde(default, deserialize_with = "de::text")]
    search_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RedshiftTarget {
    common: TargetCommon,
    host: String,
    user: String,
    password: String,
    port: u16,
    connect_timeout: Option<u32>,
    sslmode: Option<String>,
}

impl FromProfile for RedshiftTarget {
    fn from_raw(raw: &RawTarget, _ctx: &ResolveContext<'_>) -> Result<Self, ConfigError> {
        expect_tag(raw, &["redshift"])?;
        let profile: RedshiftProfile = fields::parse(raw, &[&["database", "dbname"]])?;

        let database = fields::required_text(profile.database, &["database", "dbname"])?;
        let schema = fields::required_text(profile.schema, &["schema"])?;
        let host = fields::required_text(profile.host, &["host"])?;
        let user = fields::required_text(profile.user, &["user"])?;
        let password = fields::required(profile.password, &["password"])?;
        let port = fields::required(profile.port, &["port"])?;

        let inert = fields::present_keys(&profile.inert);
        let mut common = TargetCommon::new(profile.common, database, schema, 1, Source::Profile)?;
        common.seal(inert, profile.extra);

        Ok(Self {
            common,
            host,
            user,
            password,
            port,
            connect_timeout: profile.connect_timeout,
            sslmode: profile.sslmode,
        })
    }
}

impl TargetDescriptor for RedshiftTarget {
    fn backend(&self) -> Backend {
        Backend::Redshift
    }

    fn common(&self) -> &TargetCommon {
        &self.common
    }

    fn default_incremental_strategy(&self, _kind: IncrementalKind) -> &'static str {
        "append"
    }

    fn to_connection(&self) -> ConnectionConfig {
        ConnectionConfig::Redshift(RedshiftConnectionConfig {
            user: Some(self.user.clone()),
            password: Some(self.password.clone()),
            database: Some(self.common.database().to_string()),
            host: Some(self.host.clone()),
            port: Some(self.port),
            sslmode: self.sslmode.clone(),
            timeout: self.connect_timeout,
            concurrent_tasks: self.common.threads(),
        })
    }
}
