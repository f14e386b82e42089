// targetry-core/src/domain/target/databricks.rs

use serde::{Deserialize, Serialize};

use super::fields::{self, CommonFields, Extra, de};
use super::{FromProfile, ResolveContext, Source, TargetCommon, TargetDescriptor, expect_tag};
use crate::domain::backend::Backend;
use crate::domain::connection::{ConnectionConfig, DatabricksConnectionConfig};
use crate::domain::error::ConfigError;
use crate::domain::incremental::IncrementalKind;
use crate::domain::raw::RawTarget;

#[derive(Debug, Deserialize)]
struct DatabricksProfile {
    #[serde(default, deserialize_with = "de::text")]
    host: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    http_path: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    schema: Option<String>,
    #[serde(default, deserialize_with = "de::string")]
    catalog: String,
    #[serde(default, deserialize_with = "de::text")]
    token: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    auth_type: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    client_id: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    client_secret: Option<String>,
    #[serde(flatten)]
    inert: DatabricksInert,
    #[serde(flatten)]
    common: CommonFields,
    #[serde(flatten)]
    extra: Extra,
}

/// `database` has no meaning on Databricks; the catalog plays that role.
#[derive(Debug, Default, Serialize, Deserialize)]
struct DatabricksInert {
    #[serde(default, deserialize_with = "de::text")]
    database: Option<String>,
}

const PROFILE_OAUTH: &str = "oauth";
const ENGINE_OAUTH: &str = "databricks-oauth";

#[derive(Debug, Clone, PartialEq)]
pub struct DatabricksTarget {
    common: TargetCommon,
    host: String,
    http_path: String,
    // only required when auth_type is not oauth
    token: Option<String>,
    auth_type: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

impl DatabricksTarget {
    pub fn catalog(&self) -> Option<&str> {
        Some(self.common.database()).filter(|c| !c.is_empty())
    }

    fn engine_auth_type(&self) -> Option<String> {
        self.auth_type.as_deref().map(|auth| match auth {
            PROFILE_OAUTH => ENGINE_OAUTH.to_string(),
            other => other.to_string(),
        })
    }
}

impl FromProfile for DatabricksTarget {
    fn from_raw(raw: &RawTarget, _ctx: &ResolveContext<'_>) -> Result<Self, ConfigError> {
        expect_tag(raw, &["databricks"])?;
        let profile: DatabricksProfile = fields::parse(raw, &[])?;

        let host = fields::required_text(profile.host, &["host"])?;
        let http_path = fields::required_text(profile.http_path, &["http_path"])?;
        let schema = fields::required_text(profile.schema, &["schema"])?;

        let inert = fields::present_keys(&profile.inert);
        let mut common = TargetCommon::new(profile.common, profile.catalog, schema, 1, Source::Profile)?;

        // Anything but oauth needs a token up front.
        let has_token = profile.token.as_deref().is_some_and(|t| !t.is_empty());
        if !has_token && profile.auth_type.as_deref() != Some(PROFILE_OAUTH) {
            return Err(ConfigError::no_auth("Databricks", &["token", "auth_type: oauth"]));
        }

        common.seal(inert, profile.extra);
        Ok(Self {
            common,
            host,
            http_path,
            token: profile.token,
            auth_type: profile.auth_type,
            client_id: profile.client_id,
            client_secret: profile.client_secret,
        })
    }
}

impl TargetDescriptor for DatabricksTarget {
    fn backend(&self) -> Backend {
        Backend::Databricks
    }

    fn common(&self) -> &TargetCommon {
        &self.common
    }

    fn default_incremental_strategy(&self, _kind: IncrementalKind) -> &'static str {
        "merge"
    }

    fn to_connection(&self) -> ConnectionConfig {
        ConnectionConfig::Databricks(DatabricksConnectionConfig {
            server_hostname: self.host.clone(),
            http_path: self.http_path.clone(),
            access_token: self.token.clone(),
            concurrent_tasks: self.common.threads(),
            catalog: self.catalog().map(str::to_string),
            auth_type: self.engine_auth_type(),
            oauth_client_id: self.client_id.clone(),
            oauth_client_secret: self.client_secret.clone(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::super::test_support::build;
    use super::*;

    const BASE: &str = "type: databricks\nname: dev\nhost: adb-1.azuredatabricks.net\nhttp_path: /sql/1.0/warehouses/abc\nschema: bronze";

    #[test]
    fn test_catalog_is_the_database() -> anyhow::Result<()> {
        let target: DatabricksTarget = build(&format!("{BASE}\ntoken: dapi\ncatalog: main\ndatabase: ignored"))?;
        assert_eq!(target.common().database(), "main");
        assert!(target.common().inert_fields().contains("database"));

        let ConnectionConfig::Databricks(config) = target.to_connection() else {
            panic!("expected a databricks connection");
        };
        assert_eq!(config.catalog.as_deref(), Some("main"));
        assert_eq!(config.server_hostname, "adb-1.azuredatabricks.net");
        assert_eq!(config.access_token.as_deref(), Some("dapi"));
        Ok(())
    }

    #[test]
    fn test_oauth_does_not_need_a_token() -> anyhow::Result<()> {
        let target: DatabricksTarget = build(&format!("{BASE}\nauth_type: oauth\nclient_id: app"))?;
        let ConnectionConfig::Databricks(config) = target.to_connection() else {
            panic!("expected a databricks connection");
        };
        assert_eq!(config.auth_type.as_deref(), Some("databricks-oauth"));
        assert_eq!(config.oauth_client_id.as_deref(), Some("app"));
        assert_eq!(config.catalog, None);
        Ok(())
    }

    #[test]
    fn test_token_required_without_oauth() {
        let err = build::<DatabricksTarget>(BASE).unwrap_err();
        assert!(matches!(err, ConfigError::NoAuthenticationMethod { .. }));

        // Any other auth_type still needs a token at resolution time.
        let err = build::<DatabricksTarget>(&format!("{BASE}\nauth_type: azure-cli")).unwrap_err();
        assert!(matches!(err, ConfigError::NoAuthenticationMethod { ref backend, .. } if backend == "Databricks"));
        let oauth = build::<DatabricksTarget>(&format!("{BASE}\nauth_type: oauth\ntoken: ''\nclient_id: app"));
        assert!(oauth.is_ok());
    }
}
