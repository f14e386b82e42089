// targetry-core/src/domain/target/postgres.rs

use serde::{Deserialize, Serialize};

use super::fields::{self, CommonFields, Extra, de};
use super::{
    FromProfile, ResolveContext, Reversible, Source, TargetCommon, TargetDescriptor, expect_tag,
    incompatible,
};
use crate::domain::backend::Backend;
use crate::domain::connection::{ConnectionConfig, PostgresConnectionConfig};
use crate::domain::error::ConfigError;
use crate::domain::incremental::IncrementalKind;
use crate::domain::raw::RawTarget;

const ALIASES: &[&[&str]] = &[&["database", "dbname"]];

#[derive(Debug, Deserialize)]
struct PostgresProfile {
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
    keepalives_idle: Option<u32>,
    #[serde(default = "default_connect_timeout", deserialize_with = "de::int")]
    connect_timeout: u32,
    #[serde(default, deserialize_with = "de::text")]
    role: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    sslmode: Option<String>,
    #[serde(flatten)]
    inert: PostgresInert,
    #[serde(flatten)]
    common: CommonFields,
    #[serde(flatten)]
    extra: Extra,
}

/// Accepted but not used by the engine.
#[derive(Debug, Default, Serialize, Deserialize)]
struct PostgresInert {
    #[serde(default, deserialize_with = "de::int_opt")]
    retries: Option<u64>,
    #[serde(default, deserialize_with = "de::text")]
    search_path: Option<String>,
}

fn default_connect_timeout() -> u32 {
    10
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostgresTarget {
    common: TargetCommon,
    host: String,
    user: String,
    password: String,
    port: u16,
    keepalives_idle: Option<u32>,
    connect_timeout: u32,
    role: Option<String>,
    sslmode: Option<String>,
}

impl PostgresTarget {
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl PostgresTarget {
    fn build(profile: PostgresProfile, source: Source) -> Result<Self, ConfigError> {
        let database = fields::required_text(profile.database, &["database", "dbname"])?;
        let schema = fields::required_text(profile.schema, &["schema"])?;
        let host = fields::required_text(profile.host, &["host"])?;
        let user = fields::required_text(profile.user, &["user"])?;
        let password = fields::required(profile.password, &["password"])?;
        let port = fields::required(profile.port, &["port"])?;

        let inert = fields::present_keys(&profile.inert);
        let mut common = TargetCommon::new(profile.common, database, schema, 1, source)?;
        common.seal(inert, profile.extra);

        Ok(Self {
            common,
            host,
            user,
            password,
            port,
            keepalives_idle: profile.keepalives_idle,
            connect_timeout: profile.connect_timeout,
            role: profile.role,
            sslmode: profile.sslmode,
        })
    }
}

impl FromProfile for PostgresTarget {
    fn from_raw(raw: &RawTarget, _ctx: &ResolveContext<'_>) -> Result<Self, ConfigError> {
        expect_tag(raw, &["postgres"])?;
        Self::build(fields::parse(raw, ALIASES)?, Source::Profile)
    }
}

impl TargetDescriptor for PostgresTarget {
    fn backend(&self) -> Backend {
        Backend::Postgres
    }

    fn common(&self) -> &TargetCommon {
        &self.common
    }

    fn default_incremental_strategy(&self, kind: IncrementalKind) -> &'static str {
        match kind {
            IncrementalKind::UniqueKey => "delete+insert",
            _ => "append",
        }
    }

    fn to_connection(&self) -> ConnectionConfig {
        ConnectionConfig::Postgres(PostgresConnectionConfig {
            host: self.host.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
            port: self.port,
            database: self.common.database().to_string(),
            keepalives_idle: self.keepalives_idle,
            concurrent_tasks: self.common.threads(),
            connect_timeout: self.connect_timeout,
            role: self.role.clone(),
            sslmode: self.sslmode.clone(),
        })
    }
}

impl Reversible for PostgresTarget {
    fn from_connection(
        connection: &ConnectionConfig,
        overrides: &RawTarget,
        _ctx: &ResolveContext<'_>,
    ) -> Result<Self, ConfigError> {
        let ConnectionConfig::Postgres(config) = connection else {
            return Err(incompatible(Backend::Postgres, connection));
        };

        let mut raw = RawTarget::new()
            .with("type", "postgres")
            .with("schema", "public")
            .with("host", config.host.clone())
            .with("user", config.user.clone())
            .with("password", config.password.clone())
            .with("port", config.port)
            .with("dbname", config.database.clone())
            .with("threads", config.concurrent_tasks)
            .with("connect_timeout", config.connect_timeout);
        raw.insert_some("keepalives_idle", config.keepalives_idle);
        raw.insert_some("role", config.role.clone());
        raw.insert_some("sslmode", config.sslmode.clone());
        raw.merge(overrides);

        expect_tag(&raw, &["postgres"])?;
        Self::build(fields::parse(&raw, ALIASES)?, Source::Connection)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::super::test_support::{build, raw};
    use super::*;
    use pretty_assertions::assert_eq;

    const BASE: &str = "type: postgres\nname: dev\nschema: analytics\nhost: localhost\nuser: dbt\npassword: secret\nport: 5432";

    #[test]
    fn test_database_aliases_are_equivalent() -> anyhow::Result<()> {
        let with_dbname: PostgresTarget = build(&format!("{BASE}\ndbname: x"))?;
        let with_database: PostgresTarget = build(&format!("{BASE}\ndatabase: x"))?;
        assert_eq!(with_dbname.to_connection(), with_database.to_connection());
        assert_eq!(with_dbname.common().database(), "x");
        Ok(())
    }

    #[test]
    fn test_missing_database_names_both_aliases() {
        let err = build::<PostgresTarget>(BASE).unwrap_err();
        assert_eq!(err, ConfigError::missing(&["database", "dbname"]));
    }

    #[test]
    fn test_port_accepts_numeric_string() -> anyhow::Result<()> {
        let target: PostgresTarget =
            build("type: postgres\nname: dev\nschema: s\nhost: h\nuser: u\npassword: ''\nport: '5433'\ndbname: d")?;
        assert_eq!(target.port(), 5433);

        let err = build::<PostgresTarget>(
            "type: postgres\nname: dev\nschema: s\nhost: h\nuser: u\npassword: p\nport: abc\ndbname: d",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFieldType { field, .. } if field == "port"));
        Ok(())
    }

    #[test]
    fn test_strategy() -> anyhow::Result<()> {
        let target: PostgresTarget = build(&format!("{BASE}\ndbname: x"))?;
        assert_eq!(target.default_incremental_strategy(IncrementalKind::UniqueKey), "delete+insert");
        assert_eq!(target.default_incremental_strategy(IncrementalKind::TimeRange), "append");
        assert_eq!(target.default_incremental_strategy(IncrementalKind::Unmanaged), "append");
        Ok(())
    }

    #[test]
    fn test_inert_fields_are_validated_and_dropped() -> anyhow::Result<()> {
        let target: PostgresTarget = build(&format!("{BASE}\ndbname: x\nretries: 3\nsearch_path: a,b"))?;
        assert_eq!(
            target.common().inert_fields().iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["retries", "search_path"]
        );
        assert!(target.common().extra_fields().is_empty());

        let err = build::<PostgresTarget>(&format!("{BASE}\ndbname: x\nretries: many")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFieldType { .. }));
        Ok(())
    }

    #[test]
    fn test_round_trip() -> anyhow::Result<()> {
        let original = ConnectionConfig::Postgres(PostgresConnectionConfig {
            host: "db.internal".into(),
            user: "loader".into(),
            password: "".into(),
            port: 6543,
            database: "warehouse".into(),
            keepalives_idle: Some(30),
            concurrent_tasks: 4,
            connect_timeout: 15,
            role: Some("transformer".into()),
            sslmode: None,
        });
        let rebuilt = PostgresTarget::from_connection(&original, &raw("name: prod"), &ResolveContext::default())?;
        assert_eq!(rebuilt.common().schema(), "public");
        assert_eq!(rebuilt.to_connection(), original);
        Ok(())
    }

    #[test]
    fn test_round_trip_with_zero_concurrent_tasks() -> anyhow::Result<()> {
        let original = ConnectionConfig::Postgres(PostgresConnectionConfig {
            host: "db.internal".into(),
            user: "loader".into(),
            password: "pw".into(),
            port: 5432,
            database: "warehouse".into(),
            keepalives_idle: None,
            concurrent_tasks: 0,
            connect_timeout: 10,
            role: None,
            sslmode: None,
        });
        let rebuilt = PostgresTarget::from_connection(&original, &raw("name: prod"), &ResolveContext::default())?;
        assert_eq!(rebuilt.common().threads(), 0);
        assert_eq!(rebuilt.to_connection(), original);

        // Profiles still need at least one thread.
        let err = build::<PostgresTarget>(&format!("{BASE}\ndbname: x\nthreads: 0")).unwrap_err();
        assert!(matches!(err, ConfigError::PolicyViolation { field, .. } if field == "threads"));
        Ok(())
    }

    #[test]
    fn test_database_wins_over_dbname() -> anyhow::Result<()> {
        let target: PostgresTarget = build(&format!("{BASE}\ndatabase: a\ndbname: b"))?;
        assert_eq!(target.common().database(), "a");
        let target: PostgresTarget = build(&format!("{BASE}\ndatabase: ''\ndbname: b"))?;
        assert_eq!(target.common().database(), "b");
        Ok(())
    }

    #[test]
    fn test_from_connection_overrides_win() -> anyhow::Result<()> {
        let original = build::<PostgresTarget>(&format!("{BASE}\ndbname: x"))?.to_connection();
        let rebuilt = PostgresTarget::from_connection(
            &original,
            &raw("name: prod\nschema: staging\nthreads: 2"),
            &ResolveContext::default(),
        )?;
        assert_eq!(rebuilt.common().schema(), "staging");
        assert_eq!(rebuilt.common().threads(), 2);
        Ok(())
    }
}
