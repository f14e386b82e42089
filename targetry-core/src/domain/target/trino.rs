// targetry-core/src/domain/target/trino.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::fields::{self, CommonFields, Extra, de};
use super::{FromProfile, ResolveContext, Source, TargetCommon, TargetDescriptor, expect_tag};
use crate::domain::backend::Backend;
use crate::domain::connection::{ConnectionConfig, TrinoAuthenticationMethod, TrinoConnectionConfig};
use crate::domain::error::ConfigError;
use crate::domain::incremental::IncrementalKind;
use crate::domain::raw::RawTarget;

/// Profile method names and the engine authentication they select.
const METHODS: [(&str, TrinoAuthenticationMethod); 7] = [
    ("none", TrinoAuthenticationMethod::NoAuth),
    ("ldap", TrinoAuthenticationMethod::Ldap),
    ("kerberos", TrinoAuthenticationMethod::Kerberos),
    ("jwt", TrinoAuthenticationMethod::Jwt),
    ("certificate", TrinoAuthenticationMethod::Certificate),
    ("oauth", TrinoAuthenticationMethod::OAuth),
    ("oauth_console", TrinoAuthenticationMethod::OAuth),
];

#[derive(Debug, Deserialize)]
struct TrinoProfile {
    #[serde(default, deserialize_with = "de::text")]
    host: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    database: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    schema: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    method: Option<String>,
    #[serde(default = "default_port", deserialize_with = "de::int")]
    port: u16,
    #[serde(default = "default_retries", deserialize_with = "de::int")]
    retries: u32,
    #[serde(default, deserialize_with = "de::text")]
    user: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    http_scheme: Option<String>,
    #[serde(default, deserialize_with = "de::string_map")]
    roles: Option<BTreeMap<String, String>>,
    #[serde(default, deserialize_with = "de::string_map")]
    http_headers: Option<BTreeMap<String, String>>,
    #[serde(default, deserialize_with = "de::string_map")]
    session_properties: Option<BTreeMap<String, String>>,
    #[serde(default, deserialize_with = "de::text")]
    timezone: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    password: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    impersonation_user: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    jwt_token: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    client_certificate: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    client_private_key: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    cert: Option<String>,
    #[serde(flatten)]
    kerberos: Kerberos,
    #[serde(flatten)]
    inert: TrinoInert,
    #[serde(flatten)]
    common: CommonFields,
    #[serde(flatten)]
    extra: Extra,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct TrinoInert {
    #[serde(default, deserialize_with = "de::flag_opt")]
    prepared_statements_enabled: Option<bool>,
}

fn default_port() -> u16 {
    443
}

fn default_retries() -> u32 {
    3
}

fn default_service_name() -> String {
    "trino".to_string()
}

fn default_true() -> bool {
    true
}

fn authentication_method(method: &str) -> Result<TrinoAuthenticationMethod, ConfigError> {
    METHODS
        .iter()
        .find(|(name, _)| *name == method)
        .map(|(_, auth)| *auth)
        .ok_or_else(|| {
            let allowed = METHODS.iter().map(|(name, _)| *name).collect::<Vec<_>>().join(", ");
            ConfigError::policy("method", method, format!("expected one of: {}", allowed))
        })
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct Kerberos {
    #[serde(default, deserialize_with = "de::text")]
    keytab: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    krb5_config: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    principal: Option<String>,
    #[serde(default = "default_service_name", deserialize_with = "de::string")]
    service_name: String,
    #[serde(default, deserialize_with = "de::text")]
    hostname_override: Option<String>,
    #[serde(default, deserialize_with = "de::flag")]
    mutual_authentication: bool,
    #[serde(default, deserialize_with = "de::flag")]
    force_preemptive: bool,
    #[serde(default = "default_true", deserialize_with = "de::flag")]
    sanitize_mutual_error_response: bool,
    #[serde(default, deserialize_with = "de::flag")]
    delegate: bool,
}

/// Distributed SQL engine.
#[derive(Debug, Clone, PartialEq)]
pub struct TrinoTarget {
    common: TargetCommon,
    method: TrinoAuthenticationMethod,
    host: String,
    port: u16,
    user: Option<String>,
    http_scheme: Option<String>,
    roles: Option<BTreeMap<String, String>>,
    http_headers: Option<BTreeMap<String, String>>,
    session_properties: Option<BTreeMap<String, String>>,
    retries: u32,
    timezone: Option<String>,
    // ldap
    password: Option<String>,
    impersonation_user: Option<String>,
    kerberos: Kerberos,
    // jwt
    jwt_token: Option<String>,
    // certificate
    client_certificate: Option<String>,
    client_private_key: Option<String>,
    cert: Option<String>,
}

impl TrinoTarget {
    pub fn method(&self) -> TrinoAuthenticationMethod {
        self.method
    }
}

impl FromProfile for TrinoTarget {
    fn from_raw(raw: &RawTarget, _ctx: &ResolveContext<'_>) -> Result<Self, ConfigError> {
        expect_tag(raw, &["trino"])?;
        let profile: TrinoProfile = fields::parse(raw, &[])?;

        let host = fields::required_text(profile.host, &["host"])?;
        let database = fields::required_text(profile.database, &["database"])?;
        let schema = fields::required_text(profile.schema, &["schema"])?;
        let method = fields::required_text(profile.method, &["method"])?;
        let method = authentication_method(&method)?;

        let inert = fields::present_keys(&profile.inert);
        let mut common = TargetCommon::new(profile.common, database, schema, 1, Source::Profile)?;
        common.seal(inert, profile.extra);

        Ok(Self {
            common,
            method,
            host,
            port: profile.port,
            user: profile.user,
            http_scheme: profile.http_scheme,
            roles: profile.roles,
            http_headers: profile.http_headers,
            session_properties: profile.session_properties,
            retries: profile.retries,
            timezone: profile.timezone,
            password: profile.password,
            impersonation_user: profile.impersonation_user,
            kerberos: profile.kerberos,
            jwt_token: profile.jwt_token,
            client_certificate: profile.client_certificate,
            client_private_key: profile.client_private_key,
            cert: profile.cert,
        })
    }
}

impl TargetDescriptor for TrinoTarget {
    fn backend(&self) -> Backend {
        Backend::Trino
    }

    fn common(&self) -> &TargetCommon {
        &self.common
    }

    fn default_incremental_strategy(&self, _kind: IncrementalKind) -> &'static str {
        "append"
    }

    fn to_connection(&self) -> ConnectionConfig {
        let kerberos = &self.kerberos;
        ConnectionConfig::Trino(TrinoConnectionConfig {
            method: self.method,
            host: self.host.clone(),
            user: self.user.clone(),
            catalog: self.common.database().to_string(),
            port: self.port,
            http_scheme: self.http_scheme.clone(),
            roles: self.roles.clone(),
            http_headers: self.http_headers.clone(),
            session_properties: self.session_properties.clone(),
            retries: self.retries,
            timezone: self.timezone.clone(),
            password: self.password.clone(),
            impersonation_user: self.impersonation_user.clone(),
            keytab: kerberos.keytab.clone(),
            krb5_config: kerberos.krb5_config.clone(),
            principal: kerberos.principal.clone(),
            service_name: kerberos.service_name.clone(),
            hostname_override: kerberos.hostname_override.clone(),
            mutual_authentication: kerberos.mutual_authentication,
            force_preemptive: kerberos.force_preemptive,
            sanitize_mutual_error_response: kerberos.sanitize_mutual_error_response,
            delegate: kerberos.delegate,
            jwt_token: self.jwt_token.clone(),
            client_certificate: self.client_certificate.clone(),
            client_private_key: self.client_private_key.clone(),
            cert: self.cert.clone(),
            concurrent_tasks: self.common.threads(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::super::test_support::build;
    use super::*;

    const BASE: &str = "type: trino\nname: dev\nhost: trino.local\ndatabase: hive\nschema: raw";

    #[test]
    fn test_defaults() -> anyhow::Result<()> {
        let target: TrinoTarget = build(&format!("{BASE}\nmethod: none\nuser: admin"))?;
        let ConnectionConfig::Trino(config) = target.to_connection() else {
            panic!("expected a trino connection");
        };
        assert_eq!(config.method, TrinoAuthenticationMethod::NoAuth);
        assert_eq!(config.catalog, "hive");
        assert_eq!(config.port, 443);
        assert_eq!(config.retries, 3);
        assert_eq!(config.service_name, "trino");
        assert!(config.sanitize_mutual_error_response);
        assert!(!config.delegate);
        Ok(())
    }

    #[test]
    fn test_method_mapping() -> anyhow::Result<()> {
        let console: TrinoTarget = build(&format!("{BASE}\nmethod: oauth_console"))?;
        assert_eq!(console.method(), TrinoAuthenticationMethod::OAuth);

        let kerberos: TrinoTarget =
            build(&format!("{BASE}\nmethod: kerberos\nkeytab: /etc/trino.keytab\nmutual_authentication: 'yes'"))?;
        let ConnectionConfig::Trino(config) = kerberos.to_connection() else {
            panic!("expected a trino connection");
        };
        assert_eq!(config.method, TrinoAuthenticationMethod::Kerberos);
        assert_eq!(config.keytab.as_deref(), Some("/etc/trino.keytab"));
        assert!(config.mutual_authentication);
        Ok(())
    }

    #[test]
    fn test_unknown_method_is_rejected() {
        let err = build::<TrinoTarget>(&format!("{BASE}\nmethod: saml")).unwrap_err();
        assert!(matches!(err, ConfigError::PolicyViolation { ref field, .. } if field == "method"));
        assert!(err.to_string().contains("oauth_console"));
    }

    #[test]
    fn test_method_is_required() {
        let err = build::<TrinoTarget>(BASE).unwrap_err();
        assert_eq!(err, ConfigError::missing(&["method"]));
    }

    #[test]
    fn test_string_maps() -> anyhow::Result<()> {
        let target: TrinoTarget = build(&format!(
            "{BASE}\nmethod: ldap\npassword: pw\nsession_properties:\n  query_max_run_time: 1h\nroles:\n  hive: admin\nprepared_statements_enabled: false"
        ))?;
        let ConnectionConfig::Trino(config) = target.to_connection() else {
            panic!("expected a trino connection");
        };
        assert_eq!(config.roles.unwrap().get("hive").map(String::as_str), Some("admin"));
        assert_eq!(config.session_properties.unwrap().len(), 1);
        assert!(target.common().inert_fields().contains("prepared_statements_enabled"));
        Ok(())
    }

    #[test]
    fn test_string_map_values_are_rendered_as_text() -> anyhow::Result<()> {
        let target: TrinoTarget =
            build(&format!("{BASE}\nmethod: none\nsession_properties:\n  query_max_stage_count: 200\n  optimize_hash_generation: true"))?;
        let ConnectionConfig::Trino(config) = target.to_connection() else {
            panic!("expected a trino connection");
        };
        let properties = config.session_properties.unwrap();
        assert_eq!(properties.get("query_max_stage_count").map(String::as_str), Some("200"));
        assert_eq!(properties.get("optimize_hash_generation").map(String::as_str), Some("true"));

        let err = build::<TrinoTarget>(&format!("{BASE}\nmethod: none\nroles: admin")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFieldType { ref field, .. } if field == "roles"));
        Ok(())
    }
}
