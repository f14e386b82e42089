// targetry-core/src/domain/error.rs

use miette::Diagnostic;
use thiserror::Error;

/// Every way a profile target can fail to become a descriptor.
///
/// These are data-shape failures: they are deterministic, so callers treat
/// them as fatal for the resolution attempt and never retry.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Target profile has no 'type' key")]
    #[diagnostic(
        code(targetry::config::missing_type),
        help("Add a `type:` entry naming the warehouse (e.g. `type: postgres`).")
    )]
    MissingDiscriminant,

    #[error("{0} not supported.")]
    #[diagnostic(
        code(targetry::config::unsupported_backend),
        help("Run `targetry backends` to list the supported target types.")
    )]
    UnsupportedBackend(String),

    #[error("Missing required field '{field}' (set one of: {})", .aliases.join(", "))]
    #[diagnostic(code(targetry::config::missing_field))]
    MissingRequiredField { field: String, aliases: Vec<String> },

    #[error("Field '{field}' must be {expected}, got {found}")]
    #[diagnostic(
        code(targetry::config::invalid_type),
        help("Check the YAML value type (quotes, numbers, booleans).")
    )]
    InvalidFieldType {
        field: String,
        expected: String,
        found: String,
    },

    #[error(
        "No supported {backend} authentication method found in target profile (expected one of: {})",
        .accepted.join(", ")
    )]
    #[diagnostic(
        code(targetry::config::no_auth),
        help("Credentials are never defaulted: set one of the listed fields.")
    )]
    NoAuthenticationMethod {
        backend: String,
        accepted: Vec<String>,
    },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    #[diagnostic(code(targetry::config::policy))]
    PolicyViolation {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Incorrect connection type: expected {expected}, got {found}")]
    #[diagnostic(code(targetry::config::incompatible_connection))]
    IncompatibleDescriptorType { expected: String, found: String },
}

impl ConfigError {
    pub(crate) fn missing(aliases: &[&str]) -> Self {
        ConfigError::MissingRequiredField {
            field: aliases.first().copied().unwrap_or_default().to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
        }
    }

    pub(crate) fn policy(field: &str, value: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::PolicyViolation {
            field: field.to_string(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn no_auth(backend: &str, accepted: &[&str]) -> Self {
        ConfigError::NoAuthenticationMethod {
            backend: backend.to_string(),
            accepted: accepted.iter().map(|a| a.to_string()).collect(),
        }
    }
}
