// targetry-core/src/infrastructure/error.rs

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum InfrastructureError {
    // --- FILESYSTEM (IO) ---
    #[error("File System Error: {0}")]
    #[diagnostic(
        code(targetry::infra::io),
        help("Check file permissions or path validity.")
    )]
    Io(#[from] std::io::Error),

    // --- PROFILES / YAML ---
    #[error("YAML Parsing Error in {path}: {source}")]
    #[diagnostic(
        code(targetry::infra::yaml),
        help("Check your YAML syntax (indentation, types).")
    )]
    YamlError {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Profiles file not found: {0}")]
    #[diagnostic(
        code(targetry::infra::config_missing),
        help("Create a profiles.yml in the profiles directory or pass --profiles-dir.")
    )]
    ConfigNotFound(String),

    #[error("Profile '{profile}' not found (available: {})", .available.join(", "))]
    #[diagnostic(code(targetry::infra::profile_missing))]
    ProfileNotFound {
        profile: String,
        available: Vec<String>,
    },

    #[error("Target '{target}' not found in profile '{profile}' (available: {})", .available.join(", "))]
    #[diagnostic(code(targetry::infra::target_missing))]
    TargetNotFound {
        profile: String,
        target: String,
        available: Vec<String>,
    },

    #[error("Profile '{0}' has no default target")]
    #[diagnostic(
        code(targetry::infra::no_default_target),
        help("Add a `target:` key to the profile or select one with --target.")
    )]
    NoDefaultTarget(String),

    // --- TEMPLATING ---
    #[error("Template Rendering Error: {0}")]
    #[diagnostic(
        code(targetry::infra::template),
        help("Check the Jinja syntax ({{ ... }}) and that every env_var() without a default is set.")
    )]
    TemplateError(#[from] minijinja::Error),
}
