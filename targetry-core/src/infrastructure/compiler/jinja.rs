// targetry-core/src/infrastructure/compiler/jinja.rs

// Renders profiles.yml (and any template that needs the active target) before
// it is parsed. Only `env_var()` and the `target` projection are exposed.

use minijinja::{Environment, Error, ErrorKind};
use std::sync::Arc;

use crate::domain::metadata::TargetMetadata;
use crate::infrastructure::error::InfrastructureError;

/// Environment lookup used by `env_var()`.
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

pub struct JinjaRenderer<'a> {
    env: Environment<'a>,
}

impl<'a> JinjaRenderer<'a> {
    pub fn new() -> Self {
        Self::with_env(Arc::new(|name: &str| std::env::var(name).ok()))
    }

    /// Renderer whose `env_var()` reads from `lookup` instead of the process
    /// environment.
    pub fn with_env(lookup: EnvLookup) -> Self {
        let mut env = Environment::new();

        // env_var('NAME') fails when unset; env_var('NAME', 'fallback') does not
        env.add_function(
            "env_var",
            move |name: String, default: Option<String>| -> Result<String, Error> {
                match lookup(&name).or(default) {
                    Some(value) => Ok(value),
                    None => Err(Error::new(
                        ErrorKind::InvalidOperation,
                        format!("Env var required but not provided: '{}'", name),
                    )),
                }
            },
        );

        Self { env }
    }

    pub fn render(
        &self,
        template: &str,
        context: &serde_json::Value,
    ) -> Result<String, InfrastructureError> {
        self.env
            .render_str(template, context)
            .map_err(InfrastructureError::TemplateError)
    }

    /// Renders with the target projection bound to `target`.
    pub fn render_with_target(
        &self,
        template: &str,
        target: &TargetMetadata,
    ) -> Result<String, InfrastructureError> {
        let context = serde_json::json!({ "target": target.to_context() });
        self.render(template, &context)
    }
}

impl<'a> Default for JinjaRenderer<'a> {
    fn default() -> Self {
        Self::new()
    }
}
