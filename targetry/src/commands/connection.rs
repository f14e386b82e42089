// targetry/src/commands/connection.rs
//
// USE CASE: Show the canonical connection a profile target translates to.

use serde_json::Value;

use crate::cli::{OutputFormat, TargetArgs};

const MASK: &str = "********";

/// Canonical fields that carry credentials.
const SECRET_FIELDS: [&str; 11] = [
    "password",
    "token",
    "access_token",
    "refresh_token",
    "private_key",
    "private_key_passphrase",
    "client_secret",
    "oauth_client_secret",
    "keyfile_json",
    "aws_secret_access_key",
    "jwt_token",
];

pub fn execute(args: TargetArgs, format: OutputFormat, show_secrets: bool) -> anyhow::Result<()> {
    let resolved = super::resolve(&args)?;
    let mut connection = serde_json::to_value(resolved.connection())?;
    if !show_secrets {
        redact(&mut connection);
    }

    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&connection)?,
        OutputFormat::Yaml => serde_yaml::to_string(&connection)?,
    };
    println!("{}", rendered.trim_end());
    Ok(())
}

/// Masks every populated secret field. Absent (null) secrets stay null.
fn redact(connection: &mut Value) {
    let Value::Object(fields) = connection else {
        return;
    };
    for key in SECRET_FIELDS {
        if let Some(value) = fields.get_mut(key) {
            let populated = match value {
                Value::Null => false,
                Value::String(s) => !s.is_empty(),
                _ => true,
            };
            if populated {
                *value = Value::String(MASK.to_string());
            }
        }
    }
}
