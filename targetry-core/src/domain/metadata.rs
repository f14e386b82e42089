// targetry-core/src/domain/metadata.rs

use serde::Serialize;

/// The only part of a target that may reach templates and persisted state.
///
/// Credentials and connection tuning never appear here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetMetadata {
    #[serde(rename = "type")]
    pub target_type: String,
    pub name: String,
    pub database: String,
    pub schema: String,
    pub target_name: String,
}

impl TargetMetadata {
    /// Field names in projection order.
    pub const FIELDS: [&'static str; 5] = ["type", "name", "database", "schema", "target_name"];

    /// Ordered `(key, value)` pairs.
    pub fn entries(&self) -> [(&'static str, &str); 5] {
        [
            ("type", self.target_type.as_str()),
            ("name", self.name.as_str()),
            ("database", self.database.as_str()),
            ("schema", self.schema.as_str()),
            ("target_name", self.target_name.as_str()),
        ]
    }

    /// JSON object suitable as a template context.
    pub fn to_context(&self) -> serde_json::Value {
        let map = self
            .entries()
            .iter()
            .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }
}
