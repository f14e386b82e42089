// targetry-core/src/domain/raw.rs

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;

use crate::domain::error::ConfigError;

/// Free-form nested settings (DuckDB settings, BigQuery keyfile JSON...).
pub type Settings = BTreeMap<String, Value>;

/// An untyped profile target, exactly as the loader produced it.
///
/// The core never mutates a `RawTarget` it was handed; descriptors
/// deserialize their own profile struct from it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawTarget(BTreeMap<String, Value>);

impl RawTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Builder-style insert, handy for assembling targets in code.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts `value` when it is `Some`.
    pub fn insert_some<V: Into<Value>>(&mut self, key: &str, value: Option<V>) {
        if let Some(value) = value {
            self.insert(key, value);
        }
    }

    /// Inserts `value` only when `key` is absent.
    pub fn insert_default(&mut self, key: &str, value: impl Into<Value>) {
        self.0.entry(key.to_string()).or_insert_with(|| value.into());
    }

    /// Copies every entry of `other` over this target (other wins).
    pub fn merge(&mut self, other: &RawTarget) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The `type` discriminant.
    pub fn type_tag(&self) -> Result<&str, ConfigError> {
        match self.0.get("type").map(untag) {
            None | Some(Value::Null) => Err(ConfigError::MissingDiscriminant),
            Some(Value::String(tag)) => Ok(tag.as_str()),
            Some(other) => Err(ConfigError::InvalidFieldType {
                field: "type".to_string(),
                expected: "a string".to_string(),
                found: describe(other),
            }),
        }
    }
}

pub(crate) fn untag(value: &Value) -> &Value {
    match value {
        Value::Tagged(tagged) => untag(&tagged.value),
        other => other,
    }
}

/// Short human description of a YAML value, for error messages.
pub(crate) fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("boolean {}", b),
        Value::Number(n) => format!("number {}", n),
        Value::String(s) => format!("string {:?}", s),
        Value::Sequence(_) => "a list".to_string(),
        Value::Mapping(_) => "a mapping".to_string(),
        Value::Tagged(tagged) => describe(&tagged.value),
    }
}

/// What a serde error says it wanted.
pub(crate) fn expectation(err: &serde_yaml::Error) -> String {
    let message = err.to_string();
    match message.rsplit_once("expected ") {
        Some((_, expected)) => expected.to_string(),
        None => message,
    }
}
