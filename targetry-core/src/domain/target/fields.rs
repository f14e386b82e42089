// targetry-core/src/domain/target/fields.rs

// Serde plumbing shared by the backend profile structs. Every backend
// declares a `#[derive(Deserialize)]` profile that flattens, in order:
// its inert section, the `CommonFields`, and an `Extra` catch-all.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_yaml::{Mapping, Value};
use std::collections::{BTreeMap, BTreeSet};

use crate::domain::error::ConfigError;
use crate::domain::raw::{RawTarget, describe, expectation, untag};

/// Keys no profile struct declares.
pub(crate) type Extra = BTreeMap<String, Value>;

/// Keys every backend accepts.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct CommonFields {
    #[serde(default, deserialize_with = "de::text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub profile_name: Option<String>,
    #[serde(default, deserialize_with = "de::int_opt")]
    pub threads: Option<u32>,
}

/// Deserializes a backend profile from a raw target.
///
/// `aliases` lists groups of spellings for one field, canonical first. The
/// first spelling with a non-empty value wins and the others are dropped
/// before serde sees the map, so `#[serde(alias)]` never has to pick.
pub(crate) fn parse<P: DeserializeOwned>(
    raw: &RawTarget,
    aliases: &[&[&str]],
) -> Result<P, ConfigError> {
    let fields = normalize(raw, aliases);
    serde_yaml::from_value(Value::Mapping(fields.clone())).map_err(|err| blame::<P>(&fields, &err))
}

fn normalize(raw: &RawTarget, aliases: &[&[&str]]) -> Mapping {
    let mut fields: BTreeMap<&str, &Value> = raw
        .iter()
        .map(|(key, value)| (key, untag(value)))
        .filter(|(key, value)| *key != "type" && !value.is_null())
        .collect();

    for group in aliases {
        let winner = group
            .iter()
            .copied()
            .find(|key| fields.get(key).is_some_and(|value| !is_blank(value)));
        for key in group.iter().copied() {
            if Some(key) != winner {
                fields.remove(key);
            }
        }
    }

    fields
        .into_iter()
        .map(|(key, value)| (Value::String(key.to_string()), value.clone()))
        .collect()
}

fn is_blank(value: &Value) -> bool {
    matches!(value, Value::String(s) if s.is_empty())
}

/// Pins a deserialization failure on the first key that fails on its own.
fn blame<P: DeserializeOwned>(fields: &Mapping, err: &serde_yaml::Error) -> ConfigError {
    for (key, value) in fields {
        let mut single = Mapping::new();
        single.insert(key.clone(), value.clone());
        if let Err(field_err) = serde_yaml::from_value::<P>(Value::Mapping(single)) {
            return ConfigError::InvalidFieldType {
                field: key.as_str().unwrap_or_default().to_string(),
                expected: expectation(&field_err),
                found: describe(value),
            };
        }
    }
    ConfigError::InvalidFieldType {
        field: "target".to_string(),
        expected: expectation(err),
        found: "a mapping".to_string(),
    }
}

pub(crate) fn required<T>(value: Option<T>, aliases: &[&str]) -> Result<T, ConfigError> {
    value.ok_or_else(|| ConfigError::missing(aliases))
}

/// Like [`required`], but an empty string counts as absent.
pub(crate) fn required_text(value: Option<String>, aliases: &[&str]) -> Result<String, ConfigError> {
    required(value.filter(|v| !v.is_empty()), aliases)
}

/// Names of the keys a section actually carries.
pub(crate) fn present_keys<T: Serialize>(section: &T) -> BTreeSet<String> {
    match serde_yaml::to_value(section) {
        Ok(Value::Mapping(map)) => map
            .into_iter()
            .filter(|(_, value)| !value.is_null())
            .filter_map(|(key, _)| key.as_str().map(str::to_string))
            .collect(),
        _ => BTreeSet::new(),
    }
}

/// `deserialize_with` helpers for the coercions profiles rely on: numbers
/// and booleans where strings are expected, numeric strings where integers
/// are expected, and `yes`/`on`/`1` style flags.
pub(crate) mod de {
    use serde::de::{self, Deserializer, Unexpected, Visitor};
    use serde::Deserialize;
    use std::collections::BTreeMap;
    use std::fmt;
    use std::marker::PhantomData;

    /// Integer widths a profile field can be coerced into.
    pub trait IntField: TryFrom<i64> + Copy + 'static {
        const EXPECTED: &'static str;
    }

    impl IntField for u16 {
        const EXPECTED: &'static str = "an integer between 0 and 65535";
    }

    impl IntField for u32 {
        const EXPECTED: &'static str = "a non-negative integer";
    }

    impl IntField for u64 {
        const EXPECTED: &'static str = "a non-negative integer";
    }

    struct TextVisitor;

    impl<'de> Visitor<'de> for TextVisitor {
        type Value = Option<String>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a string")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
            Ok(Some(v))
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
            d.deserialize_any(self)
        }
    }

    struct IntVisitor<T>(PhantomData<T>);

    impl<T: IntField> IntVisitor<T> {
        fn narrow<E: de::Error>(&self, v: i64) -> Result<Option<T>, E> {
            match T::try_from(v) {
                Ok(n) => Ok(Some(n)),
                Err(_) => Err(E::invalid_value(Unexpected::Signed(v), self)),
            }
        }
    }

    impl<'de, T: IntField> Visitor<'de> for IntVisitor<T> {
        type Value = Option<T>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(T::EXPECTED)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            self.narrow(v)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            match i64::try_from(v) {
                Ok(n) => self.narrow(n),
                Err(_) => Err(E::invalid_value(Unexpected::Unsigned(v), &self)),
            }
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
            // Integral floats only, and only inside i64 range: `as` saturates.
            if v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 {
                self.narrow(v as i64)
            } else {
                Err(E::invalid_value(Unexpected::Float(v), &self))
            }
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            match v.trim().parse::<i64>() {
                Ok(n) => self.narrow(n),
                Err(_) => Err(E::invalid_value(Unexpected::Str(v), &self)),
            }
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
            d.deserialize_any(self)
        }
    }

    struct FlagVisitor;

    impl<'de> Visitor<'de> for FlagVisitor {
        type Value = Option<bool>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a boolean")
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
            Ok(Some(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            match v {
                0 => Ok(Some(false)),
                1 => Ok(Some(true)),
                _ => Err(E::invalid_value(Unexpected::Signed(v), &self)),
            }
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            match v {
                0 => Ok(Some(false)),
                1 => Ok(Some(true)),
                _ => Err(E::invalid_value(Unexpected::Unsigned(v), &self)),
            }
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            match v.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(Some(true)),
                "false" | "no" | "off" | "0" => Ok(Some(false)),
                _ => Err(E::invalid_value(Unexpected::Str(v), &self)),
            }
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
            d.deserialize_any(self)
        }
    }

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        d.deserialize_any(TextVisitor)
    }

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(text(d)?.unwrap_or_default())
    }

    pub fn int_opt<'de, D: Deserializer<'de>, T: IntField>(d: D) -> Result<Option<T>, D::Error> {
        d.deserialize_any(IntVisitor(PhantomData))
    }

    pub fn int<'de, D: Deserializer<'de>, T: IntField>(d: D) -> Result<T, D::Error> {
        int_opt(d)?.ok_or_else(|| de::Error::invalid_type(Unexpected::Unit, &T::EXPECTED))
    }

    pub fn flag_opt<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
        d.deserialize_any(FlagVisitor)
    }

    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        flag_opt(d)?.ok_or_else(|| de::Error::invalid_type(Unexpected::Unit, &"a boolean"))
    }

    /// A scalar rendered as text, for map values.
    struct Text(String);

    impl<'de> Deserialize<'de> for Text {
        fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
            text(d)?
                .map(Text)
                .ok_or_else(|| de::Error::invalid_type(Unexpected::Unit, &"a string"))
        }
    }

    /// String-to-string map; scalar values are rendered as text.
    pub fn string_map<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<BTreeMap<String, String>>, D::Error> {
        let map = Option::<BTreeMap<String, Text>>::deserialize(d)?;
        Ok(map.map(|entries| entries.into_iter().map(|(k, Text(v))| (k, v)).collect()))
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    /// A list of strings; a single string is a one-element list.
    pub fn string_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        Ok(match OneOrMany::deserialize(d)? {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::target::test_support::raw;

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Inert {
        #[serde(default, deserialize_with = "de::int_opt")]
        retries: Option<u64>,
        #[serde(default, deserialize_with = "de::text")]
        driver: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    struct Sample {
        #[serde(default, deserialize_with = "de::text")]
        host: Option<String>,
        #[serde(default = "default_port", deserialize_with = "de::int")]
        port: u16,
        #[serde(default, deserialize_with = "de::flag_opt")]
        secure: Option<bool>,
        #[serde(default, deserialize_with = "de::int_opt")]
        maximum_bytes_billed: Option<u64>,
        #[serde(flatten)]
        inert: Inert,
        #[serde(flatten)]
        common: CommonFields,
        #[serde(flatten)]
        extra: Extra,
    }

    fn default_port() -> u16 {
        5432
    }

    fn sample(yaml: &str) -> Result<Sample, ConfigError> {
        parse(&raw(yaml), &[&["host", "server"]])
    }

    #[test]
    fn test_sections_split_known_inert_and_extra() {
        let parsed = sample("type: x\nname: dev\nhost: h\nretries: 3\nwarp_speed: 9\nthreads: '4'").unwrap();
        assert_eq!(parsed.host.as_deref(), Some("h"));
        assert_eq!(parsed.port, 5432);
        assert_eq!(parsed.common.name.as_deref(), Some("dev"));
        assert_eq!(parsed.common.threads, Some(4));
        assert_eq!(present_keys(&parsed.inert).into_iter().collect::<Vec<_>>(), vec!["retries"]);
        assert_eq!(parsed.extra.keys().collect::<Vec<_>>(), vec!["warp_speed"]);
    }

    #[test]
    fn test_canonical_spelling_wins() {
        assert_eq!(sample("host: a\nserver: b").unwrap().host.as_deref(), Some("a"));
        assert_eq!(sample("host: ''\nserver: b").unwrap().host.as_deref(), Some("b"));
        assert_eq!(sample("server: b").unwrap().host, None);
    }

    #[test]
    fn test_coercions() {
        let parsed = sample("host: 10\nport: '6543'\nsecure: 'yes'").unwrap();
        assert_eq!(parsed.host.as_deref(), Some("10"));
        assert_eq!(parsed.port, 6543);
        assert_eq!(parsed.secure, Some(true));
        assert_eq!(sample("secure: off").unwrap().secure, Some(false));
        assert_eq!(sample("maximum_bytes_billed: 1.0e9").unwrap().maximum_bytes_billed, Some(1_000_000_000));
    }

    #[test]
    fn test_bad_value_blames_its_key() {
        let err = sample("host: h\nport: 70000").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFieldType { ref field, .. } if field == "port"));

        let err = sample("secure: maybe").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFieldType { ref field, .. } if field == "secure"));

        let err = sample("retries: -1").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFieldType { ref field, .. } if field == "retries"));
    }

    #[test]
    fn test_huge_float_is_rejected_not_saturated() {
        let err = sample("maximum_bytes_billed: 1e30").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidFieldType { ref field, ref expected, .. }
                if field == "maximum_bytes_billed" && expected == "a non-negative integer"
        ));
        assert!(sample("maximum_bytes_billed: 2.5").is_err());
    }

    #[test]
    fn test_required_text_treats_empty_as_missing() {
        assert_eq!(required_text(Some("x".into()), &["host"]), Ok("x".to_string()));
        assert_eq!(required_text(Some(String::new()), &["host"]), Err(ConfigError::missing(&["host"])));
        assert_eq!(required::<u16>(None, &["port"]), Err(ConfigError::missing(&["port"])));
    }
}
