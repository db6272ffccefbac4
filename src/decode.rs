//! Tolerant decoding of loosely typed wire values.
//!
//! The API sends ids, counters and flags as JSON numbers, floats or strings
//! depending on the command. Everything here normalizes them into strict
//! Rust values before they reach the typed records.

use std::fmt;

use serde::{
    de::{self, Visitor},
    Deserialize, Deserializer,
};
use serde_json::{Map, Value};

/// Integer that may arrive as a JSON integer, a float (truncated), a
/// numeric string, an empty string or null. The last two decode as `0`.
pub(crate) fn flex_int<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(FlexIntVisitor)
}

struct FlexIntVisitor;

impl<'de> Visitor<'de> for FlexIntVisitor {
    type Value = i64;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an integer, a float, a numeric string or null")
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<i64, E> {
        Ok(value)
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<i64, E> {
        i64::try_from(value).map_err(|_| E::custom(format!("integer {value} is out of range")))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<i64, E> {
        if value.is_finite() {
            Ok(value.trunc() as i64)
        } else {
            Err(E::custom(format!("non-finite number {value}")))
        }
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<i64, E> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Ok(0);
        }
        trimmed
            .parse::<i64>()
            .map_err(|err| E::custom(format!("failed to convert '{value}' to an integer: {err}")))
    }

    fn visit_unit<E: de::Error>(self) -> Result<i64, E> {
        Ok(0)
    }

    fn visit_none<E: de::Error>(self) -> Result<i64, E> {
        Ok(0)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<i64, D::Error> {
        deserializer.deserialize_any(self)
    }
}

/// Flag that may arrive as a bool, `"1"`/`"0"`/`"true"`/`"false"`, a number
/// or null. Unrecognized strings decode as `false`.
pub(crate) fn flex_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(FlexBoolVisitor)
}

struct FlexBoolVisitor;

impl<'de> Visitor<'de> for FlexBoolVisitor {
    type Value = bool;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a boolean, a number or a boolean-like string")
    }

    fn visit_bool<E: de::Error>(self, value: bool) -> Result<bool, E> {
        Ok(value)
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<bool, E> {
        Ok(value != 0)
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<bool, E> {
        Ok(value != 0)
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<bool, E> {
        Ok(value != 0.0)
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<bool, E> {
        Ok(truthy(value))
    }

    fn visit_unit<E: de::Error>(self) -> Result<bool, E> {
        Ok(false)
    }

    fn visit_none<E: de::Error>(self) -> Result<bool, E> {
        Ok(false)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<bool, D::Error> {
        deserializer.deserialize_any(self)
    }
}

/// Treats an explicit `null` like a missing field.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn truthy(value: &str) -> bool {
    let value = value.trim();
    value == "1" || value.eq_ignore_ascii_case("true")
}

/// Strict integer view of an already-decoded JSON value.
pub(crate) fn int_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Text view of a scalar JSON value.
pub(crate) fn text_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn flag_from_value(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::String(text) => Some(truthy(text)),
        Value::Number(number) => number.as_f64().map(|n| n != 0.0),
        _ => None,
    }
}

/// Check configuration of an HTTP sensor as reported by `getHostSensors`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct HttpSensorParams {
    pub url: String,
    pub timeout: i64,
    pub response_code: String,
    pub verify_ssl_cert: bool,
    pub search_headers: bool,
    pub expected_text: String,
    pub unwanted_text: String,
    pub ssl_validity: i64,
    pub cookies: String,
    pub post_params: String,
    pub custom_request_headers: String,
    pub user_agent: String,
    pub force_resolve: String,
}

impl HttpSensorParams {
    /// Normalizes the `params` field, which may be an object, a JSON
    /// document inside a string, a `key=value&key=value` string, or absent.
    pub(crate) fn from_wire(raw: &Value) -> Self {
        match raw {
            Value::Object(map) => Self::from_map(map),
            Value::String(text) => match serde_json::from_str::<Value>(text) {
                Ok(Value::Object(map)) => Self::from_map(&map),
                _ => Self::from_pairs(text),
            },
            _ => Self::default(),
        }
    }

    fn from_pairs(text: &str) -> Self {
        let map: Map<String, Value> = text
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .map(|(key, value)| (key.trim().to_owned(), Value::String(value.trim().to_owned())))
            .collect();
        Self::from_map(&map)
    }

    fn from_map(map: &Map<String, Value>) -> Self {
        // The API reports some settings under different names than the
        // ones it accepts on create; the reported name wins.
        let text = |keys: &[&str]| {
            keys.iter()
                .find_map(|key| map.get(*key).and_then(text_from_value))
                .unwrap_or_default()
        };
        let int = |keys: &[&str]| {
            keys.iter()
                .find_map(|key| map.get(*key).and_then(int_from_value))
                .unwrap_or_default()
        };
        let flag = |keys: &[&str]| {
            keys.iter()
                .find_map(|key| map.get(*key).and_then(flag_from_value))
                .unwrap_or_default()
        };

        Self {
            url: text(&["url"]),
            timeout: int(&["timeout"]),
            response_code: text(&["responsecode"]),
            verify_ssl_cert: flag(&["ssl_strict", "verifysslcert"]),
            search_headers: flag(&["searchheaders"]),
            expected_text: text(&["wantedstring", "expectedtext"]),
            unwanted_text: text(&["unwantedtext"]),
            ssl_validity: int(&["ssl_min_expiry_in", "sslvalidity"]),
            cookies: text(&["cookies"]),
            post_params: text(&["postparams"]),
            custom_request_headers: text(&["customrequestheaders"]),
            user_agent: text(&["useragent"]),
            force_resolve: text(&["forceresolve"]),
        }
    }
}
