//! The shape of a normalized model answer.
//!
//! Every text-producing stage asks the model for a JSON object keyed by
//! sequential identifiers (`"1"`, `"2"`, ... or `"CoT_1"`, `"Re_Edit_1"`, ...).
//! Models do not always comply, so a stored answer is either that object or
//! the raw text the model returned. Consumers match on the variant.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

use crate::defaults::FIRST_ACTION_KEY;

/// A normalized model answer as stored in a record field.
///
/// Serialized untagged: `Structured` becomes a JSON object, `Raw` a JSON
/// string, exactly as the record file format expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ModelResponse {
    /// The model answered with a JSON object; key order is preserved.
    Structured(IndexMap<String, String>),
    /// The model answer could not be parsed as a JSON object.
    Raw(String),
}

impl ModelResponse {
    /// Build a structured response from key/value pairs in order.
    pub fn structured<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::Structured(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Whether this answer was parsed into an object.
    pub fn is_structured(&self) -> bool {
        matches!(self, Self::Structured(_))
    }

    /// Look up one entry of a structured answer.
    pub fn get(&self, key: &str) -> Option<&str> {
        match self {
            Self::Structured(map) => map.get(key).map(String::as_str),
            Self::Raw(_) => None,
        }
    }

    /// Text to embed in a downstream prompt.
    ///
    /// Raw answers are used verbatim; structured answers are re-serialized
    /// to compact JSON in their original key order.
    pub fn to_prompt_text(&self) -> String {
        match self {
            Self::Raw(text) => text.clone(),
            Self::Structured(map) => {
                serde_json::to_string(map).unwrap_or_else(|_| format!("{:?}", map))
            }
        }
    }

    /// The single edit action applied per pass.
    ///
    /// A raw answer is taken verbatim. For a structured answer only the
    /// action keyed `"1"` is used, or an empty string when it is absent.
    pub fn first_action(&self) -> &str {
        match self {
            Self::Raw(text) => text,
            Self::Structured(map) => map
                .get(FIRST_ACTION_KEY)
                .map(String::as_str)
                .unwrap_or(""),
        }
    }

    /// Interpret an arbitrary JSON value as a stored answer.
    ///
    /// Objects become `Structured`; non-string values inside an object are
    /// kept as their compact JSON text. A JSON string becomes `Raw`. Any
    /// other value (array, number, bool, null) becomes `Raw` holding its
    /// compact JSON text.
    pub fn from_json(value: JsonValue) -> Self {
        match value {
            JsonValue::Object(map) => Self::structured(
                map.into_iter()
                    .map(|(key, value)| (key, json_value_to_text(value))),
            ),
            JsonValue::String(text) => Self::Raw(text),
            other => Self::Raw(other.to_string()),
        }
    }
}

fn json_value_to_text(value: JsonValue) -> String {
    match value {
        JsonValue::String(text) => text,
        other => other.to_string(),
    }
}

impl From<JsonValue> for ModelResponse {
    fn from(value: JsonValue) -> Self {
        Self::from_json(value)
    }
}

impl<'de> Deserialize<'de> for ModelResponse {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        JsonValue::deserialize(deserializer).map(Self::from_json)
    }
}
