//! JSON value with JSON Pointer location tracking.

use crate::error::Result;
use crate::number::Number;
use crate::pointer::JsonPointer;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A JSON value that knows its own location in the document.
///
/// Values are immutable once built. Equality follows JSON Schema rules:
/// numbers compare mathematically, object key order is irrelevant, and the
/// location of the compared values is ignored.
#[derive(Debug, Clone)]
pub struct JsonValue {
    pointer: JsonPointer,
    kind: JsonKind,
}

/// The payload of a `JsonValue`.
#[derive(Debug, Clone)]
pub enum JsonKind {
    Null,
    Boolean(bool),
    Number(Number),
    String(String),
    Array(Vec<JsonValue>),
    /// Members in document order.
    Object(IndexMap<String, JsonValue>),
}

/// The JSON Schema primitive types.
///
/// `Integer` is not a separate JSON type; it names numbers with no
/// fractional part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JsonType {
    Null,
    Boolean,
    Integer,
    Number,
    String,
    Array,
    Object,
}

impl JsonType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JsonType::Null => "null",
            JsonType::Boolean => "boolean",
            JsonType::Integer => "integer",
            JsonType::Number => "number",
            JsonType::String => "string",
            JsonType::Array => "array",
            JsonType::Object => "object",
        }
    }
}

impl fmt::Display for JsonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JsonType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "null" => Ok(JsonType::Null),
            "boolean" => Ok(JsonType::Boolean),
            "integer" => Ok(JsonType::Integer),
            "number" => Ok(JsonType::Number),
            "string" => Ok(JsonType::String),
            "array" => Ok(JsonType::Array),
            "object" => Ok(JsonType::Object),
            other => Err(format!("unknown JSON type '{}'", other)),
        }
    }
}

impl JsonValue {
    /// Parse JSON text into a located value tree.
    pub fn parse(text: &str) -> Result<JsonValue> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        Ok(JsonValue::from_serde(&value))
    }

    /// Build a located value tree from a `serde_json::Value`.
    pub fn from_serde(value: &serde_json::Value) -> JsonValue {
        Self::build(value, JsonPointer::root())
    }

    fn build(value: &serde_json::Value, pointer: JsonPointer) -> JsonValue {
        let kind = match value {
            serde_json::Value::Null => JsonKind::Null,
            serde_json::Value::Bool(b) => JsonKind::Boolean(*b),
            serde_json::Value::Number(n) => JsonKind::Number(Number::from(n)),
            serde_json::Value::String(s) => JsonKind::String(s.clone()),
            serde_json::Value::Array(items) => JsonKind::Array(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| Self::build(item, pointer.child(i.to_string())))
                    .collect(),
            ),
            serde_json::Value::Object(members) => JsonKind::Object(
                members
                    .iter()
                    .map(|(k, v)| (k.clone(), Self::build(v, pointer.child(k.as_str()))))
                    .collect(),
            ),
        };
        JsonValue { pointer, kind }
    }

    /// Create a detached string value (e.g. an object key evaluated as an
    /// instance by `propertyNames`), located at `pointer`.
    pub fn string_at(s: impl Into<String>, pointer: JsonPointer) -> JsonValue {
        JsonValue {
            pointer,
            kind: JsonKind::String(s.into()),
        }
    }

    /// Convert back into a `serde_json::Value`.
    pub fn to_serde(&self) -> serde_json::Value {
        match &self.kind {
            JsonKind::Null => serde_json::Value::Null,
            JsonKind::Boolean(b) => serde_json::Value::Bool(*b),
            JsonKind::Number(n) => n
                .to_serde()
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            JsonKind::String(s) => serde_json::Value::String(s.clone()),
            JsonKind::Array(items) => {
                serde_json::Value::Array(items.iter().map(JsonValue::to_serde).collect())
            }
            JsonKind::Object(members) => serde_json::Value::Object(
                members
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_serde()))
                    .collect(),
            ),
        }
    }

    /// Location of this value from the document root.
    pub fn pointer(&self) -> &JsonPointer {
        &self.pointer
    }

    pub fn kind(&self) -> &JsonKind {
        &self.kind
    }

    /// The JSON type of this value (`Integer` is reported as `Number`).
    pub fn json_type(&self) -> JsonType {
        match &self.kind {
            JsonKind::Null => JsonType::Null,
            JsonKind::Boolean(_) => JsonType::Boolean,
            JsonKind::Number(_) => JsonType::Number,
            JsonKind::String(_) => JsonType::String,
            JsonKind::Array(_) => JsonType::Array,
            JsonKind::Object(_) => JsonType::Object,
        }
    }

    /// True when this value is an instance of `ty` (`integer` matches any
    /// number without a fractional part).
    pub fn is_type(&self, ty: JsonType) -> bool {
        match (ty, &self.kind) {
            (JsonType::Integer, JsonKind::Number(n)) => n.is_integer(),
            (ty, _) => self.json_type() == ty,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self.kind, JsonKind::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.kind {
            JsonKind::Boolean(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<&Number> {
        match &self.kind {
            JsonKind::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            JsonKind::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[JsonValue]> {
        match &self.kind {
            JsonKind::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&IndexMap<String, JsonValue>> {
        match &self.kind {
            JsonKind::Object(members) => Some(members),
            _ => None,
        }
    }

    /// Get an object member by key.
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.as_object().and_then(|members| members.get(key))
    }

    /// Get an array element by index.
    pub fn get_index(&self, index: usize) -> Option<&JsonValue> {
        self.as_array().and_then(|items| items.get(index))
    }

    /// Array length, object member count, or string length in characters.
    pub fn len(&self) -> usize {
        match &self.kind {
            JsonKind::Array(items) => items.len(),
            JsonKind::Object(members) => members.len(),
            JsonKind::String(s) => s.chars().count(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PartialEq for JsonValue {
    fn eq(&self, other: &Self) -> bool {
        match (&self.kind, &other.kind) {
            (JsonKind::Null, JsonKind::Null) => true,
            (JsonKind::Boolean(a), JsonKind::Boolean(b)) => a == b,
            (JsonKind::Number(a), JsonKind::Number(b)) => a == b,
            (JsonKind::String(a), JsonKind::String(b)) => a == b,
            (JsonKind::Array(a), JsonKind::Array(b)) => a == b,
            (JsonKind::Object(a), JsonKind::Object(b)) => {
                a.len() == b.len() && a.iter().all(|(k, v)| b.get(k) == Some(v))
            }
            _ => false,
        }
    }
}

impl From<serde_json::Value> for JsonValue {
    fn from(value: serde_json::Value) -> Self {
        JsonValue::from_serde(&value)
    }
}

impl From<&serde_json::Value> for JsonValue {
    fn from(value: &serde_json::Value) -> Self {
        JsonValue::from_serde(value)
    }
}

impl FromStr for JsonValue {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self> {
        JsonValue::parse(s)
    }
}

impl fmt::Display for JsonValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_serde())
    }
}

impl Serialize for JsonValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_serde().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for JsonValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(JsonValue::from_serde(&value))
    }
}
