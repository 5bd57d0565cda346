//! Typed attribute values matching OTLP's `AnyValue` semantics (spec §4.1).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    String(String),
    Int(i64),
    Double(f64),
    Bool(bool),
    Bytes(Vec<u8>),
    Array(Vec<AttrValue>),
    Map(BTreeMap<String, AttrValue>),
}

/// A sorted attribute set. Sorting by key makes content hashing and equality
/// deterministic regardless of the order attributes arrived on the wire.
pub type Attributes = BTreeMap<String, AttrValue>;

impl AttrValue {
    pub fn from_otlp(value: &opentelemetry_proto::tonic::common::v1::AnyValue) -> Result<Self, Error> {
        use opentelemetry_proto::tonic::common::v1::any_value::Value;
        match &value.value {
            Some(Value::StringValue(s)) => Ok(AttrValue::String(s.clone())),
            Some(Value::IntValue(i)) => Ok(AttrValue::Int(*i)),
            Some(Value::DoubleValue(d)) => Ok(AttrValue::Double(*d)),
            Some(Value::BoolValue(b)) => Ok(AttrValue::Bool(*b)),
            Some(Value::BytesValue(b)) => Ok(AttrValue::Bytes(b.clone())),
            Some(Value::ArrayValue(arr)) => {
                let items = arr
                    .values
                    .iter()
                    .map(AttrValue::from_otlp)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(AttrValue::Array(items))
            }
            Some(Value::KvlistValue(kv)) => {
                let mut map = BTreeMap::new();
                for entry in &kv.values {
                    if let Some(v) = &entry.value {
                        map.insert(entry.key.clone(), AttrValue::from_otlp(v)?);
                    }
                }
                Ok(AttrValue::Map(map))
            }
            None => Err(Error::UnsupportedAttrType("empty AnyValue".to_string())),
        }
    }

    /// A faithful JSON representation, used by the Query API (spec §4.6:
    /// "OTEL-shaped JSON"). Distinct from `as_display`, which is a flattened
    /// textual form used only for content hashing.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            AttrValue::String(s) => serde_json::Value::String(s.clone()),
            AttrValue::Int(i) => serde_json::json!(i),
            AttrValue::Double(d) => serde_json::json!(d),
            AttrValue::Bool(b) => serde_json::Value::Bool(*b),
            AttrValue::Bytes(b) => serde_json::Value::String(crate::ids::hex_encode(b)),
            AttrValue::Array(items) => serde_json::Value::Array(items.iter().map(AttrValue::to_json).collect()),
            AttrValue::Map(map) => {
                serde_json::Value::Object(map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect())
            }
        }
    }

    /// A stable textual form used for content hashing and JSON query responses.
    pub fn as_display(&self) -> String {
        match self {
            AttrValue::String(s) => s.clone(),
            AttrValue::Int(i) => i.to_string(),
            AttrValue::Double(d) => d.to_string(),
            AttrValue::Bool(b) => b.to_string(),
            AttrValue::Bytes(b) => crate::ids::hex_encode(b),
            AttrValue::Array(items) => {
                let parts: Vec<String> = items.iter().map(AttrValue::as_display).collect();
                format!("[{}]", parts.join(","))
            }
            AttrValue::Map(map) => {
                let parts: Vec<String> = map.iter().map(|(k, v)| format!("{k}={}", v.as_display())).collect();
                format!("{{{}}}", parts.join(","))
            }
        }
    }
}

pub fn attributes_to_json(attrs: &Attributes) -> serde_json::Value {
    serde_json::Value::Object(attrs.iter().map(|(k, v)| (k.clone(), v.to_json())).collect())
}

/// Convert a flat OTLP `KeyValue` list into a sorted attribute map, best-effort:
/// unsupported types are dropped (spec §7 `UnsupportedAttrType`) rather than
/// failing the whole record.
pub fn attributes_from_otlp(
    kvs: &[opentelemetry_proto::tonic::common::v1::KeyValue],
) -> (Attributes, usize) {
    let mut attrs = Attributes::new();
    let mut dropped = 0;
    for kv in kvs {
        let Some(value) = &kv.value else {
            dropped += 1;
            continue;
        };
        match AttrValue::from_otlp(value) {
            Ok(v) => {
                attrs.insert(kv.key.clone(), v);
            }
            Err(_) => dropped += 1,
        }
    }
    (attrs, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_nests_maps_and_arrays() {
        let mut inner = BTreeMap::new();
        inner.insert("b".to_string(), AttrValue::Int(1));
        let v = AttrValue::Array(vec![AttrValue::Map(inner)]);
        assert_eq!(v.as_display(), "[{b=1}]");
    }
}
