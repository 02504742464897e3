//! Reading plain values out of GraphSON v2 results.

use serde_json::Value;

/// Strip `{"@type": .., "@value": ..}` wrappers
pub fn untyped(value: &Value) -> &Value {
    match value {
        Value::Object(map) if map.contains_key("@type") => {
            map.get("@value").map(untyped).unwrap_or(value)
        }
        _ => value,
    }
}

/// Flatten a result payload into rows
pub fn rows(data: Value) -> Vec<Value> {
    match data {
        Value::Null => Vec::new(),
        Value::Array(items) => items,
        Value::Object(ref map) if map.get("@type").and_then(Value::as_str) == Some("g:List") => {
            match map.get("@value") {
                Some(Value::Array(items)) => items.clone(),
                _ => Vec::new(),
            }
        }
        other => vec![other],
    }
}

/// A vertex id or other scalar rendered as a string
pub fn as_id(value: &Value) -> Option<String> {
    match untyped(value) {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn as_count(value: &Value) -> Option<usize> {
    untyped(value).as_u64().map(|n| n as usize)
}
