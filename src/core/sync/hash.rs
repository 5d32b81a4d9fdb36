//! Canonical JSON and content hashing for the sync store
//!
//! Two records with the same content hash to the same value no matter how their
//! keys were ordered or how their numbers were formatted on the wire.

use crate::domain::{LmsError, Result};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Normalize a record into its canonical form
///
/// Object keys are sorted recursively; numbers and booleans become strings;
/// `null` stays `null`. Array order is content and is preserved.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, Value> =
                map.iter().map(|(k, v)| (k, canonicalize(v))).collect();
            let mut out = Map::new();
            for (k, v) in sorted {
                out.insert(k.clone(), v);
            }
            Value::Object(out)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(canonicalize).collect()),
        Value::Number(n) => Value::String(n.to_string()),
        Value::Bool(b) => Value::String(b.to_string()),
        Value::String(_) | Value::Null => value.clone(),
    }
}

/// Compact canonical JSON string of a record
pub fn canonical_json(value: &Value) -> Result<String> {
    serde_json::to_string(&canonicalize(value)).map_err(|e| LmsError::Serialization(e.to_string()))
}

/// SHA-256 hex digest of a record's canonical JSON
///
/// # Examples
///
/// ```
/// use lms_toolkit::core::sync::hash::content_hash;
/// use serde_json::json;
///
/// let a = content_hash(&json!({"id": 1, "name": "Alice"})).unwrap();
/// let b = content_hash(&json!({"name": "Alice", "id": "1"})).unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.len(), 64);
/// ```
pub fn content_hash(value: &Value) -> Result<String> {
    let data_str = canonical_json(value)?;
    Ok(hash_str(&data_str))
}

/// SHA-256 hex digest of an already canonical string
pub fn hash_str(data: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    let result = hasher.finalize();
    format!("{result:x}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_hash_deterministic() {
        let data = json!({"id": 4, "enrollment_state": "invited"});

        let first = content_hash(&data).unwrap();
        let second = content_hash(&data).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
    }

    #[test]
    fn test_hash_stable_under_key_order() {
        let data1: Value = serde_json::from_str(r#"{"a": 1, "b": {"y": true, "x": null}}"#).unwrap();
        let data2: Value = serde_json::from_str(r#"{"b":{"x":null,"y":true},"a":1}"#).unwrap();

        assert_eq!(content_hash(&data1).unwrap(), content_hash(&data2).unwrap());
    }

    #[test]
    fn test_scalars_are_stringified() {
        let canonical = canonical_json(&json!({"points": 10, "late": false, "grade": null})).unwrap();
        assert_eq!(canonical, r#"{"grade":null,"late":"false","points":"10"}"#);
    }

    #[test]
    fn test_whitespace_change_is_detected() {
        let before = json!({"name": "Alice Smith"});
        let after = json!({"name": "Alice  Smith"});

        assert_ne!(content_hash(&before).unwrap(), content_hash(&after).unwrap());
    }

    #[test]
    fn test_array_order_matters() {
        let a = json!({"types": ["online_upload", "online_text_entry"]});
        let b = json!({"types": ["online_text_entry", "online_upload"]});

        assert_ne!(content_hash(&a).unwrap(), content_hash(&b).unwrap());
    }
}
