//! Serde helpers shared by the provider models
//!
//! Provider payloads are loose about scalar types: Canvas sends numeric ids,
//! Schoology sends the same id as a number on one endpoint and a string on
//! another, and flags arrive as `true`, `"True"`, `1` or `"1"`. The typed models
//! normalise all of that at the boundary so mappers only ever see `String`
//! and `bool`.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Render a scalar JSON value as a string
///
/// `null` and missing values become the empty string; objects and arrays are
/// rendered as compact JSON.
pub fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Interpret a JSON value as a flag
pub fn value_to_flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        _ => false,
    }
}

/// Deserialize a string, number, bool or null into a `String`
pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(scalar_to_string).unwrap_or_default())
}

/// Deserialize `true`, `"True"`, `1` or `"1"` into `true`; anything else is `false`
pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(value_to_flag).unwrap_or(false))
}

/// Deserialize an array of scalars into strings; `null` becomes an empty list
pub fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter(|v| !v.is_null())
            .map(scalar_to_string)
            .collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => vec![scalar_to_string(&other)],
    })
}

/// Read a string at a JSON pointer, empty when absent
pub fn string_at(value: &Value, pointer: &str) -> String {
    value
        .pointer(pointer)
        .map(scalar_to_string)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[derive(Debug, Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "string_or_number")]
        id: String,
        #[serde(default, deserialize_with = "flag")]
        late: bool,
        #[serde(default, deserialize_with = "string_list")]
        types: Vec<String>,
    }

    #[test]
    fn test_numeric_id_becomes_string() {
        let probe: Probe = serde_json::from_value(json!({"id": 103})).unwrap();
        assert_eq!(probe.id, "103");
        assert!(!probe.late);
        assert!(probe.types.is_empty());
    }

    #[test]
    fn test_null_id_is_empty() {
        let probe: Probe = serde_json::from_value(json!({"id": null})).unwrap();
        assert_eq!(probe.id, "");
    }

    #[test_case(json!(true), true)]
    #[test_case(json!("True"), true)]
    #[test_case(json!(1), true)]
    #[test_case(json!("1"), true)]
    #[test_case(json!(false), false)]
    #[test_case(json!("False"), false)]
    #[test_case(json!(0), false)]
    #[test_case(json!(null), false)]
    fn test_flag_values(value: Value, expected: bool) {
        let probe: Probe = serde_json::from_value(json!({"late": value})).unwrap();
        assert_eq!(probe.late, expected);
    }

    #[test]
    fn test_string_list() {
        let probe: Probe =
            serde_json::from_value(json!({"types": ["online_upload", null, 3]})).unwrap();
        assert_eq!(probe.types, vec!["online_upload", "3"]);
    }

    #[test]
    fn test_string_at() {
        let value = json!({"profile": {"name": {"fullName": "Ada Lovelace"}}, "n": 4.5});
        assert_eq!(string_at(&value, "/profile/name/fullName"), "Ada Lovelace");
        assert_eq!(string_at(&value, "/n"), "4.5");
        assert_eq!(string_at(&value, "/missing"), "");
    }
}
