//!
//! serde_cbor-powered payload codec for the unit store, plus the guard that
//! keeps payloads inside the simple-typed subset every store must round-trip:
//! null, booleans, i64-range integers, floats, text, bytes, arrays and
//! text-keyed maps.
//!

use serde_cbor::{Value, from_slice, to_vec};
use thiserror::Error as ThisError;

///
/// CodecError
///

#[derive(Debug, ThisError)]
pub enum CodecError {
    #[error("serialize error: {0}")]
    Serialize(String),

    #[error("deserialize error: {0}")]
    Deserialize(String),

    #[error("not a simple type at {path}: {reason}")]
    NotSimple { path: String, reason: String },
}

pub fn encode(value: &Value) -> Result<Vec<u8>, CodecError> {
    to_vec(value).map_err(|e| CodecError::Serialize(e.to_string()))
}

pub fn decode(bytes: &[u8]) -> Result<Value, CodecError> {
    from_slice(bytes).map_err(|e| CodecError::Deserialize(e.to_string()))
}

/// Reject anything outside the simple-typed subset, naming where it sits.
pub fn ensure_simple(value: &Value) -> Result<(), CodecError> {
    check(value, "$")
}

fn check(value: &Value, path: &str) -> Result<(), CodecError> {
    match value {
        Value::Null | Value::Bool(_) | Value::Float(_) | Value::Text(_) | Value::Bytes(_) => Ok(()),
        Value::Integer(i) => {
            if i64::try_from(*i).is_ok() {
                Ok(())
            } else {
                Err(not_simple(path, format!("integer {i} is out of range")))
            }
        }
        Value::Array(items) => items
            .iter()
            .enumerate()
            .try_for_each(|(i, item)| check(item, &format!("{path}[{i}]"))),
        Value::Map(entries) => entries.iter().try_for_each(|(key, item)| match key {
            Value::Text(key) => check(item, &format!("{path}.{key}")),
            other => Err(not_simple(path, format!("map key {other:?} is not a string"))),
        }),
        Value::Tag(tag, _) => Err(not_simple(path, format!("tagged value ({tag})"))),
        other => Err(not_simple(path, format!("unsupported value {other:?}"))),
    }
}

fn not_simple(path: &str, reason: String) -> CodecError {
    CodecError::NotSimple {
        path: path.to_string(),
        reason,
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    #[test]
    fn nested_simple_payload_round_trips() {
        let mut inner = BTreeMap::new();
        inner.insert(text("ids"), Value::Array(vec![Value::Integer(1), Value::Null]));
        inner.insert(text("ratio"), Value::Float(0.25));
        let value = Value::Map(inner);

        ensure_simple(&value).expect("simple");
        let decoded = decode(&encode(&value).expect("encode")).expect("decode");

        assert_eq!(decoded, value);
    }

    #[test]
    fn integer_map_keys_are_rejected() {
        let mut map = BTreeMap::new();
        map.insert(Value::Integer(1), text("x"));

        let err = ensure_simple(&Value::Map(map)).unwrap_err();
        assert!(err.to_string().contains("not a string"));
    }

    #[test]
    fn tags_and_huge_integers_are_rejected() {
        let tagged = Value::Tag(1, Box::new(Value::Integer(0)));
        let huge = Value::Array(vec![Value::Integer(i128::from(u64::MAX))]);

        assert!(ensure_simple(&tagged).is_err());
        let err = ensure_simple(&huge).unwrap_err();
        assert!(err.to_string().contains("$[0]"));
    }
}
