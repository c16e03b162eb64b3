//! Tagged wire values.
//!
//! Request arguments and response data travel as a tagged union of the
//! supported wire kinds rather than as opaque blobs. The explicit tags keep
//! the compact binary serializers (which are not self-describing) working,
//! while the JSON serializer converts to and from loose JSON at the wire
//! boundary and re-coerces by declared type descriptor on decode.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{RpcError, RpcResult};

/// One argument or result value on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Maps a loose JSON value onto the closest wire kind.
    ///
    /// Integers become [`Value::I64`], all other numbers [`Value::F64`].
    pub fn from_json(json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::I64(i)
                } else {
                    Value::F64(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(fields) => Value::Map(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Renders the value as loose JSON. Bytes become an array of numbers.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::I64(i) => serde_json::Value::from(*i),
            Value::F64(f) => serde_json::Value::from(*f),
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::Bytes(bytes) => {
                serde_json::Value::Array(bytes.iter().map(|b| serde_json::Value::from(*b)).collect())
            }
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(fields) => serde_json::Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::I64(_) => "i64",
            Value::F64(_) => "f64",
            Value::Str(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }
}

/// Converts any serializable type into a wire value via the JSON bridge.
pub fn to_value<T: Serialize>(value: &T) -> RpcResult<Value> {
    Ok(Value::from_json(serde_json::to_value(value)?))
}

/// Reconstructs a typed value from a wire value via the JSON bridge.
pub fn from_value<T: DeserializeOwned>(value: &Value) -> RpcResult<T> {
    Ok(serde_json::from_value(value.to_json())?)
}

/// Re-coerces a loose JSON value into the wire kind named by a type
/// descriptor.
///
/// Used by the JSON serializer after decoding: JSON erases the static type of
/// each argument, so every position is re-interpreted under its declared
/// descriptor. Unknown descriptors (user-defined struct names) fall back to
/// the structural mapping of [`Value::from_json`].
pub fn coerce_json(loose: serde_json::Value, descriptor: &str) -> RpcResult<Value> {
    let mismatch = |loose: &serde_json::Value| {
        RpcError::Serialization(format!(
            "cannot decode a value of type {descriptor} from {loose}"
        ))
    };
    match descriptor {
        "void" | "null" => Ok(Value::Null),
        "bool" => loose
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| mismatch(&loose)),
        "i8" | "i16" | "i32" | "i64" | "u8" | "u16" | "u32" => loose
            .as_i64()
            .map(Value::I64)
            .ok_or_else(|| mismatch(&loose)),
        "f32" | "f64" => loose
            .as_f64()
            .map(Value::F64)
            .ok_or_else(|| mismatch(&loose)),
        "string" | "str" => match loose {
            serde_json::Value::String(s) => Ok(Value::Str(s)),
            other => Err(mismatch(&other)),
        },
        "bytes" => match loose {
            serde_json::Value::Array(items) => {
                let mut bytes = Vec::with_capacity(items.len());
                for item in &items {
                    let b = item
                        .as_u64()
                        .filter(|b| *b <= u8::MAX as u64)
                        .ok_or_else(|| mismatch(item))?;
                    bytes.push(b as u8);
                }
                Ok(Value::Bytes(bytes))
            }
            other => Err(mismatch(&other)),
        },
        _ => Ok(Value::from_json(loose)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct User {
        name: String,
        age: i64,
    }

    #[test]
    fn test_typed_round_trip() {
        let user = User {
            name: "mini-rpc".to_string(),
            age: 3,
        };
        let value = to_value(&user).unwrap();
        assert!(matches!(value, Value::Map(_)));
        let back: User = from_value(&value).unwrap();
        assert_eq!(back, user);
    }

    #[test]
    fn test_json_round_trip_scalars() {
        let cases = vec![
            (json!(null), Value::Null),
            (json!(true), Value::Bool(true)),
            (json!(42), Value::I64(42)),
            (json!(2.5), Value::F64(2.5)),
            (json!("hi"), Value::Str("hi".to_string())),
        ];
        for (loose, expected) in cases {
            assert_eq!(Value::from_json(loose.clone()), expected);
            assert_eq!(expected.to_json(), loose);
        }
    }

    #[test]
    fn test_coerce_by_descriptor() {
        assert_eq!(coerce_json(json!(7), "i32").unwrap(), Value::I64(7));
        assert_eq!(coerce_json(json!(7.5), "f64").unwrap(), Value::F64(7.5));
        assert_eq!(
            coerce_json(json!("abc"), "string").unwrap(),
            Value::Str("abc".to_string())
        );
        assert_eq!(
            coerce_json(json!([1, 2, 255]), "bytes").unwrap(),
            Value::Bytes(vec![1, 2, 255])
        );
    }

    #[test]
    fn test_coerce_unknown_descriptor_is_structural() {
        let coerced = coerce_json(json!({"name": "mini-rpc"}), "demo.User").unwrap();
        match coerced {
            Value::Map(fields) => {
                assert_eq!(fields["name"], Value::Str("mini-rpc".to_string()));
            }
            other => panic!("expected a map, got {other:?}"),
        }
    }

    #[test]
    fn test_coerce_mismatch_fails() {
        assert!(coerce_json(json!("not a number"), "i64").is_err());
        assert!(coerce_json(json!(1), "bool").is_err());
        assert!(coerce_json(json!([300]), "bytes").is_err());
    }

    #[test]
    fn test_bytes_survive_json_rendering() {
        let original = Value::Bytes(vec![0, 127, 255]);
        let coerced = coerce_json(original.to_json(), "bytes").unwrap();
        assert_eq!(coerced, original);
    }
}
