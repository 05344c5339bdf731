//! Flatten any `Serialize` value into dotted key-value pairs, handling
//! `Option::None` without requiring `#[serde(skip_serializing_if)]`.

use serde::Serialize;
use serde::ser::Error as _;

use crate::value::{self, Value};

/// Flatten a `Serialize` value into dotted key-value pairs.
///
/// `None` values (from `Option::None` fields) are represented as `(key, None)`.
/// Present values are `(key, Some(value))`; sequences stay whole.
///
/// Structs and maps are recursed into, building dotted key paths:
/// `Outer { database: Inner { url: "pg://" } }` → `[("database.url", Some("pg://"))]`
pub fn flatten<S: Serialize + ?Sized>(
    source: &S,
) -> Result<Vec<(String, Option<Value>)>, serde_json::Error> {
    let Value::Mapping(entries) = value::to_value(source)? else {
        return Err(serde_json::Error::custom("expected a struct or map"));
    };
    let mut out = Vec::new();
    for (key, value) in entries {
        walk(key, value, &mut out);
    }
    Ok(out)
}

fn walk(prefix: String, value: Value, out: &mut Vec<(String, Option<Value>)>) {
    match value {
        Value::Null => out.push((prefix, None)),
        Value::Mapping(entries) => {
            for (key, value) in entries {
                walk(format!("{prefix}.{key}"), value, out);
            }
        }
        other => out.push((prefix, Some(other))),
    }
}
