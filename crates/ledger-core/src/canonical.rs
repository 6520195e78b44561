use serde::Serialize;
use serde_json::Value;

use crate::error::CoreError;

/// Serialize `value` to its RFC 8785 JSON Canonicalization Scheme form:
/// object keys sorted lexicographically, no insignificant whitespace, UTF-8
/// output, and (since every number this system ever hashes is an integer)
/// shortest-round-trip decimal form falls out for free.
///
/// `serde_json::Map` is backed by a `BTreeMap` as long as the `preserve_order`
/// feature is not enabled (it is not, workspace-wide) — going through
/// `serde_json::Value` therefore sorts every nested object's keys without any
/// bespoke tree-walking serializer.
pub fn to_canonical_json<T: Serialize>(value: &T) -> Result<String, CoreError> {
    let v = serde_json::to_value(value).map_err(|e| CoreError::Canonicalization(e.to_string()))?;
    reject_non_integer_numbers(&v)?;
    serde_json::to_string(&v).map_err(|e| CoreError::Canonicalization(e.to_string()))
}

/// Canonical bytes, ready for hashing or as the payload to be signed.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, CoreError> {
    Ok(to_canonical_json(value)?.into_bytes())
}

/// Defensively reject any JSON number that would require lossy floating-point
/// formatting — this system's only numeric fields are integers
/// (`Amount`, `lamport_clock`, `timestamp`), and a stray `f64` sneaking in
/// would silently break interop with every other canonicalizer.
fn reject_non_integer_numbers(v: &Value) -> Result<(), CoreError> {
    match v {
        Value::Number(n) => {
            if n.is_f64() {
                Err(CoreError::Canonicalization(format!(
                    "non-integer number in canonicalized payload: {n}"
                )))
            } else {
                Ok(())
            }
        }
        Value::Array(items) => {
            for item in items {
                reject_non_integer_numbers(item)?;
            }
            Ok(())
        }
        Value::Object(map) => {
            for value in map.values() {
                reject_non_integer_numbers(value)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}
