//! Readers for the RPC's JSON rendering of `ScVal`.
//!
//! Contract structs arrive as `{"map": [{"key": {"symbol": ..}, "val": ..}]}`,
//! unit enum variants as `{"vec": [{"symbol": "Active"}]}` and tuple variants
//! with their payload appended to that vector. 64- and 128-bit integers are
//! accepted either as JSON numbers or decimal strings.

use serde_json::Value;

use crate::errors::{GatewayError, Result};

fn tagged<'a>(value: &'a Value, tag: &str) -> Result<&'a Value> {
    value
        .get(tag)
        .ok_or_else(|| GatewayError::Decode(format!("expected {tag}, got {value}")))
}

pub(crate) fn integer<T: std::str::FromStr>(raw: &Value, tag: &str) -> Result<T> {
    let text = match raw {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => return Err(GatewayError::Decode(format!("{tag} is not an integer: {other}"))),
    };
    text.parse()
        .map_err(|_| GatewayError::Decode(format!("{tag} out of range: {text}")))
}

pub fn as_u32(value: &Value) -> Result<u32> {
    integer(tagged(value, "u32")?, "u32")
}

pub fn as_u64(value: &Value) -> Result<u64> {
    integer(tagged(value, "u64")?, "u64")
}

pub fn as_i128(value: &Value) -> Result<i128> {
    let raw = tagged(value, "i128")?;
    if let (Some(hi), Some(lo)) = (raw.get("hi"), raw.get("lo")) {
        let hi: i64 = integer(hi, "i128.hi")?;
        let lo: u64 = integer(lo, "i128.lo")?;
        return Ok((i128::from(hi) << 64) | i128::from(lo));
    }
    integer(raw, "i128")
}

fn as_text<'a>(value: &'a Value, tag: &str) -> Result<&'a str> {
    tagged(value, tag)?
        .as_str()
        .ok_or_else(|| GatewayError::Decode(format!("{tag} is not text: {value}")))
}

pub fn as_address(value: &Value) -> Result<String> {
    as_text(value, "address").map(str::to_string)
}

pub fn as_string(value: &Value) -> Result<String> {
    as_text(value, "string").map(str::to_string)
}

pub fn as_symbol(value: &Value) -> Result<&str> {
    as_text(value, "symbol")
}

pub fn as_vec(value: &Value) -> Result<&[Value]> {
    tagged(value, "vec")?
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| GatewayError::Decode(format!("vec is not an array: {value}")))
}

/// Look up `name` in a struct rendered as a symbol-keyed map.
pub fn field<'a>(value: &'a Value, name: &str) -> Result<&'a Value> {
    let entries = tagged(value, "map")?
        .as_array()
        .ok_or_else(|| GatewayError::Decode(format!("map is not an array: {value}")))?;
    entries
        .iter()
        .find(|entry| {
            entry
                .get("key")
                .and_then(|k| k.get("symbol"))
                .and_then(Value::as_str)
                == Some(name)
        })
        .and_then(|entry| entry.get("val"))
        .ok_or_else(|| GatewayError::Decode(format!("missing field '{name}'")))
}

/// Split an enum value into its variant name and payload.
pub fn variant(value: &Value) -> Result<(&str, &[Value])> {
    let items = as_vec(value)?;
    let (head, payload) = items
        .split_first()
        .ok_or_else(|| GatewayError::Decode("empty enum vector".into()))?;
    Ok((as_symbol(head)?, payload))
}

pub fn u64_list(value: &Value) -> Result<Vec<u64>> {
    as_vec(value)?.iter().map(as_u64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn integers_accept_strings_and_numbers() {
        assert_eq!(as_u64(&json!({ "u64": "42" })).unwrap(), 42);
        assert_eq!(as_u64(&json!({ "u64": 42 })).unwrap(), 42);
        assert_eq!(as_u32(&json!({ "u32": 7 })).unwrap(), 7);
        assert_eq!(
            as_i128(&json!({ "i128": "-170141183460469231731687303715884105728" })).unwrap(),
            i128::MIN
        );
        assert_eq!(as_i128(&json!({ "i128": { "hi": 1, "lo": 5 } })).unwrap(), (1i128 << 64) | 5);
        assert!(as_u64(&json!({ "i128": "1" })).is_err());
        assert!(as_u32(&json!({ "u32": "99999999999" })).is_err());
    }

    #[test]
    fn struct_fields_and_enums() {
        let value = json!({ "map": [
            { "key": { "symbol": "amount" }, "val": { "i128": "500" } },
            { "key": { "symbol": "asset" }, "val": { "vec": [
                { "symbol": "Token" }, { "address": "CTOKEN" }
            ] } },
        ] });

        assert_eq!(as_i128(field(&value, "amount").unwrap()).unwrap(), 500);
        let (name, payload) = variant(field(&value, "asset").unwrap()).unwrap();
        assert_eq!(name, "Token");
        assert_eq!(as_address(&payload[0]).unwrap(), "CTOKEN");
        assert!(matches!(field(&value, "deadline"), Err(GatewayError::Decode(_))));
    }

    #[test]
    fn id_lists() {
        let value = json!({ "vec": [{ "u64": "1" }, { "u64": "3" }] });
        assert_eq!(u64_list(&value).unwrap(), vec![1, 3]);
        assert!(u64_list(&json!({ "vec": [] })).unwrap().is_empty());
    }
}
