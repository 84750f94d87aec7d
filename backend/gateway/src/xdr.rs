//! Ledger XDR at the edge of the gateway.
//!
//! Inside the gateway contract values stay in the JSON `ScVal` form the RPC
//! renders (`{"u64": "5"}`, `{"address": "G..."}`, ...). This module turns
//! them into `stellar_xdr` values on the way out and back on the way in, and
//! wraps base64 XDR encoding.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Value};
use stellar_strkey::{ed25519, Contract, Strkey};
use stellar_xdr::curr::{
    self as xdr, AccountId, Hash, Int128Parts, Limits, MuxedAccount, PublicKey, ReadXdr, ScAddress,
    ScBytes, ScMap, ScMapEntry, ScString, ScSymbol, ScVal, ScVec, UInt128Parts, Uint256, WriteXdr,
};

use crate::errors::{GatewayError, Result};
use crate::scval::integer;

pub fn encode<T: WriteXdr>(value: &T) -> Result<String> {
    Ok(STANDARD.encode(value.to_xdr(Limits::none())?))
}

pub fn decode<T: ReadXdr>(encoded: &str) -> Result<T> {
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| GatewayError::Decode(format!("invalid base64 XDR: {e}")))?;
    Ok(T::from_xdr(bytes, Limits::none())?)
}

// ─────────────────────────────────────────────────────────
// Addresses
// ─────────────────────────────────────────────────────────

/// Raw ed25519 key of a `G...` account.
pub fn account_key(address: &str) -> Result<[u8; 32]> {
    ed25519::PublicKey::from_string(address)
        .map(|key| key.0)
        .map_err(|_| GatewayError::Validation(format!("'{address}' is not an account address")))
}

pub fn account_id(address: &str) -> Result<AccountId> {
    Ok(AccountId(PublicKey::PublicKeyTypeEd25519(Uint256(
        account_key(address)?,
    ))))
}

pub fn muxed_account(address: &str) -> Result<MuxedAccount> {
    Ok(MuxedAccount::Ed25519(Uint256(account_key(address)?)))
}

pub fn sc_address(address: &str) -> Result<ScAddress> {
    match Strkey::from_string(address) {
        Ok(Strkey::PublicKeyEd25519(key)) => Ok(ScAddress::Account(AccountId(
            PublicKey::PublicKeyTypeEd25519(Uint256(key.0)),
        ))),
        Ok(Strkey::Contract(contract)) => Ok(ScAddress::Contract(Hash(contract.0))),
        _ => Err(GatewayError::Validation(format!(
            "'{address}' is not a valid account or contract address"
        ))),
    }
}

fn address_string(address: &ScAddress) -> String {
    match address {
        ScAddress::Account(AccountId(PublicKey::PublicKeyTypeEd25519(Uint256(key)))) => {
            ed25519::PublicKey(*key).to_string()
        }
        ScAddress::Contract(Hash(id)) => Contract(*id).to_string(),
    }
}

// ─────────────────────────────────────────────────────────
// ScVal
// ─────────────────────────────────────────────────────────

fn too_long(what: &str) -> impl Fn(xdr::Error) -> GatewayError + '_ {
    move |_| GatewayError::Validation(format!("{what} exceeds the ledger's size limit"))
}

fn text<'a>(raw: &'a Value, tag: &str) -> Result<&'a str> {
    raw.as_str()
        .ok_or_else(|| GatewayError::Validation(format!("{tag} must be text, got {raw}")))
}

/// A 128-bit integer given as a number, a decimal string or `{hi, lo}` parts.
fn wide<T, H>(raw: &Value, tag: &str) -> Result<T>
where
    T: std::str::FromStr
        + From<H>
        + From<u64>
        + std::ops::Shl<u32, Output = T>
        + std::ops::BitOr<Output = T>,
    H: std::str::FromStr,
{
    match (raw.get("hi"), raw.get("lo")) {
        (Some(hi), Some(lo)) => {
            let hi: H = integer(hi, tag)?;
            let lo: u64 = integer(lo, tag)?;
            Ok((T::from(hi) << 64) | T::from(lo))
        }
        _ => integer(raw, tag),
    }
}

/// Lower a JSON `ScVal` into XDR.
pub fn to_scval(value: &Value) -> Result<ScVal> {
    if value.as_str() == Some("void") {
        return Ok(ScVal::Void);
    }
    let (tag, raw) = value
        .as_object()
        .filter(|obj| obj.len() == 1)
        .and_then(|obj| obj.iter().next())
        .ok_or_else(|| GatewayError::Validation(format!("not a tagged ScVal: {value}")))?;

    Ok(match tag.as_str() {
        "bool" => ScVal::Bool(
            raw.as_bool()
                .ok_or_else(|| GatewayError::Validation(format!("bool expected, got {raw}")))?,
        ),
        "void" => ScVal::Void,
        "u32" => ScVal::U32(integer(raw, "u32")?),
        "i32" => ScVal::I32(integer(raw, "i32")?),
        "u64" => ScVal::U64(integer(raw, "u64")?),
        "i64" => ScVal::I64(integer(raw, "i64")?),
        "timepoint" => ScVal::Timepoint(xdr::TimePoint(integer(raw, "timepoint")?)),
        "duration" => ScVal::Duration(xdr::Duration(integer(raw, "duration")?)),
        "i128" => {
            let v: i128 = wide::<i128, i64>(raw, "i128")?;
            ScVal::I128(Int128Parts {
                hi: (v >> 64) as i64,
                lo: v as u64,
            })
        }
        "u128" => {
            let v: u128 = wide::<u128, u64>(raw, "u128")?;
            ScVal::U128(UInt128Parts {
                hi: (v >> 64) as u64,
                lo: v as u64,
            })
        }
        "bytes" => {
            let bytes = hex::decode(text(raw, "bytes")?)
                .map_err(|e| GatewayError::Validation(format!("bytes must be hex: {e}")))?;
            ScVal::Bytes(ScBytes(bytes.try_into().map_err(too_long("bytes"))?))
        }
        "string" => ScVal::String(ScString(
            text(raw, "string")?.try_into().map_err(too_long("string"))?,
        )),
        "symbol" => ScVal::Symbol(ScSymbol(
            text(raw, "symbol")?.try_into().map_err(too_long("symbol"))?,
        )),
        "address" => ScVal::Address(sc_address(text(raw, "address")?)?),
        "vec" => {
            let items = raw
                .as_array()
                .ok_or_else(|| GatewayError::Validation(format!("vec expected, got {raw}")))?
                .iter()
                .map(to_scval)
                .collect::<Result<Vec<_>>>()?;
            ScVal::Vec(Some(ScVec(items.try_into().map_err(too_long("vec"))?)))
        }
        "map" => {
            let entries = raw
                .as_array()
                .ok_or_else(|| GatewayError::Validation(format!("map expected, got {raw}")))?
                .iter()
                .map(|entry| -> Result<ScMapEntry> {
                    let field = |name: &str| {
                        entry.get(name).ok_or_else(|| {
                            GatewayError::Validation(format!("map entry without {name}: {entry}"))
                        })
                    };
                    Ok(ScMapEntry {
                        key: to_scval(field("key")?)?,
                        val: to_scval(field("val")?)?,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            ScVal::Map(Some(ScMap(entries.try_into().map_err(too_long("map"))?)))
        }
        other => {
            return Err(GatewayError::Validation(format!(
                "unsupported ScVal type '{other}'"
            )))
        }
    })
}

/// Raise an XDR `ScVal` into its JSON form. 64-bit and wider integers become
/// decimal strings.
pub fn from_scval(value: &ScVal) -> Result<Value> {
    Ok(match value {
        ScVal::Bool(b) => json!({ "bool": b }),
        ScVal::Void => Value::String("void".into()),
        ScVal::U32(v) => json!({ "u32": v }),
        ScVal::I32(v) => json!({ "i32": v }),
        ScVal::U64(v) => json!({ "u64": v.to_string() }),
        ScVal::I64(v) => json!({ "i64": v.to_string() }),
        ScVal::Timepoint(t) => json!({ "timepoint": t.0.to_string() }),
        ScVal::Duration(d) => json!({ "duration": d.0.to_string() }),
        ScVal::U128(parts) => {
            let v = (u128::from(parts.hi) << 64) | u128::from(parts.lo);
            json!({ "u128": v.to_string() })
        }
        ScVal::I128(parts) => {
            let v = (i128::from(parts.hi) << 64) | i128::from(parts.lo);
            json!({ "i128": v.to_string() })
        }
        ScVal::Bytes(bytes) => json!({ "bytes": hex::encode(bytes.0.as_slice()) }),
        ScVal::String(s) => json!({ "string": s.0.to_utf8_string_lossy() }),
        ScVal::Symbol(s) => json!({ "symbol": s.0.to_utf8_string_lossy() }),
        ScVal::Address(address) => json!({ "address": address_string(address) }),
        ScVal::Vec(items) => {
            let items = items
                .as_ref()
                .map(|v| v.0.iter().map(from_scval).collect::<Result<Vec<_>>>())
                .transpose()?
                .unwrap_or_default();
            json!({ "vec": items })
        }
        ScVal::Map(entries) => {
            let entries = entries
                .as_ref()
                .map(|m| {
                    m.0.iter()
                        .map(|e| -> Result<Value> {
                            Ok(json!({ "key": from_scval(&e.key)?, "val": from_scval(&e.val)? }))
                        })
                        .collect::<Result<Vec<_>>>()
                })
                .transpose()?
                .unwrap_or_default();
            json!({ "map": entries })
        }
        other => {
            return Err(GatewayError::Decode(format!(
                "unsupported ScVal in contract output: {}",
                other.name()
            )))
        }
    })
}
