//! Chain-supplied parameter and return values.
//!
//! Call parameters arrive from several sources (ABI-decoded calldata, JSON
//! produced by an external message parser, hand-built test fixtures) and do
//! not agree on how numbers are represented. `ParamValue` keeps whatever
//! shape was supplied and offers lenient accessors on top of it.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Named parameters in declaration order.
pub type Params = IndexMap<String, ParamValue>;

/// A decoded parameter or return value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ParamValue {
    Uint(u128),
    /// Unsigned integers wider than u128, as a decimal string.
    BigUint(String),
    Int(i128),
    /// Signed integers wider than i128, as a decimal string.
    BigInt(String),
    Bool(bool),
    Bytes(Vec<u8>),
    Str(String),
    /// 20-byte EVM address, `0x`-prefixed hex.
    Address(String),
    Array(Vec<ParamValue>),
    /// Tuple / struct. Unnamed members get positional names ("0", "1", ...).
    Tuple(Vec<(String, ParamValue)>),
    Null,
}

impl ParamValue {
    /// Returns `true` if this value is logically absent.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short type label used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Uint(_) | Self::BigUint(_) => "uint",
            Self::Int(_) | Self::BigInt(_) => "int",
            Self::Bool(_) => "bool",
            Self::Bytes(_) => "bytes",
            Self::Str(_) => "string",
            Self::Address(_) => "address",
            Self::Array(_) => "array",
            Self::Tuple(_) => "tuple",
            Self::Null => "null",
        }
    }

    /// Coerce to u128. Accepts integer variants and decimal or `0x` hex strings.
    pub fn as_u128(&self) -> Option<u128> {
        match self {
            Self::Uint(v) => Some(*v),
            Self::Int(v) => u128::try_from(*v).ok(),
            Self::BigUint(s) | Self::Str(s) => parse_uint(s),
            _ => None,
        }
    }

    /// Coerce to u64 (see [`ParamValue::as_u128`]).
    pub fn as_u64(&self) -> Option<u64> {
        self.as_u128().and_then(|v| u64::try_from(v).ok())
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Uint(0) => Some(false),
            Self::Uint(1) => Some(true),
            _ => None,
        }
    }

    /// Borrow the inner text of a string or address value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) | Self::Address(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Render strings, addresses and byte values as text (`0x…` hex for bytes).
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::Str(s) | Self::Address(s) => Some(s.clone()),
            Self::Bytes(b) => Some(format!("0x{}", hex::encode(b))),
            _ => None,
        }
    }

    /// Elements of an array, or the members of a tuple in order.
    pub fn elements(&self) -> Option<Vec<&ParamValue>> {
        match self {
            Self::Array(items) => Some(items.iter().collect()),
            Self::Tuple(fields) => Some(fields.iter().map(|(_, v)| v).collect()),
            _ => None,
        }
    }

    /// Look up a named tuple member.
    pub fn field(&self, name: &str) -> Option<&ParamValue> {
        match self {
            Self::Tuple(fields) => fields.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }
}

fn parse_uint(s: &str) -> Option<u128> {
    let s = s.trim();
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u128::from_str_radix(hex, 16).ok(),
        None => s.parse().ok(),
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uint(v) => write!(f, "{v}"),
            Self::BigUint(v) | Self::BigInt(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Bytes(b) => write!(f, "0x{}", hex::encode(b)),
            Self::Str(s) | Self::Address(s) => write!(f, "{s}"),
            Self::Array(v) => {
                let parts: Vec<_> = v.iter().map(|x| x.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Self::Tuple(fields) => {
                let parts: Vec<_> = fields.iter().map(|(k, v)| format!("{k}: {v}")).collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
            Self::Null => write!(f, "null"),
        }
    }
}

// ─── Conversions ──────────────────────────────────────────────────────────────

impl From<u64> for ParamValue {
    fn from(v: u64) -> Self {
        Self::Uint(v.into())
    }
}

impl From<u128> for ParamValue {
    fn from(v: u128) -> Self {
        Self::Uint(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl<T: Into<ParamValue>> From<Vec<T>> for ParamValue {
    fn from(items: Vec<T>) -> Self {
        Self::Array(items.into_iter().map(Into::into).collect())
    }
}

/// Lenient conversion from JSON produced by an external message parser.
impl From<serde_json::Value> for ParamValue {
    fn from(v: serde_json::Value) -> Self {
        use serde_json::Value;
        match v {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => {
                if let Some(u) = n.as_u64() {
                    Self::Uint(u.into())
                } else if let Some(i) = n.as_i64() {
                    Self::Int(i.into())
                } else {
                    Self::Str(n.to_string())
                }
            }
            Value::String(s) => Self::Str(s),
            Value::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => {
                Self::Tuple(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}
