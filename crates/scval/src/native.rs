use serde::{Serialize, Serializer};
use std::fmt;

/// Native representation of a decoded `ScVal`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeValue {
    Null,
    Bool(bool),
    /// Any integer that fits in an `i128`
    Int(i128),
    /// Decimal text of integers wider than `i128` (large u128 and 256-bit values)
    BigInt(String),
    String(String),
    Bytes(Vec<u8>),
    /// Strkey form (`G...` for accounts, `C...` for contracts)
    Address(String),
    List(Vec<NativeValue>),
    Map(Vec<(NativeValue, NativeValue)>),
}

impl NativeValue {
    /// Convert to JSON for API responses.
    ///
    /// Integers outside the i64/u64 range and big integers become JSON strings,
    /// bytes are lowercase hex and map keys use the text form of the key.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            NativeValue::Null => serde_json::Value::Null,
            NativeValue::Bool(b) => serde_json::Value::Bool(*b),
            NativeValue::Int(i) => {
                if let Ok(v) = i64::try_from(*i) {
                    serde_json::Value::from(v)
                } else if let Ok(v) = u64::try_from(*i) {
                    serde_json::Value::from(v)
                } else {
                    serde_json::Value::String(i.to_string())
                }
            }
            NativeValue::BigInt(s) => serde_json::Value::String(s.clone()),
            NativeValue::String(s) | NativeValue::Address(s) => serde_json::Value::String(s.clone()),
            NativeValue::Bytes(b) => serde_json::Value::String(hex::encode(b)),
            NativeValue::List(items) => {
                serde_json::Value::Array(items.iter().map(NativeValue::to_json).collect())
            }
            NativeValue::Map(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

/// Text form used for the `value` column in decoded mode
impl fmt::Display for NativeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeValue::Null => f.write_str("null"),
            NativeValue::Bool(b) => write!(f, "{}", b),
            NativeValue::Int(i) => write!(f, "{}", i),
            NativeValue::BigInt(s) | NativeValue::String(s) | NativeValue::Address(s) => {
                f.write_str(s)
            }
            NativeValue::Bytes(b) => f.write_str(&hex::encode(b)),
            NativeValue::List(_) | NativeValue::Map(_) => write!(f, "{}", self.to_json()),
        }
    }
}

impl Serialize for NativeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<&str> for NativeValue {
    fn from(s: &str) -> Self {
        NativeValue::String(s.to_string())
    }
}
