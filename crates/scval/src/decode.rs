use primitive_types::U256;
use stellar_xdr::curr::{Limits, ReadXdr, ScVal};
use thiserror::Error;
use tracing::debug;

use crate::native::NativeValue;

/// Maximum nesting depth accepted when reading XDR
const MAX_XDR_DEPTH: u32 = 256;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Invalid XDR: {0}")]
    Xdr(#[from] stellar_xdr::curr::Error),

    #[error("Unsupported ScVal type: {0}")]
    Unsupported(&'static str),
}

/// Decode a base64 XDR `ScVal` into its native value
pub fn decode(xdr: &str) -> Result<NativeValue, DecodeError> {
    let val = ScVal::from_xdr_base64(xdr.trim(), Limits::depth(MAX_XDR_DEPTH))?;
    to_native(&val)
}

/// Decode a base64 XDR `ScVal`, falling back to the original string on any error
pub fn decode_or_raw(xdr: &str) -> NativeValue {
    match decode(xdr) {
        Ok(value) => value,
        Err(e) => {
            debug!("Keeping raw value {:?}: {}", xdr, e);
            NativeValue::String(xdr.to_string())
        }
    }
}

/// Convert an already parsed `ScVal` to its native value
pub fn to_native(val: &ScVal) -> Result<NativeValue, DecodeError> {
    let native = match val {
        ScVal::Bool(b) => NativeValue::Bool(*b),
        ScVal::Void => NativeValue::Null,
        ScVal::U32(v) => NativeValue::Int(i128::from(*v)),
        ScVal::I32(v) => NativeValue::Int(i128::from(*v)),
        ScVal::U64(v) => NativeValue::Int(i128::from(*v)),
        ScVal::I64(v) => NativeValue::Int(i128::from(*v)),
        ScVal::Timepoint(t) => NativeValue::Int(i128::from(t.0)),
        ScVal::Duration(d) => NativeValue::Int(i128::from(d.0)),
        ScVal::U128(parts) => {
            let v = (u128::from(parts.hi) << 64) | u128::from(parts.lo);
            match i128::try_from(v) {
                Ok(i) => NativeValue::Int(i),
                Err(_) => NativeValue::BigInt(v.to_string()),
            }
        }
        ScVal::I128(parts) => NativeValue::Int((i128::from(parts.hi) << 64) | i128::from(parts.lo)),
        ScVal::U256(parts) => {
            unsigned_256(U256([parts.lo_lo, parts.lo_hi, parts.hi_lo, parts.hi_hi]))
        }
        ScVal::I256(parts) => {
            let raw = U256([parts.lo_lo, parts.lo_hi, parts.hi_lo, parts.hi_hi as u64]);
            if parts.hi_hi < 0 {
                // two's complement magnitude
                let magnitude = (!raw).overflowing_add(U256::one()).0;
                if magnitude.bits() <= 127 {
                    NativeValue::Int(-(magnitude.low_u128() as i128))
                } else {
                    NativeValue::BigInt(format!("-{}", magnitude))
                }
            } else {
                unsigned_256(raw)
            }
        }
        ScVal::Bytes(b) => NativeValue::Bytes(b.0.as_slice().to_vec()),
        ScVal::String(s) => NativeValue::String(String::from_utf8_lossy(s.0.as_slice()).into_owned()),
        ScVal::Symbol(s) => NativeValue::String(String::from_utf8_lossy(s.0.as_slice()).into_owned()),
        ScVal::Vec(Some(items)) => NativeValue::List(
            items
                .0
                .iter()
                .map(to_native)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        ScVal::Vec(None) => NativeValue::List(Vec::new()),
        ScVal::Map(Some(entries)) => NativeValue::Map(
            entries
                .0
                .iter()
                .map(|entry| Ok((to_native(&entry.key)?, to_native(&entry.val)?)))
                .collect::<Result<Vec<_>, DecodeError>>()?,
        ),
        ScVal::Map(None) => NativeValue::Map(Vec::new()),
        ScVal::Address(address) => NativeValue::Address(address.to_string()),
        other => return Err(DecodeError::Unsupported(other.name())),
    };
    Ok(native)
}

fn unsigned_256(v: U256) -> NativeValue {
    if v.bits() <= 127 {
        NativeValue::Int(v.low_u128() as i128)
    } else {
        NativeValue::BigInt(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stellar_xdr::curr::{
        Int128Parts, Int256Parts, ScBytes, ScMap, ScMapEntry, ScSymbol, ScVec, UInt256Parts,
        WriteXdr,
    };

    fn encode(val: ScVal) -> String {
        val.to_xdr_base64(Limits::none()).unwrap()
    }

    fn symbol(s: &str) -> ScVal {
        ScVal::Symbol(ScSymbol(s.try_into().unwrap()))
    }

    #[test]
    fn test_decode_known_fixtures() {
        assert_eq!(decode("AAAABAAAJxA=").unwrap(), NativeValue::Int(10_000));
        assert_eq!(decode("AAAABAAAE4g=").unwrap(), NativeValue::Int(5_000));
        assert_eq!(
            decode("AAAADwAAAAh0cmFuc2Zlcg==").unwrap(),
            NativeValue::from("transfer")
        );
        assert_eq!(
            decode("AAAAEgAAAAAAAAAAP4aG3RBmnO85da+8tCofnE+D6D0hWzMe1bWQm1I2auc=").unwrap(),
            NativeValue::Address(
                "GA7YNBW5CBTJZ3ZZOWX3ZNBKD6OE7A7IHUQVWMY62W2ZBG2SGZVOOPVH".to_string()
            )
        );
    }

    #[test]
    fn test_decode_is_deterministic() {
        let xdr = encode(ScVal::Vec(Some(ScVec(
            vec![symbol("commit"), ScVal::U32(7), ScVal::Bool(false)]
                .try_into()
                .unwrap(),
        ))));
        let first = decode(&xdr).unwrap();
        let second = decode(&xdr).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            first,
            NativeValue::List(vec![
                NativeValue::from("commit"),
                NativeValue::Int(7),
                NativeValue::Bool(false),
            ])
        );
    }

    #[test]
    fn test_bytes_render_as_hex() {
        let key = vec![0x37, 0xae, 0x83, 0xc0];
        let xdr = encode(ScVal::Bytes(ScBytes(key.clone().try_into().unwrap())));
        let value = decode(&xdr).unwrap();
        assert_eq!(value, NativeValue::Bytes(key));
        assert_eq!(value.to_string(), "37ae83c0");
    }

    #[test]
    fn test_map_and_void() {
        let xdr = encode(ScVal::Map(Some(ScMap(
            vec![ScMapEntry {
                key: symbol("paused"),
                val: ScVal::Void,
            }]
            .try_into()
            .unwrap(),
        ))));
        assert_eq!(
            decode(&xdr).unwrap(),
            NativeValue::Map(vec![(NativeValue::from("paused"), NativeValue::Null)])
        );
    }

    #[test]
    fn test_wide_integers() {
        let negative = encode(ScVal::I128(Int128Parts {
            hi: -1,
            lo: u64::MAX - 4,
        }));
        assert_eq!(decode(&negative).unwrap(), NativeValue::Int(-5));

        let big = encode(ScVal::U256(UInt256Parts {
            hi_hi: 1,
            hi_lo: 0,
            lo_hi: 0,
            lo_lo: 0,
        }));
        assert_eq!(
            decode(&big).unwrap(),
            NativeValue::BigInt(
                "6277101735386680763835789423207666416102355444464034512896".to_string()
            )
        );

        let minus_one = encode(ScVal::I256(Int256Parts {
            hi_hi: -1,
            hi_lo: u64::MAX,
            lo_hi: u64::MAX,
            lo_lo: u64::MAX,
        }));
        assert_eq!(decode(&minus_one).unwrap(), NativeValue::Int(-1));
    }

    #[test]
    fn test_malformed_input_falls_back_to_raw() {
        for raw in ["v1", "04cea5e23c7c50ae3dc304218314f21e7164c9d2", "", "not base64!"] {
            assert!(decode(raw).is_err());
            assert_eq!(decode_or_raw(raw), NativeValue::String(raw.to_string()));
        }
    }

    #[test]
    fn test_unsupported_type_falls_back_to_raw() {
        let xdr = encode(ScVal::LedgerKeyContractInstance);
        assert!(matches!(decode(&xdr), Err(DecodeError::Unsupported(_))));
        assert_eq!(decode_or_raw(&xdr), NativeValue::String(xdr.clone()));
    }
}
