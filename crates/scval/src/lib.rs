//! Soroban `ScVal` decoding
//!
//! Contract events arrive from the RPC as base64 XDR strings. This crate turns
//! them into [`NativeValue`]s for storage and display. Decoding is best-effort:
//! [`decode_or_raw`] never fails and hands back the original string when the
//! input is malformed or of an unsupported type.

mod decode;
mod native;

pub use decode::{DecodeError, decode, decode_or_raw, to_native};
pub use native::NativeValue;

// Re-export the XDR types so callers can build fixtures without a direct dependency
pub use stellar_xdr::curr as xdr;
