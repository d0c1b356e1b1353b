//! Codec Module
//!
//! Translates between typed values and byte ranges.
//!
//! ## Responsibilities
//! - Bounds-checked cursors over caller-owned buffers
//! - Fixed-width integers, always little-endian on the wire
//! - Length-prefixed strings (u16 length, then bytes)
//! - Self-describing tagged values (Nil, Int, Double, Str, Array)
//!
//! Decoders detect truncation without reading past the provided range;
//! encoders never allocate.

mod bytes;
mod value;

pub use bytes::{ByteReader, ByteWriter, MAX_STRING_LEN};
pub use value::{decode_value, encode_value, Value, ValueTag};
