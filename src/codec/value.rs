//! Tagged value codec
//!
//! Self-describing values for the wire protocol. A value is a 1-byte tag
//! followed by the variant body; tag numbers are fixed on the wire.

use crate::error::{Result, StoreError};

use super::{ByteReader, ByteWriter, MAX_STRING_LEN};

/// Value tags (stable on the wire)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ValueTag {
    Nil = 0x00,
    Int = 0x01,
    Double = 0x02,
    Str = 0x03,
    Array = 0x04,
}

impl ValueTag {
    /// Decode a wire tag; `None` for any unrecognized byte
    pub fn from_u8(tag: u8) -> Option<ValueTag> {
        match tag {
            0x00 => Some(ValueTag::Nil),
            0x01 => Some(ValueTag::Int),
            0x02 => Some(ValueTag::Double),
            0x03 => Some(ValueTag::Str),
            0x04 => Some(ValueTag::Array),
            _ => None,
        }
    }
}

/// A decoded tagged value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,

    /// 64-bit signed integer
    Int(i64),

    /// IEEE 754 double, bitcast on the wire
    Double(f64),

    /// Opaque byte string, not necessarily UTF-8
    Str(Vec<u8>),

    Array(Vec<Value>),
}

impl Value {
    /// Get the wire tag for this variant
    pub fn tag(&self) -> ValueTag {
        match self {
            Value::Nil => ValueTag::Nil,
            Value::Int(_) => ValueTag::Int,
            Value::Double(_) => ValueTag::Double,
            Value::Str(_) => ValueTag::Str,
            Value::Array(_) => ValueTag::Array,
        }
    }
}

/// Encode a value: tag byte, then the variant body
pub fn encode_value(writer: &mut ByteWriter<'_>, value: &Value) -> Result<()> {
    writer.put_u8(value.tag() as u8)?;
    match value {
        Value::Nil => Ok(()),
        Value::Int(v) => writer.put_i64(*v),
        Value::Double(v) => writer.put_f64(*v),
        Value::Str(s) => writer.put_string(s),
        Value::Array(items) => {
            if items.len() > MAX_STRING_LEN {
                return Err(StoreError::StringTooLong);
            }
            writer.put_u16(items.len() as u16)?;
            for item in items {
                encode_value(writer, item)?;
            }
            Ok(())
        }
    }
}

/// Decode a value from the cursor, consuming exactly one encoded value
pub fn decode_value(reader: &mut ByteReader<'_>) -> Result<Value> {
    let raw = reader.get_u8()?;
    let tag = ValueTag::from_u8(raw).ok_or(StoreError::InvalidType(raw))?;
    match tag {
        ValueTag::Nil => Ok(Value::Nil),
        ValueTag::Int => Ok(Value::Int(reader.get_i64()?)),
        ValueTag::Double => Ok(Value::Double(reader.get_f64()?)),
        ValueTag::Str => Ok(Value::Str(reader.get_string()?.to_vec())),
        ValueTag::Array => {
            let count = reader.get_u16()? as usize;
            // every element is at least one tag byte, so the remaining input
            // bounds any honest count
            let mut items = Vec::with_capacity(count.min(reader.remaining()));
            for _ in 0..count {
                items.push(decode_value(reader)?);
            }
            Ok(Value::Array(items))
        }
    }
}
