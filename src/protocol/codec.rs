//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Frame
//! ```text
//! ┌───────────────┬─────────────────────────────┐
//! │ Len (4, LE)   │     Payload (Len bytes)     │
//! └───────────────┴─────────────────────────────┘
//! ```
//!
//! ### Request payload by command
//! - GET/DELETE: `[cmd:u8][key:string]`
//! - SET:        `[cmd:u8][key:string][value:string]`
//! - LIST:       `[cmd:u8]`
//!
//! ### Response payload by command
//! - GET:    `[cmd:u8][key:string]` then optionally `[value:string]`;
//!   an absent value field means the key does not exist
//! - SET:    `[cmd:u8][key:string][value:string]`
//! - DELETE: `[cmd:u8][key:string]`
//! - LIST:   `[cmd:u8]` then `[key:string][value:string]` pairs to the end
//!   of the payload, no explicit count
//! - Unknown requests and failure replies are raw payloads with no tag
//!
//! Every variant decoder reads to the end of the payload; the outer frame
//! length is the only delimiter.

use std::io::{Read, Write};

use crate::codec::{ByteReader, ByteWriter};
use crate::error::{Result, StoreError};

use super::{CommandType, Request, Response};

/// Frame header size: 4-byte little-endian payload length
pub const HEADER_SIZE: usize = 4;

/// Maximum payload size per frame
pub const MAX_MSG: usize = 4096;

// =============================================================================
// Request Encoding/Decoding
// =============================================================================

/// Encode a request payload (no frame header) into the writer
pub fn encode_request(writer: &mut ByteWriter<'_>, request: &Request) -> Result<()> {
    match request {
        Request::Get { key } => {
            writer.put_u8(CommandType::Get as u8)?;
            writer.put_string(key)
        }
        Request::Set { key, value } => {
            writer.put_u8(CommandType::Set as u8)?;
            writer.put_string(key)?;
            writer.put_string(value)
        }
        Request::Delete { key } => {
            writer.put_u8(CommandType::Delete as u8)?;
            writer.put_string(key)
        }
        Request::List => writer.put_u8(CommandType::List as u8),
        Request::Unknown { raw } => writer.put_bytes(raw),
    }
}

/// Decode a request payload.
///
/// An unrecognized first byte (or an empty payload) is not an error: the
/// whole payload is carried through as an `Unknown` request so the handler
/// can echo it. A recognized command with a truncated body fails, and the
/// caller maps that to an "Invalid request" reply.
pub fn decode_request(payload: &[u8]) -> Result<Request> {
    let mut reader = ByteReader::new(payload);
    let tag = reader.get_u8().ok().and_then(CommandType::from_u8);
    match tag {
        Some(CommandType::Get) => Ok(Request::Get {
            key: reader.get_string()?.to_vec(),
        }),
        Some(CommandType::Set) => {
            let key = reader.get_string()?.to_vec();
            let value = reader.get_string()?.to_vec();
            Ok(Request::Set { key, value })
        }
        Some(CommandType::Delete) => Ok(Request::Delete {
            key: reader.get_string()?.to_vec(),
        }),
        Some(CommandType::List) => Ok(Request::List),
        Some(CommandType::Unknown) | None => Ok(Request::Unknown {
            raw: payload.to_vec(),
        }),
    }
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response payload (no frame header) into the writer
pub fn encode_response(writer: &mut ByteWriter<'_>, response: &Response) -> Result<()> {
    match response {
        Response::Get { key, value } => {
            writer.put_u8(CommandType::Get as u8)?;
            writer.put_string(key)?;
            if let Some(value) = value {
                writer.put_string(value)?;
            }
            Ok(())
        }
        Response::Set { key, value } => {
            writer.put_u8(CommandType::Set as u8)?;
            writer.put_string(key)?;
            writer.put_string(value)
        }
        Response::Delete { key } => {
            writer.put_u8(CommandType::Delete as u8)?;
            writer.put_string(key)
        }
        Response::List { entries } => {
            writer.put_u8(CommandType::List as u8)?;
            for (key, value) in entries {
                writer.put_string(key)?;
                writer.put_string(value)?;
            }
            Ok(())
        }
        Response::Unknown { raw } => writer.put_bytes(raw),
    }
}

/// Decode a response payload.
///
/// Mirrors `decode_request`: an unrecognized first byte yields an `Unknown`
/// response carrying the whole payload.
pub fn decode_response(payload: &[u8]) -> Result<Response> {
    let mut reader = ByteReader::new(payload);
    let tag = reader.get_u8().ok().and_then(CommandType::from_u8);
    match tag {
        Some(CommandType::Get) => {
            let key = reader.get_string()?.to_vec();
            let value = if reader.is_empty() {
                None
            } else {
                Some(reader.get_string()?.to_vec())
            };
            Ok(Response::Get { key, value })
        }
        Some(CommandType::Set) => {
            let key = reader.get_string()?.to_vec();
            let value = reader.get_string()?.to_vec();
            Ok(Response::Set { key, value })
        }
        Some(CommandType::Delete) => Ok(Response::Delete {
            key: reader.get_string()?.to_vec(),
        }),
        Some(CommandType::List) => {
            let mut entries = Vec::new();
            while !reader.is_empty() {
                let key = reader.get_string()?.to_vec();
                let value = reader.get_string()?.to_vec();
                entries.push((key, value));
            }
            Ok(Response::List { entries })
        }
        Some(CommandType::Unknown) | None => Ok(Response::Unknown {
            raw: payload.to_vec(),
        }),
    }
}

/// Encode a response with its frame header into `buf`.
///
/// Returns the total frame length (header plus payload). Fails
/// `BufferTooSmall` when the response does not fit.
pub fn encode_response_framed(buf: &mut [u8], response: &Response) -> Result<usize> {
    if buf.len() < HEADER_SIZE {
        return Err(StoreError::BufferTooSmall);
    }
    let (header, body) = buf.split_at_mut(HEADER_SIZE);
    let mut writer = ByteWriter::new(body);
    encode_response(&mut writer, response)?;
    let payload_len = writer.written();
    header.copy_from_slice(&(payload_len as u32).to_le_bytes());
    Ok(HEADER_SIZE + payload_len)
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Write a framed payload to a blocking stream
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<()> {
    if payload.len() > MAX_MSG {
        return Err(StoreError::MessageTooLong(payload.len()));
    }
    writer.write_all(&(payload.len() as u32).to_le_bytes())?;
    writer.write_all(payload)?;
    writer.flush()?;
    Ok(())
}

/// Read one framed payload from a blocking stream.
///
/// Reads the 4-byte header first, rejects oversized declarations, then reads
/// exactly the declared number of payload bytes.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;
    let len = u32::from_le_bytes(header) as usize;
    if len > MAX_MSG {
        return Err(StoreError::MessageTooLong(len));
    }
    let mut payload = vec![0u8; len];
    if len > 0 {
        reader.read_exact(&mut payload)?;
    }
    Ok(payload)
}

/// Encode and frame a request onto a blocking stream
pub fn write_request<W: Write>(writer: &mut W, request: &Request) -> Result<()> {
    let mut buf = [0u8; MAX_MSG];
    let mut payload = ByteWriter::new(&mut buf);
    encode_request(&mut payload, request)?;
    let len = payload.written();
    write_frame(writer, &buf[..len])
}

/// Read and decode one framed response from a blocking stream
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    let payload = read_frame(reader)?;
    decode_response(&payload)
}
