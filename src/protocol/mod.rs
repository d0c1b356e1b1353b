//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
//!
//! ## Frame Format
//! ```text
//! ┌───────────────┬─────────────────────────────┐
//! │ Len (4, LE)   │        Payload              │
//! └───────────────┴─────────────────────────────┘
//! ```
//! `Len` is at most 4096; oversized frames are protocol errors.
//!
//! ## Payload Format
//! ```text
//! ┌──────────┬──────────────────────────────────┐
//! │ Cmd (1)  │        Variant body              │
//! └──────────┴──────────────────────────────────┘
//! ```
//!
//! ### Commands
//! - 0x01: GET    - body: key
//! - 0x02: SET    - body: key + value
//! - 0x03: DELETE - body: key
//! - 0x04: LIST   - body: empty
//! - any other first byte is carried through as an Unknown request and the
//!   payload is echoed back verbatim
//!
//! Strings on the wire are `[len:u16 LE][bytes]`. A GET response omits the
//! value field entirely when the key is absent; the outer frame length is
//! what delimits every variant body.

mod codec;
mod command;
mod response;

pub use codec::{
    decode_request, decode_response, encode_request, encode_response, encode_response_framed,
    read_frame, read_response, write_frame, write_request, HEADER_SIZE, MAX_MSG,
};
pub use command::{CommandType, Request};
pub use response::Response;
