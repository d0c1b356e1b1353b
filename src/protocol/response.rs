//! Response definitions
//!
//! Represents replies to clients. Each variant mirrors the request that
//! produced it.

/// A response to send to a client
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Key plus its value; `None` means the key is absent, encoded by
    /// omitting the value field from the body
    Get {
        key: Vec<u8>,
        value: Option<Vec<u8>>,
    },

    /// Key and the value as stored after the write
    Set { key: Vec<u8>, value: Vec<u8> },

    /// Echo of the deleted key; deleting a missing key still replies this
    Delete { key: Vec<u8> },

    /// Every stored pair, in map iteration order
    List { entries: Vec<(Vec<u8>, Vec<u8>)> },

    /// Raw bytes echoed or a short failure reason
    Unknown { raw: Vec<u8> },
}

impl Response {
    /// Reply for a request whose body failed to decode
    pub fn invalid_request() -> Response {
        Response::Unknown {
            raw: b"Invalid request".to_vec(),
        }
    }

    /// Reply for a response that cannot fit the connection write buffer
    pub fn too_large() -> Response {
        Response::Unknown {
            raw: b"Response too large".to_vec(),
        }
    }
}
