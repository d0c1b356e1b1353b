//! Network Module
//!
//! Non-blocking TCP front end.
//!
//! ## Architecture
//! - Single-threaded readiness loop (mio poll)
//! - Per-connection REQ/RES state machine over fixed buffers
//! - Requests routed through the Engine

mod connection;
mod server;

pub use connection::{ConnMode, Connection, PipeStream, Stream, BUF_CAPACITY};
pub use server::Server;
