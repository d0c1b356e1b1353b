//! # Lodestone
//!
//! A single-node, in-memory key-value store with:
//! - Length-prefixed binary request/response protocol
//! - Single-threaded, readiness-driven event loop
//! - Progressive-rehash hash table with bounded per-operation latency
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Event Loop (mio)                         │
//! │               (listener + client sockets)                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ readiness
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                Connection State Machine                      │
//! │              (REQ / RES / END, fixed buffers)                │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ framed payloads
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  Protocol   │          │   Engine    │
//!   │  (codec)    │─────────▶│ (handlers)  │
//!   └─────────────┘          └──────┬──────┘
//!                                   │
//!                                   ▼
//!                           ┌─────────────┐
//!                           │    Store    │
//!                           │ (two-table  │
//!                           │   rehash)   │
//!                           └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod codec;
pub mod protocol;
pub mod store;
pub mod engine;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::Config;
pub use engine::Engine;
pub use error::{Result, StoreError};
pub use network::Server;
pub use store::Store;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of Lodestone
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
