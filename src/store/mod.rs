//! Store Module
//!
//! In-memory key/value storage backing the request handlers.
//!
//! ## Responsibilities
//! - Own the heap storage for every key and value
//! - Chained hash table with power-of-two bucket arrays
//! - Progressive rehash: growth cost is spread across operations instead of
//!   spiking on the insert that crosses the load threshold
//!
//! ## Data Structure Choice
//! Two chained hash tables plus a migration cursor. A standard library map
//! would rehash stop-the-world and lose the bounded per-operation latency,
//! so the table is hand-built on owned chain nodes.

mod map;
mod table;

pub use map::Store;
