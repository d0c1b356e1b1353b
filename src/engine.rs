//! Engine Module
//!
//! Applies decoded requests to the store and builds the matching response.
//!
//! ## Responsibilities
//! - One handler per command
//! - Every outcome is a well-formed response; failures never escape past
//!   the connection boundary
//! - Copy store data into the response before returning, so encoding never
//!   races a later store mutation

use crate::protocol::{Request, Response};
use crate::store::Store;

/// Executes requests against the key/value store
pub struct Engine {
    store: Store,
}

impl Engine {
    pub fn new() -> Engine {
        Engine {
            store: Store::new(),
        }
    }

    /// Apply one request and build its response
    pub fn execute(&mut self, request: Request) -> Response {
        match request {
            Request::Get { key } => self.get(key),
            Request::Set { key, value } => self.set(key, value),
            Request::Delete { key } => self.delete(key),
            Request::List => self.list(),
            // unrecognized commands echo their payload verbatim
            Request::Unknown { raw } => Response::Unknown { raw },
        }
    }

    /// Read access to the underlying store
    pub fn store(&self) -> &Store {
        &self.store
    }

    fn get(&mut self, key: Vec<u8>) -> Response {
        let value = self.store.get(&key).map(<[u8]>::to_vec);
        Response::Get { key, value }
    }

    fn set(&mut self, key: Vec<u8>, value: Vec<u8>) -> Response {
        self.store.put(&key, &value);
        Response::Set { key, value }
    }

    fn delete(&mut self, key: Vec<u8>) -> Response {
        // idempotent: deleting a missing key still succeeds
        self.store.remove(&key);
        Response::Delete { key }
    }

    fn list(&mut self) -> Response {
        let entries = self
            .store
            .iter()
            .map(|(k, v)| (k.to_vec(), v.to_vec()))
            .collect();
        Response::List { entries }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
