//! Key-Value Persistence
//!
//! Persisted state talks to storage only through [`KeyValueStore`]: string
//! keys, string values, one key at a time. Stores are shared and externally
//! owned. Another process (or another instance) may write the same key at
//! any moment, so callers re-read instead of caching what they saw.
//!
//! Values are produced by a [`Codec`]; JSON is the default.

mod codec;
mod file;
mod memory;

use thiserror::Error;

pub use codec::{Codec, CodecError, JsonCodec, MsgPackCodec};
pub use file::FileStore;
pub use memory::MemoryStore;

/// Errors raised by a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failed for key {key:?}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("store is read-only")]
    ReadOnly,

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// String-keyed, string-valued external store.
///
/// No atomicity is assumed across keys.
pub trait KeyValueStore: Send + Sync {
    /// Read a key. A missing key is `Ok(None)`, not an error.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a key, replacing any previous value.
    fn set(&self, key: &str, value: String) -> Result<(), StoreError>;

    /// Delete a key. Deleting a missing key succeeds.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}
