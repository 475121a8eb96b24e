//! Path-keyed blob storage.
//!
//! The crawler and transformer only ever talk to a [`BlobStore`]; whether
//! documents live on a local filesystem or in an object bucket is a
//! deployment detail. Paths are forward-slash keys relative to the store
//! root regardless of backend.

pub mod local;
pub mod memory;

pub use local::LocalStore;
pub use memory::MemoryStore;

use anyhow::Result;

/// Read/write/exists/list over path-keyed documents
pub trait BlobStore: Send + Sync {
    /// Write a document, creating intermediate directories as needed
    fn write(&self, path: &str, contents: &str) -> Result<()>;

    /// Read a document as a string
    fn read(&self, path: &str) -> Result<String>;

    /// Whether a document exists at the path
    fn exists(&self, path: &str) -> bool;

    /// List all document paths under a prefix
    fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

/// Write a value as pretty-printed JSON
pub fn write_json<T: serde::Serialize>(
    store: &dyn BlobStore,
    path: &str,
    value: &T,
) -> Result<()> {
    let contents = serde_json::to_string_pretty(value)?;
    store.write(path, &contents)
}

/// Read and decode a JSON document
pub fn read_json<T: serde::de::DeserializeOwned>(store: &dyn BlobStore, path: &str) -> Result<T> {
    let contents = store.read(path)?;
    Ok(serde_json::from_str(&contents)?)
}
