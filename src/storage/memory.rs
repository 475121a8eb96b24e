//! In-memory blob store, used in tests.

use anyhow::{Result, anyhow};
use std::collections::BTreeMap;
use std::sync::Mutex;

use super::BlobStore;

/// Blob store backed by an in-memory map
#[derive(Default)]
pub struct MemoryStore {
    docs: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents
    pub fn len(&self) -> usize {
        self.docs.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop a document, for simulating partial crawls
    pub fn remove(&self, path: &str) {
        self.docs.lock().unwrap().remove(path);
    }
}

impl BlobStore for MemoryStore {
    fn write(&self, path: &str, contents: &str) -> Result<()> {
        self.docs
            .lock()
            .unwrap()
            .insert(path.to_string(), contents.to_string());
        Ok(())
    }

    fn read(&self, path: &str) -> Result<String> {
        self.docs
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow!("No document at {}", path))
    }

    fn exists(&self, path: &str) -> bool {
        self.docs.lock().unwrap().contains_key(path)
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let with_slash = format!("{}/", prefix.trim_end_matches('/'));
        Ok(self
            .docs
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with(&with_slash))
            .cloned()
            .collect())
    }
}
