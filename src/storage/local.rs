//! Filesystem-backed blob store.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::BlobStore;

/// Blob store rooted at a local directory
pub struct LocalStore {
    base_dir: PathBuf,
}

impl LocalStore {
    /// Create a store rooted at the given directory, creating it if needed
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir)
            .with_context(|| format!("Failed to create storage root {}", base_dir.display()))?;
        Ok(Self { base_dir })
    }

    fn full_path(&self, path: &str) -> PathBuf {
        self.base_dir.join(path)
    }
}

impl BlobStore for LocalStore {
    fn write(&self, path: &str, contents: &str) -> Result<()> {
        let full = self.full_path(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        std::fs::write(&full, contents)
            .with_context(|| format!("Failed to write {}", full.display()))?;
        Ok(())
    }

    fn read(&self, path: &str) -> Result<String> {
        let full = self.full_path(path);
        std::fs::read_to_string(&full).with_context(|| format!("Failed to read {}", full.display()))
    }

    fn exists(&self, path: &str) -> bool {
        self.full_path(path).exists()
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut paths: Vec<PathBuf> = Vec::new();
        let root = self.full_path(prefix);
        if !root.exists() {
            return Ok(Vec::new());
        }
        collect_files(&root, &mut paths)?;

        // Report paths relative to the store root, forward-slashed
        let mut keys = Vec::with_capacity(paths.len());
        for p in paths {
            let rel = p.strip_prefix(&self.base_dir).unwrap_or(&p);
            keys.push(rel.to_string_lossy().replace('\\', "/"));
        }
        keys.sort();
        Ok(keys)
    }
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("Failed to list directory {}", dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}
