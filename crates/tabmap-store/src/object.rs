//! Raw file bytes storage.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, StoreError};

/// Stores the raw bytes of uploaded files, addressed by key.
pub trait ObjectStore: Send + Sync {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<()>;

    /// Fetches an object; a missing key is an error, not an empty object.
    fn get(&self, key: &str) -> Result<Vec<u8>>;

    fn exists(&self, key: &str) -> bool;
}

/// Filesystem-backed object store rooted at one directory.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    base_dir: PathBuf,
}

impl LocalObjectStore {
    /// Opens a store at the given directory, creating it if needed.
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir).map_err(|source| StoreError::Io {
            path: base_dir.clone(),
            source,
        })?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(sanitize_key(key))
    }
}

impl ObjectStore for LocalObjectStore {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.object_path(key);
        fs::write(&path, bytes).map_err(|source| StoreError::Io { path, source })
    }

    fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.object_path(key);
        if !path.exists() {
            return Err(StoreError::ObjectNotFound(key.to_string()));
        }
        fs::read(&path).map_err(|source| StoreError::Io { path, source })
    }

    fn exists(&self, key: &str) -> bool {
        self.object_path(key).exists()
    }
}

/// Flattens a key into a single safe filename component.
fn sanitize_key(key: &str) -> String {
    key.trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn round_trips_bytes() {
        let dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(dir.path()).unwrap();
        store.put("upload-1.csv", b"a,b\n1,2\n").unwrap();
        assert!(store.exists("upload-1.csv"));
        assert_eq!(store.get("upload-1.csv").unwrap(), b"a,b\n1,2\n");
    }

    #[test]
    fn missing_key_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(dir.path()).unwrap();
        assert!(matches!(
            store.get("nope"),
            Err(StoreError::ObjectNotFound(_))
        ));
    }

    #[test]
    fn keys_cannot_escape_the_base_dir() {
        let dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(dir.path()).unwrap();
        store.put("../outside/evil.csv", b"x").unwrap();
        assert!(dir.path().join(".._outside_evil.csv").exists());
    }
}
