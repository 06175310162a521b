//! Key-value snapshot store.
//!
//! One strategy run owns one namespace; each key holds one JSON document.
//! `FileStore` writes a temp file and renames it into place so readers
//! never observe a half-written snapshot. `MemoryStore` backs tests.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::error::PersistenceResult;

/// Raw string-valued key-value store, object-safe.
pub trait SnapshotStore: Send + Sync {
    fn put(&self, namespace: &str, key: &str, value: &str) -> PersistenceResult<()>;

    fn get(&self, namespace: &str, key: &str) -> PersistenceResult<Option<String>>;

    fn delete(&self, namespace: &str, key: &str) -> PersistenceResult<()>;

    fn keys(&self, namespace: &str) -> PersistenceResult<Vec<String>>;
}

/// Typed JSON helpers over any [`SnapshotStore`].
pub trait SnapshotStoreExt: SnapshotStore {
    fn put_json<T: Serialize>(
        &self,
        namespace: &str,
        key: &str,
        value: &T,
    ) -> PersistenceResult<()> {
        let json = serde_json::to_string(value)?;
        self.put(namespace, key, &json)
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        namespace: &str,
        key: &str,
    ) -> PersistenceResult<Option<T>> {
        match self.get(namespace, key)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}

impl<S: SnapshotStore + ?Sized> SnapshotStoreExt for S {}

/// Keep namespaces and keys to a single path component.
fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '.' => '_',
            c => c,
        })
        .collect()
}

/// File-per-key JSON store under a root directory.
///
/// Layout: `{root}/{namespace}/{key}.json`. Writes go to a `.tmp` sibling
/// first and are renamed into place; rename is atomic on one filesystem.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        if let Err(e) = fs::create_dir_all(&root) {
            warn!(?e, root = %root.display(), "Failed to create store root");
        }
        Self { root }
    }

    fn namespace_dir(&self, namespace: &str) -> PathBuf {
        self.root.join(sanitize(namespace))
    }

    fn key_path(&self, namespace: &str, key: &str) -> PathBuf {
        self.namespace_dir(namespace)
            .join(format!("{}.json", sanitize(key)))
    }

    fn write_atomic(path: &Path, value: &str) -> PersistenceResult<()> {
        let tmp = path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

impl SnapshotStore for FileStore {
    fn put(&self, namespace: &str, key: &str, value: &str) -> PersistenceResult<()> {
        let dir = self.namespace_dir(namespace);
        fs::create_dir_all(&dir)?;
        Self::write_atomic(&self.key_path(namespace, key), value)
    }

    fn get(&self, namespace: &str, key: &str) -> PersistenceResult<Option<String>> {
        match fs::read_to_string(self.key_path(namespace, key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&self, namespace: &str, key: &str) -> PersistenceResult<()> {
        match fs::remove_file(self.key_path(namespace, key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn keys(&self, namespace: &str) -> PersistenceResult<Vec<String>> {
        let dir = self.namespace_dir(namespace);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut keys = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    keys.push(stem.to_string());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// In-memory store for tests.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemoryStore {
    fn put(&self, namespace: &str, key: &str, value: &str) -> PersistenceResult<()> {
        self.entries
            .write()
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, namespace: &str, key: &str) -> PersistenceResult<Option<String>> {
        Ok(self
            .entries
            .read()
            .get(namespace)
            .and_then(|ns| ns.get(key))
            .cloned())
    }

    fn delete(&self, namespace: &str, key: &str) -> PersistenceResult<()> {
        if let Some(ns) = self.entries.write().get_mut(namespace) {
            ns.remove(key);
        }
        Ok(())
    }

    fn keys(&self, namespace: &str) -> PersistenceResult<Vec<String>> {
        let mut keys: Vec<String> = self
            .entries
            .read()
            .get(namespace)
            .map(|ns| ns.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Doc {
        a: u32,
        b: String,
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());

        assert_eq!(store.get("ns", "progress").unwrap(), None);

        let doc = Doc {
            a: 7,
            b: "x".to_string(),
        };
        store.put_json("ns", "progress", &doc).unwrap();

        let loaded: Doc = store.get_json("ns", "progress").unwrap().unwrap();
        assert_eq!(loaded, doc);
        assert_eq!(store.keys("ns").unwrap(), vec!["progress".to_string()]);
    }

    #[test]
    fn test_file_store_overwrite_and_delete() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());

        store.put("ns", "k", "1").unwrap();
        store.put("ns", "k", "2").unwrap();
        assert_eq!(store.get("ns", "k").unwrap().as_deref(), Some("2"));

        store.delete("ns", "k").unwrap();
        assert_eq!(store.get("ns", "k").unwrap(), None);
        // Deleting a missing key is not an error.
        store.delete("ns", "k").unwrap();
    }

    #[test]
    fn test_file_store_no_tmp_left_behind() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        store.put("ns", "k", "payload").unwrap();

        let files: Vec<_> = std::fs::read_dir(dir.path().join("ns"))
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(files, vec!["k.json".to_string()]);
    }

    #[test]
    fn test_namespace_sanitized() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        store.put("acct/BTC:USDT", "k", "v").unwrap();
        assert_eq!(
            store.get("acct/BTC:USDT", "k").unwrap().as_deref(),
            Some("v")
        );
        assert!(dir.path().join("acct_BTC_USDT").exists());
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        store.put("ns", "a", "1").unwrap();
        store.put("ns", "b", "2").unwrap();

        assert_eq!(store.get("ns", "a").unwrap().as_deref(), Some("1"));
        assert_eq!(store.get("other", "a").unwrap(), None);
        assert_eq!(
            store.keys("ns").unwrap(),
            vec!["a".to_string(), "b".to_string()]
        );

        store.delete("ns", "a").unwrap();
        assert_eq!(store.get("ns", "a").unwrap(), None);
    }
}
