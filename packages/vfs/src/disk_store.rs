//! Disk-backed store.
//!
//! Maps each mount root to a subdirectory of a base directory and persists
//! file snapshots there with `tokio::fs`. This is the durable medium for
//! native hosts, filling the role a browser-local database plays for a
//! page-embedded host.
//!
//! Push is write-over only: files deleted from the in-memory filesystem
//! since the last sync are left behind on disk, matching the one-way
//! best-effort posture of the sync protocol.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StoreError;
use crate::store::{BackingStore, FileEntry};

/// Durable backing store rooted at a local directory.
pub struct DiskStore {
    base: PathBuf,
}

impl DiskStore {
    /// Create a store over `base`. The directory itself is created lazily
    /// when the first mount root is opened.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Directory holding the persisted tree for a mount root.
    fn root_dir(&self, root: &str) -> Result<PathBuf, StoreError> {
        let rel = root.trim_start_matches('/');
        if rel.is_empty() || rel.split('/').any(|c| c.is_empty() || c == "." || c == "..") {
            return Err(StoreError::InvalidRoot {
                root: root.to_string(),
            });
        }
        Ok(self.base.join(rel))
    }

    fn relative_path(dir: &Path, file: &Path) -> Option<String> {
        let rel = file.strip_prefix(dir).ok()?;
        let mut parts = Vec::new();
        for component in rel.components() {
            parts.push(component.as_os_str().to_str()?.to_string());
        }
        Some(parts.join("/"))
    }
}

#[async_trait]
impl BackingStore for DiskStore {
    async fn open(&self, root: &str) -> Result<(), StoreError> {
        let dir = self.root_dir(root)?;
        tokio::fs::create_dir_all(&dir).await?;
        Ok(())
    }

    async fn load(&self, root: &str) -> Result<Vec<FileEntry>, StoreError> {
        let dir = self.root_dir(root)?;
        if !dir.is_dir() {
            return Err(StoreError::Unavailable {
                message: format!("store directory missing: {}", dir.display()),
            });
        }

        let mut entries = Vec::new();
        let mut pending = vec![dir.clone()];
        while let Some(current) = pending.pop() {
            let mut listing = tokio::fs::read_dir(&current).await?;
            while let Some(item) = listing.next_entry().await? {
                let path = item.path();
                let kind = item.file_type().await?;
                if kind.is_dir() {
                    pending.push(path);
                } else if kind.is_file() {
                    let data = tokio::fs::read(&path).await?;
                    if let Some(rel) = Self::relative_path(&dir, &path) {
                        entries.push(FileEntry::new(rel, Bytes::from(data)));
                    }
                }
            }
        }
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    async fn save(&self, root: &str, entries: Vec<FileEntry>) -> Result<(), StoreError> {
        let dir = self.root_dir(root)?;
        if !dir.is_dir() {
            return Err(StoreError::Unavailable {
                message: format!("store directory missing: {}", dir.display()),
            });
        }
        for entry in entries {
            let target = dir.join(&entry.path);
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&target, &entry.data).await?;
            tracing::debug!(path = %target.display(), "persisted file");
        }
        Ok(())
    }

    async fn close(&self, _root: &str) -> Result<(), StoreError> {
        // Nothing held open between operations.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_creates_root_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DiskStore::new(tmp.path());
        store.open("/user_fs").await.unwrap();
        assert!(tmp.path().join("user_fs").is_dir());
    }

    #[tokio::test]
    async fn save_then_load_round_trips_nested_paths() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DiskStore::new(tmp.path());
        store.open("/user_fs").await.unwrap();
        store
            .save(
                "/user_fs",
                vec![
                    FileEntry::new("a.bin", Bytes::from_static(b"a")),
                    FileEntry::new("saves/slot0.bin", Bytes::from_static(b"s0")),
                ],
            )
            .await
            .unwrap();

        let loaded = store.load("/user_fs").await.unwrap();
        let paths: Vec<_> = loaded.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["a.bin", "saves/slot0.bin"]);
        assert_eq!(loaded[1].data, Bytes::from_static(b"s0"));
    }

    #[tokio::test]
    async fn load_without_open_is_unavailable() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DiskStore::new(tmp.path().join("missing"));
        assert!(matches!(
            store.load("/user_fs").await,
            Err(StoreError::Unavailable { .. })
        ));
    }

    #[tokio::test]
    async fn traversing_roots_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DiskStore::new(tmp.path());
        assert!(matches!(
            store.open("/../escape").await,
            Err(StoreError::InvalidRoot { .. })
        ));
        assert!(matches!(
            store.open("/").await,
            Err(StoreError::InvalidRoot { .. })
        ));
    }
}
