//! In-process backing store.
//!
//! Keeps persisted state in a map keyed by mount root. Useful for tests
//! and for hosts that want the mount/sync protocol without durability
//! across process restarts.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StoreError;
use crate::store::{BackingStore, FileEntry};

/// A backing store held entirely in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    roots: Mutex<HashMap<String, BTreeMap<String, Bytes>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read back what the store holds for `root`, for inspection.
    pub fn contents(&self, root: &str) -> Vec<FileEntry> {
        let roots = self.roots.lock().unwrap_or_else(|e| e.into_inner());
        roots
            .get(root)
            .map(|files| {
                files
                    .iter()
                    .map(|(path, data)| FileEntry::new(path.clone(), data.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl BackingStore for MemoryStore {
    async fn open(&self, root: &str) -> Result<(), StoreError> {
        let mut roots = self.roots.lock().unwrap_or_else(|e| e.into_inner());
        roots.entry(root.to_string()).or_default();
        Ok(())
    }

    async fn load(&self, root: &str) -> Result<Vec<FileEntry>, StoreError> {
        let roots = self.roots.lock().unwrap_or_else(|e| e.into_inner());
        Ok(roots
            .get(root)
            .map(|files| {
                files
                    .iter()
                    .map(|(path, data)| FileEntry::new(path.clone(), data.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn save(&self, root: &str, entries: Vec<FileEntry>) -> Result<(), StoreError> {
        let mut roots = self.roots.lock().unwrap_or_else(|e| e.into_inner());
        let files = roots.entry(root.to_string()).or_default();
        for entry in entries {
            files.insert(entry.path, entry.data);
        }
        Ok(())
    }

    async fn close(&self, root: &str) -> Result<(), StoreError> {
        // Contents survive a close; only the attachment is released.
        let roots = self.roots.lock().unwrap_or_else(|e| e.into_inner());
        if !roots.contains_key(root) {
            return Err(StoreError::InvalidRoot {
                root: root.to_string(),
            });
        }
        Ok(())
    }
}
