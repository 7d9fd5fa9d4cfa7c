//! The durable backing store contract.
//!
//! A backing store is a key-value medium that outlives the module: a
//! directory tree on disk, a browser-local database, an object store.
//! `PersistentFs` binds one store to a set of mount roots and moves file
//! snapshots across the boundary in two phases: `load` pulls store state
//! into the in-memory filesystem at mount time, `save` pushes it back out
//! on an explicit sync.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StoreError;

/// One file crossing the store boundary.
///
/// `path` is relative to the mount root, forward-slash separated, with no
/// leading slash (`saves/slot0.bin`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: String,
    pub data: Bytes,
}

impl FileEntry {
    pub fn new(path: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            path: path.into(),
            data: data.into(),
        }
    }
}

/// A durable key-value store bound to mount roots.
///
/// Implementations take `&self`; any internal state is their own to guard.
/// All methods are cooperative suspension points, never parallel mutation
/// of shared manager state.
#[async_trait]
pub trait BackingStore: Send + Sync {
    /// Attach the store at a mount root, creating whatever per-root state
    /// the medium needs. Called once per root during the mount phase.
    async fn open(&self, root: &str) -> Result<(), StoreError>;

    /// Pull phase: read every file persisted under `root`.
    async fn load(&self, root: &str) -> Result<Vec<FileEntry>, StoreError>;

    /// Push phase: persist `entries` under `root`, overwriting previous
    /// content per path.
    async fn save(&self, root: &str, entries: Vec<FileEntry>) -> Result<(), StoreError>;

    /// Release any per-root connection state. Called during unmount; a
    /// redundant close is the implementation's to tolerate or report.
    async fn close(&self, root: &str) -> Result<(), StoreError>;
}
