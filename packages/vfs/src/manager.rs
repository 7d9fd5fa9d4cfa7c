//! The persistent filesystem manager.
//!
//! `PersistentFs` binds a durable [`BackingStore`] to a set of mount roots
//! inside the module's in-memory filesystem and keeps them synchronized on
//! request. Persistence is a best-effort enhancement: if the store proves
//! unusable at mount time the manager degrades to non-persistent operation
//! instead of failing the bootstrap.
//!
//! Synchronization is single-flight. The in-flight guard is a single-slot
//! holder for the outstanding push future: a caller that requests a sync
//! while one is running is handed the same shared outcome, so the store
//! never sees two concurrent pushes. The slot is checked and set under a
//! synchronous lock, with no suspension point in between.

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;

use crate::error::{FsError, Result, SyncError, VfsError};
use crate::memfs::{normalize, parent_of, FsHandle};
use crate::store::{BackingStore, FileEntry};

/// How a mount attempt concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountOutcome {
    /// All roots are bound to the backing store and the pull completed.
    Mounted,
    /// No roots were requested; the manager operates non-persistently.
    NonPersistent,
    /// The backing store was unusable; the mount set was cleared and the
    /// manager operates non-persistently.
    Degraded { error: String },
}

type SyncResult = std::result::Result<(), SyncError>;
type SyncSlot = Arc<Mutex<Option<Shared<BoxFuture<'static, SyncResult>>>>>;

/// Mount, sync, and staging coordinator for one module filesystem.
pub struct PersistentFs {
    fs: FsHandle,
    store: Arc<dyn BackingStore>,
    mounts: Vec<String>,
    persistent: bool,
    sync_slot: SyncSlot,
}

impl PersistentFs {
    /// Create a manager over the module's filesystem handle and a backing
    /// store. Nothing is mounted until [`mount`](Self::mount) runs.
    pub fn new(fs: FsHandle, store: Arc<dyn BackingStore>) -> Self {
        Self {
            fs,
            store,
            mounts: Vec::new(),
            persistent: false,
            sync_slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Whether the backing store is currently usable.
    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    /// The currently mounted roots, in mount order.
    pub fn mounts(&self) -> &[String] {
        &self.mounts
    }

    /// Clone the shared filesystem handle.
    pub fn fs(&self) -> FsHandle {
        self.fs.clone()
    }

    /// Bind `paths` to the backing store and pull persisted state in.
    ///
    /// An empty list is a no-op: the manager stays non-persistent and
    /// subsequent [`sync`](Self::sync) calls succeed without touching the
    /// store. Each root must be a normalized absolute path.
    ///
    /// Store attach or pull failure does not propagate: the mount set is
    /// cleared, the failure logged, and `Degraded` returned so the caller
    /// can observe the mode it ended up in.
    pub async fn mount(&mut self, paths: &[String]) -> Result<MountOutcome> {
        let mut roots = Vec::with_capacity(paths.len());
        for path in paths {
            let root = normalize(path).map_err(|_| {
                VfsError::InvalidArgument(format!(
                    "mount root must be a normalized absolute path: {path:?}"
                ))
            })?;
            roots.push(root);
        }

        if roots.is_empty() {
            self.mounts.clear();
            self.persistent = false;
            return Ok(MountOutcome::NonPersistent);
        }

        {
            let mut fs = self.fs.lock().map_err(|_| VfsError::LockPoisoned)?;
            for root in &roots {
                match fs.stat(root) {
                    Ok(_) => {}
                    Err(FsError::NotFound(_)) => fs.mkdir_tree(root)?,
                    Err(err) => return Err(err.into()),
                }
            }
        }

        self.mounts = roots.clone();
        match self.attach_and_pull(&roots).await {
            Ok(()) => {
                self.persistent = true;
                Ok(MountOutcome::Mounted)
            }
            Err(err) => {
                tracing::error!(error = %err, "backing store not available, continuing without persistence");
                self.mounts.clear();
                self.persistent = false;
                Ok(MountOutcome::Degraded {
                    error: err.to_string(),
                })
            }
        }
    }

    async fn attach_and_pull(&self, roots: &[String]) -> Result<()> {
        for root in roots {
            self.store.open(root).await?;
        }
        for root in roots {
            let entries = self.store.load(root).await?;
            let mut fs = self.fs.lock().map_err(|_| VfsError::LockPoisoned)?;
            for entry in entries {
                let target = join_root(root, &entry.path);
                let parent = parent_of(&target);
                match fs.stat(parent) {
                    Ok(_) => {}
                    Err(FsError::NotFound(_)) => fs.mkdir_tree(parent)?,
                    Err(err) => return Err(err.into()),
                }
                fs.write_file(&target, entry.data)?;
            }
        }
        Ok(())
    }

    /// Push in-memory state under every mount root to the backing store.
    ///
    /// Returns immediately with success in non-persistent mode. If a push
    /// is already in flight, the caller awaits that push's outcome instead
    /// of starting a second one. Store failure is returned, not panicked,
    /// and the in-flight slot is cleared either way.
    pub async fn sync(&self) -> SyncResult {
        if !self.persistent {
            return Ok(());
        }

        let fut = {
            let mut slot = self.sync_slot.lock().unwrap_or_else(|e| e.into_inner());
            match slot.as_ref() {
                Some(inflight) => inflight.clone(),
                None => {
                    let fut = push(
                        self.fs.clone(),
                        Arc::clone(&self.store),
                        self.mounts.clone(),
                        Arc::clone(&self.sync_slot),
                    )
                    .boxed()
                    .shared();
                    *slot = Some(fut.clone());
                    fut
                }
            }
        };
        fut.await
    }

    /// Unbind every mounted root and reset to the initial state.
    ///
    /// Redundant closes are logged, never escalated. Safe to call when
    /// nothing is mounted. An outstanding sync runs to completion; its
    /// slot entry is simply discarded here.
    pub async fn unmount(&mut self) {
        if self.mounts.is_empty() && !self.persistent {
            return;
        }
        for root in std::mem::take(&mut self.mounts) {
            if let Err(err) = self.store.close(&root).await {
                tracing::warn!(root = %root, error = %err, "close on unmount failed; treating as already unmounted");
            }
        }
        self.persistent = false;
        self.sync_slot
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
    }

    /// Write `data` to `path`, creating missing parent directories first.
    ///
    /// The write is immediate in the in-memory filesystem; durability in
    /// the backing store happens on the next explicit [`sync`](Self::sync).
    /// Deliberately not guarded by the in-flight sync slot.
    pub fn stage_file(&self, path: &str, data: Bytes) -> Result<()> {
        let path = normalize(path)?;
        let mut fs = self.fs.lock().map_err(|_| VfsError::LockPoisoned)?;
        let parent = parent_of(&path);
        match fs.stat(parent) {
            Ok(_) => {}
            Err(FsError::NotFound(_)) => fs.mkdir_tree(parent)?,
            Err(err) => return Err(err.into()),
        }
        fs.write_file(&path, data)?;
        Ok(())
    }

    /// Read a file from the module filesystem.
    pub fn read_file(&self, path: &str) -> Result<Bytes> {
        let fs = self.fs.lock().map_err(|_| VfsError::LockPoisoned)?;
        Ok(fs.read_file(path)?)
    }
}

/// The push phase, detached from `&self` so the shared future is `'static`.
async fn push(
    fs: FsHandle,
    store: Arc<dyn BackingStore>,
    roots: Vec<String>,
    slot: SyncSlot,
) -> SyncResult {
    let result = async {
        for root in &roots {
            let entries = {
                let fs = fs
                    .lock()
                    .map_err(|_| SyncError::Store("filesystem lock poisoned".to_string()))?;
                fs.files_under(root)
                    .map_err(|e| SyncError::Store(e.to_string()))?
                    .into_iter()
                    .map(|(path, data)| FileEntry::new(path, data))
                    .collect::<Vec<_>>()
            };
            store
                .save(root, entries)
                .await
                .map_err(|e| SyncError::Store(e.to_string()))?;
        }
        Ok(())
    }
    .await;

    slot.lock().unwrap_or_else(|e| e.into_inner()).take();
    if let Err(err) = &result {
        tracing::error!(error = %err, "sync to backing store failed");
    }
    result
}

fn join_root(root: &str, rel: &str) -> String {
    if root == "/" {
        format!("/{rel}")
    } else {
        format!("{root}/{rel}")
    }
}
