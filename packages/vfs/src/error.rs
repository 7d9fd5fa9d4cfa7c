//! Error types for the persistent filesystem layer.

use thiserror::Error;

/// Errors raised by the in-memory module filesystem.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FsError {
    /// No node exists at the path.
    #[error("no such file or directory: {0}")]
    NotFound(String),

    /// A non-directory node sits where a directory is needed.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// The parent directory of a write target does not exist.
    #[error("parent directory does not exist: {0}")]
    ParentNotFound(String),

    /// The path names a directory where a file is needed.
    #[error("is a directory: {0}")]
    IsADirectory(String),

    /// The path is not a normalized absolute path.
    #[error("invalid path: {0}")]
    InvalidPath(String),
}

/// Errors raised by a durable backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store cannot be reached or attached.
    #[error("backing store unavailable: {message}")]
    Unavailable { message: String },

    /// The mount root is not acceptable to this store.
    #[error("invalid mount root: {root}")]
    InvalidRoot { root: String },

    /// An I/O error from the store's medium.
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by `PersistentFs` operations.
#[derive(Debug, Error)]
pub enum VfsError {
    /// A caller-supplied argument was structurally invalid.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An in-memory filesystem operation failed.
    #[error(transparent)]
    Fs(#[from] FsError),

    /// A backing store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The shared filesystem lock was poisoned by a panicking holder.
    #[error("filesystem lock poisoned")]
    LockPoisoned,
}

/// Failure of a push synchronization.
///
/// Cloneable because the outcome of an in-flight sync is shared with every
/// caller that joined it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    /// The backing store rejected the push.
    #[error("sync to backing store failed: {0}")]
    Store(String),
}

/// Result alias for `PersistentFs` operations.
pub type Result<T> = std::result::Result<T, VfsError>;
