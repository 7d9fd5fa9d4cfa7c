//! berth-vfs: Persistent virtual filesystem for hosted compute modules.
//!
//! A hosted module gets a private in-memory filesystem ([`MemFs`]) for the
//! lifetime of one bootstrap. This crate binds designated directory paths
//! inside that filesystem to a durable [`BackingStore`] and keeps them
//! synchronized on request:
//!
//! - mount: ensure each root exists, attach the store, pull persisted
//!   state in; an unusable store degrades to non-persistent operation
//!   instead of failing the bootstrap
//! - sync: push in-memory state out, single-flight — concurrent requests
//!   join the outstanding push rather than starting a second one
//! - stage: write fetched bytes into the filesystem, creating parent
//!   directories as needed; durable only on the next sync
//! - unmount: release every root and reset to the initial state
//!
//! # Example
//!
//! ```rust,ignore
//! use berth_vfs::{MemFs, MemoryStore, PersistentFs};
//! use std::sync::Arc;
//!
//! let mut vfs = PersistentFs::new(MemFs::handle(), Arc::new(MemoryStore::new()));
//! vfs.mount(&["/user_fs".to_string()]).await?;
//! vfs.stage_file("/user_fs/a.bin", bytes)?;
//! vfs.sync().await?;
//! ```

pub use bytes::Bytes;

mod disk_store;
mod error;
mod manager;
mod memfs;
mod memory_store;
mod store;

pub use disk_store::DiskStore;
pub use error::{FsError, Result, StoreError, SyncError, VfsError};
pub use manager::{MountOutcome, PersistentFs};
pub use memfs::{normalize, parent_of, FsHandle, MemFs, NodeKind};
pub use memory_store::MemoryStore;
pub use store::{BackingStore, FileEntry};
