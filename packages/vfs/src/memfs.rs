//! The module's private in-memory filesystem.
//!
//! `MemFs` is the tree a hosted module reads and writes during execution.
//! It knows nothing about durability; `PersistentFs` pulls a backing store
//! into it at mount time and pushes snapshots back out on sync.
//!
//! Paths are normalized absolute paths (`/user_fs/saves/slot0.bin`). The
//! root directory always exists.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use bytes::Bytes;

use crate::error::FsError;

/// Shared handle to a module filesystem.
///
/// The module runtime holds one end (host-function implementations lock it
/// per call) and the filesystem manager holds the other. Locks are only
/// ever held for the duration of a single operation, never across an await.
pub type FsHandle = Arc<Mutex<MemFs>>;

/// Kind of node found by [`MemFs::stat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Directory,
}

/// In-memory filesystem tree: file contents plus an explicit directory set.
#[derive(Debug, Default)]
pub struct MemFs {
    files: BTreeMap<String, Bytes>,
    dirs: BTreeSet<String>,
}

/// Normalize and validate an absolute path.
///
/// Rejects relative paths, empty components, and `.`/`..` segments. Returns
/// the path with any trailing slash removed (`/` stays `/`).
pub fn normalize(path: &str) -> Result<String, FsError> {
    if !path.starts_with('/') {
        return Err(FsError::InvalidPath(path.to_string()));
    }
    if path == "/" {
        return Ok("/".to_string());
    }
    let trimmed = path.strip_suffix('/').unwrap_or(path);
    for component in trimmed[1..].split('/') {
        if component.is_empty() || component == "." || component == ".." {
            return Err(FsError::InvalidPath(path.to_string()));
        }
    }
    Ok(trimmed.to_string())
}

/// Parent directory of a normalized path. `/a` -> `/`, `/a/b` -> `/a`.
pub fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(idx) => &path[..idx],
    }
}

impl MemFs {
    /// Create an empty filesystem containing only the root directory.
    pub fn new() -> Self {
        let mut dirs = BTreeSet::new();
        dirs.insert("/".to_string());
        Self {
            files: BTreeMap::new(),
            dirs,
        }
    }

    /// Create a shareable handle to a fresh filesystem.
    pub fn handle() -> FsHandle {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Look up the node at `path`.
    pub fn stat(&self, path: &str) -> Result<NodeKind, FsError> {
        let path = normalize(path)?;
        if self.dirs.contains(&path) {
            Ok(NodeKind::Directory)
        } else if self.files.contains_key(&path) {
            Ok(NodeKind::File)
        } else {
            Err(FsError::NotFound(path))
        }
    }

    /// Create `path` and every missing ancestor as directories.
    ///
    /// Succeeds if the directory already exists. Fails with `NotADirectory`
    /// if any component along the chain is a file.
    pub fn mkdir_tree(&mut self, path: &str) -> Result<(), FsError> {
        let path = normalize(path)?;
        let mut current = String::new();
        for component in path.split('/').skip(1) {
            current.push('/');
            current.push_str(component);
            if self.files.contains_key(&current) {
                return Err(FsError::NotADirectory(current));
            }
            self.dirs.insert(current.clone());
        }
        Ok(())
    }

    /// Write `data` to the file at `path`, overwriting any previous content.
    ///
    /// The parent directory must already exist; callers that want implicit
    /// parent creation go through `PersistentFs::stage_file`.
    pub fn write_file(&mut self, path: &str, data: Bytes) -> Result<(), FsError> {
        let path = normalize(path)?;
        if path == "/" || self.dirs.contains(&path) {
            return Err(FsError::IsADirectory(path));
        }
        let parent = parent_of(&path);
        if !self.dirs.contains(parent) {
            return Err(FsError::ParentNotFound(parent.to_string()));
        }
        self.files.insert(path, data);
        Ok(())
    }

    /// Read the file at `path`.
    pub fn read_file(&self, path: &str) -> Result<Bytes, FsError> {
        let path = normalize(path)?;
        if self.dirs.contains(&path) {
            return Err(FsError::IsADirectory(path));
        }
        self.files
            .get(&path)
            .cloned()
            .ok_or(FsError::NotFound(path))
    }

    /// Snapshot every file under `root`.
    ///
    /// Returned paths are relative to `root` (no leading slash), in path
    /// order. Used by the push phase of synchronization.
    pub fn files_under(&self, root: &str) -> Result<Vec<(String, Bytes)>, FsError> {
        let root = normalize(root)?;
        let prefix = if root == "/" {
            "/".to_string()
        } else {
            format!("{}/", root)
        };
        Ok(self
            .files
            .range(prefix.clone()..)
            .take_while(|(path, _)| path.starts_with(&prefix))
            .map(|(path, data)| (path[prefix.len()..].to_string(), data.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_always_exists() {
        let fs = MemFs::new();
        assert_eq!(fs.stat("/").unwrap(), NodeKind::Directory);
    }

    #[test]
    fn normalize_rejects_relative_and_dotted_paths() {
        assert!(normalize("saves/slot0").is_err());
        assert!(normalize("/a/../b").is_err());
        assert!(normalize("/a//b").is_err());
        assert_eq!(normalize("/a/b/").unwrap(), "/a/b");
    }

    #[test]
    fn parent_of_walks_one_level_up() {
        assert_eq!(parent_of("/a"), "/");
        assert_eq!(parent_of("/a/b"), "/a");
        assert_eq!(parent_of("/user_fs/saves/slot0.bin"), "/user_fs/saves");
    }

    #[test]
    fn mkdir_tree_creates_chain() {
        let mut fs = MemFs::new();
        fs.mkdir_tree("/user_fs/saves/deep").unwrap();
        assert_eq!(fs.stat("/user_fs").unwrap(), NodeKind::Directory);
        assert_eq!(fs.stat("/user_fs/saves").unwrap(), NodeKind::Directory);
        assert_eq!(fs.stat("/user_fs/saves/deep").unwrap(), NodeKind::Directory);
    }

    #[test]
    fn mkdir_tree_refuses_file_component() {
        let mut fs = MemFs::new();
        fs.write_file("/blob", Bytes::from_static(b"x")).unwrap();
        assert_eq!(
            fs.mkdir_tree("/blob/child"),
            Err(FsError::NotADirectory("/blob".to_string()))
        );
    }

    #[test]
    fn write_requires_parent() {
        let mut fs = MemFs::new();
        let err = fs
            .write_file("/user_fs/a.bin", Bytes::from_static(b"x"))
            .unwrap_err();
        assert_eq!(err, FsError::ParentNotFound("/user_fs".to_string()));
    }

    #[test]
    fn write_read_overwrite() {
        let mut fs = MemFs::new();
        fs.mkdir_tree("/user_fs").unwrap();
        fs.write_file("/user_fs/a.bin", Bytes::from_static(b"one"))
            .unwrap();
        assert_eq!(fs.read_file("/user_fs/a.bin").unwrap(), "one");
        fs.write_file("/user_fs/a.bin", Bytes::from_static(b"two"))
            .unwrap();
        assert_eq!(fs.read_file("/user_fs/a.bin").unwrap(), "two");
    }

    #[test]
    fn read_missing_is_not_found() {
        let fs = MemFs::new();
        assert!(matches!(
            fs.read_file("/missing"),
            Err(FsError::NotFound(_))
        ));
    }

    #[test]
    fn files_under_is_scoped_and_relative() {
        let mut fs = MemFs::new();
        fs.mkdir_tree("/user_fs/saves").unwrap();
        fs.mkdir_tree("/other").unwrap();
        fs.write_file("/user_fs/a.bin", Bytes::from_static(b"a"))
            .unwrap();
        fs.write_file("/user_fs/saves/b.bin", Bytes::from_static(b"b"))
            .unwrap();
        fs.write_file("/other/c.bin", Bytes::from_static(b"c"))
            .unwrap();

        let files = fs.files_under("/user_fs").unwrap();
        let paths: Vec<_> = files.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(paths, vec!["a.bin", "saves/b.bin"]);
    }

    #[test]
    fn files_under_sibling_prefix_not_included() {
        let mut fs = MemFs::new();
        fs.mkdir_tree("/user_fs").unwrap();
        fs.mkdir_tree("/user_fs2").unwrap();
        fs.write_file("/user_fs2/x.bin", Bytes::from_static(b"x"))
            .unwrap();
        assert!(fs.files_under("/user_fs").unwrap().is_empty());
    }
}
