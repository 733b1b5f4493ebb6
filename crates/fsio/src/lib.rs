#![deny(unsafe_code)]

//! Minimal filesystem abstraction consumed by the synchronization engine.
//!
//! The engine never touches `std::fs` directly; everything goes through the
//! [`FileSystem`] trait so that either endpoint of a transfer can be the
//! local filesystem (`file:`) or an HDFS-style remote tree (`hdfs:`). Paths
//! on the trait are absolute, slash-separated strings regardless of the
//! backend, and stat results are returned as [`FileHandle`] snapshots.
//!
//! The crate ships the local backend ([`LocalFs`]) and the scheme-aware
//! [`SchemeRegistry`]; remote clients are constructed elsewhere and
//! registered by the embedder. The cross-scheme [`copy`] primitive streams
//! bytes between any two backends.

mod error;
mod glob;
mod handle;
mod local;
pub mod path;
mod registry;
mod uri;

pub use error::FsError;
pub use glob::expand as glob_expand;
pub use handle::{EntryKind, FileHandle};
pub use local::LocalFs;
pub use registry::SchemeRegistry;
pub use uri::{Scheme, Uri};

use std::io::{self, Read, Write};
use std::sync::Arc;

/// The capability set the synchronization engine consumes.
///
/// Implementations are expected to be cheap to share (`Arc<dyn FileSystem>`)
/// and are driven from a single thread; every method blocks until the
/// underlying operation completes.
pub trait FileSystem: Send + Sync {
    /// The scheme this backend serves.
    fn scheme(&self) -> Scheme;

    /// Stat snapshot for `path`. Fails with [`FsError::NotFound`] when the
    /// path does not exist.
    fn stat(&self, path: &str) -> Result<FileHandle, FsError>;

    /// Whether `path` exists.
    fn exists(&self, path: &str) -> Result<bool, FsError>;

    /// Direct children of the directory at `path`, in no particular order.
    fn list(&self, path: &str) -> Result<Vec<FileHandle>, FsError>;

    /// Expands a glob pattern into matching handles, `Ok(None)` when nothing
    /// matches. Patterns support `*`, `?`, character classes and `\` escapes
    /// within a component, and `**` across components.
    fn glob(&self, pattern: &str) -> Result<Option<Vec<FileHandle>>, FsError> {
        glob::expand(self, pattern)
    }

    /// Creates the directory at `path`, including missing parents.
    fn mkdir(&self, path: &str) -> Result<(), FsError>;

    /// Removes `path`; a non-empty directory is only removed when
    /// `recursive` is set.
    fn delete(&self, path: &str, recursive: bool) -> Result<(), FsError>;

    /// Opens the file at `path` for reading.
    fn open(&self, path: &str) -> Result<Box<dyn Read + Send>, FsError>;

    /// Creates (or truncates, when `overwrite` is set) the file at `path`
    /// for writing.
    fn create(&self, path: &str, overwrite: bool) -> Result<Box<dyn Write + Send>, FsError>;

    /// Sets the modification time of `path`, in milliseconds since the
    /// epoch.
    fn set_times(&self, path: &str, mtime_ms: i64) -> Result<(), FsError>;

    /// Rewrites the permission bits of `path`.
    fn set_permission(&self, path: &str, perms: u32) -> Result<(), FsError>;

    /// Rewrites owner and/or group of `path`. `None` leaves the respective
    /// principal untouched.
    fn set_owner(
        &self,
        path: &str,
        owner: Option<&str>,
        group: Option<&str>,
    ) -> Result<(), FsError>;

    /// Whether `path` names an existing directory.
    fn is_directory(&self, path: &str) -> Result<bool, FsError>;
}

/// Copies `src` to `dst_path`, possibly across backends.
///
/// A file handle streams byte content and nothing else; metadata is the
/// caller's concern. A directory handle replicates the subtree below it
/// (used by the copy-dirs mode). Returns the number of file bytes written.
pub fn copy(
    src_fs: &dyn FileSystem,
    src: &FileHandle,
    dst_fs: &dyn FileSystem,
    dst_path: &str,
    overwrite: bool,
) -> Result<u64, FsError> {
    match src.kind() {
        EntryKind::File => copy_file(src_fs, src.path(), dst_fs, dst_path, overwrite),
        EntryKind::Directory => {
            if !dst_fs.is_directory(dst_path)? {
                dst_fs.mkdir(dst_path)?;
            }
            let mut children = src_fs.list(src.path())?;
            children.sort_by(|a, b| a.path().cmp(b.path()));
            let mut bytes = 0;
            for child in &children {
                let target = path::join(dst_path, path::file_name(child.path()));
                bytes += copy(src_fs, child, dst_fs, &target, overwrite)?;
            }
            Ok(bytes)
        }
    }
}

fn copy_file(
    src_fs: &dyn FileSystem,
    src_path: &str,
    dst_fs: &dyn FileSystem,
    dst_path: &str,
    overwrite: bool,
) -> Result<u64, FsError> {
    let mut reader = src_fs.open(src_path)?;
    let mut writer = dst_fs.create(dst_path, overwrite)?;
    let bytes = io::copy(&mut reader, &mut writer).map_err(|source| FsError::Io {
        path: dst_path.to_owned(),
        source,
    })?;
    writer.flush().map_err(|source| FsError::Io {
        path: dst_path.to_owned(),
        source,
    })?;
    Ok(bytes)
}

/// Convenience alias used throughout the engine.
pub type SharedFs = Arc<dyn FileSystem>;
