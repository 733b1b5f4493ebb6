#![deny(unsafe_code)]

//! Shared test utilities for the hsync workspace.
//!
//! The main offering is [`MemFs`], a deterministic in-memory [`FileSystem`]
//! that stands in for the remote (`hdfs:`) backend in tests. It keeps a flat
//! path -> node map behind a mutex, stamps writes from a fake millisecond
//! clock, and accepts arbitrary principal names so ownership tests do not
//! depend on the host's user database.

use std::collections::BTreeMap;
use std::io::{self, Cursor, Read, Write};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use fsio::{path, EntryKind, FileHandle, FileSystem, FsError, Scheme};

const DEFAULT_OWNER: &str = "hdfs";
const DEFAULT_GROUP: &str = "hadoop";

#[derive(Clone, Debug)]
struct Node {
    kind: EntryKind,
    data: Vec<u8>,
    mtime_ms: i64,
    perms: u32,
    owner: String,
    group: String,
}

impl Node {
    fn dir(mtime_ms: i64) -> Self {
        Self {
            kind: EntryKind::Directory,
            data: Vec::new(),
            mtime_ms,
            perms: 0o755,
            owner: DEFAULT_OWNER.to_owned(),
            group: DEFAULT_GROUP.to_owned(),
        }
    }

    fn file(data: Vec<u8>, mtime_ms: i64) -> Self {
        Self {
            kind: EntryKind::File,
            data,
            mtime_ms,
            perms: 0o644,
            owner: DEFAULT_OWNER.to_owned(),
            group: DEFAULT_GROUP.to_owned(),
        }
    }

    fn to_handle(&self, path: &str) -> FileHandle {
        let len = match self.kind {
            EntryKind::File => self.data.len() as u64,
            EntryKind::Directory => 0,
        };
        FileHandle::new(
            path,
            self.kind,
            len,
            self.mtime_ms,
            self.perms,
            self.owner.clone(),
            self.group.clone(),
        )
    }
}

/// Deterministic in-memory filesystem serving the `hdfs:` scheme in tests.
#[derive(Clone)]
pub struct MemFs {
    nodes: Arc<Mutex<BTreeMap<String, Node>>>,
    clock_ms: Arc<AtomicI64>,
}

impl Default for MemFs {
    fn default() -> Self {
        Self::new()
    }
}

impl MemFs {
    /// An empty tree holding only the root directory.
    #[must_use]
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_owned(), Node::dir(0));
        Self {
            nodes: Arc::new(Mutex::new(nodes)),
            clock_ms: Arc::new(AtomicI64::new(1_600_000_000_000)),
        }
    }

    fn tick(&self) -> i64 {
        self.clock_ms.fetch_add(1000, Ordering::Relaxed)
    }

    /// Seeds a file (creating missing parents) with an explicit mtime.
    pub fn add_file(&self, path: &str, contents: &[u8], mtime_ms: i64) {
        self.ensure_parents(path);
        self.nodes
            .lock()
            .expect("memfs lock")
            .insert(normalize(path), Node::file(contents.to_vec(), mtime_ms));
    }

    /// Seeds a directory, creating missing parents.
    pub fn add_dir(&self, path: &str) {
        self.ensure_parents(path);
        let now = self.tick();
        self.nodes
            .lock()
            .expect("memfs lock")
            .entry(normalize(path))
            .or_insert_with(|| Node::dir(now));
    }

    /// Every path in the tree except the root, sorted.
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        self.nodes
            .lock()
            .expect("memfs lock")
            .keys()
            .filter(|key| key.as_str() != "/")
            .cloned()
            .collect()
    }

    /// The byte contents of a file.
    pub fn contents(&self, path: &str) -> Result<Vec<u8>, FsError> {
        let nodes = self.nodes.lock().expect("memfs lock");
        match nodes.get(&normalize(path)) {
            Some(node) if node.kind == EntryKind::File => Ok(node.data.clone()),
            Some(_) => Err(FsError::NotADirectory {
                path: path.to_owned(),
            }),
            None => Err(FsError::NotFound {
                path: path.to_owned(),
            }),
        }
    }

    fn ensure_parents(&self, path: &str) {
        let normalized = normalize(path);
        let mut nodes = self.nodes.lock().expect("memfs lock");
        let mut prefix = String::new();
        for component in path::components(&normalized) {
            prefix.push('/');
            prefix.push_str(component);
            if prefix != normalized {
                let now = self.clock_ms.load(Ordering::Relaxed);
                nodes
                    .entry(prefix.clone())
                    .or_insert_with(|| Node::dir(now));
            }
        }
    }

    fn with_node<T>(
        &self,
        path: &str,
        f: impl FnOnce(&mut Node) -> T,
    ) -> Result<T, FsError> {
        let mut nodes = self.nodes.lock().expect("memfs lock");
        nodes
            .get_mut(&normalize(path))
            .map(f)
            .ok_or_else(|| FsError::NotFound {
                path: path.to_owned(),
            })
    }
}

fn normalize(path: &str) -> String {
    if path == "/" {
        return path.to_owned();
    }
    path.trim_end_matches('/').to_owned()
}

fn child_of<'a>(key: &'a str, dir: &str) -> Option<&'a str> {
    let rest = path::strip_prefix(key, dir)?;
    if rest.is_empty() || rest.contains('/') {
        None
    } else {
        Some(rest)
    }
}

impl FileSystem for MemFs {
    fn scheme(&self) -> Scheme {
        Scheme::Hdfs
    }

    fn stat(&self, path: &str) -> Result<FileHandle, FsError> {
        let nodes = self.nodes.lock().expect("memfs lock");
        let normalized = normalize(path);
        nodes
            .get(&normalized)
            .map(|node| node.to_handle(&normalized))
            .ok_or(FsError::NotFound {
                path: normalized,
            })
    }

    fn exists(&self, path: &str) -> Result<bool, FsError> {
        Ok(self
            .nodes
            .lock()
            .expect("memfs lock")
            .contains_key(&normalize(path)))
    }

    fn list(&self, path: &str) -> Result<Vec<FileHandle>, FsError> {
        let nodes = self.nodes.lock().expect("memfs lock");
        let normalized = normalize(path);
        match nodes.get(&normalized) {
            None => {
                return Err(FsError::NotFound {
                    path: normalized,
                })
            }
            Some(node) if node.kind != EntryKind::Directory => {
                return Err(FsError::NotADirectory {
                    path: normalized,
                })
            }
            Some(_) => {}
        }
        Ok(nodes
            .iter()
            .filter(|(key, _)| child_of(key, &normalized).is_some())
            .map(|(key, node)| node.to_handle(key))
            .collect())
    }

    fn mkdir(&self, path: &str) -> Result<(), FsError> {
        let normalized = normalize(path);
        let mut nodes = self.nodes.lock().expect("memfs lock");
        let mut prefix = String::new();
        let now = self.clock_ms.load(Ordering::Relaxed);
        for component in path::components(&normalized) {
            prefix.push('/');
            prefix.push_str(component);
            match nodes.get(&prefix) {
                Some(node) if node.kind == EntryKind::File => {
                    return Err(FsError::NotADirectory { path: prefix });
                }
                Some(_) => {}
                None => {
                    nodes.insert(prefix.clone(), Node::dir(now));
                }
            }
        }
        Ok(())
    }

    fn delete(&self, path: &str, recursive: bool) -> Result<(), FsError> {
        let normalized = normalize(path);
        let mut nodes = self.nodes.lock().expect("memfs lock");
        let node = nodes.get(&normalized).ok_or_else(|| FsError::NotFound {
            path: normalized.clone(),
        })?;
        if node.kind == EntryKind::Directory {
            let descendants: Vec<String> = nodes
                .keys()
                .filter(|key| path::strip_prefix(key, &normalized).is_some_and(|r| !r.is_empty()))
                .cloned()
                .collect();
            if !descendants.is_empty() && !recursive {
                return Err(FsError::Io {
                    path: normalized,
                    source: io::Error::other("directory not empty"),
                });
            }
            for key in descendants {
                nodes.remove(&key);
            }
        }
        nodes.remove(&normalized);
        Ok(())
    }

    fn open(&self, path: &str) -> Result<Box<dyn Read + Send>, FsError> {
        let contents = self.contents(path)?;
        Ok(Box::new(Cursor::new(contents)))
    }

    fn create(&self, path: &str, overwrite: bool) -> Result<Box<dyn Write + Send>, FsError> {
        let normalized = normalize(path);
        {
            let nodes = self.nodes.lock().expect("memfs lock");
            match nodes.get(&normalized) {
                Some(node) if node.kind == EntryKind::Directory => {
                    return Err(FsError::AlreadyExists { path: normalized });
                }
                Some(_) if !overwrite => {
                    return Err(FsError::AlreadyExists { path: normalized });
                }
                _ => {}
            }
            if let Some(parent) = path::parent(&normalized) {
                match nodes.get(parent) {
                    Some(node) if node.kind == EntryKind::Directory => {}
                    Some(_) => {
                        return Err(FsError::NotADirectory {
                            path: parent.to_owned(),
                        });
                    }
                    None => {
                        return Err(FsError::NotFound {
                            path: parent.to_owned(),
                        });
                    }
                }
            }
        }
        Ok(Box::new(MemWriter {
            fs: self.clone(),
            path: normalized,
            buf: Vec::new(),
        }))
    }

    fn set_times(&self, path: &str, mtime_ms: i64) -> Result<(), FsError> {
        self.with_node(path, |node| node.mtime_ms = mtime_ms)
    }

    fn set_permission(&self, path: &str, perms: u32) -> Result<(), FsError> {
        self.with_node(path, |node| node.perms = perms & 0o7777)
    }

    fn set_owner(
        &self,
        path: &str,
        owner: Option<&str>,
        group: Option<&str>,
    ) -> Result<(), FsError> {
        self.with_node(path, |node| {
            if let Some(owner) = owner {
                node.owner = owner.to_owned();
            }
            if let Some(group) = group {
                node.group = group.to_owned();
            }
        })
    }

    fn is_directory(&self, path: &str) -> Result<bool, FsError> {
        Ok(self
            .nodes
            .lock()
            .expect("memfs lock")
            .get(&normalize(path))
            .is_some_and(|node| node.kind == EntryKind::Directory))
    }
}

struct MemWriter {
    fs: MemFs,
    path: String,
    buf: Vec<u8>,
}

impl Write for MemWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let mtime = self.fs.tick();
        self.fs
            .nodes
            .lock()
            .expect("memfs lock")
            .insert(self.path.clone(), Node::file(self.buf.clone(), mtime));
        Ok(())
    }
}

impl Drop for MemWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_tree_lists_and_stats() {
        let fs = MemFs::new();
        fs.add_file("/data/a.txt", b"alpha", 1000);
        fs.add_file("/data/sub/b.txt", b"beta", 2000);

        let handle = fs.stat("/data/a.txt").expect("stat");
        assert_eq!(handle.len(), 5);
        assert_eq!(handle.mtime_ms(), 1000);
        assert_eq!(handle.owner(), "hdfs");

        let mut names: Vec<String> = fs
            .list("/data")
            .expect("list")
            .into_iter()
            .map(|h| h.name().to_owned())
            .collect();
        names.sort();
        assert_eq!(names, ["a.txt", "sub"]);
    }

    #[test]
    fn create_streams_into_the_tree() {
        let fs = MemFs::new();
        fs.add_dir("/out");
        {
            let mut writer = fs.create("/out/file", true).expect("create");
            writer.write_all(b"payload").expect("write");
            writer.flush().expect("flush");
        }
        assert_eq!(fs.contents("/out/file").expect("contents"), b"payload");
    }

    #[test]
    fn create_requires_existing_parent() {
        let fs = MemFs::new();
        let err = match fs.create("/missing/file", true) {
            Ok(_) => panic!("must fail"),
            Err(err) => err,
        };
        assert!(matches!(err, FsError::NotFound { .. }));
    }

    #[test]
    fn non_recursive_delete_refuses_populated_dirs() {
        let fs = MemFs::new();
        fs.add_file("/d/inner", b"x", 0);
        assert!(fs.delete("/d", false).is_err());
        fs.delete("/d", true).expect("recursive delete");
        assert!(!fs.exists("/d").expect("exists"));
    }

    #[test]
    fn glob_default_impl_expands_over_the_tree() {
        let fs = MemFs::new();
        fs.add_file("/logs/one.log", b"1", 0);
        fs.add_file("/logs/two.log", b"2", 0);
        fs.add_file("/logs/keep.txt", b"3", 0);

        let matches = fs.glob("/logs/*.log").expect("glob").expect("matches");
        let names: Vec<&str> = matches.iter().map(FileHandle::name).collect();
        assert_eq!(names, ["one.log", "two.log"]);
    }
}
