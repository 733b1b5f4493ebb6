/// Whether an entry is a file or a directory. Links, devices and the rest of
/// the special-file zoo are outside the transfer model.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum EntryKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
}

/// A filesystem-agnostic stat snapshot.
///
/// Handles are read-only descriptors taken at listing time; nothing refreshes
/// them when the underlying entry changes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FileHandle {
    path: String,
    kind: EntryKind,
    len: u64,
    mtime_ms: i64,
    perms: u32,
    owner: String,
    group: String,
}

impl FileHandle {
    /// Builds a snapshot. `path` must be absolute and slash-separated.
    #[must_use]
    pub fn new(
        path: impl Into<String>,
        kind: EntryKind,
        len: u64,
        mtime_ms: i64,
        perms: u32,
        owner: impl Into<String>,
        group: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            kind,
            len,
            mtime_ms,
            perms,
            owner: owner.into(),
            group: group.into(),
        }
    }

    /// Absolute path of the entry.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// File or directory.
    #[must_use]
    pub const fn kind(&self) -> EntryKind {
        self.kind
    }

    /// Whether the entry is a directory.
    #[must_use]
    pub const fn is_dir(&self) -> bool {
        matches!(self.kind, EntryKind::Directory)
    }

    /// Length in bytes (0 for directories).
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.len
    }

    /// Whether the entry is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Modification time in milliseconds since the epoch.
    #[must_use]
    pub const fn mtime_ms(&self) -> i64 {
        self.mtime_ms
    }

    /// Permission bits (the low 12 bits are meaningful).
    #[must_use]
    pub const fn perms(&self) -> u32 {
        self.perms
    }

    /// Owner name.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Group name.
    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Last path component.
    #[must_use]
    pub fn name(&self) -> &str {
        crate::path::file_name(&self.path)
    }
}
