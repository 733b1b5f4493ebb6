use fsio::FileHandle;

/// The state of an in-progress destination slot.
///
/// A target is either an intention (nothing was written, as in a dry run) or
/// a realized entry with a post-write stat snapshot. The metadata steps use
/// the snapshot to compare before writing; an intended target makes them log
/// their plan instead.
#[derive(Clone, Debug)]
pub enum Target {
    /// The path the entry would land at; no write has happened.
    Intended(String),
    /// The entry exists; the handle was taken after the last write.
    Realized(FileHandle),
}

impl Target {
    /// The destination path, regardless of state.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Target::Intended(path) => path,
            Target::Realized(handle) => handle.path(),
        }
    }

    /// The stat snapshot, when the target is realized.
    #[must_use]
    pub const fn handle(&self) -> Option<&FileHandle> {
        match self {
            Target::Intended(_) => None,
            Target::Realized(handle) => Some(handle),
        }
    }
}
