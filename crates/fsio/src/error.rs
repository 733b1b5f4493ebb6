use std::io;

use thiserror::Error;

/// Failures surfaced by filesystem backends.
#[derive(Debug, Error)]
pub enum FsError {
    /// The path does not exist.
    #[error("path not found: {path}")]
    NotFound {
        /// The missing path.
        path: String,
    },

    /// The path exists but a create without overwrite was requested.
    #[error("path already exists: {path}")]
    AlreadyExists {
        /// The conflicting path.
        path: String,
    },

    /// A directory operation was applied to a non-directory.
    #[error("not a directory: {path}")]
    NotADirectory {
        /// The offending path.
        path: String,
    },

    /// A URI could not be parsed.
    #[error("invalid uri '{uri}': {reason}")]
    InvalidUri {
        /// The rejected input.
        uri: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A URI names a scheme other than `file` or `hdfs`, or the scheme has
    /// no registered backend.
    #[error("unsupported scheme '{scheme}'")]
    UnsupportedScheme {
        /// The rejected scheme text.
        scheme: String,
    },

    /// An owner or group name could not be resolved on this backend.
    #[error("unknown principal '{name}' on {path}")]
    UnknownPrincipal {
        /// The unresolvable user or group name.
        name: String,
        /// The path whose ownership was being changed.
        path: String,
    },

    /// The operation is not available on this backend or platform.
    #[error("operation '{op}' is not supported by the {scheme} backend")]
    Unsupported {
        /// The trait operation.
        op: &'static str,
        /// The backend's scheme.
        scheme: &'static str,
    },

    /// A glob pattern failed to compile.
    #[error("invalid glob pattern '{pattern}'")]
    Glob {
        /// The offending pattern.
        pattern: String,
        /// The compiler's diagnosis.
        #[source]
        source: globset::Error,
    },

    /// An underlying I/O failure.
    #[error("i/o error on {path}")]
    Io {
        /// The path the operation touched.
        path: String,
        /// The OS-level failure.
        #[source]
        source: io::Error,
    },
}

impl FsError {
    pub(crate) fn from_io(path: &str, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => FsError::NotFound {
                path: path.to_owned(),
            },
            io::ErrorKind::AlreadyExists => FsError::AlreadyExists {
                path: path.to_owned(),
            },
            _ => FsError::Io {
                path: path.to_owned(),
                source,
            },
        }
    }

    /// Whether the error denotes a missing path.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, FsError::NotFound { .. })
    }
}
