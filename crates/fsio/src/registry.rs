use std::sync::Arc;

use crate::{FileSystem, FsError, LocalFs, Scheme};

/// Scheme-aware backend lookup.
///
/// `file:` is always served by [`LocalFs`]. A client for `hdfs:` is
/// constructed by the embedder and registered here; resolving `hdfs:`
/// without one is an error rather than a silent fallback.
#[derive(Clone)]
pub struct SchemeRegistry {
    local: Arc<dyn FileSystem>,
    hdfs: Option<Arc<dyn FileSystem>>,
}

impl SchemeRegistry {
    /// A registry serving only `file:`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            local: Arc::new(LocalFs::new()),
            hdfs: None,
        }
    }

    /// Registers the backend serving `hdfs:` URIs.
    #[must_use]
    pub fn with_hdfs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.hdfs = Some(fs);
        self
    }

    /// Resolves the backend for `scheme`.
    pub fn resolve(&self, scheme: Scheme) -> Result<Arc<dyn FileSystem>, FsError> {
        match scheme {
            Scheme::File => Ok(Arc::clone(&self.local)),
            Scheme::Hdfs => self.hdfs.clone().ok_or(FsError::UnsupportedScheme {
                scheme: "hdfs".to_owned(),
            }),
        }
    }
}

impl Default for SchemeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
