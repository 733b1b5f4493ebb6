#![deny(unsafe_code)]

//! The synchronization engine: walks sources and destination in lockstep
//! and makes the destination reflect the sources.
//!
//! A run is configured through [`SyncOptions`], validated into a frozen
//! [`SyncConfig`], and executed by [`SyncEngine::run`]. The engine is
//! deterministic and single-threaded; entries at a level are processed in
//! source-parameter order after lexicographic listing, recursion is strictly
//! depth-first, and metadata is written only after the subtree below an
//! entry has completed.
//!
//! Per entry, the engine decides whether to copy, update, skip, create or
//! overwrite; same-name sources from different roots either merge (when all
//! are directories) or are resolved by policy; destination entries with no
//! source counterpart can be deleted, subject to filter protection. Every
//! decision emits one action record through the `logging` crate.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use engine::{SyncEngine, SyncOptions};
//! use fsio::LocalFs;
//!
//! let config = SyncOptions::default()
//!     .source("file:/data/incoming/")
//!     .dst("file:/data/mirror")
//!     .recurse(true)
//!     .times(true)
//!     .delete_extraneous(true)
//!     .build()?;
//! let engine = SyncEngine::new(config, Arc::new(LocalFs::new()), Some(Arc::new(LocalFs::new())));
//! let summary = engine.run()?;
//! println!("copied {} files", summary.files_copied());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
mod options;
mod processor;
mod summary;
mod target;
mod walker;

pub use error::SyncError;
pub use options::{OptionsError, SyncConfig, SyncOptions};
pub use summary::SyncSummary;
pub use target::Target;

use fsio::{FsError, SchemeRegistry, SharedFs};
use metadata::MetadataPlanner;

use walker::{LevelWalker, SourcePair};

/// Top-level driver: seeds the level walker with the configured roots and
/// returns when the recursion unwinds.
pub struct SyncEngine {
    config: SyncConfig,
    src_fs: SharedFs,
    dst_fs: Option<SharedFs>,
}

impl SyncEngine {
    /// Builds an engine over explicit backends. `dst_fs` must be present
    /// exactly when the config carries a destination.
    #[must_use]
    pub fn new(config: SyncConfig, src_fs: SharedFs, dst_fs: Option<SharedFs>) -> Self {
        Self {
            config,
            src_fs,
            dst_fs,
        }
    }

    /// Builds an engine resolving backends by scheme through `registry`.
    pub fn with_registry(config: SyncConfig, registry: &SchemeRegistry) -> Result<Self, FsError> {
        let src_fs = registry.resolve(config.source_scheme())?;
        let dst_fs = config
            .dst()
            .map(|uri| registry.resolve(uri.scheme()))
            .transpose()?;
        Ok(Self::new(config, src_fs, dst_fs))
    }

    /// The configuration the engine runs against.
    #[must_use]
    pub const fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Executes the run and returns its counters.
    ///
    /// Fatal failures are unresolved same-name conflicts and
    /// destination-side filesystem errors; source-side listing trouble is
    /// recovered by treating the listing as empty.
    pub fn run(&self) -> Result<SyncSummary, SyncError> {
        let planner = MetadataPlanner::new(
            self.config.metadata_options(),
            self.config.chmod.clone(),
            self.config.user_map.clone(),
            self.config.group_map.clone(),
        );
        let mut walker = LevelWalker {
            config: &self.config,
            src_fs: &*self.src_fs,
            dst_fs: self.dst_fs.as_deref(),
            dst_root: self.config.dst.as_ref().map(|uri| uri.path()),
            planner,
            summary: SyncSummary::default(),
        };

        let roots: Vec<SourcePair> = self
            .config
            .sources
            .iter()
            .map(|uri| (uri.path().to_owned(), None))
            .collect();
        let parent_dst = self.config.dst.as_ref().map(|uri| uri.path().to_owned());
        walker.sync_level(&roots, parent_dst.as_deref())?;
        Ok(walker.summary)
    }
}
