use fsio::FsError;
use thiserror::Error;

/// Fatal failures surfaced while a run is in progress.
///
/// Everything else the engine encounters is either recovered (source-side
/// listing trouble is treated as an empty listing) or rejected before the
/// run starts by [`crate::SyncOptions::build`].
#[derive(Debug, Error)]
pub enum SyncError {
    /// Two or more non-directory sources share a name and resolve to the
    /// same destination slot, and conflict resolution was not requested.
    #[error(
        "SRC_CONFLICT - Trying to copy multiple objects with the same filename at the same destination ({target})"
    )]
    SourceConflict {
        /// The contested destination slot (or bare name in log-only mode).
        target: String,
    },

    /// A destination-side filesystem failure.
    #[error(transparent)]
    Fs(#[from] FsError),
}
