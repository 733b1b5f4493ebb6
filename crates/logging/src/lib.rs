#![deny(unsafe_code)]

//! Action logging contract shared by the hsync workspace.
//!
//! Every decision the synchronization engine takes emits exactly one
//! [`ActionEvent`]: a well-known tag, an optional qualifier, and a rendered
//! detail line. Events are mirrored to two places:
//!
//! - the `tracing` infrastructure, at DEBUG for realized actions and INFO for
//!   dry-run and log-only intentions, so embedders can plug in whatever
//!   subscriber they use elsewhere;
//! - a per-thread event sink that tests (and other in-process consumers)
//!   drain with [`drain_events`].
//!
//! The sink is thread-local on purpose. The engine is single-threaded, so a
//! run's events land on the thread that drove it, and concurrently running
//! tests never observe each other's records.

use std::cell::RefCell;
use std::fmt;

/// The action vocabulary emitted by the engine.
///
/// Each variant corresponds to one user-visible record; the rendered form is
/// the upper-snake tag (e.g. `COPY_FILE`).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ActionKind {
    /// A destination directory was (or would be) created.
    CreateDir,
    /// A destination file was replaced by a directory.
    OverwriteDir,
    /// A new file was (or would be) copied to the destination.
    CopyFile,
    /// An existing destination file was (or would be) overwritten.
    UpdateFile,
    /// Source and destination compared equal; no transfer.
    SameFile,
    /// A file was skipped; the qualifier names the flag responsible.
    SkipFile,
    /// A directory was not descended into or transferred.
    SkipDir,
    /// The destination mtime was (or would be) set from the source.
    UpdateTimes,
    /// The destination permission bits were (or would be) rewritten.
    UpdatePerms,
    /// The destination owner and/or group was (or would be) rewritten.
    UpdateOwnerGroup,
    /// An extraneous destination entry was (or would be) deleted.
    DeleteDst,
    /// A source entry was dropped by the filter rules.
    ExcludeSrc,
    /// An extraneous destination entry was protected from deletion.
    ExcludeDst,
    /// An empty destination directory was (or would be) removed.
    PruneDir,
}

impl ActionKind {
    /// The wire-format tag for the action.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            ActionKind::CreateDir => "CREATE_DIR",
            ActionKind::OverwriteDir => "OVERWRITE_DIR",
            ActionKind::CopyFile => "COPY_FILE",
            ActionKind::UpdateFile => "UPDATE_FILE",
            ActionKind::SameFile => "SAME_FILE",
            ActionKind::SkipFile => "SKIP_FILE",
            ActionKind::SkipDir => "SKIP_DIR",
            ActionKind::UpdateTimes => "UPDATE_TIMES",
            ActionKind::UpdatePerms => "UPDATE_PERMS",
            ActionKind::UpdateOwnerGroup => "UPDATE_OWNER_GROUP",
            ActionKind::DeleteDst => "DELETE_DST",
            ActionKind::ExcludeSrc => "EXCLUDE_SRC",
            ActionKind::ExcludeDst => "EXCLUDE_DST",
            ActionKind::PruneDir => "PRUNE_DIR",
        }
    }
}

/// How the action relates to the filesystem: performed, planned, or log-only.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ActionMode {
    /// The action was actually performed. Logged at DEBUG.
    Applied,
    /// Dry-run: the action was planned but not performed. Logged at INFO
    /// with a `[dryrun]` suffix.
    DryRun,
    /// No destination is configured; the record is the entire output.
    /// Logged at INFO with a `[no-dst]` suffix.
    NoDst,
}

/// Effective log level of an event.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Level {
    /// Realized actions.
    Debug,
    /// Dry-run and log-only intentions.
    Info,
}

/// One action record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ActionEvent {
    kind: ActionKind,
    qualifier: Option<&'static str>,
    detail: String,
    mode: ActionMode,
}

impl ActionEvent {
    /// Builds an event for a realized or planned action.
    #[must_use]
    pub fn new(kind: ActionKind, detail: impl Into<String>, mode: ActionMode) -> Self {
        Self {
            kind,
            qualifier: None,
            detail: detail.into(),
            mode,
        }
    }

    /// Attaches a qualifier rendered after the tag, e.g.
    /// `SKIP_FILE [existing]`.
    #[must_use]
    pub fn with_qualifier(mut self, qualifier: &'static str) -> Self {
        self.qualifier = Some(qualifier);
        self
    }

    /// The action tag.
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        self.kind
    }

    /// The qualifier, if any.
    #[must_use]
    pub const fn qualifier(&self) -> Option<&'static str> {
        self.qualifier
    }

    /// The rendered detail (paths involved).
    #[must_use]
    pub fn detail(&self) -> &str {
        &self.detail
    }

    /// The mode the event was recorded under.
    #[must_use]
    pub const fn mode(&self) -> ActionMode {
        self.mode
    }

    /// The level the event is emitted at.
    #[must_use]
    pub const fn level(&self) -> Level {
        match self.mode {
            ActionMode::Applied => Level::Debug,
            ActionMode::DryRun | ActionMode::NoDst => Level::Info,
        }
    }
}

impl fmt::Display for ActionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind.tag())?;
        if let Some(qualifier) = self.qualifier {
            write!(f, " [{qualifier}]")?;
        }
        match self.mode {
            ActionMode::Applied => {}
            ActionMode::DryRun => write!(f, " [dryrun]")?,
            ActionMode::NoDst => write!(f, " [no-dst]")?,
        }
        write!(f, " - {}", self.detail)
    }
}

thread_local! {
    static EVENTS: RefCell<Vec<ActionEvent>> = const { RefCell::new(Vec::new()) };
}

/// Records one action: appends it to the thread-local sink and forwards it to
/// `tracing` at the event's level.
pub fn record(event: ActionEvent) {
    match event.level() {
        Level::Debug => tracing::debug!(target: "hsync::actions", "{event}"),
        Level::Info => tracing::info!(target: "hsync::actions", "{event}"),
    }
    EVENTS.with(|events| events.borrow_mut().push(event));
}

/// Removes and returns every event recorded on the current thread.
#[must_use]
pub fn drain_events() -> Vec<ActionEvent> {
    EVENTS.with(|events| events.borrow_mut().split_off(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applied_event_renders_tag_and_detail() {
        let event = ActionEvent::new(ActionKind::CopyFile, "/src/a --> /dst/a", ActionMode::Applied);
        assert_eq!(event.to_string(), "COPY_FILE - /src/a --> /dst/a");
        assert_eq!(event.level(), Level::Debug);
    }

    #[test]
    fn dry_run_event_appends_suffix_and_logs_info() {
        let event = ActionEvent::new(ActionKind::CreateDir, "/dst/folder", ActionMode::DryRun);
        assert_eq!(event.to_string(), "CREATE_DIR [dryrun] - /dst/folder");
        assert_eq!(event.level(), Level::Info);
    }

    #[test]
    fn qualifier_renders_between_tag_and_mode() {
        let event = ActionEvent::new(ActionKind::SkipFile, "/dst/a", ActionMode::DryRun)
            .with_qualifier("existing");
        assert_eq!(event.to_string(), "SKIP_FILE [existing] [dryrun] - /dst/a");
    }

    #[test]
    fn no_dst_event_logs_info() {
        let event = ActionEvent::new(ActionKind::CopyFile, "/src/a", ActionMode::NoDst);
        assert_eq!(event.to_string(), "COPY_FILE [no-dst] - /src/a");
        assert_eq!(event.level(), Level::Info);
    }

    #[test]
    fn drain_returns_recorded_events_in_order() {
        drain_events();
        record(ActionEvent::new(ActionKind::CopyFile, "first", ActionMode::Applied));
        record(ActionEvent::new(ActionKind::SameFile, "second", ActionMode::Applied));

        let events = drain_events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind(), ActionKind::CopyFile);
        assert_eq!(events[1].kind(), ActionKind::SameFile);
        assert!(drain_events().is_empty());
    }
}
