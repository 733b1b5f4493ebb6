use fsio::{FileHandle, FileSystem};
use logging::{record, ActionEvent, ActionKind, ActionMode};

use crate::{SyncConfig, SyncError, SyncSummary, Target};

/// The destination slot an entry resolves to, when a destination is
/// configured at all.
#[derive(Clone, Copy)]
pub(crate) struct Slot<'a> {
    pub fs: &'a dyn FileSystem,
    pub path: &'a str,
    pub existing: Option<&'a FileHandle>,
}

/// What processing one entry produced.
pub(crate) enum Outcome {
    /// No destination is configured; the intention was logged.
    NoTarget,
    /// The entry was skipped; nothing downstream applies.
    Skipped,
    /// The entry has a target, realized or intended.
    Placed {
        target: Target,
        /// Whether the slot was empty before this entry was processed.
        is_new: bool,
    },
}

/// Decides and performs the per-entry action: copy, update, skip, create or
/// overwrite. Metadata is deliberately not its concern; the walker applies
/// it after any descent.
pub(crate) struct EntryProcessor<'a> {
    pub config: &'a SyncConfig,
    pub src_fs: &'a dyn FileSystem,
}

impl EntryProcessor<'_> {
    fn mode(&self) -> ActionMode {
        if self.config.dry_run {
            ActionMode::DryRun
        } else {
            ActionMode::Applied
        }
    }

    pub fn process(
        &self,
        src: &FileHandle,
        slot: Option<Slot<'_>>,
        summary: &mut SyncSummary,
    ) -> Result<Outcome, SyncError> {
        if src.is_dir() {
            if self.config.recurse {
                return self.process_dir(src, slot, summary);
            }
            if !self.config.copy_dirs {
                record(
                    ActionEvent::new(ActionKind::SkipDir, src.path().to_owned(), self.mode())
                        .with_qualifier("no-recurse"),
                );
                return Ok(Outcome::Skipped);
            }
            // copy-dirs mode: directories go through the file decision
            // table and are transferred as opaque units.
        }
        self.process_file(src, slot, summary)
    }

    fn process_file(
        &self,
        src: &FileHandle,
        slot: Option<Slot<'_>>,
        summary: &mut SyncSummary,
    ) -> Result<Outcome, SyncError> {
        let Some(slot) = slot else {
            record(ActionEvent::new(
                ActionKind::CopyFile,
                src.path().to_owned(),
                ActionMode::NoDst,
            ));
            summary.files_copied += 1;
            summary.bytes_copied += src.len();
            return Ok(Outcome::NoTarget);
        };

        match slot.existing {
            None => {
                if self.config.existing {
                    record(
                        ActionEvent::new(ActionKind::SkipFile, src.path().to_owned(), self.mode())
                            .with_qualifier("existing"),
                    );
                    summary.files_skipped += 1;
                    return Ok(Outcome::Skipped);
                }
                summary.files_copied += 1;
                self.transfer(src, slot, ActionKind::CopyFile, true, summary)
            }
            Some(dst) => {
                if !self.differs(src, dst) {
                    record(ActionEvent::new(
                        ActionKind::SameFile,
                        slot.path.to_owned(),
                        self.mode(),
                    ));
                    summary.files_same += 1;
                    return Ok(Outcome::Placed {
                        target: Target::Realized(dst.clone()),
                        is_new: false,
                    });
                }
                if self.config.ignore_existing {
                    record(
                        ActionEvent::new(ActionKind::SkipFile, slot.path.to_owned(), self.mode())
                            .with_qualifier("ignore-existing"),
                    );
                    summary.files_skipped += 1;
                    return Ok(Outcome::Skipped);
                }
                if self.config.update && src.mtime_ms() <= dst.mtime_ms() {
                    record(
                        ActionEvent::new(ActionKind::SkipFile, slot.path.to_owned(), self.mode())
                            .with_qualifier("update"),
                    );
                    summary.files_skipped += 1;
                    return Ok(Outcome::Skipped);
                }
                summary.files_updated += 1;
                self.transfer(src, slot, ActionKind::UpdateFile, false, summary)
            }
        }
    }

    /// Whether source and destination call for a transfer. Sizes differ or
    /// kinds differ: yes. Otherwise the modification times decide, unless
    /// `size_only` waives the time check; `ignore_times` forces a transfer
    /// outright.
    fn differs(&self, src: &FileHandle, dst: &FileHandle) -> bool {
        if self.config.ignore_times {
            return true;
        }
        if src.kind() != dst.kind() || src.len() != dst.len() {
            return true;
        }
        if self.config.size_only {
            return false;
        }
        (src.mtime_ms() - dst.mtime_ms()).abs() > self.config.accepted_times_diff_ms
    }

    fn transfer(
        &self,
        src: &FileHandle,
        slot: Slot<'_>,
        action: ActionKind,
        is_new: bool,
        summary: &mut SyncSummary,
    ) -> Result<Outcome, SyncError> {
        let detail = format!("{} --> {}", src.path(), slot.path);
        if self.config.dry_run {
            record(ActionEvent::new(action, detail, ActionMode::DryRun));
            summary.bytes_copied += src.len();
            return Ok(Outcome::Placed {
                target: Target::Intended(slot.path.to_owned()),
                is_new,
            });
        }

        // Replacing a directory with a file needs the subtree out of the
        // way first; create(overwrite) only truncates files.
        if slot.existing.is_some_and(|dst| dst.is_dir() && !src.is_dir()) {
            slot.fs.delete(slot.path, true)?;
        }
        let bytes = fsio::copy(self.src_fs, src, slot.fs, slot.path, true)?;
        summary.bytes_copied += bytes;
        record(ActionEvent::new(action, detail, ActionMode::Applied));
        let handle = slot.fs.stat(slot.path)?;
        Ok(Outcome::Placed {
            target: Target::Realized(handle),
            is_new,
        })
    }

    fn process_dir(
        &self,
        src: &FileHandle,
        slot: Option<Slot<'_>>,
        summary: &mut SyncSummary,
    ) -> Result<Outcome, SyncError> {
        let Some(slot) = slot else {
            // Log-only mode: nothing to report for the directory itself;
            // the descent logs its files.
            return Ok(Outcome::NoTarget);
        };

        match slot.existing {
            None => {
                summary.dirs_created += 1;
                if self.config.dry_run {
                    record(ActionEvent::new(
                        ActionKind::CreateDir,
                        slot.path.to_owned(),
                        ActionMode::DryRun,
                    ));
                    return Ok(Outcome::Placed {
                        target: Target::Intended(slot.path.to_owned()),
                        is_new: true,
                    });
                }
                slot.fs.mkdir(slot.path)?;
                record(ActionEvent::new(
                    ActionKind::CreateDir,
                    slot.path.to_owned(),
                    ActionMode::Applied,
                ));
                let handle = slot.fs.stat(slot.path)?;
                Ok(Outcome::Placed {
                    target: Target::Realized(handle),
                    is_new: true,
                })
            }
            Some(dst) if !dst.is_dir() => {
                summary.dirs_created += 1;
                if self.config.dry_run {
                    record(ActionEvent::new(
                        ActionKind::OverwriteDir,
                        slot.path.to_owned(),
                        ActionMode::DryRun,
                    ));
                    return Ok(Outcome::Placed {
                        target: Target::Intended(slot.path.to_owned()),
                        is_new: true,
                    });
                }
                slot.fs.delete(slot.path, false)?;
                slot.fs.mkdir(slot.path)?;
                record(ActionEvent::new(
                    ActionKind::OverwriteDir,
                    slot.path.to_owned(),
                    ActionMode::Applied,
                ));
                let handle = slot.fs.stat(slot.path)?;
                Ok(Outcome::Placed {
                    target: Target::Realized(handle),
                    is_new: true,
                })
            }
            Some(dst) => {
                // The directory is already in place; keep its handle so the
                // metadata pass can still run against it.
                record(ActionEvent::new(
                    ActionKind::SkipDir,
                    slot.path.to_owned(),
                    self.mode(),
                ));
                Ok(Outcome::Placed {
                    target: Target::Realized(dst.clone()),
                    is_new: false,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SyncOptions;
    use fsio::EntryKind;

    fn handle(kind: EntryKind, len: u64, mtime_ms: i64) -> FileHandle {
        FileHandle::new("/p", kind, len, mtime_ms, 0o644, "hdfs", "hadoop")
    }

    fn processor_with(options: SyncOptions) -> SyncConfig {
        options.source("file:/src").build().expect("valid options")
    }

    fn differs(config: &SyncConfig, src: &FileHandle, dst: &FileHandle) -> bool {
        let fs = fsio::LocalFs::new();
        EntryProcessor {
            config,
            src_fs: &fs,
        }
        .differs(src, dst)
    }

    #[test]
    fn equal_size_and_close_mtime_compare_equal() {
        let config = processor_with(SyncOptions::default());
        let src = handle(EntryKind::File, 10, 5_000);
        let dst = handle(EntryKind::File, 10, 5_800);
        assert!(!differs(&config, &src, &dst));
    }

    #[test]
    fn size_difference_always_differs() {
        let config = processor_with(SyncOptions::default().size_only(true));
        let src = handle(EntryKind::File, 10, 5_000);
        let dst = handle(EntryKind::File, 11, 5_000);
        assert!(differs(&config, &src, &dst));
    }

    #[test]
    fn size_only_waives_the_time_check() {
        let config = processor_with(SyncOptions::default().size_only(true));
        let src = handle(EntryKind::File, 10, 5_000);
        let dst = handle(EntryKind::File, 10, 999_000);
        assert!(!differs(&config, &src, &dst));
    }

    #[test]
    fn mtime_beyond_tolerance_differs() {
        let config = processor_with(SyncOptions::default());
        let src = handle(EntryKind::File, 10, 5_000);
        let dst = handle(EntryKind::File, 10, 6_100);
        assert!(differs(&config, &src, &dst));
    }

    #[test]
    fn tolerance_is_configurable() {
        let config = processor_with(SyncOptions::default().accepted_times_diff_ms(5_000));
        let src = handle(EntryKind::File, 10, 5_000);
        let dst = handle(EntryKind::File, 10, 9_000);
        assert!(!differs(&config, &src, &dst));
    }

    #[test]
    fn ignore_times_forces_a_difference() {
        let config = processor_with(SyncOptions::default().ignore_times(true));
        let src = handle(EntryKind::File, 10, 5_000);
        let dst = handle(EntryKind::File, 10, 5_000);
        assert!(differs(&config, &src, &dst));
    }

    #[test]
    fn kind_mismatch_always_differs() {
        let config = processor_with(SyncOptions::default());
        let src = handle(EntryKind::File, 0, 5_000);
        let dst = handle(EntryKind::Directory, 0, 5_000);
        assert!(differs(&config, &src, &dst));
    }
}
