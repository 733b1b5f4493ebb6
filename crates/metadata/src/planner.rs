use fsio::{FileHandle, FileSystem, FsError};
use logging::{record, ActionEvent, ActionKind, ActionMode};

use crate::{ChmodSet, NameMapping};

/// The option subset the planner consumes.
#[derive(Clone, Copy, Debug)]
pub struct MetadataOptions {
    /// Replicate the source mtime onto the target.
    pub preserve_times: bool,
    /// Replicate the source permission bits (modulo chmod) onto the target.
    pub preserve_perms: bool,
    /// Replicate the source owner through the user mapping.
    pub preserve_owner: bool,
    /// Replicate the source group through the group mapping.
    pub preserve_group: bool,
    /// Tolerance below which mtimes count as equal, in milliseconds.
    pub accepted_times_diff_ms: i64,
    /// Log planned changes without writing them.
    pub dry_run: bool,
}

impl Default for MetadataOptions {
    fn default() -> Self {
        Self {
            preserve_times: false,
            preserve_perms: false,
            preserve_owner: false,
            preserve_group: false,
            accepted_times_diff_ms: 1000,
            dry_run: false,
        }
    }
}

/// Applies target metadata in a fixed order: times, then permissions, then
/// ownership.
///
/// The caller invokes the planner only after any descent into the entry has
/// completed, so a directory's replicated mtime is not clobbered by the
/// writes below it. `existing` is the target's stat snapshot when one
/// exists; `None` means the target was only planned (dry run), in which case
/// every step logs its intention instead of comparing.
#[derive(Clone, Debug, Default)]
pub struct MetadataPlanner {
    options: MetadataOptions,
    chmod: ChmodSet,
    user_map: NameMapping,
    group_map: NameMapping,
}

impl MetadataPlanner {
    /// Builds a planner from the configured mutations.
    #[must_use]
    pub fn new(
        options: MetadataOptions,
        chmod: ChmodSet,
        user_map: NameMapping,
        group_map: NameMapping,
    ) -> Self {
        Self {
            options,
            chmod,
            user_map,
            group_map,
        }
    }

    /// Runs the three metadata steps against `target_path`.
    pub fn apply(
        &self,
        src: &FileHandle,
        target_path: &str,
        existing: Option<&FileHandle>,
        is_new: bool,
        dst_fs: &dyn FileSystem,
    ) -> Result<(), FsError> {
        self.apply_times(src, target_path, existing, dst_fs)?;
        self.apply_perms(src, target_path, existing, is_new, dst_fs)?;
        self.apply_owner(src, target_path, existing, dst_fs)
    }

    fn mode(&self) -> ActionMode {
        if self.options.dry_run {
            ActionMode::DryRun
        } else {
            ActionMode::Applied
        }
    }

    fn apply_times(
        &self,
        src: &FileHandle,
        target_path: &str,
        existing: Option<&FileHandle>,
        dst_fs: &dyn FileSystem,
    ) -> Result<(), FsError> {
        if !self.options.preserve_times {
            return Ok(());
        }
        match existing {
            Some(dst) => {
                if dst.is_dir() != src.is_dir() {
                    return Ok(());
                }
                let diff = (src.mtime_ms() - dst.mtime_ms()).abs();
                if diff <= self.options.accepted_times_diff_ms {
                    return Ok(());
                }
                if !self.options.dry_run {
                    dst_fs.set_times(target_path, src.mtime_ms())?;
                }
                record(ActionEvent::new(
                    ActionKind::UpdateTimes,
                    format!("{target_path} --> {}", src.mtime_ms()),
                    self.mode(),
                ));
            }
            None => {
                record(ActionEvent::new(
                    ActionKind::UpdateTimes,
                    format!("{target_path} --> {}", src.mtime_ms()),
                    ActionMode::DryRun,
                ));
            }
        }
        Ok(())
    }

    fn apply_perms(
        &self,
        src: &FileHandle,
        target_path: &str,
        existing: Option<&FileHandle>,
        is_new: bool,
        dst_fs: &dyn FileSystem,
    ) -> Result<(), FsError> {
        let chmod_applies = is_new && self.chmod.has_rule_for(src.kind());
        if !self.options.preserve_perms && !chmod_applies {
            return Ok(());
        }
        match existing {
            Some(dst) => {
                let base = if self.options.preserve_perms {
                    src.perms()
                } else {
                    dst.perms()
                };
                let new = self.chmod.apply(src.kind(), base);
                if new == dst.perms() {
                    return Ok(());
                }
                if !self.options.dry_run {
                    dst_fs.set_permission(target_path, new)?;
                }
                record(ActionEvent::new(
                    ActionKind::UpdatePerms,
                    format!("{target_path} --> {new:04o}"),
                    self.mode(),
                ));
            }
            None => {
                // Planned target: no destination bits to compare against;
                // report the mutation computed from the source.
                let new = self.chmod.apply(src.kind(), src.perms());
                record(ActionEvent::new(
                    ActionKind::UpdatePerms,
                    format!("{target_path} --> {new:04o}"),
                    ActionMode::DryRun,
                ));
            }
        }
        Ok(())
    }

    fn apply_owner(
        &self,
        src: &FileHandle,
        target_path: &str,
        existing: Option<&FileHandle>,
        dst_fs: &dyn FileSystem,
    ) -> Result<(), FsError> {
        if !self.options.preserve_owner && !self.options.preserve_group {
            return Ok(());
        }
        let mapped_owner = self
            .options
            .preserve_owner
            .then(|| self.user_map.map(src.owner()));
        let mapped_group = self
            .options
            .preserve_group
            .then(|| self.group_map.map(src.group()));

        match existing {
            Some(dst) => {
                let owner_change = mapped_owner.filter(|owner| *owner != dst.owner());
                let group_change = mapped_group.filter(|group| *group != dst.group());
                if owner_change.is_none() && group_change.is_none() {
                    return Ok(());
                }
                if !self.options.dry_run {
                    dst_fs.set_owner(target_path, owner_change, group_change)?;
                }
                record(ActionEvent::new(
                    ActionKind::UpdateOwnerGroup,
                    format!(
                        "{target_path} --> {}:{}",
                        owner_change.unwrap_or(""),
                        group_change.unwrap_or(""),
                    ),
                    self.mode(),
                ));
            }
            None => {
                record(ActionEvent::new(
                    ActionKind::UpdateOwnerGroup,
                    format!(
                        "{target_path} --> {}:{}",
                        mapped_owner.unwrap_or(""),
                        mapped_group.unwrap_or(""),
                    ),
                    ActionMode::DryRun,
                ));
            }
        }
        Ok(())
    }
}
