use std::collections::HashMap;

use filters::Polarity;
use fsio::{path, FileHandle, FileSystem};
use logging::{record, ActionEvent, ActionKind, ActionMode};
use metadata::MetadataPlanner;

use crate::processor::{EntryProcessor, Outcome, Slot};
use crate::{SyncConfig, SyncError, SyncSummary};

/// A source origin entering a level: a path (a glob pattern for roots, a
/// directory for recursive calls) and the base path its entries inherit.
/// `None` marks a not-yet-expanded root.
pub(crate) type SourcePair = (String, Option<String>);

/// Walks one directory level at a time: lists sources and destination,
/// groups by name, merges or rejects conflicts, drives deletion of
/// extraneous entries, and recurses explicitly. Owns nothing beyond its
/// stack frame and the run's counters.
pub(crate) struct LevelWalker<'a> {
    pub config: &'a SyncConfig,
    pub src_fs: &'a dyn FileSystem,
    pub dst_fs: Option<&'a dyn FileSystem>,
    /// Anchor for path-anchored rules evaluated against destination
    /// entries in the deletion pass.
    pub dst_root: Option<&'a str>,
    pub planner: MetadataPlanner,
    pub summary: SyncSummary,
}

impl LevelWalker<'_> {
    fn mode(&self) -> ActionMode {
        if self.config.dry_run {
            ActionMode::DryRun
        } else {
            ActionMode::Applied
        }
    }

    pub fn sync_level(
        &mut self,
        sources: &[SourcePair],
        parent_dst: Option<&str>,
    ) -> Result<(), SyncError> {
        // Step 1: list every source, expanding roots through glob. Roots
        // that fail to expand are treated as empty; the run continues.
        let mut listed: Vec<(FileHandle, String)> = Vec::new();
        for (origin, base) in sources {
            match base {
                None => match self.src_fs.glob(origin) {
                    Ok(Some(handles)) => {
                        for handle in handles {
                            let base = path::parent(handle.path()).unwrap_or("/").to_owned();
                            listed.push((handle, base));
                        }
                    }
                    Ok(None) => {}
                    Err(err) => {
                        tracing::warn!(pattern = %origin, error = %err, "source glob failed; treating as empty");
                    }
                },
                Some(base) => match self.src_fs.list(origin) {
                    Ok(mut handles) => {
                        handles.sort_by(|a, b| a.path().cmp(b.path()));
                        for handle in handles {
                            listed.push((handle, base.clone()));
                        }
                    }
                    Err(err) => {
                        tracing::warn!(dir = %origin, error = %err, "source listing failed; treating as empty");
                    }
                },
            }
        }

        // Step 2: group by name, preserving both the order names first
        // appear in and, within a name, source-parameter order.
        let mut order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, Vec<(FileHandle, String)>> = HashMap::new();
        for (handle, base) in listed {
            let name = handle.name().to_owned();
            if !groups.contains_key(&name) {
                order.push(name.clone());
            }
            groups.entry(name).or_default().push((handle, base));
        }

        // Step 3: conflict ordering. The sort is stable, so equal mtimes
        // keep source-parameter order.
        if self.config.use_most_recent_modif_times {
            for group in groups.values_mut() {
                group.sort_by(|a, b| b.0.mtime_ms().cmp(&a.0.mtime_ms()));
            }
        }

        // Step 4: snapshot the destination level. Destination errors are
        // fatal.
        let mut dst_children: Vec<FileHandle> = Vec::new();
        if let (Some(parent_dst), Some(dst_fs)) = (parent_dst, self.dst_fs) {
            if dst_fs.is_directory(parent_dst)? {
                dst_children = dst_fs.list(parent_dst)?;
                dst_children.sort_by(|a, b| a.path().cmp(b.path()));
            }
        }

        // Step 5: delete extraneous destination entries, honoring filter
        // protection.
        if self.config.delete_extraneous {
            for child in &dst_children {
                if groups.contains_key(child.name()) {
                    continue;
                }
                self.delete_extraneous_entry(child)?;
            }
        }

        let dst_map: HashMap<&str, &FileHandle> =
            dst_children.iter().map(|h| (h.name(), h)).collect();

        // Step 6: per-name processing in name insertion order.
        for name in order {
            let Some(group) = groups.remove(&name) else {
                continue;
            };

            // a. Filter the candidates; excluded sources are recorded.
            let mut selected: Vec<(FileHandle, String)> = Vec::new();
            for (handle, base) in group {
                if self
                    .config
                    .filters
                    .selects(handle.path(), handle.is_dir(), Some(&base))
                {
                    selected.push((handle, base));
                } else {
                    record(ActionEvent::new(
                        ActionKind::ExcludeSrc,
                        handle.path().to_owned(),
                        self.mode(),
                    ));
                    self.summary.excluded_sources += 1;
                }
            }
            if selected.is_empty() {
                continue;
            }

            // b. The target slot this name resolves to.
            let target = parent_dst.map(|dst| path::join(dst, &name));

            // c. Conflict resolution: all-directory groups merge; anything
            // else needs a single candidate or an explicit policy.
            let all_dirs = selected.iter().all(|(handle, _)| handle.is_dir());
            if selected.len() > 1 && !all_dirs && !self.config.resolve_conflicts {
                return Err(SyncError::SourceConflict {
                    target: target.unwrap_or_else(|| name.clone()),
                });
            }

            // d. The representative: head of the (re)ordered candidates.
            let (representative, representative_base) = selected[0].clone();

            // e. Process the representative against its slot.
            let existing = dst_map.get(name.as_str()).map(|handle| (*handle).clone());
            let slot = match (target.as_deref(), self.dst_fs) {
                (Some(path), Some(fs)) => Some(Slot {
                    fs,
                    path,
                    existing: existing.as_ref(),
                }),
                _ => None,
            };
            let processor = EntryProcessor {
                config: self.config,
                src_fs: self.src_fs,
            };
            let outcome = processor.process(&representative, slot, &mut self.summary)?;

            // f. Recurse: an all-directory group merges every candidate's
            // children into the one target; otherwise only the chosen
            // directory descends.
            if representative.is_dir()
                && self.config.recurse
                && !matches!(outcome, Outcome::Skipped)
            {
                let child_sources: Vec<SourcePair> = if all_dirs {
                    selected
                        .iter()
                        .map(|(handle, base)| (handle.path().to_owned(), Some(base.clone())))
                        .collect()
                } else {
                    vec![(
                        representative.path().to_owned(),
                        Some(representative_base.clone()),
                    )]
                };
                self.sync_level(&child_sources, target.as_deref())?;
            }

            // g. Prune the target if it ended up an empty directory.
            if representative.is_dir() && self.config.prune_empty_dirs {
                if let (Some(target), Some(dst_fs)) = (target.as_deref(), self.dst_fs) {
                    if dst_fs.is_directory(target)? && dst_fs.list(target)?.is_empty() {
                        if self.config.dry_run {
                            record(ActionEvent::new(
                                ActionKind::PruneDir,
                                target.to_owned(),
                                ActionMode::DryRun,
                            ));
                        } else {
                            dst_fs.delete(target, false)?;
                            record(ActionEvent::new(
                                ActionKind::PruneDir,
                                target.to_owned(),
                                ActionMode::Applied,
                            ));
                        }
                        self.summary.pruned += 1;
                        continue;
                    }
                }
            }

            // h. Metadata, strictly after the descent so a directory's
            // replicated mtime survives the writes below it.
            if let Outcome::Placed { target, is_new } = outcome {
                if let Some(dst_fs) = self.dst_fs {
                    self.planner.apply(
                        &representative,
                        target.path(),
                        target.handle(),
                        is_new,
                        dst_fs,
                    )?;
                }
            }
        }

        Ok(())
    }

    fn delete_extraneous_entry(&mut self, child: &FileHandle) -> Result<(), SyncError> {
        let Some(dst_fs) = self.dst_fs else {
            return Ok(());
        };
        let protected = matches!(
            self.config
                .filters
                .first_match(child.path(), child.is_dir(), self.dst_root),
            Some(rule) if rule.polarity() == Polarity::Exclude
        );
        if protected && !self.config.delete_excluded {
            record(ActionEvent::new(
                ActionKind::ExcludeDst,
                child.path().to_owned(),
                self.mode(),
            ));
            self.summary.protected += 1;
            return Ok(());
        }

        if self.config.dry_run {
            record(ActionEvent::new(
                ActionKind::DeleteDst,
                child.path().to_owned(),
                ActionMode::DryRun,
            ));
        } else {
            dst_fs.delete(child.path(), true)?;
            record(ActionEvent::new(
                ActionKind::DeleteDst,
                child.path().to_owned(),
                ActionMode::Applied,
            ));
        }
        self.summary.deleted += 1;
        Ok(())
    }
}
