use filters::{FilterParseError, FilterSet};
use fsio::{FsError, Scheme, Uri};
use metadata::{
    parse_chown, ChmodParseError, ChmodSet, MappingParseError, MetadataOptions, NameMapping,
};
use thiserror::Error;

/// Violations of the option surface, raised before a run starts.
#[derive(Debug, Error)]
pub enum OptionsError {
    /// No source was supplied.
    #[error("at least one source is required")]
    NoSources,

    /// Sources use more than one scheme.
    #[error("all sources must share one scheme")]
    MixedSchemes,

    /// `size_only` and `ignore_times` contradict each other.
    #[error("size-only and ignore-times are mutually exclusive")]
    SizeOnlyWithIgnoreTimes,

    /// `delete_excluded` without `delete_extraneous` would never act.
    #[error("delete-excluded requires delete-extraneous")]
    DeleteExcludedWithoutDelete,

    /// `recurse` and `copy_dirs` contradict each other.
    #[error("recurse and copy-dirs are mutually exclusive")]
    RecurseWithCopyDirs,

    /// `chown` composes its own mappings and cannot be combined with
    /// explicit ones.
    #[error("chown cannot be combined with usermap or groupmap")]
    ChownWithMaps,

    /// A source or destination URI was rejected.
    #[error(transparent)]
    Uri(#[from] FsError),

    /// A filter rule failed to parse or compile.
    #[error(transparent)]
    Filter(#[from] FilterParseError),

    /// A chmod command was rejected.
    #[error(transparent)]
    Chmod(#[from] ChmodParseError),

    /// A usermap/groupmap/chown value was rejected.
    #[error(transparent)]
    Mapping(#[from] MappingParseError),
}

/// The engine's option surface, assembled with chainable setters and frozen
/// by [`SyncOptions::build`].
///
/// ```
/// use engine::SyncOptions;
///
/// let config = SyncOptions::default()
///     .source("file:/data/in")
///     .dst("file:/data/out")
///     .recurse(true)
///     .times(true)
///     .build()
///     .expect("valid options");
/// assert!(config.recurse());
/// ```
#[derive(Clone, Debug, Default)]
pub struct SyncOptions {
    sources: Vec<String>,
    dst: Option<String>,
    dry_run: bool,
    recurse: bool,
    copy_dirs: bool,
    prune_empty_dirs: bool,
    resolve_conflicts: bool,
    use_most_recent_modif_times: bool,
    existing: bool,
    ignore_existing: bool,
    update: bool,
    size_only: bool,
    ignore_times: bool,
    accepted_times_diff_ms: Option<i64>,
    preserve_times: bool,
    preserve_perms: bool,
    preserve_owner: bool,
    preserve_group: bool,
    chmod_commands: Vec<String>,
    usermap: Option<String>,
    groupmap: Option<String>,
    chown: Option<String>,
    delete_extraneous: bool,
    delete_excluded: bool,
    filter_rules: Vec<String>,
}

impl SyncOptions {
    /// Appends one source URI (optionally a glob, or with a trailing slash
    /// meaning "the contents of").
    #[must_use]
    pub fn source(mut self, uri: impl Into<String>) -> Self {
        self.sources.push(uri.into());
        self
    }

    /// Appends several source URIs.
    #[must_use]
    pub fn sources<I, S>(mut self, uris: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sources.extend(uris.into_iter().map(Into::into));
        self
    }

    /// Sets the destination URI. Without one the run is log-only.
    #[must_use]
    pub fn dst(mut self, uri: impl Into<String>) -> Self {
        self.dst = Some(uri.into());
        self
    }

    /// Log intended actions without touching the filesystem.
    #[must_use]
    pub fn dry_run(mut self, value: bool) -> Self {
        self.dry_run = value;
        self
    }

    /// Descend into directories.
    #[must_use]
    pub fn recurse(mut self, value: bool) -> Self {
        self.recurse = value;
        self
    }

    /// Copy directories as opaque units without descending.
    #[must_use]
    pub fn copy_dirs(mut self, value: bool) -> Self {
        self.copy_dirs = value;
        self
    }

    /// Delete destination directories left empty after processing.
    #[must_use]
    pub fn prune_empty_dirs(mut self, value: bool) -> Self {
        self.prune_empty_dirs = value;
        self
    }

    /// Allow ambiguous same-name sources, taking the head of the ordered
    /// candidate list.
    #[must_use]
    pub fn resolve_conflicts(mut self, value: bool) -> Self {
        self.resolve_conflicts = value;
        self
    }

    /// Order same-name candidates by most recent modification time instead
    /// of source-parameter order.
    #[must_use]
    pub fn use_most_recent_modif_times(mut self, value: bool) -> Self {
        self.use_most_recent_modif_times = value;
        self
    }

    /// Only update entries that already exist; never create new ones.
    #[must_use]
    pub fn existing(mut self, value: bool) -> Self {
        self.existing = value;
        self
    }

    /// Only create new entries; never update existing ones.
    #[must_use]
    pub fn ignore_existing(mut self, value: bool) -> Self {
        self.ignore_existing = value;
        self
    }

    /// Among existing entries, update only when the source is newer.
    #[must_use]
    pub fn update(mut self, value: bool) -> Self {
        self.update = value;
        self
    }

    /// Consider entries equal when their lengths match.
    #[must_use]
    pub fn size_only(mut self, value: bool) -> Self {
        self.size_only = value;
        self
    }

    /// Always consider entries unequal, forcing updates.
    #[must_use]
    pub fn ignore_times(mut self, value: bool) -> Self {
        self.ignore_times = value;
        self
    }

    /// Tolerance below which modification times compare equal
    /// (default 1000 ms).
    #[must_use]
    pub fn accepted_times_diff_ms(mut self, value: i64) -> Self {
        self.accepted_times_diff_ms = Some(value);
        self
    }

    /// Replicate source modification times.
    #[must_use]
    pub fn times(mut self, value: bool) -> Self {
        self.preserve_times = value;
        self
    }

    /// Replicate source permission bits (modulo chmod).
    #[must_use]
    pub fn perms(mut self, value: bool) -> Self {
        self.preserve_perms = value;
        self
    }

    /// Replicate source owners through the user mapping.
    #[must_use]
    pub fn owner(mut self, value: bool) -> Self {
        self.preserve_owner = value;
        self
    }

    /// Replicate source groups through the group mapping.
    #[must_use]
    pub fn group(mut self, value: bool) -> Self {
        self.preserve_group = value;
        self
    }

    /// Appends chmod commands (`F644`, `D755`, `u+w`, ...).
    #[must_use]
    pub fn chmod<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.chmod_commands
            .extend(commands.into_iter().map(Into::into));
        self
    }

    /// Sets the owner remapping list (`pattern:value,...`).
    #[must_use]
    pub fn usermap(mut self, mapping: impl Into<String>) -> Self {
        self.usermap = Some(mapping.into());
        self
    }

    /// Sets the group remapping list (`pattern:value,...`).
    #[must_use]
    pub fn groupmap(mut self, mapping: impl Into<String>) -> Self {
        self.groupmap = Some(mapping.into());
        self
    }

    /// Sets the `[user][:group]` shorthand composing terminal `*:user` /
    /// `*:group` mappings.
    #[must_use]
    pub fn chown(mut self, value: impl Into<String>) -> Self {
        self.chown = Some(value.into());
        self
    }

    /// Delete destination entries with no source counterpart.
    #[must_use]
    pub fn delete_extraneous(mut self, value: bool) -> Self {
        self.delete_extraneous = value;
        self
    }

    /// Delete even excluded extraneous entries.
    #[must_use]
    pub fn delete_excluded(mut self, value: bool) -> Self {
        self.delete_excluded = value;
        self
    }

    /// Appends filter rule strings (`- pattern`, `+! pattern`, ...).
    #[must_use]
    pub fn filter_rules<I, S>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter_rules.extend(rules.into_iter().map(Into::into));
        self
    }

    /// Validates the options and freezes them into a [`SyncConfig`].
    pub fn build(self) -> Result<SyncConfig, OptionsError> {
        if self.sources.is_empty() {
            return Err(OptionsError::NoSources);
        }
        if self.size_only && self.ignore_times {
            return Err(OptionsError::SizeOnlyWithIgnoreTimes);
        }
        if self.delete_excluded && !self.delete_extraneous {
            return Err(OptionsError::DeleteExcludedWithoutDelete);
        }
        if self.recurse && self.copy_dirs {
            return Err(OptionsError::RecurseWithCopyDirs);
        }
        if self.chown.is_some() && (self.usermap.is_some() || self.groupmap.is_some()) {
            return Err(OptionsError::ChownWithMaps);
        }

        let mut sources = Vec::with_capacity(self.sources.len());
        for text in &self.sources {
            let uri = Uri::parse(text)?;
            // A trailing slash means "the contents of": sync the children,
            // not the directory itself.
            let uri = if uri.path().len() > 1 && uri.path().ends_with('/') {
                uri.with_path(format!("{}*", uri.path()))
            } else {
                uri
            };
            sources.push(uri);
        }
        let scheme = sources[0].scheme();
        if sources.iter().any(|uri| uri.scheme() != scheme) {
            return Err(OptionsError::MixedSchemes);
        }

        let dst = self.dst.as_deref().map(Uri::parse).transpose()?;

        let filters = FilterSet::parse(&self.filter_rules)?;
        let chmod = ChmodSet::parse(&self.chmod_commands)?;

        let (user_map, group_map) = if let Some(chown) = &self.chown {
            let (user, group) = parse_chown(chown)?;
            (
                user.map_or_else(NameMapping::empty, NameMapping::match_all),
                group.map_or_else(NameMapping::empty, NameMapping::match_all),
            )
        } else {
            (
                self.usermap
                    .as_deref()
                    .map(NameMapping::parse)
                    .transpose()?
                    .unwrap_or_default(),
                self.groupmap
                    .as_deref()
                    .map(NameMapping::parse)
                    .transpose()?
                    .unwrap_or_default(),
            )
        };

        Ok(SyncConfig {
            sources,
            dst,
            dry_run: self.dry_run,
            recurse: self.recurse,
            copy_dirs: self.copy_dirs,
            prune_empty_dirs: self.prune_empty_dirs,
            resolve_conflicts: self.resolve_conflicts,
            use_most_recent_modif_times: self.use_most_recent_modif_times,
            existing: self.existing,
            ignore_existing: self.ignore_existing,
            update: self.update,
            size_only: self.size_only,
            ignore_times: self.ignore_times,
            accepted_times_diff_ms: self.accepted_times_diff_ms.unwrap_or(1000),
            preserve_times: self.preserve_times,
            preserve_perms: self.preserve_perms,
            preserve_owner: self.preserve_owner,
            preserve_group: self.preserve_group,
            chmod,
            user_map,
            group_map,
            delete_extraneous: self.delete_extraneous,
            delete_excluded: self.delete_excluded,
            filters,
        })
    }
}

/// The frozen, validated option set a run executes against.
#[derive(Clone, Debug)]
pub struct SyncConfig {
    pub(crate) sources: Vec<Uri>,
    pub(crate) dst: Option<Uri>,
    pub(crate) dry_run: bool,
    pub(crate) recurse: bool,
    pub(crate) copy_dirs: bool,
    pub(crate) prune_empty_dirs: bool,
    pub(crate) resolve_conflicts: bool,
    pub(crate) use_most_recent_modif_times: bool,
    pub(crate) existing: bool,
    pub(crate) ignore_existing: bool,
    pub(crate) update: bool,
    pub(crate) size_only: bool,
    pub(crate) ignore_times: bool,
    pub(crate) accepted_times_diff_ms: i64,
    pub(crate) preserve_times: bool,
    pub(crate) preserve_perms: bool,
    pub(crate) preserve_owner: bool,
    pub(crate) preserve_group: bool,
    pub(crate) chmod: ChmodSet,
    pub(crate) user_map: NameMapping,
    pub(crate) group_map: NameMapping,
    pub(crate) delete_extraneous: bool,
    pub(crate) delete_excluded: bool,
    pub(crate) filters: FilterSet,
}

impl SyncConfig {
    /// The parsed source URIs (after trailing-slash rewriting).
    #[must_use]
    pub fn sources(&self) -> &[Uri] {
        &self.sources
    }

    /// The parsed destination URI, when one is configured.
    #[must_use]
    pub const fn dst(&self) -> Option<&Uri> {
        self.dst.as_ref()
    }

    /// The scheme shared by every source.
    #[must_use]
    pub fn source_scheme(&self) -> Scheme {
        self.sources[0].scheme()
    }

    /// Whether the run descends into directories.
    #[must_use]
    pub const fn recurse(&self) -> bool {
        self.recurse
    }

    /// Whether the run is a dry run.
    #[must_use]
    pub const fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub(crate) fn metadata_options(&self) -> MetadataOptions {
        MetadataOptions {
            preserve_times: self.preserve_times,
            preserve_perms: self.preserve_perms,
            preserve_owner: self.preserve_owner,
            preserve_group: self.preserve_group,
            accepted_times_diff_ms: self.accepted_times_diff_ms,
            dry_run: self.dry_run,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_options_build() {
        let config = SyncOptions::default()
            .source("file:/src/data")
            .build()
            .expect("build");
        assert_eq!(config.sources().len(), 1);
        assert!(config.dst().is_none());
        assert_eq!(config.accepted_times_diff_ms, 1000);
    }

    #[test]
    fn trailing_slash_rewrites_to_glob() {
        let config = SyncOptions::default()
            .source("file:/src/data/")
            .build()
            .expect("build");
        assert_eq!(config.sources()[0].path(), "/src/data/*");
    }

    #[test]
    fn mixed_source_schemes_are_rejected() {
        let err = SyncOptions::default()
            .source("file:/a")
            .source("hdfs://nn/a")
            .build()
            .expect_err("must fail");
        assert!(matches!(err, OptionsError::MixedSchemes));
    }

    #[test]
    fn cross_scheme_destination_is_allowed() {
        let config = SyncOptions::default()
            .source("file:/a")
            .dst("hdfs://nn/backup")
            .build()
            .expect("build");
        assert_eq!(config.dst().expect("dst").scheme(), Scheme::Hdfs);
    }

    #[test]
    fn contradictory_flags_are_rejected() {
        assert!(matches!(
            SyncOptions::default()
                .source("file:/a")
                .size_only(true)
                .ignore_times(true)
                .build(),
            Err(OptionsError::SizeOnlyWithIgnoreTimes)
        ));
        assert!(matches!(
            SyncOptions::default()
                .source("file:/a")
                .delete_excluded(true)
                .build(),
            Err(OptionsError::DeleteExcludedWithoutDelete)
        ));
        assert!(matches!(
            SyncOptions::default()
                .source("file:/a")
                .recurse(true)
                .copy_dirs(true)
                .build(),
            Err(OptionsError::RecurseWithCopyDirs)
        ));
    }

    #[test]
    fn chown_excludes_explicit_maps() {
        let err = SyncOptions::default()
            .source("file:/a")
            .chown("alice:staff")
            .usermap("a:b")
            .build()
            .expect_err("must fail");
        assert!(matches!(err, OptionsError::ChownWithMaps));
    }

    #[test]
    fn chown_composes_match_all_mappings() {
        let config = SyncOptions::default()
            .source("file:/a")
            .chown("alice:staff")
            .build()
            .expect("build");
        assert_eq!(config.user_map.map("whoever"), "alice");
        assert_eq!(config.group_map.map("whatever"), "staff");
    }

    #[test]
    fn invalid_filter_rule_fails_at_build_time() {
        let err = SyncOptions::default()
            .source("file:/a")
            .filter_rules(["bogus"])
            .build()
            .expect_err("must fail");
        assert!(matches!(err, OptionsError::Filter(_)));
    }

    #[test]
    fn invalid_chmod_fails_at_build_time() {
        let err = SyncOptions::default()
            .source("file:/a")
            .chmod(["Z999"])
            .build()
            .expect_err("must fail");
        assert!(matches!(err, OptionsError::Chmod(_)));
    }

    #[test]
    fn unknown_scheme_fails_at_build_time() {
        let err = SyncOptions::default()
            .source("s3://bucket/key")
            .build()
            .expect_err("must fail");
        assert!(matches!(err, OptionsError::Uri(_)));
    }
}
