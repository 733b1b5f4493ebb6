//! Helpers for the absolute, slash-separated paths used across backends.
//!
//! Backends never hand out trailing slashes (except for the root itself), so
//! these helpers can stay purely textual.

/// Joins a child name onto a parent path.
#[must_use]
pub fn join(parent: &str, name: &str) -> String {
    if parent.ends_with('/') {
        format!("{parent}{name}")
    } else {
        format!("{parent}/{name}")
    }
}

/// The last path component. The root's file name is the empty string.
#[must_use]
pub fn file_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

/// The parent directory, or `None` for the root.
#[must_use]
pub fn parent(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.rfind('/') {
        Some(0) => Some("/"),
        Some(idx) => Some(&trimmed[..idx]),
        None => None,
    }
}

/// Strips `base` from the front of `path`, leaving a relative remainder.
/// Returns `None` when `path` is not under `base`.
#[must_use]
pub fn strip_prefix<'a>(path: &'a str, base: &str) -> Option<&'a str> {
    let base = base.trim_end_matches('/');
    let rest = path.strip_prefix(base)?;
    if rest.is_empty() {
        return Some("");
    }
    rest.strip_prefix('/')
}

/// Splits an absolute path or pattern into its components.
#[must_use]
pub fn components(path: &str) -> Vec<&str> {
    path.split('/').filter(|c| !c.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_handles_root_parent() {
        assert_eq!(join("/", "a"), "/a");
        assert_eq!(join("/a/b", "c"), "/a/b/c");
    }

    #[test]
    fn file_name_takes_last_component() {
        assert_eq!(file_name("/a/b/c"), "c");
        assert_eq!(file_name("/a"), "a");
        assert_eq!(file_name("/"), "");
    }

    #[test]
    fn parent_walks_up_one_level() {
        assert_eq!(parent("/a/b/c"), Some("/a/b"));
        assert_eq!(parent("/a"), Some("/"));
        assert_eq!(parent("/"), None);
    }

    #[test]
    fn strip_prefix_requires_component_boundary() {
        assert_eq!(strip_prefix("/a/b/c", "/a/b"), Some("c"));
        assert_eq!(strip_prefix("/a/bc", "/a/b"), None);
        assert_eq!(strip_prefix("/a/b", "/a/b"), Some(""));
    }
}
