//! Component-wise glob expansion over a [`FileSystem`].
//!
//! Expansion walks the pattern one path component at a time, listing only
//! the directories that can still match. `*`, `?`, character classes and
//! `\` escapes stay within a component; a bare `**` component matches the
//! current candidates and everything below them.

use globset::{GlobBuilder, GlobMatcher};

use crate::{FileHandle, FileSystem, FsError, path};

/// Expands `pattern` into the handles it matches, `Ok(None)` when nothing
/// matches (including a wildcard-free pattern naming a missing path).
pub fn expand<F: FileSystem + ?Sized>(
    fs: &F,
    pattern: &str,
) -> Result<Option<Vec<FileHandle>>, FsError> {
    if !has_glob_meta(pattern) && !pattern.contains('\\') {
        if fs.exists(pattern)? {
            return Ok(Some(vec![fs.stat(pattern)?]));
        }
        return Ok(None);
    }

    let mut candidates: Vec<String> = vec!["/".to_owned()];
    for component in path::components(pattern) {
        if component == "**" {
            let mut next = Vec::new();
            for candidate in &candidates {
                collect_subtree(fs, candidate, &mut next)?;
            }
            candidates = next;
        } else if has_glob_meta(component) {
            let matcher = compile_component(component)?;
            let mut next = Vec::new();
            for candidate in &candidates {
                match fs.list(candidate) {
                    Ok(children) => {
                        for child in children {
                            if matcher.is_match(child.name()) {
                                next.push(child.path().to_owned());
                            }
                        }
                    }
                    Err(FsError::NotFound { .. } | FsError::NotADirectory { .. }) => {}
                    Err(err) => return Err(err),
                }
            }
            candidates = next;
        } else {
            let literal = unescape(component);
            candidates = candidates
                .iter()
                .map(|candidate| path::join(candidate, &literal))
                .collect();
        }
        if candidates.is_empty() {
            return Ok(None);
        }
    }

    let mut handles = Vec::new();
    for candidate in candidates {
        match fs.stat(&candidate) {
            Ok(handle) => handles.push(handle),
            Err(FsError::NotFound { .. }) => {}
            Err(err) => return Err(err),
        }
    }
    handles.sort_by(|a, b| a.path().cmp(b.path()));
    handles.dedup_by(|a, b| a.path() == b.path());

    if handles.is_empty() {
        Ok(None)
    } else {
        Ok(Some(handles))
    }
}

/// The candidate itself plus every path below it.
fn collect_subtree<F: FileSystem + ?Sized>(
    fs: &F,
    root: &str,
    out: &mut Vec<String>,
) -> Result<(), FsError> {
    out.push(root.to_owned());
    match fs.list(root) {
        Ok(children) => {
            for child in children {
                collect_subtree(fs, child.path(), out)?;
            }
            Ok(())
        }
        Err(FsError::NotFound { .. } | FsError::NotADirectory { .. }) => Ok(()),
        Err(err) => Err(err),
    }
}

fn compile_component(component: &str) -> Result<GlobMatcher, FsError> {
    GlobBuilder::new(component)
        .literal_separator(true)
        .backslash_escape(true)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|source| FsError::Glob {
            pattern: component.to_owned(),
            source,
        })
}

/// Whether `text` contains an unescaped wildcard.
pub(crate) fn has_glob_meta(text: &str) -> bool {
    let mut escaped = false;
    for ch in text.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '*' | '?' | '[' => return true,
            _ => {}
        }
    }
    false
}

fn unescape(component: &str) -> String {
    let mut out = String::with_capacity(component.len());
    let mut escaped = false;
    for ch in component.chars() {
        if escaped {
            out.push(ch);
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{has_glob_meta, unescape};

    #[test]
    fn meta_detection_honors_escapes() {
        assert!(has_glob_meta("*.log"));
        assert!(has_glob_meta("file?"));
        assert!(has_glob_meta("[ab]c"));
        assert!(!has_glob_meta("plain"));
        assert!(!has_glob_meta("a\\*b"));
    }

    #[test]
    fn unescape_strips_backslashes() {
        assert_eq!(unescape("a\\*b"), "a*b");
        assert_eq!(unescape("plain"), "plain");
    }
}
