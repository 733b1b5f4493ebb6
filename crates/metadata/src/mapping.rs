use regex::Regex;
use thiserror::Error;

/// Failures raised while parsing owner/group mappings.
#[derive(Debug, Error)]
pub enum MappingParseError {
    /// The mapping list or one of its entries is empty.
    #[error("empty mapping in '{text}'")]
    Empty {
        /// The rejected input.
        text: String,
    },

    /// An entry is not of the `pattern:value` form.
    #[error("mapping entry '{entry}' must be of the form pattern:value")]
    MissingColon {
        /// The rejected entry.
        entry: String,
    },

    /// A `chown` shorthand with neither user nor group.
    #[error("chown value '{text}' names neither a user nor a group")]
    EmptyChown {
        /// The rejected input.
        text: String,
    },
}

/// An ordered list of `pattern -> value` renames for owner or group names.
///
/// Patterns accept `*` as a wildcard; everything else matches literally.
/// Lookup scans in insertion order and the first matching pattern wins; a
/// name no pattern matches is passed through unchanged.
#[derive(Clone, Debug, Default)]
pub struct NameMapping {
    entries: Vec<(Regex, String)>,
}

impl NameMapping {
    /// A mapping that renames nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parses a comma-separated `pattern:value` list.
    pub fn parse(text: &str) -> Result<Self, MappingParseError> {
        if text.is_empty() {
            return Err(MappingParseError::Empty {
                text: text.to_owned(),
            });
        }
        let mut entries = Vec::new();
        for entry in text.split(',') {
            let Some((pattern, value)) = entry.split_once(':') else {
                return Err(MappingParseError::MissingColon {
                    entry: entry.to_owned(),
                });
            };
            if pattern.is_empty() || value.is_empty() {
                return Err(MappingParseError::Empty {
                    text: entry.to_owned(),
                });
            }
            entries.push((compile_wildcard(pattern), value.to_owned()));
        }
        Ok(Self { entries })
    }

    /// A single terminal `*:value` mapping, as composed by `chown`.
    #[must_use]
    pub fn match_all(value: impl Into<String>) -> Self {
        Self {
            entries: vec![(compile_wildcard("*"), value.into())],
        }
    }

    /// Whether the mapping has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolves `name` through the mapping: the first matching pattern's
    /// value, or `name` unchanged.
    #[must_use]
    pub fn map<'a>(&'a self, name: &'a str) -> &'a str {
        self.entries
            .iter()
            .find(|(pattern, _)| pattern.is_match(name))
            .map_or(name, |(_, value)| value.as_str())
    }
}

/// Splits a `[user][:group]` chown shorthand into its components.
pub fn parse_chown(text: &str) -> Result<(Option<String>, Option<String>), MappingParseError> {
    let (user, group) = match text.split_once(':') {
        Some((user, group)) => (user, group),
        None => (text, ""),
    };
    let user = (!user.is_empty()).then(|| user.to_owned());
    let group = (!group.is_empty()).then(|| group.to_owned());
    if user.is_none() && group.is_none() {
        return Err(MappingParseError::EmptyChown {
            text: text.to_owned(),
        });
    }
    Ok((user, group))
}

/// Compiles a `*`-wildcard pattern into an anchored regex.
fn compile_wildcard(pattern: &str) -> Regex {
    let mut source = String::with_capacity(pattern.len() + 8);
    source.push('^');
    for ch in pattern.chars() {
        if ch == '*' {
            source.push_str(".*");
        } else {
            source.push_str(&regex::escape(&ch.to_string()));
        }
    }
    source.push('$');
    Regex::new(&source).expect("escaped wildcard pattern always compiles")
}
