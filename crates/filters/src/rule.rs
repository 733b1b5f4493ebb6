use std::path::Path;

use globset::{GlobBuilder, GlobMatcher};
use thiserror::Error;

/// Whether a matching rule keeps or drops the entry.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Polarity {
    /// `+` rules keep the entry.
    Include,
    /// `-` rules drop the entry (and protect it from deletion).
    Exclude,
}

/// Failures raised while parsing or compiling a rule string.
#[derive(Debug, Error)]
pub enum FilterParseError {
    /// The rule has no pattern after the polarity and modifiers.
    #[error("filter rule '{rule}' is missing a pattern")]
    MissingPattern {
        /// The offending rule text.
        rule: String,
    },

    /// The rule does not start with `+` or `-`.
    #[error("filter rule '{rule}' must start with '+' or '-'")]
    InvalidPolarity {
        /// The offending rule text.
        rule: String,
    },

    /// A modifier other than `!` or `/` was used.
    #[error("filter rule '{rule}' uses unknown modifier '{modifier}'")]
    UnknownModifier {
        /// The offending rule text.
        rule: String,
        /// The unrecognized modifier character.
        modifier: char,
    },

    /// The pattern begins with a space.
    #[error("filter rule '{rule}' pattern must not begin with a space")]
    LeadingSpace {
        /// The offending rule text.
        rule: String,
    },

    /// The glob pattern failed to compile.
    #[error("invalid glob in filter rule '{rule}'")]
    Pattern {
        /// The offending rule text.
        rule: String,
        /// The compiler's diagnosis.
        #[source]
        source: globset::Error,
    },
}

/// One uncompiled filter rule.
///
/// Construct with [`FilterRule::parse`] for the textual grammar, or with
/// [`FilterRule::include`] / [`FilterRule::exclude`] when building rule
/// lists programmatically. Compilation happens when the rule enters a
/// [`crate::FilterSet`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FilterRule {
    polarity: Polarity,
    pattern: String,
    negate: bool,
    force_full_path: bool,
}

impl FilterRule {
    /// An include rule for `pattern`.
    #[must_use]
    pub fn include(pattern: impl Into<String>) -> Self {
        Self {
            polarity: Polarity::Include,
            pattern: pattern.into(),
            negate: false,
            force_full_path: false,
        }
    }

    /// An exclude rule for `pattern`.
    #[must_use]
    pub fn exclude(pattern: impl Into<String>) -> Self {
        Self {
            polarity: Polarity::Exclude,
            pattern: pattern.into(),
            negate: false,
            force_full_path: false,
        }
    }

    /// Inverts the rule: it applies when the pattern does *not* match.
    #[must_use]
    pub fn negated(mut self) -> Self {
        self.negate = true;
        self
    }

    /// Forces matching against the entry's full path even for patterns that
    /// would otherwise match the basename.
    #[must_use]
    pub fn full_path(mut self) -> Self {
        self.force_full_path = true;
        self
    }

    /// Parses `<polarity>[<modifiers>] <pattern>`.
    pub fn parse(text: &str) -> Result<Self, FilterParseError> {
        let Some((head, pattern)) = text.split_once(' ') else {
            return Err(FilterParseError::MissingPattern {
                rule: text.to_owned(),
            });
        };
        if pattern.is_empty() {
            return Err(FilterParseError::MissingPattern {
                rule: text.to_owned(),
            });
        }
        if pattern.starts_with(' ') {
            return Err(FilterParseError::LeadingSpace {
                rule: text.to_owned(),
            });
        }

        let mut chars = head.chars();
        let polarity = match chars.next() {
            Some('+') => Polarity::Include,
            Some('-') => Polarity::Exclude,
            _ => {
                return Err(FilterParseError::InvalidPolarity {
                    rule: text.to_owned(),
                });
            }
        };

        let mut rule = Self {
            polarity,
            pattern: pattern.to_owned(),
            negate: false,
            force_full_path: false,
        };
        for modifier in chars {
            match modifier {
                '!' => rule.negate = true,
                '/' => rule.force_full_path = true,
                other => {
                    return Err(FilterParseError::UnknownModifier {
                        rule: text.to_owned(),
                        modifier: other,
                    });
                }
            }
        }
        Ok(rule)
    }

    /// The rule's polarity.
    #[must_use]
    pub const fn polarity(&self) -> Polarity {
        self.polarity
    }

    /// The raw glob pattern.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Whether the rule is negated.
    #[must_use]
    pub const fn is_negated(&self) -> bool {
        self.negate
    }

    /// Whether full-path matching was forced with the `/` modifier.
    #[must_use]
    pub const fn is_full_path_forced(&self) -> bool {
        self.force_full_path
    }
}

/// A rule with its glob compiled and its predicates captured.
#[derive(Clone, Debug)]
pub(crate) struct CompiledRule {
    rule: FilterRule,
    matcher: GlobMatcher,
    dir_only: bool,
    anchored: bool,
    full_path: bool,
}

impl CompiledRule {
    pub(crate) fn compile(rule: FilterRule) -> Result<Self, FilterParseError> {
        let mut pattern = rule.pattern.as_str();

        let dir_only = pattern.len() > 1 && pattern.ends_with('/');
        if dir_only {
            pattern = &pattern[..pattern.len() - 1];
        }

        let anchored = pattern.starts_with('/');
        // A pattern with a directory separator (or a cross-component
        // wildcard) matches against the path; everything else matches the
        // basename alone.
        let full_path = rule.force_full_path || pattern.contains('/') || pattern.contains("**");

        let effective = if anchored && !rule.force_full_path {
            &pattern[1..]
        } else {
            pattern
        };

        let matcher = GlobBuilder::new(effective)
            .literal_separator(true)
            .backslash_escape(true)
            .build()
            .map_err(|source| FilterParseError::Pattern {
                rule: rule.pattern.clone(),
                source,
            })?
            .compile_matcher();

        Ok(Self {
            rule,
            matcher,
            dir_only,
            anchored,
            full_path,
        })
    }

    pub(crate) const fn rule(&self) -> &FilterRule {
        &self.rule
    }

    /// Whether the rule applies to the entry. Directory-only rules never
    /// apply to files; otherwise applicability is the raw glob match XOR the
    /// rule's negation.
    pub(crate) fn applies(&self, path: &str, is_dir: bool, base: Option<&str>) -> bool {
        if self.dir_only && !is_dir {
            return false;
        }
        let candidate = self.candidate(path, base);
        let matched = self.matcher.is_match(Path::new(candidate));
        matched != self.rule.negate
    }

    fn candidate<'a>(&self, path: &'a str, base: Option<&str>) -> &'a str {
        if !self.full_path {
            return basename(path);
        }
        if self.anchored && !self.rule.force_full_path {
            return relative_to(path, base);
        }
        path
    }
}

fn basename(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// The path with its base prefix stripped; falls back to stripping the root
/// slash when the entry is not under the base.
fn relative_to<'a>(path: &'a str, base: Option<&str>) -> &'a str {
    if let Some(base) = base {
        let base = base.trim_end_matches('/');
        if let Some(rest) = path.strip_prefix(base) {
            if rest.is_empty() {
                return "";
            }
            if let Some(rel) = rest.strip_prefix('/') {
                return rel;
            }
        }
    }
    path.strip_prefix('/').unwrap_or(path)
}
