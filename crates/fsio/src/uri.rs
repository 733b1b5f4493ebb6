use std::fmt;

use crate::FsError;

/// The two schemes a transfer endpoint can use.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Scheme {
    /// Local filesystem, `file:<absolute-path>`.
    File,
    /// HDFS-style remote tree, `hdfs://<authority>/<absolute-path>`.
    Hdfs,
}

impl Scheme {
    /// Canonical scheme text.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Scheme::File => "file",
            Scheme::Hdfs => "hdfs",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed endpoint URI.
///
/// Accepted forms are `file:/abs/path` (an optional `//` authority must be
/// empty) and `hdfs://authority/abs/path`. Anything else is rejected here so
/// the engine only ever sees well-formed endpoints.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Uri {
    scheme: Scheme,
    authority: Option<String>,
    path: String,
}

impl Uri {
    /// Parses an endpoint URI.
    pub fn parse(text: &str) -> Result<Self, FsError> {
        let (scheme_text, rest) = text.split_once(':').ok_or_else(|| FsError::InvalidUri {
            uri: text.to_owned(),
            reason: "missing scheme".to_owned(),
        })?;

        let scheme = match scheme_text {
            "file" => Scheme::File,
            "hdfs" => Scheme::Hdfs,
            other => {
                return Err(FsError::UnsupportedScheme {
                    scheme: other.to_owned(),
                });
            }
        };

        let (authority, path) = if let Some(after) = rest.strip_prefix("//") {
            match after.find('/') {
                Some(idx) => {
                    let authority = &after[..idx];
                    let path = &after[idx..];
                    if authority.is_empty() {
                        (None, path.to_owned())
                    } else {
                        (Some(authority.to_owned()), path.to_owned())
                    }
                }
                None => {
                    return Err(FsError::InvalidUri {
                        uri: text.to_owned(),
                        reason: "missing absolute path after authority".to_owned(),
                    });
                }
            }
        } else {
            (None, rest.to_owned())
        };

        if scheme == Scheme::Hdfs && authority.is_none() {
            return Err(FsError::InvalidUri {
                uri: text.to_owned(),
                reason: "hdfs uris require an authority".to_owned(),
            });
        }
        if scheme == Scheme::File && authority.is_some() {
            return Err(FsError::InvalidUri {
                uri: text.to_owned(),
                reason: "file uris do not take an authority".to_owned(),
            });
        }
        if !path.starts_with('/') {
            return Err(FsError::InvalidUri {
                uri: text.to_owned(),
                reason: "path must be absolute".to_owned(),
            });
        }

        Ok(Self {
            scheme,
            authority,
            path,
        })
    }

    /// The endpoint's scheme.
    #[must_use]
    pub const fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// The authority (`host:port`) for `hdfs:` endpoints.
    #[must_use]
    pub fn authority(&self) -> Option<&str> {
        self.authority.as_deref()
    }

    /// The absolute path component.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Replaces the path component, keeping scheme and authority.
    #[must_use]
    pub fn with_path(&self, path: impl Into<String>) -> Self {
        Self {
            scheme: self.scheme,
            authority: self.authority.clone(),
            path: path.into(),
        }
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.authority {
            Some(authority) => write!(f, "{}://{}{}", self.scheme, authority, self.path),
            None => write!(f, "{}:{}", self.scheme, self.path),
        }
    }
}
