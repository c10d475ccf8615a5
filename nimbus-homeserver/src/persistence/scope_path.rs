use std::str::FromStr;

use nimbus_common::constants::TRASH_DIR_NAME;

use super::StorageError;

/// Maximum length of a single path segment.
const MAX_SEGMENT_LENGTH: usize = 255;
/// Maximum total length of a normalized path.
const MAX_TOTAL_LENGTH: usize = 4096;

/// A normalized path relative to a scope directory.
///
/// Always starts with `/`, which stands for the scope root, and never ends with one
/// except for the root itself. `.` segments and empty segments are dropped, `..` is
/// resolved and may not climb above the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopePath {
    normalized_path: String,
}

impl ScopePath {
    /// Normalize and validate a path. Must be percent decoded already.
    pub fn new(unnormalized_path: &str) -> Result<Self, StorageError> {
        normalize(unnormalized_path).map(|normalized_path| Self { normalized_path })
    }

    /// The scope root.
    pub fn root() -> Self {
        Self {
            normalized_path: "/".to_string(),
        }
    }

    /// The normalized path, `/` for the root.
    pub fn as_str(&self) -> &str {
        &self.normalized_path
    }

    /// The path without the leading slash, as reported in listings.
    pub fn relative(&self) -> &str {
        &self.normalized_path[1..]
    }

    /// Whether this is the scope root.
    pub fn is_root(&self) -> bool {
        self.normalized_path == "/"
    }

    /// Path segments from the root down.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.normalized_path.split('/').filter(|s| !s.is_empty())
    }

    /// Last segment. `None` for the root.
    pub fn file_name(&self) -> Option<&str> {
        self.segments().last()
    }

    /// The containing path. `None` for the root.
    pub fn parent(&self) -> Option<ScopePath> {
        if self.is_root() {
            return None;
        }
        let idx = self.normalized_path.rfind('/').unwrap_or(0);
        Some(match idx {
            0 => Self::root(),
            i => Self {
                normalized_path: self.normalized_path[..i].to_string(),
            },
        })
    }

    /// Append a single segment.
    pub fn join(&self, name: &str) -> Result<ScopePath, StorageError> {
        if name.contains('/') {
            return Err(StorageError::InvalidPath(format!(
                "'{name}' is not a single path segment"
            )));
        }
        Self::new(&format!("{}/{}", self.normalized_path, name))
    }

    /// Whether `self` equals `other` or lies inside it. Compares whole segments.
    pub fn starts_with(&self, other: &ScopePath) -> bool {
        other.is_root()
            || self.normalized_path == other.normalized_path
            || self
                .normalized_path
                .strip_prefix(&other.normalized_path)
                .is_some_and(|rest| rest.starts_with('/'))
    }

    /// Whether any segment is the reserved trash name. Such paths are never addressable.
    pub fn is_reserved(&self) -> bool {
        self.segments().any(|segment| segment == TRASH_DIR_NAME)
    }
}

impl std::fmt::Display for ScopePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.normalized_path)
    }
}

impl FromStr for ScopePath {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

fn normalize(path: &str) -> Result<String, StorageError> {
    let invalid = |msg: String| StorageError::InvalidPath(msg);

    if !path.starts_with('/') {
        return Err(invalid(format!("'{path}' must start with '/'")));
    }

    let mut segments: Vec<&str> = vec![];
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        if segment.len() > MAX_SEGMENT_LENGTH {
            return Err(invalid(format!(
                "segment exceeds the maximum length of {MAX_SEGMENT_LENGTH} bytes"
            )));
        }
        if segment.chars().any(|c| c.is_control()) {
            return Err(invalid("control characters are not allowed".to_string()));
        }
        match segment {
            "." => continue,
            ".." => {
                if segments.pop().is_none() {
                    return Err(invalid(format!("'{path}' escapes the scope root")));
                }
            }
            _ => segments.push(segment),
        }
    }

    let normalized = format!("/{}", segments.join("/"));
    if normalized.len() > MAX_TOTAL_LENGTH {
        return Err(invalid(format!(
            "path is {} bytes long, the maximum is {MAX_TOTAL_LENGTH}",
            normalized.len()
        )));
    }
    Ok(normalized)
}
