//! Relative tree paths and backend key derivation.
//!
//! `TreePathBuf` is an opaque relative path validated on construction. It
//! rejects absolute paths, `.`/`..` components, empty segments, and null
//! bytes, so a validated path can be joined onto a backend root without any
//! escape risk. Backend key derivation lives here too: object-store folder
//! keys carry a trailing delimiter, file keys never do.

use std::fmt;

use crate::error::{Error, Result};

/// Path delimiter shared by logical paths and object-store keys.
pub const DELIMITER: char = '/';

/// Validated relative path within the virtual tree.
///
/// Invariants (enforced at construction):
/// - Non-empty
/// - No leading or trailing `/`
/// - No `.` or `..` components
/// - No empty components (`//`)
/// - No null bytes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TreePathBuf(String);

impl TreePathBuf {
    /// Create a new tree path, validating all invariants.
    pub fn new(path: impl AsRef<str>) -> Result<Self> {
        let path = path.as_ref();
        if path.is_empty() {
            return Err(Error::InvalidPath("path cannot be empty".to_string()));
        }
        if path.starts_with(DELIMITER) {
            return Err(Error::InvalidPath(format!("path must be relative: {path}")));
        }
        if path.ends_with(DELIMITER) {
            return Err(Error::InvalidPath(format!(
                "path cannot have a trailing delimiter: {path}"
            )));
        }
        if path.contains('\0') {
            return Err(Error::InvalidPath("path cannot contain null bytes".to_string()));
        }
        for segment in path.split(DELIMITER) {
            match segment {
                "" => {
                    return Err(Error::InvalidPath(format!(
                        "path cannot contain empty segments: {path}"
                    )));
                }
                "." | ".." => {
                    return Err(Error::InvalidPath(format!(
                        "path cannot contain '.' or '..': {path}"
                    )));
                }
                _ => {}
            }
        }
        Ok(Self(path.to_string()))
    }

    /// The path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Final segment of the path.
    pub fn name(&self) -> &str {
        // A validated path always has at least one non-empty segment.
        self.0.rsplit(DELIMITER).next().unwrap_or(&self.0)
    }

    /// Parent path, or `None` when the path has a single segment.
    pub fn parent(&self) -> Option<TreePathBuf> {
        // Slicing a validated path at a delimiter yields a valid path, so the
        // private constructor is used directly.
        self.0.rfind(DELIMITER).map(|pos| TreePathBuf(self.0[..pos].to_string()))
    }

    /// Every proper ancestor, shallowest first (`a/b/c` yields `a`, `a/b`).
    pub fn ancestors(&self) -> Vec<TreePathBuf> {
        let mut out = Vec::new();
        let mut end = 0;
        while let Some(pos) = self.0[end..].find(DELIMITER) {
            end += pos;
            out.push(TreePathBuf(self.0[..end].to_string()));
            end += 1;
        }
        out
    }

    /// Iterate the path's segments in order.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(DELIMITER)
    }

    /// Number of segments.
    pub fn depth(&self) -> usize {
        self.0.split(DELIMITER).count()
    }

    /// Join a relative remainder onto this path.
    pub fn join(&self, remainder: &str) -> Result<TreePathBuf> {
        TreePathBuf::new(format!("{}{DELIMITER}{remainder}", self.0))
    }

    /// Whether `other` is this path or an ancestor of it.
    pub fn starts_with(&self, other: &TreePathBuf) -> bool {
        self.0 == other.0 || self.0.starts_with(&format!("{}{DELIMITER}", other.0))
    }

    /// Object-store key denoting this path as a folder (trailing delimiter).
    pub fn folder_key(&self) -> String {
        format!("{}{DELIMITER}", self.0)
    }

    /// Object-store key denoting this path as a file (no trailing delimiter).
    pub fn file_key(&self) -> String {
        self.0.clone()
    }
}

impl fmt::Display for TreePathBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<&str> for TreePathBuf {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        TreePathBuf::new(value)
    }
}

/// Split an object-store key back into its path and shape.
///
/// Returns the logical path and `true` when the key is folder-shaped
/// (trailing delimiter). Fails on keys that do not derive from a valid
/// relative path.
pub fn parse_key(key: &str) -> Result<(TreePathBuf, bool)> {
    match key.strip_suffix(DELIMITER) {
        Some(stem) => Ok((TreePathBuf::new(stem)?, true)),
        None => Ok((TreePathBuf::new(key)?, false)),
    }
}
