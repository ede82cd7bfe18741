//! Error types for Arbor
//!
//! Every fallible contract operation reports one of these typed failures so
//! callers can match on the outcome shape (absent, wrong type, collision,
//! not empty) instead of parsing messages. Backend I/O failures are wrapped,
//! not interpreted.

use thiserror::Error;

/// Result type alias using Arbor's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Arbor error types.
///
/// Messages carry the offending relative path and nothing else - no backend
/// endpoints, no OS paths outside the managed roots.
#[derive(Error, Debug)]
pub enum Error {
    /// Path does not denote a managed entry.
    #[error("no such path: {0}")]
    NoSuchPath(String),

    /// Path does not denote a managed folder.
    #[error("no such folder: {0}")]
    NoSuchFolder(String),

    /// Path denotes a managed entry that is not a folder.
    #[error("not a folder: {0}")]
    NotAFolder(String),

    /// Path denotes a managed entry that is not a file.
    #[error("not a file: {0}")]
    NotAFile(String),

    /// Target already holds an entry and replacement was not requested.
    #[error("path exists: {0}")]
    PathExists(String),

    /// Folder creation collision.
    #[error("folder exists: {0}")]
    FolderExists(String),

    /// File creation collision.
    #[error("file exists: {0}")]
    FileExists(String),

    /// Trash guard: the folder has children and `force` was not set.
    #[error("folder not empty: {0}")]
    FolderNotEmpty(String),

    /// Malformed relative path.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Malformed listing filter pattern.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// Provider wiring configuration mismatch.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Entry envelope failed to serialize.
    #[error("envelope error: {0}")]
    Envelope(#[from] serde_json::Error),

    /// Backend communication failure (network, permission, disk).
    #[error("storage backend error: {0}")]
    Backend(String),

    /// I/O error from filesystem operations.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
