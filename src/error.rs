//! Error types for the stata-mcp-server crate.

use std::path::PathBuf;

/// Errors raised by path validation and the file operations.
#[derive(Debug, thiserror::Error)]
pub enum StataError {
    /// The requested path, its symlink target, or its parent lies outside
    /// every allowed root.
    #[error("access denied - {reason}: {} not in allowed directories", path.display())]
    AccessDenied { path: PathBuf, reason: &'static str },

    /// The target does not exist and neither does its parent directory.
    #[error("parent directory does not exist: {}", path.display())]
    ParentMissing { path: PathBuf },

    /// Content operations only accept `.do` files.
    #[error("file must be a Stata .do file: {}", path.display())]
    InvalidFileType { path: PathBuf },

    /// A directory argument resolved to something else.
    #[error("path must be a directory: {}", path.display())]
    NotADirectory { path: PathBuf },

    /// An edit's `oldText` is absent from the buffer as it stands.
    #[error("edit failed: could not find text \"{text}\" in file")]
    EditNotFound { text: String },

    /// Tool arguments failed schema validation.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// Any other filesystem failure.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StataError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience result type for stata-mcp-server operations.
pub type StataResult<T> = Result<T, StataError>;
